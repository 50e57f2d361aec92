use std::time::Instant;

use ratatui::{
    layout::{Constraint, Direction, Layout},
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use crate::state::{AppState, ScreenLayout};

pub fn draw(f: &mut Frame, state: &mut AppState) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(1)].as_ref())
        .split(f.area());
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)].as_ref())
        .split(rows[0]);

    // Lewy panel: mapa
    let map_block = Block::default()
        .borders(Borders::ALL)
        .title(format!("Mapa – {}", state.year));
    let map_inner = map_block.inner(chunks[0]);
    f.render_widget(map_block, chunks[0]);
    state.map.render(f, map_inner, Instant::now());

    // Prawy panel: wykres warstwowy z legendą
    let chart_block = Block::default()
        .borders(Borders::ALL)
        .title(state.value_label.as_str());
    let chart_inner = chart_block.inner(chunks[1]);
    f.render_widget(chart_block, chunks[1]);
    let chart = state.stacked.layout(chart_inner);
    state.stacked.render(f, &chart);

    state.layout = ScreenLayout {
        map_panel: chunks[0],
        map: map_inner,
        chart_panel: chunks[1],
        chart,
    };

    // Pasek stanu
    let (min, max) = state.index.year_range();
    let status = Line::from(vec![
        Span::styled(format!(" Rok: {} ", state.year), Style::default().fg(Color::Black).bg(Color::Cyan)),
        Span::raw(format!(
            " {min}–{max} · zaznaczone: {} · zoom ×{:.1} · ",
            state.selection.len(),
            state.map.view().k
        )),
        Span::styled(AppState::HELP_TEXT, Style::default().fg(Color::DarkGray)),
    ]);
    f.render_widget(Paragraph::new(status), rows[1]);

    // Dymki na końcu, nad wszystkim
    if let Some(pointer) = state.pointer {
        if let Some(tip) = state.map_tooltip() {
            tip.render(f, pointer, state.layout.map_panel);
        } else if let Some(tip) = state.area_tooltip() {
            tip.render(f, pointer, state.layout.chart_panel);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::tests::app;
    use ratatui::{Terminal, backend::TestBackend};

    fn screen(state: &mut AppState) -> String {
        let mut terminal = Terminal::new(TestBackend::new(100, 30)).unwrap();
        terminal.draw(|f| draw(f, state)).unwrap();
        let buffer = terminal.backend().buffer().clone();
        let mut out = String::new();
        for row in buffer.content().chunks(buffer.area.width as usize) {
            for cell in row {
                out.push_str(cell.symbol());
            }
            out.push('\n');
        }
        out
    }

    #[test]
    fn draws_panels_and_records_layout() {
        let mut state = app();
        let text = screen(&mut state);
        assert!(text.contains("Mapa – 2001"));
        assert!(text.contains("Produkcja"));
        assert!(text.contains("Kliknij kraj na mapie"));
        assert!(text.contains("Rok: 2001"));
        assert_eq!(state.layout.map_panel.x, 0);
        assert!(state.layout.chart.plot.width > 0);
    }

    #[test]
    fn legend_shows_selected_names() {
        let mut state = app();
        state.toggle("BBB");
        state.toggle("AAA");
        let text = screen(&mut state);
        let alpha = text.find("Alpha").unwrap();
        let beta = text.find("Beta").unwrap();
        assert!(alpha < beta);
        assert!(!text.contains("Kliknij kraj na mapie"));
    }

    #[test]
    fn area_tooltip_drawn_over_plot() {
        let mut state = app();
        state.toggle("AAA");
        screen(&mut state);
        let plot = state.layout.chart.plot;
        state.pointer = Some((plot.x, plot.y + 1));
        let text = screen(&mut state);
        assert!(text.contains("Rok 2000"));
    }
}
