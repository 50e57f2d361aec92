use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    symbols::Marker,
    text::{Line, Span},
    widgets::{Axis, Block, Borders, Chart, Clear, Dataset, GraphType, Paragraph},
    Frame,
};

use crate::{
    dataset::DatasetIndex,
    map_draw::MapShape,
    scale::{LinearScale, nice, short_label},
    stacked::StackedArea,
};

/// Odstęp dymka od kursora i minimalny margines od krawędzi kontenera.
pub const POINTER_OFFSET: u16 = 2;
pub const EDGE_MARGIN: u16 = 1;

const CHART_WIDTH: u16 = 30;
const CHART_HEIGHT: u16 = 8;
const UNKNOWN: &str = "Nieznany";
const NO_DATA: &str = "Brak danych";
const NO_DATA_FOR_YEAR: &str = "Brak danych dla tego roku.";

/// Pozycja dymka o rozmiarze `size` przy kursorze; odbija w lewo / w górę,
/// gdy wychodziłby poza prawą / dolną krawędź kontenera.
pub fn place(pointer: (u16, u16), size: (u16, u16), container: Rect) -> Rect {
    let (w, h) = (size.0.min(container.width), size.1.min(container.height));
    let axis = |p: u16, start: u16, len: u16, extent: u16| -> u16 {
        let p = p.saturating_sub(start);
        let forward = p + POINTER_OFFSET;
        let pos = if forward + len > extent.saturating_sub(EDGE_MARGIN) {
            p.saturating_sub(len + POINTER_OFFSET)
        } else {
            forward
        };
        start + pos.min(extent - len)
    };
    Rect::new(
        axis(pointer.0, container.x, w, container.width),
        axis(pointer.1, container.y, h, container.height),
        w,
        h,
    )
}

/// Liczba całkowita z separatorem tysięcy: 1234567.6 → "1,234,568".
pub fn group_thousands(v: f64) -> String {
    let n = v.round() as i64;
    let digits = n.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if n < 0 {
        out.push('-');
    }
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

fn draw_frame(f: &mut Frame, area: Rect, title: &str) -> Rect {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(Span::styled(title.to_string(), Style::default().add_modifier(Modifier::BOLD)));
    let inner = block.inner(area);
    f.render_widget(Clear, area);
    f.render_widget(block, area);
    inner
}

#[derive(Clone, Debug, PartialEq)]
pub enum MapTooltipBody {
    NoData,
    Series {
        points: Vec<(f64, f64)>,
        x_bounds: [f64; 2],
        y_bounds: [f64; 2],
    },
}

/// Dymek mapy: nazwa, kod i mały wykres liniowy całej historii podmiotu.
#[derive(Clone, Debug, PartialEq)]
pub struct MapTooltip {
    pub title: String,
    pub body: MapTooltipBody,
}

impl MapTooltip {
    pub fn for_shape(shape: &MapShape, index: &DatasetIndex) -> Self {
        let name = shape
            .name
            .as_deref()
            .or_else(|| index.name(&shape.code))
            .unwrap_or(UNKNOWN);
        let title = format!("{name} ({})", shape.code);

        let series = index.series(&shape.code);
        let (Some(first), Some(last)) = (series.first(), series.last()) else {
            return Self { title, body: MapTooltipBody::NoData };
        };
        let (x0, x1) = (first.0 as f64, last.0 as f64);
        let x_bounds = if x0 == x1 { [x0 - 0.5, x1 + 0.5] } else { [x0, x1] };
        let max = series.iter().map(|&(_, v)| v).fold(0.0_f64, f64::max);
        let max = if max > 0.0 { max } else { 1.0 };
        let (y0, y1) = nice((0.0, max), 10);
        let points = series.into_iter().map(|(year, v)| (year as f64, v)).collect();
        Self { title, body: MapTooltipBody::Series { points, x_bounds, y_bounds: [y0, y1] } }
    }

    /// Rozmiar z ramką, liczony z treści.
    pub fn size(&self) -> (u16, u16) {
        let title_w = self.title.chars().count() as u16 + 2;
        match self.body {
            MapTooltipBody::NoData => (title_w.max(NO_DATA.len() as u16 + 2), 3),
            MapTooltipBody::Series { .. } => (title_w.max(CHART_WIDTH + 2), CHART_HEIGHT + 2),
        }
    }

    pub fn render(&self, f: &mut Frame, pointer: (u16, u16), container: Rect) {
        let area = place(pointer, self.size(), container);
        let inner = draw_frame(f, area, &self.title);
        match &self.body {
            MapTooltipBody::NoData => {
                f.render_widget(Paragraph::new(NO_DATA).style(Style::default().fg(Color::DarkGray)), inner);
            }
            MapTooltipBody::Series { points, x_bounds, y_bounds } => {
                let axis_style = Style::default().fg(Color::Gray);
                let chart = Chart::new(vec![
                    Dataset::default()
                        .marker(Marker::Braille)
                        .graph_type(GraphType::Line)
                        .style(Style::default().fg(Color::Cyan))
                        .data(points),
                ])
                .x_axis(
                    Axis::default()
                        .style(axis_style)
                        .bounds(*x_bounds)
                        .labels(vec![
                            Span::raw(format!("{:.0}", x_bounds[0].ceil())),
                            Span::raw(format!("{:.0}", x_bounds[1].floor())),
                        ]),
                )
                .y_axis(
                    Axis::default()
                        .style(axis_style)
                        .bounds(*y_bounds)
                        .labels(vec![Span::raw(short_label(y_bounds[0])), Span::raw(short_label(y_bounds[1]))]),
                );
                f.render_widget(chart, inner);
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct AreaRow {
    pub name: String,
    pub value: f64,
}

/// Dymek wykresu warstwowego: wartości zaznaczonych podmiotów w jednym roku.
#[derive(Clone, Debug, PartialEq)]
pub struct AreaTooltip {
    pub year: i32,
    pub rows: Vec<AreaRow>,
}

/// Rok pod pozycją `px` (w kolumnach pola wykresu): odwrócenie skali,
/// zaokrąglenie i przycięcie do zakresu lat.
pub fn year_at(scale: &LinearScale, px: f64, (min, max): (i32, i32)) -> i32 {
    let year = scale.invert(px).round();
    if year <= min as f64 {
        min
    } else if year >= max as f64 {
        max
    } else {
        year as i32
    }
}

impl AreaTooltip {
    /// `None`, gdy nic nie jest zaznaczone albo roku nie ma w danych.
    pub fn for_year(keys: &[String], index: &DatasetIndex, year: i32) -> Option<Self> {
        if keys.is_empty() || !index.has_year(year) {
            return None;
        }
        let mut rows: Vec<AreaRow> = keys
            .iter()
            .map(|code| AreaRow {
                name: index.name(code).unwrap_or(code).to_string(),
                value: index.value(year, code),
            })
            .filter(|row| row.value > 0.0)
            .collect();
        rows.sort_by(|a, b| b.value.total_cmp(&a.value));
        Some(Self { year, rows })
    }

    /// Dymek dla kolumny terminala nad polem wykresu.
    pub fn at_column(chart: &StackedArea, plot: Rect, col: u16, index: &DatasetIndex) -> Option<Self> {
        if chart.keys().is_empty() {
            return None;
        }
        let px = col as f64 - plot.x as f64;
        let year = year_at(&chart.x_scale(plot), px, index.year_range());
        Self::for_year(chart.keys(), index, year)
    }

    pub fn title(&self) -> String {
        format!("Rok {}", self.year)
    }

    fn lines(&self) -> Vec<(String, String)> {
        self.rows.iter().map(|r| (r.name.clone(), group_thousands(r.value))).collect()
    }

    pub fn size(&self) -> (u16, u16) {
        let title_w = self.title().chars().count();
        let content_w = if self.rows.is_empty() {
            NO_DATA_FOR_YEAR.chars().count()
        } else {
            self.lines()
                .iter()
                .map(|(name, value)| name.chars().count() + 2 + value.len())
                .max()
                .unwrap_or(0)
        };
        let w = title_w.max(content_w) as u16 + 2;
        let h = self.rows.len().max(1) as u16 + 2;
        (w, h)
    }

    pub fn render(&self, f: &mut Frame, pointer: (u16, u16), container: Rect) {
        let area = place(pointer, self.size(), container);
        let inner = draw_frame(f, area, &self.title());
        if self.rows.is_empty() {
            f.render_widget(Paragraph::new(NO_DATA_FOR_YEAR), inner);
            return;
        }
        let width = inner.width as usize;
        let lines: Vec<Line> = self
            .lines()
            .into_iter()
            .map(|(name, value)| {
                let gap = width.saturating_sub(name.chars().count() + value.len()).max(1);
                Line::from(vec![
                    Span::raw(name),
                    Span::raw(" ".repeat(gap)),
                    Span::styled(value, Style::default().add_modifier(Modifier::BOLD)),
                ])
            })
            .collect();
        f.render_widget(Paragraph::new(lines), inner);
    }
}
