mod canvas;
mod color;
mod config;
mod data;
mod dataset;
mod error;
mod feature;
mod logging;
mod map_draw;
mod scale;
mod selection;
mod stacked;
mod state;
mod tooltip;
mod ui;

use clap::Parser;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyEvent, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::{io, time::{Duration, Instant}};
use tracing::{error, info};

use config::Args;
use state::AppState;

const IDLE_POLL: Duration = Duration::from_millis(100);
const ANIMATION_POLL: Duration = Duration::from_millis(16);

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let _guard = logging::init(&args.log_file, &args.log_level)?;

    // Bez obu źródeł nic nie rysujemy
    let (index, world) = match data::load_inputs(&args.data, &args.world, &args.value_column) {
        Ok(inputs) => inputs,
        Err(e) => {
            error!(error = %e, "inicjalizacja przerwana");
            return Err(e.into());
        }
    };
    let year = config::initial_year(args.year, index.year_range());
    let mut state = match AppState::new(index, world, args.value_column.clone(), year) {
        Ok(state) => state,
        Err(e) => {
            error!(error = %e, "nie udało się zbudować mapy");
            return Err(e.into());
        }
    };
    info!(year, "start interfejsu");

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run(&mut terminal, &mut state);

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;
    result
}

fn run(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    state: &mut AppState,
) -> Result<(), Box<dyn std::error::Error>> {
    loop {
        terminal.draw(|f| ui::draw(f, state))?;

        let now = Instant::now();
        state.tick(now);
        let timeout = if state.is_animating(now) { ANIMATION_POLL } else { IDLE_POLL };
        if event::poll(timeout)? {
            match event::read()? {
                Event::Key(KeyEvent { code, kind: KeyEventKind::Press, .. }) => {
                    if state.handle_input(code) {
                        break;
                    }
                }
                Event::Mouse(mouse) => state.handle_mouse(mouse),
                _ => {}
            }
        }
    }
    Ok(())
}
