use std::{fs::File, path::Path};

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Logi trafiają do pliku, bo stdout należy do interfejsu.
/// Strażnik musi żyć do końca programu, inaczej bufor nie zostanie opróżniony.
pub fn init(log_file: &Path, default_level: &str) -> std::io::Result<WorkerGuard> {
    let file = File::create(log_file)?;
    let (writer, guard) = tracing_appender::non_blocking(file);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    // ponowna inicjalizacja (np. w testach) nie jest błędem
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(writer).with_ansi(false))
        .try_init();
    Ok(guard)
}
