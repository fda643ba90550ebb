//! Log setup. The TUI owns the terminal, so logs go to a daily rolling file.

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use crate::config::Settings;

const DEFAULT_FILTER: &str = "info,tapedeck=debug";

/// Install the global subscriber. `RUST_LOG` wins over the configured filter.
///
/// Returns the writer guard, which must live until shutdown so buffered
/// lines are flushed. `None` when no log directory could be prepared; the
/// player then runs without logs.
pub fn init(settings: &Settings) -> Option<WorkerGuard> {
    let dir = settings.log_directory()?;
    if let Err(e) = std::fs::create_dir_all(&dir) {
        eprintln!("tapedeck: cannot create log directory {}: {e}", dir.display());
        return None;
    }

    let file_appender = tracing_appender::rolling::daily(&dir, "tapedeck.log");
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    let configured = settings.logging.filter.as_deref().unwrap_or(DEFAULT_FILTER);
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(configured))
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let subscriber = tracing_subscriber::fmt()
        .with_writer(file_writer)
        .with_target(true)
        .with_level(true)
        .with_ansi(false)
        .with_env_filter(filter)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("tapedeck: logging already initialized: {e}");
        return None;
    }
    Some(guard)
}
