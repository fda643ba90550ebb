use std::env;
use std::path::PathBuf;
use std::sync::mpsc;
use std::time::Duration;

use crossterm::execute;
use crossterm::terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode};
use ratatui::{Terminal, backend::CrosstermBackend};
use tracing::info;

use crate::audio::{EngineEvent, PlaybackEngine, RodioOutput};
use crate::library::Library;
use crate::logging;
use crate::mpris::ControlCmd;
use crate::player::Controller;
use crate::store::StoreWriter;

mod event_loop;
mod mpris_sync;
mod settings;
mod startup;


pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let (settings, fallback) = settings::load_settings();
    let _log_guard = logging::init(&settings);
    settings::report_fallback(fallback);
    info!(version = env!("CARGO_PKG_VERSION"), "starting tapedeck");

    let store = startup::open_store(&settings)?;
    let mut library = Library::load(store.clone())?;

    let args: Vec<PathBuf> = env::args_os().skip(1).map(PathBuf::from).collect();
    let import_status = startup::import_arguments(&mut library, &settings, &args);

    let output = RodioOutput::open_default()?;
    let (engine_tx, engine_rx) = mpsc::channel::<EngineEvent>();
    let engine = PlaybackEngine::new(
        output,
        engine_tx,
        Duration::from_millis(settings.playback.progress_interval_ms),
    );
    let writer = StoreWriter::spawn(store.clone());
    let mut controller = Controller::new(engine, Some(writer.clone()));
    startup::restore_session(&mut controller, &store, &settings, &library);

    let (control_tx, control_rx) = mpsc::channel::<ControlCmd>();
    let mpris = crate::mpris::spawn_mpris(control_tx.clone());
    mpris_sync::update_mpris(&mpris, &controller);

    let mut session = event_loop::Session::new(settings, library, controller, mpris, control_tx);
    if let Some(status) = import_status {
        session.app.set_status(status);
    }

    enable_raw_mode()?;
    let mut stdout = std::io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let run_result = event_loop::run(&mut terminal, &mut session, &engine_rx, &control_rx);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    session.controller.teardown();
    writer.flush();
    writer.shutdown();
    info!("shut down");

    run_result
}
