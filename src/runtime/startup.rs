use std::path::PathBuf;

use tracing::{info, warn};

use crate::audio::AudioOutput;
use crate::config;
use crate::library::Library;
use crate::player::Controller;
use crate::store::Store;

/// Open the library database at its configured location.
pub fn open_store(settings: &config::Settings) -> Result<Store, Box<dyn std::error::Error>> {
    let path = settings
        .database_path()
        .ok_or("cannot locate a data directory; set storage.path")?;
    info!(path = %path.display(), "opening library");
    Ok(Store::open(&path)?)
}

/// Import the files and directories given on the command line. Returns a
/// line for the status bar.
pub fn import_arguments(
    library: &mut Library,
    settings: &config::Settings,
    args: &[PathBuf],
) -> Option<String> {
    if args.is_empty() {
        return None;
    }
    match library.import(args, &settings.import) {
        Ok(summary) => Some(format!(
            "imported {}, skipped {}, failed {}",
            summary.imported, summary.skipped, summary.failed
        )),
        Err(e) => {
            warn!(error = %e, "could not save imported tracks");
            Some(format!("import not saved: {e}"))
        }
    }
}

/// Apply the saved session: modifiers and the last track (paused).
pub fn restore_session<O: AudioOutput>(
    controller: &mut Controller<O>,
    store: &Store,
    settings: &config::Settings,
    library: &Library,
) {
    let session = store.load_session().unwrap_or_else(|e| {
        warn!(error = %e, "could not read saved session; starting fresh");
        Default::default()
    });
    controller.restore(session, &settings.playback, library.tracks());
}
