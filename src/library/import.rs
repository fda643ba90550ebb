use std::fs;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::Duration;

use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::config::ImportSettings;

use super::metadata;
use super::model::Track;
use super::probe::probe_duration;

const DEFAULT_WORKERS: usize = 4;

/// What happened to one path of an import batch.
#[derive(Debug)]
pub enum ImportOutcome {
    Imported(Track),
    /// Not an audio file. Left out silently.
    Skipped(PathBuf),
    /// An audio file we could not read. Does not affect the rest of the batch.
    Failed { path: PathBuf, reason: String },
}

/// Counts for a finished batch.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ImportSummary {
    pub imported: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl ImportSummary {
    pub fn from_outcomes(outcomes: &[ImportOutcome]) -> Self {
        let mut summary = Self::default();
        for outcome in outcomes {
            match outcome {
                ImportOutcome::Imported(_) => summary.imported += 1,
                ImportOutcome::Skipped(_) => summary.skipped += 1,
                ImportOutcome::Failed { .. } => summary.failed += 1,
            }
        }
        summary
    }
}

/// Whether `path` looks like audio: an `audio/*` MIME guess, or one of the
/// configured extensions.
pub fn is_audio_file(path: &Path, settings: &ImportSettings) -> bool {
    let guessed_audio = mime_guess::from_path(path)
        .first()
        .is_some_and(|mime| mime.type_() == mime_guess::mime::AUDIO);
    if guessed_audio {
        return true;
    }

    let Some(ext) = path.extension().and_then(|s| s.to_str()) else {
        return false;
    };
    let ext = ext.to_ascii_lowercase();
    settings
        .extensions
        .iter()
        .map(|e| e.trim().trim_start_matches('.').to_ascii_lowercase())
        .any(|e| !e.is_empty() && e == ext)
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|s| s.to_str())
        .map(|name| name.starts_with('.'))
        .unwrap_or(false)
}

/// Every file named by `inputs`, directories expanded per `settings`, in a
/// stable order.
pub fn expand_paths(inputs: &[PathBuf], settings: &ImportSettings) -> Vec<PathBuf> {
    let mut files = Vec::new();

    for input in inputs {
        if input.is_file() {
            files.push(input.clone());
            continue;
        }
        if !input.is_dir() {
            warn!(path = %input.display(), "import path does not exist");
            continue;
        }

        let mut walker = WalkDir::new(input)
            .follow_links(settings.follow_links)
            .sort_by_file_name();

        // Non-recursive = only the root directory.
        let depth_cap = if settings.recursive {
            settings.max_depth
        } else {
            Some(1)
        };
        if let Some(d) = depth_cap {
            walker = walker.max_depth(d);
        }

        for entry in walker
            .into_iter()
            .filter_entry(|e| settings.include_hidden || e.depth() == 0 || !is_hidden(e.path()))
            .filter_map(Result::ok)
        {
            if entry.file_type().is_file() {
                files.push(entry.into_path());
            }
        }
    }

    files
}

/// Read, tag and probe every audio file under `inputs`.
///
/// A fixed set of workers pulls files from a shared queue, so one slow
/// probe only holds up its own worker. Outcomes come back in input order
/// once all files are done.
pub fn import_paths(inputs: &[PathBuf], settings: &ImportSettings) -> Vec<ImportOutcome> {
    let timeout = Duration::from_millis(settings.probe_timeout_ms);
    let files = expand_paths(inputs, settings);

    let mut outcomes: Vec<Option<ImportOutcome>> = files
        .iter()
        .map(|path| {
            if is_audio_file(path, settings) {
                return None;
            }
            debug!(path = %path.display(), "skipping non-audio file");
            Some(ImportOutcome::Skipped(path.clone()))
        })
        .collect();

    let pending: Vec<(usize, &Path)> = outcomes
        .iter()
        .enumerate()
        .filter(|(_, outcome)| outcome.is_none())
        .map(|(i, _)| (i, files[i].as_path()))
        .collect();
    let workers = worker_count(settings, pending.len());
    let queue = Mutex::new(pending.into_iter());
    let (tx, rx) = mpsc::channel();

    thread::scope(|scope| {
        let work = || {
            loop {
                let next = queue.lock().unwrap_or_else(PoisonError::into_inner).next();
                let Some((i, path)) = next else { break };
                // The receiver outlives every worker.
                let _ = tx.send((i, import_file(path, timeout)));
            }
        };

        let handles: Vec<_> = (0..workers)
            .filter_map(|n| {
                thread::Builder::new()
                    .name(format!("import-{n}"))
                    .spawn_scoped(scope, work)
                    .inspect_err(|e| warn!(error = %e, "could not start import worker"))
                    .ok()
            })
            .collect();
        if handles.is_empty() && workers > 0 {
            work();
        }
        for handle in handles {
            if handle.join().is_err() {
                warn!("import worker panicked");
            }
        }
    });
    drop(tx);

    for (i, outcome) in rx.try_iter() {
        outcomes[i] = Some(outcome);
    }
    outcomes
        .into_iter()
        .zip(&files)
        .map(|(outcome, path)| {
            outcome.unwrap_or_else(|| ImportOutcome::Failed {
                path: path.clone(),
                reason: "import worker stopped".to_string(),
            })
        })
        .collect()
}

/// Configured worker count, or the machine's parallelism, never more than
/// there are files.
fn worker_count(settings: &ImportSettings, files: usize) -> usize {
    let wanted = settings
        .workers
        .filter(|&n| n > 0)
        .or_else(|| thread::available_parallelism().ok().map(NonZeroUsize::get))
        .unwrap_or(DEFAULT_WORKERS);
    wanted.min(files)
}

fn import_file(path: &Path, timeout: Duration) -> ImportOutcome {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to read file");
            return ImportOutcome::Failed {
                path: path.to_path_buf(),
                reason: e.to_string(),
            };
        }
    };

    let file_name = path
        .file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let metadata = metadata::extract(&file_name, &bytes);
    let audio: Arc<[u8]> = Arc::from(bytes);
    let duration = probe_duration(audio.clone(), timeout);

    ImportOutcome::Imported(Track::new(metadata, duration, audio))
}
