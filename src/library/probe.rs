use std::io::Cursor;
use std::sync::Arc;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use lofty::prelude::*;
use lofty::probe::Probe;
use rodio::{Decoder, Source};
use tracing::{debug, warn};

use crate::error::MetadataError;

/// Length of `audio` in seconds, or 0 when it cannot be learned within
/// `timeout`.
///
/// The decoder runs on its own thread. A probe that overruns is left to
/// finish in the background and its answer is dropped.
pub fn probe_duration(audio: Arc<[u8]>, timeout: Duration) -> f64 {
    let (tx, rx) = mpsc::channel();
    let spawned = thread::Builder::new()
        .name("duration-probe".to_string())
        .spawn(move || {
            let _ = tx.send(decoded_duration(&audio));
        });
    if let Err(e) = spawned {
        warn!(error = %e, "could not start duration probe");
        return 0.0;
    }

    match rx.recv_timeout(timeout) {
        Ok(seconds) => seconds.unwrap_or(0.0),
        Err(RecvTimeoutError::Timeout) => {
            debug!(error = %MetadataError::Timeout(timeout), "duration left unknown");
            0.0
        }
        Err(RecvTimeoutError::Disconnected) => 0.0,
    }
}

fn decoded_duration(audio: &Arc<[u8]>) -> Option<f64> {
    let from_decoder = Decoder::new(Cursor::new(audio.clone()))
        .ok()
        .and_then(|d| d.total_duration())
        .filter(|d| !d.is_zero());

    from_decoder
        .or_else(|| tagged_duration(audio))
        .map(|d| d.as_secs_f64())
}

// Container headers are often enough when the decoder cannot tell.
fn tagged_duration(audio: &[u8]) -> Option<Duration> {
    let tagged = Probe::new(Cursor::new(audio))
        .guess_file_type()
        .ok()?
        .read()
        .ok()?;
    Some(tagged.properties().duration()).filter(|d| !d.is_zero())
}
