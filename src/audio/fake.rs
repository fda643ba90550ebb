//! In-memory `AudioOutput` for tests. State is shared so a test can keep a
//! handle after the output moves into an engine.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::error::PlaybackError;

use super::output::AudioOutput;

#[derive(Debug, Default)]
pub struct FakeState {
    pub bound: Option<Arc<[u8]>>,
    pub binds: usize,
    pub playing: bool,
    pub position: Duration,
    pub duration: Option<Duration>,
    pub finished: bool,
    pub reject_play: bool,
    pub reject_bind: bool,
}

#[derive(Clone, Default)]
pub struct FakeOutput {
    pub state: Arc<Mutex<FakeState>>,
}

impl FakeOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with<R>(&self, f: impl FnOnce(&mut FakeState) -> R) -> R {
        f(&mut self.state.lock().unwrap())
    }

    /// Pretend the bound source reached its end at `at`.
    pub fn finish(&self, at: Duration) {
        self.with(|s| {
            s.position = at;
            s.finished = true;
        });
    }
}

impl AudioOutput for FakeOutput {
    fn bind(&mut self, source: Arc<[u8]>) -> Result<(), PlaybackError> {
        self.with(|s| {
            if s.reject_bind {
                return Err(PlaybackError::Rejected("undecodable".into()));
            }
            s.bound = Some(source);
            s.binds += 1;
            s.playing = false;
            s.position = Duration::ZERO;
            s.finished = false;
            Ok(())
        })
    }

    fn unbind(&mut self) {
        self.with(|s| {
            s.bound = None;
            s.playing = false;
        });
    }

    fn play(&mut self) -> Result<(), PlaybackError> {
        self.with(|s| {
            if s.reject_play || s.bound.is_none() {
                return Err(PlaybackError::Rejected("autoplay blocked".into()));
            }
            s.playing = true;
            Ok(())
        })
    }

    fn pause(&mut self) {
        self.with(|s| s.playing = false);
    }

    fn seek(&mut self, position: Duration) -> Result<(), PlaybackError> {
        self.with(|s| {
            s.position = position;
            s.finished = false;
        });
        Ok(())
    }

    fn position(&self) -> Duration {
        self.with(|s| s.position)
    }

    fn duration(&self) -> Option<Duration> {
        self.with(|s| s.duration)
    }

    fn finished(&self) -> bool {
        self.with(|s| s.finished)
    }
}
