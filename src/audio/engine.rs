use std::sync::mpsc::Sender;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::error::PlaybackError;
use crate::library::Track;

use super::output::AudioOutput;
use super::source::{SourceRef, SourceRegistry};

/// Notifications from the engine to whoever drives it.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// Current position in seconds; emitted periodically while playing.
    Progress(f64),
    /// The loaded track played through. Emitted once per load.
    Ended,
    PlayStateChanged(bool),
    /// The output learned the real length of a track stored without one.
    DurationKnown { track_id: String, seconds: f64 },
}

struct Loaded {
    source: SourceRef,
    track_id: String,
    /// Seconds; 0 while unknown.
    duration: f64,
}

/// Owns the single audio output. Only the transport controller drives it.
pub struct PlaybackEngine<O: AudioOutput> {
    output: O,
    sources: SourceRegistry,
    loaded: Option<Loaded>,
    playing: bool,
    ended: bool,
    events: Sender<EngineEvent>,
    progress_interval: Duration,
    last_progress: Option<Instant>,
}

impl<O: AudioOutput> PlaybackEngine<O> {
    pub fn new(output: O, events: Sender<EngineEvent>, progress_interval: Duration) -> Self {
        Self {
            output,
            sources: SourceRegistry::new(),
            loaded: None,
            playing: false,
            ended: false,
            events,
            progress_interval,
            last_progress: None,
        }
    }

    /// Registry backing this engine's source references.
    pub fn sources(&self) -> &SourceRegistry {
        &self.sources
    }

    /// Bind `track` as the current source, paused at zero. The previous
    /// reference is revoked first.
    pub fn load(&mut self, track: &Track) -> Result<(), PlaybackError> {
        self.unload();

        let source = self.sources.create(track.audio.clone());
        let Some(data) = self.sources.resolve(&source) else {
            self.sources.revoke(source);
            return Err(PlaybackError::Rejected("source was revoked".to_string()));
        };
        if let Err(e) = self.output.bind(data) {
            self.sources.revoke(source);
            return Err(e);
        }

        let mut duration = track.duration;
        if !track.has_duration() {
            if let Some(d) = self.output.duration().filter(|d| !d.is_zero()) {
                duration = d.as_secs_f64();
                self.emit(EngineEvent::DurationKnown {
                    track_id: track.id.clone(),
                    seconds: duration,
                });
            }
        }

        debug!(track = %track.id, source = source.id(), "loaded track");
        self.loaded = Some(Loaded {
            source,
            track_id: track.id.clone(),
            duration,
        });
        self.ended = false;
        self.last_progress = None;
        Ok(())
    }

    /// Release the current source and go quiet.
    pub fn unload(&mut self) {
        if let Some(loaded) = self.loaded.take() {
            self.output.unbind();
            self.sources.revoke(loaded.source);
        }
        self.set_playing(false);
    }

    /// Start or resume. A track that already played through starts over.
    pub fn play(&mut self) -> Result<(), PlaybackError> {
        if !self.is_loaded() {
            return Err(PlaybackError::Rejected("nothing is loaded".to_string()));
        }
        self.rewind_if_ended()?;
        self.output.play()?;
        self.set_playing(true);
        Ok(())
    }

    pub fn pause(&mut self) {
        if self.loaded.is_some() {
            self.output.pause();
        }
        self.set_playing(false);
    }

    /// Move to `seconds`, clamped to the track. No-op when nothing is loaded.
    pub fn seek(&mut self, seconds: f64) {
        if let Err(e) = self.rewind_if_ended() {
            warn!(error = %e, "could not rebind finished track");
            return;
        }
        let Some(loaded) = &self.loaded else {
            return;
        };
        let mut target = seconds.max(0.0);
        if loaded.duration > 0.0 {
            target = target.min(loaded.duration);
        }
        if let Err(e) = self.output.seek(Duration::from_secs_f64(target)) {
            warn!(error = %e, "seek failed");
            return;
        }
        self.emit(EngineEvent::Progress(self.position()));
    }

    pub fn position(&self) -> f64 {
        if self.loaded.is_some() {
            self.output.position().as_secs_f64()
        } else {
            0.0
        }
    }

    /// Length of the loaded track in seconds, 0 when unknown.
    pub fn duration(&self) -> f64 {
        self.loaded.as_ref().map_or(0.0, |l| l.duration)
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded.is_some()
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    /// Check the output and emit due events. Called from the event loop.
    pub fn poll(&mut self) {
        if !self.playing || self.loaded.is_none() {
            return;
        }

        if !self.ended && self.output.finished() {
            self.ended = true;
            let position = self.position();
            let mut correction = None;
            if let Some(loaded) = self.loaded.as_mut() {
                if loaded.duration <= 0.0 && position > 0.0 {
                    loaded.duration = position;
                    correction = Some(EngineEvent::DurationKnown {
                        track_id: loaded.track_id.clone(),
                        seconds: position,
                    });
                }
            }
            if let Some(ev) = correction {
                self.emit(ev);
            }
            self.set_playing(false);
            self.emit(EngineEvent::Ended);
            return;
        }

        let due = self
            .last_progress
            .is_none_or(|at| at.elapsed() >= self.progress_interval);
        if due {
            self.last_progress = Some(Instant::now());
            self.emit(EngineEvent::Progress(self.position()));
        }
    }

    /// Release the final source reference.
    pub fn teardown(&mut self) {
        self.unload();
    }

    /// A drained output has nothing left to play or seek in, so the same
    /// source is bound again from zero and `Ended` can fire once more.
    fn rewind_if_ended(&mut self) -> Result<(), PlaybackError> {
        let Some(loaded) = self.loaded.as_ref().filter(|_| self.ended) else {
            return Ok(());
        };
        let data = self
            .sources
            .resolve(&loaded.source)
            .ok_or_else(|| PlaybackError::Rejected("source was revoked".to_string()))?;
        self.output.bind(data)?;
        debug!(track = %loaded.track_id, "rebound finished track");
        self.ended = false;
        self.last_progress = None;
        Ok(())
    }

    fn set_playing(&mut self, playing: bool) {
        if self.playing != playing {
            self.playing = playing;
            self.emit(EngineEvent::PlayStateChanged(playing));
        }
    }

    fn emit(&self, event: EngineEvent) {
        // The receiver only goes away at shutdown.
        let _ = self.events.send(event);
    }
}

impl<O: AudioOutput> Drop for PlaybackEngine<O> {
    fn drop(&mut self) {
        self.teardown();
    }
}
