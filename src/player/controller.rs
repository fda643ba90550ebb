use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info, warn};

use crate::audio::{AudioOutput, EngineEvent, PlaybackEngine};
use crate::config::PlaybackSettings;
use crate::library::Track;
use crate::store::{KEY_LAST_TRACK_INDEX, KEY_REPEAT, KEY_SHUFFLE, SessionState, StoreWriter};

use super::repeat::RepeatMode;

/// A track whose real length was learned during playback.
#[derive(Debug, Clone, PartialEq)]
pub struct DurationCorrection {
    pub track_id: String,
    pub seconds: f64,
}

/// Read-only view of the transport for rendering and MPRIS.
#[derive(Debug, Clone)]
pub struct TransportSnapshot {
    pub index: Option<usize>,
    pub track: Option<Track>,
    pub playing: bool,
    pub shuffle: bool,
    pub repeat: RepeatMode,
    pub position: f64,
    pub duration: f64,
}

/// Queue and transport state machine.
///
/// Owns the queue (track snapshots), the index into it and the modifiers.
/// Every command updates the whole state before returning. The engine is
/// driven from here only.
pub struct Controller<O: AudioOutput> {
    engine: PlaybackEngine<O>,
    queue: Vec<Track>,
    index: Option<usize>,
    playing: bool,
    shuffle: bool,
    repeat: RepeatMode,
    position: f64,
    /// Settings are only written once the saved session was applied.
    initialized: bool,
    writer: Option<StoreWriter>,
    rng: StdRng,
}

impl<O: AudioOutput> Controller<O> {
    pub fn new(engine: PlaybackEngine<O>, writer: Option<StoreWriter>) -> Self {
        Self {
            engine,
            queue: Vec::new(),
            index: None,
            playing: false,
            shuffle: false,
            repeat: RepeatMode::default(),
            position: 0.0,
            initialized: false,
            writer,
            rng: StdRng::from_entropy(),
        }
    }

    /// Replace the random source used by shuffle.
    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = rng;
        self
    }

    /// Apply the previous session. Saved modifiers win over `defaults`; the
    /// last track is loaded paused when its index still fits `library`.
    pub fn restore(&mut self, session: SessionState, defaults: &PlaybackSettings, library: &[Track]) {
        self.shuffle = session.shuffle.unwrap_or(defaults.shuffle);
        self.repeat = session.repeat.unwrap_or(defaults.repeat);

        if defaults.resume {
            if let Some(i) = session.last_track_index.filter(|&i| i < library.len()) {
                self.queue = library.to_vec();
                self.index = Some(i);
                self.playing = false;
                match self.engine.load(&self.queue[i]) {
                    Ok(()) => info!(index = i, title = %self.queue[i].title, "restored last track"),
                    Err(e) => warn!(error = %e, "could not reload last track"),
                }
            }
        }

        self.initialized = true;
        debug!(shuffle = self.shuffle, repeat = ?self.repeat, "transport restored");
    }

    /// Start playing `tracks` from `start`. Returns false (and changes
    /// nothing) when `start` is not a position in `tracks`.
    pub fn set_queue_and_play(&mut self, tracks: Vec<Track>, start: usize) -> bool {
        if start >= tracks.len() {
            return false;
        }
        self.queue = tracks;
        self.go_to(start);
        true
    }

    pub fn next(&mut self) {
        let len = self.queue.len();
        if len == 0 {
            return;
        }

        if self.repeat == RepeatMode::One {
            let current = self.index.unwrap_or(0);
            self.go_to(current);
            return;
        }

        let target = if self.shuffle {
            // Independent draw every time; the current track may come up again.
            self.rng.gen_range(0..len)
        } else {
            match self.index {
                None => 0,
                Some(i) if i + 1 < len => i + 1,
                Some(_) if self.repeat == RepeatMode::All => 0,
                Some(i) => {
                    debug!(index = i, "end of queue");
                    self.playing = false;
                    self.engine.pause();
                    return;
                }
            }
        };
        self.go_to(target);
    }

    /// Previous track. Always wraps, whatever the repeat mode.
    pub fn prev(&mut self) {
        let len = self.queue.len();
        if len == 0 {
            return;
        }
        let current = self.index.unwrap_or(0);
        self.go_to((current + len - 1) % len);
    }

    pub fn toggle_play(&mut self) {
        self.playing = !self.playing;
        self.apply_play_state();
    }

    pub fn play(&mut self) {
        if !self.playing {
            self.toggle_play();
        }
    }

    pub fn pause(&mut self) {
        if self.playing {
            self.toggle_play();
        }
    }

    /// Pause and rewind, keeping the current track selected.
    pub fn stop(&mut self) {
        self.playing = false;
        self.engine.pause();
        self.engine.seek(0.0);
        self.position = 0.0;
    }

    pub fn seek(&mut self, seconds: f64) {
        self.engine.seek(seconds);
        self.position = self.engine.position();
    }

    pub fn seek_by(&mut self, delta: f64) {
        self.seek(self.position + delta);
    }

    pub fn set_shuffle(&mut self, shuffle: bool) {
        self.shuffle = shuffle;
        self.persist(KEY_SHUFFLE, &shuffle);
    }

    pub fn toggle_shuffle(&mut self) {
        self.set_shuffle(!self.shuffle);
    }

    pub fn set_repeat(&mut self, repeat: RepeatMode) {
        self.repeat = repeat;
        self.persist(KEY_REPEAT, &repeat);
    }

    pub fn cycle_repeat(&mut self) {
        self.set_repeat(self.repeat.cycle());
    }

    /// Drop a deleted track from the queue. If it was playing, playback
    /// stops and the index is cleared; otherwise the index follows its track.
    pub fn forget_track(&mut self, track_id: &str) {
        let Some(pos) = self.queue.iter().position(|t| t.id == track_id) else {
            return;
        };
        self.queue.remove(pos);

        match self.index {
            Some(i) if i == pos => {
                info!(track = track_id, "active track deleted; stopping");
                self.engine.unload();
                self.playing = false;
                self.position = 0.0;
                self.set_index(None);
            }
            Some(i) if i > pos => self.set_index(Some(i - 1)),
            _ => {}
        }
    }

    /// React to an engine notification. `Ended` is what drives auto-advance.
    pub fn handle_event(&mut self, event: EngineEvent) -> Option<DurationCorrection> {
        match event {
            EngineEvent::Progress(seconds) => self.position = seconds,
            EngineEvent::Ended => {
                debug!(index = ?self.index, "track ended");
                self.next();
            }
            EngineEvent::PlayStateChanged(_) => {}
            EngineEvent::DurationKnown { track_id, seconds } => {
                for t in self.queue.iter_mut().filter(|t| t.id == track_id) {
                    t.duration = seconds;
                }
                if let Some(writer) = &self.writer {
                    writer.update_duration(&track_id, seconds);
                }
                return Some(DurationCorrection { track_id, seconds });
            }
        }
        None
    }

    /// Let the engine check its output; events arrive on its channel.
    pub fn poll(&mut self) {
        self.engine.poll();
    }

    pub fn snapshot(&self) -> TransportSnapshot {
        TransportSnapshot {
            index: self.index,
            track: self.current_track().cloned(),
            playing: self.playing,
            shuffle: self.shuffle,
            repeat: self.repeat,
            position: self.position,
            duration: self.engine.duration(),
        }
    }

    pub fn current_track(&self) -> Option<&Track> {
        self.index.and_then(|i| self.queue.get(i))
    }

    pub fn queue(&self) -> &[Track] {
        &self.queue
    }

    pub fn index(&self) -> Option<usize> {
        self.index
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn shuffle(&self) -> bool {
        self.shuffle
    }

    pub fn repeat(&self) -> RepeatMode {
        self.repeat
    }

    pub fn position(&self) -> f64 {
        self.position
    }

    pub fn engine(&self) -> &PlaybackEngine<O> {
        &self.engine
    }

    /// Release the engine's source. Call once on shutdown.
    pub fn teardown(&mut self) {
        self.playing = false;
        self.engine.teardown();
    }

    /// Make `i` current, load it from the start and play.
    fn go_to(&mut self, i: usize) {
        self.set_index(Some(i));
        self.playing = true;
        self.position = 0.0;

        let track = &self.queue[i];
        debug!(index = i, title = %track.title, "loading");
        if let Err(e) = self.engine.load(track) {
            warn!(error = %e, title = %track.title, "failed to load track");
            self.playing = false;
            return;
        }
        self.apply_play_state();
    }

    fn apply_play_state(&mut self) {
        if self.playing {
            match self.engine.play() {
                Ok(()) => self.position = self.engine.position(),
                Err(e) => {
                    warn!(error = %e, "playback rejected");
                    self.playing = false;
                }
            }
        } else {
            self.engine.pause();
        }
    }

    fn set_index(&mut self, index: Option<usize>) {
        self.index = index;
        self.persist(KEY_LAST_TRACK_INDEX, &index);
    }

    fn persist<T: serde::Serialize + ?Sized>(&self, key: &str, value: &T) {
        if !self.initialized {
            return;
        }
        if let Some(writer) = &self.writer {
            writer.save_setting(key, value);
        }
    }
}
