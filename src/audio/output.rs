//! The platform playback primitive and its `rodio` implementation.

use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;

use rodio::{Decoder, OutputStream, OutputStreamBuilder, Sink, Source};

use crate::error::PlaybackError;

/// One audio output that plays one bound source at a time.
pub trait AudioOutput {
    /// Bind `source`, replacing whatever was bound. The new source starts
    /// paused at position zero.
    fn bind(&mut self, source: Arc<[u8]>) -> Result<(), PlaybackError>;
    /// Drop the bound source, if any.
    fn unbind(&mut self);
    fn play(&mut self) -> Result<(), PlaybackError>;
    fn pause(&mut self);
    fn seek(&mut self, position: Duration) -> Result<(), PlaybackError>;
    fn position(&self) -> Duration;
    /// Total length as reported by the decoder, when it knows.
    fn duration(&self) -> Option<Duration>;
    /// True once the bound source has played through.
    fn finished(&self) -> bool;
}

/// Default sound device via `rodio`.
pub struct RodioOutput {
    stream: OutputStream,
    sink: Option<Sink>,
    duration: Option<Duration>,
}

impl RodioOutput {
    pub fn open_default() -> Result<Self, PlaybackError> {
        let mut stream = OutputStreamBuilder::open_default_stream()
            .map_err(|e| PlaybackError::NoOutputDevice(e.to_string()))?;
        // rodio logs to stderr when the stream is dropped, which would land
        // on top of the TUI.
        stream.log_on_drop(false);
        Ok(Self {
            stream,
            sink: None,
            duration: None,
        })
    }
}

impl AudioOutput for RodioOutput {
    fn bind(&mut self, source: Arc<[u8]>) -> Result<(), PlaybackError> {
        self.unbind();

        let decoder =
            Decoder::new(Cursor::new(source)).map_err(|e| PlaybackError::Rejected(e.to_string()))?;
        self.duration = decoder.total_duration();

        let sink = Sink::connect_new(self.stream.mixer());
        sink.pause();
        sink.append(decoder);
        self.sink = Some(sink);
        Ok(())
    }

    fn unbind(&mut self) {
        if let Some(sink) = self.sink.take() {
            sink.stop();
        }
        self.duration = None;
    }

    fn play(&mut self) -> Result<(), PlaybackError> {
        match &self.sink {
            Some(sink) => {
                sink.play();
                Ok(())
            }
            None => Err(PlaybackError::Rejected("nothing is loaded".to_string())),
        }
    }

    fn pause(&mut self) {
        if let Some(sink) = &self.sink {
            sink.pause();
        }
    }

    fn seek(&mut self, position: Duration) -> Result<(), PlaybackError> {
        match &self.sink {
            Some(sink) => sink
                .try_seek(position)
                .map_err(|e| PlaybackError::Rejected(e.to_string())),
            None => Ok(()),
        }
    }

    fn position(&self) -> Duration {
        self.sink.as_ref().map_or(Duration::ZERO, Sink::get_pos)
    }

    fn duration(&self) -> Option<Duration> {
        self.duration
    }

    fn finished(&self) -> bool {
        self.sink.as_ref().is_some_and(Sink::empty)
    }
}
