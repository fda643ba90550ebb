//! Playback engine.
//!
//! `PlaybackEngine` owns the one `AudioOutput` of the process, binds it to
//! tracks through revocable `SourceRef`s and reports progress, end of track
//! and play-state changes as `EngineEvent`s.

mod engine;
mod output;
mod source;

#[cfg(test)]
pub(crate) mod fake;

pub use engine::{EngineEvent, PlaybackEngine};
pub use output::{AudioOutput, RodioOutput};
