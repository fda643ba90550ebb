//! The track library: data model, import pipeline and the in-memory catalog.
//!
//! Imports read each file whole, pull best-effort tags with `lofty` and probe
//! the duration with a bounded wait. The catalog mirrors what the store holds
//! and owns every mutation the UI can issue.

mod catalog;
mod display;
mod import;
mod metadata;
mod model;
mod probe;

pub use catalog::Library;
pub use display::{display_from_fields, format_duration};
pub use model::{Playlist, Track, TrackMetadata};
