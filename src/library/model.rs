use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// A track in the library, audio payload included.
///
/// Cloning is cheap: the payload is shared, which is what lets queues hold
/// snapshots of tracks instead of identifiers.
#[derive(Clone, Debug, PartialEq)]
pub struct Track {
    pub id: String,
    pub title: String,
    pub artist: String,
    pub album: Option<String>,
    /// Seconds; 0 when unknown.
    pub duration: f64,
    pub audio: Arc<[u8]>,
    /// `data:` URL of the embedded cover, if any.
    pub cover_art: Option<String>,
    pub created_at: DateTime<Utc>,
    pub favorite: bool,
}

impl Track {
    pub fn new(metadata: TrackMetadata, duration: f64, audio: Arc<[u8]>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            title: metadata.title,
            artist: metadata.artist,
            album: metadata.album,
            duration,
            audio,
            cover_art: metadata.cover_art,
            created_at: Utc::now(),
            favorite: false,
        }
    }

    pub fn has_duration(&self) -> bool {
        self.duration > 0.0
    }
}

/// Best-effort descriptive fields read from a file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TrackMetadata {
    pub title: String,
    pub artist: String,
    pub album: Option<String>,
    pub cover_art: Option<String>,
}

/// A named, ordered list of track identifiers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Playlist {
    pub id: String,
    pub name: String,
    pub track_ids: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl Playlist {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            track_ids: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// Append `track_id` unless it is already present. Returns whether the
    /// sequence changed.
    pub fn add_track(&mut self, track_id: &str) -> bool {
        if self.contains(track_id) {
            return false;
        }
        self.track_ids.push(track_id.to_string());
        true
    }

    /// Remove `track_id` from the sequence. Returns whether it was present.
    pub fn remove_track(&mut self, track_id: &str) -> bool {
        let before = self.track_ids.len();
        self.track_ids.retain(|id| id != track_id);
        self.track_ids.len() != before
    }

    pub fn contains(&self, track_id: &str) -> bool {
        self.track_ids.iter().any(|id| id == track_id)
    }

    /// The track whose cover stands in for the playlist's art.
    pub fn first_track_id(&self) -> Option<&str> {
        self.track_ids.first().map(String::as_str)
    }
}
