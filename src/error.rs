//! Error types shared across the player.
//!
//! Storage failures are surfaced to callers, playback failures are recovered
//! by the controller, and metadata failures never leave the extractor.

use std::time::Duration;

use thiserror::Error;

/// Failures of the persistent store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The database could not be opened, or a read/write failed.
    #[error("storage unavailable: {0}")]
    StorageUnavailable(#[from] rusqlite::Error),

    /// A stored value could not be (de)serialized.
    #[error("failed to (de)serialize stored value: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A row exists but holds data we cannot interpret.
    #[error("corrupt {collection} record {key}: {reason}")]
    CorruptRecord {
        collection: &'static str,
        key: String,
        reason: String,
    },

    /// Filesystem error while preparing the database location.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The store writer thread has gone away.
    #[error("store writer is closed")]
    WriterClosed,
}

/// Failures of the playback engine.
#[derive(Debug, Error)]
pub enum PlaybackError {
    /// The output refused to start (decode failure, nothing bound).
    #[error("playback rejected: {0}")]
    Rejected(String),

    /// No audio output device could be opened.
    #[error("no audio output device: {0}")]
    NoOutputDevice(String),
}

/// Tag parsing failures. Always recovered with fallback values.
#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("unrecognized audio container: {0}")]
    UnknownFormat(String),

    #[error("failed to read tags: {0}")]
    Unreadable(String),

    #[error("duration probe timed out after {0:?}")]
    Timeout(Duration),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;
