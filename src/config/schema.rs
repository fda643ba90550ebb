use std::path::PathBuf;

use serde::Deserialize;

use crate::player::RepeatMode;

/// Everything tapedeck reads from its TOML config.
///
/// Each section maps to a `[table]` in the file. `TAPEDECK__SECTION__KEY`
/// environment variables override the file, and missing keys keep the
/// defaults below.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub storage: StorageSettings,
    pub import: ImportSettings,
    pub playback: PlaybackSettings,
    pub controls: ControlsSettings,
    pub ui: UiSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    /// Location of the library database. Defaults to
    /// `$XDG_DATA_HOME/tapedeck/library.db`.
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ImportSettings {
    /// Extensions accepted even when the MIME guess is not `audio/*`
    /// (case-insensitive, without dot).
    pub extensions: Vec<String>,
    pub follow_links: bool,
    /// Import dotfiles and files under dot-directories.
    pub include_hidden: bool,
    pub recursive: bool,
    /// Directory depth limit; unlimited when unset.
    pub max_depth: Option<usize>,
    /// Upper bound for probing a file's duration (milliseconds).
    pub probe_timeout_ms: u64,
    /// Files read at once. Unset uses the available parallelism.
    pub workers: Option<usize>,
}

impl Default for ImportSettings {
    fn default() -> Self {
        Self {
            extensions: vec![
                "mp3".into(),
                "flac".into(),
                "wav".into(),
                "ogg".into(),
                "m4a".into(),
            ],
            follow_links: true,
            include_hidden: false,
            recursive: true,
            max_depth: None,
            probe_timeout_ms: 5_000,
            workers: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PlaybackSettings {
    /// Whether shuffle starts enabled when nothing was saved yet.
    pub shuffle: bool,
    /// Repeat mode used when nothing was saved yet.
    pub repeat: RepeatMode,
    /// How often progress events are emitted while playing (milliseconds).
    pub progress_interval_ms: u64,
    /// Whether to reload the last played track on startup.
    pub resume: bool,
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            shuffle: false,
            repeat: RepeatMode::None,
            progress_interval_ms: 250,
            resume: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ControlsSettings {
    /// Seek step of `H`/`L`, in seconds.
    pub scrub_seconds: u64,
}

impl Default for ControlsSettings {
    fn default() -> Self {
        Self { scrub_seconds: 5 }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UiSettings {
    /// Banner line in the header box.
    pub header_text: String,
    /// Row label parts, e.g. `["favorite", "artist", "title"]`.
    pub list_fields: Vec<TrackDisplayField>,
    pub list_separator: String,
    /// Clock parts after the song on the status line.
    pub now_playing_time_fields: Vec<TimeField>,
    pub now_playing_time_separator: String,
}

impl Default for UiSettings {
    fn default() -> Self {
        Self {
            header_text: " ~ tapedeck ~ ".to_string(),
            list_fields: vec![TrackDisplayField::Artist, TrackDisplayField::Title],
            list_separator: " - ".to_string(),
            now_playing_time_fields: vec![TimeField::Elapsed, TimeField::Total, TimeField::Remaining],
            now_playing_time_separator: " / ".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Directory for the rolling log file. Defaults to the data directory.
    pub directory: Option<PathBuf>,
    /// `tracing` filter directive, overridden by `RUST_LOG`.
    pub filter: Option<String>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TimeField {
    Elapsed,
    Total,
    Remaining,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TrackDisplayField {
    Title,
    Artist,
    Album,
    /// A star when the track is marked as favorite.
    Favorite,
}
