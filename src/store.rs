//! Persistent library storage.
//!
//! Three collections live in one SQLite database: `tracks` (keyed by track
//! id, audio payload included), `playlists` (keyed by playlist id) and
//! `settings` (keyed by name, JSON values). Every call is atomic for the
//! record it touches; nothing spans collections.

use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

use rusqlite::Connection;
use tracing::debug;

use crate::error::StoreResult;

mod playlists;
mod settings;
mod tracks;
mod writer;

pub use settings::{KEY_LAST_TRACK_INDEX, KEY_REPEAT, KEY_SHUFFLE, SessionState};
pub use writer::StoreWriter;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS tracks (
    id TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    artist TEXT NOT NULL,
    album TEXT,
    duration REAL NOT NULL DEFAULT 0,
    audio BLOB NOT NULL,
    cover_art TEXT,
    created_at TEXT NOT NULL,
    favorite INTEGER NOT NULL DEFAULT 0
);
CREATE TABLE IF NOT EXISTS playlists (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    track_ids TEXT NOT NULL, -- JSON array
    created_at TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS settings (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL -- JSON
);
";

/// Handle to the library database. Cheap to clone; clones share one
/// connection.
#[derive(Clone)]
pub struct Store {
    conn: Arc<Mutex<Connection>>,
}

impl Store {
    /// Open (creating if needed) the database at `path`.
    pub fn open(path: &Path) -> StoreResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        debug!(path = %path.display(), "opened library database");
        Self::init(conn)
    }

    /// A throwaway database, used by tests.
    pub fn open_in_memory() -> StoreResult<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> StoreResult<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn with_conn<T>(&self, f: impl FnOnce(&mut Connection) -> StoreResult<T>) -> StoreResult<T> {
        let mut conn = self.conn.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut conn)
    }
}
