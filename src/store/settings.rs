use rusqlite::{OptionalExtension, params};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::warn;

use crate::error::StoreResult;
use crate::player::RepeatMode;

use super::Store;

pub const KEY_SHUFFLE: &str = "shuffle";
pub const KEY_REPEAT: &str = "repeat";
pub const KEY_LAST_TRACK_INDEX: &str = "lastTrackIndex";

/// Transport settings saved by the previous session. `None` means the key
/// was never written.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionState {
    pub shuffle: Option<bool>,
    pub repeat: Option<RepeatMode>,
    pub last_track_index: Option<usize>,
}

impl Store {
    /// Read one setting. A missing key is `Ok(None)`.
    pub fn get_setting<T: DeserializeOwned>(&self, key: &str) -> StoreResult<Option<T>> {
        let raw: Option<String> = self.with_conn(|conn| {
            Ok(conn
                .query_row(
                    "SELECT value FROM settings WHERE key = ?1",
                    params![key],
                    |row| row.get(0),
                )
                .optional()?)
        })?;
        raw.map(|s| serde_json::from_str(&s))
            .transpose()
            .map_err(Into::into)
    }

    pub fn save_setting<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> StoreResult<()> {
        let value = serde_json::to_string(value)?;
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO settings (key, value) VALUES (?1, ?2)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                params![key, value],
            )?;
            Ok(())
        })
    }

    /// Gather the transport settings. Unreadable values are logged and
    /// treated as absent so a bad row never blocks startup.
    pub fn load_session(&self) -> StoreResult<SessionState> {
        Ok(SessionState {
            shuffle: self.lenient(KEY_SHUFFLE)?,
            repeat: self.lenient(KEY_REPEAT)?,
            last_track_index: self.lenient::<Option<usize>>(KEY_LAST_TRACK_INDEX)?.flatten(),
        })
    }

    fn lenient<T: DeserializeOwned>(&self, key: &str) -> StoreResult<Option<T>> {
        match self.get_setting(key) {
            Ok(v) => Ok(v),
            Err(crate::error::StoreError::Serialization(e)) => {
                warn!(key, error = %e, "ignoring unreadable setting");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}
