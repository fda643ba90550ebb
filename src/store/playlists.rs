use rusqlite::{OptionalExtension, Row, params};

use crate::error::{StoreError, StoreResult};
use crate::library::Playlist;

use super::Store;
use super::tracks::parse_timestamp;

const SELECT_PLAYLIST: &str = "SELECT id, name, track_ids, created_at FROM playlists";

struct PlaylistRow {
    id: String,
    name: String,
    track_ids: String,
    created_at: String,
}

impl PlaylistRow {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            track_ids: row.get(2)?,
            created_at: row.get(3)?,
        })
    }
}

impl TryFrom<PlaylistRow> for Playlist {
    type Error = StoreError;

    fn try_from(row: PlaylistRow) -> StoreResult<Self> {
        let track_ids: Vec<String> =
            serde_json::from_str(&row.track_ids).map_err(|e| StoreError::CorruptRecord {
                collection: "playlists",
                key: row.id.clone(),
                reason: e.to_string(),
            })?;
        let created_at = parse_timestamp("playlists", &row.id, &row.created_at)?;
        Ok(Playlist {
            id: row.id,
            name: row.name,
            track_ids,
            created_at,
        })
    }
}

impl Store {
    pub fn put_playlist(&self, playlist: &Playlist) -> StoreResult<()> {
        let track_ids = serde_json::to_string(&playlist.track_ids)?;
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO playlists (id, name, track_ids, created_at)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(id) DO UPDATE SET
                    name = excluded.name,
                    track_ids = excluded.track_ids,
                    created_at = excluded.created_at",
                params![
                    playlist.id,
                    playlist.name,
                    track_ids,
                    playlist.created_at.to_rfc3339()
                ],
            )?;
            Ok(())
        })
    }

    pub fn get_playlist(&self, id: &str) -> StoreResult<Option<Playlist>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    &format!("{SELECT_PLAYLIST} WHERE id = ?1"),
                    params![id],
                    PlaylistRow::from_row,
                )
                .optional()?;
            row.map(Playlist::try_from).transpose()
        })
    }

    pub fn all_playlists(&self) -> StoreResult<Vec<Playlist>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!("{SELECT_PLAYLIST} ORDER BY rowid"))?;
            let rows = stmt
                .query_map([], PlaylistRow::from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            rows.into_iter().map(Playlist::try_from).collect()
        })
    }

    pub fn delete_playlist(&self, id: &str) -> StoreResult<bool> {
        self.with_conn(|conn| {
            let n = conn.execute("DELETE FROM playlists WHERE id = ?1", params![id])?;
            Ok(n > 0)
        })
    }
}
