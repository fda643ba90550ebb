use std::sync::Arc;

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};

use crate::error::{StoreError, StoreResult};
use crate::library::Track;

use super::Store;

const SELECT_TRACK: &str = "SELECT id, title, artist, album, duration, audio, cover_art, created_at, favorite
     FROM tracks";

/// A `tracks` row before timestamp parsing.
struct TrackRow {
    id: String,
    title: String,
    artist: String,
    album: Option<String>,
    duration: f64,
    audio: Vec<u8>,
    cover_art: Option<String>,
    created_at: String,
    favorite: bool,
}

impl TrackRow {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            title: row.get(1)?,
            artist: row.get(2)?,
            album: row.get(3)?,
            duration: row.get(4)?,
            audio: row.get(5)?,
            cover_art: row.get(6)?,
            created_at: row.get(7)?,
            favorite: row.get(8)?,
        })
    }
}

impl TryFrom<TrackRow> for Track {
    type Error = StoreError;

    fn try_from(row: TrackRow) -> StoreResult<Self> {
        let created_at = parse_timestamp("tracks", &row.id, &row.created_at)?;
        Ok(Track {
            id: row.id,
            title: row.title,
            artist: row.artist,
            album: row.album,
            duration: row.duration,
            audio: Arc::from(row.audio),
            cover_art: row.cover_art,
            created_at,
            favorite: row.favorite,
        })
    }
}

pub(super) fn parse_timestamp(
    collection: &'static str,
    key: &str,
    raw: &str,
) -> StoreResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::CorruptRecord {
            collection,
            key: key.to_string(),
            reason: e.to_string(),
        })
}

fn upsert_track(conn: &Connection, track: &Track) -> StoreResult<()> {
    // Upsert rather than REPLACE so the row keeps its rowid (library order).
    conn.execute(
        "INSERT INTO tracks (id, title, artist, album, duration, audio, cover_art, created_at, favorite)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
         ON CONFLICT(id) DO UPDATE SET
            title = excluded.title,
            artist = excluded.artist,
            album = excluded.album,
            duration = excluded.duration,
            audio = excluded.audio,
            cover_art = excluded.cover_art,
            created_at = excluded.created_at,
            favorite = excluded.favorite",
        params![
            track.id,
            track.title,
            track.artist,
            track.album,
            track.duration,
            &track.audio[..],
            track.cover_art,
            track.created_at.to_rfc3339(),
            track.favorite,
        ],
    )?;
    Ok(())
}

impl Store {
    pub fn put_track(&self, track: &Track) -> StoreResult<()> {
        self.with_conn(|conn| upsert_track(conn, track))
    }

    /// Store a whole import batch in one transaction.
    pub fn put_tracks(&self, tracks: &[Track]) -> StoreResult<()> {
        self.with_conn(|conn| {
            let tx = conn.transaction()?;
            for track in tracks {
                upsert_track(&tx, track)?;
            }
            tx.commit()?;
            Ok(())
        })
    }

    pub fn get_track(&self, id: &str) -> StoreResult<Option<Track>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    &format!("{SELECT_TRACK} WHERE id = ?1"),
                    params![id],
                    TrackRow::from_row,
                )
                .optional()?;
            row.map(Track::try_from).transpose()
        })
    }

    /// Every track, in the order they were first stored.
    pub fn all_tracks(&self) -> StoreResult<Vec<Track>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!("{SELECT_TRACK} ORDER BY rowid"))?;
            let rows = stmt
                .query_map([], TrackRow::from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            rows.into_iter().map(Track::try_from).collect()
        })
    }

    /// Delete one track row. Returns whether it existed.
    pub fn delete_track(&self, id: &str) -> StoreResult<bool> {
        self.with_conn(|conn| {
            let n = conn.execute("DELETE FROM tracks WHERE id = ?1", params![id])?;
            Ok(n > 0)
        })
    }

    pub fn update_duration(&self, id: &str, seconds: f64) -> StoreResult<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE tracks SET duration = ?2 WHERE id = ?1",
                params![id, seconds],
            )?;
            Ok(())
        })
    }

    /// Flip the stored favorite flag without rewriting the payload.
    pub fn set_favorite(&self, id: &str, favorite: bool) -> StoreResult<bool> {
        self.with_conn(|conn| {
            let n = conn.execute(
                "UPDATE tracks SET favorite = ?2 WHERE id = ?1",
                params![id, favorite],
            )?;
            Ok(n > 0)
        })
    }
}
