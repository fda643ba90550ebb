use std::path::PathBuf;

use tracing::{info, warn};

use crate::audio::AudioOutput;
use crate::config::ImportSettings;
use crate::error::StoreResult;
use crate::player::{Controller, DurationCorrection};
use crate::store::Store;

use super::import::{ImportOutcome, ImportSummary, import_paths};
use super::model::{Playlist, Track};

/// In-memory mirror of the `tracks` and `playlists` collections.
///
/// Mutations update memory first and then the store. A failed store write is
/// returned to the caller but memory is not rolled back, so the two can
/// disagree until the next load.
pub struct Library {
    store: Store,
    tracks: Vec<Track>,
    playlists: Vec<Playlist>,
}

impl Library {
    pub fn load(store: Store) -> StoreResult<Self> {
        let tracks = store.all_tracks()?;
        let playlists = store.all_playlists()?;
        info!(
            tracks = tracks.len(),
            playlists = playlists.len(),
            "library loaded"
        );
        Ok(Self {
            store,
            tracks,
            playlists,
        })
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn playlists(&self) -> &[Playlist] {
        &self.playlists
    }

    pub fn track(&self, id: &str) -> Option<&Track> {
        self.tracks.iter().find(|t| t.id == id)
    }

    pub fn playlist(&self, id: &str) -> Option<&Playlist> {
        self.playlists.iter().find(|p| p.id == id)
    }

    /// Import every audio file under `inputs` and commit the batch at once.
    pub fn import(
        &mut self,
        inputs: &[PathBuf],
        settings: &ImportSettings,
    ) -> StoreResult<ImportSummary> {
        let outcomes = import_paths(inputs, settings);
        let summary = ImportSummary::from_outcomes(&outcomes);
        let tracks: Vec<Track> = outcomes
            .into_iter()
            .filter_map(|outcome| match outcome {
                ImportOutcome::Imported(track) => Some(track),
                ImportOutcome::Failed { path, reason } => {
                    warn!(path = %path.display(), %reason, "import failed");
                    None
                }
                ImportOutcome::Skipped(_) => None,
            })
            .collect();

        self.add_tracks(tracks)?;
        info!(
            imported = summary.imported,
            skipped = summary.skipped,
            failed = summary.failed,
            "import finished"
        );
        Ok(summary)
    }

    /// Persist `tracks` in one transaction, then append them.
    pub fn add_tracks(&mut self, tracks: Vec<Track>) -> StoreResult<()> {
        if tracks.is_empty() {
            return Ok(());
        }
        self.store.put_tracks(&tracks)?;
        self.tracks.extend(tracks);
        Ok(())
    }

    /// Remove a track everywhere: library, every playlist, the play queue.
    ///
    /// Returns whether the track was known.
    pub fn delete_track<O: AudioOutput>(
        &mut self,
        id: &str,
        controller: &mut Controller<O>,
    ) -> StoreResult<bool> {
        let Some(pos) = self.tracks.iter().position(|t| t.id == id) else {
            return Ok(false);
        };
        let removed = self.tracks.remove(pos);

        for playlist in self.playlists.iter_mut() {
            if playlist.remove_track(id) {
                if let Err(e) = self.store.put_playlist(playlist) {
                    warn!(playlist = %playlist.id, error = %e, "failed to save playlist after delete");
                }
            }
        }

        controller.forget_track(id);

        self.store.delete_track(id)?;
        info!(track = %id, title = %removed.title, "deleted track");
        Ok(true)
    }

    /// Flip a track's favorite flag. Returns the new value.
    pub fn toggle_favorite(&mut self, id: &str) -> StoreResult<Option<bool>> {
        let Some(track) = self.tracks.iter_mut().find(|t| t.id == id) else {
            return Ok(None);
        };
        track.favorite = !track.favorite;
        let favorite = track.favorite;
        self.store.set_favorite(id, favorite)?;
        Ok(Some(favorite))
    }

    pub fn favorites(&self) -> Vec<Track> {
        self.tracks.iter().filter(|t| t.favorite).cloned().collect()
    }

    /// Record a length learned during playback. Storage is updated by the
    /// store writer.
    pub fn apply_duration(&mut self, correction: &DurationCorrection) {
        if let Some(track) = self.tracks.iter_mut().find(|t| t.id == correction.track_id) {
            track.duration = correction.seconds;
        }
    }

    /// Create an empty playlist. Blank names are refused.
    pub fn create_playlist(&mut self, name: &str) -> StoreResult<Option<String>> {
        let name = name.trim();
        if name.is_empty() {
            return Ok(None);
        }
        let playlist = Playlist::new(name);
        let id = playlist.id.clone();
        self.playlists.push(playlist);
        self.save_playlist(&id)?;
        info!(playlist = %id, name, "created playlist");
        Ok(Some(id))
    }

    pub fn rename_playlist(&mut self, id: &str, name: &str) -> StoreResult<bool> {
        let name = name.trim();
        if name.is_empty() {
            return Ok(false);
        }
        let Some(playlist) = self.playlists.iter_mut().find(|p| p.id == id) else {
            return Ok(false);
        };
        playlist.name = name.to_string();
        self.save_playlist(id)?;
        Ok(true)
    }

    pub fn delete_playlist(&mut self, id: &str) -> StoreResult<bool> {
        let before = self.playlists.len();
        self.playlists.retain(|p| p.id != id);
        if self.playlists.len() == before {
            return Ok(false);
        }
        self.store.delete_playlist(id)?;
        info!(playlist = %id, "deleted playlist");
        Ok(true)
    }

    /// Append a track to a playlist. Adding a track that is already there,
    /// or one the library does not know, changes nothing.
    pub fn add_to_playlist(&mut self, playlist_id: &str, track_id: &str) -> StoreResult<bool> {
        if self.track(track_id).is_none() {
            return Ok(false);
        }
        let Some(playlist) = self.playlists.iter_mut().find(|p| p.id == playlist_id) else {
            return Ok(false);
        };
        if !playlist.add_track(track_id) {
            return Ok(false);
        }
        self.save_playlist(playlist_id)?;
        Ok(true)
    }

    pub fn remove_from_playlist(&mut self, playlist_id: &str, track_id: &str) -> StoreResult<bool> {
        let Some(playlist) = self.playlists.iter_mut().find(|p| p.id == playlist_id) else {
            return Ok(false);
        };
        if !playlist.remove_track(track_id) {
            return Ok(false);
        }
        self.save_playlist(playlist_id)?;
        Ok(true)
    }

    /// The playlist's tracks in playlist order.
    pub fn playlist_tracks(&self, playlist_id: &str) -> Vec<Track> {
        self.playlist(playlist_id)
            .map(|p| {
                p.track_ids
                    .iter()
                    .filter_map(|id| self.track(id))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Art shown for a playlist: the cover of its first track.
    pub fn playlist_cover(&self, playlist_id: &str) -> Option<&str> {
        let first = self.playlist(playlist_id)?.first_track_id()?;
        self.track(first)?.cover_art.as_deref()
    }

    fn save_playlist(&self, id: &str) -> StoreResult<()> {
        match self.playlist(id) {
            Some(playlist) => self.store.put_playlist(playlist),
            None => Ok(()),
        }
    }
}
