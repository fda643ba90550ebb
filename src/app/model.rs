//! Application model types: `App`, `View` and `PlaybackState`.
//!
//! The `App` struct holds the rows of the current view, the selection, the
//! fuzzy filter and the small amount of input state the UI needs.

use crate::config::UiSettings;
use crate::library::{Library, Track, display_from_fields};
use crate::player::TransportSnapshot;

use super::fuzzy;

/// The playback state of the application.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum PlaybackState {
    #[default]
    Stopped,
    Playing,
    Paused,
}

impl PlaybackState {
    /// Stopped when nothing is selected in the queue.
    pub fn of(snapshot: &TransportSnapshot) -> Self {
        match (&snapshot.track, snapshot.playing) {
            (None, _) => Self::Stopped,
            (Some(_), true) => Self::Playing,
            (Some(_), false) => Self::Paused,
        }
    }
}

/// Which collection the track list shows.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum View {
    #[default]
    Library,
    Favorites,
    /// A playlist, by id.
    Playlist(String),
}

/// What keystrokes currently go to.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum InputMode {
    #[default]
    Normal,
    Filter,
    /// Typing a name for a new playlist.
    NewPlaylist,
    /// Typing a new name for the playlist on screen.
    RenamePlaylist,
}

/// The main application model.
pub struct App {
    pub view: View,
    pub view_title: String,
    /// Rows of the current view, in collection order.
    pub tracks: Vec<Track>,
    labels: Vec<String>,
    lower_labels: Option<Vec<String>>,

    pub selected: usize,
    pub input: InputMode,
    pub filter_query: String,
    pub name_input: String,

    pub follow_playback: bool,
    pub metadata_window: bool,
    /// Playlist that `add to playlist` targets.
    pub target_playlist: Option<String>,
    pub status_message: Option<String>,
}

impl App {
    /// Create a new `App` showing the whole library.
    pub fn new(library: &Library, ui: &UiSettings) -> Self {
        let mut app = Self {
            view: View::Library,
            view_title: String::new(),
            tracks: Vec::new(),
            labels: Vec::new(),
            lower_labels: None,
            selected: 0,
            input: InputMode::Normal,
            filter_query: String::new(),
            name_input: String::new(),
            follow_playback: true,
            metadata_window: false,
            target_playlist: library.playlists().first().map(|p| p.id.clone()),
            status_message: None,
        };
        app.refresh(library, ui);
        app
    }

    /// Rebuild the rows of the current view from `library`, keeping the
    /// selected track selected when it is still there.
    pub fn refresh(&mut self, library: &Library, ui: &UiSettings) {
        let view = self.view.clone();
        let (title, tracks) = match &view {
            View::Library => (" library ".to_string(), library.tracks().to_vec()),
            View::Favorites => (" favorites ".to_string(), library.favorites()),
            View::Playlist(id) => match library.playlist(id) {
                Some(p) => (format!(" playlist: {} ", p.name), library.playlist_tracks(id)),
                None => {
                    self.view = View::Library;
                    (" library ".to_string(), library.tracks().to_vec())
                }
            },
        };

        let keep = self.selected_track().map(|t| t.id.clone());
        self.set_rows(title, tracks, ui);
        match keep.and_then(|id| self.row_of(&id)) {
            Some(i) => self.selected = i,
            None => self.selected = self.selected.min(self.tracks.len().saturating_sub(1)),
        }
        self.ensure_selected_visible();

        if let Some(target) = &self.target_playlist {
            if library.playlist(target).is_none() {
                self.target_playlist = library.playlists().first().map(|p| p.id.clone());
            }
        }
    }

    fn set_rows(&mut self, title: String, tracks: Vec<Track>, ui: &UiSettings) {
        self.labels = tracks
            .iter()
            .map(|t| display_from_fields(t, &ui.list_fields, &ui.list_separator))
            .collect();
        // Optimization: for larger libraries, precompute lowercase labels to speed up fuzzy
        // filtering (avoid per-char lowercase conversions on every redraw/keystroke).
        self.lower_labels = if tracks.len() > 100 {
            Some(self.labels.iter().map(|l| l.to_ascii_lowercase()).collect())
        } else {
            None
        };
        self.tracks = tracks;
        self.view_title = title;
    }

    /// Move to the next view: library, favorites, then each playlist.
    pub fn cycle_view(&mut self, library: &Library, ui: &UiSettings) {
        let playlists = library.playlists();
        self.view = match &self.view {
            View::Library => View::Favorites,
            View::Favorites => playlists
                .first()
                .map(|p| View::Playlist(p.id.clone()))
                .unwrap_or(View::Library),
            View::Playlist(id) => {
                let pos = playlists.iter().position(|p| &p.id == id);
                pos.and_then(|i| playlists.get(i + 1))
                    .map(|p| View::Playlist(p.id.clone()))
                    .unwrap_or(View::Library)
            }
        };
        if let View::Playlist(id) = &self.view {
            self.target_playlist = Some(id.clone());
        }
        self.filter_query.clear();
        self.selected = 0;
        self.refresh(library, ui);
    }

    /// Show the playlist `id`.
    pub fn show_playlist(&mut self, id: &str, library: &Library, ui: &UiSettings) {
        self.view = View::Playlist(id.to_string());
        self.target_playlist = Some(id.to_string());
        self.filter_query.clear();
        self.selected = 0;
        self.refresh(library, ui);
    }

    /// Id of the playlist on screen, if any.
    pub fn current_playlist(&self) -> Option<&str> {
        match &self.view {
            View::Playlist(id) => Some(id),
            _ => None,
        }
    }

    pub fn label(&self, row: usize) -> &str {
        self.labels.get(row).map(String::as_str).unwrap_or("")
    }

    pub fn selected_track(&self) -> Option<&Track> {
        self.tracks.get(self.selected)
    }

    fn row_of(&self, track_id: &str) -> Option<usize> {
        self.tracks.iter().position(|t| t.id == track_id)
    }

    /// The visible rows and the selected position among them, for starting
    /// playback from the selection.
    pub fn queue_from_selection(&self) -> Option<(Vec<Track>, usize)> {
        let display = self.display_indices();
        let start = display.iter().position(|&i| i == self.selected)?;
        let queue = display.iter().map(|&i| self.tracks[i].clone()).collect();
        Some((queue, start))
    }

    /// Move the cursor onto the playing track when following playback.
    pub fn follow(&mut self, playing_id: Option<&str>) {
        if !self.follow_playback || self.input == InputMode::Filter {
            return;
        }
        if let Some(i) = playing_id.and_then(|id| self.row_of(id)) {
            if self.display_indices().contains(&i) {
                self.selected = i;
            }
        }
    }

    pub fn toggle_metadata_window(&mut self) {
        self.metadata_window = !self.metadata_window;
    }

    /// Let the cursor track the playing row again.
    pub fn follow_playback_on(&mut self) {
        self.follow_playback = true;
    }

    pub fn follow_playback_off(&mut self) {
        self.follow_playback = false;
    }

    pub fn set_status(&mut self, msg: impl Into<String>) {
        self.status_message = Some(msg.into());
    }

    /// Rows that survive the filter, in view order.
    pub fn display_indices(&self) -> Vec<usize> {
        let query = self.filter_query.trim();
        if query.is_empty() {
            return (0..self.tracks.len()).collect();
        }
        let query_lower = query.to_ascii_lowercase();
        (0..self.tracks.len())
            .filter(|&row| self.fuzzy_match_positions_for_row_lower(row, &query_lower).is_some())
            .collect()
    }

    /// Whether lowercase labels were precomputed for this view.
    pub fn uses_lower_labels(&self) -> bool {
        self.lower_labels.is_some()
    }

    /// Match positions of an already lowercased query in `row`'s label.
    pub fn fuzzy_match_positions_for_row_lower(
        &self,
        row: usize,
        query_lower: &str,
    ) -> Option<Vec<usize>> {
        match self.lower_labels.as_deref() {
            Some(lower) => fuzzy::positions(&lower[row], query_lower, |c| c),
            None => Self::fuzzy_match_positions(self.label(row), query_lower),
        }
    }

    /// Case-insensitive subsequence match of `query` in `title`.
    pub fn fuzzy_match_positions(title: &str, query: &str) -> Option<Vec<usize>> {
        fuzzy::positions(title, query, |c| c.to_ascii_lowercase())
    }

    /// The visible row after `current`, wrapping. A row that is filtered out
    /// steps to the first visible one.
    pub fn next_in_view_from(&self, current: usize) -> Option<usize> {
        self.step_in_view(current, true)
    }

    /// The visible row before `current`, wrapping. A row that is filtered
    /// out steps to the last visible one.
    pub fn prev_in_view_from(&self, current: usize) -> Option<usize> {
        self.step_in_view(current, false)
    }

    fn step_in_view(&self, current: usize, forward: bool) -> Option<usize> {
        let display = self.display_indices();
        let len = display.len();
        if len == 0 {
            return None;
        }
        let pos = match (display.iter().position(|&i| i == current), forward) {
            (Some(p), true) => (p + 1) % len,
            (Some(p), false) => (p + len - 1) % len,
            (None, true) => 0,
            (None, false) => len - 1,
        };
        Some(display[pos])
    }

    pub fn set_selected(&mut self, idx: usize) {
        self.selected = idx;
        self.ensure_selected_visible();
    }

    /// Start filtering; the cursor stops following playback meanwhile.
    pub fn enter_filter_mode(&mut self) {
        self.input = InputMode::Filter;
        self.follow_playback_off();
        self.ensure_selected_visible();
    }

    /// Leave filter mode, keeping the query applied.
    pub fn exit_filter_mode(&mut self) {
        self.input = InputMode::Normal;
    }

    pub fn clear_filter(&mut self) {
        self.filter_query.clear();
        self.input = InputMode::Normal;
        self.ensure_selected_visible();
    }

    pub fn push_filter_char(&mut self, c: char) {
        self.filter_query.push(c);
        self.ensure_selected_visible();
    }

    pub fn pop_filter_char(&mut self) {
        self.filter_query.pop();
        self.ensure_selected_visible();
    }

    /// Start typing a playlist name. Renaming starts from the current name.
    pub fn begin_name_input(&mut self, mode: InputMode, initial: &str) {
        self.input = mode;
        self.name_input = initial.to_string();
    }

    /// Finish name input, returning the mode it was for and the typed text.
    pub fn take_name_input(&mut self) -> (InputMode, String) {
        let mode = std::mem::take(&mut self.input);
        (mode, std::mem::take(&mut self.name_input))
    }

    /// Keep the cursor on a visible row: the first one when the current row
    /// was filtered out.
    fn ensure_selected_visible(&mut self) {
        let display = self.display_indices();
        match display.first() {
            None => self.selected = 0,
            Some(&first) if !display.contains(&self.selected) => self.selected = first,
            Some(_) => {}
        }
    }

    pub fn next(&mut self) {
        if let Some(row) = self.next_in_view_from(self.selected) {
            self.selected = row;
        }
    }

    pub fn prev(&mut self) {
        if let Some(row) = self.prev_in_view_from(self.selected) {
            self.selected = row;
        }
    }
}
