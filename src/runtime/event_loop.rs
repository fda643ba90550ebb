use std::sync::mpsc::{Receiver, Sender};
use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{Terminal, backend::CrosstermBackend};
use tracing::{debug, warn};

use crate::app::{App, InputMode};
use crate::audio::{AudioOutput, EngineEvent};
use crate::config;
use crate::error::StoreResult;
use crate::library::Library;
use crate::mpris::{ControlCmd, MprisHandle};
use crate::player::Controller;
use crate::runtime::mpris_sync;
use crate::ui;

/// Everything the event loop drives. Keyboard and MPRIS commands both end
/// up in [`Session::handle_control_cmd`], so the controller has one owner.
pub struct Session<O: AudioOutput> {
    pub settings: config::Settings,
    pub app: App,
    pub library: Library,
    pub controller: Controller<O>,
    pub mpris: MprisHandle,
    pub control_tx: Sender<ControlCmd>,
    /// Internal two-key prefix state used for `gg` handling.
    pending_gg: bool,
}

impl<O: AudioOutput> Session<O> {
    pub fn new(
        settings: config::Settings,
        library: Library,
        controller: Controller<O>,
        mpris: MprisHandle,
        control_tx: Sender<ControlCmd>,
    ) -> Self {
        let app = App::new(&library, &settings.ui);
        Self {
            settings,
            app,
            library,
            controller,
            mpris,
            control_tx,
            pending_gg: false,
        }
    }

    /// Let the engine check its output and apply what it reported.
    pub fn pump_engine(&mut self, events: &Receiver<EngineEvent>) {
        self.controller.poll();
        let mut corrected = false;
        for event in events.try_iter() {
            if let Some(correction) = self.controller.handle_event(event) {
                self.library.apply_duration(&correction);
                corrected = true;
            }
        }
        if corrected {
            self.refresh();
        }

        let playing = self.controller.current_track().map(|t| t.id.clone());
        self.app.follow(playing.as_deref());
        mpris_sync::update_mpris(&self.mpris, &self.controller);
    }

    /// Apply one transport command. Returns true when shutdown is requested.
    pub fn handle_control_cmd(&mut self, cmd: ControlCmd) -> bool {
        debug!(?cmd, "control command");
        match cmd {
            ControlCmd::Quit => return true,
            ControlCmd::Play => {
                self.follow_unless_filtering();
                if self.controller.current_track().is_some() {
                    self.controller.play();
                } else {
                    self.play_selection();
                }
            }
            ControlCmd::Pause => self.controller.pause(),
            ControlCmd::PlayPause => {
                self.follow_unless_filtering();
                if self.controller.current_track().is_some() {
                    self.controller.toggle_play();
                } else {
                    self.play_selection();
                }
            }
            ControlCmd::Stop => {
                self.follow_unless_filtering();
                self.controller.stop();
                mpris_sync::announce_seek(&self.mpris, &self.controller);
            }
            ControlCmd::Next => {
                self.follow_unless_filtering();
                self.controller.next();
            }
            ControlCmd::Prev => {
                self.follow_unless_filtering();
                self.controller.prev();
            }
            ControlCmd::Seek(offset) => {
                self.controller.seek_by(micros_to_seconds(offset));
                mpris_sync::announce_seek(&self.mpris, &self.controller);
            }
            ControlCmd::SetPosition(position) => {
                self.controller.seek(micros_to_seconds(position));
                mpris_sync::announce_seek(&self.mpris, &self.controller);
            }
            ControlCmd::SetShuffle(on) => self.controller.set_shuffle(on),
            ControlCmd::SetRepeat(mode) => self.controller.set_repeat(mode),
        }
        mpris_sync::update_mpris(&self.mpris, &self.controller);
        false
    }

    /// Handle one key press. Returns true when shutdown is requested.
    pub fn handle_key_event(&mut self, key: KeyEvent) -> bool {
        match self.app.input {
            InputMode::Filter => {
                self.pending_gg = false;
                self.handle_filter_key(key);
                false
            }
            InputMode::NewPlaylist | InputMode::RenamePlaylist => {
                self.pending_gg = false;
                self.handle_name_key(key);
                false
            }
            InputMode::Normal => self.handle_normal_key(key),
        }
    }

    fn handle_filter_key(&mut self, key: KeyEvent) {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Esc => self.app.clear_filter(),
            KeyCode::Backspace => self.app.pop_filter_char(),
            KeyCode::Char('j') | KeyCode::Char('n') if ctrl => {
                self.app.follow_playback_off();
                self.app.next();
            }
            KeyCode::Char('k') | KeyCode::Char('p') if ctrl => {
                self.app.follow_playback_off();
                self.app.prev();
            }
            KeyCode::Char(c) if !c.is_control() => self.app.push_filter_char(c),
            KeyCode::Enter => {
                if self.app.display_indices().is_empty() {
                    return;
                }
                self.app.exit_filter_mode();
                self.app.follow_playback_on();
                self.play_selection();
            }
            _ => {}
        }
    }

    fn handle_name_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => {
                self.app.take_name_input();
            }
            KeyCode::Backspace => {
                self.app.name_input.pop();
            }
            KeyCode::Char(c) if !c.is_control() => self.app.name_input.push(c),
            KeyCode::Enter => {
                let (mode, name) = self.app.take_name_input();
                match mode {
                    InputMode::NewPlaylist => self.create_playlist(&name),
                    InputMode::RenamePlaylist => self.rename_playlist(&name),
                    InputMode::Normal | InputMode::Filter => {}
                }
            }
            _ => {}
        }
    }

    fn handle_normal_key(&mut self, key: KeyEvent) -> bool {
        if key.code != KeyCode::Char('g') {
            self.pending_gg = false;
        }

        match key.code {
            KeyCode::Char('q') => return true,
            KeyCode::Esc => self.app.metadata_window = false,
            KeyCode::Char('/') => self.app.enter_filter_mode(),
            KeyCode::Char('g') => {
                if self.pending_gg {
                    self.pending_gg = false;
                    self.app.follow_playback_off();
                    if let Some(&first) = self.app.display_indices().first() {
                        self.app.set_selected(first);
                    }
                } else {
                    self.pending_gg = true;
                }
            }
            KeyCode::Char('G') => {
                self.app.follow_playback_off();
                if let Some(&last) = self.app.display_indices().last() {
                    self.app.set_selected(last);
                }
            }
            KeyCode::Char('j') | KeyCode::Down => {
                self.app.follow_playback_off();
                self.app.next();
            }
            KeyCode::Char('k') | KeyCode::Up => {
                self.app.follow_playback_off();
                self.app.prev();
            }
            KeyCode::Enter => {
                self.app.follow_playback_on();
                self.play_selection();
            }
            KeyCode::Char('p') | KeyCode::Char(' ') => self.send(ControlCmd::PlayPause),
            KeyCode::Char('l') => self.send(ControlCmd::Next),
            KeyCode::Char('h') => self.send(ControlCmd::Prev),
            KeyCode::Char('L') => self.scrub(1.0),
            KeyCode::Char('H') => self.scrub(-1.0),
            KeyCode::Char('s') => self.send(ControlCmd::SetShuffle(!self.controller.shuffle())),
            KeyCode::Char('r') => self.send(ControlCmd::SetRepeat(self.controller.repeat().cycle())),
            KeyCode::Char('K') => self.app.toggle_metadata_window(),
            KeyCode::Char('v') => self.app.cycle_view(&self.library, &self.settings.ui),
            KeyCode::Char('f') => self.toggle_favorite(),
            KeyCode::Char('D') => self.delete_selected_track(),
            KeyCode::Char('a') => self.add_selected_to_playlist(),
            KeyCode::Char('x') => self.remove_selected_from_playlist(),
            KeyCode::Char('N') => self.app.begin_name_input(InputMode::NewPlaylist, ""),
            KeyCode::Char('R') => {
                let name = self
                    .app
                    .current_playlist()
                    .and_then(|id| self.library.playlist(id))
                    .map(|p| p.name.clone());
                match name {
                    Some(name) => self.app.begin_name_input(InputMode::RenamePlaylist, &name),
                    None => self.app.set_status("open a playlist (v) to rename it"),
                }
            }
            KeyCode::Char('X') => self.delete_current_playlist(),
            _ => {}
        }
        false
    }

    /// Replace the queue with the visible rows and play from the cursor.
    fn play_selection(&mut self) {
        let Some((queue, start)) = self.app.queue_from_selection() else {
            return;
        };
        self.controller.set_queue_and_play(queue, start);
        mpris_sync::update_mpris(&self.mpris, &self.controller);
    }

    fn scrub(&mut self, direction: f64) {
        let seconds = self.settings.controls.scrub_seconds as f64 * direction;
        self.send(ControlCmd::Seek((seconds * 1_000_000.0) as i64));
    }

    fn toggle_favorite(&mut self) {
        let Some(track) = self.app.selected_track() else {
            return;
        };
        let (id, title) = (track.id.clone(), track.title.clone());
        let result = self.library.toggle_favorite(&id);
        match self.report(result).flatten() {
            Some(true) => self.app.set_status(format!("★ {title}")),
            Some(false) => self.app.set_status(format!("unstarred {title}")),
            None => {}
        }
        self.refresh();
    }

    fn delete_selected_track(&mut self) {
        let Some(track) = self.app.selected_track() else {
            return;
        };
        let (id, title) = (track.id.clone(), track.title.clone());
        let result = self.library.delete_track(&id, &mut self.controller);
        if let Some(true) = self.report(result) {
            self.app.set_status(format!("deleted {title}"));
        }
        self.refresh();
    }

    fn add_selected_to_playlist(&mut self) {
        let Some(playlist_id) = self.app.target_playlist.clone() else {
            self.app.set_status("no playlist yet: press N to create one");
            return;
        };
        let Some(track_id) = self.app.selected_track().map(|t| t.id.clone()) else {
            return;
        };
        let result = self.library.add_to_playlist(&playlist_id, &track_id);
        let added = self.report(result);
        let name = self
            .library
            .playlist(&playlist_id)
            .map(|p| p.name.clone())
            .unwrap_or_default();
        match added {
            Some(true) => self.app.set_status(format!("added to {name}")),
            Some(false) => self.app.set_status(format!("already in {name}")),
            None => {}
        }
        self.refresh();
    }

    fn remove_selected_from_playlist(&mut self) {
        let Some(playlist_id) = self.app.current_playlist().map(str::to_string) else {
            return;
        };
        let Some(track_id) = self.app.selected_track().map(|t| t.id.clone()) else {
            return;
        };
        let result = self.library.remove_from_playlist(&playlist_id, &track_id);
        self.report(result);
        self.refresh();
    }

    fn create_playlist(&mut self, name: &str) {
        let result = self.library.create_playlist(name);
        match self.report(result) {
            Some(Some(id)) => {
                self.app
                    .show_playlist(&id, &self.library, &self.settings.ui);
                self.app.set_status(format!("created {}", name.trim()));
            }
            Some(None) => self.app.set_status("playlist name cannot be empty"),
            None => {}
        }
    }

    fn rename_playlist(&mut self, name: &str) {
        let Some(id) = self.app.current_playlist().map(str::to_string) else {
            return;
        };
        let result = self.library.rename_playlist(&id, name);
        if let Some(false) = self.report(result) {
            self.app.set_status("playlist name cannot be empty");
        }
        self.refresh();
    }

    fn delete_current_playlist(&mut self) {
        let Some(id) = self.app.current_playlist().map(str::to_string) else {
            return;
        };
        let result = self.library.delete_playlist(&id);
        if let Some(true) = self.report(result) {
            self.app.set_status("playlist deleted");
        }
        self.refresh();
    }

    fn refresh(&mut self) {
        self.app.refresh(&self.library, &self.settings.ui);
    }

    /// Surface a storage failure on the status line. Memory already holds
    /// the change, so there is nothing to undo.
    fn report<T>(&mut self, result: StoreResult<T>) -> Option<T> {
        match result {
            Ok(v) => Some(v),
            Err(e) => {
                warn!(error = %e, "library update not saved");
                self.app.set_status(format!("not saved: {e}"));
                None
            }
        }
    }

    fn follow_unless_filtering(&mut self) {
        if self.app.input != InputMode::Filter {
            self.app.follow_playback_on();
        }
    }

    fn send(&self, cmd: ControlCmd) {
        // The receiver lives as long as the loop.
        let _ = self.control_tx.send(cmd);
    }
}

fn micros_to_seconds(micros: i64) -> f64 {
    micros as f64 / 1_000_000.0
}

/// Main terminal event loop: handles input, UI drawing, engine events and
/// MPRIS. Returns `Ok(())` when shutdown is requested.
pub fn run<O: AudioOutput>(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    session: &mut Session<O>,
    engine_rx: &Receiver<EngineEvent>,
    control_rx: &Receiver<ControlCmd>,
) -> Result<(), Box<dyn std::error::Error>> {
    loop {
        session.pump_engine(engine_rx);

        let snapshot = session.controller.snapshot();
        let display = session.app.display_indices();
        terminal.draw(|f| {
            ui::draw(
                f,
                &session.app,
                &session.library,
                &snapshot,
                &display,
                &session.settings.ui,
                &session.settings.controls,
            )
        })?;

        while let Ok(cmd) = control_rx.try_recv() {
            if session.handle_control_cmd(cmd) {
                return Ok(());
            }
        }

        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                if session.handle_key_event(key) {
                    return Ok(());
                }
            }
        }
    }
}
