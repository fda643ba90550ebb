//! MPRIS bridge: exposes playback on the session bus.
//!
//! Every request from the bus becomes a [`ControlCmd`] on the same channel
//! the keyboard handler feeds, so the runtime loop is the only place the
//! controller is driven from. Bus-facing state is a snapshot the runtime
//! pushes through [`MprisHandle`].

use std::collections::HashMap;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};

use async_io::block_on;
use tracing::{debug, info, warn};
use zbus::object_server::SignalEmitter;
use zbus::{Connection, interface};
use zvariant::{ObjectPath, OwnedObjectPath, OwnedValue, Value};

use crate::app::PlaybackState;
use crate::library::Track;
use crate::player::{RepeatMode, TransportSnapshot};

const OBJECT_PATH: &str = "/org/mpris/MediaPlayer2";
const BUS_NAME: &str = "org.mpris.MediaPlayer2.tapedeck";
const TRACK_PATH_PREFIX: &str = "/org/tapedeck/track/";
const NO_TRACK_PATH: &str = "/org/mpris/MediaPlayer2/TrackList/NoTrack";

#[derive(Clone, Debug, PartialEq)]
pub enum ControlCmd {
    Quit,
    Play,
    Pause,
    PlayPause,
    Stop,
    Next,
    Prev,
    /// Relative seek in microseconds.
    Seek(i64),
    /// Absolute position in microseconds.
    SetPosition(i64),
    SetShuffle(bool),
    SetRepeat(RepeatMode),
}

#[derive(Debug, Default)]
struct SharedState {
    playback: PlaybackState,
    title: Option<String>,
    artist: Vec<String>,
    album: Option<String>,
    art_url: Option<String>,
    length_micros: Option<i64>,
    position_micros: i64,
    track_id: Option<OwnedObjectPath>,
    shuffle: bool,
    loop_status: RepeatMode,
}

enum Notify {
    Changed,
    Seeked(i64),
}

pub struct MprisHandle {
    state: Arc<Mutex<SharedState>>,
    notify: Sender<Notify>,
}

impl MprisHandle {
    /// Push the transport state to the bus. Property change signals go out
    /// only when something other than the position changed.
    pub fn update(&self, snapshot: &TransportSnapshot) {
        let Ok(mut s) = self.state.lock() else {
            return;
        };
        s.position_micros = seconds_to_micros(snapshot.position);

        let playback = PlaybackState::of(snapshot);
        let track_id = snapshot.track.as_ref().and_then(track_object_path);
        let changed = s.playback != playback
            || s.track_id != track_id
            || s.shuffle != snapshot.shuffle
            || s.loop_status != snapshot.repeat
            || s.length_micros != length_micros(snapshot);
        if !changed {
            return;
        }

        s.playback = playback;
        s.shuffle = snapshot.shuffle;
        s.loop_status = snapshot.repeat;
        fill_track(&mut s, snapshot.track.as_ref());
        s.length_micros = length_micros(snapshot);
        s.track_id = track_id;
        drop(s);

        let _ = self.notify.send(Notify::Changed);
    }

    /// Tell clients the position jumped.
    pub fn seeked(&self, position_seconds: f64) {
        let micros = seconds_to_micros(position_seconds);
        if let Ok(mut s) = self.state.lock() {
            s.position_micros = micros;
        }
        let _ = self.notify.send(Notify::Seeked(micros));
    }

    /// A handle with no bus behind it.
    #[cfg(test)]
    pub(crate) fn detached() -> Self {
        let (notify, _rx) = mpsc::channel();
        Self {
            state: Arc::new(Mutex::new(SharedState::default())),
            notify,
        }
    }
}

fn fill_track(s: &mut SharedState, track: Option<&Track>) {
    match track {
        Some(t) => {
            s.title = Some(t.title.clone());
            s.artist = vec![t.artist.clone()];
            s.album = t.album.clone();
            s.art_url = t.cover_art.clone();
        }
        None => {
            s.title = None;
            s.artist = Vec::new();
            s.album = None;
            s.art_url = None;
        }
    }
}

fn seconds_to_micros(seconds: f64) -> i64 {
    (seconds.max(0.0) * 1_000_000.0).round() as i64
}

fn length_micros(snapshot: &TransportSnapshot) -> Option<i64> {
    let seconds = match &snapshot.track {
        _ if snapshot.duration > 0.0 => snapshot.duration,
        Some(track) if track.has_duration() => track.duration,
        _ => 0.0,
    };
    (seconds > 0.0).then(|| seconds_to_micros(seconds))
}

/// Object path naming `track` on the bus. Track ids are UUIDs, whose dashes
/// are not allowed in path elements.
fn track_object_path(track: &Track) -> Option<OwnedObjectPath> {
    let element = track.id.replace('-', "_");
    OwnedObjectPath::try_from(format!("{TRACK_PATH_PREFIX}{element}")).ok()
}

fn loop_status_str(mode: RepeatMode) -> &'static str {
    match mode {
        RepeatMode::None => "None",
        RepeatMode::One => "Track",
        RepeatMode::All => "Playlist",
    }
}

fn parse_loop_status(s: &str) -> Option<RepeatMode> {
    match s {
        "None" => Some(RepeatMode::None),
        "Track" => Some(RepeatMode::One),
        "Playlist" => Some(RepeatMode::All),
        _ => None,
    }
}

fn owned<'a>(v: impl Into<Value<'a>>) -> Option<OwnedValue> {
    OwnedValue::try_from(v.into()).ok()
}

struct RootIface {
    tx: Sender<ControlCmd>,
}

#[interface(name = "org.mpris.MediaPlayer2")]
impl RootIface {
    fn raise(&self) {
        // Nothing to bring forward in a terminal.
    }

    fn quit(&self) {
        let _ = self.tx.send(ControlCmd::Quit);
    }

    #[zbus(property)]
    fn can_quit(&self) -> bool {
        true
    }

    #[zbus(property)]
    fn can_raise(&self) -> bool {
        false
    }

    #[zbus(property)]
    fn has_track_list(&self) -> bool {
        false
    }

    #[zbus(property)]
    fn identity(&self) -> &str {
        "tapedeck"
    }

    #[zbus(property)]
    fn supported_uri_schemes(&self) -> Vec<String> {
        vec![]
    }

    #[zbus(property)]
    fn supported_mime_types(&self) -> Vec<String> {
        vec![]
    }
}

struct PlayerIface {
    tx: Sender<ControlCmd>,
    state: Arc<Mutex<SharedState>>,
}

#[interface(name = "org.mpris.MediaPlayer2.Player")]
impl PlayerIface {
    fn next(&self) {
        let _ = self.tx.send(ControlCmd::Next);
    }

    fn previous(&self) {
        let _ = self.tx.send(ControlCmd::Prev);
    }

    fn play(&self) {
        let _ = self.tx.send(ControlCmd::Play);
    }

    fn pause(&self) {
        let _ = self.tx.send(ControlCmd::Pause);
    }

    fn play_pause(&self) {
        let _ = self.tx.send(ControlCmd::PlayPause);
    }

    fn stop(&self) {
        let _ = self.tx.send(ControlCmd::Stop);
    }

    fn seek(&self, offset: i64) {
        let _ = self.tx.send(ControlCmd::Seek(offset));
    }

    /// Ignored unless `track_id` names the current track.
    fn set_position(&self, track_id: OwnedObjectPath, position: i64) {
        let current = self.state.lock().ok().and_then(|s| s.track_id.clone());
        if current.as_ref() == Some(&track_id) && position >= 0 {
            let _ = self.tx.send(ControlCmd::SetPosition(position));
        }
    }

    #[zbus(signal)]
    async fn seeked(emitter: &SignalEmitter<'_>, position: i64) -> zbus::Result<()>;

    #[zbus(property)]
    fn playback_status(&self) -> &str {
        let Ok(s) = self.state.lock() else {
            return "Stopped";
        };
        match s.playback {
            PlaybackState::Stopped => "Stopped",
            PlaybackState::Playing => "Playing",
            PlaybackState::Paused => "Paused",
        }
    }

    #[zbus(property)]
    fn loop_status(&self) -> &str {
        self.state
            .lock()
            .map(|s| loop_status_str(s.loop_status))
            .unwrap_or("None")
    }

    #[zbus(property)]
    fn set_loop_status(&mut self, value: String) {
        match parse_loop_status(&value) {
            Some(mode) => {
                let _ = self.tx.send(ControlCmd::SetRepeat(mode));
            }
            None => debug!(%value, "ignoring unknown loop status"),
        }
    }

    #[zbus(property)]
    fn shuffle(&self) -> bool {
        self.state.lock().map(|s| s.shuffle).unwrap_or(false)
    }

    #[zbus(property)]
    fn set_shuffle(&mut self, value: bool) {
        let _ = self.tx.send(ControlCmd::SetShuffle(value));
    }

    #[zbus(property(emits_changed_signal = "false"))]
    fn position(&self) -> i64 {
        self.state.lock().map(|s| s.position_micros).unwrap_or(0)
    }

    #[zbus(property)]
    fn rate(&self) -> f64 {
        1.0
    }

    #[zbus(property)]
    fn minimum_rate(&self) -> f64 {
        1.0
    }

    #[zbus(property)]
    fn maximum_rate(&self) -> f64 {
        1.0
    }

    #[zbus(property)]
    fn can_control(&self) -> bool {
        true
    }

    #[zbus(property)]
    fn can_play(&self) -> bool {
        true
    }

    #[zbus(property)]
    fn can_pause(&self) -> bool {
        true
    }

    #[zbus(property)]
    fn can_seek(&self) -> bool {
        self.state.lock().map(|s| s.track_id.is_some()).unwrap_or(false)
    }

    #[zbus(property)]
    fn can_go_next(&self) -> bool {
        true
    }

    #[zbus(property)]
    fn can_go_previous(&self) -> bool {
        true
    }

    #[zbus(property)]
    fn metadata(&self) -> HashMap<String, OwnedValue> {
        let mut map = HashMap::new();
        let Ok(s) = self.state.lock() else {
            return map;
        };

        let track_id = s
            .track_id
            .clone()
            .map(OwnedObjectPath::into_inner)
            .unwrap_or_else(|| ObjectPath::from_static_str_unchecked(NO_TRACK_PATH));
        if let Some(v) = owned(track_id) {
            map.insert("mpris:trackid".to_string(), v);
        }
        if let Some(v) = s.title.clone().and_then(owned) {
            map.insert("xesam:title".to_string(), v);
        }
        if !s.artist.is_empty() {
            if let Some(v) = owned(s.artist.clone()) {
                map.insert("xesam:artist".to_string(), v);
            }
        }
        if let Some(v) = s.album.clone().and_then(owned) {
            map.insert("xesam:album".to_string(), v);
        }
        if let Some(v) = s.length_micros.and_then(owned) {
            map.insert("mpris:length".to_string(), v);
        }
        if let Some(v) = s.art_url.clone().and_then(owned) {
            map.insert("mpris:artUrl".to_string(), v);
        }
        map
    }
}

pub fn spawn_mpris(tx: Sender<ControlCmd>) -> MprisHandle {
    let state = Arc::new(Mutex::new(SharedState::default()));
    let (notify_tx, notify_rx) = mpsc::channel::<Notify>();

    let state_for_thread = state.clone();
    let spawned = std::thread::Builder::new()
        .name("mpris".to_string())
        .spawn(move || {
            block_on(async move {
                if let Err(e) = serve(tx, state_for_thread, notify_rx).await {
                    warn!(error = %e, "MPRIS unavailable");
                }
            });
        });
    if let Err(e) = spawned {
        warn!(error = %e, "failed to start MPRIS thread");
    }

    MprisHandle {
        state,
        notify: notify_tx,
    }
}

async fn serve(
    tx: Sender<ControlCmd>,
    state: Arc<Mutex<SharedState>>,
    notify_rx: Receiver<Notify>,
) -> zbus::Result<()> {
    let connection = Connection::session().await?;
    connection.request_name(BUS_NAME).await?;

    let object_server = connection.object_server();
    object_server
        .at(OBJECT_PATH, RootIface { tx: tx.clone() })
        .await?;
    object_server
        .at(OBJECT_PATH, PlayerIface { tx, state })
        .await?;
    info!(name = BUS_NAME, "MPRIS registered");

    let player = object_server
        .interface::<_, PlayerIface>(OBJECT_PATH)
        .await?;

    // Requests are dispatched by the connection's own executor; this thread
    // only forwards change notifications until the handle is dropped.
    while let Ok(event) = notify_rx.recv() {
        let emitter = player.signal_emitter();
        let result = match event {
            Notify::Changed => {
                let iface = player.get().await;
                emit_changed(&iface, emitter).await
            }
            Notify::Seeked(micros) => PlayerIface::seeked(emitter, micros).await,
        };
        if let Err(e) = result {
            debug!(error = %e, "failed to emit MPRIS signal");
        }
    }
    Ok(())
}

async fn emit_changed(iface: &PlayerIface, emitter: &SignalEmitter<'_>) -> zbus::Result<()> {
    iface.playback_status_changed(emitter).await?;
    iface.metadata_changed(emitter).await?;
    iface.loop_status_changed(emitter).await?;
    iface.shuffle_changed(emitter).await?;
    iface.can_seek_changed(emitter).await
}
