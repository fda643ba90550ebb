use std::sync::Arc;
use std::sync::mpsc::{self, Receiver};
use std::time::Duration;

use rand::SeedableRng;
use rand::rngs::StdRng;

use super::*;
use crate::audio::fake::FakeOutput;
use crate::audio::{EngineEvent, PlaybackEngine};
use crate::config::PlaybackSettings;
use crate::library::{Track, TrackMetadata};
use crate::store::{SessionState, Store, StoreWriter};

fn t(title: &str) -> Track {
    Track::new(
        TrackMetadata {
            title: title.into(),
            artist: "Artist".into(),
            album: None,
            cover_art: None,
        },
        60.0,
        Arc::from(title.as_bytes().to_vec()),
    )
}

fn tracks(n: usize) -> Vec<Track> {
    (0..n).map(|i| t(&format!("T{i}"))).collect()
}

struct Rig {
    ctl: Controller<FakeOutput>,
    output: FakeOutput,
    events: Receiver<EngineEvent>,
}

impl Rig {
    fn new() -> Self {
        Self::with_writer(None)
    }

    fn with_writer(writer: Option<StoreWriter>) -> Self {
        let output = FakeOutput::new();
        let (tx, rx) = mpsc::channel();
        let engine = PlaybackEngine::new(output.clone(), tx, Duration::ZERO);
        let mut ctl = Controller::new(engine, writer).with_rng(StdRng::seed_from_u64(7));
        ctl.restore(SessionState::default(), &PlaybackSettings::default(), &[]);
        Self {
            ctl,
            output,
            events: rx,
        }
    }

    /// Let the fake output reach the end and feed the engine's events back.
    fn finish_track(&mut self) {
        self.output.finish(Duration::from_secs(60));
        self.ctl.poll();
        let events: Vec<EngineEvent> = self.events.try_iter().collect();
        for ev in events {
            self.ctl.handle_event(ev);
        }
    }

    fn bound_title(&self) -> Option<String> {
        self.output
            .with(|s| s.bound.as_deref().map(|b| String::from_utf8_lossy(b).into_owned()))
    }
}

#[test]
fn set_queue_and_play_loads_and_plays_start_track() {
    let mut rig = Rig::new();
    assert!(rig.ctl.set_queue_and_play(tracks(3), 1));
    assert_eq!(rig.ctl.index(), Some(1));
    assert!(rig.ctl.is_playing());
    assert_eq!(rig.bound_title().as_deref(), Some("T1"));
    assert!(rig.output.with(|s| s.playing));
}

#[test]
fn set_queue_and_play_rejects_out_of_range_start() {
    let mut rig = Rig::new();
    assert!(!rig.ctl.set_queue_and_play(tracks(2), 2));
    assert!(!rig.ctl.set_queue_and_play(Vec::new(), 0));
    assert!(rig.ctl.queue().is_empty());
    assert_eq!(rig.ctl.index(), None);
}

#[test]
fn next_under_repeat_all_cycles_back_to_start() {
    for len in 1..=6 {
        for start in 0..len {
            let mut rig = Rig::new();
            rig.ctl.set_repeat(RepeatMode::All);
            rig.ctl.set_queue_and_play(tracks(len), start);
            for _ in 0..len {
                rig.ctl.next();
                assert!(rig.ctl.index().is_some_and(|i| i < len));
            }
            assert_eq!(rig.ctl.index(), Some(start), "len={len} start={start}");
            assert!(rig.ctl.is_playing());
        }
    }
}

#[test]
fn scenario_three_tracks_wraps_under_repeat_all() {
    let mut rig = Rig::new();
    rig.ctl.set_repeat(RepeatMode::All);
    rig.ctl.set_queue_and_play(vec![t("A"), t("B"), t("C")], 0);

    rig.ctl.next();
    assert_eq!(rig.ctl.index(), Some(1));
    rig.ctl.next();
    assert_eq!(rig.ctl.index(), Some(2));
    rig.ctl.next();
    assert_eq!(rig.ctl.index(), Some(0));
    assert_eq!(rig.bound_title().as_deref(), Some("A"));
}

#[test]
fn prev_from_first_wraps_to_last_for_any_length() {
    for len in 1..=5 {
        for repeat in [RepeatMode::None, RepeatMode::One, RepeatMode::All] {
            let mut rig = Rig::new();
            rig.ctl.set_repeat(repeat);
            rig.ctl.set_queue_and_play(tracks(len), 0);
            rig.ctl.pause();

            rig.ctl.prev();
            assert_eq!(rig.ctl.index(), Some(len - 1));
            assert!(rig.ctl.is_playing());
        }
    }
}

#[test]
fn repeat_one_never_changes_index() {
    for shuffle in [false, true] {
        let mut rig = Rig::new();
        rig.ctl.set_shuffle(shuffle);
        rig.ctl.set_repeat(RepeatMode::One);
        rig.ctl.set_queue_and_play(tracks(5), 3);

        for _ in 0..20 {
            rig.ctl.next();
            assert_eq!(rig.ctl.index(), Some(3));
            assert!(rig.ctl.is_playing());
        }
    }
}

#[test]
fn repeat_one_restarts_track_from_zero() {
    let mut rig = Rig::new();
    rig.ctl.set_repeat(RepeatMode::One);
    rig.ctl.set_queue_and_play(tracks(2), 0);
    rig.ctl.seek(30.0);
    assert_eq!(rig.ctl.position(), 30.0);

    rig.ctl.next();
    assert_eq!(rig.ctl.position(), 0.0);
    assert_eq!(rig.output.with(|s| s.position), Duration::ZERO);
    assert_eq!(rig.output.with(|s| s.binds), 2);
}

#[test]
fn repeat_none_stops_at_last_track() {
    let mut rig = Rig::new();
    rig.ctl.set_queue_and_play(tracks(4), 3);
    rig.ctl.next();
    assert_eq!(rig.ctl.index(), Some(3));
    assert!(!rig.ctl.is_playing());
    assert!(!rig.output.with(|s| s.playing));
}

#[test]
fn scenario_single_track_repeat_none_stops() {
    let mut rig = Rig::new();
    rig.ctl.set_queue_and_play(vec![t("A")], 0);
    rig.ctl.next();
    assert!(!rig.ctl.is_playing());
    assert_eq!(rig.ctl.index(), Some(0));
}

#[test]
fn shuffle_picks_indices_within_queue() {
    let mut rig = Rig::new();
    rig.ctl.set_shuffle(true);
    rig.ctl.set_queue_and_play(tracks(4), 0);

    let mut seen = [false; 4];
    for _ in 0..200 {
        rig.ctl.next();
        let i = rig.ctl.index().unwrap();
        assert!(i < 4);
        assert!(rig.ctl.is_playing());
        seen[i] = true;
    }
    assert!(seen.iter().all(|s| *s));
}

#[test]
fn shuffle_ignores_end_of_queue_under_repeat_none() {
    let mut rig = Rig::new();
    rig.ctl.set_shuffle(true);
    rig.ctl.set_queue_and_play(tracks(3), 2);
    for _ in 0..10 {
        rig.ctl.next();
        assert!(rig.ctl.is_playing());
    }
}

#[test]
fn ended_event_advances_the_queue() {
    let mut rig = Rig::new();
    rig.ctl.set_queue_and_play(vec![t("A"), t("B")], 0);

    rig.finish_track();
    assert_eq!(rig.ctl.index(), Some(1));
    assert!(rig.ctl.is_playing());
    assert_eq!(rig.bound_title().as_deref(), Some("B"));

    rig.finish_track();
    assert_eq!(rig.ctl.index(), Some(1));
    assert!(!rig.ctl.is_playing());
}

#[test]
fn play_after_the_queue_ran_out_starts_the_last_track_over() {
    let mut rig = Rig::new();
    rig.ctl.set_queue_and_play(vec![t("A")], 0);
    rig.finish_track();
    assert!(!rig.ctl.is_playing());

    rig.ctl.toggle_play();
    assert!(rig.ctl.is_playing());
    assert_eq!(rig.ctl.position(), 0.0);
    assert_eq!(rig.output.with(|s| (s.position, s.finished)), (Duration::ZERO, false));
    assert_eq!(rig.output.with(|s| s.binds), 2);
    assert_eq!(rig.bound_title().as_deref(), Some("A"));

    rig.output.finish(Duration::from_secs(60));
    rig.ctl.poll();
    let events: Vec<EngineEvent> = rig.events.try_iter().collect();
    assert!(events.contains(&EngineEvent::Ended));
}

#[test]
fn toggle_play_flips_engine_state() {
    let mut rig = Rig::new();
    rig.ctl.set_queue_and_play(tracks(2), 0);

    rig.ctl.toggle_play();
    assert!(!rig.ctl.is_playing());
    assert!(!rig.output.with(|s| s.playing));

    rig.ctl.toggle_play();
    assert!(rig.ctl.is_playing());
    assert!(rig.output.with(|s| s.playing));
}

#[test]
fn rejected_play_falls_back_to_paused() {
    let mut rig = Rig::new();
    rig.output.with(|s| s.reject_play = true);
    rig.ctl.set_queue_and_play(tracks(2), 0);
    assert_eq!(rig.ctl.index(), Some(0));
    assert!(!rig.ctl.is_playing());

    rig.ctl.toggle_play();
    assert!(!rig.ctl.is_playing());
}

#[test]
fn toggle_play_with_nothing_loaded_stays_paused() {
    let mut rig = Rig::new();
    rig.ctl.toggle_play();
    assert!(!rig.ctl.is_playing());
}

#[test]
fn stop_rewinds_but_keeps_track() {
    let mut rig = Rig::new();
    rig.ctl.set_queue_and_play(tracks(2), 1);
    rig.ctl.seek(20.0);
    rig.ctl.stop();
    assert_eq!(rig.ctl.index(), Some(1));
    assert!(!rig.ctl.is_playing());
    assert_eq!(rig.ctl.position(), 0.0);
}

#[test]
fn seek_by_moves_relative_and_clamps() {
    let mut rig = Rig::new();
    rig.ctl.set_queue_and_play(tracks(1), 0);
    rig.ctl.seek_by(10.0);
    assert_eq!(rig.ctl.position(), 10.0);
    rig.ctl.seek_by(-25.0);
    assert_eq!(rig.ctl.position(), 0.0);
    rig.ctl.seek_by(500.0);
    assert_eq!(rig.ctl.position(), 60.0);
}

#[test]
fn forgetting_the_active_track_stops_and_clears_index() {
    let mut rig = Rig::new();
    let queue = tracks(3);
    let active = queue[1].id.clone();
    rig.ctl.set_queue_and_play(queue, 1);

    rig.ctl.forget_track(&active);
    assert_eq!(rig.ctl.index(), None);
    assert!(!rig.ctl.is_playing());
    assert_eq!(rig.ctl.queue().len(), 2);
    assert!(rig.output.with(|s| s.bound.is_none()));
    assert_eq!(rig.ctl.engine().sources().live(), 0);
}

#[test]
fn forgetting_an_earlier_track_keeps_the_active_one() {
    let mut rig = Rig::new();
    let queue = tracks(3);
    let first = queue[0].id.clone();
    let active = queue[2].id.clone();
    rig.ctl.set_queue_and_play(queue, 2);

    rig.ctl.forget_track(&first);
    assert_eq!(rig.ctl.index(), Some(1));
    assert_eq!(rig.ctl.current_track().map(|t| t.id.clone()), Some(active));
    assert!(rig.ctl.is_playing());
}

#[test]
fn duration_learned_during_playback_updates_queue() {
    let mut rig = Rig::new();
    let mut a = t("A");
    a.duration = 0.0;
    let id = a.id.clone();
    rig.ctl.set_queue_and_play(vec![a], 0);

    let fix = rig.ctl.handle_event(EngineEvent::DurationKnown {
        track_id: id.clone(),
        seconds: 123.0,
    });
    assert_eq!(
        fix,
        Some(DurationCorrection {
            track_id: id,
            seconds: 123.0
        })
    );
    assert_eq!(rig.ctl.queue()[0].duration, 123.0);
}

#[test]
fn cycle_repeat_goes_none_all_one() {
    let mut rig = Rig::new();
    assert_eq!(rig.ctl.repeat(), RepeatMode::None);
    rig.ctl.cycle_repeat();
    assert_eq!(rig.ctl.repeat(), RepeatMode::All);
    rig.ctl.cycle_repeat();
    assert_eq!(rig.ctl.repeat(), RepeatMode::One);
    rig.ctl.cycle_repeat();
    assert_eq!(rig.ctl.repeat(), RepeatMode::None);
}

#[test]
fn nothing_is_persisted_before_restore() {
    let store = Store::open_in_memory().unwrap();
    let writer = StoreWriter::spawn(store.clone());

    let output = FakeOutput::new();
    let (tx, _rx) = mpsc::channel();
    let engine = PlaybackEngine::new(output, tx, Duration::ZERO);
    let mut ctl = Controller::new(engine, Some(writer.clone()));

    ctl.set_shuffle(true);
    ctl.set_repeat(RepeatMode::All);
    ctl.set_queue_and_play(tracks(2), 1);
    writer.flush();
    assert_eq!(store.load_session().unwrap(), SessionState::default());

    ctl.restore(SessionState::default(), &PlaybackSettings::default(), &[]);
    ctl.set_repeat(RepeatMode::One);
    ctl.next();
    writer.flush();
    let saved = store.load_session().unwrap();
    assert_eq!(saved.repeat, Some(RepeatMode::One));
    assert_eq!(saved.last_track_index, Some(1));
    assert_eq!(saved.shuffle, None);
    writer.shutdown();
}

#[test]
fn transitions_persist_index_and_modifiers() {
    let store = Store::open_in_memory().unwrap();
    let writer = StoreWriter::spawn(store.clone());
    let mut rig = Rig::with_writer(Some(writer.clone()));

    rig.ctl.set_queue_and_play(tracks(3), 0);
    rig.ctl.next();
    rig.ctl.toggle_shuffle();
    rig.ctl.set_repeat(RepeatMode::All);
    writer.flush();

    let saved = store.load_session().unwrap();
    assert_eq!(saved.last_track_index, Some(1));
    assert_eq!(saved.shuffle, Some(true));
    assert_eq!(saved.repeat, Some(RepeatMode::All));
    writer.shutdown();
}

#[test]
fn restore_applies_saved_state_and_loads_paused() {
    let output = FakeOutput::new();
    let (tx, _rx) = mpsc::channel();
    let engine = PlaybackEngine::new(output.clone(), tx, Duration::ZERO);
    let mut ctl = Controller::new(engine, None);

    let library = vec![t("A"), t("B"), t("C")];
    let session = SessionState {
        shuffle: Some(true),
        repeat: Some(RepeatMode::One),
        last_track_index: Some(2),
    };
    ctl.restore(session, &PlaybackSettings::default(), &library);

    assert!(ctl.shuffle());
    assert_eq!(ctl.repeat(), RepeatMode::One);
    assert_eq!(ctl.index(), Some(2));
    assert!(!ctl.is_playing());
    assert!(output.with(|s| s.bound.is_some() && !s.playing));
}

#[test]
fn restore_ignores_stale_index_and_uses_defaults() {
    let output = FakeOutput::new();
    let (tx, _rx) = mpsc::channel();
    let engine = PlaybackEngine::new(output.clone(), tx, Duration::ZERO);
    let mut ctl = Controller::new(engine, None);

    let defaults = PlaybackSettings {
        shuffle: true,
        repeat: RepeatMode::All,
        ..PlaybackSettings::default()
    };
    let session = SessionState {
        last_track_index: Some(5),
        ..SessionState::default()
    };
    ctl.restore(session, &defaults, &[t("A")]);

    assert!(ctl.shuffle());
    assert_eq!(ctl.repeat(), RepeatMode::All);
    assert_eq!(ctl.index(), None);
    assert!(ctl.queue().is_empty());
    assert!(output.with(|s| s.bound.is_none()));
}

#[test]
fn teardown_releases_everything() {
    let mut rig = Rig::new();
    rig.ctl.set_queue_and_play(tracks(3), 0);
    rig.ctl.next();
    rig.ctl.next();
    assert_eq!(rig.ctl.engine().sources().live(), 1);

    rig.ctl.teardown();
    assert_eq!(rig.ctl.engine().sources().live(), 0);
    assert!(!rig.ctl.is_playing());
}
