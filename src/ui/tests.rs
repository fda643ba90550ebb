use std::sync::Arc;

use ratatui::Terminal;
use ratatui::backend::TestBackend;

use super::*;
use crate::library::TrackMetadata;
use crate::player::RepeatMode;
use crate::store::Store;

fn track(artist: &str, title: &str) -> Track {
    Track::new(
        TrackMetadata {
            title: title.into(),
            artist: artist.into(),
            album: None,
            cover_art: None,
        },
        125.0,
        Arc::from(vec![0u8]),
    )
}

fn idle() -> TransportSnapshot {
    TransportSnapshot {
        index: None,
        track: None,
        playing: false,
        shuffle: false,
        repeat: RepeatMode::None,
        position: 0.0,
        duration: 0.0,
    }
}

fn screen(terminal: &Terminal<TestBackend>) -> String {
    terminal
        .backend()
        .buffer()
        .content
        .iter()
        .map(|cell| cell.symbol())
        .collect()
}

#[test]
fn window_keeps_the_cursor_centered_and_in_bounds() {
    assert_eq!(visible_window(5, 10, 3), (0, 5));
    assert_eq!(visible_window(100, 10, 0), (0, 10));
    assert_eq!(visible_window(100, 10, 50), (45, 55));
    assert_eq!(visible_window(100, 10, 99), (90, 100));
}

#[test]
fn time_text_drops_fields_needing_an_unknown_length() {
    let ui = UiSettings::default();
    assert_eq!(
        time_text(65.0, 125.0, &ui).as_deref(),
        Some("01:05 / 02:05 / -01:00")
    );
    assert_eq!(time_text(65.0, 0.0, &ui).as_deref(), Some("01:05"));

    let none = UiSettings {
        now_playing_time_fields: Vec::new(),
        ..UiSettings::default()
    };
    assert_eq!(time_text(1.0, 2.0, &none), None);
}

#[test]
fn key_help_includes_the_scrub_step() {
    let help = key_help(7);
    assert!(help.starts_with("[j/k] up/down | [h/l] prev/next | [H/L] scrub ±7s"));
    assert!(help.ends_with("[q] quit"));
}

#[test]
fn filtered_rows_upper_case_the_matches() {
    let mut lib = crate::library::Library::load(Store::open_in_memory().unwrap()).unwrap();
    lib.add_tracks(vec![track("abba", "waterloo")]).unwrap();
    let mut app = App::new(&lib, &UiSettings::default());
    app.filter_query = "aw".into();

    assert_eq!(row_text(&app, 0, "aw", None, false), "  Abba - Waterloo");
    assert_eq!(row_text(&app, 0, "", None, true), "♪ abba - waterloo");
}

#[test]
fn draw_renders_status_and_rows() {
    let mut lib = crate::library::Library::load(Store::open_in_memory().unwrap()).unwrap();
    lib.add_tracks(vec![track("Band", "Opening"), track("Band", "Closing")])
        .unwrap();
    let app = App::new(&lib, &UiSettings::default());
    let mut now = idle();
    now.track = Some(lib.tracks()[0].clone());
    now.playing = true;
    now.duration = 125.0;

    let mut terminal = Terminal::new(TestBackend::new(100, 20)).unwrap();
    let display = app.display_indices();
    terminal
        .draw(|f| {
            draw(
                f,
                &app,
                &lib,
                &now,
                &display,
                &UiSettings::default(),
                &ControlsSettings::default(),
            )
        })
        .unwrap();

    let text = screen(&terminal);
    assert!(text.contains("tapedeck"));
    assert!(text.contains("Song: Band - Opening"));
    assert!(text.contains("Playing"));
    assert!(text.contains("♪ Band - Opening"));
    assert!(text.contains("Band - Closing"));
}

#[test]
fn metadata_popup_lists_the_selected_track() {
    let t = track("Band", "Opening");
    let text = metadata_text(Some(&t));
    assert!(text.contains("Title: Opening"));
    assert!(text.contains("Album: -"));
    assert!(text.contains("Duration: 2:05"));
    assert_eq!(metadata_text(None), "No track selected");
}
