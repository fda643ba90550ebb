use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use super::load::{default_config_path, default_data_dir, resolve_config_path};
use super::schema::*;
use crate::player::RepeatMode;

/// Tests touching the process environment run one at a time.
static ENV: Mutex<()> = Mutex::new(());

/// Runs `f` with the given variables set (`Some`) or unset (`None`), then
/// puts the previous values back.
fn with_env<R>(vars: &[(&str, Option<&str>)], f: impl FnOnce() -> R) -> R {
    let _serial: MutexGuard<'_, ()> = ENV.lock().unwrap_or_else(|e| e.into_inner());
    let saved: Vec<(&str, Option<OsString>)> = vars
        .iter()
        .map(|&(key, _)| (key, std::env::var_os(key)))
        .collect();
    for &(key, value) in vars {
        apply(key, value.map(OsString::from));
    }
    let out = f();
    for (key, value) in saved {
        apply(key, value);
    }
    out
}

fn apply(key: &str, value: Option<OsString>) {
    // SAFETY: callers hold `ENV`, so no other test thread reads the
    // environment concurrently.
    unsafe {
        match value {
            Some(v) => std::env::set_var(key, v),
            None => std::env::remove_var(key),
        }
    }
}

fn write_config(dir: &Path, body: &str) -> PathBuf {
    let path = dir.join("tapedeck.toml");
    std::fs::write(&path, body).unwrap();
    path
}

#[test]
fn explicit_config_path_wins() {
    let path = with_env(
        &[
            ("TAPEDECK_CONFIG_PATH", Some("/etc/tapedeck/alt.toml")),
            ("XDG_CONFIG_HOME", Some("/ignored")),
        ],
        resolve_config_path,
    );
    assert_eq!(path, Some(PathBuf::from("/etc/tapedeck/alt.toml")));
}

#[test]
fn config_dir_comes_from_xdg_before_home() {
    let path = with_env(
        &[
            ("XDG_CONFIG_HOME", Some("/run/cfg")),
            ("HOME", Some("/home/nobody")),
        ],
        default_config_path,
    );
    assert_eq!(path, Some(PathBuf::from("/run/cfg/tapedeck/config.toml")));
}

#[test]
fn empty_xdg_data_home_falls_back_to_home() {
    let dir = with_env(
        &[("XDG_DATA_HOME", Some("")), ("HOME", Some("/home/nobody"))],
        default_data_dir,
    );
    assert_eq!(dir, Some(PathBuf::from("/home/nobody/.local/share/tapedeck")));
}

#[test]
fn storage_and_log_locations_default_to_the_data_dir() {
    let mut settings = Settings::default();
    let (db, logs) = with_env(&[("XDG_DATA_HOME", Some("/var/lib/me"))], || {
        (settings.database_path(), settings.log_directory())
    });
    assert_eq!(db, Some(PathBuf::from("/var/lib/me/tapedeck/library.db")));
    assert_eq!(logs, Some(PathBuf::from("/var/lib/me/tapedeck/logs")));

    settings.storage.path = Some("/srv/music.db".into());
    settings.logging.directory = Some("/tmp/logs".into());
    assert_eq!(settings.database_path(), Some(PathBuf::from("/srv/music.db")));
    assert_eq!(settings.log_directory(), Some(PathBuf::from("/tmp/logs")));
}

#[test]
fn every_section_reads_from_the_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(
        dir.path(),
        r#"
[storage]
path = "/tmp/lib.db"

[import]
extensions = ["mp3"]
recursive = false
include_hidden = true
probe_timeout_ms = 1500

[playback]
shuffle = true
repeat = "repeat-one"
progress_interval_ms = 100
resume = false

[controls]
scrub_seconds = 9

[ui]
header_text = "hi"
list_fields = ["favorite", "title"]
list_separator = "::"
now_playing_time_fields = ["remaining"]
now_playing_time_separator = "|"

[logging]
filter = "debug"
"#,
    );

    let settings = with_env(
        &[
            ("TAPEDECK_CONFIG_PATH", path.to_str()),
            ("TAPEDECK__CONTROLS__SCRUB_SECONDS", None),
        ],
        Settings::load,
    )
    .unwrap();

    assert_eq!(settings.storage.path, Some(PathBuf::from("/tmp/lib.db")));
    assert_eq!(settings.import.extensions, ["mp3"]);
    assert!(!settings.import.recursive && settings.import.include_hidden);
    assert_eq!(settings.import.probe_timeout_ms, 1500);
    assert!(settings.playback.shuffle);
    assert_eq!(settings.playback.repeat, RepeatMode::One);
    assert_eq!(settings.playback.progress_interval_ms, 100);
    assert!(!settings.playback.resume);
    assert_eq!(settings.controls.scrub_seconds, 9);
    assert_eq!(settings.ui.header_text, "hi");
    assert_eq!(
        settings.ui.list_fields,
        [TrackDisplayField::Favorite, TrackDisplayField::Title]
    );
    assert_eq!(settings.ui.list_separator, "::");
    assert_eq!(settings.ui.now_playing_time_fields, [TimeField::Remaining]);
    assert_eq!(settings.ui.now_playing_time_separator, "|");
    assert_eq!(settings.logging.filter.as_deref(), Some("debug"));
    assert!(settings.validate().is_ok());
}

#[test]
fn environment_beats_the_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(dir.path(), "[controls]\nscrub_seconds = 30\n");

    let settings = with_env(
        &[
            ("TAPEDECK_CONFIG_PATH", path.to_str()),
            ("TAPEDECK__CONTROLS__SCRUB_SECONDS", Some("2")),
        ],
        Settings::load,
    )
    .unwrap();
    assert_eq!(settings.controls.scrub_seconds, 2);
}

#[test]
fn missing_file_yields_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let absent = dir.path().join("absent.toml");

    let settings = with_env(&[("TAPEDECK_CONFIG_PATH", absent.to_str())], Settings::load).unwrap();
    assert_eq!(settings.controls.scrub_seconds, 5);
    assert_eq!(settings.playback.repeat, RepeatMode::None);
    assert_eq!(settings.import.extensions.len(), 5);
}

#[test]
fn zero_intervals_are_rejected() {
    let mut settings = Settings::default();
    assert!(settings.validate().is_ok());

    settings.import.probe_timeout_ms = 0;
    assert!(settings.validate().is_err());

    settings.import.probe_timeout_ms = 10;
    settings.playback.progress_interval_ms = 0;
    assert!(settings.validate().is_err());
}
