//! Terminal rendering with `ratatui`.
//!
//! Layout, top to bottom: header, status, track list (with popups drawn over
//! it) and the key help.

use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Modifier, Style, Stylize},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Padding, Paragraph, Wrap},
};

use crate::app::{App, InputMode, PlaybackState};
use crate::config::{ControlsSettings, TimeField, UiSettings};
use crate::library::{Library, Track, display_from_fields, format_duration};
use crate::player::TransportSnapshot;

/// Key help, in display order. `H/L` is rendered separately since its text
/// depends on the configured scrub step.
const KEY_HELP: &[(&str, &str)] = &[
    ("j/k", "up/down"),
    ("h/l", "prev/next"),
    ("enter", "play"),
    ("space/p", "play/pause"),
    ("gg/G", "top/bottom"),
    ("/", "filter"),
    ("s", "shuffle"),
    ("r", "repeat"),
    ("v", "view"),
    ("f", "favorite"),
    ("a/x", "playlist add/remove"),
    ("N/R/X", "playlist new/rename/delete"),
    ("D", "delete track"),
    ("K", "metadata"),
    ("q", "quit"),
];

fn key_help(scrub_seconds: u64) -> String {
    let scrub = format!("[H/L] scrub ±{scrub_seconds}s");
    let mut parts: Vec<String> = KEY_HELP
        .iter()
        .map(|(key, action)| format!("[{key}] {action}"))
        .collect();
    parts.insert(2, scrub);
    parts.join(" | ")
}

fn clock(seconds: f64) -> String {
    let total = seconds.max(0.0) as u64;
    format!("{:02}:{:02}", total / 60, total % 60)
}

/// Elapsed/total/remaining as configured. Fields that need the length are
/// left out while it is unknown.
fn time_text(elapsed: f64, length: f64, ui: &UiSettings) -> Option<String> {
    let known = length > 0.0;
    let parts: Vec<String> = ui
        .now_playing_time_fields
        .iter()
        .filter_map(|field| match field {
            TimeField::Elapsed => Some(clock(elapsed)),
            TimeField::Total if known => Some(clock(length)),
            TimeField::Remaining if known => Some(format!("-{}", clock(length - elapsed))),
            TimeField::Total | TimeField::Remaining => None,
        })
        .collect();
    (!parts.is_empty()).then(|| parts.join(&ui.now_playing_time_separator))
}

/// A `width` x `height` box centered in `area`, never larger than it.
fn popup_area(width: u16, height: u16, area: Rect) -> Rect {
    let width = width.min(area.width.saturating_sub(2)).max(10);
    let height = height.min(area.height.saturating_sub(2)).max(3);
    Rect {
        x: area.x + area.width.saturating_sub(width) / 2,
        y: area.y + area.height.saturating_sub(height) / 2,
        width,
        height,
    }
}

fn titled(title: &str) -> Block<'_> {
    Block::default()
        .borders(Borders::ALL)
        .title(title)
        .padding(Padding::left(1))
}

/// First and one-past-last display position to render so the cursor sits
/// mid-list when the list is taller than the area.
fn visible_window(total: usize, height: usize, cursor: usize) -> (usize, usize) {
    if height == 0 || total <= height {
        return (0, total);
    }
    let start = cursor.saturating_sub(height / 2).min(total - height);
    (start, start + height)
}

fn status_text(app: &App, library: &Library, now: &TransportSnapshot, ui: &UiSettings) -> String {
    let mut parts = vec![
        format!("VIEW:{}", app.view_title.trim_end()),
        now.repeat.label().to_string(),
        format!("Shuffle: {}", if now.shuffle { "ON" } else { "OFF" }),
    ];

    let query = app.filter_query.trim();
    if app.input == InputMode::Filter || !query.is_empty() {
        parts.push(format!("FILTER: {query}").trim_end().to_string());
    }

    match &now.track {
        Some(track) => {
            let song = display_from_fields(track, &ui.list_fields, &ui.list_separator);
            parts.push(match time_text(now.position, now.duration, ui) {
                Some(time) => format!("Song: {song} [{time}]"),
                None => format!("Song: {song}"),
            });
            parts.push(format!("{:?}", PlaybackState::of(now)));
        }
        None => parts.push("Stopped".to_string()),
    }

    let target = app.target_playlist.as_deref().and_then(|id| library.playlist(id));
    if let Some(playlist) = target {
        parts.push(format!("Adds to: {}", playlist.name));
    }
    parts.extend(app.status_message.clone());

    format!(" {}", parts.join(" • "))
}

fn metadata_text(track: Option<&Track>) -> String {
    let Some(track) = track else {
        return "No track selected".to_string();
    };
    let lines = [
        format!("Title: {}", track.title),
        format!("Artist: {}", track.artist),
        format!("Album: {}", track.album.as_deref().unwrap_or("-")),
        format!("Duration: {}", format_duration(track.duration)),
        format!("Added: {}", track.created_at.format("%Y-%m-%d %H:%M")),
        format!("Favorite: {}", if track.favorite { "yes" } else { "no" }),
        format!("Cover: {}", if track.cover_art.is_some() { "embedded" } else { "-" }),
    ];
    lines.join("\n")
}

/// Row text with fuzzy matches upper-cased, prefixed by a now-playing mark.
fn row_text(app: &App, row: usize, query: &str, query_lower: Option<&str>, playing: bool) -> String {
    let label = app.label(row);
    let mut text = String::from(if playing { "♪ " } else { "  " });
    if query.is_empty() {
        text.push_str(label);
        return text;
    }

    let positions = match query_lower {
        Some(lower) => app.fuzzy_match_positions_for_row_lower(row, lower),
        None => App::fuzzy_match_positions(label, query),
    }
    .unwrap_or_default();

    let mut hits = positions.into_iter().peekable();
    for (i, ch) in label.chars().enumerate() {
        if hits.peek() == Some(&i) {
            hits.next();
            text.extend(ch.to_uppercase());
        } else {
            text.push(ch);
        }
    }
    text
}

fn render_list(
    frame: &mut Frame,
    area: Rect,
    app: &App,
    library: &Library,
    now: &TransportSnapshot,
    display: &[usize],
) {
    let query = app.filter_query.trim();
    let query_lower =
        (!query.is_empty() && app.uses_lower_labels()).then(|| query.to_ascii_lowercase());
    let playing_id = now.track.as_ref().map(|t| t.id.as_str());

    // Only the visible rows become `ListItem`s.
    let cursor = display.iter().position(|&i| i == app.selected).unwrap_or(0);
    let height = area.height.saturating_sub(2) as usize;
    let (start, end) = visible_window(display.len(), height, cursor);
    let items: Vec<ListItem> = display[start..end]
        .iter()
        .map(|&row| {
            let playing = Some(app.tracks[row].id.as_str()) == playing_id;
            ListItem::new(row_text(app, row, query, query_lower.as_deref(), playing))
        })
        .collect();

    // A playlist borrows the cover of its first track.
    let title = match app.current_playlist().and_then(|id| library.playlist_cover(id)) {
        Some(_) => format!("{}[art] ", app.view_title),
        None => app.view_title.clone(),
    };
    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title(title))
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED))
        .highlight_symbol("> ");

    let mut state = ListState::default();
    if !display.is_empty() {
        state.select(Some(cursor - start));
    }
    frame.render_stateful_widget(list, area, &mut state);
}

fn render_popups(frame: &mut Frame, area: Rect, app: &App) {
    if app.metadata_window {
        let popup = popup_area(72, 9, area);
        frame.render_widget(Clear, popup);
        let text = Paragraph::new(metadata_text(app.selected_track()))
            .block(titled(" metadata (K closes) "))
            .wrap(Wrap { trim: true });
        frame.render_widget(text, popup);
    }

    let prompt = match app.input {
        InputMode::NewPlaylist => " new playlist (enter saves, esc cancels) ",
        InputMode::RenamePlaylist => " rename playlist (enter saves, esc cancels) ",
        InputMode::Normal | InputMode::Filter => return,
    };
    let popup = popup_area(60, 3, area);
    frame.render_widget(Clear, popup);
    frame.render_widget(
        Paragraph::new(format!("{}_", app.name_input)).block(titled(prompt)),
        popup,
    );
}

/// Render the entire UI into `frame`.
pub fn draw(
    frame: &mut Frame,
    app: &App,
    library: &Library,
    now: &TransportSnapshot,
    display: &[usize],
    ui_settings: &UiSettings,
    controls_settings: &ControlsSettings,
) {
    let [header_area, status_area, list_area, help_area] = Layout::vertical([
        Constraint::Length(3),
        Constraint::Length(5),
        Constraint::Min(1),
        Constraint::Length(4),
    ])
    .areas(frame.area());

    let header = Paragraph::new(ui_settings.header_text.as_str())
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" tapedeck ")
                .title_alignment(Alignment::Center),
        );
    frame.render_widget(header, header_area);

    let status = Paragraph::new(status_text(app, library, now, ui_settings))
        .slow_blink()
        .block(titled(" status "))
        .wrap(Wrap { trim: true });
    frame.render_widget(status, status_area);

    render_list(frame, list_area, app, library, now, display);
    render_popups(frame, list_area, app);

    let help = Paragraph::new(key_help(controls_settings.scrub_seconds))
        .block(titled(" controls "))
        .wrap(Wrap { trim: true });
    frame.render_widget(help, help_area);
}

#[cfg(test)]
mod tests;
