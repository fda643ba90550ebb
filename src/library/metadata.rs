use std::io::Cursor;
use std::path::Path;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use lofty::file::TaggedFile;
use lofty::picture::{Picture, PictureType};
use lofty::prelude::*;
use lofty::probe::Probe;
use tracing::debug;

use crate::error::MetadataError;

use super::model::TrackMetadata;

/// Artist used when a file carries no artist tag.
pub const UNKNOWN_ARTIST: &str = "Unknown";

const DEFAULT_COVER_MIME: &str = "image/jpeg";

/// Best-effort title/artist/album/cover for `file_name` with contents `bytes`.
///
/// Never fails: unreadable tags fall back to the file name and the
/// `"Unknown"` artist, field by field when a tag exists but is partial.
pub fn extract(file_name: &str, bytes: &[u8]) -> TrackMetadata {
    let fallback_title = title_from_file_name(file_name);

    let tagged = match read_tagged(bytes) {
        Ok(tagged) => tagged,
        Err(e) => {
            debug!(file = file_name, error = %e, "no readable tags; using file name");
            return TrackMetadata {
                title: fallback_title,
                artist: UNKNOWN_ARTIST.to_string(),
                album: None,
                cover_art: None,
            };
        }
    };

    let Some(tag) = tagged.primary_tag().or_else(|| tagged.first_tag()) else {
        return TrackMetadata {
            title: fallback_title,
            artist: UNKNOWN_ARTIST.to_string(),
            album: None,
            cover_art: None,
        };
    };

    TrackMetadata {
        title: non_empty(tag.title()).unwrap_or(fallback_title),
        artist: non_empty(tag.artist()).unwrap_or_else(|| UNKNOWN_ARTIST.to_string()),
        album: non_empty(tag.album()),
        cover_art: cover_picture(tag.pictures()).map(data_url),
    }
}

/// File name without its extension, or the whole name when there is none.
pub fn title_from_file_name(file_name: &str) -> String {
    Path::new(file_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(file_name)
        .to_string()
}

/// `data:<mime>;base64,<payload>` for the given image bytes.
pub fn encode_data_url(mime: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", mime, STANDARD.encode(bytes))
}

fn read_tagged(bytes: &[u8]) -> Result<TaggedFile, MetadataError> {
    let probe = Probe::new(Cursor::new(bytes))
        .guess_file_type()
        .map_err(|e| MetadataError::Unreadable(e.to_string()))?;
    if probe.file_type().is_none() {
        return Err(MetadataError::UnknownFormat(
            "no known container signature".to_string(),
        ));
    }
    probe
        .read()
        .map_err(|e| MetadataError::Unreadable(e.to_string()))
}

fn non_empty(value: Option<std::borrow::Cow<'_, str>>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

// Front cover when tagged as such, otherwise whatever comes first.
fn cover_picture(pictures: &[Picture]) -> Option<&Picture> {
    pictures
        .iter()
        .find(|p| p.pic_type() == PictureType::CoverFront)
        .or_else(|| pictures.first())
        .filter(|p| !p.data().is_empty())
}

fn data_url(picture: &Picture) -> String {
    let mime = picture
        .mime_type()
        .map(|m| m.as_str())
        .unwrap_or(DEFAULT_COVER_MIME);
    encode_data_url(mime, picture.data())
}
