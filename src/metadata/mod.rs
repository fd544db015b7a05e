// Metadata extraction module
//
// Probing is delegated to ffprobe (video, audio) and exiftool (stills).
// The raw JSON is kept verbatim for the catalog; a small summary is parsed out.

pub mod ffprobe;
pub mod exiftool;

use std::path::Path;
use std::time::Duration;
use serde::{Deserialize, Serialize};

use crate::constants::{AUDIO_EXTENSIONS, IMAGE_EXTENSIONS, VIDEO_EXTENSIONS};
use crate::error::Result;
use crate::shoot::lowercase_extension;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Video,
    Audio,
    Image,
    Unknown,
}

impl MediaKind {
    /// Determine media kind from file extension
    pub fn from_path(path: &Path) -> Self {
        let ext = lowercase_extension(path).unwrap_or_default();

        if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
            MediaKind::Image
        } else if AUDIO_EXTENSIONS.contains(&ext.as_str()) {
            MediaKind::Audio
        } else if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
            MediaKind::Video
        } else {
            MediaKind::Unknown
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Video => "video",
            MediaKind::Audio => "audio",
            MediaKind::Image => "image",
            MediaKind::Unknown => "unknown",
        }
    }
}

/// Fields pulled out of a probe for display and filtering
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MediaSummary {
    // Video properties
    pub duration_ms: Option<i64>,
    pub width: Option<i32>,
    pub height: Option<i32>,
    pub fps: Option<f64>,
    pub codec: Option<String>,
    pub bitrate: Option<i64>,

    // Audio properties
    pub audio_codec: Option<String>,
    pub audio_channels: Option<i32>,
    pub audio_sample_rate: Option<i32>,

    // Date/time
    pub recorded_at: Option<String>,

    // Camera info
    pub camera_make: Option<String>,
    pub camera_model: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProbeResult {
    pub kind: MediaKind,
    pub raw: serde_json::Value,
    pub summary: MediaSummary,
}

/// Probe one file with the tool matching its kind.
/// Returns `None` for extensions that are not media.
pub fn probe_file(path: &Path, timeout: Option<Duration>) -> Result<Option<ProbeResult>> {
    let kind = MediaKind::from_path(path);

    let (raw, summary) = match kind {
        MediaKind::Video | MediaKind::Audio => ffprobe::probe(path, timeout)?,
        MediaKind::Image => exiftool::extract(path, timeout)?,
        MediaKind::Unknown => return Ok(None),
    };

    Ok(Some(ProbeResult { kind, raw, summary }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_kind_from_extension() {
        assert_eq!(MediaKind::from_path(Path::new("a/CLIP.MOV")), MediaKind::Video);
        assert_eq!(MediaKind::from_path(Path::new("a/take.Wav")), MediaKind::Audio);
        assert_eq!(MediaKind::from_path(Path::new("a/IMG_0001.CR2")), MediaKind::Image);
        assert_eq!(MediaKind::from_path(Path::new("a/project.drp")), MediaKind::Unknown);
        assert_eq!(MediaKind::from_path(Path::new("a/README")), MediaKind::Unknown);
    }

    #[test]
    fn test_unknown_kind_is_not_probed() {
        let result = probe_file(Path::new("/nonexistent/notes.xyz"), None).unwrap();
        assert!(result.is_none());
    }
}
