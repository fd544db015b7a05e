// FFprobe wrapper for metadata extraction

use std::path::Path;
use std::process::Command;
use std::time::Duration;
use serde::Deserialize;

use crate::error::{Result, ShootError};
use crate::metadata::MediaSummary;

#[derive(Debug, Deserialize)]
struct FFprobeOutput {
    streams: Option<Vec<FFprobeStream>>,
    format: Option<FFprobeFormat>,
}

#[derive(Debug, Deserialize)]
struct FFprobeStream {
    codec_type: Option<String>,
    codec_name: Option<String>,
    width: Option<i32>,
    height: Option<i32>,
    r_frame_rate: Option<String>,
    channels: Option<i32>,
    sample_rate: Option<String>,
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FFprobeFormat {
    duration: Option<String>,
    bit_rate: Option<String>,
    tags: Option<FFprobeTags>,
}

#[derive(Debug, Deserialize)]
struct FFprobeTags {
    creation_time: Option<String>,
}

/// Run ffprobe on a file. Returns the raw JSON document and a parsed summary.
pub fn probe(path: &Path, timeout: Option<Duration>) -> Result<(serde_json::Value, MediaSummary)> {
    let mut cmd = Command::new(crate::tools::ffprobe_path());
    cmd.args([
        "-v", "quiet",
        "-print_format", "json",
        "-show_format",
        "-show_streams",
    ])
    .arg(path);

    let output = crate::tools::run_tool(cmd, "ffprobe", timeout)?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(ShootError::Tool {
            tool: "ffprobe".to_string(),
            reason: format!("exited with {} on {}: {}", output.status, path.display(), stderr.trim()),
        });
    }

    let raw: serde_json::Value = serde_json::from_slice(&output.stdout)?;
    let summary = summarize(&raw)?;
    Ok((raw, summary))
}

/// Parse the fields we keep out of an ffprobe JSON document.
pub fn summarize(raw: &serde_json::Value) -> Result<MediaSummary> {
    let probe_output: FFprobeOutput = serde_json::from_value(raw.clone())?;
    let mut meta = MediaSummary::default();

    if let Some(ref streams) = probe_output.streams {
        for stream in streams {
            match stream.codec_type.as_deref() {
                Some("video") if meta.codec.is_none() => {
                    meta.codec = stream.codec_name.clone();
                    meta.width = stream.width;
                    meta.height = stream.height;
                    meta.fps = parse_frame_rate(stream.r_frame_rate.as_deref());
                    if meta.duration_ms.is_none() {
                        meta.duration_ms = parse_duration_ms(stream.duration.as_deref());
                    }
                }
                Some("audio") if meta.audio_codec.is_none() => {
                    meta.audio_codec = stream.codec_name.clone();
                    meta.audio_channels = stream.channels;
                    meta.audio_sample_rate = stream.sample_rate.as_ref()
                        .and_then(|s| s.parse().ok());
                }
                _ => {}
            }
        }
    }

    if let Some(ref format) = probe_output.format {
        if meta.duration_ms.is_none() {
            meta.duration_ms = parse_duration_ms(format.duration.as_deref());
        }
        meta.bitrate = format.bit_rate.as_ref().and_then(|s| s.parse().ok());
        meta.recorded_at = format.tags.as_ref().and_then(|t| t.creation_time.clone());
    }

    Ok(meta)
}

/// Parse frame rate string like "30000/1001" to f64
fn parse_frame_rate(rate_str: Option<&str>) -> Option<f64> {
    let rate_str = rate_str?;
    if let Some((num, den)) = rate_str.split_once('/') {
        let num: f64 = num.parse().ok()?;
        let den: f64 = den.parse().ok()?;
        if den > 0.0 {
            return Some(num / den);
        }
        return None;
    }
    rate_str.parse().ok()
}

/// Parse duration string to milliseconds
fn parse_duration_ms(duration_str: Option<&str>) -> Option<i64> {
    let duration_str = duration_str?;
    let seconds: f64 = duration_str.parse().ok()?;
    Some((seconds * 1000.0) as i64)
}

/// Check if ffprobe is available
pub fn is_available() -> bool {
    crate::tools::is_tool_available("ffprobe")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summarize_video_document() {
        let raw = serde_json::json!({
            "streams": [
                {
                    "codec_type": "video",
                    "codec_name": "h264",
                    "width": 3840,
                    "height": 2160,
                    "r_frame_rate": "30000/1001",
                    "duration": "12.512"
                },
                {
                    "codec_type": "audio",
                    "codec_name": "aac",
                    "channels": 2,
                    "sample_rate": "48000"
                }
            ],
            "format": {
                "duration": "12.600",
                "bit_rate": "100000000",
                "tags": { "creation_time": "2024-03-15T17:01:02.000000Z" }
            }
        });

        let meta = summarize(&raw).unwrap();
        assert_eq!(meta.codec.as_deref(), Some("h264"));
        assert_eq!(meta.width, Some(3840));
        assert_eq!(meta.duration_ms, Some(12512));
        assert!((meta.fps.unwrap() - 29.97).abs() < 0.01);
        assert_eq!(meta.audio_channels, Some(2));
        assert_eq!(meta.audio_sample_rate, Some(48000));
        assert_eq!(meta.bitrate, Some(100_000_000));
        assert_eq!(meta.recorded_at.as_deref(), Some("2024-03-15T17:01:02.000000Z"));
    }

    #[test]
    fn test_summarize_audio_only_uses_format_duration() {
        let raw = serde_json::json!({
            "streams": [{ "codec_type": "audio", "codec_name": "pcm_s24le", "channels": 1 }],
            "format": { "duration": "3.5" }
        });

        let meta = summarize(&raw).unwrap();
        assert_eq!(meta.codec, None);
        assert_eq!(meta.audio_codec.as_deref(), Some("pcm_s24le"));
        assert_eq!(meta.duration_ms, Some(3500));
    }

    #[test]
    fn test_parse_frame_rate() {
        assert_eq!(parse_frame_rate(Some("25/1")), Some(25.0));
        assert_eq!(parse_frame_rate(Some("0/0")), None);
        assert_eq!(parse_frame_rate(Some("24")), Some(24.0));
        assert_eq!(parse_frame_rate(None), None);
    }
}
