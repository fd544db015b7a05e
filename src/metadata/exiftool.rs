// ExifTool wrapper for still-image metadata

use std::path::Path;
use std::process::Command;
use std::time::Duration;

use crate::error::{Result, ShootError};
use crate::metadata::MediaSummary;

/// Run `exiftool -json` on a file. Returns the first object of the output
/// array and a parsed summary.
pub fn extract(path: &Path, timeout: Option<Duration>) -> Result<(serde_json::Value, MediaSummary)> {
    let mut cmd = Command::new(crate::tools::exiftool_path());
    cmd.arg("-json").arg(path);

    let output = crate::tools::run_tool(cmd, "exiftool", timeout)?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(ShootError::Tool {
            tool: "exiftool".to_string(),
            reason: format!("exited with {} on {}: {}", output.status, path.display(), stderr.trim()),
        });
    }

    let raw_array: serde_json::Value = serde_json::from_slice(&output.stdout)?;

    // exiftool returns an array; take the first element
    let raw = raw_array.as_array()
        .and_then(|a| a.first())
        .cloned()
        .unwrap_or(serde_json::Value::Object(serde_json::Map::new()));

    let summary = summarize(&raw);
    Ok((raw, summary))
}

/// Parse the fields we keep out of one exiftool JSON object.
pub fn summarize(dump: &serde_json::Value) -> MediaSummary {
    let date = get_string(dump, "DateTimeOriginal")
        .or_else(|| get_string(dump, "CreateDate"))
        .or_else(|| get_string(dump, "MediaCreateDate"));

    MediaSummary {
        width: get_number(dump, "ImageWidth").map(|v| v as i32),
        height: get_number(dump, "ImageHeight").map(|v| v as i32),
        recorded_at: date.map(|d| parse_exif_date(&d).unwrap_or(d)),
        camera_make: get_string(dump, "Make"),
        camera_model: get_string(dump, "Model"),
        ..Default::default()
    }
}

fn get_string(dump: &serde_json::Value, tag: &str) -> Option<String> {
    match dump.get(tag)? {
        serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn get_number(dump: &serde_json::Value, tag: &str) -> Option<f64> {
    let val = dump.get(tag)?;
    val.as_f64()
        .or_else(|| val.as_str().and_then(|s| s.trim().parse().ok()))
}

/// "2024:03:15 17:01:02" -> "2024-03-15T17:01:02Z"
fn parse_exif_date(date_str: &str) -> Option<String> {
    let head = date_str.get(..19)?;
    let dt = chrono::NaiveDateTime::parse_from_str(head, "%Y:%m:%d %H:%M:%S").ok()?;
    Some(format!("{}Z", dt.format("%Y-%m-%dT%H:%M:%S")))
}

/// Check if exiftool is available
pub fn is_available() -> bool {
    crate::tools::is_tool_available("exiftool")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summarize_still() {
        let dump = serde_json::json!({
            "SourceFile": "IMG_0001.CR2",
            "Make": "Canon",
            "Model": "Canon EOS R5",
            "ImageWidth": 8192,
            "ImageHeight": 5464,
            "DateTimeOriginal": "2024:03:15 17:01:02"
        });

        let meta = summarize(&dump);
        assert_eq!(meta.camera_make.as_deref(), Some("Canon"));
        assert_eq!(meta.camera_model.as_deref(), Some("Canon EOS R5"));
        assert_eq!(meta.width, Some(8192));
        assert_eq!(meta.recorded_at.as_deref(), Some("2024-03-15T17:01:02Z"));
    }

    #[test]
    fn test_unparseable_date_kept_verbatim() {
        let dump = serde_json::json!({ "CreateDate": "0000:00:00 00:00:00" });
        let meta = summarize(&dump);
        assert_eq!(meta.recorded_at.as_deref(), Some("0000:00:00 00:00:00"));
    }

    #[test]
    fn test_parse_exif_date_with_subseconds() {
        assert_eq!(
            parse_exif_date("2024:03:15 17:01:02.55+01:00").as_deref(),
            Some("2024-03-15T17:01:02Z")
        );
        assert_eq!(parse_exif_date("bad"), None);
    }
}
