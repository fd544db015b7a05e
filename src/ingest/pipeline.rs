// Ingest pipeline: rename a shoot, probe every file, record it in the catalog

use std::path::{Path, PathBuf};
use std::time::Duration;
use rusqlite::Connection;
use serde::Serialize;
use walkdir::WalkDir;

use crate::constants::TEMP_FILE_PREFIX;
use crate::db::schema::{record_media_file, upsert_shoot, NewMediaFile};
use crate::error::Result;
use crate::hash::compute_full_hash;
use crate::metadata::{probe_file, MediaKind};
use crate::progress::{Progress, ProgressSink};
use crate::shoot::ShootId;
use super::discover::{device_folders, file_name_string, is_platform_artifact};
use super::rename::{rename_shoot, RenameOptions, RenameReport};

#[derive(Debug, Clone, Default)]
pub struct IngestOptions {
    pub rename: RenameOptions,
    pub tool_timeout: Option<Duration>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProbeFailure {
    pub path: PathBuf,
    pub error: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestResult {
    pub shoot: String,
    pub rename: RenameReport,
    pub recorded: usize,
    pub probe_failures: Vec<ProbeFailure>,
}

/// Rename the shoot in place, then catalogue each device file with its probe
/// output and the name it had before renaming.
///
/// A failed probe is logged and the file is still recorded without metadata.
pub fn ingest_shoot(
    conn: &Connection,
    shoot_root: &Path,
    options: &IngestOptions,
    progress: &dyn ProgressSink,
) -> Result<IngestResult> {
    let shoot = ShootId::from_path(shoot_root)?;
    let rename = rename_shoot(shoot_root, &options.rename)?;
    if !rename.is_complete() {
        log::warn!("{} file(s) of {} could not be renamed", rename.failures.len(), shoot.name());
    }

    let shoot_id = upsert_shoot(conn, &shoot)?;

    let files = collect_device_files(shoot_root)?;
    let total = files.len() as u64;
    let mut result = IngestResult {
        shoot: shoot.name().to_string(),
        rename,
        recorded: 0,
        probe_failures: Vec::new(),
    };

    for (i, (device, path)) in files.iter().enumerate() {
        let file_name = file_name_string(path);
        progress.report(&Progress::new("ingest", i as u64 + 1, total).with_message(file_name.clone()));

        let kind = MediaKind::from_path(path);
        let probe_json = match probe_file(path, options.tool_timeout) {
            Ok(Some(probe)) => Some(serde_json::to_string(&probe.raw)?),
            Ok(None) => None,
            Err(e) => {
                log::warn!("Probe failed for {}: {}", path.display(), e);
                result.probe_failures.push(ProbeFailure { path: path.clone(), error: e.to_string() });
                None
            }
        };

        let checksum = match compute_full_hash(path) {
            Ok(h) => Some(h),
            Err(e) => {
                log::warn!("{}", e);
                None
            }
        };

        let original_name = result
            .rename
            .record
            .get(path)
            .cloned()
            .unwrap_or_else(|| file_name.clone());

        record_media_file(conn, &NewMediaFile {
            shoot_id,
            device: device.clone(),
            file_name,
            path: path.to_string_lossy().to_string(),
            original_name,
            media_kind: kind.as_str().to_string(),
            size_bytes: std::fs::metadata(path)?.len() as i64,
            checksum,
            probe_json,
        })?;
        result.recorded += 1;
    }

    log::info!(
        "Ingested {}: {} renamed, {} recorded, {} probe failure(s)",
        result.shoot,
        result.rename.renamed(),
        result.recorded,
        result.probe_failures.len()
    );
    Ok(result)
}

/// (device, path) for every file at any depth below each device folder.
fn collect_device_files(shoot_root: &Path) -> Result<Vec<(String, PathBuf)>> {
    let mut files = Vec::new();
    for device_dir in device_folders(shoot_root)? {
        let device = file_name_string(&device_dir);
        for entry in WalkDir::new(&device_dir).sort_by_file_name() {
            let entry = entry.map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))?;
            let name = entry.file_name().to_string_lossy();
            if !entry.file_type().is_file()
                || is_platform_artifact(&name)
                || name.starts_with(TEMP_FILE_PREFIX)
            {
                continue;
            }
            files.push((device.clone(), entry.into_path()));
        }
    }
    Ok(files)
}
