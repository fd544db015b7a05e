// Catalog scans over existing trees: proxy folders and archive volumes

use std::path::Path;
use rusqlite::Connection;
use serde::Serialize;

use crate::constants::PROXY_MONTH_SUFFIX;
use crate::db::schema::{record_shoot_volume, set_proxy_present};
use crate::error::Result;
use crate::progress::{Progress, ProgressSink};
use crate::shoot::{is_month_folder, strip_proxy_suffix, ShootId};
use crate::verify::dir_size;
use super::discover::{file_name_string, sorted_entries};

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxyPresentReport {
    /// Shoots flagged as having a proxy.
    pub marked: Vec<String>,
    /// Proxy folders with no matching catalogued shoot.
    pub unknown: Vec<String>,
}

/// Flag every shoot that has a proxy folder under `dir`.
///
/// `dir` may hold `{shoot}.proxy` folders directly, or month folders
/// (`2024_03_proxy` or `2024_03`) that hold them.
pub fn scan_proxy_present(conn: &Connection, dir: &Path) -> Result<ProxyPresentReport> {
    let mut report = ProxyPresentReport::default();
    visit_proxy_dir(conn, dir, true, &mut report)?;
    Ok(report)
}

fn visit_proxy_dir(conn: &Connection, dir: &Path, descend: bool, report: &mut ProxyPresentReport) -> Result<()> {
    for entry in sorted_entries(dir)? {
        if !entry.is_dir() {
            continue;
        }
        let name = file_name_string(&entry);

        let month = name.strip_suffix(PROXY_MONTH_SUFFIX).unwrap_or(&name);
        if is_month_folder(month) {
            if descend {
                visit_proxy_dir(conn, &entry, false, report)?;
            }
            continue;
        }

        let Some(shoot) = strip_proxy_suffix(&name) else {
            log::debug!("Not a proxy folder: {}", entry.display());
            continue;
        };

        if set_proxy_present(conn, shoot)? {
            report.marked.push(shoot.to_string());
        } else {
            log::warn!("No catalogued shoot named {}", shoot);
            report.unknown.push(shoot.to_string());
        }
    }
    Ok(())
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeShoot {
    pub volume: String,
    pub shoot: String,
    pub size_bytes: u64,
}

/// Walk `{root}/{volume}/{YYYY_MM}/{DD}/{shoot}` and record each shoot's size
/// against its volume.
pub fn scan_volumes(conn: &Connection, root: &Path, progress: &dyn ProgressSink) -> Result<Vec<VolumeShoot>> {
    let mut found = Vec::new();

    for volume_dir in subdirs(root)? {
        let volume = file_name_string(&volume_dir);
        for month_dir in subdirs(&volume_dir)? {
            if !is_month_folder(&file_name_string(&month_dir)) {
                continue;
            }
            for day_dir in subdirs(&month_dir)? {
                for shoot_dir in subdirs(&day_dir)? {
                    match ShootId::from_path(&shoot_dir) {
                        Ok(shoot) => found.push((volume.clone(), shoot, shoot_dir)),
                        Err(e) => log::warn!("Skipping {}: {}", shoot_dir.display(), e),
                    }
                }
            }
        }
    }

    let total = found.len() as u64;
    let mut recorded = Vec::with_capacity(found.len());
    for (i, (volume, shoot, path)) in found.into_iter().enumerate() {
        progress.report(
            &Progress::new("volume-scan", i as u64 + 1, total)
                .with_message(format!("{}/{}", volume, shoot.name())),
        );
        let size_bytes = dir_size(&path)?;
        record_shoot_volume(conn, &shoot, &volume, size_bytes)?;
        recorded.push(VolumeShoot {
            volume,
            shoot: shoot.name().to_string(),
            size_bytes,
        });
    }

    log::info!("Recorded {} shoot copies under {}", recorded.len(), root.display());
    Ok(recorded)
}

/// Visible child directories, sorted.
fn subdirs(dir: &Path) -> Result<Vec<std::path::PathBuf>> {
    Ok(sorted_entries(dir)?
        .into_iter()
        .filter(|p| p.is_dir() && !file_name_string(p).starts_with('.'))
        .collect())
}
