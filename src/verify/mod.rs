// Transfer verification
//
// Compares two copies of a shoot (usually on two archive volumes) by total
// size or by per-file BLAKE3 checksums.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use rusqlite::Connection;
use serde::Serialize;
use walkdir::WalkDir;

use crate::constants::BYTES_PER_GB;
use crate::db::schema::list_media_files;
use crate::error::{Result, ShootError};
use crate::hash::compute_full_hash;
use crate::ingest::discover::{ensure_dir, is_platform_artifact};
use crate::progress::{Progress, ProgressSink};

/// Relative path -> BLAKE3 hex digest.
pub type ChecksumMap = BTreeMap<PathBuf, String>;

/// Total bytes of regular files below `path`. Symlinks are not followed.
pub fn dir_size(path: &Path) -> Result<u64> {
    ensure_dir(path)?;
    let mut total = 0u64;
    for entry in WalkDir::new(path).follow_links(false) {
        let entry = entry.map_err(walk_error)?;
        if entry.file_type().is_file() {
            total += entry.metadata().map_err(walk_error)?.len();
        }
    }
    Ok(total)
}

pub fn size_gb(bytes: u64) -> f64 {
    bytes as f64 / BYTES_PER_GB
}

/// Checksums of every regular file below `root`, keyed by path relative to it.
pub fn dir_checksums(root: &Path, progress: &dyn ProgressSink) -> Result<ChecksumMap> {
    ensure_dir(root)?;

    let files = regular_files(WalkDir::new(root).follow_links(false).sort_by_file_name())?;

    let total = files.len() as u64;
    let mut sums = ChecksumMap::new();
    for (i, file) in files.iter().enumerate() {
        let relative = file.strip_prefix(root).unwrap_or(file).to_path_buf();
        progress.report(
            &Progress::new("checksum", i as u64 + 1, total)
                .with_message(relative.display().to_string()),
        );
        sums.insert(relative, compute_full_hash(file)?);
    }
    Ok(sums)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SizeComparison {
    pub a: u64,
    pub b: u64,
    pub equal: bool,
}

pub fn compare_sizes(a: &Path, b: &Path) -> Result<SizeComparison> {
    let a = dir_size(a)?;
    let b = dir_size(b)?;
    Ok(SizeComparison { a, b, equal: a == b })
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChecksumComparison {
    /// Present on both sides with different content.
    pub mismatched: Vec<PathBuf>,
    /// Present in `a` only.
    pub missing: Vec<PathBuf>,
    /// Present in `b` only.
    pub extra: Vec<PathBuf>,
}

impl ChecksumComparison {
    pub fn is_identical(&self) -> bool {
        self.mismatched.is_empty() && self.missing.is_empty() && self.extra.is_empty()
    }
}

pub fn compare_checksums(a: &Path, b: &Path, progress: &dyn ProgressSink) -> Result<ChecksumComparison> {
    let left = dir_checksums(a, progress)?;
    let right = dir_checksums(b, progress)?;
    Ok(diff_checksums(&left, &right))
}

pub fn diff_checksums(left: &ChecksumMap, right: &ChecksumMap) -> ChecksumComparison {
    let mut cmp = ChecksumComparison::default();
    for (path, sum) in left {
        match right.get(path) {
            Some(other) if other == sum => {}
            Some(_) => cmp.mismatched.push(path.clone()),
            None => cmp.missing.push(path.clone()),
        }
    }
    cmp.extra = right
        .keys()
        .filter(|p| !left.contains_key(*p))
        .cloned()
        .collect();
    cmp
}

/// Regular files of a walk. Any walk error fails the whole listing, so an
/// unreadable subtree cannot pass for an empty one.
fn regular_files(walk: WalkDir) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in walk {
        let entry = entry.map_err(walk_error)?;
        if entry.file_type().is_file() && !is_platform_artifact(&entry.file_name().to_string_lossy()) {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

/// Catalogued files whose content no longer matches the stored checksum.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogCheck {
    pub verified: usize,
    pub changed: Vec<PathBuf>,
    pub missing: Vec<PathBuf>,
    /// Recorded without a checksum, so nothing to compare against.
    pub unhashed: Vec<PathBuf>,
}

impl CatalogCheck {
    pub fn is_clean(&self) -> bool {
        self.changed.is_empty() && self.missing.is_empty()
    }
}

/// Re-hash every catalogued file of a shoot and compare it with its stored checksum.
pub fn verify_catalog(conn: &Connection, shoot: &str, progress: &dyn ProgressSink) -> Result<CatalogCheck> {
    let files = list_media_files(conn, shoot)?;
    let total = files.len() as u64;
    let mut check = CatalogCheck::default();

    for (i, file) in files.iter().enumerate() {
        let path = PathBuf::from(&file.path);
        progress.report(&Progress::new("verify", i as u64 + 1, total).with_message(file.file_name.clone()));

        let expected = match file.checksum {
            Some(ref sum) => sum,
            None => {
                check.unhashed.push(path);
                continue;
            }
        };
        if !path.is_file() {
            log::warn!("Catalogued file is gone: {}", path.display());
            check.missing.push(path);
            continue;
        }
        if compute_full_hash(&path)? == *expected {
            check.verified += 1;
        } else {
            log::warn!("Checksum changed: {}", path.display());
            check.changed.push(path);
        }
    }
    Ok(check)
}

fn walk_error(e: walkdir::Error) -> ShootError {
    match e.into_io_error() {
        Some(io) => ShootError::Io(io),
        None => ShootError::Other("Filesystem loop while walking".to_string()),
    }
}
