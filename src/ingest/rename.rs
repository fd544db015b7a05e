// Canonical renaming of a shoot tree
//
// Every file below a device folder becomes `{shoot}_{device}.{seq:04}{ext}`.
// Each device folder has one counter, shared by files nested at any depth
// beneath it. Renames happen in place; nothing is rolled back.

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use serde::Serialize;

use crate::constants::{SEQUENCE_LIMIT, TEMP_FILE_PREFIX};
use crate::error::Result;
use crate::shoot::{canonical_file_name, canonical_pattern, dotted_extension};
use super::discover::{ensure_dir, file_name_string, is_real_dir, sorted_entries};

/// New path -> original basename, for every file renamed in one pass.
pub type RenameRecord = BTreeMap<PathBuf, String>;

#[derive(Debug, Clone, Default)]
pub struct RenameOptions {
    /// Leave files that already carry their canonical name alone and keep
    /// their sequence numbers reserved. Off by default: a second pass over a
    /// renamed shoot renumbers everything from the current listing.
    pub keep_canonical: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenameFailure {
    pub path: PathBuf,
    pub target: Option<PathBuf>,
    pub error: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenameReport {
    pub shoot_root: PathBuf,
    pub record: RenameRecord,
    pub failures: Vec<RenameFailure>,
    /// Files left untouched: strays at the shoot root, and canonical files
    /// when `keep_canonical` is set.
    pub skipped: Vec<PathBuf>,
}

impl RenameReport {
    pub fn renamed(&self) -> usize {
        self.record.len()
    }

    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// One planned move.
#[derive(Debug)]
struct PlannedRename {
    source: PathBuf,
    target: PathBuf,
    original_name: String,
}

/// A file parked under a temporary name because its target was still taken.
#[derive(Debug)]
struct StagedRename {
    temp: PathBuf,
    planned: PlannedRename,
}

/// Rename every file of a shoot to its canonical name.
pub fn rename_shoot(shoot_root: &Path, options: &RenameOptions) -> Result<RenameReport> {
    ensure_dir(shoot_root)?;
    let shoot = file_name_string(shoot_root);

    let mut report = RenameReport {
        shoot_root: shoot_root.to_path_buf(),
        record: RenameRecord::new(),
        failures: Vec::new(),
        skipped: Vec::new(),
    };

    let mut plan = Vec::new();
    for entry in sorted_entries(shoot_root)? {
        if is_real_dir(&entry) {
            let device = file_name_string(&entry);
            plan_device(&shoot, &device, &entry, options, &mut plan, &mut report)?;
        } else if entry.is_dir() {
            log::warn!("Skipping {}: symlinked directory", entry.display());
            report.skipped.push(entry);
        } else {
            log::warn!("Skipping {}: not inside a device folder", entry.display());
            report.skipped.push(entry);
        }
    }

    execute_plan(plan, &mut report);

    log::info!(
        "Renamed {} files in {} ({} failed, {} skipped)",
        report.renamed(),
        shoot,
        report.failures.len(),
        report.skipped.len()
    );

    Ok(report)
}

fn plan_device(
    shoot: &str,
    device: &str,
    device_dir: &Path,
    options: &RenameOptions,
    plan: &mut Vec<PlannedRename>,
    report: &mut RenameReport,
) -> Result<()> {
    let mut files = Vec::new();
    collect_files(device_dir, &mut files, report);

    let mut reserved = HashSet::new();
    if options.keep_canonical {
        let pattern = canonical_pattern(shoot, device)?;
        files.retain(|file| {
            let name = file_name_string(file);
            match pattern.captures(&name).and_then(|c| c[1].parse::<u32>().ok()) {
                Some(seq) => {
                    reserved.insert(seq);
                    report.skipped.push(file.clone());
                    false
                }
                None => true,
            }
        });
    }

    let mut sequence = 0u32;
    for file in files {
        sequence += 1;
        while reserved.contains(&sequence) {
            sequence += 1;
        }

        if sequence == SEQUENCE_LIMIT + 1 {
            log::warn!(
                "{} has more than {} files; sequence numbers grow past four digits",
                device_dir.display(),
                SEQUENCE_LIMIT
            );
        }

        let new_name = canonical_file_name(shoot, device, sequence, &dotted_extension(&file));
        let parent = file.parent().unwrap_or(device_dir);
        plan.push(PlannedRename {
            target: parent.join(new_name),
            original_name: file_name_string(&file),
            source: file,
        });
    }

    Ok(())
}

/// Depth-first, name-sorted file list below a device folder.
fn collect_files(dir: &Path, files: &mut Vec<PathBuf>, report: &mut RenameReport) {
    let entries = match sorted_entries(dir) {
        Ok(entries) => entries,
        Err(e) => {
            log::error!("Failed to list {}: {}", dir.display(), e);
            report.failures.push(RenameFailure {
                path: dir.to_path_buf(),
                target: None,
                error: e.to_string(),
            });
            return;
        }
    };

    for entry in entries {
        if is_real_dir(&entry) {
            collect_files(&entry, files, report);
        } else if entry.is_dir() {
            log::warn!("Not following symlinked directory {}", entry.display());
            report.skipped.push(entry);
        } else {
            files.push(entry);
        }
    }
}

fn execute_plan(plan: Vec<PlannedRename>, report: &mut RenameReport) {
    let mut staged = Vec::new();

    for planned in plan {
        if planned.source == planned.target {
            report.record.insert(planned.target, planned.original_name);
            continue;
        }

        // Target still held by a sibling that has not moved yet
        if fs::symlink_metadata(&planned.target).is_ok() {
            let parent = planned.source.parent().unwrap_or(Path::new("."));
            let temp = parent.join(format!("{}{}", TEMP_FILE_PREFIX, uuid::Uuid::new_v4()));
            match fs::rename(&planned.source, &temp) {
                Ok(()) => staged.push(StagedRename { temp, planned }),
                Err(e) => record_failure(report, &planned, &e.to_string()),
            }
            continue;
        }

        match fs::rename(&planned.source, &planned.target) {
            Ok(()) => {
                log::debug!("Renamed {} -> {}", planned.source.display(), planned.target.display());
                report.record.insert(planned.target, planned.original_name);
            }
            Err(e) => record_failure(report, &planned, &e.to_string()),
        }
    }

    for StagedRename { temp, planned } in staged {
        if fs::symlink_metadata(&planned.target).is_ok() {
            record_failure(report, &planned, "target name already exists");
            restore_staged(&temp, &planned.source);
            continue;
        }

        match fs::rename(&temp, &planned.target) {
            Ok(()) => {
                log::debug!("Renamed {} -> {}", planned.source.display(), planned.target.display());
                report.record.insert(planned.target, planned.original_name);
            }
            Err(e) => {
                record_failure(report, &planned, &e.to_string());
                restore_staged(&temp, &planned.source);
            }
        }
    }
}

fn record_failure(report: &mut RenameReport, planned: &PlannedRename, error: &str) {
    log::error!(
        "Error renaming file from: {} to: {}. Error: {}",
        planned.source.display(),
        planned.target.display(),
        error
    );
    report.failures.push(RenameFailure {
        path: planned.source.clone(),
        target: Some(planned.target.clone()),
        error: error.to_string(),
    });
}

/// Put a staged file back under its original name when that name is free.
fn restore_staged(temp: &Path, source: &Path) {
    if fs::symlink_metadata(source).is_ok() {
        log::error!(
            "Cannot restore {}: its original name {} is taken; file left as {}",
            source.display(),
            source.display(),
            temp.display()
        );
        return;
    }
    if let Err(e) = fs::rename(temp, source) {
        log::error!("Failed to restore {} from {}: {}", source.display(), temp.display(), e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use regex::Regex;
    use tempfile::TempDir;

    const SHOOT: &str = "20240315.01.1234_ClientName";

    fn make_shoot(tmp: &TempDir, files: &[(&str, &str)]) -> PathBuf {
        let root = tmp.path().join(SHOOT);
        for (rel, content) in files {
            let path = root.join(rel);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(&path, content).unwrap();
        }
        root
    }

    fn names_in(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_renames_per_device_counter() {
        let tmp = TempDir::new().unwrap();
        let root = make_shoot(&tmp, &[
            ("A7S/C0002.MP4", "second"),
            ("A7S/C0001.MP4", "first"),
            ("A7S/.DS_Store", ""),
            ("ZOOM/take2.WAV", "take2"),
            ("ZOOM/sub/take1.WAV", "take1"),
        ]);

        let report = rename_shoot(&root, &RenameOptions::default()).unwrap();
        assert!(report.is_complete());
        assert_eq!(report.renamed(), 4);

        assert_eq!(
            names_in(&root.join("A7S")),
            vec![
                ".DS_Store".to_string(),
                format!("{}_A7S.0001.MP4", SHOOT),
                format!("{}_A7S.0002.MP4", SHOOT),
            ]
        );
        let first = root.join("A7S").join(format!("{}_A7S.0001.MP4", SHOOT));
        assert_eq!(fs::read_to_string(&first).unwrap(), "first");
        assert_eq!(report.record.get(&first).map(String::as_str), Some("C0001.MP4"));

        // Nested files share the device counter; "sub" sorts before "take2.WAV"
        let nested = root.join("ZOOM/sub").join(format!("{}_ZOOM.0001.WAV", SHOOT));
        assert_eq!(fs::read_to_string(&nested).unwrap(), "take1");
        let flat = root.join("ZOOM").join(format!("{}_ZOOM.0002.WAV", SHOOT));
        assert_eq!(fs::read_to_string(&flat).unwrap(), "take2");
    }

    #[test]
    fn test_sequences_are_gapless_and_match_pattern() {
        let tmp = TempDir::new().unwrap();
        let files: Vec<(String, &str)> = (0..12)
            .map(|i| (format!("cam/IMG_{:03}.JPG", 40 - i), "x"))
            .collect();
        let refs: Vec<(&str, &str)> = files.iter().map(|(p, c)| (p.as_str(), *c)).collect();
        let root = make_shoot(&tmp, &refs);

        let report = rename_shoot(&root, &RenameOptions::default()).unwrap();
        assert_eq!(report.renamed(), 12);

        let pattern = Regex::new(&format!(
            r"^{}_{}\.(\d{{4}})\.[^.]+$",
            regex::escape(SHOOT),
            "cam"
        ))
        .unwrap();
        let mut seqs: Vec<u32> = names_in(&root.join("cam"))
            .iter()
            .map(|n| pattern.captures(n).expect("canonical name")[1].parse().unwrap())
            .collect();
        seqs.sort();
        assert_eq!(seqs, (1..=12).collect::<Vec<u32>>());
    }

    #[test]
    fn test_rerun_is_not_idempotent() {
        let tmp = TempDir::new().unwrap();
        let root = make_shoot(&tmp, &[
            ("cam/clip1.mp4", "one"),
            ("cam/clip2.mp4", "two"),
        ]);
        rename_shoot(&root, &RenameOptions::default()).unwrap();

        // A late file that sorts ahead of the renamed ones shifts every number
        fs::write(root.join("cam/0000.mp4"), "late").unwrap();

        let report = rename_shoot(&root, &RenameOptions::default()).unwrap();
        assert!(report.is_complete());
        assert_eq!(report.renamed(), 3);

        let dir = root.join("cam");
        let read = |seq: u32| {
            fs::read_to_string(dir.join(format!("{}_cam.{:04}.mp4", SHOOT, seq))).unwrap()
        };
        assert_eq!(read(1), "late");
        assert_eq!(read(2), "one");
        assert_eq!(read(3), "two");

        // Every previously renamed file moved to a new name
        assert_eq!(report.record.get(&dir.join(format!("{}_cam.0002.mp4", SHOOT))).unwrap(),
            &format!("{}_cam.0001.mp4", SHOOT));
        assert_eq!(report.record.get(&dir.join(format!("{}_cam.0003.mp4", SHOOT))).unwrap(),
            &format!("{}_cam.0002.mp4", SHOOT));
        assert!(!names_in(&dir).iter().any(|n| n.starts_with(TEMP_FILE_PREFIX)));
    }

    #[test]
    fn test_keep_canonical_reserves_numbers() {
        let tmp = TempDir::new().unwrap();
        let root = make_shoot(&tmp, &[
            ("cam/clip1.mp4", "one"),
            ("cam/clip2.mp4", "two"),
        ]);
        rename_shoot(&root, &RenameOptions::default()).unwrap();
        fs::write(root.join("cam/0000.mp4"), "late").unwrap();

        let options = RenameOptions { keep_canonical: true };
        let report = rename_shoot(&root, &options).unwrap();
        assert_eq!(report.renamed(), 1);
        assert_eq!(report.skipped.len(), 2);

        let dir = root.join("cam");
        let read = |seq: u32| {
            fs::read_to_string(dir.join(format!("{}_cam.{:04}.mp4", SHOOT, seq))).unwrap()
        };
        assert_eq!(read(1), "one");
        assert_eq!(read(2), "two");
        assert_eq!(read(3), "late");
    }

    #[test]
    fn test_root_files_are_skipped() {
        let tmp = TempDir::new().unwrap();
        let root = make_shoot(&tmp, &[
            ("stray.mp4", "stray"),
            ("cam/a.mp4", "a"),
        ]);

        let report = rename_shoot(&root, &RenameOptions::default()).unwrap();
        assert_eq!(report.renamed(), 1);
        assert_eq!(report.skipped, vec![root.join("stray.mp4")]);
        assert!(root.join("stray.mp4").exists());
    }

    #[test]
    fn test_file_without_extension() {
        let tmp = TempDir::new().unwrap();
        let root = make_shoot(&tmp, &[("cam/README", "r")]);

        rename_shoot(&root, &RenameOptions::default()).unwrap();
        assert!(root.join("cam").join(format!("{}_cam.0001", SHOOT)).exists());
    }

    #[test]
    fn test_two_devices_each_match_their_own_pattern() {
        let tmp = TempDir::new().unwrap();
        let root = make_shoot(&tmp, &[
            ("A7S/C0003.MP4", "a3"),
            ("A7S/C0001.MP4", "a1"),
            ("A7S/C0002.MP4", "a2"),
            ("ZOOM/take_b.WAV", "zb"),
            ("ZOOM/take_a.WAV", "za"),
        ]);

        let report = rename_shoot(&root, &RenameOptions::default()).unwrap();
        assert_eq!(report.renamed(), 5);

        for (device, count) in [("A7S", 3u32), ("ZOOM", 2u32)] {
            let pattern = canonical_pattern(SHOOT, device).unwrap();
            let mut seqs: Vec<u32> = names_in(&root.join(device))
                .iter()
                .map(|n| pattern.captures(n).expect("canonical name")[1].parse().unwrap())
                .collect();
            seqs.sort();
            assert_eq!(seqs, (1..=count).collect::<Vec<u32>>());
        }

        let first_zoom = root.join("ZOOM").join(format!("{}_ZOOM.0001.WAV", SHOOT));
        assert_eq!(fs::read_to_string(first_zoom).unwrap(), "za");
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinked_directories_are_not_followed() {
        let tmp = TempDir::new().unwrap();
        let root = make_shoot(&tmp, &[("cam/a.mov", "a")]);
        let outside = tmp.path().join("outside");
        fs::create_dir_all(&outside).unwrap();
        fs::write(outside.join("precious.mov"), "keep").unwrap();
        std::os::unix::fs::symlink(&outside, root.join("cam/link")).unwrap();
        std::os::unix::fs::symlink(&outside, root.join("linked-device")).unwrap();

        let report = rename_shoot(&root, &RenameOptions::default()).unwrap();
        assert!(report.is_complete());
        assert_eq!(report.renamed(), 1);
        assert!(report.skipped.contains(&root.join("cam/link")));
        assert!(report.skipped.contains(&root.join("linked-device")));
        assert_eq!(names_in(&outside), vec!["precious.mov".to_string()]);
    }
}
