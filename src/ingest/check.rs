// Naming audit over an archive of month folders
//
// Walks `{root}/{YYYY_MM}/...` and flags files whose name does not start with
// `{shoot}_{device}`, where shoot and device are the grandparent and parent
// folder names.

use std::fs;
use std::path::{Path, PathBuf};
use serde::Serialize;

use crate::constants::NAME_CHECK_IGNORED_EXTENSION;
use crate::error::Result;
use crate::shoot::{is_month_folder, lowercase_extension};
use super::discover::{ensure_dir, file_name_string};

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NameCheckReport {
    pub processed_months: Vec<String>,
    pub skipped_folders: Vec<String>,
    pub inconsistent: Vec<PathBuf>,
}

impl NameCheckReport {
    pub fn is_consistent(&self) -> bool {
        self.inconsistent.is_empty()
    }
}

/// Check every month folder under `root`.
///
/// Device folders whose lowercased name contains one of `excluded_markers`
/// hold files from tools that keep their own names and are not checked.
pub fn check_names(root: &Path, excluded_markers: &[String]) -> Result<NameCheckReport> {
    ensure_dir(root)?;
    let mut report = NameCheckReport::default();

    let mut months: Vec<PathBuf> = Vec::new();
    for entry in fs::read_dir(root)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            months.push(entry.path());
        }
    }
    months.sort();

    for month in months {
        let name = file_name_string(&month);
        if is_month_folder(&name) {
            log::info!("Processing folder: {}", name);
            check_directory(&month, excluded_markers, &mut report)?;
            report.processed_months.push(name);
        } else {
            log::warn!("Skipping inconsistent folder name: {}", name);
            report.skipped_folders.push(name);
        }
    }

    log::info!(
        "File consistency check complete: {} inconsistent",
        report.inconsistent.len()
    );
    Ok(report)
}

fn check_directory(dir: &Path, excluded_markers: &[String], report: &mut NameCheckReport) -> Result<()> {
    let mut entries: Vec<_> = fs::read_dir(dir)?.collect::<std::io::Result<_>>()?;
    entries.sort_by_key(|e| e.file_name());

    for entry in entries {
        let path = entry.path();
        // lstat semantics: symlinks are neither followed nor checked
        let file_type = entry.file_type()?;

        if file_type.is_dir() {
            check_directory(&path, excluded_markers, report)?;
        } else if file_type.is_file() && !is_name_consistent(&path, excluded_markers) {
            log::warn!("Inconsistent file: {}", path.display());
            report.inconsistent.push(path);
        }
    }

    Ok(())
}

/// True when the file follows `{shoot}_{device}...` or is exempt from the check.
pub fn is_name_consistent(path: &Path, excluded_markers: &[String]) -> bool {
    let name = file_name_string(path);
    if name.starts_with('.') {
        return true;
    }
    if lowercase_extension(path).as_deref() == Some(NAME_CHECK_IGNORED_EXTENSION) {
        return true;
    }

    let device_dir = path.parent();
    let device = device_dir.map(file_name_string).unwrap_or_default();
    let shoot = device_dir
        .and_then(Path::parent)
        .map(file_name_string)
        .unwrap_or_default();

    let device_lower = device.to_lowercase();
    if excluded_markers
        .iter()
        .any(|marker| device_lower.contains(&marker.to_lowercase()))
    {
        return true;
    }

    name.starts_with(&format!("{}_{}", shoot, device))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::DEFAULT_EXCLUDED_DEVICE_MARKERS;
    use tempfile::TempDir;

    fn markers() -> Vec<String> {
        DEFAULT_EXCLUDED_DEVICE_MARKERS.iter().map(|s| s.to_string()).collect()
    }

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"x").unwrap();
    }

    #[test]
    fn test_flags_only_inconsistent_files() {
        let tmp = TempDir::new().unwrap();
        let month = tmp.path().join("2024_03");
        let shoot = month.join("15").join("20240315_Acme");

        touch(&shoot.join("A7S").join("20240315_Acme_A7S.0001.MP4"));
        touch(&shoot.join("A7S").join("C0002.MP4"));
        touch(&shoot.join("A7S").join("notes.txt"));
        touch(&shoot.join("A7S").join(".hidden"));
        touch(&shoot.join("GarageBand Export").join("mix.aif"));
        touch(&tmp.path().join("misc").join("whatever.mp4"));

        let report = check_names(tmp.path(), &markers()).unwrap();
        assert_eq!(report.processed_months, vec!["2024_03".to_string()]);
        assert_eq!(report.skipped_folders, vec!["misc".to_string()]);
        assert_eq!(report.inconsistent, vec![shoot.join("A7S").join("C0002.MP4")]);
        assert!(!report.is_consistent());
    }

    #[test]
    fn test_consistent_archive() {
        let tmp = TempDir::new().unwrap();
        let shoot = tmp.path().join("2024_04").join("01").join("20240401_B");
        touch(&shoot.join("cam").join("20240401_B_cam.0001.mov"));

        let report = check_names(tmp.path(), &markers()).unwrap();
        assert!(report.is_consistent());
    }
}
