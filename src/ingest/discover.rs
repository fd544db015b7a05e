// Shoot tree listing
//
// Every walk lists entries sorted by file name so sequence numbers and proxy
// order do not depend on the filesystem's own listing order.

use std::fs;
use std::path::{Path, PathBuf};
use crate::constants::DS_STORE;
use crate::error::{Result, ShootError};

/// Entries of a directory, sorted by name, platform artifacts removed.
pub fn sorted_entries(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut entries = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if is_platform_artifact(&entry.file_name().to_string_lossy()) {
            continue;
        }
        entries.push(entry.path());
    }
    entries.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(entries)
}

/// Device folders of a shoot: its immediate child directories. Symlinked
/// directories are not device folders.
pub fn device_folders(shoot_root: &Path) -> Result<Vec<PathBuf>> {
    ensure_dir(shoot_root)?;
    Ok(sorted_entries(shoot_root)?
        .into_iter()
        .filter(|p| is_real_dir(p))
        .collect())
}

/// Files that sit directly under the shoot root instead of a device folder.
pub fn stray_root_files(shoot_root: &Path) -> Result<Vec<PathBuf>> {
    Ok(sorted_entries(shoot_root)?
        .into_iter()
        .filter(|p| p.is_file())
        .collect())
}

/// A directory that is not reached through a symlink.
pub fn is_real_dir(path: &Path) -> bool {
    fs::symlink_metadata(path)
        .map(|m| m.file_type().is_dir())
        .unwrap_or(false)
}

pub fn is_platform_artifact(name: &str) -> bool {
    name == DS_STORE
}

pub fn ensure_dir(path: &Path) -> Result<()> {
    if path.is_dir() {
        Ok(())
    } else {
        Err(ShootError::NotADirectory(path.to_path_buf()))
    }
}

/// Final path component as an owned string.
pub fn file_name_string(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_sorted_and_filtered() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        fs::create_dir(root.join("B-cam")).unwrap();
        fs::create_dir(root.join("A-cam")).unwrap();
        fs::write(root.join(DS_STORE), b"").unwrap();
        fs::write(root.join("notes.txt"), b"x").unwrap();

        let devices = device_folders(root).unwrap();
        let names: Vec<String> = devices.iter().map(|p| file_name_string(p)).collect();
        assert_eq!(names, vec!["A-cam", "B-cam"]);

        let stray = stray_root_files(root).unwrap();
        assert_eq!(stray.len(), 1);
        assert_eq!(file_name_string(&stray[0]), "notes.txt");
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinked_directory_is_not_a_device() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("shoot");
        let outside = tmp.path().join("outside");
        fs::create_dir_all(root.join("cam")).unwrap();
        fs::create_dir_all(&outside).unwrap();
        std::os::unix::fs::symlink(&outside, root.join("linked")).unwrap();

        let devices = device_folders(&root).unwrap();
        assert_eq!(devices, vec![root.join("cam")]);
        assert!(!is_real_dir(&root.join("linked")));
        assert!(is_real_dir(&outside));
    }

    #[test]
    fn test_missing_root_is_not_a_directory() {
        let tmp = TempDir::new().unwrap();
        let err = device_folders(&tmp.path().join("missing")).unwrap_err();
        assert!(matches!(err, ShootError::NotADirectory(_)));
    }
}
