// Shoot identifiers and the path conventions derived from them
//
// A shoot folder name starts with its date: "20240315.01.1234_ClientName".
// Year and month sit at fixed offsets with no separator.

use std::path::{Path, PathBuf};
use regex::Regex;

use crate::constants::{
    LEGACY_PROXY_SUFFIX, PROXY_MONTH_SUFFIX, PROXY_SHOOT_SUFFIX, SEQUENCE_WIDTH,
};
use crate::error::{Result, ShootError};

/// Parsed view of a shoot folder name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShootId {
    name: String,
    year: String,
    month: String,
    day: Option<String>,
}

impl ShootId {
    /// Parse a shoot folder name. The first six characters must be digits.
    pub fn parse(name: &str) -> Result<Self> {
        let bytes = name.as_bytes();
        if bytes.len() < 6 || !bytes[..6].iter().all(u8::is_ascii_digit) {
            return Err(ShootError::InvalidShootName(format!(
                "'{}' does not start with YYYYMM",
                name
            )));
        }

        let day = if bytes.len() >= 8 && bytes[6..8].iter().all(u8::is_ascii_digit) {
            Some(name[6..8].to_string())
        } else {
            None
        };

        Ok(Self {
            name: name.to_string(),
            year: name[0..4].to_string(),
            month: name[4..6].to_string(),
            day,
        })
    }

    /// Parse the final component of a shoot folder path.
    pub fn from_path(path: &Path) -> Result<Self> {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| ShootError::InvalidShootName(path.display().to_string()))?;
        Self::parse(name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn year(&self) -> &str {
        &self.year
    }

    pub fn month(&self) -> &str {
        &self.month
    }

    pub fn day(&self) -> Option<&str> {
        self.day.as_deref()
    }

    /// "YYYY_MM", the archive month folder.
    pub fn month_folder(&self) -> String {
        format!("{}_{}", self.year, self.month)
    }

    /// Proxy tree root for this shoot: `{proxy_root}/{YYYY}_{MM}_proxy/{name}.proxy`.
    pub fn proxy_destination(&self, proxy_root: &Path) -> PathBuf {
        proxy_root
            .join(format!("{}{}", self.month_folder(), PROXY_MONTH_SUFFIX))
            .join(format!("{}{}", self.name, PROXY_SHOOT_SUFFIX))
    }

    /// Archive location on a volume: `{volumes_root}/{volume}/{YYYY}_{MM}/{DD}/{name}`.
    pub fn archive_path(&self, volumes_root: &Path, volume: &str) -> Result<PathBuf> {
        let day = self.day.as_deref().ok_or_else(|| {
            ShootError::InvalidShootName(format!("'{}' has no day component", self.name))
        })?;
        Ok(volumes_root
            .join(volume)
            .join(self.month_folder())
            .join(day)
            .join(&self.name))
    }
}

/// Canonical renamed file name: `{shoot}_{device}.{seq:04}{ext}`.
/// `ext` includes its leading dot, or is empty.
pub fn canonical_file_name(shoot: &str, device: &str, sequence: u32, ext: &str) -> String {
    format!(
        "{}_{}.{:0width$}{}",
        shoot,
        device,
        sequence,
        ext,
        width = SEQUENCE_WIDTH
    )
}

/// Pattern matching canonical names for one shoot/device pair.
/// Capture 1 is the sequence number. Sequences past 9999 grow a fifth digit,
/// so the width is a minimum.
pub fn canonical_pattern(shoot: &str, device: &str) -> Result<Regex> {
    let pattern = format!(
        r"^{}_{}\.(\d{{{},}})(\.[^.]*)?$",
        regex::escape(shoot),
        regex::escape(device),
        SEQUENCE_WIDTH
    );
    Regex::new(&pattern).map_err(|e| ShootError::Other(format!("Bad canonical pattern: {}", e)))
}

/// True for archive month folders named "YYYY_MM".
pub fn is_month_folder(name: &str) -> bool {
    Regex::new(r"^\d{4}_\d{2}$")
        .map(|re| re.is_match(name))
        .unwrap_or(false)
}

/// Shoot name behind a proxy folder name ("X.proxy" or legacy "X_proxy").
pub fn strip_proxy_suffix(folder_name: &str) -> Option<&str> {
    folder_name
        .strip_suffix(PROXY_SHOOT_SUFFIX)
        .or_else(|| folder_name.strip_suffix(LEGACY_PROXY_SUFFIX))
        .filter(|s| !s.is_empty())
}

/// Lowercased extension without the dot.
pub fn lowercase_extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
}

/// Extension with its leading dot, original case kept. Empty when absent.
pub fn dotted_extension(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_shoot_name() {
        let id = ShootId::parse("20240315.01.1234_ClientName").unwrap();
        assert_eq!(id.year(), "2024");
        assert_eq!(id.month(), "03");
        assert_eq!(id.day(), Some("15"));
    }

    #[test]
    fn test_parse_rejects_non_date_names() {
        assert!(ShootId::parse("ClientName").is_err());
        assert!(ShootId::parse("2024").is_err());
        assert!(ShootId::parse("2024-03-15").is_err());
    }

    #[test]
    fn test_month_only_name_has_no_day() {
        let id = ShootId::parse("202403_misc").unwrap();
        assert_eq!(id.day(), None);
        assert!(id.archive_path(Path::new("/Volumes"), "nas1").is_err());
    }

    #[test]
    fn test_proxy_destination() {
        let id = ShootId::parse("20240315.01.1234_ClientName").unwrap();
        let dest = id.proxy_destination(Path::new("/proxy-root"));
        assert_eq!(
            dest,
            PathBuf::from("/proxy-root/2024_03_proxy/20240315.01.1234_ClientName.proxy")
        );
    }

    #[test]
    fn test_archive_path() {
        let id = ShootId::parse("20240315.01.1234_ClientName").unwrap();
        let path = id.archive_path(Path::new("/Volumes"), "nas1").unwrap();
        assert_eq!(
            path,
            PathBuf::from("/Volumes/nas1/2024_03/15/20240315.01.1234_ClientName")
        );
    }

    #[test]
    fn test_canonical_name_and_pattern() {
        let name = canonical_file_name("20240315.01_Acme", "A7S", 7, ".MP4");
        assert_eq!(name, "20240315.01_Acme_A7S.0007.MP4");

        let re = canonical_pattern("20240315.01_Acme", "A7S").unwrap();
        let caps = re.captures(&name).unwrap();
        assert_eq!(&caps[1], "0007");
        assert!(!re.is_match("20240315.01_Acme_B-cam.0007.MP4"));
        assert!(!re.is_match("C0001.MP4"));
        assert!(!re.is_match("20240315.01_Acme_A7S.007.MP4"));
    }

    #[test]
    fn test_sequence_past_four_digits() {
        let name = canonical_file_name("20240315.01_Acme", "A7S", 10_000, ".MP4");
        assert_eq!(name, "20240315.01_Acme_A7S.10000.MP4");

        let re = canonical_pattern("20240315.01_Acme", "A7S").unwrap();
        assert_eq!(&re.captures(&name).unwrap()[1], "10000");
    }

    #[test]
    fn test_month_folder_pattern() {
        assert!(is_month_folder("2024_03"));
        assert!(!is_month_folder("2024-03"));
        assert!(!is_month_folder("2024_03_proxy"));
    }

    #[test]
    fn test_strip_proxy_suffix() {
        assert_eq!(strip_proxy_suffix("20240315_A.proxy"), Some("20240315_A"));
        assert_eq!(strip_proxy_suffix("20240315_A_proxy"), Some("20240315_A"));
        assert_eq!(strip_proxy_suffix("20240315_A"), None);
    }

    #[test]
    fn test_extensions() {
        assert_eq!(lowercase_extension(Path::new("a/CLIP.MOV")), Some("mov".to_string()));
        assert_eq!(dotted_extension(Path::new("a/CLIP.MOV")), ".MOV");
        assert_eq!(dotted_extension(Path::new("a/README")), "");
    }
}
