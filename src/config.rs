// Shootkit settings
//
// Resolution order: defaults, then the JSON settings file, then SHOOTKIT_*
// environment variables. The CLI applies its flags last.

use std::path::{Path, PathBuf};
use std::time::Duration;
use serde::{Deserialize, Serialize};

use crate::constants::{
    APP_NAME, APP_ORGANIZATION, APP_QUALIFIER, CATALOG_FILENAME,
    DEFAULT_EXCLUDED_DEVICE_MARKERS, DEFAULT_PROXY_ROOT, DEFAULT_VOLUMES_ROOT,
    SETTINGS_FILENAME,
};
use crate::error::{Result, ShootError};
use crate::preview::FailurePolicy;

pub const ENV_PROXY_ROOT: &str = "SHOOTKIT_PROXY_ROOT";
pub const ENV_VOLUMES_ROOT: &str = "SHOOTKIT_VOLUMES_ROOT";
pub const ENV_CATALOG: &str = "SHOOTKIT_CATALOG";
pub const ENV_TOOL_TIMEOUT: &str = "SHOOTKIT_TOOL_TIMEOUT_SECS";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    /// Root holding the `{YYYY}_{MM}_proxy` folders.
    pub proxy_root: PathBuf,
    /// Mount root holding archive volumes.
    pub volumes_root: PathBuf,
    pub catalog_path: Option<PathBuf>,
    /// Per-call limit for ffmpeg/ffprobe/exiftool. None or 0 waits forever.
    pub tool_timeout_secs: Option<u64>,
    pub failure_policy: FailurePolicy,
    pub excluded_device_markers: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            proxy_root: PathBuf::from(DEFAULT_PROXY_ROOT),
            volumes_root: PathBuf::from(DEFAULT_VOLUMES_ROOT),
            catalog_path: None,
            tool_timeout_secs: None,
            failure_policy: FailurePolicy::default(),
            excluded_device_markers: DEFAULT_EXCLUDED_DEVICE_MARKERS
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl Settings {
    /// Load settings from `explicit`, or from the per-user settings file when
    /// it exists, then apply environment overrides.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut settings = match explicit {
            Some(path) => Self::from_file(path)?,
            None => match default_settings_path() {
                Some(path) if path.exists() => Self::from_file(&path)?,
                _ => Self::default(),
            },
        };

        settings.apply_env_from(|key| std::env::var(key).ok())?;
        Ok(settings)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            ShootError::Config(format!("Cannot read settings {}: {}", path.display(), e))
        })?;
        let settings = serde_json::from_str(&text).map_err(|e| {
            ShootError::Config(format!("Invalid settings {}: {}", path.display(), e))
        })?;
        log::debug!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    /// Apply overrides from a variable lookup.
    pub fn apply_env_from<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup(ENV_PROXY_ROOT) {
            self.proxy_root = PathBuf::from(v);
        }
        if let Some(v) = lookup(ENV_VOLUMES_ROOT) {
            self.volumes_root = PathBuf::from(v);
        }
        if let Some(v) = lookup(ENV_CATALOG) {
            self.catalog_path = Some(PathBuf::from(v));
        }
        if let Some(v) = lookup(ENV_TOOL_TIMEOUT) {
            let secs = v.trim().parse::<u64>().map_err(|_| {
                ShootError::Config(format!("{} must be a number of seconds, got '{}'", ENV_TOOL_TIMEOUT, v))
            })?;
            self.tool_timeout_secs = Some(secs);
        }
        Ok(())
    }

    pub fn tool_timeout(&self) -> Option<Duration> {
        self.tool_timeout_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }

    /// Catalog database location, defaulting to the per-user data directory.
    pub fn catalog_path(&self) -> PathBuf {
        if let Some(ref path) = self.catalog_path {
            return path.clone();
        }
        project_dirs()
            .map(|d| d.data_dir().join(CATALOG_FILENAME))
            .unwrap_or_else(|| PathBuf::from(CATALOG_FILENAME))
    }
}

fn project_dirs() -> Option<directories::ProjectDirs> {
    directories::ProjectDirs::from(APP_QUALIFIER, APP_ORGANIZATION, APP_NAME)
}

/// Per-user settings file, e.g. ~/.config/shootkit/settings.json
pub fn default_settings_path() -> Option<PathBuf> {
    project_dirs().map(|d| d.config_dir().join(SETTINGS_FILENAME))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("settings.json");
        std::fs::write(&path, r#"{ "proxyRoot": "/mnt/proxy", "failurePolicy": "abort" }"#).unwrap();

        let settings = Settings::from_file(&path).unwrap();
        assert_eq!(settings.proxy_root, PathBuf::from("/mnt/proxy"));
        assert_eq!(settings.failure_policy, FailurePolicy::Abort);
        assert_eq!(settings.volumes_root, PathBuf::from(DEFAULT_VOLUMES_ROOT));
        assert_eq!(settings.excluded_device_markers.len(), 2);
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            (ENV_PROXY_ROOT, "/env/proxy"),
            (ENV_TOOL_TIMEOUT, "90"),
        ]
        .into_iter()
        .collect();

        let mut settings = Settings::default();
        settings
            .apply_env_from(|k| vars.get(k).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(settings.proxy_root, PathBuf::from("/env/proxy"));
        assert_eq!(settings.tool_timeout(), Some(Duration::from_secs(90)));
    }

    #[test]
    fn test_bad_timeout_is_config_error() {
        let mut settings = Settings::default();
        let err = settings
            .apply_env_from(|k| (k == ENV_TOOL_TIMEOUT).then(|| "soon".to_string()))
            .unwrap_err();
        assert!(matches!(err, ShootError::Config(_)));
    }

    #[test]
    fn test_zero_timeout_means_none() {
        let settings = Settings { tool_timeout_secs: Some(0), ..Default::default() };
        assert_eq!(settings.tool_timeout(), None);
    }

    #[test]
    fn test_missing_explicit_file_is_error() {
        let err = Settings::load(Some(Path::new("/nonexistent/shootkit.json"))).unwrap_err();
        assert!(matches!(err, ShootError::Config(_)));
    }
}
