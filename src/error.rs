// Shootkit Error Types

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ShootError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid shoot name: {0}")]
    InvalidShootName(String),

    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    #[error("{tool} failed: {reason}")]
    Tool { tool: String, reason: String },

    #[error("{tool} timed out after {secs}s")]
    ToolTimeout { tool: String, secs: u64 },

    #[error("Hash error: {0}")]
    Hash(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, ShootError>;

/// Errors that end a proxy run. Kept apart from `ShootError` so batch callers
/// can tell a shoot that was already proxied from one that broke halfway.
#[derive(Error, Debug)]
pub enum ProxyError {
    #[error("A directory already exists at {0}. Remove or rename it before proceeding.")]
    DestinationExists(PathBuf),

    #[error("Invalid shoot name: {0}")]
    InvalidShootName(String),

    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    #[error("Proxy of {path} failed: {reason}")]
    Tool { path: PathBuf, reason: String },

    #[error("Proxy of {path} timed out after {secs}s")]
    Timeout { path: PathBuf, secs: u64 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<ShootError> for ProxyError {
    fn from(err: ShootError) -> Self {
        match err {
            ShootError::Io(e) => ProxyError::Io(e),
            ShootError::InvalidShootName(name) => ProxyError::InvalidShootName(name),
            ShootError::NotADirectory(path) => ProxyError::NotADirectory(path),
            other => ProxyError::Io(std::io::Error::new(std::io::ErrorKind::Other, other.to_string())),
        }
    }
}
