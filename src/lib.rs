// Shootkit - library entry point
//
// Utilities for shoot folders (`{shoot}/{device}/{files}`): canonical renaming,
// proxy trees, media probing, transfer verification and a local catalog.

pub mod constants;
pub mod error;
pub mod config;
pub mod tools;
pub mod shoot;
pub mod progress;
pub mod hash;
pub mod metadata;
pub mod db;
pub mod ingest;
pub mod preview;
pub mod verify;

pub use error::{ProxyError, Result, ShootError};
pub use ingest::{rename_shoot, RenameOptions, RenameRecord, RenameReport};
pub use preview::{FailurePolicy, MediaTool, ProxyBuilder, ProxyOutcome, ProxyReport};
pub use shoot::ShootId;
