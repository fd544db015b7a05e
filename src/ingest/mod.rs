// Shoot ingest module
//
// - discover: sorted listing of a shoot tree
// - rename: canonical `{shoot}_{device}.{seq}` names
// - check: archive-wide name consistency report
// - pipeline: rename, probe, catalogue
// - scan: proxy-present and volume scans into the catalog

pub mod discover;
pub mod rename;
pub mod check;
pub mod pipeline;
pub mod scan;

pub use check::{check_names, NameCheckReport};
pub use pipeline::{ingest_shoot, IngestOptions, IngestResult};
pub use rename::{rename_shoot, RenameOptions, RenameRecord, RenameReport};
pub use scan::{scan_proxy_present, scan_volumes, ProxyPresentReport, VolumeShoot};
