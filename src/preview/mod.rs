// Proxy tree generation
//
// Mirrors a shoot into `{proxy_root}/{YYYY}_{MM}_proxy/{shoot}.proxy/{device}/`:
// - videos are compressed with ffmpeg
// - stills are converted to JPG
// - small or already-compressed media is copied as-is
// - anything else is listed in omitted_files.txt

pub mod proxy;

use std::fs;
use std::path::{Path, PathBuf};
use serde::{Deserialize, Serialize};

use crate::constants::{
    IMAGE_PROXY_EXTENSION, OMITTED_FILES_NAME, PROXY_COMPRESS_IMAGE_EXTENSIONS,
    PROXY_PASSTHROUGH_EXTENSIONS, PROXY_VIDEO_EXTENSIONS,
};
use crate::error::{ProxyError, ShootError};
use crate::ingest::discover::{device_folders, ensure_dir, file_name_string, sorted_entries, stray_root_files};
use crate::progress::{NoProgress, Progress, ProgressSink};
use crate::shoot::{lowercase_extension, ShootId};

pub use proxy::{copy_with_verify, proxy_one, Ffmpeg, MediaTool};

/// What to do when a single file fails to proxy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FailurePolicy {
    /// Record the failure and keep going.
    #[default]
    SkipAndRecord,
    /// Stop the run and return the error.
    Abort,
}

/// How a source file is turned into a proxy artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProxyClass {
    Video,
    Image,
    PassThrough,
    Unknown,
}

impl ProxyClass {
    pub fn classify(path: &Path) -> Self {
        let ext = match lowercase_extension(path) {
            Some(ext) => ext,
            None => return ProxyClass::Unknown,
        };
        let ext = ext.as_str();

        if PROXY_VIDEO_EXTENSIONS.contains(&ext) {
            ProxyClass::Video
        } else if PROXY_COMPRESS_IMAGE_EXTENSIONS.contains(&ext) {
            ProxyClass::Image
        } else if PROXY_PASSTHROUGH_EXTENSIONS.contains(&ext) {
            ProxyClass::PassThrough
        } else {
            ProxyClass::Unknown
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CompressKind {
    Video,
    Image,
}

/// Result of proxying one file.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum ProxyOutcome {
    Compressed { output: PathBuf, kind: CompressKind },
    Copied { output: PathBuf },
    Omitted,
    Failed { reason: String },
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxyEntry {
    pub source: PathBuf,
    pub device: String,
    pub outcome: ProxyOutcome,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxyReport {
    pub destination: PathBuf,
    pub entries: Vec<ProxyEntry>,
    /// Basenames written to omitted_files.txt, in visit order.
    pub omitted: Vec<String>,
}

impl ProxyReport {
    fn new(destination: PathBuf) -> Self {
        Self { destination, entries: Vec::new(), omitted: Vec::new() }
    }

    pub fn compressed(&self) -> usize {
        self.count(|o| matches!(o, ProxyOutcome::Compressed { .. }))
    }

    pub fn copied(&self) -> usize {
        self.count(|o| matches!(o, ProxyOutcome::Copied { .. }))
    }

    pub fn failed(&self) -> Vec<&ProxyEntry> {
        self.entries
            .iter()
            .filter(|e| matches!(e.outcome, ProxyOutcome::Failed { .. }))
            .collect()
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.destination.join(OMITTED_FILES_NAME)
    }

    fn count(&self, pred: impl Fn(&ProxyOutcome) -> bool) -> usize {
        self.entries.iter().filter(|e| pred(&e.outcome)).count()
    }
}

/// Builds the proxy tree for one shoot.
pub struct ProxyBuilder<'a> {
    tool: &'a dyn MediaTool,
    policy: FailurePolicy,
    progress: &'a dyn ProgressSink,
}

impl<'a> ProxyBuilder<'a> {
    pub fn new(tool: &'a dyn MediaTool) -> Self {
        Self {
            tool,
            policy: FailurePolicy::default(),
            progress: &NoProgress,
        }
    }

    pub fn policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn progress(mut self, progress: &'a dyn ProgressSink) -> Self {
        self.progress = progress;
        self
    }

    /// Build `{proxy_root}/{YYYY}_{MM}_proxy/{shoot}.proxy`.
    ///
    /// Refuses to touch anything if that directory already exists. Once it has
    /// been created, omitted_files.txt is written whether the run succeeds or not.
    pub fn build(&self, shoot_root: &Path, proxy_root: &Path) -> Result<ProxyReport, ProxyError> {
        let shoot = ShootId::from_path(shoot_root)?;
        ensure_dir(shoot_root)?;

        let destination = shoot.proxy_destination(proxy_root);
        if destination.exists() {
            return Err(ProxyError::DestinationExists(destination));
        }

        for stray in stray_root_files(shoot_root)? {
            log::warn!("Ignoring {}: not inside a device folder", stray.display());
        }

        let plan = plan_devices(shoot_root)?;
        let total = plan.iter().map(|(_, files)| files.len() as u64).sum();

        fs::create_dir_all(&destination)?;
        log::info!("Building proxies for {} in {}", shoot.name(), destination.display());

        let mut report = ProxyReport::new(destination);
        let result = self.process(&plan, total, &mut report);

        let manifest = write_manifest(&report.manifest_path(), &report.omitted);
        match result {
            Err(e) => {
                if let Err(me) = manifest {
                    log::error!("Failed to write {}: {}", OMITTED_FILES_NAME, me);
                }
                Err(e)
            }
            Ok(()) => {
                manifest?;
                log::info!(
                    "Proxied {}: {} compressed, {} copied, {} omitted, {} failed",
                    shoot.name(),
                    report.compressed(),
                    report.copied(),
                    report.omitted.len(),
                    report.failed().len()
                );
                Ok(report)
            }
        }
    }

    fn process(
        &self,
        plan: &[(PathBuf, Vec<PathBuf>)],
        total: u64,
        report: &mut ProxyReport,
    ) -> Result<(), ProxyError> {
        let mut current = 0u64;

        for (device_dir, files) in plan {
            let device = file_name_string(device_dir);
            let out_dir = report.destination.join(&device);

            for source in files {
                current += 1;
                let name = file_name_string(source);
                self.progress.report(
                    &Progress::new("proxy", current, total).with_message(name.clone()),
                );

                let outcome = match ProxyClass::classify(source) {
                    _ if source.is_dir() => {
                        log::warn!("Omitting nested directory {}", source.display());
                        report.omitted.push(name);
                        ProxyOutcome::Omitted
                    }
                    ProxyClass::Unknown => {
                        log::debug!("Omitting {}", source.display());
                        report.omitted.push(name);
                        ProxyOutcome::Omitted
                    }
                    class => {
                        fs::create_dir_all(&out_dir)?;
                        match self.produce(class, source, &out_dir) {
                            Ok(outcome) => outcome,
                            Err(e) => self.on_failure(source, e)?,
                        }
                    }
                };

                report.entries.push(ProxyEntry {
                    source: source.clone(),
                    device: device.clone(),
                    outcome,
                });
            }
        }
        Ok(())
    }

    fn produce(&self, class: ProxyClass, source: &Path, out_dir: &Path) -> crate::error::Result<ProxyOutcome> {
        let name = file_name_string(source);
        match class {
            ProxyClass::Video => {
                let output = out_dir.join(&name);
                self.tool.compress_video(source, &output)?;
                Ok(ProxyOutcome::Compressed { output, kind: CompressKind::Video })
            }
            ProxyClass::Image => {
                let stem = source
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or(name);
                let output = out_dir.join(format!("{}.{}", stem, IMAGE_PROXY_EXTENSION));
                self.tool.convert_image(source, &output)?;
                Ok(ProxyOutcome::Compressed { output, kind: CompressKind::Image })
            }
            ProxyClass::PassThrough => {
                let output = out_dir.join(&name);
                copy_with_verify(source, &output)?;
                Ok(ProxyOutcome::Copied { output })
            }
            ProxyClass::Unknown => Ok(ProxyOutcome::Omitted),
        }
    }

    fn on_failure(&self, source: &Path, err: ShootError) -> Result<ProxyOutcome, ProxyError> {
        log::error!("Proxy failed for {}: {}", source.display(), err);

        if self.policy == FailurePolicy::SkipAndRecord {
            return Ok(ProxyOutcome::Failed { reason: err.to_string() });
        }

        Err(match err {
            ShootError::ToolTimeout { secs, .. } => ProxyError::Timeout {
                path: source.to_path_buf(),
                secs,
            },
            ShootError::Io(e) => ProxyError::Io(e),
            other => ProxyError::Tool {
                path: source.to_path_buf(),
                reason: other.to_string(),
            },
        })
    }
}

/// Device folders with the entries directly inside each. Nested directories
/// are planned as entries of their own and never walked.
fn plan_devices(shoot_root: &Path) -> crate::error::Result<Vec<(PathBuf, Vec<PathBuf>)>> {
    let mut plan = Vec::new();
    for device_dir in device_folders(shoot_root)? {
        let entries = sorted_entries(&device_dir)?
            .into_iter()
            .filter(|entry| entry.is_dir() || entry.is_file())
            .collect();
        plan.push((device_dir, entries));
    }
    Ok(plan)
}

/// Newline-joined basenames, no trailing newline. Empty list gives an empty file.
fn write_manifest(path: &Path, omitted: &[String]) -> std::io::Result<()> {
    fs::write(path, omitted.join("\n"))
}
