// Shootkit CLI binary

use std::path::{Path, PathBuf};
use anyhow::Result;
use clap::{Parser, Subcommand};

use shootkit::config::Settings;
use shootkit::db::{open_db, schema};
use shootkit::ingest::{self, IngestOptions, RenameOptions};
use shootkit::preview::{proxy_one, FailurePolicy, Ffmpeg, ProxyBuilder, ProxyOutcome};
use shootkit::progress::BarProgress;
use shootkit::shoot::ShootId;
use shootkit::{metadata, tools, verify};

#[derive(Parser)]
#[command(name = "shootkit")]
#[command(about = "Shootkit - rename, proxy and verify shoot folders", long_about = None)]
#[command(version)]
struct Cli {
    /// Settings file (defaults to the per-user settings.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Catalog database path
    #[arg(long, global = true)]
    catalog: Option<PathBuf>,

    /// More log output (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rename every device file to {shoot}_{device}.{seq}{ext}
    Rename {
        /// Shoot folder
        shoot: PathBuf,
        /// Keep files that already have their canonical name
        #[arg(long)]
        keep_canonical: bool,
    },

    /// Build the proxy tree for a shoot
    Proxy {
        /// Shoot folder
        shoot: PathBuf,
        /// Root holding the YYYY_MM_proxy folders
        #[arg(long)]
        proxy_root: Option<PathBuf>,
        /// Stop at the first failed file
        #[arg(long)]
        abort_on_failure: bool,
        /// Per-file tool timeout in seconds
        #[arg(long)]
        timeout: Option<u64>,
    },

    /// Compress one video next to itself as {stem}-compressed.mp4
    ProxyOne {
        video: PathBuf,
        #[arg(long)]
        timeout: Option<u64>,
    },

    /// Rename a shoot, probe its files and record them in the catalog
    Ingest {
        /// Shoot folder
        shoot: PathBuf,
        #[arg(long)]
        keep_canonical: bool,
        #[arg(long)]
        timeout: Option<u64>,
    },

    /// Report files whose names do not match their shoot and device folders
    CheckNames {
        /// Archive root holding YYYY_MM folders
        root: PathBuf,
    },

    /// Total size of a directory in GB
    Size {
        path: PathBuf,
    },

    /// Compare the size of a shoot's copies on two volumes
    CompareSizes {
        shoot: String,
        volume_a: String,
        volume_b: String,
    },

    /// Compare per-file checksums of a shoot's copies on two volumes
    CompareFiles {
        shoot: String,
        volume_a: String,
        volume_b: String,
    },

    /// Mark catalogued shoots that have a proxy folder
    ProxyPresent {
        /// Directory of .proxy folders or of month folders holding them
        dir: PathBuf,
    },

    /// Record the size of every shoot on every archive volume
    VolumeScan {
        /// Volumes root (defaults to the configured one)
        root: Option<PathBuf>,
    },

    /// Re-hash a shoot's catalogued files against their stored checksums
    VerifyCatalog {
        shoot: String,
    },

    /// List catalogued shoots
    Shoots,

    /// List catalogued files of a shoot
    Files {
        shoot: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut settings = Settings::load(cli.config.as_deref())?;
    if let Some(catalog) = cli.catalog {
        settings.catalog_path = Some(catalog);
    }

    match cli.command {
        Commands::Rename { shoot, keep_canonical } => cmd_rename(&shoot, keep_canonical),
        Commands::Proxy { shoot, proxy_root, abort_on_failure, timeout } => {
            if let Some(root) = proxy_root {
                settings.proxy_root = root;
            }
            if abort_on_failure {
                settings.failure_policy = FailurePolicy::Abort;
            }
            if timeout.is_some() {
                settings.tool_timeout_secs = timeout;
            }
            cmd_proxy(&settings, &shoot)
        }
        Commands::ProxyOne { video, timeout } => {
            if timeout.is_some() {
                settings.tool_timeout_secs = timeout;
            }
            cmd_proxy_one(&settings, &video)
        }
        Commands::Ingest { shoot, keep_canonical, timeout } => {
            if timeout.is_some() {
                settings.tool_timeout_secs = timeout;
            }
            cmd_ingest(&settings, &shoot, keep_canonical)
        }
        Commands::CheckNames { root } => cmd_check_names(&settings, &root),
        Commands::Size { path } => cmd_size(&path),
        Commands::CompareSizes { shoot, volume_a, volume_b } => {
            cmd_compare_sizes(&settings, &shoot, &volume_a, &volume_b)
        }
        Commands::CompareFiles { shoot, volume_a, volume_b } => {
            cmd_compare_files(&settings, &shoot, &volume_a, &volume_b)
        }
        Commands::ProxyPresent { dir } => cmd_proxy_present(&settings, &dir),
        Commands::VolumeScan { root } => {
            let root = root.unwrap_or_else(|| settings.volumes_root.clone());
            cmd_volume_scan(&settings, &root)
        }
        Commands::VerifyCatalog { shoot } => cmd_verify_catalog(&settings, &shoot),
        Commands::Shoots => cmd_shoots(&settings),
        Commands::Files { shoot } => cmd_files(&settings, &shoot),
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

fn cmd_rename(shoot: &Path, keep_canonical: bool) -> Result<()> {
    let report = ingest::rename_shoot(shoot, &RenameOptions { keep_canonical })?;

    for (path, original) in &report.record {
        let new_name = path.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
        println!("{:<40} -> {}", original, new_name);
    }

    println!();
    println!("Renamed {} file(s), skipped {}", report.renamed(), report.skipped.len());

    if !report.is_complete() {
        for failure in &report.failures {
            eprintln!("  FAILED {}: {}", failure.path.display(), failure.error);
        }
        anyhow::bail!("{} file(s) could not be renamed", report.failures.len());
    }

    Ok(())
}

fn cmd_proxy(settings: &Settings, shoot: &Path) -> Result<()> {
    if !tools::is_tool_available("ffmpeg") {
        log::warn!("ffmpeg not found; videos and images will fail to proxy");
    }
    let tool = Ffmpeg::new(settings.tool_timeout());
    let bar = BarProgress::new();

    let result = ProxyBuilder::new(&tool)
        .policy(settings.failure_policy)
        .progress(&bar)
        .build(shoot, &settings.proxy_root);
    bar.finish();
    let report = result?;

    println!("Proxy tree: {}", report.destination.display());
    println!("  Compressed: {}", report.compressed());
    println!("  Copied:     {}", report.copied());
    println!("  Omitted:    {} (see {})", report.omitted.len(), report.manifest_path().display());

    let failed = report.failed();
    if !failed.is_empty() {
        println!("  Failed:     {}", failed.len());
        for entry in failed {
            if let ProxyOutcome::Failed { ref reason } = entry.outcome {
                eprintln!("    {}: {}", entry.source.display(), reason);
            }
        }
        anyhow::bail!("{} file(s) failed to proxy", report.failed().len());
    }

    Ok(())
}

fn cmd_proxy_one(settings: &Settings, video: &Path) -> Result<()> {
    let tool = Ffmpeg::new(settings.tool_timeout());
    let output = proxy_one(video, &tool)?;
    println!("{}", output.display());
    Ok(())
}

fn cmd_ingest(settings: &Settings, shoot: &Path, keep_canonical: bool) -> Result<()> {
    if !metadata::ffprobe::is_available() {
        log::warn!("ffprobe not found; video and audio files will be recorded without metadata");
    }
    if !metadata::exiftool::is_available() {
        log::warn!("exiftool not found; images will be recorded without metadata");
    }

    let conn = open_db(&settings.catalog_path())?;
    let options = IngestOptions {
        rename: RenameOptions { keep_canonical },
        tool_timeout: settings.tool_timeout(),
    };

    let bar = BarProgress::new();
    let result = ingest::ingest_shoot(&conn, shoot, &options, &bar);
    bar.finish();
    let result = result?;

    println!("Ingest complete: {}", result.shoot);
    println!("  Renamed:  {}", result.rename.renamed());
    println!("  Recorded: {}", result.recorded);
    println!("  Rename failures: {}", result.rename.failures.len());
    println!("  Probe failures:  {}", result.probe_failures.len());

    for failure in &result.probe_failures {
        eprintln!("    {}: {}", failure.path.display(), failure.error);
    }

    Ok(())
}

fn cmd_check_names(settings: &Settings, root: &Path) -> Result<()> {
    let report = ingest::check_names(root, &settings.excluded_device_markers)?;

    println!("Checked {} month folder(s)", report.processed_months.len());
    if !report.skipped_folders.is_empty() {
        println!("Skipped: {}", report.skipped_folders.join(", "));
    }

    if report.is_consistent() {
        println!("All file names are consistent.");
        return Ok(());
    }

    for path in &report.inconsistent {
        println!("  {}", path.display());
    }
    anyhow::bail!("{} file name(s) do not match their folders", report.inconsistent.len());
}

fn cmd_size(path: &Path) -> Result<()> {
    let bytes = verify::dir_size(path)?;
    println!("{:.2} GB ({})", verify::size_gb(bytes), format_size(bytes));
    Ok(())
}

fn archive_pair(settings: &Settings, shoot: &str, volume_a: &str, volume_b: &str) -> Result<(PathBuf, PathBuf)> {
    let shoot = ShootId::parse(shoot)?;
    let a = shoot.archive_path(&settings.volumes_root, volume_a)?;
    let b = shoot.archive_path(&settings.volumes_root, volume_b)?;
    Ok((a, b))
}

fn cmd_compare_sizes(settings: &Settings, shoot: &str, volume_a: &str, volume_b: &str) -> Result<()> {
    let (a, b) = archive_pair(settings, shoot, volume_a, volume_b)?;
    let cmp = verify::compare_sizes(&a, &b)?;

    println!("{:<12} {:>10.2} GB  {}", volume_a, verify::size_gb(cmp.a), a.display());
    println!("{:<12} {:>10.2} GB  {}", volume_b, verify::size_gb(cmp.b), b.display());

    if !cmp.equal {
        anyhow::bail!("Sizes differ by {} bytes", cmp.a.abs_diff(cmp.b));
    }
    println!("Sizes match.");
    Ok(())
}

fn cmd_compare_files(settings: &Settings, shoot: &str, volume_a: &str, volume_b: &str) -> Result<()> {
    let (a, b) = archive_pair(settings, shoot, volume_a, volume_b)?;

    let bar = BarProgress::new();
    let cmp = verify::compare_checksums(&a, &b, &bar);
    bar.finish();
    let cmp = cmp?;

    if cmp.is_identical() {
        println!("All files match.");
        return Ok(());
    }

    for path in &cmp.mismatched {
        println!("  DIFFERS  {}", path.display());
    }
    for path in &cmp.missing {
        println!("  MISSING  {} (not on {})", path.display(), volume_b);
    }
    for path in &cmp.extra {
        println!("  EXTRA    {} (not on {})", path.display(), volume_a);
    }
    anyhow::bail!(
        "{} differing, {} missing, {} extra",
        cmp.mismatched.len(),
        cmp.missing.len(),
        cmp.extra.len()
    );
}

fn cmd_verify_catalog(settings: &Settings, shoot: &str) -> Result<()> {
    let conn = open_db(&settings.catalog_path())?;
    if schema::get_shoot_by_name(&conn, shoot)?.is_none() {
        anyhow::bail!("Shoot {} is not in the catalog", shoot);
    }

    let bar = BarProgress::new();
    let check = verify::verify_catalog(&conn, shoot, &bar);
    bar.finish();
    let check = check?;

    println!("Verified {} file(s)", check.verified);
    if !check.unhashed.is_empty() {
        println!("  {} file(s) have no stored checksum", check.unhashed.len());
    }
    if check.is_clean() {
        return Ok(());
    }

    for path in &check.changed {
        println!("  CHANGED  {}", path.display());
    }
    for path in &check.missing {
        println!("  MISSING  {}", path.display());
    }
    anyhow::bail!("{} changed, {} missing", check.changed.len(), check.missing.len());
}

fn cmd_proxy_present(settings: &Settings, dir: &Path) -> Result<()> {
    let conn = open_db(&settings.catalog_path())?;
    let report = ingest::scan_proxy_present(&conn, dir)?;

    println!("Marked {} shoot(s) as proxied", report.marked.len());
    if !report.unknown.is_empty() {
        println!("Not in catalog:");
        for name in &report.unknown {
            println!("  {}", name);
        }
    }
    Ok(())
}

fn cmd_volume_scan(settings: &Settings, root: &Path) -> Result<()> {
    let conn = open_db(&settings.catalog_path())?;

    let bar = BarProgress::new();
    let found = ingest::scan_volumes(&conn, root, &bar);
    bar.finish();

    for entry in found? {
        println!("{:<16} {:<40} {:>10}", entry.volume, entry.shoot, format_size(entry.size_bytes));
    }
    Ok(())
}

fn cmd_shoots(settings: &Settings) -> Result<()> {
    let conn = open_db(&settings.catalog_path())?;
    let shoots = schema::list_shoots(&conn)?;

    if shoots.is_empty() {
        println!("No shoots catalogued. Use 'shootkit ingest <shoot>' or 'shootkit volume-scan'.");
        return Ok(());
    }

    println!("{:<40}  {:>10}  {:>5}  {}", "Shoot", "Size", "Proxy", "Volumes");
    println!("{}", "-".repeat(75));

    for shoot in shoots {
        let volumes = schema::list_shoot_volumes(&conn, &shoot.name)?
            .into_iter()
            .map(|v| v.volume)
            .collect::<Vec<_>>()
            .join(", ");
        let size = shoot.size_bytes
            .map(|b| format_size(b.max(0) as u64))
            .unwrap_or_else(|| "-".to_string());

        println!("{:<40}  {:>10}  {:>5}  {}",
            shoot.name,
            size,
            if shoot.proxy_present { "yes" } else { "no" },
            volumes
        );
    }
    Ok(())
}

fn cmd_files(settings: &Settings, shoot: &str) -> Result<()> {
    let conn = open_db(&settings.catalog_path())?;
    if schema::get_shoot_by_name(&conn, shoot)?.is_none() {
        anyhow::bail!("Shoot {} is not in the catalog", shoot);
    }

    let files = schema::list_media_files(&conn, shoot)?;
    println!("{:<10}  {:<8}  {:>10}  {:<45}  {:<30}  {}", "Device", "Kind", "Size", "File", "Original", "Checksum");
    println!("{}", "-".repeat(130));

    for file in files {
        let checksum = file.checksum.as_deref().map(|c| &c[..c.len().min(12)]).unwrap_or("-");
        println!("{:<10}  {:<8}  {:>10}  {:<45}  {:<30}  {}",
            file.device,
            file.media_kind,
            format_size(file.size_bytes.max(0) as u64),
            file.file_name,
            file.original_name,
            checksum
        );
    }
    Ok(())
}

fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GiB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MiB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KiB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
