// External tool resolver and runner for ffmpeg/ffprobe/exiftool
//
// Resolution order:
// 1) Environment variable override (SHOOTKIT_FFMPEG_PATH, etc.)
// 2) Sidecar next to the executable
// 3) bin/ next to the executable
// 4) PATH fallback

use std::env;
use std::io::Read;
use std::path::PathBuf;
use std::process::{Command, Output, Stdio};
use std::time::{Duration, Instant};

use crate::constants::TOOL_POLL_INTERVAL_MS;
use crate::error::{Result, ShootError};

/// Get the directory containing the current executable
fn exe_dir() -> Option<PathBuf> {
    env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(|d| d.to_path_buf()))
}

/// Resolve a tool path.
fn resolve_tool(env_key: &str, default_name: &str) -> PathBuf {
    if let Ok(v) = env::var(env_key) {
        let p = PathBuf::from(&v);
        if p.exists() {
            return p;
        }
        log::warn!("{} points at missing file {}, ignoring", env_key, v);
    }

    let mut filename = default_name.to_string();
    if cfg!(windows) && !filename.to_lowercase().ends_with(".exe") {
        filename.push_str(".exe");
    }

    if let Some(dir) = exe_dir() {
        let candidate = dir.join(&filename);
        if candidate.exists() {
            return candidate;
        }

        let bin_candidate = dir.join("bin").join(&filename);
        if bin_candidate.exists() {
            return bin_candidate;
        }
    }

    PathBuf::from(default_name)
}

/// Get path to ffmpeg binary
pub fn ffmpeg_path() -> PathBuf {
    resolve_tool("SHOOTKIT_FFMPEG_PATH", "ffmpeg")
}

/// Get path to ffprobe binary
pub fn ffprobe_path() -> PathBuf {
    resolve_tool("SHOOTKIT_FFPROBE_PATH", "ffprobe")
}

/// Get path to exiftool binary
pub fn exiftool_path() -> PathBuf {
    resolve_tool("SHOOTKIT_EXIFTOOL_PATH", "exiftool")
}

/// Check if a tool is available at the resolved path
pub fn is_tool_available(tool: &str) -> bool {
    let (path, version_flag) = match tool {
        "ffprobe" => (ffprobe_path(), "-version"),
        "ffmpeg" => (ffmpeg_path(), "-version"),
        "exiftool" => (exiftool_path(), "-ver"),
        _ => return false,
    };

    if path.exists() {
        return true;
    }

    Command::new(&path)
        .arg(version_flag)
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// Run a prepared command to completion and capture its output.
///
/// With a timeout the child is polled and killed once the limit passes.
/// Without one this blocks until the tool exits.
pub fn run_tool(mut cmd: Command, tool: &str, timeout: Option<Duration>) -> Result<Output> {
    let spawn_error = |e: std::io::Error| ShootError::Tool {
        tool: tool.to_string(),
        reason: format!("Failed to start {}: {}", tool, e),
    };

    let limit = match timeout {
        Some(limit) => limit,
        None => return cmd.output().map_err(spawn_error),
    };

    cmd.stdin(Stdio::null());
    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::piped());

    let mut child = cmd.spawn().map_err(spawn_error)?;

    // Drain both pipes so a chatty tool cannot block on a full buffer
    let stdout = child.stdout.take();
    let stderr = child.stderr.take();
    let stdout_reader = std::thread::spawn(move || drain(stdout));
    let stderr_reader = std::thread::spawn(move || drain(stderr));

    let started = Instant::now();
    let status = loop {
        if let Some(status) = child.try_wait()? {
            break status;
        }
        if started.elapsed() >= limit {
            let _ = child.kill();
            let _ = child.wait();
            log::warn!("{} exceeded {}s, killed", tool, limit.as_secs());
            return Err(ShootError::ToolTimeout {
                tool: tool.to_string(),
                secs: limit.as_secs(),
            });
        }
        std::thread::sleep(Duration::from_millis(TOOL_POLL_INTERVAL_MS));
    };

    let stdout = stdout_reader.join().unwrap_or_default();
    let stderr = stderr_reader.join().unwrap_or_default();

    Ok(Output { status, stdout, stderr })
}

fn drain<R: Read>(pipe: Option<R>) -> Vec<u8> {
    let mut buf = Vec::new();
    if let Some(mut pipe) = pipe {
        let _ = pipe.read_to_end(&mut buf);
    }
    buf
}
