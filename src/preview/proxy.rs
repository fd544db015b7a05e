// Proxy encoders
//
// Video proxies are H.264 at 1920 wide. Stills are converted to JPG.
// Every encode writes a temp file first and renames it into place.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use crate::constants::{
    IMAGE_PROXY_EXTENSION, PROXY_CRF, PROXY_ONE_SUFFIX, PROXY_PIX_FMT, PROXY_PRESET,
    PROXY_VIDEO_CODEC, PROXY_WIDTH,
};
use crate::error::{Result, ShootError};

/// External transcoder used by the proxy builder.
pub trait MediaTool {
    /// Encode a video proxy at `output`.
    fn compress_video(&self, source: &Path, output: &Path) -> Result<()>;

    /// Convert a still image to JPG at `output`.
    fn convert_image(&self, source: &Path, output: &Path) -> Result<()>;
}

/// ffmpeg-backed encoder.
#[derive(Debug, Clone, Default)]
pub struct Ffmpeg {
    timeout: Option<Duration>,
    /// Explicit binary; the resolved ffmpeg when unset.
    binary: Option<PathBuf>,
}

impl Ffmpeg {
    pub fn new(timeout: Option<Duration>) -> Self {
        Self { timeout, binary: None }
    }

    pub fn with_binary(mut self, binary: impl Into<PathBuf>) -> Self {
        self.binary = Some(binary.into());
        self
    }

    fn command(&self) -> Command {
        match self.binary {
            Some(ref binary) => Command::new(binary),
            None => Command::new(crate::tools::ffmpeg_path()),
        }
    }

    fn run(&self, cmd: Command, source: &Path, tmp_path: &Path) -> Result<()> {
        let output = match crate::tools::run_tool(cmd, "ffmpeg", self.timeout) {
            Ok(output) => output,
            Err(e) => {
                let _ = fs::remove_file(tmp_path);
                return Err(e);
            }
        };

        if !output.status.success() {
            let _ = fs::remove_file(tmp_path);
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ShootError::Tool {
                tool: "ffmpeg".to_string(),
                reason: format!("{} on {}: {}", output.status, source.display(), last_line(&stderr)),
            });
        }
        Ok(())
    }
}

impl MediaTool for Ffmpeg {
    fn compress_video(&self, source: &Path, output: &Path) -> Result<()> {
        let tmp_path = temp_path_for(output);

        let mut cmd = self.command();
        cmd.args(["-nostdin", "-y", "-i"])
            .arg(source)
            .args([
                "-vf", &format!("scale={}:-2", PROXY_WIDTH),
                "-c:v", PROXY_VIDEO_CODEC,
                "-pix_fmt", PROXY_PIX_FMT,
                "-preset", PROXY_PRESET,
                "-crf", &PROXY_CRF.to_string(),
            ])
            .arg(&tmp_path);

        log::debug!("Compressing {} -> {}", source.display(), output.display());
        self.run(cmd, source, &tmp_path)?;
        finish_atomic(&tmp_path, output)
    }

    fn convert_image(&self, source: &Path, output: &Path) -> Result<()> {
        let tmp_path = temp_path_for(output);

        let mut cmd = self.command();
        cmd.args(["-nostdin", "-y", "-i"])
            .arg(source)
            .arg(&tmp_path);

        log::debug!("Converting {} -> {}", source.display(), output.display());
        self.run(cmd, source, &tmp_path)?;
        finish_atomic(&tmp_path, output)
    }
}

/// `clip.mp4` -> `clip.tmp.mp4`, keeping the extension ffmpeg picks the muxer from.
fn temp_path_for(output: &Path) -> PathBuf {
    let ext = output
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or(IMAGE_PROXY_EXTENSION)
        .to_string();
    output.with_extension(format!("tmp.{}", ext))
}

/// Rename the finished temp file into place and reject empty output.
fn finish_atomic(tmp_path: &Path, output: &Path) -> Result<()> {
    fs::rename(tmp_path, output)?;

    let size = fs::metadata(output)?.len();
    if size == 0 {
        let _ = fs::remove_file(output);
        return Err(ShootError::Tool {
            tool: "ffmpeg".to_string(),
            reason: format!("{} is empty", output.display()),
        });
    }
    Ok(())
}

fn last_line(stderr: &str) -> &str {
    stderr.trim().lines().last().unwrap_or("")
}

/// Where `proxy_one` writes: `{dir}/{stem}-compressed.mp4`.
pub fn proxy_one_output(video: &Path) -> PathBuf {
    let stem = video
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    video.with_file_name(format!("{}{}.mp4", stem, PROXY_ONE_SUFFIX))
}

/// Compress a single video next to itself.
pub fn proxy_one(video: &Path, tool: &dyn MediaTool) -> Result<PathBuf> {
    if !video.is_file() {
        return Err(ShootError::Other(format!("Not a file: {}", video.display())));
    }
    let output = proxy_one_output(video);
    tool.compress_video(video, &output)?;
    log::info!("Wrote {}", output.display());
    Ok(output)
}

/// Copy a file, check the copy has the source's size, keep the source mtime.
/// Returns bytes copied.
pub fn copy_with_verify(source: &Path, dest: &Path) -> Result<u64> {
    let copied = fs::copy(source, dest)?;

    let source_meta = fs::metadata(source)?;
    let dest_size = fs::metadata(dest)?.len();

    if source_meta.len() != dest_size || copied != dest_size {
        let _ = fs::remove_file(dest);
        return Err(ShootError::Other(format!(
            "Copy verification failed for {}: size mismatch ({} vs {})",
            source.display(),
            source_meta.len(),
            dest_size
        )));
    }

    if let Ok(modified) = source_meta.modified() {
        let _ = filetime::set_file_mtime(dest, filetime::FileTime::from_system_time(modified));
    }

    Ok(copied)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use tempfile::TempDir;

    struct RecordingTool {
        calls: RefCell<Vec<PathBuf>>,
    }

    impl MediaTool for RecordingTool {
        fn compress_video(&self, _source: &Path, output: &Path) -> Result<()> {
            self.calls.borrow_mut().push(output.to_path_buf());
            fs::write(output, b"proxy")?;
            Ok(())
        }

        fn convert_image(&self, _source: &Path, output: &Path) -> Result<()> {
            fs::write(output, b"jpg")?;
            Ok(())
        }
    }

    #[test]
    fn test_proxy_one_writes_compressed_sibling() {
        let tmp = TempDir::new().unwrap();
        let video = tmp.path().join("interview.MOV");
        fs::write(&video, b"raw").unwrap();

        let tool = RecordingTool { calls: RefCell::new(Vec::new()) };
        let output = proxy_one(&video, &tool).unwrap();

        assert_eq!(output, tmp.path().join("interview-compressed.mp4"));
        assert_eq!(fs::read(&output).unwrap(), b"proxy");
        assert_eq!(tool.calls.borrow().len(), 1);
    }

    #[test]
    fn test_proxy_one_missing_file() {
        let tool = RecordingTool { calls: RefCell::new(Vec::new()) };
        assert!(proxy_one(Path::new("/nonexistent/clip.mp4"), &tool).is_err());
        assert!(tool.calls.borrow().is_empty());
    }

    #[test]
    fn test_copy_with_verify_keeps_bytes_and_mtime() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("note.aac");
        let dest = tmp.path().join("copy.aac");
        fs::write(&source, vec![3u8; 4096]).unwrap();
        let old = filetime::FileTime::from_unix_time(1_700_000_000, 0);
        filetime::set_file_mtime(&source, old).unwrap();

        let copied = copy_with_verify(&source, &dest).unwrap();
        assert_eq!(copied, 4096);
        assert_eq!(fs::read(&source).unwrap(), fs::read(&dest).unwrap());

        let dest_mtime = filetime::FileTime::from_last_modification_time(&fs::metadata(&dest).unwrap());
        assert_eq!(dest_mtime.unix_seconds(), old.unix_seconds());
    }

    /// Shell stand-in for ffmpeg: records its argv one per line and writes
    /// `body` to the last argument.
    #[cfg(unix)]
    fn stub_ffmpeg(dir: &Path, body: &str) -> (PathBuf, PathBuf) {
        use std::os::unix::fs::PermissionsExt;

        let script = dir.join("ffmpeg-stub.sh");
        let args_log = dir.join("argv.txt");
        fs::write(
            &script,
            format!(
                "#!/bin/sh\nprintf '%s\\n' \"$@\" > '{}'\nfor last; do :; done\nprintf '{}' > \"$last\"\n",
                args_log.display(),
                body
            ),
        )
        .unwrap();
        fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();
        (script, args_log)
    }

    #[cfg(unix)]
    #[test]
    fn test_ffmpeg_video_arguments() {
        let tmp = TempDir::new().unwrap();
        let (script, args_log) = stub_ffmpeg(tmp.path(), "h264");
        let source = tmp.path().join("clip.MOV");
        let output = tmp.path().join("out").join("clip.MOV");
        fs::write(&source, b"raw").unwrap();
        fs::create_dir_all(output.parent().unwrap()).unwrap();

        Ffmpeg::new(None).with_binary(&script).compress_video(&source, &output).unwrap();

        let argv: Vec<String> = fs::read_to_string(&args_log)
            .unwrap()
            .lines()
            .map(String::from)
            .collect();
        let tmp_out = output.with_extension("tmp.MOV");
        assert_eq!(argv, vec![
            "-nostdin", "-y", "-i", source.to_str().unwrap(),
            "-vf", "scale=1920:-2",
            "-c:v", "libx264",
            "-pix_fmt", "yuv420p",
            "-preset", "slow",
            "-crf", "28",
            tmp_out.to_str().unwrap(),
        ]);
        assert_eq!(fs::read(&output).unwrap(), b"h264");
        assert!(!tmp_out.exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_ffmpeg_empty_output_is_rejected() {
        let tmp = TempDir::new().unwrap();
        let (script, _) = stub_ffmpeg(tmp.path(), "");
        let source = tmp.path().join("photo.cr2");
        let output = tmp.path().join("photo.jpg");
        fs::write(&source, b"raw").unwrap();

        let err = Ffmpeg::new(None).with_binary(&script).convert_image(&source, &output).unwrap_err();
        assert!(matches!(err, ShootError::Tool { .. }));
        assert!(!output.exists());
    }

    #[test]
    fn test_temp_path_keeps_extension() {
        assert_eq!(temp_path_for(Path::new("/p/clip.mov")), PathBuf::from("/p/clip.tmp.mov"));
        assert_eq!(temp_path_for(Path::new("/p/photo.jpg")), PathBuf::from("/p/photo.tmp.jpg"));
    }
}
