//! FFmpeg-backed clip extraction
//!
//! Runs `ffmpeg -i {src} -ss {start} -t {duration} -progress pipe:1 -y {out}`
//! into a temporary file and reads the result back.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::core::{CoreError, CoreResult, TimeSec};

use super::{ClipExtractor, ClipOutput, ClipRequest};

// =============================================================================
// Detection
// =============================================================================

/// Locates an ffmpeg binary
///
/// An explicit path must exist. Otherwise common install locations are
/// checked, then `which`/`where`.
pub fn find_ffmpeg(explicit: Option<&Path>) -> CoreResult<PathBuf> {
    if let Some(path) = explicit {
        if path.is_file() {
            return Ok(path.to_path_buf());
        }
        warn!("Configured ffmpeg not found at {}", path.display());
        return Err(CoreError::FFmpegNotFound);
    }

    #[cfg(target_os = "windows")]
    let (binary_name, lookup) = ("ffmpeg.exe", "where");

    #[cfg(not(target_os = "windows"))]
    let (binary_name, lookup) = ("ffmpeg", "which");

    for dir in common_ffmpeg_dirs() {
        let candidate = dir.join(binary_name);
        if candidate.is_file() {
            return Ok(candidate);
        }
    }

    let output = Command::new(lookup)
        .arg("ffmpeg")
        .output()
        .map_err(|_| CoreError::FFmpegNotFound)?;

    if output.status.success() {
        let stdout = String::from_utf8_lossy(&output.stdout);
        if let Some(first) = stdout.lines().next().map(str::trim) {
            if !first.is_empty() {
                return Ok(PathBuf::from(first));
            }
        }
    }

    Err(CoreError::FFmpegNotFound)
}

fn common_ffmpeg_dirs() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    #[cfg(target_os = "windows")]
    {
        paths.push(PathBuf::from(r"C:\ffmpeg\bin"));
        paths.push(PathBuf::from(r"C:\Program Files\ffmpeg\bin"));
    }

    #[cfg(target_os = "macos")]
    {
        paths.push(PathBuf::from("/opt/homebrew/bin"));
        paths.push(PathBuf::from("/usr/local/bin"));
    }

    #[cfg(target_os = "linux")]
    {
        paths.push(PathBuf::from("/usr/bin"));
        paths.push(PathBuf::from("/usr/local/bin"));
    }

    paths
}

// =============================================================================
// Progress
// =============================================================================

/// Turns `-progress` key=value lines into percentages of the clip duration
#[derive(Clone, Debug)]
pub struct ProgressParser {
    duration: TimeSec,
    elapsed: TimeSec,
}

impl ProgressParser {
    pub fn new(duration: TimeSec) -> Self {
        Self {
            duration,
            elapsed: 0.0,
        }
    }

    /// Feeds one line; returns a percentage at the end of each progress block
    pub fn feed(&mut self, line: &str) -> Option<f64> {
        let line = line.trim();
        if let Some(value) = line.strip_prefix("out_time_ms=") {
            // Despite the name, ffmpeg reports microseconds here
            if let Ok(us) = value.trim().parse::<i64>() {
                self.elapsed = us.max(0) as f64 / 1_000_000.0;
            }
            return None;
        }

        let state = line.strip_prefix("progress=")?;
        if state == "end" || self.duration <= 0.0 {
            return Some(if state == "end" { 100.0 } else { 0.0 });
        }
        Some(self.elapsed / self.duration * 100.0)
    }
}

// =============================================================================
// Extractor
// =============================================================================

/// Removes a file when dropped
struct TempFileGuard(PathBuf);

impl Drop for TempFileGuard {
    fn drop(&mut self) {
        if self.0.exists() {
            if let Err(e) = std::fs::remove_file(&self.0) {
                warn!("Failed to remove temp clip {}: {}", self.0.display(), e);
            }
        }
    }
}

/// Extracts clips by spawning ffmpeg
#[derive(Clone, Debug)]
pub struct FfmpegClipExtractor {
    ffmpeg_path: PathBuf,
    temp_dir: PathBuf,
}

impl FfmpegClipExtractor {
    pub fn new(ffmpeg_path: PathBuf) -> Self {
        Self {
            ffmpeg_path,
            temp_dir: std::env::temp_dir(),
        }
    }

    /// Builds an extractor from a configured path or by searching the system
    pub fn detect(explicit: Option<&Path>) -> CoreResult<Self> {
        let path = find_ffmpeg(explicit)?;
        info!("Using ffmpeg at {}", path.display());
        Ok(Self::new(path))
    }

    /// Overrides where intermediate files are written
    pub fn with_temp_dir(mut self, temp_dir: PathBuf) -> Self {
        self.temp_dir = temp_dir;
        self
    }

    pub fn ffmpeg_path(&self) -> &Path {
        &self.ffmpeg_path
    }

    fn build_args(request: &ClipRequest, output: &Path) -> Vec<String> {
        vec![
            "-i".to_string(),
            request.source.to_string_lossy().to_string(),
            "-ss".to_string(),
            format!("{:.3}", request.start_time),
            "-t".to_string(),
            format!("{:.3}", request.duration()),
            "-progress".to_string(),
            "pipe:1".to_string(),
            "-y".to_string(),
            output.to_string_lossy().to_string(),
        ]
    }
}

#[async_trait]
impl ClipExtractor for FfmpegClipExtractor {
    async fn extract(
        &self,
        request: &ClipRequest,
        progress: mpsc::Sender<f64>,
    ) -> CoreResult<ClipOutput> {
        if !request.source.is_file() {
            return Err(CoreError::FileNotFound(
                request.source.to_string_lossy().to_string(),
            ));
        }

        tokio::fs::create_dir_all(&self.temp_dir).await?;
        let output_path = self
            .temp_dir
            .join(format!("framenote_clip_{}.mp4", uuid::Uuid::new_v4()));
        let _guard = TempFileGuard(output_path.clone());

        let mut cmd = tokio::process::Command::new(&self.ffmpeg_path);
        cmd.args(Self::build_args(request, &output_path))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd
            .spawn()
            .map_err(|e| CoreError::ClipExtraction(format!("Failed to start ffmpeg: {}", e)))?;

        let reporter = child.stdout.take().map(|stdout| {
            let mut parser = ProgressParser::new(request.duration());
            tokio::spawn(async move {
                let mut lines = BufReader::new(stdout).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    if let Some(percent) = parser.feed(&line) {
                        debug!("Clip progress {:.1}%", percent);
                        // Receiver may be gone; keep draining stdout
                        let _ = progress.send(percent).await;
                    }
                }
            })
        });

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| CoreError::ClipExtraction(format!("Failed to wait for ffmpeg: {}", e)))?;

        if let Some(handle) = reporter {
            let _ = handle.await;
        }

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let detail = stderr
                .lines()
                .rev()
                .find(|l| !l.trim().is_empty())
                .unwrap_or("no output");
            return Err(CoreError::ClipExtraction(format!(
                "ffmpeg exited with {}: {}",
                output.status, detail
            )));
        }

        let bytes = tokio::fs::read(&output_path)
            .await
            .map_err(|e| CoreError::ClipExtraction(format!("Failed to read clip output: {}", e)))?;

        info!(
            "Extracted clip {:.3}-{:.3} from {} ({} bytes)",
            request.start_time,
            request.end_time,
            request.source.display(),
            bytes.len()
        );
        Ok(ClipOutput { bytes })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_progress_parser() {
        let mut parser = ProgressParser::new(4.0);
        assert_eq!(parser.feed("frame=10"), None);
        assert_eq!(parser.feed("out_time_ms=1000000"), None);
        assert_eq!(parser.feed("progress=continue"), Some(25.0));
        parser.feed("out_time_ms=4200000");
        assert_eq!(parser.feed("progress=continue"), Some(105.0));
        assert_eq!(parser.feed("progress=end"), Some(100.0));
    }

    #[test]
    fn test_progress_parser_zero_duration() {
        let mut parser = ProgressParser::new(0.0);
        parser.feed("out_time_ms=500");
        assert_eq!(parser.feed("progress=continue"), Some(0.0));
        assert_eq!(parser.feed("progress=end"), Some(100.0));
    }

    #[test]
    fn test_progress_parser_ignores_garbage() {
        let mut parser = ProgressParser::new(2.0);
        parser.feed("out_time_ms=N/A");
        assert_eq!(parser.feed("progress=continue"), Some(0.0));
    }

    #[test]
    fn test_build_args() {
        let request = ClipRequest::new(PathBuf::from("/videos/in.mp4"), 5.12, 8.45).unwrap();
        let args = FfmpegClipExtractor::build_args(&request, Path::new("/tmp/out.mp4"));
        assert_eq!(
            args,
            vec![
                "-i",
                "/videos/in.mp4",
                "-ss",
                "5.120",
                "-t",
                "3.330",
                "-progress",
                "pipe:1",
                "-y",
                "/tmp/out.mp4"
            ]
        );
    }

    #[test]
    fn test_find_ffmpeg_explicit_missing() {
        let dir = TempDir::new().unwrap();
        let err = find_ffmpeg(Some(&dir.path().join("ffmpeg"))).unwrap_err();
        assert!(matches!(err, CoreError::FFmpegNotFound));
    }

    #[test]
    fn test_find_ffmpeg_explicit_present() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ffmpeg");
        std::fs::write(&path, b"").unwrap();
        assert_eq!(find_ffmpeg(Some(&path)).unwrap(), path);
    }

    #[test]
    fn test_temp_file_guard_removes_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("clip.mp4");
        std::fs::write(&path, b"x").unwrap();
        drop(TempFileGuard(path.clone()));
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_extract_missing_source() {
        let dir = TempDir::new().unwrap();
        let extractor = FfmpegClipExtractor::new(PathBuf::from("ffmpeg"))
            .with_temp_dir(dir.path().to_path_buf());
        let request = ClipRequest::new(dir.path().join("missing.mp4"), 0.0, 1.0).unwrap();
        let (tx, _rx) = mpsc::channel(4);

        let err = extractor.extract(&request, tx).await.unwrap_err();
        assert!(matches!(err, CoreError::FileNotFound(_)));
    }

    #[tokio::test]
    async fn test_extract_spawn_failure_is_clip_error() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("in.mp4");
        std::fs::write(&source, b"not a video").unwrap();

        let extractor = FfmpegClipExtractor::new(dir.path().join("no-such-ffmpeg"))
            .with_temp_dir(dir.path().join("tmp"));
        let request = ClipRequest::new(source, 0.0, 1.0).unwrap();
        let (tx, _rx) = mpsc::channel(4);

        let err = extractor.extract(&request, tx).await.unwrap_err();
        assert!(matches!(err, CoreError::ClipExtraction(_)));
        assert_eq!(std::fs::read_dir(dir.path().join("tmp")).unwrap().count(), 0);
    }
}
