//! Command handlers

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::Serialize;
use serde_json::json;
use tracing::debug;

use framenote_lib::core::annotations::Annotation;
use framenote_lib::core::clips::FfmpegClipExtractor;
use framenote_lib::core::export::{Download, ExportFormat};
use framenote_lib::core::playback::PlaybackControl;
use framenote_lib::core::prompt::{Notice, UserPrompt};
use framenote_lib::core::timecode::{format_timestamp, step_frames};
use framenote_lib::core::workspace::Workspace;
use framenote_lib::core::{CoreError, FrameRate};

use crate::cli::{AnnCommand, Cli, Commands, SettingsCommand, TimeCommand, VideoCommand};
use crate::prompt::CliPrompt;

const PROGRESS_INTERVAL: Duration = Duration::from_millis(500);

pub async fn run(cli: &Cli, workspace: &mut Workspace) -> Result<()> {
    let out = Output { json: cli.json };
    let prompt = CliPrompt::new(cli.yes);
    debug!("Running {:?}", cli.command);

    let result = dispatch(cli, workspace, &prompt, &out).await;

    let storage_error = result
        .as_ref()
        .err()
        .and_then(|e| e.downcast_ref::<CoreError>());
    if let Some(CoreError::Storage(message)) = storage_error {
        prompt.notify(&Notice::StorageFailed {
            message: message.clone(),
        });
    }
    result
}

async fn dispatch(
    cli: &Cli,
    workspace: &mut Workspace,
    prompt: &CliPrompt,
    out: &Output,
) -> Result<()> {
    match &cli.command {
        Commands::Video(cmd) => video(cmd, workspace, prompt, out).await,
        Commands::Ann(cmd) => ann(cmd, workspace, prompt, out).await,
        Commands::Export(args) => {
            open(workspace, &args.video).await?;
            let format = ExportFormat::from(args.format);
            match workspace.manager().export(format).await? {
                Some(download) => save(&download, args.out.as_deref(), out),
                None => {
                    prompt.notify(&Notice::NothingToExport);
                    Ok(())
                }
            }
        }
        Commands::Import(args) => {
            open(workspace, &args.video).await?;
            let content = std::fs::read_to_string(&args.file)
                .with_context(|| format!("Failed to read {}", args.file.display()))?;
            let count = workspace.manager().import_csv(&content, prompt).await?;
            out.emit(&json!({ "imported": count }), || {});
            Ok(())
        }
        Commands::Clip(args) => {
            open(workspace, &args.video).await?;
            let ffmpeg = args
                .ffmpeg
                .clone()
                .or_else(|| workspace.settings().clips.ffmpeg_path.clone());
            let extractor = FfmpegClipExtractor::detect(ffmpeg.as_deref())?;
            let out_dir = args
                .out
                .clone()
                .or_else(|| workspace.settings().clips.output_dir.clone());

            match clip(workspace, &args.annotation, &extractor).await {
                Ok(Some(download)) => save(&download, out_dir.as_deref(), out),
                Ok(None) => bail!("Another clip extraction is already running"),
                Err(e) => {
                    prompt.notify(&Notice::ClipFailed {
                        message: e.to_string(),
                    });
                    Err(e)
                }
            }
        }
        Commands::Time(cmd) => time(cmd, workspace, out),
        Commands::Settings(cmd) => settings(cmd, workspace, out),
    }
}

// =============================================================================
// Output
// =============================================================================

struct Output {
    json: bool,
}

impl Output {
    /// Prints `value` as JSON, or runs `human` for plain output
    fn emit<T: Serialize>(&self, value: &T, human: impl FnOnce()) {
        if self.json {
            match serde_json::to_string_pretty(value) {
                Ok(text) => println!("{}", text),
                Err(e) => eprintln!("Failed to serialize output: {}", e),
            }
        } else {
            human();
        }
    }
}

fn print_annotation(annotation: &Annotation) {
    println!(
        "{}  {} --> {}  {}",
        annotation.id,
        format_timestamp(annotation.start_time),
        format_timestamp(annotation.end_time),
        annotation.text
    );
}

fn save(download: &Download, dir: Option<&Path>, out: &Output) -> Result<()> {
    let dir = dir.map(Path::to_path_buf).unwrap_or_else(|| PathBuf::from("."));
    let path = download
        .save_to(&dir)
        .with_context(|| format!("Failed to write {}", download.file_name))?;
    out.emit(
        &json!({ "file": path, "mimeType": download.mime_type, "bytes": download.bytes.len() }),
        || println!("Wrote {}", path.display()),
    );
    Ok(())
}

async fn open(workspace: &Workspace, video_id: &str) -> Result<()> {
    workspace
        .open_video(video_id)
        .await
        .with_context(|| format!("Failed to open video {}", video_id))?;
    Ok(())
}

// =============================================================================
// Videos
// =============================================================================

async fn video(
    cmd: &VideoCommand,
    workspace: &Workspace,
    prompt: &dyn UserPrompt,
    out: &Output,
) -> Result<()> {
    match cmd {
        VideoCommand::Add { path, name } => {
            let video = workspace.add_video(path, name.as_deref()).await?;
            out.emit(&video, || println!("{}  {}", video.id, video.name));
        }
        VideoCommand::List => {
            let videos = workspace.list_videos().await?;
            out.emit(&videos, || {
                for video in &videos {
                    println!("{}  {}  {}", video.id, video.name, video.file.display());
                }
            });
        }
        VideoCommand::Delete { video } => {
            let deleted = workspace.delete_video(video, prompt).await?;
            out.emit(&json!({ "deleted": deleted }), || {
                if deleted {
                    println!("Deleted {}", video);
                }
            });
        }
    }
    Ok(())
}

// =============================================================================
// Annotations
// =============================================================================

async fn ann(
    cmd: &AnnCommand,
    workspace: &Workspace,
    prompt: &dyn UserPrompt,
    out: &Output,
) -> Result<()> {
    let manager = workspace.manager();

    match cmd {
        AnnCommand::List { video } => {
            open(workspace, video).await?;
            let annotations = manager.annotations().await;
            out.emit(&annotations, || annotations.iter().for_each(print_annotation));
        }
        AnnCommand::Add {
            video,
            start,
            end,
            text,
        } => {
            open(workspace, video).await?;
            manager.mark_start(*start).await?;
            manager.mark_end(*end).await?;
            let saved = manager.save(text).await?;
            out.emit(&saved, || print_annotation(&saved));
        }
        AnnCommand::Edit {
            video,
            annotation,
            start,
            end,
            text,
        } => {
            open(workspace, video).await?;
            manager.begin_edit(annotation).await?;
            if let Some(start) = start {
                manager.mark_start(*start).await?;
            }
            if let Some(end) = end {
                manager.mark_end(*end).await?;
            }
            let text = match text {
                Some(text) => text.clone(),
                None => manager.seed_text().await,
            };
            let saved = manager.save(&text).await?;
            out.emit(&saved, || print_annotation(&saved));
        }
        AnnCommand::Delete { video, annotation } => {
            open(workspace, video).await?;
            let deleted = manager.delete(annotation, prompt).await?;
            out.emit(&json!({ "deleted": deleted }), || {
                if deleted {
                    println!("Deleted {}", annotation);
                }
            });
        }
        AnnCommand::Seek {
            video,
            annotation,
            duration,
        } => {
            open(workspace, video).await?;
            let mut playhead = workspace.playhead(duration.unwrap_or(f64::MAX));
            manager.select(annotation, &mut playhead).await?;
            let time = playhead.current_time();
            out.emit(
                &json!({ "time": time, "formatted": format_timestamp(time), "frame": playhead.frame() }),
                || println!("{}", format_timestamp(time)),
            );
        }
    }
    Ok(())
}

// =============================================================================
// Clips
// =============================================================================

/// Runs the extraction while reporting progress on stderr
async fn clip(
    workspace: &Workspace,
    annotation_id: &str,
    extractor: &FfmpegClipExtractor,
) -> Result<Option<Download>> {
    let manager = workspace.manager();
    let extraction = manager.download_clip(annotation_id, extractor);
    tokio::pin!(extraction);

    let mut ticker = tokio::time::interval(PROGRESS_INTERVAL);
    loop {
        tokio::select! {
            result = &mut extraction => return Ok(result?),
            _ = ticker.tick() => {
                if let Some(progress) = manager.clip_progress() {
                    eprintln!("Extracting clip... {:.0}%", progress.percent);
                }
            }
        }
    }
}

// =============================================================================
// Time / Settings
// =============================================================================

fn time(cmd: &TimeCommand, workspace: &Workspace, out: &Output) -> Result<()> {
    match cmd {
        TimeCommand::Format { seconds } => {
            let formatted = format_timestamp(*seconds);
            out.emit(&json!({ "formatted": formatted }), || {
                println!("{}", formatted)
            });
        }
        TimeCommand::Step { from, frames, fps } => {
            let rate = match fps {
                Some(fps) => FrameRate::new(*fps)?,
                None => workspace.frame_rate(),
            };
            let time = step_frames(*from, rate, *frames);
            out.emit(
                &json!({ "time": time, "formatted": format_timestamp(time), "fps": rate.get() }),
                || println!("{} ({})", format_timestamp(time), rate),
            );
        }
    }
    Ok(())
}

fn settings(cmd: &SettingsCommand, workspace: &mut Workspace, out: &Output) -> Result<()> {
    match cmd {
        SettingsCommand::Show => {}
        SettingsCommand::SetFps { fps } => {
            workspace.set_frame_rate(FrameRate::new(*fps)?)?;
        }
    }

    let settings = workspace.settings();
    out.emit(settings, || {
        println!("Frame rate:   {}", settings.frame_rate());
        println!("Database:     {}", settings.storage.database_file);
        println!(
            "FFmpeg:       {}",
            settings
                .clips
                .ffmpeg_path
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "(search PATH)".to_string())
        );
        println!(
            "Clip output:  {}",
            settings
                .clips
                .output_dir
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "(working directory)".to_string())
        );
    });
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use tempfile::TempDir;

    async fn run_args(workspace: &mut Workspace, args: &[&str]) -> Result<()> {
        let mut full = vec!["framenote", "--yes"];
        full.extend_from_slice(args);
        let cli = Cli::try_parse_from(full)?;
        run(&cli, workspace).await
    }

    async fn workspace_with_video(dir: &TempDir) -> (Workspace, String) {
        let media = dir.path().join("talk.mp4");
        std::fs::write(&media, b"not really a video").unwrap();

        let workspace = Workspace::open(&dir.path().join("data")).unwrap();
        let video = workspace.add_video(&media, None).await.unwrap();
        (workspace, video.id)
    }

    #[tokio::test]
    async fn test_ann_add_then_export_csv() {
        let dir = TempDir::new().unwrap();
        let (mut workspace, video_id) = workspace_with_video(&dir).await;
        let out_dir = dir.path().join("out");
        std::fs::create_dir_all(&out_dir).unwrap();

        run_args(
            &mut workspace,
            &["ann", "add", &video_id, "--start", "1.5", "--end", "00:03.000", "--text", "Intro"],
        )
        .await
        .unwrap();

        run_args(
            &mut workspace,
            &["export", &video_id, "--out", out_dir.to_str().unwrap()],
        )
        .await
        .unwrap();

        let csv = std::fs::read_to_string(out_dir.join("talk_mp4_annotations.csv")).unwrap();
        assert!(csv.ends_with("1.500,00:01.500,3.000,00:03.000,\"Intro\""));
    }

    #[tokio::test]
    async fn test_edit_keeps_omitted_fields() {
        let dir = TempDir::new().unwrap();
        let (mut workspace, video_id) = workspace_with_video(&dir).await;

        run_args(
            &mut workspace,
            &["ann", "add", &video_id, "--start", "1", "--end", "2", "--text", "Old"],
        )
        .await
        .unwrap();
        let id = workspace.manager().annotations().await[0].id.clone();

        run_args(&mut workspace, &["ann", "edit", &video_id, &id, "--end", "4"])
            .await
            .unwrap();

        let annotations = workspace.manager().annotations().await;
        assert_eq!(annotations.len(), 1);
        assert_eq!(annotations[0].start_time, 1.0);
        assert_eq!(annotations[0].end_time, 4.0);
        assert_eq!(annotations[0].text, "Old");
    }

    #[tokio::test]
    async fn test_invalid_range_is_an_error() {
        let dir = TempDir::new().unwrap();
        let (mut workspace, video_id) = workspace_with_video(&dir).await;

        let result = run_args(
            &mut workspace,
            &["ann", "add", &video_id, "--start", "5", "--end", "2", "--text", "x"],
        )
        .await;
        assert!(result.is_err());
        assert!(workspace.manager().annotations().await.is_empty());
    }

    #[tokio::test]
    async fn test_time_step_rejects_rates_above_limit() {
        let dir = TempDir::new().unwrap();
        let mut workspace = Workspace::open(&dir.path().join("data")).unwrap();

        assert!(run_args(&mut workspace, &["time", "step", "0", "--fps", "2000"])
            .await
            .is_err());
        run_args(&mut workspace, &["time", "step", "0", "--fps", "500"])
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_set_fps_persists() {
        let dir = TempDir::new().unwrap();
        let data_dir = dir.path().join("data");
        let mut workspace = Workspace::open(&data_dir).unwrap();

        run_args(&mut workspace, &["settings", "set-fps", "10"])
            .await
            .unwrap();
        assert!(run_args(&mut workspace, &["settings", "set-fps", "24"]).await.is_err());

        let reopened = Workspace::open(&data_dir).unwrap();
        assert_eq!(reopened.frame_rate(), FrameRate::FPS_10);
    }
}
