//! Command line definitions

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use framenote_lib::core::export::ExportFormat;

/// FrameNote: frame-accurate video annotation
#[derive(Parser, Debug)]
#[command(name = "framenote", author, version, about, long_about = None)]
pub struct Cli {
    /// Data directory holding the database, settings, and logs
    #[arg(long, global = true, env = "FRAMENOTE_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Answer yes to every confirmation
    #[arg(short = 'y', long, global = true)]
    pub yes: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Manage registered videos
    #[command(subcommand)]
    Video(VideoCommand),

    /// Manage annotations of a video
    #[command(subcommand)]
    Ann(AnnCommand),

    /// Export a video's annotations
    Export(ExportArgs),

    /// Import annotations from a CSV file
    Import(ImportArgs),

    /// Extract an annotation's range as an MP4 clip
    Clip(ClipArgs),

    /// Timestamp and frame arithmetic
    #[command(subcommand)]
    Time(TimeCommand),

    /// Show or change settings
    #[command(subcommand)]
    Settings(SettingsCommand),
}

// =============================================================================
// Videos
// =============================================================================

#[derive(Subcommand, Debug)]
pub enum VideoCommand {
    /// Register a local video file
    Add {
        /// Path to the video file
        path: PathBuf,

        /// Display name (defaults to the file name)
        #[arg(long)]
        name: Option<String>,
    },

    /// List registered videos
    List,

    /// Delete a video and all its annotations
    Delete {
        /// Video id
        video: String,
    },
}

// =============================================================================
// Annotations
// =============================================================================

#[derive(Subcommand, Debug)]
pub enum AnnCommand {
    /// List annotations sorted by start time
    List {
        /// Video id
        video: String,
    },

    /// Add an annotation
    Add {
        /// Video id
        video: String,

        /// Start time (seconds or MM:SS.mmm)
        #[arg(long, value_parser = parse_time_arg)]
        start: f64,

        /// End time (seconds or MM:SS.mmm)
        #[arg(long, value_parser = parse_time_arg)]
        end: f64,

        /// Annotation text
        #[arg(long)]
        text: String,
    },

    /// Edit an annotation; omitted fields keep their value
    Edit {
        /// Video id
        video: String,

        /// Annotation id
        annotation: String,

        #[arg(long, value_parser = parse_time_arg)]
        start: Option<f64>,

        #[arg(long, value_parser = parse_time_arg)]
        end: Option<f64>,

        #[arg(long)]
        text: Option<String>,
    },

    /// Delete an annotation
    Delete {
        /// Video id
        video: String,

        /// Annotation id
        annotation: String,
    },

    /// Print where playback would jump for an annotation
    Seek {
        /// Video id
        video: String,

        /// Annotation id
        annotation: String,

        /// Media duration in seconds used to clamp the seek
        #[arg(long)]
        duration: Option<f64>,
    },
}

// =============================================================================
// Import / Export / Clip
// =============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum FormatArg {
    Csv,
    Txt,
}

impl From<FormatArg> for ExportFormat {
    fn from(value: FormatArg) -> Self {
        match value {
            FormatArg::Csv => ExportFormat::Csv,
            FormatArg::Txt => ExportFormat::Txt,
        }
    }
}

#[derive(Args, Debug)]
pub struct ExportArgs {
    /// Video id
    pub video: String,

    /// Output format
    #[arg(long, value_enum, default_value = "csv")]
    pub format: FormatArg,

    /// Output directory (defaults to the working directory)
    #[arg(long)]
    pub out: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct ImportArgs {
    /// Video id
    pub video: String,

    /// CSV file previously produced by `export`
    pub file: PathBuf,
}

#[derive(Args, Debug)]
pub struct ClipArgs {
    /// Video id
    pub video: String,

    /// Annotation id
    pub annotation: String,

    /// Output directory (defaults to clips.outputDir, then the working directory)
    #[arg(long)]
    pub out: Option<PathBuf>,

    /// ffmpeg binary (defaults to clips.ffmpegPath, then PATH)
    #[arg(long)]
    pub ffmpeg: Option<PathBuf>,
}

// =============================================================================
// Time / Settings
// =============================================================================

#[derive(Subcommand, Debug)]
pub enum TimeCommand {
    /// Format seconds as MM:SS.mmm
    Format {
        #[arg(allow_negative_numbers = true)]
        seconds: f64,
    },

    /// Step frames from a position
    Step {
        /// Start position (seconds or MM:SS.mmm)
        #[arg(value_parser = parse_time_arg)]
        from: f64,

        /// Frames to move; negative steps backward
        #[arg(long, default_value_t = 1, allow_negative_numbers = true)]
        frames: i64,

        /// Frame rate, 1 to 500 (defaults to the configured one)
        #[arg(long)]
        fps: Option<u32>,
    },
}

#[derive(Subcommand, Debug)]
pub enum SettingsCommand {
    /// Print current settings
    Show,

    /// Select the frame rate used for stepping (30 or 10)
    SetFps { fps: u32 },
}

// =============================================================================
// Argument Parsing
// =============================================================================

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum TimeArgError {
    #[error("Invalid time '{0}': expected seconds or MM:SS.mmm")]
    Malformed(String),

    #[error("Time cannot be negative: {0}")]
    Negative(String),
}

/// Parses `12.5`, `01:05.123`, or `125:00` into seconds
pub fn parse_time_arg(value: &str) -> Result<f64, TimeArgError> {
    let trimmed = value.trim();
    let malformed = || TimeArgError::Malformed(value.to_string());

    let seconds = match trimmed.split_once(':') {
        Some((minutes, seconds)) => {
            let minutes: u64 = minutes.parse().map_err(|_| malformed())?;
            let seconds: f64 = seconds.parse().map_err(|_| malformed())?;
            if !(0.0..60.0).contains(&seconds) {
                return Err(malformed());
            }
            minutes as f64 * 60.0 + seconds
        }
        None => trimmed.parse::<f64>().map_err(|_| malformed())?,
    };

    if !seconds.is_finite() {
        return Err(malformed());
    }
    if seconds < 0.0 {
        return Err(TimeArgError::Negative(value.to_string()));
    }
    Ok(seconds)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn test_parse_time_arg() {
        assert_eq!(parse_time_arg("12.5"), Ok(12.5));
        assert!((parse_time_arg("01:05.123").unwrap() - 65.123).abs() < 1e-9);
        assert_eq!(parse_time_arg("125:00"), Ok(7500.0));
        assert_eq!(parse_time_arg(" 0 "), Ok(0.0));
    }

    #[test]
    fn test_parse_time_arg_errors() {
        assert!(matches!(
            parse_time_arg("abc"),
            Err(TimeArgError::Malformed(_))
        ));
        assert!(matches!(
            parse_time_arg("01:75"),
            Err(TimeArgError::Malformed(_))
        ));
        assert!(matches!(
            parse_time_arg("-1"),
            Err(TimeArgError::Negative(_))
        ));
        assert!(parse_time_arg("NaN").is_err());
    }

    #[test]
    fn test_parse_video_add() {
        let cli = parse(&["framenote", "video", "add", "talk.mp4", "--name", "Talk"]);
        match cli.command {
            Commands::Video(VideoCommand::Add { path, name }) => {
                assert_eq!(path, PathBuf::from("talk.mp4"));
                assert_eq!(name.as_deref(), Some("Talk"));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_ann_add_with_timestamps() {
        let cli = parse(&[
            "framenote", "ann", "add", "v1", "--start", "00:01.500", "--end", "3.25", "--text",
            "Intro",
        ]);
        match cli.command {
            Commands::Ann(AnnCommand::Add {
                video,
                start,
                end,
                text,
            }) => {
                assert_eq!(video, "v1");
                assert_eq!(start, 1.5);
                assert_eq!(end, 3.25);
                assert_eq!(text, "Intro");
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_rejects_bad_time() {
        assert!(Cli::try_parse_from([
            "framenote", "ann", "add", "v1", "--start", "soon", "--end", "3", "--text", "x",
        ])
        .is_err());
    }

    #[test]
    fn test_parse_global_flags_after_subcommand() {
        let cli = parse(&[
            "framenote",
            "video",
            "delete",
            "v1",
            "--yes",
            "--json",
            "--data-dir",
            "/tmp/fn",
        ]);
        assert!(cli.yes);
        assert!(cli.json);
        assert_eq!(cli.data_dir, Some(PathBuf::from("/tmp/fn")));
    }

    #[test]
    fn test_parse_export_format() {
        let cli = parse(&["framenote", "export", "v1", "--format", "txt"]);
        match cli.command {
            Commands::Export(args) => {
                assert_eq!(ExportFormat::from(args.format), ExportFormat::Txt);
                assert!(args.out.is_none());
            }
            other => panic!("unexpected command: {:?}", other),
        }

        let cli = parse(&["framenote", "export", "v1"]);
        assert!(matches!(
            cli.command,
            Commands::Export(ExportArgs {
                format: FormatArg::Csv,
                ..
            })
        ));
    }

    #[test]
    fn test_parse_time_step_backward() {
        let cli = parse(&["framenote", "time", "step", "1.0", "--frames", "-3", "--fps", "10"]);
        match cli.command {
            Commands::Time(TimeCommand::Step { from, frames, fps }) => {
                assert_eq!(from, 1.0);
                assert_eq!(frames, -3);
                assert_eq!(fps, Some(10));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_settings_set_fps() {
        let cli = parse(&["framenote", "settings", "set-fps", "10"]);
        assert!(matches!(
            cli.command,
            Commands::Settings(SettingsCommand::SetFps { fps: 10 })
        ));
    }

    #[test]
    fn test_cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
