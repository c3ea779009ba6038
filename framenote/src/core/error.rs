//! FrameNote Error Definitions
//!
//! Defines error types used throughout the project.

use thiserror::Error;

use super::{AnnotationId, TimeSec, VideoId};

/// Core engine error types
#[derive(Error, Debug)]
pub enum CoreError {
    // =========================================================================
    // Video Errors
    // =========================================================================
    #[error("Video not found: {0}")]
    VideoNotFound(VideoId),

    #[error("No video open")]
    NoVideoOpen,

    #[error("File not found: {0}")]
    FileNotFound(String),

    // =========================================================================
    // Annotation Errors
    // =========================================================================
    #[error("Annotation not found: {0}")]
    AnnotationNotFound(AnnotationId),

    #[error("Start time cannot be after end time: {0:.3}~{1:.3} seconds")]
    InvalidTimeRange(TimeSec, TimeSec),

    #[error("Validation error: {0}")]
    ValidationError(String),

    // =========================================================================
    // Import / Export Errors
    // =========================================================================
    #[error("Invalid CSV format: {0}")]
    ImportFormat(String),

    // =========================================================================
    // Clip Errors
    // =========================================================================
    #[error("Clip extraction failed: {0}")]
    ClipExtraction(String),

    #[error("FFmpeg not found. Install FFmpeg or set clips.ffmpegPath in settings.")]
    FFmpegNotFound,

    // =========================================================================
    // General Errors
    // =========================================================================
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Settings error: {0}")]
    Settings(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Core engine result type
pub type CoreResult<T> = Result<T, CoreError>;

impl CoreError {
    /// True for errors caught locally before any store call
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            CoreError::ValidationError(_) | CoreError::InvalidTimeRange(_, _)
        )
    }
}
