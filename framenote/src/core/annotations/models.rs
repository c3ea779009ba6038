//! Annotation Data Models
//!
//! Video and annotation records as persisted by the record store.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::core::{AnnotationId, CoreError, CoreResult, TimeSec, VideoId};

// =============================================================================
// Video
// =============================================================================

/// A registered video file
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Video {
    /// Unique identifier
    pub id: VideoId,
    /// Display name (defaults to the file name)
    pub name: String,
    /// Location of the media content
    pub file: PathBuf,
    /// RFC 3339 timestamp when the video was added
    pub added_at: String,
}

// =============================================================================
// Annotation
// =============================================================================

/// A time-ranged text note attached to a video
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Annotation {
    /// Unique identifier assigned by the store
    pub id: AnnotationId,
    /// Owning video
    pub video_id: VideoId,
    /// Start time in seconds
    pub start_time: TimeSec,
    /// End time in seconds (>= start_time)
    pub end_time: TimeSec,
    /// Annotation text
    pub text: String,
}

impl Annotation {
    /// Returns the duration in seconds
    pub fn duration(&self) -> TimeSec {
        self.end_time - self.start_time
    }
}

/// An annotation that has not been assigned an id yet
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAnnotation {
    pub video_id: VideoId,
    pub start_time: TimeSec,
    pub end_time: TimeSec,
    pub text: String,
}

impl NewAnnotation {
    /// Creates a new draft for a video
    pub fn new(video_id: &str, start_time: TimeSec, end_time: TimeSec, text: &str) -> Self {
        Self {
            video_id: video_id.to_string(),
            start_time,
            end_time,
            text: text.to_string(),
        }
    }

    /// Attaches a store-assigned id
    pub fn with_id(self, id: AnnotationId) -> Annotation {
        Annotation {
            id,
            video_id: self.video_id,
            start_time: self.start_time,
            end_time: self.end_time,
            text: self.text,
        }
    }
}

/// Annotation parsed from an import file, not yet bound to a video
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftAnnotation {
    pub start_time: TimeSec,
    pub end_time: TimeSec,
    pub text: String,
}

impl DraftAnnotation {
    /// Binds the draft to a video
    pub fn for_video(self, video_id: &str) -> NewAnnotation {
        NewAnnotation {
            video_id: video_id.to_string(),
            start_time: self.start_time,
            end_time: self.end_time,
            text: self.text,
        }
    }
}

// =============================================================================
// Validation
// =============================================================================

/// Checks the time-range invariant shared by every annotation
///
/// Both marks must be finite and non-negative, and start must not be after
/// end. Equal marks are a valid zero-duration marker.
pub fn validate_time_range(start_time: TimeSec, end_time: TimeSec) -> CoreResult<()> {
    if !start_time.is_finite() || !end_time.is_finite() {
        return Err(CoreError::ValidationError(
            "Annotation times must be finite numbers".to_string(),
        ));
    }
    if start_time < 0.0 || end_time < 0.0 {
        return Err(CoreError::ValidationError(
            "Annotation times cannot be negative".to_string(),
        ));
    }
    if start_time > end_time {
        return Err(CoreError::InvalidTimeRange(start_time, end_time));
    }
    Ok(())
}

/// Checks that annotation text is not blank
pub fn validate_text(text: &str) -> CoreResult<()> {
    if text.trim().is_empty() {
        return Err(CoreError::ValidationError(
            "Annotation text cannot be empty".to_string(),
        ));
    }
    Ok(())
}

/// Sorts annotations ascending by start time
pub fn sort_by_start(annotations: &mut [Annotation]) {
    annotations.sort_by(|a, b| a.start_time.total_cmp(&b.start_time));
}
