//! Annotation Session
//!
//! Transient editing state for one open video: the pending start/end marks
//! and the annotation being edited, if any. Pure state, no I/O; the
//! `AnnotationManager` drives the store calls.

use serde::Serialize;

use crate::core::{CoreError, CoreResult, TimeSec};

use super::{validate_text, validate_time_range, Annotation, NewAnnotation};

// =============================================================================
// Session State
// =============================================================================

/// Lifecycle state of the annotation editor
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SessionState {
    /// Nothing marked, nothing being edited
    Idle,
    /// At least one mark set for a new annotation
    PendingNew,
    /// An existing annotation is loaded for editing
    Editing,
}

/// In-progress start/end marks
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingRange {
    pub start: Option<TimeSec>,
    pub end: Option<TimeSec>,
}

impl PendingRange {
    /// Returns true if neither mark is set
    pub fn is_empty(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }

    /// Returns both marks if they are set and correctly ordered
    pub fn validated(&self) -> CoreResult<(TimeSec, TimeSec)> {
        let (Some(start), Some(end)) = (self.start, self.end) else {
            return Err(CoreError::ValidationError(
                "A valid start and end time must be set".to_string(),
            ));
        };
        validate_time_range(start, end)?;
        Ok((start, end))
    }
}

/// Store call a commit resolves to
#[derive(Clone, Debug, PartialEq)]
pub enum CommitPlan {
    Create(NewAnnotation),
    Update(Annotation),
}

// =============================================================================
// Annotation Session
// =============================================================================

/// Pending marks plus the optional editing target
#[derive(Clone, Debug, Default)]
pub struct AnnotationSession {
    range: PendingRange,
    editing: Option<Annotation>,
    /// Bumped on every change; lets async callers detect intervening edits
    generation: u64,
}

impl AnnotationSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current lifecycle state
    pub fn state(&self) -> SessionState {
        if self.editing.is_some() {
            SessionState::Editing
        } else if self.range.is_empty() {
            SessionState::Idle
        } else {
            SessionState::PendingNew
        }
    }

    /// Counter of session changes
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn range(&self) -> PendingRange {
        self.range
    }

    /// Annotation currently being edited
    pub fn editing(&self) -> Option<&Annotation> {
        self.editing.as_ref()
    }

    /// Text to seed the input field with
    pub fn seed_text(&self) -> &str {
        self.editing.as_ref().map(|a| a.text.as_str()).unwrap_or("")
    }

    /// Sets the start mark
    pub fn mark_start(&mut self, time: TimeSec) -> CoreResult<()> {
        self.range.start = Some(checked_mark(time)?);
        self.generation += 1;
        Ok(())
    }

    /// Sets the end mark
    pub fn mark_end(&mut self, time: TimeSec) -> CoreResult<()> {
        self.range.end = Some(checked_mark(time)?);
        self.generation += 1;
        Ok(())
    }

    /// Loads an existing annotation for editing, replacing any pending marks
    pub fn begin_edit(&mut self, annotation: Annotation) {
        self.range = PendingRange {
            start: Some(annotation.start_time),
            end: Some(annotation.end_time),
        };
        self.editing = Some(annotation);
        self.generation += 1;
    }

    /// Drops pending marks and the editing target
    pub fn reset(&mut self) {
        self.range = PendingRange::default();
        self.editing = None;
        self.generation += 1;
    }

    /// True when a save would pass validation (text aside)
    pub fn can_commit(&self) -> bool {
        self.range.validated().is_ok()
    }

    /// Resolves a save into the store call to make
    ///
    /// Does not change the session; call `reset` once the store confirms.
    pub fn plan_commit(&self, video_id: &str, text: &str) -> CoreResult<CommitPlan> {
        validate_text(text)?;
        let (start_time, end_time) = self.range.validated()?;

        Ok(match &self.editing {
            Some(original) => CommitPlan::Update(Annotation {
                start_time,
                end_time,
                text: text.to_string(),
                ..original.clone()
            }),
            None => CommitPlan::Create(NewAnnotation::new(video_id, start_time, end_time, text)),
        })
    }

    /// Handles deletion of an annotation; cancels the edit if it was the target
    ///
    /// Returns true if the session was reset.
    pub fn on_deleted(&mut self, annotation_id: &str) -> bool {
        if self.editing.as_ref().is_some_and(|a| a.id == annotation_id) {
            self.reset();
            return true;
        }
        false
    }
}

fn checked_mark(time: TimeSec) -> CoreResult<TimeSec> {
    if !time.is_finite() || time < 0.0 {
        return Err(CoreError::ValidationError(format!(
            "Invalid mark time: {}",
            time
        )));
    }
    Ok(time)
}
