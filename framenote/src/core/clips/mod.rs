//! Clip Extraction
//!
//! Contract for cutting `[start, end]` out of a source video, plus the
//! single-slot admission control that keeps at most one extraction running.

mod ffmpeg;

pub use ffmpeg::{find_ffmpeg, FfmpegClipExtractor, ProgressParser};

use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::mpsc;

use crate::core::annotations::validate_time_range;
use crate::core::{AnnotationId, CoreResult, TimeSec};

// =============================================================================
// Contract
// =============================================================================

/// Input of one extraction
#[derive(Clone, Debug, PartialEq)]
pub struct ClipRequest {
    pub source: PathBuf,
    pub start_time: TimeSec,
    pub end_time: TimeSec,
}

impl ClipRequest {
    pub fn new(source: PathBuf, start_time: TimeSec, end_time: TimeSec) -> CoreResult<Self> {
        validate_time_range(start_time, end_time)?;
        Ok(Self {
            source,
            start_time,
            end_time,
        })
    }

    pub fn duration(&self) -> TimeSec {
        self.end_time - self.start_time
    }
}

/// Extracted media
#[derive(Clone, Debug, PartialEq)]
pub struct ClipOutput {
    pub bytes: Vec<u8>,
}

/// Splices a time range out of a video
///
/// Progress is reported as a percentage on `progress`. Values may overshoot
/// 100; receivers clamp. A closed receiver must not fail the extraction.
#[async_trait]
pub trait ClipExtractor: Send + Sync {
    async fn extract(
        &self,
        request: &ClipRequest,
        progress: mpsc::Sender<f64>,
    ) -> CoreResult<ClipOutput>;
}

// =============================================================================
// Admission Control
// =============================================================================

/// Progress of the extraction currently holding the slot
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClipProgress {
    pub annotation_id: AnnotationId,
    /// Percentage in `[0, 100]`
    pub percent: f64,
}

/// Single-occupancy slot for clip extraction
#[derive(Clone, Debug, Default)]
pub struct ClipSlot {
    inner: Arc<Mutex<Option<ClipProgress>>>,
}

impl ClipSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims the slot for `annotation_id`; `None` while another extraction runs
    pub fn try_acquire(&self, annotation_id: &str) -> Option<ClipPermit> {
        let mut slot = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.is_some() {
            return None;
        }
        *slot = Some(ClipProgress {
            annotation_id: annotation_id.to_string(),
            percent: 0.0,
        });
        Some(ClipPermit {
            inner: Arc::clone(&self.inner),
        })
    }

    /// Current extraction, if any
    pub fn progress(&self) -> Option<ClipProgress> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

/// Proof of slot ownership; releases the slot when dropped
#[derive(Debug)]
pub struct ClipPermit {
    inner: Arc<Mutex<Option<ClipProgress>>>,
}

impl ClipPermit {
    /// Records a progress report, clamped to `[0, 100]`
    pub fn set_progress(&self, percent: f64) {
        if !percent.is_finite() {
            return;
        }
        let mut slot = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(job) = slot.as_mut() {
            job.percent = percent.clamp(0.0, 100.0);
        }
    }
}

impl Drop for ClipPermit {
    fn drop(&mut self) {
        *self.inner.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }
}
