//! FrameNote Core Type Definitions
//!
//! Defines fundamental types used throughout the project.

use std::fmt;
use std::num::NonZeroU32;

use serde::{Deserialize, Serialize};

use super::{CoreError, CoreResult};

// =============================================================================
// ID Types
// =============================================================================

/// Video unique identifier (UUID v4)
pub type VideoId = String;

/// Annotation unique identifier (UUID v4)
pub type AnnotationId = String;

// =============================================================================
// Time Types
// =============================================================================

/// Time in seconds (floating point)
pub type TimeSec = f64;

/// Time in frames (integer)
pub type Frame = i64;

/// Integer frame rate used for frame stepping
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct FrameRate(NonZeroU32);

impl FrameRate {
    /// 30 frames per second
    pub const FPS_30: FrameRate = FrameRate(match NonZeroU32::new(30) {
        Some(v) => v,
        None => unreachable!(),
    });

    /// 10 frames per second
    pub const FPS_10: FrameRate = FrameRate(match NonZeroU32::new(10) {
        Some(v) => v,
        None => unreachable!(),
    });

    /// Rates offered for selection
    pub const SUPPORTED: [FrameRate; 2] = [FrameRate::FPS_30, FrameRate::FPS_10];

    /// Highest rate whose frame times survive millisecond flooring
    pub const MAX_FPS: u32 = 500;

    /// Creates a frame rate from a positive integer up to `MAX_FPS`
    pub fn new(fps: u32) -> CoreResult<Self> {
        if fps > Self::MAX_FPS {
            return Err(CoreError::ValidationError(format!(
                "Frame rate cannot exceed {} fps",
                Self::MAX_FPS
            )));
        }
        NonZeroU32::new(fps)
            .map(Self)
            .ok_or_else(|| CoreError::ValidationError("Frame rate must be positive".to_string()))
    }

    /// Frames per second
    pub fn get(self) -> u32 {
        self.0.get()
    }

    /// Converts to floating point value
    pub fn as_f64(self) -> f64 {
        f64::from(self.0.get())
    }

    /// Returns true if this rate is one of the selectable rates
    pub fn is_supported(self) -> bool {
        Self::SUPPORTED.contains(&self)
    }
}

impl Default for FrameRate {
    fn default() -> Self {
        Self::FPS_30
    }
}

impl TryFrom<u32> for FrameRate {
    type Error = CoreError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<FrameRate> for u32 {
    fn from(value: FrameRate) -> Self {
        value.get()
    }
}

impl fmt::Display for FrameRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} fps", self.0)
    }
}

/// Direction of a single frame step
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StepDirection {
    Forward,
    Backward,
}

impl StepDirection {
    /// Signed frame delta (+1 / -1)
    pub fn delta(self) -> Frame {
        match self {
            StepDirection::Forward => 1,
            StepDirection::Backward => -1,
        }
    }
}
