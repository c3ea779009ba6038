//! Playback Control
//!
//! Capability the host hands to the core for moving the playhead. The
//! `Playhead` is a headless implementation used by the CLI and tests.

use serde::Serialize;

use crate::core::timecode::{frame_index, seek_by, step_frame};
use crate::core::{Frame, FrameRate, StepDirection, TimeSec};

/// Seek commands implemented by whatever owns playback
pub trait PlaybackControl {
    fn current_time(&self) -> TimeSec;

    /// Jumps to an absolute time
    fn seek(&mut self, time: TimeSec);

    /// Moves relative to the current time
    fn seek_by(&mut self, delta: TimeSec);
}

/// Headless playhead over a media of known duration
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Playhead {
    position: TimeSec,
    duration: TimeSec,
    frame_rate: FrameRate,
}

impl Playhead {
    /// Creates a playhead at zero; non-finite or negative durations are treated as 0
    pub fn new(duration: TimeSec, frame_rate: FrameRate) -> Self {
        let duration = if duration.is_finite() && duration > 0.0 {
            duration
        } else {
            0.0
        };
        Self {
            position: 0.0,
            duration,
            frame_rate,
        }
    }

    pub fn duration(&self) -> TimeSec {
        self.duration
    }

    pub fn frame_rate(&self) -> FrameRate {
        self.frame_rate
    }

    pub fn set_frame_rate(&mut self, frame_rate: FrameRate) {
        self.frame_rate = frame_rate;
    }

    /// Frame index of the current position
    pub fn frame(&self) -> Frame {
        frame_index(self.position, self.frame_rate)
    }

    /// Steps one frame, staying within the media
    pub fn step_frame(&mut self, direction: StepDirection) -> TimeSec {
        let next = step_frame(self.position, self.frame_rate, direction);
        self.position = next.min(self.duration);
        self.position
    }
}

impl PlaybackControl for Playhead {
    fn current_time(&self) -> TimeSec {
        self.position
    }

    fn seek(&mut self, time: TimeSec) {
        self.position = seek_by(time, 0.0, self.duration);
    }

    fn seek_by(&mut self, delta: TimeSec) {
        self.position = seek_by(self.position, delta, self.duration);
    }
}
