//! Timecode Module
//!
//! Display formatting for playback positions and the frame arithmetic
//! used for frame-accurate seeking.

pub mod frames;

pub use frames::{frame_index, frame_to_time, seek_by, step_frame, step_frames};

use super::TimeSec;

/// Shown for positions that cannot be displayed (negative, NaN, infinite)
pub const ZERO_TIMESTAMP: &str = "00:00.000";

/// Formats seconds as a `MM:SS.mmm` display timestamp
///
/// Rounds to the nearest millisecond before splitting into components,
/// so `59.9996` becomes `01:00.000` rather than `00:59.1000`.
/// Minutes are not wrapped into hours.
pub fn format_timestamp(seconds: TimeSec) -> String {
    if !seconds.is_finite() || seconds < 0.0 {
        return ZERO_TIMESTAMP.to_string();
    }

    let total_ms = (seconds * 1000.0).round() as u64;
    let ms = total_ms % 1000;
    let total_secs = total_ms / 1000;
    let secs = total_secs % 60;
    let mins = total_secs / 60;

    format!("{:02}:{:02}.{:03}", mins, secs, ms)
}

/// Formats seconds for use inside a file name (`00-05-120`)
pub fn filename_timestamp(seconds: TimeSec) -> String {
    format_timestamp(seconds).replace([':', '.'], "-")
}
