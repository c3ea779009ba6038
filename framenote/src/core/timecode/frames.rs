//! Frame-Time Conversion
//!
//! Converts between playback positions and discrete frame indices.
//!
//! Stepping always re-derives the frame index from the absolute position,
//! so repeated steps cannot accumulate floating-point error. Frame times are
//! computed in integer milliseconds and floored whenever the division is not
//! exact: frame 2 at 30 fps is `0.066`, frame 3 at 10 fps is `0.3`.
//! Flooring loses less than half a frame as long as the rate is at most
//! `FrameRate::MAX_FPS`, so the index always rounds back to the same frame.

use crate::core::{Frame, FrameRate, StepDirection, TimeSec};

/// Returns the frame index closest to `time`
pub fn frame_index(time: TimeSec, rate: FrameRate) -> Frame {
    if !time.is_finite() {
        return 0;
    }
    (time * rate.as_f64()).round() as Frame
}

/// Returns the start time of `frame`, floored to whole milliseconds
pub fn frame_to_time(frame: Frame, rate: FrameRate) -> TimeSec {
    let ms = (i128::from(frame) * 1000).div_euclid(i128::from(rate.get()));
    ms as f64 / 1000.0
}

/// Moves `delta` frames from `current`, never before zero
pub fn step_frames(current: TimeSec, rate: FrameRate, delta: Frame) -> TimeSec {
    let target = frame_index(current, rate).saturating_add(delta);
    frame_to_time(target, rate).max(0.0)
}

/// Moves exactly one frame forward or backward from `current`
pub fn step_frame(current: TimeSec, rate: FrameRate, direction: StepDirection) -> TimeSec {
    step_frames(current, rate, direction.delta())
}

/// Moves `amount` seconds from `current`, clamped into `[0, duration]`
///
/// The result is rounded to the nearest millisecond.
pub fn seek_by(current: TimeSec, amount: TimeSec, duration: TimeSec) -> TimeSec {
    let current = if current.is_finite() { current } else { 0.0 };
    let amount = if amount.is_finite() { amount } else { 0.0 };
    let upper = if duration.is_finite() && duration > 0.0 {
        duration
    } else {
        0.0
    };

    let clamped = (current + amount).clamp(0.0, upper);
    (clamped * 1000.0).round() / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fps(n: u32) -> FrameRate {
        FrameRate::new(n).unwrap()
    }

    // -------------------------------------------------------------------------
    // Frame <-> Time
    // -------------------------------------------------------------------------

    #[test]
    fn test_frame_to_time_floors_at_30fps() {
        assert_eq!(frame_to_time(1, FrameRate::FPS_30), 0.033);
        assert_eq!(frame_to_time(2, FrameRate::FPS_30), 0.066);
        assert_eq!(frame_to_time(30, FrameRate::FPS_30), 1.0);
    }

    #[test]
    fn test_frame_to_time_exact_at_10fps() {
        assert_eq!(frame_to_time(1, FrameRate::FPS_10), 0.1);
        assert_eq!(frame_to_time(3, FrameRate::FPS_10), 0.3);
        assert_eq!(frame_to_time(25, FrameRate::FPS_10), 2.5);
    }

    #[test]
    fn test_frame_index_rounds() {
        assert_eq!(frame_index(0.066, FrameRate::FPS_30), 2);
        assert_eq!(frame_index(0.049, FrameRate::FPS_10), 0);
        assert_eq!(frame_index(0.051, FrameRate::FPS_10), 1);
        assert_eq!(frame_index(f64::NAN, FrameRate::FPS_30), 0);
    }

    #[test]
    fn test_step_zero_frames_keeps_floored_time() {
        assert_eq!(step_frames(0.066, FrameRate::FPS_30, 0), 0.066);
        assert_eq!(step_frames(2.0 / 30.0, FrameRate::FPS_30, 0), 0.066);
    }

    // -------------------------------------------------------------------------
    // Stepping
    // -------------------------------------------------------------------------

    #[test]
    fn test_single_steps_match_one_big_step() {
        let mut time = 0.0;
        for _ in 0..30 {
            time = step_frame(time, FrameRate::FPS_30, StepDirection::Forward);
        }
        let jumped = step_frames(0.0, FrameRate::FPS_30, 30);

        assert!((time - 1.0).abs() < 0.001);
        assert!((jumped - 1.0).abs() < 0.001);
        assert_eq!(time, jumped);
    }

    #[test]
    fn test_step_round_trips_do_not_drift() {
        let start = step_frames(0.0, FrameRate::FPS_30, 47);
        let mut time = start;
        for _ in 0..500 {
            time = step_frame(time, FrameRate::FPS_30, StepDirection::Forward);
            time = step_frame(time, FrameRate::FPS_30, StepDirection::Backward);
        }
        assert_eq!(time, start);
    }

    #[test]
    fn test_step_frame_at_10fps() {
        let time = step_frame(0.0, FrameRate::FPS_10, StepDirection::Forward);
        assert_eq!(time, 0.1);
        let time = step_frame(time, FrameRate::FPS_10, StepDirection::Forward);
        assert_eq!(time, 0.2);
    }

    #[test]
    fn test_step_backward_clamps_at_zero() {
        assert_eq!(
            step_frame(0.0, FrameRate::FPS_30, StepDirection::Backward),
            0.0
        );
        assert_eq!(step_frames(0.1, FrameRate::FPS_10, -5), 0.0);
    }

    #[test]
    fn test_step_from_arbitrary_position_snaps_to_frame_grid() {
        // 0.51s is closest to frame 15 at 30fps; one step lands on frame 16.
        assert_eq!(
            step_frame(0.51, FrameRate::FPS_30, StepDirection::Forward),
            0.533
        );
    }

    #[test]
    fn test_step_other_integer_rates() {
        assert_eq!(step_frames(0.0, fps(24), 1), 0.041);
        assert_eq!(step_frames(0.0, fps(25), 1), 0.04);
        assert_eq!(step_frames(0.0, fps(60), 3), 0.05);
    }

    #[test]
    fn test_step_high_rates_never_stall() {
        for rate in [fps(333), fps(499), fps(FrameRate::MAX_FPS)] {
            let mut time = 0.0;
            for n in 1..=1000 {
                let next = step_frame(time, rate, StepDirection::Forward);
                assert!(next > time, "{} stalled at frame {}", rate, n);
                assert_eq!(frame_index(next, rate), n);
                time = next;
            }
            assert_eq!(time, step_frames(0.0, rate, 1000));
        }
    }

    #[test]
    fn test_step_backward_at_high_rate() {
        let rate = fps(499);
        let start = step_frames(0.0, rate, 10);
        let back = step_frame(start, rate, StepDirection::Backward);
        assert_eq!(frame_index(back, rate), 9);
        assert!(back < start);
    }

    // -------------------------------------------------------------------------
    // Seeking
    // -------------------------------------------------------------------------

    #[test]
    fn test_seek_by_clamps_to_duration() {
        assert_eq!(seek_by(8.0, 10.0, 12.5), 12.5);
        assert_eq!(seek_by(3.0, -10.0, 12.5), 0.0);
        assert_eq!(seek_by(3.0, 1.0, 12.5), 4.0);
    }

    #[test]
    fn test_seek_by_rounds_to_milliseconds() {
        assert_eq!(seek_by(0.1, 0.2, 10.0), 0.3);
        assert_eq!(seek_by(1.0, 1.0 / 30.0, 10.0), 1.033);
    }

    #[test]
    fn test_seek_by_unknown_duration() {
        assert_eq!(seek_by(5.0, 1.0, f64::NAN), 0.0);
        assert_eq!(seek_by(f64::NAN, 1.0, 10.0), 1.0);
    }
}
