//! Time management utilities

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::Instant;

/// Monotonic clock measuring seconds since its creation
#[derive(Debug, Clone, Copy)]
pub struct Clock {
    epoch: Instant,
}

impl Default for Clock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock {
    /// Start a new clock at zero
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
        }
    }

    /// Seconds elapsed since the clock was created
    pub fn seconds(&self) -> f32 {
        self.epoch.elapsed().as_secs_f32()
    }
}

/// How the frame timer turns raw frame durations into the delta handed to callbacks
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum DeltaMode {
    /// The measured duration of the previous frame
    Raw,
    /// A moving average over the last `window` frame durations
    Smoothed {
        /// Number of frames averaged
        window: usize,
    },
}

impl Default for DeltaMode {
    fn default() -> Self {
        Self::Smoothed { window: 5000 }
    }
}

/// High-precision timer for frame timing
///
/// Call [`FrameTimer::tick`] once at the top of every frame. The first tick
/// measures from timer creation.
pub struct FrameTimer {
    mode: DeltaMode,
    last_frame: Instant,
    raw_delta: f32,
    delta_time: f32,
    total_time: f32,
    frame_count: u64,
    samples: VecDeque<f32>,
    sample_sum: f64,
}

impl Default for FrameTimer {
    fn default() -> Self {
        Self::new(DeltaMode::default())
    }
}

impl FrameTimer {
    /// Create a new timer
    pub fn new(mode: DeltaMode) -> Self {
        Self {
            mode,
            last_frame: Instant::now(),
            raw_delta: 0.0,
            delta_time: 0.0,
            total_time: 0.0,
            frame_count: 0,
            samples: VecDeque::new(),
            sample_sum: 0.0,
        }
    }

    /// Restart measurement from now without touching counters
    pub fn reset(&mut self) {
        self.last_frame = Instant::now();
    }

    /// Measure the previous frame and return the delta to hand to callbacks
    pub fn tick(&mut self) -> f32 {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_frame).as_secs_f32();
        self.last_frame = now;
        self.record(elapsed)
    }

    /// Feed one raw frame duration through the configured delta mode
    pub fn record(&mut self, raw: f32) -> f32 {
        self.raw_delta = raw;
        self.total_time += raw;
        self.frame_count += 1;

        self.delta_time = match self.mode {
            DeltaMode::Raw => raw,
            DeltaMode::Smoothed { window } => {
                let window = window.max(1);
                self.samples.push_back(raw);
                self.sample_sum += f64::from(raw);
                while self.samples.len() > window {
                    if let Some(old) = self.samples.pop_front() {
                        self.sample_sum -= f64::from(old);
                    }
                }
                (self.sample_sum / self.samples.len() as f64) as f32
            }
        };
        self.delta_time
    }

    /// Delta produced by the last tick, after smoothing
    pub fn delta_time(&self) -> f32 {
        self.delta_time
    }

    /// Unsmoothed duration of the last frame
    pub fn raw_delta(&self) -> f32 {
        self.raw_delta
    }

    /// Get the total elapsed time across all ticks
    pub fn total_time(&self) -> f32 {
        self.total_time
    }

    /// Get the current frame count
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Active delta mode
    pub fn mode(&self) -> DeltaMode {
        self.mode
    }
}

/// Counts frames and reports a rate once per interval
pub struct FpsCounter {
    interval: f32,
    accumulated: f32,
    frames: u32,
}

impl FpsCounter {
    /// Create a counter reporting every `interval` seconds
    pub fn new(interval: f32) -> Self {
        Self {
            interval,
            accumulated: 0.0,
            frames: 0,
        }
    }

    /// Count one frame of `dt` seconds; returns the rate when an interval elapses
    pub fn frame(&mut self, dt: f32) -> Option<f32> {
        self.accumulated += dt;
        self.frames += 1;
        if self.accumulated >= self.interval && self.accumulated > 0.0 {
            let fps = self.frames as f32 / self.accumulated;
            self.accumulated = 0.0;
            self.frames = 0;
            Some(fps)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_raw_mode_passes_duration_through() {
        let mut timer = FrameTimer::new(DeltaMode::Raw);
        assert_relative_eq!(timer.record(0.016), 0.016);
        assert_relative_eq!(timer.record(0.032), 0.032);
        assert_eq!(timer.frame_count(), 2);
        assert_relative_eq!(timer.total_time(), 0.048, epsilon = 1e-6);
    }

    #[test]
    fn test_smoothed_mode_averages_window() {
        let mut timer = FrameTimer::new(DeltaMode::Smoothed { window: 2 });
        assert_relative_eq!(timer.record(0.010), 0.010);
        assert_relative_eq!(timer.record(0.030), 0.020, epsilon = 1e-6);
        // Oldest sample drops out
        assert_relative_eq!(timer.record(0.050), 0.040, epsilon = 1e-6);
        assert_relative_eq!(timer.raw_delta(), 0.050);
    }

    #[test]
    fn test_smoothed_window_of_zero_behaves_like_one() {
        let mut timer = FrameTimer::new(DeltaMode::Smoothed { window: 0 });
        timer.record(0.5);
        assert_relative_eq!(timer.record(0.25), 0.25);
    }

    #[test]
    fn test_tick_is_non_negative() {
        let mut timer = FrameTimer::default();
        assert!(timer.tick() >= 0.0);
    }

    #[test]
    fn test_fps_counter_reports_once_per_interval() {
        let mut fps = FpsCounter::new(1.0);
        assert!(fps.frame(0.5).is_none());
        let rate = fps.frame(0.5).unwrap();
        assert_relative_eq!(rate, 2.0);
        assert!(fps.frame(0.1).is_none());
    }

    #[test]
    fn test_clock_is_monotonic() {
        let clock = Clock::new();
        let a = clock.seconds();
        let b = clock.seconds();
        assert!(b >= a);
    }
}
