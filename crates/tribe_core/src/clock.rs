//! Frame rate counter.
//!
//! The simulation itself is driven purely by ticks. This counter exists
//! for front-ends that want to show how many frames they render per
//! interval; it is fed real timestamps by the caller and never influences
//! simulation state.

use serde::{Deserialize, Serialize};

/// Counts frames and publishes the count once per interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FpsCounter {
    interval_ms: u64,
    window_start_ms: Option<u64>,
    frames: u32,
    fps: u32,
}

impl FpsCounter {
    /// Counter publishing every `interval_ms` milliseconds.
    #[must_use]
    pub const fn new(interval_ms: u64) -> Self {
        Self {
            interval_ms,
            window_start_ms: None,
            frames: 0,
            fps: 0,
        }
    }

    /// Last published reading.
    #[must_use]
    pub const fn fps(&self) -> u32 {
        self.fps
    }

    /// Record one frame at `now_ms`.
    ///
    /// Returns the new reading when an interval has just closed.
    pub fn record_frame(&mut self, now_ms: u64) -> Option<u32> {
        let start = *self.window_start_ms.get_or_insert(now_ms);
        self.frames += 1;

        if now_ms >= start + self.interval_ms {
            self.fps = self.frames;
            self.frames = 0;
            self.window_start_ms = Some(now_ms);
            return Some(self.fps);
        }
        None
    }
}

impl Default for FpsCounter {
    fn default() -> Self {
        Self::new(1000)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reports_frames_per_interval() {
        let mut counter = FpsCounter::new(1000);
        let mut published = Vec::new();
        for frame in 0..=120u64 {
            if let Some(fps) = counter.record_frame(frame * 1000 / 60) {
                published.push(fps);
            }
        }
        assert_eq!(published, vec![61, 60]);
        assert_eq!(counter.fps(), 60);
    }

    #[test]
    fn test_silent_before_first_interval() {
        let mut counter = FpsCounter::new(1000);
        assert_eq!(counter.record_frame(5_000), None);
        assert_eq!(counter.record_frame(5_999), None);
        assert_eq!(counter.fps(), 0);
        assert_eq!(counter.record_frame(6_000), Some(3));
    }
}
