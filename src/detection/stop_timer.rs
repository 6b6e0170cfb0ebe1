//! Stopped-time accumulation between two turn points.
//!
//! Width and length of obstacles and gaps are integrated as
//! `speed × elapsed`. Time spent standing still (waiting at a junction,
//! yielding) would inflate that product, so the stopped intervals are
//! accumulated from speed transitions and subtracted.

use crate::core::types::SpeedReading;

/// Accumulates time spent at zero speed
#[derive(Debug, Clone, Default)]
pub struct StopTimer {
    /// Start of the ongoing stop, if the vehicle is currently stopped
    stopped_since_us: Option<u64>,
    /// Completed stop intervals
    accumulated_us: u64,
}

impl StopTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Observe a speed sample: nonzero→0 opens an interval, 0→nonzero closes it.
    pub fn observe(&mut self, reading: &SpeedReading) {
        match (reading.is_stopped(), self.stopped_since_us) {
            (true, None) => {
                self.stopped_since_us = Some(reading.timestamp_us);
            }
            (false, Some(since)) => {
                self.accumulated_us += reading.timestamp_us.saturating_sub(since);
                self.stopped_since_us = None;
            }
            _ => {}
        }
    }

    /// Accumulated stopped time in seconds
    pub fn accumulated_secs(&self) -> f32 {
        self.accumulated_us as f32 / 1e6
    }

    /// Whether a stop interval is currently open
    pub fn is_stopped(&self) -> bool {
        self.stopped_since_us.is_some()
    }

    /// Return the accumulated stopped time and start over
    pub fn take(&mut self) -> f32 {
        let secs = self.accumulated_secs();
        self.reset();
        secs
    }

    pub fn reset(&mut self) {
        self.stopped_since_us = None;
        self.accumulated_us = 0;
    }
}
