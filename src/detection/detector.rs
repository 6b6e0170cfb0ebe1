//! Streaming turn-point classifier for one side-looking range sensor.
//!
//! While the vehicle drives past parked cars the side sensor sees a
//! distance signal like this:
//!
//! ```text
//! range
//!   ▲          TP2 ┌───────────┐ TP3
//!   │              │    gap    │
//!   │  TP0     TP1 │           │ TP4   TP5
//!   │  ────────────┘           └──────────
//!   │    obstacle                obstacle
//!   └──────────────────────────────────────▶ time
//! ```
//!
//! Each new reading is compared with the previous one ([`Trend`]); the
//! number of turn points captured so far selects what a rising, falling or
//! stable edge means. Obstacle and gap widths are integrated from the
//! vehicle speed over the time between turn points, minus stopped time.

use super::stop_timer::StopTimer;
use super::trend::Trend;
use crate::core::sensor::SensorId;
use crate::core::types::{DetectedSpace, RangeReading, Side, SpaceKind, SpeedReading};
use crate::error::{Error, Result};
use std::collections::VecDeque;

/// Maximum number of live turn points in one detection cycle
pub const MAX_TURN_POINTS: usize = 6;

/// Maximum number of queued readings
pub const QUEUE_CAPACITY: usize = 2;

/// Thresholds for one space-detection engine
#[derive(Debug, Clone)]
pub struct DetectorConfig {
    /// Range difference that separates an edge from noise
    pub range_diff: f32,
    /// Maximum relevant range
    pub distance_search: f32,
    /// Minimum width of a parallel parking space
    pub parallel_width: f32,
    /// Minimum length of a parallel parking space
    pub parallel_length: f32,
    /// Minimum width of a perpendicular parking space
    pub perpendicular_width: f32,
    /// Minimum length of a perpendicular parking space
    pub perpendicular_length: f32,
    /// Minimum width of a car
    pub car_width: f32,
    /// Minimum length of a car
    pub car_length: f32,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        crate::config::AppConfig::default().detector_config()
    }
}

/// Space-detection engine bound to one sensor.
///
/// Not thread-safe by itself: one engine per sensor, fed from one task or
/// guarded by one lock (see [`super::SpaceSearch`]).
#[derive(Debug)]
pub struct SpaceDetector {
    config: DetectorConfig,
    sensor: SensorId,
    side: Side,
    /// The two most recent in-range readings (front = older)
    queue: VecDeque<RangeReading>,
    /// Turn points of the current cycle
    turn_points: Vec<RangeReading>,
    /// Closest range seen around the first obstacle
    distance_min: f32,
    /// Latest vehicle speed
    speed: f32,
    last_timestamp_us: Option<u64>,
    /// Stopped time while exactly one turn point is live
    stop_obstacle: StopTimer,
    /// Stopped time while exactly three turn points are live
    stop_gap: StopTimer,
    /// Obstacle length measured once turn point 1 is known
    obstacle_length: Option<f32>,
    /// Kind suggested by the obstacle passed before the gap
    candidate: Option<SpaceKind>,
    cycles_completed: u64,
}

impl SpaceDetector {
    pub fn new(sensor: SensorId, side: Side, config: DetectorConfig) -> Self {
        log::debug!(
            "SpaceDetector[{}]: range_diff={:.1}, distance_search={:.1}",
            sensor,
            config.range_diff,
            config.distance_search
        );

        Self {
            config,
            sensor,
            side,
            queue: VecDeque::with_capacity(QUEUE_CAPACITY),
            turn_points: Vec::with_capacity(MAX_TURN_POINTS),
            distance_min: f32::INFINITY,
            speed: 0.0,
            last_timestamp_us: None,
            stop_obstacle: StopTimer::new(),
            stop_gap: StopTimer::new(),
            obstacle_length: None,
            candidate: None,
            cycles_completed: 0,
        }
    }

    /// Engine for the front side sensor looking at `side`
    pub fn for_side(side: Side, config: DetectorConfig) -> Self {
        Self::new(SensorId::search_sensor(side), side, config)
    }

    pub fn sensor(&self) -> SensorId {
        self.sensor
    }

    pub fn side(&self) -> Side {
        self.side
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Number of live turn points
    pub fn turn_point_count(&self) -> usize {
        self.turn_points.len()
    }

    /// Live turn points, oldest first
    pub fn turn_points(&self) -> &[RangeReading] {
        &self.turn_points
    }

    /// Number of queued readings
    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    /// Kind suggested by the obstacle before the gap
    pub fn candidate_kind(&self) -> Option<SpaceKind> {
        self.candidate
    }

    /// Number of cycles that reached the final turn point
    pub fn cycles_completed(&self) -> u64 {
        self.cycles_completed
    }

    /// Feed a speed sample
    pub fn on_speed(&mut self, reading: SpeedReading) {
        self.speed = reading.speed;

        match self.turn_points.len() {
            1 => self.stop_obstacle.observe(&reading),
            3 => self.stop_gap.observe(&reading),
            _ => {}
        }
    }

    /// Feed a range sample.
    ///
    /// Returns the classified space when this reading completes an
    /// accepted detection cycle.
    pub fn on_range(&mut self, reading: RangeReading) -> Result<Option<DetectedSpace>> {
        if reading.sensor_id != self.sensor {
            return Err(Error::InvalidTransition(format!(
                "reading from {} fed to detector of {}",
                reading.sensor_id, self.sensor
            )));
        }
        if let Some(last) = self.last_timestamp_us
            && reading.timestamp_us < last
        {
            return Err(Error::InvalidTransition(format!(
                "{}: reading at {}us is older than previous reading at {}us",
                self.sensor, reading.timestamp_us, last
            )));
        }
        self.last_timestamp_us = Some(reading.timestamp_us);

        let in_range = reading
            .distance()
            .is_some_and(|d| d < self.config.distance_search);

        if self.queue.is_empty() {
            if in_range {
                self.queue.push_back(reading);
            }
            return Ok(None);
        }

        if !in_range {
            if !self.turn_points.is_empty() {
                log::debug!(
                    "SpaceDetector[{}]: out of range at {} turn points, cycle abandoned",
                    self.sensor,
                    self.turn_points.len()
                );
            }
            self.reset();
            return Ok(None);
        }

        self.queue.push_back(reading);
        let front = self.queue[0];
        let back = self.queue[self.queue.len() - 1];
        let trend = Trend::classify(range_of(&front), range_of(&back), self.config.range_diff);

        let mut space = None;
        match self.turn_points.len() {
            0 => match trend {
                Trend::Rising => {}
                Trend::Falling => self.start_cycle(back),
                Trend::Stable => self.start_cycle(front),
            },
            1 => match trend {
                Trend::Rising => self.push_turn_point(front),
                Trend::Falling => {
                    self.turn_points.clear();
                    self.start_cycle(back);
                }
                Trend::Stable => {
                    self.distance_min = self.distance_min.min(range_of(&back));
                }
            },
            2 => {
                self.classify_obstacle();
                match trend {
                    Trend::Rising => {}
                    Trend::Falling => {
                        // Obstacle right after the edge: zero-width straddle
                        self.push_turn_point(front);
                        self.push_turn_point(front);
                    }
                    Trend::Stable => self.push_turn_point(front),
                }
            }
            3 => {
                if trend == Trend::Falling {
                    self.push_turn_point(front);
                }
            }
            4 => {
                if trend == Trend::Stable {
                    self.push_turn_point(front);
                }
            }
            5 => {
                self.push_turn_point(front);
                space = self.close_cycle(reading.timestamp_us);
                self.queue.pop_front();
            }
            _ => {}
        }

        self.queue.pop_front();
        Ok(space)
    }

    /// Abandon the current cycle and empty the queue
    pub fn reset(&mut self) {
        self.queue.clear();
        self.clear_cycle();
    }

    fn clear_cycle(&mut self) {
        self.turn_points.clear();
        self.distance_min = f32::INFINITY;
        self.stop_obstacle.reset();
        self.stop_gap.reset();
        self.obstacle_length = None;
        self.candidate = None;
    }

    fn start_cycle(&mut self, first: RangeReading) {
        self.distance_min = range_of(&first);
        self.push_turn_point(first);
    }

    fn push_turn_point(&mut self, point: RangeReading) {
        if self.turn_points.len() >= MAX_TURN_POINTS {
            return;
        }
        self.turn_points.push(point);
        log::trace!(
            "SpaceDetector[{}]: turn point {} at {}us, range={:.1}",
            self.sensor,
            self.turn_points.len() - 1,
            point.timestamp_us,
            range_of(&point)
        );
    }

    /// Measure the obstacle between turn points 0 and 1 and derive the
    /// candidate kind from it. Measured once per cycle.
    fn classify_obstacle(&mut self) {
        if self.obstacle_length.is_some() {
            return;
        }

        let elapsed = elapsed_secs(&self.turn_points[0], &self.turn_points[1]);
        let length = self.speed * (elapsed - self.stop_obstacle.take());
        self.obstacle_length = Some(length);

        let c = &self.config;
        if length > c.car_width && length < c.perpendicular_width {
            self.candidate = Some(SpaceKind::Perpendicular);
        } else if length > c.car_length && length < c.parallel_width {
            self.candidate = Some(SpaceKind::Parallel);
        }

        log::debug!(
            "SpaceDetector[{}]: obstacle length {:.1}, candidate {:?}",
            self.sensor,
            length,
            self.candidate
        );
    }

    /// Measure the gap bounded by turn points 3..=5 and classify it.
    fn close_cycle(&mut self, timestamp_us: u64) -> Option<DetectedSpace> {
        let tp = &self.turn_points;
        let elapsed = elapsed_secs(&tp[3], &tp[4]);
        let width = self.speed * (elapsed - self.stop_gap.take());
        let length = range_of(&tp[3]).min(range_of(&tp[4]))
            - self.distance_min.min(range_of(&tp[5]));

        let c = &self.config;
        let fits_perpendicular = width > c.perpendicular_width && length > c.perpendicular_length;
        let fits_parallel = width > c.parallel_width && length > c.parallel_length;

        self.cycles_completed += 1;

        let space = if fits_perpendicular || fits_parallel {
            let mut kind = self.candidate;
            if width < c.parallel_width {
                kind = Some(SpaceKind::Perpendicular);
            }
            if length < c.perpendicular_length {
                kind = Some(SpaceKind::Parallel);
            }
            let kind = kind.unwrap_or(if fits_perpendicular {
                SpaceKind::Perpendicular
            } else {
                SpaceKind::Parallel
            });

            log::info!(
                "SpaceDetector[{}]: {:?} space on the {:?} side, width={:.1}, length={:.1}",
                self.sensor,
                kind,
                self.side,
                width,
                length
            );

            Some(DetectedSpace {
                kind,
                side: self.side,
                width,
                length,
                valid: true,
                timestamp_us,
            })
        } else {
            log::debug!(
                "SpaceDetector[{}]: gap rejected, width={:.1}, length={:.1}",
                self.sensor,
                width,
                length
            );
            None
        };

        self.clear_cycle();
        space
    }
}

/// Distance of a queued reading. Queued readings are always valid.
#[inline]
fn range_of(reading: &RangeReading) -> f32 {
    reading.distance().unwrap_or(f32::INFINITY)
}

#[inline]
fn elapsed_secs(from: &RangeReading, to: &RangeReading) -> f32 {
    (to.timestamp_us as f64 - from.timestamp_us as f64) as f32 / 1e6
}
