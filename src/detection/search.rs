//! Space search across both side-looking sensors.
//!
//! One [`SpaceDetector`] per side, each behind its own lock so that sensor
//! callbacks on different threads never share an engine. The search is
//! gated by an enable flag: readings arriving while disabled are dropped,
//! and re-enabling starts every engine from a clean cycle.
//!
//! Published spaces are kept in a [`CandidateBuffer`] and forwarded to an
//! optional crossbeam channel for an external selector.

use super::candidates::CandidateBuffer;
use super::detector::{DetectorConfig, SpaceDetector};
use crate::core::sensor::SensorId;
use crate::core::types::{DetectedSpace, RangeReading, Side, SpaceCode, SpeedReading};
use crate::error::{Error, Result};
use crossbeam_channel::{Sender, TrySendError};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

/// Detection front-end owning the left and right engines
pub struct SpaceSearch {
    left: Mutex<SpaceDetector>,
    right: Mutex<SpaceDetector>,
    enabled: AtomicBool,
    candidates: Mutex<CandidateBuffer>,
    output: Option<Sender<DetectedSpace>>,
}

impl SpaceSearch {
    pub fn new(config: DetectorConfig, capacity: usize) -> Self {
        Self {
            left: Mutex::new(SpaceDetector::for_side(Side::Left, config.clone())),
            right: Mutex::new(SpaceDetector::for_side(Side::Right, config)),
            enabled: AtomicBool::new(false),
            candidates: Mutex::new(CandidateBuffer::new(capacity)),
            output: None,
        }
    }

    /// Forward every published space to `tx`
    pub fn with_output(mut self, tx: Sender<DetectedSpace>) -> Self {
        self.output = Some(tx);
        self
    }

    /// Start searching from a clean cycle on both sides
    pub fn enable(&self) {
        self.left.lock().reset();
        self.right.lock().reset();
        if !self.enabled.swap(true, Ordering::AcqRel) {
            log::info!("Space search enabled");
        }
    }

    /// Stop searching; incoming readings are dropped
    pub fn disable(&self) {
        if self.enabled.swap(false, Ordering::AcqRel) {
            log::info!("Space search disabled");
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    /// Route a range reading to the engine owning its sensor.
    ///
    /// Readings from sensors that no engine watches are ignored.
    pub fn on_range(&self, reading: RangeReading) -> Result<Option<DetectedSpace>> {
        if !self.is_enabled() {
            return Ok(None);
        }

        let engine = match reading.sensor_id {
            id if id == SensorId::search_sensor(Side::Left) => &self.left,
            id if id == SensorId::search_sensor(Side::Right) => &self.right,
            _ => return Ok(None),
        };

        let space = engine.lock().on_range(reading)?;
        if let Some(space) = space {
            self.publish(space);
        }
        Ok(space)
    }

    /// Feed a speed sample to both engines
    pub fn on_speed(&self, reading: SpeedReading) {
        if !self.is_enabled() {
            return;
        }
        self.left.lock().on_speed(reading);
        self.right.lock().on_speed(reading);
    }

    /// Snapshot of buffered spaces, oldest first
    pub fn candidates(&self) -> Vec<DetectedSpace> {
        self.candidates.lock().to_vec()
    }

    /// Most recently buffered space
    pub fn latest(&self) -> Option<DetectedSpace> {
        self.candidates.lock().latest().copied()
    }

    /// Pick the most recent buffered space for a selection code
    pub fn select(&self, code: SpaceCode) -> Result<DetectedSpace> {
        code.decode()?;
        let candidates = self.candidates.lock();
        if candidates.is_empty() {
            return Err(Error::InvalidParameter(
                "no space has been detected yet".to_string(),
            ));
        }
        candidates.find(code).copied().ok_or_else(|| {
            Error::InvalidParameter(format!("no candidate space for code {:#06b}", code.0))
        })
    }

    /// Turn-point count of the engine on `side`
    pub fn turn_point_count(&self, side: Side) -> usize {
        match side {
            Side::Left => self.left.lock().turn_point_count(),
            Side::Right => self.right.lock().turn_point_count(),
        }
    }

    fn publish(&self, space: DetectedSpace) {
        self.candidates.lock().push(space);

        if let Some(tx) = &self.output {
            match tx.try_send(space) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    log::warn!("Space output channel full, dropping {:?}", space.code());
                }
                Err(TrySendError::Disconnected(_)) => {
                    log::warn!("Space output channel disconnected");
                }
            }
        }
    }
}
