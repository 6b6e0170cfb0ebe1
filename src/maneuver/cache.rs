//! Last-known value of every ring sensor.
//!
//! Sensor callbacks write, the control loop reads. Each channel is a single
//! atomic cell so writers never contend with each other or with the reader.

use crate::core::sensor::{SENSOR_COUNT, SensorId};
use crate::core::types::{RangeReading, SpeedReading};
use std::sync::atomic::{AtomicU32, Ordering};

/// Atomic wrapper for f32 values.
/// Uses AtomicU32 with bit reinterpretation.
#[derive(Debug)]
pub struct AtomicF32(AtomicU32);

impl AtomicF32 {
    pub fn new(val: f32) -> Self {
        Self(AtomicU32::new(val.to_bits()))
    }

    pub fn load(&self, order: Ordering) -> f32 {
        f32::from_bits(self.0.load(order))
    }

    pub fn store(&self, val: f32, order: Ordering) {
        self.0.store(val.to_bits(), order);
    }
}

/// Last-write-wins cache of ring distances and vehicle speed.
///
/// Channels with no reading yet, or whose latest reading was invalid, read
/// as `f32::INFINITY`: nothing is close.
#[derive(Debug)]
pub struct SensorCache {
    distances: [AtomicF32; SENSOR_COUNT],
    speed: AtomicF32,
}

impl SensorCache {
    pub fn new() -> Self {
        Self {
            distances: std::array::from_fn(|_| AtomicF32::new(f32::INFINITY)),
            speed: AtomicF32::new(0.0),
        }
    }

    pub fn update_range(&self, reading: &RangeReading) {
        let value = reading.distance().unwrap_or(f32::INFINITY);
        self.distances[reading.sensor_id.index()].store(value, Ordering::Release);
    }

    pub fn update_speed(&self, reading: &SpeedReading) {
        self.speed.store(reading.speed, Ordering::Release);
    }

    pub fn distance(&self, id: SensorId) -> f32 {
        self.distances[id.index()].load(Ordering::Acquire)
    }

    pub fn speed(&self) -> f32 {
        self.speed.load(Ordering::Acquire)
    }

    /// Copy every channel for one control tick
    pub fn snapshot(&self) -> SensorSnapshot {
        SensorSnapshot {
            distances: std::array::from_fn(|i| self.distances[i].load(Ordering::Acquire)),
            speed: self.speed(),
        }
    }
}

impl Default for SensorCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Values of every channel as seen by one control tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorSnapshot {
    distances: [f32; SENSOR_COUNT],
    pub speed: f32,
}

impl SensorSnapshot {
    /// Snapshot with every channel clear and the vehicle stopped
    pub fn clear() -> Self {
        Self {
            distances: [f32::INFINITY; SENSOR_COUNT],
            speed: 0.0,
        }
    }

    #[inline]
    pub fn get(&self, id: SensorId) -> f32 {
        self.distances[id.index()]
    }

    pub fn set(&mut self, id: SensorId, distance: f32) {
        self.distances[id.index()] = distance;
    }

    pub fn with(mut self, id: SensorId, distance: f32) -> Self {
        self.set(id, distance);
        self
    }

    pub fn with_speed(mut self, speed: f32) -> Self {
        self.speed = speed;
        self
    }

    /// Smallest distance among `ids`
    pub fn min_of(&self, ids: &[SensorId]) -> f32 {
        ids.iter().map(|&id| self.get(id)).fold(f32::INFINITY, f32::min)
    }
}

impl Default for SensorSnapshot {
    fn default() -> Self {
        Self::clear()
    }
}
