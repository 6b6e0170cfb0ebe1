//! Trace replay for recorded drives.
//!
//! A trace is a TOML file listing timestamped samples in arrival order:
//!
//! ```toml
//! description = "right side, one perpendicular gap"
//!
//! [[event]]
//! t_ms = 0
//! speed = 100.0
//!
//! [[event]]
//! t_ms = 0
//! sensor = "apa_rf"
//! distance = 100.0
//! ```
//!
//! A sensor event without `distance` is an invalid reading.

use crate::actuation::ActuationSink;
use crate::core::clock::ManualClock;
use crate::core::sensor::SensorId;
use crate::core::types::{DetectedSpace, RangeReading, Side, SpaceKind, SpeedReading};
use crate::detection::SpaceSearch;
use crate::error::{Error, Result};
use crate::maneuver::{ManeuverOutcome, ManeuverRunner, SensorCache};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// One recorded event
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct TraceEvent {
    /// Milliseconds since the start of the recording
    pub t_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sensor: Option<SensorId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed: Option<f32>,
}

/// Decoded sample
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Sample {
    Range(RangeReading),
    Speed(SpeedReading),
}

impl TraceEvent {
    pub fn range(t_ms: u64, sensor: SensorId, distance: f32) -> Self {
        Self {
            t_ms,
            sensor: Some(sensor),
            distance: Some(distance),
            speed: None,
        }
    }

    pub fn speed(t_ms: u64, speed: f32) -> Self {
        Self {
            t_ms,
            sensor: None,
            distance: None,
            speed: Some(speed),
        }
    }

    pub fn timestamp_us(&self) -> u64 {
        self.t_ms * 1000
    }

    /// Decode into a reading. Exactly one of `sensor` and `speed` must be set.
    pub fn sample(&self) -> Result<Sample> {
        let t = self.timestamp_us();
        match (self.sensor, self.speed) {
            (Some(sensor), None) => Ok(Sample::Range(match self.distance {
                Some(d) => RangeReading::new(sensor, t, d),
                None => RangeReading::invalid(sensor, t),
            })),
            (None, Some(speed)) if self.distance.is_none() => {
                Ok(Sample::Speed(SpeedReading::new(t, speed)))
            }
            _ => Err(Error::Replay(format!(
                "event at {}ms must carry either a sensor or a speed",
                self.t_ms
            ))),
        }
    }
}

/// A recorded drive
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Trace {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "event", default)]
    pub events: Vec<TraceEvent>,
}

impl Trace {
    /// Load and validate a trace file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let trace = Self::from_toml(&content)
            .map_err(|e| Error::Replay(format!("{}: {}", path.display(), e)))?;
        log::info!(
            "Loaded trace {} ({} events, {}ms)",
            path.display(),
            trace.events.len(),
            trace.duration_ms()
        );
        Ok(trace)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let trace: Trace = toml::from_str(content)?;
        trace.validate()?;
        Ok(trace)
    }

    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Events must be well formed and in time order
    pub fn validate(&self) -> Result<()> {
        let mut last = 0;
        for event in &self.events {
            if event.t_ms < last {
                return Err(Error::Replay(format!(
                    "event at {}ms follows event at {}ms",
                    event.t_ms, last
                )));
            }
            event.sample()?;
            last = event.t_ms;
        }
        Ok(())
    }

    /// Time of the last event
    pub fn duration_ms(&self) -> u64 {
        self.events.last().map_or(0, |e| e.t_ms)
    }

    pub fn samples(&self) -> Result<Vec<Sample>> {
        self.events.iter().map(TraceEvent::sample).collect()
    }
}

/// Feed a trace through a space search and collect every detected space.
///
/// The search is enabled first and left enabled.
pub fn replay_detection(trace: &Trace, search: &SpaceSearch) -> Result<Vec<DetectedSpace>> {
    search.enable();

    let mut spaces = Vec::new();
    for sample in trace.samples()? {
        match sample {
            Sample::Speed(reading) => search.on_speed(reading),
            Sample::Range(reading) => {
                if let Some(space) = search.on_range(reading)? {
                    spaces.push(space);
                }
            }
        }
    }

    log::info!("Replay found {} space(s)", spaces.len());
    Ok(spaces)
}

/// Run a maneuver against a trace on simulated time.
///
/// Before every tick, all events up to the current clock time are written
/// to `cache`, which must be the cache the runner reads. Once the trace is
/// exhausted the maneuver is aborted if it has not ended.
pub fn replay_maneuver<S: ActuationSink>(
    trace: &Trace,
    runner: &mut ManeuverRunner<S>,
    cache: &SensorCache,
    clock: &ManualClock,
    kind: SpaceKind,
    side: Side,
) -> Result<ManeuverOutcome> {
    let samples = trace.samples()?;
    let mut pending = samples.iter().peekable();
    let origin = clock.elapsed();
    let end = Duration::from_millis(trace.duration_ms());
    let period = runner.period();
    let handle = runner.handle();

    runner.start(kind, side)?;

    loop {
        let now = clock.elapsed().saturating_sub(origin);
        let now_us = now.as_micros() as u64;

        while let Some(sample) = pending.next_if(|s| sample_time_us(s) <= now_us) {
            match sample {
                Sample::Range(r) => cache.update_range(r),
                Sample::Speed(s) => cache.update_speed(s),
            }
        }

        if pending.peek().is_none() && now > end {
            log::warn!("Trace exhausted after {}ms, aborting maneuver", end.as_millis());
            handle.abort();
        }

        if let Some(outcome) = runner.step()? {
            return Ok(outcome);
        }

        clock.advance(period);
    }
}

fn sample_time_us(sample: &Sample) -> u64 {
    match sample {
        Sample::Range(r) => r.timestamp_us,
        Sample::Speed(s) => s.timestamp_us,
    }
}
