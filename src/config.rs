//! Configuration loading for autopark
//!
//! All thresholds used by detection and maneuver control come from a TOML
//! file; every field has a default so partial files are accepted.
//!
//! Distances are in centimetres, speeds in centimetres per second.

use crate::detection::DetectorConfig;
use crate::error::{Error, Result};
use crate::maneuver::ManeuverConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Top-level application configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub detection: DetectionSection,
    #[serde(default)]
    pub geometry: GeometrySection,
    #[serde(default)]
    pub parking: ParkingSection,
    #[serde(default)]
    pub control: ControlSection,
    #[serde(default)]
    pub logging: LoggingSection,
}

/// Turn point detection settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DetectionSection {
    /// Range difference that separates a rising/falling edge from noise
    #[serde(default = "default_range_diff")]
    pub range_diff: f32,

    /// Maximum relevant range; farther readings end the detection cycle
    #[serde(default = "default_distance_search")]
    pub distance_search: f32,

    /// Number of detected spaces kept in memory for selection
    #[serde(default = "default_candidate_capacity")]
    pub candidate_capacity: usize,
}

/// Space and vehicle dimensions
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GeometrySection {
    /// Minimum width of a parallel parking space
    #[serde(default = "default_parallel_width")]
    pub parallel_width: f32,
    /// Minimum length (depth) of a parallel parking space
    #[serde(default = "default_parallel_length")]
    pub parallel_length: f32,
    /// Minimum width of a perpendicular parking space
    #[serde(default = "default_perpendicular_width")]
    pub perpendicular_width: f32,
    /// Minimum length (depth) of a perpendicular parking space
    #[serde(default = "default_perpendicular_length")]
    pub perpendicular_length: f32,
    /// Minimum width of a car
    #[serde(default = "default_car_width")]
    pub car_width: f32,
    /// Minimum length of a car
    #[serde(default = "default_car_length")]
    pub car_length: f32,
}

/// Maneuver distances and speeds
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ParkingSection {
    /// Closest allowed distance to any obstacle
    #[serde(default = "default_parking_distance_min")]
    pub parking_distance_min: f32,
    /// Side distance below which the car rear is inside the space
    #[serde(default = "default_parking_distance_max")]
    pub parking_distance_max: f32,
    /// Allowed difference between the two rear side sensors
    #[serde(default = "default_apa_tolerance")]
    pub apa_tolerance: f32,
    /// Forward throttle (positive)
    #[serde(default = "default_speed_parking_forward")]
    pub speed_parking_forward: f32,
    /// Reverse throttle (negative)
    #[serde(default = "default_speed_parking_backward")]
    pub speed_parking_backward: f32,
    /// Distance driven forward before reversing into a perpendicular space
    #[serde(default = "default_move_distance_perpendicular")]
    pub move_distance_perpendicular: f32,
}

/// What the caller does once the maneuver deadline passes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeoutPolicy {
    /// Keep controlling; the timeout is only reported
    #[default]
    Continue,
    /// Stop the vehicle and discard the maneuver
    Abort,
}

/// Control loop settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ControlSection {
    /// Maneuver control rate
    #[serde(default = "default_rate_hz")]
    pub rate_hz: f32,
    /// Maneuver deadline
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: f32,
    #[serde(default)]
    pub timeout_policy: TimeoutPolicy,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingSection {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

// Default value functions
fn default_range_diff() -> f32 {
    30.0
}
fn default_distance_search() -> f32 {
    600.0
}
fn default_candidate_capacity() -> usize {
    8
}
fn default_parallel_width() -> f32 {
    550.0
}
fn default_parallel_length() -> f32 {
    200.0
}
fn default_perpendicular_width() -> f32 {
    250.0
}
fn default_perpendicular_length() -> f32 {
    450.0
}
fn default_car_width() -> f32 {
    160.0
}
fn default_car_length() -> f32 {
    380.0
}
fn default_parking_distance_min() -> f32 {
    30.0
}
fn default_parking_distance_max() -> f32 {
    100.0
}
fn default_apa_tolerance() -> f32 {
    5.0
}
fn default_speed_parking_forward() -> f32 {
    30.0
}
fn default_speed_parking_backward() -> f32 {
    -30.0
}
fn default_move_distance_perpendicular() -> f32 {
    150.0
}
fn default_rate_hz() -> f32 {
    20.0
}
fn default_timeout_secs() -> f32 {
    60.0
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for DetectionSection {
    fn default() -> Self {
        Self {
            range_diff: default_range_diff(),
            distance_search: default_distance_search(),
            candidate_capacity: default_candidate_capacity(),
        }
    }
}

impl Default for GeometrySection {
    fn default() -> Self {
        Self {
            parallel_width: default_parallel_width(),
            parallel_length: default_parallel_length(),
            perpendicular_width: default_perpendicular_width(),
            perpendicular_length: default_perpendicular_length(),
            car_width: default_car_width(),
            car_length: default_car_length(),
        }
    }
}

impl Default for ParkingSection {
    fn default() -> Self {
        Self {
            parking_distance_min: default_parking_distance_min(),
            parking_distance_max: default_parking_distance_max(),
            apa_tolerance: default_apa_tolerance(),
            speed_parking_forward: default_speed_parking_forward(),
            speed_parking_backward: default_speed_parking_backward(),
            move_distance_perpendicular: default_move_distance_perpendicular(),
        }
    }
}

impl Default for ControlSection {
    fn default() -> Self {
        Self {
            rate_hz: default_rate_hz(),
            timeout_secs: default_timeout_secs(),
            timeout_policy: TimeoutPolicy::default(),
        }
    }
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl AppConfig {
    /// Load and validate configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            Error::Config(format!(
                "Failed to read config file {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Reject values the detector or controller cannot work with
    pub fn validate(&self) -> Result<()> {
        let d = &self.detection;
        let g = &self.geometry;
        let p = &self.parking;
        let c = &self.control;

        let positive = [
            ("detection.range_diff", d.range_diff),
            ("detection.distance_search", d.distance_search),
            ("geometry.parallel_width", g.parallel_width),
            ("geometry.parallel_length", g.parallel_length),
            ("geometry.perpendicular_width", g.perpendicular_width),
            ("geometry.perpendicular_length", g.perpendicular_length),
            ("geometry.car_width", g.car_width),
            ("geometry.car_length", g.car_length),
            ("parking.parking_distance_min", p.parking_distance_min),
            ("parking.apa_tolerance", p.apa_tolerance),
            ("parking.speed_parking_forward", p.speed_parking_forward),
            (
                "parking.move_distance_perpendicular",
                p.move_distance_perpendicular,
            ),
            ("control.rate_hz", c.rate_hz),
            ("control.timeout_secs", c.timeout_secs),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(Error::Config(format!(
                    "{} must be positive, got {}",
                    name, value
                )));
            }
        }

        if !(p.speed_parking_backward.is_finite() && p.speed_parking_backward < 0.0) {
            return Err(Error::Config(format!(
                "parking.speed_parking_backward must be negative, got {}",
                p.speed_parking_backward
            )));
        }
        if p.parking_distance_min >= p.parking_distance_max {
            return Err(Error::Config(format!(
                "parking.parking_distance_min ({}) must be below parking_distance_max ({})",
                p.parking_distance_min, p.parking_distance_max
            )));
        }
        Duration::try_from_secs_f32(c.timeout_secs).map_err(|e| {
            Error::Config(format!(
                "control.timeout_secs {} is out of range: {}",
                c.timeout_secs, e
            ))
        })?;
        let period = Duration::try_from_secs_f32(1.0 / c.rate_hz).map_err(|e| {
            Error::Config(format!("control.rate_hz {} is out of range: {}", c.rate_hz, e))
        })?;
        if period.is_zero() {
            return Err(Error::Config(format!(
                "control.rate_hz {} gives a zero control period",
                c.rate_hz
            )));
        }

        if d.candidate_capacity == 0 {
            return Err(Error::Config(
                "detection.candidate_capacity must be at least 1".to_string(),
            ));
        }

        Ok(())
    }

    /// Detector settings for one space-detection engine
    pub fn detector_config(&self) -> DetectorConfig {
        DetectorConfig {
            range_diff: self.detection.range_diff,
            distance_search: self.detection.distance_search,
            parallel_width: self.geometry.parallel_width,
            parallel_length: self.geometry.parallel_length,
            perpendicular_width: self.geometry.perpendicular_width,
            perpendicular_length: self.geometry.perpendicular_length,
            car_width: self.geometry.car_width,
            car_length: self.geometry.car_length,
        }
    }

    /// Controller settings for the maneuver state machine
    pub fn maneuver_config(&self) -> ManeuverConfig {
        ManeuverConfig {
            parking_distance_min: self.parking.parking_distance_min,
            parking_distance_max: self.parking.parking_distance_max,
            apa_tolerance: self.parking.apa_tolerance,
            speed_parking_forward: self.parking.speed_parking_forward,
            speed_parking_backward: self.parking.speed_parking_backward,
            move_distance_perpendicular: self.parking.move_distance_perpendicular,
            parallel_length: self.geometry.parallel_length,
            timeout: Duration::from_secs_f32(self.control.timeout_secs),
        }
    }

    /// Period between control ticks
    pub fn control_period(&self) -> Duration {
        Duration::from_secs_f32(1.0 / self.control.rate_hz)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.control.timeout_policy, TimeoutPolicy::Continue);
        assert_eq!(config.control_period(), Duration::from_millis(50));
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let toml_content = r#"
[detection]
range_diff = 5.0

[parking]
apa_tolerance = 2.5

[control]
timeout_policy = "abort"
"#;
        let config = AppConfig::from_toml(toml_content).unwrap();
        assert_eq!(config.detection.range_diff, 5.0);
        assert_eq!(config.detection.distance_search, 600.0);
        assert_eq!(config.parking.apa_tolerance, 2.5);
        assert_eq!(config.control.timeout_policy, TimeoutPolicy::Abort);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_toml_serialization() {
        let config = AppConfig::default();
        let toml_string = toml::to_string_pretty(&config).unwrap();

        assert!(toml_string.contains("[detection]"));
        assert!(toml_string.contains("[geometry]"));
        assert!(toml_string.contains("[parking]"));
        assert!(toml_string.contains("[control]"));
        assert!(toml_string.contains("speed_parking_backward = -30.0"));
    }

    #[test]
    fn test_rejects_positive_backward_speed() {
        let toml_content = r#"
[parking]
speed_parking_backward = 10.0
"#;
        let err = AppConfig::from_toml(toml_content).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_rejects_inverted_distances() {
        let mut config = AppConfig::default();
        config.parking.parking_distance_min = 120.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_zero_rate() {
        let mut config = AppConfig::default();
        config.control.rate_hz = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_unrepresentable_durations() {
        let err = AppConfig::from_toml("[control]\ntimeout_secs = 1e20\n").unwrap_err();
        assert!(matches!(err, Error::Config(_)));

        let err = AppConfig::from_toml("[control]\nrate_hz = 1e-30\n").unwrap_err();
        assert!(matches!(err, Error::Config(_)));

        let err = AppConfig::from_toml("[control]\nrate_hz = 1e30\n").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_maneuver_config_mapping() {
        let config = AppConfig::default();
        let maneuver = config.maneuver_config();
        assert_eq!(maneuver.timeout, Duration::from_secs(60));
        assert_eq!(maneuver.parallel_length, config.geometry.parallel_length);
    }
}
