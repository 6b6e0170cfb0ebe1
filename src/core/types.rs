//! Core data types for readings, parking spaces and actuation.
//!
//! Key types:
//! - [`RangeReading`] / [`SpeedReading`]: inbound sensor samples
//! - [`DetectedSpace`]: outcome of a completed detection cycle
//! - [`MoveCommand`] / [`TurnCommand`]: outbound actuation intents

use crate::core::sensor::SensorId;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Side of the vehicle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Left,
    Right,
}

impl Side {
    /// The mirrored side
    #[inline]
    pub fn opposite(self) -> Side {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }
}

impl FromStr for Side {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "left" | "l" => Ok(Side::Left),
            "right" | "r" => Ok(Side::Right),
            _ => Err(Error::InvalidParameter(format!("unknown side '{}'", s))),
        }
    }
}

/// Parking geometry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpaceKind {
    Perpendicular,
    Parallel,
}

impl FromStr for SpaceKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "perpendicular" | "perp" => Ok(SpaceKind::Perpendicular),
            "parallel" | "par" => Ok(SpaceKind::Parallel),
            _ => Err(Error::InvalidParameter(format!("unknown space kind '{}'", s))),
        }
    }
}

/// One range measurement from one sensor.
///
/// An invalid reading (no echo, sensor fault) carries no distance and is
/// distinct from a valid reading of zero.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RangeReading {
    pub sensor_id: SensorId,
    /// Sample time in microseconds
    pub timestamp_us: u64,
    distance: Option<f32>,
}

impl RangeReading {
    /// Create a reading. Negative or non-finite distances are tagged invalid.
    pub fn new(sensor_id: SensorId, timestamp_us: u64, distance: f32) -> Self {
        let distance = (distance.is_finite() && distance >= 0.0).then_some(distance);
        Self {
            sensor_id,
            timestamp_us,
            distance,
        }
    }

    /// Create a reading explicitly tagged invalid
    pub fn invalid(sensor_id: SensorId, timestamp_us: u64) -> Self {
        Self {
            sensor_id,
            timestamp_us,
            distance: None,
        }
    }

    /// Measured distance, `None` when the reading is invalid
    #[inline]
    pub fn distance(&self) -> Option<f32> {
        self.distance
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        self.distance.is_some()
    }
}

/// Signed vehicle speed. Positive = forward, negative = reverse.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpeedReading {
    /// Sample time in microseconds
    pub timestamp_us: u64,
    pub speed: f32,
}

impl SpeedReading {
    pub fn new(timestamp_us: u64, speed: f32) -> Self {
        Self {
            timestamp_us,
            speed,
        }
    }

    #[inline]
    pub fn is_stopped(&self) -> bool {
        self.speed == 0.0
    }
}

/// Parking space classified at the end of a detection cycle
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DetectedSpace {
    pub kind: SpaceKind,
    pub side: Side,
    /// Extent along the driving direction
    pub width: f32,
    /// Depth away from the vehicle
    pub length: f32,
    pub valid: bool,
    /// Time of classification in microseconds
    pub timestamp_us: u64,
}

impl DetectedSpace {
    /// Compact selection code of this space
    pub fn code(&self) -> SpaceCode {
        SpaceCode::new(self.kind, self.side)
    }
}

/// Bit-packed `{kind, side}` selection as carried on the space topic.
///
/// ```text
/// bit 0: perpendicular
/// bit 1: parallel
/// bit 2: right side
/// bit 3: left side
/// ```
///
/// Zero means "no space chosen".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct SpaceCode(pub u32);

impl SpaceCode {
    const PERPENDICULAR: u32 = 1 << 0;
    const PARALLEL: u32 = 1 << 1;
    const RIGHT: u32 = 1 << 2;
    const LEFT: u32 = 1 << 3;

    pub fn new(kind: SpaceKind, side: Side) -> Self {
        let kind_bit = match kind {
            SpaceKind::Perpendicular => Self::PERPENDICULAR,
            SpaceKind::Parallel => Self::PARALLEL,
        };
        let side_bit = match side {
            Side::Right => Self::RIGHT,
            Side::Left => Self::LEFT,
        };
        Self(kind_bit | side_bit)
    }

    #[inline]
    pub fn is_none(&self) -> bool {
        self.0 == 0
    }

    /// Decode into a maneuver selection.
    ///
    /// Exactly one kind bit and one side bit must be set.
    pub fn decode(&self) -> Result<(SpaceKind, Side)> {
        let kind = match self.0 & (Self::PERPENDICULAR | Self::PARALLEL) {
            Self::PERPENDICULAR => SpaceKind::Perpendicular,
            Self::PARALLEL => SpaceKind::Parallel,
            _ => {
                return Err(Error::InvalidParameter(format!(
                    "space code {:#06b} has no unique kind",
                    self.0
                )));
            }
        };
        let side = match self.0 & (Self::RIGHT | Self::LEFT) {
            Self::RIGHT => Side::Right,
            Self::LEFT => Side::Left,
            _ => {
                return Err(Error::InvalidParameter(format!(
                    "space code {:#06b} has no unique side",
                    self.0
                )));
            }
        };
        Ok((kind, side))
    }
}

/// Continuous throttle command. Positive = forward, negative = reverse, 0 = stop.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MoveCommand(pub f32);

impl MoveCommand {
    pub const STOP: MoveCommand = MoveCommand(0.0);

    #[inline]
    pub fn throttle(&self) -> f32 {
        self.0
    }

    #[inline]
    pub fn is_stop(&self) -> bool {
        self.0 == 0.0
    }

    #[inline]
    pub fn is_forward(&self) -> bool {
        self.0 > 0.0
    }

    #[inline]
    pub fn is_reverse(&self) -> bool {
        self.0 < 0.0
    }
}

/// Discrete steering command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnCommand {
    FullLeft,
    SlightLeft,
    #[default]
    Straight,
    SlightRight,
    FullRight,
}

impl TurnCommand {
    /// Full steering lock toward `side`
    pub fn full(side: Side) -> Self {
        match side {
            Side::Left => TurnCommand::FullLeft,
            Side::Right => TurnCommand::FullRight,
        }
    }

    /// Slight steering toward `side`
    pub fn slight(side: Side) -> Self {
        match side {
            Side::Left => TurnCommand::SlightLeft,
            Side::Right => TurnCommand::SlightRight,
        }
    }

    /// Wire symbol used by steering actuators
    pub fn as_char(self) -> char {
        match self {
            TurnCommand::FullLeft => 'L',
            TurnCommand::SlightLeft => 'l',
            TurnCommand::Straight => 'D',
            TurnCommand::SlightRight => 'r',
            TurnCommand::FullRight => 'R',
        }
    }

    pub fn from_char(c: char) -> Option<Self> {
        match c {
            'L' => Some(TurnCommand::FullLeft),
            'l' => Some(TurnCommand::SlightLeft),
            'D' => Some(TurnCommand::Straight),
            'r' => Some(TurnCommand::SlightRight),
            'R' => Some(TurnCommand::FullRight),
            _ => None,
        }
    }
}

impl fmt::Display for TurnCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// One actuation intent, in the order it must reach the actuators
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActuationCommand {
    Move(MoveCommand),
    Turn(TurnCommand),
}

impl From<MoveCommand> for ActuationCommand {
    fn from(cmd: MoveCommand) -> Self {
        ActuationCommand::Move(cmd)
    }
}

impl From<TurnCommand> for ActuationCommand {
    fn from(turn: TurnCommand) -> Self {
        ActuationCommand::Turn(turn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_reading_distinct_from_zero() {
        let zero = RangeReading::new(SensorId::ApaRf, 0, 0.0);
        let invalid = RangeReading::invalid(SensorId::ApaRf, 0);
        assert_eq!(zero.distance(), Some(0.0));
        assert_eq!(invalid.distance(), None);
        assert!(!RangeReading::new(SensorId::ApaRf, 0, -1.0).is_valid());
        assert!(!RangeReading::new(SensorId::ApaRf, 0, f32::NAN).is_valid());
    }

    #[test]
    fn test_space_code_decode() {
        for kind in [SpaceKind::Perpendicular, SpaceKind::Parallel] {
            for side in [Side::Left, Side::Right] {
                let code = SpaceCode::new(kind, side);
                assert_eq!(code.decode().unwrap(), (kind, side));
            }
        }
        assert_eq!(SpaceCode::new(SpaceKind::Perpendicular, Side::Right).0, 0b0101);
        assert!(SpaceCode(0).is_none());
        assert!(SpaceCode(0b0111).decode().is_err());
        assert!(SpaceCode(0b1101).decode().is_err());
    }

    #[test]
    fn test_turn_symbols() {
        for turn in [
            TurnCommand::FullLeft,
            TurnCommand::SlightLeft,
            TurnCommand::Straight,
            TurnCommand::SlightRight,
            TurnCommand::FullRight,
        ] {
            assert_eq!(TurnCommand::from_char(turn.as_char()), Some(turn));
        }
        assert_eq!(TurnCommand::full(Side::Left.opposite()), TurnCommand::FullRight);
    }

    #[test]
    fn test_parse_selection() {
        assert_eq!("Right".parse::<Side>().unwrap(), Side::Right);
        assert_eq!(
            "parallel".parse::<SpaceKind>().unwrap(),
            SpaceKind::Parallel
        );
        assert!("diagonal".parse::<SpaceKind>().is_err());
    }
}
