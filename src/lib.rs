//! autopark - parking space detection and parking maneuver control
//!
//! Two independent subsystems connected only through [`DetectedSpace`]:
//!
//! - [`detection`]: streaming turn-point classifier that turns one side
//!   sensor's range signal into parking space candidates
//! - [`maneuver`]: phase-based steering state machine that reverses the
//!   vehicle into a chosen space using the whole sensor ring
//!
//! [`replay`] feeds recorded drives through either subsystem.

pub mod actuation;
pub mod config;
pub mod core;
pub mod detection;
pub mod error;
pub mod maneuver;
pub mod replay;

// Re-export commonly used types
pub use config::AppConfig;
pub use crate::core::sensor::SensorId;
pub use crate::core::types::{
    ActuationCommand, DetectedSpace, MoveCommand, RangeReading, Side, SpaceCode, SpaceKind,
    SpeedReading, TurnCommand,
};
pub use error::{Error, Result};
