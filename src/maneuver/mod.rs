//! Maneuver control: driving into a chosen parking space.

pub mod cache;
pub mod controller;
pub mod layout;
pub mod runner;

pub use cache::{SensorCache, SensorSnapshot};
pub use controller::{ControlOutput, ManeuverConfig, ManeuverController, ManeuverStatus, Phase};
pub use layout::SensorLayout;
pub use runner::{ManeuverHandle, ManeuverOutcome, ManeuverRunner};
