//! Core abstractions shared by detection and maneuver control.
//!
//! - [`types`]: Readings, detected spaces and actuation commands
//! - [`sensor`]: Identifiers of the ring of range sensors
//! - [`clock`]: Injectable time source for control loops

pub mod clock;
pub mod sensor;
pub mod types;
