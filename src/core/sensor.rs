//! Range sensor identifiers.
//!
//! The vehicle carries two families of range sensors:
//!
//! ```text
//!            upa_fl  upa_fcl  upa_fcr  upa_fr
//!          ┌──────────────────────────────────┐
//!   apa_lf │                                  │ apa_rf
//!          │                                  │
//!   apa_lb2│                                  │ apa_rb2
//!   apa_lb │                                  │ apa_rb
//!          └──────────────────────────────────┘
//!            upa_bl  upa_bcl  upa_bcr  upa_br
//! ```
//!
//! - `apa_*`: side-looking long range sensors (front, rear, second rear)
//! - `upa_*`: short range ultrasonic sensors on the bumpers (corners and centres)

use crate::core::types::Side;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Number of range sensors on the vehicle
pub const SENSOR_COUNT: usize = 14;

/// Physical range sensor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorId {
    ApaLf,
    ApaLb,
    ApaLb2,
    ApaRf,
    ApaRb,
    ApaRb2,
    UpaFl,
    UpaFcl,
    UpaFcr,
    UpaFr,
    UpaBl,
    UpaBcl,
    UpaBcr,
    UpaBr,
}

impl SensorId {
    /// All sensors in storage order
    pub const ALL: [SensorId; SENSOR_COUNT] = [
        SensorId::ApaLf,
        SensorId::ApaLb,
        SensorId::ApaLb2,
        SensorId::ApaRf,
        SensorId::ApaRb,
        SensorId::ApaRb2,
        SensorId::UpaFl,
        SensorId::UpaFcl,
        SensorId::UpaFcr,
        SensorId::UpaFr,
        SensorId::UpaBl,
        SensorId::UpaBcl,
        SensorId::UpaBcr,
        SensorId::UpaBr,
    ];

    /// Index into per-sensor storage
    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Wire name of the sensor channel
    pub fn as_str(self) -> &'static str {
        match self {
            SensorId::ApaLf => "apa_lf",
            SensorId::ApaLb => "apa_lb",
            SensorId::ApaLb2 => "apa_lb2",
            SensorId::ApaRf => "apa_rf",
            SensorId::ApaRb => "apa_rb",
            SensorId::ApaRb2 => "apa_rb2",
            SensorId::UpaFl => "upa_fl",
            SensorId::UpaFcl => "upa_fcl",
            SensorId::UpaFcr => "upa_fcr",
            SensorId::UpaFr => "upa_fr",
            SensorId::UpaBl => "upa_bl",
            SensorId::UpaBcl => "upa_bcl",
            SensorId::UpaBcr => "upa_bcr",
            SensorId::UpaBr => "upa_br",
        }
    }

    /// Side-looking front sensor used for space search on `side`
    pub fn search_sensor(side: Side) -> SensorId {
        match side {
            Side::Left => SensorId::ApaLf,
            Side::Right => SensorId::ApaRf,
        }
    }
}

impl fmt::Display for SensorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SensorId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        SensorId::ALL
            .iter()
            .copied()
            .find(|id| id.as_str() == s)
            .ok_or_else(|| Error::InvalidParameter(format!("unknown sensor '{}'", s)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_matches_storage_order() {
        for (i, id) in SensorId::ALL.iter().enumerate() {
            assert_eq!(id.index(), i);
        }
    }

    #[test]
    fn test_parse_names() {
        for id in SensorId::ALL {
            assert_eq!(id.as_str().parse::<SensorId>().unwrap(), id);
        }
        assert!("apa_xx".parse::<SensorId>().is_err());
    }

    #[test]
    fn test_serde_uses_wire_names() {
        let json = serde_json::to_string(&SensorId::UpaBcr).unwrap();
        assert_eq!(json, "\"upa_bcr\"");
    }
}
