use serde::{Serialize, Deserialize};
use std::fmt;
use std::str::FromStr;

use crate::error::TrainError;

/// Compute context a run is placed on.
///
/// Passed explicitly to model construction, batch transfer and optimizer
/// construction. Only the host CPU is backed by an implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Device {
    #[default]
    Cpu,
}

impl Device {
    /// The best device present on this machine.
    pub fn best_available() -> Device {
        Device::Cpu
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Device::Cpu => write!(f, "cpu"),
        }
    }
}

/// Device selection as written in configuration: `auto` or a concrete device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceChoice {
    #[default]
    Auto,
    Cpu,
}

impl DeviceChoice {
    pub fn resolve(self) -> Device {
        match self {
            DeviceChoice::Auto => Device::best_available(),
            DeviceChoice::Cpu => Device::Cpu,
        }
    }
}

impl FromStr for DeviceChoice {
    type Err = TrainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(DeviceChoice::Auto),
            "cpu" => Ok(DeviceChoice::Cpu),
            other => Err(TrainError::Config(format!("unknown device '{other}'"))),
        }
    }
}
