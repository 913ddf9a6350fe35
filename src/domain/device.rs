//! Observable state of the controlled radio hardware.

use serde::{Deserialize, Serialize};

/// State of the radio fin as driven by a device controller.
///
/// `Active` must only ever be set while a capture is in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceState {
    /// Not recording, idle indicator lit
    Idle,

    /// Tuned to the station, ready to record
    Armed,

    /// Capturing, recording indicator lit
    Active,
}

impl Default for DeviceState {
    fn default() -> Self {
        Self::Idle
    }
}

impl std::fmt::Display for DeviceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Armed => write!(f, "armed"),
            Self::Active => write!(f, "active"),
        }
    }
}
