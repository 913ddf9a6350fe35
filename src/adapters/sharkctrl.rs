//! RadioSHARK fin controller.
//!
//! Shells out to the `sharkctrl` binary. The fin has a blue and a red LED:
//! blue means idle, red means recording.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{describe_status, helper_command, render_command, DeviceController, DeviceError};

/// Brightness of the blue LED while idle
const IDLE_BLUE: &str = "63";

/// Radio band
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Band {
    Am,
    Fm,
}

/// Station the fin is tuned to before each capture
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Station {
    pub band: Band,

    /// kHz for AM, MHz for FM
    pub frequency: f32,
}

impl Default for Station {
    fn default() -> Self {
        Self {
            band: Band::Am,
            frequency: 810.0,
        }
    }
}

impl Station {
    /// `sharkctrl` arguments that tune to this station
    pub fn tune_args(&self) -> Vec<String> {
        let flag = match self.band {
            Band::Am => "-am",
            Band::Fm => "-fm",
        };
        vec![flag.to_string(), self.frequency.to_string()]
    }
}

impl fmt::Display for Station {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.band {
            Band::Am => write!(f, "AM {}", self.frequency),
            Band::Fm => write!(f, "FM {}", self.frequency),
        }
    }
}

/// Device controller backed by the `sharkctrl` CLI
pub struct SharkCtrl {
    /// Path to the sharkctrl binary (default: "sharkctrl")
    binary_path: String,

    /// Fin index when more than one fin is attached
    ctrl_addr: Option<String>,

    station: Station,
}

impl SharkCtrl {
    /// Create a controller for the fin at `ctrl_addr`
    pub fn new(station: Station, ctrl_addr: Option<String>) -> Self {
        Self {
            binary_path: "sharkctrl".to_string(),
            ctrl_addr,
            station,
        }
    }

    /// Use a custom sharkctrl binary
    pub fn with_binary_path(mut self, binary_path: impl Into<String>) -> Self {
        self.binary_path = binary_path.into();
        self
    }

    /// Tune to `station` without touching the indicator
    pub async fn tune(&self, station: Station) -> Result<(), DeviceError> {
        let args = station.tune_args();
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        self.sharkctrl(&args).await
    }

    /// Full argument vector for one invocation (fin address last)
    fn command_args(&self, args: &[&str]) -> Vec<String> {
        let mut argv: Vec<String> = args.iter().map(|a| a.to_string()).collect();
        if let Some(addr) = &self.ctrl_addr {
            argv.push(addr.clone());
        }
        argv
    }

    async fn sharkctrl(&self, args: &[&str]) -> Result<(), DeviceError> {
        let argv = self.command_args(args);
        debug!(command = %render_command(&self.binary_path, &argv), "Running sharkctrl");

        let status = helper_command(&self.binary_path)
            .args(&argv)
            .status()
            .await
            .map_err(|source| DeviceError::Spawn {
                program: self.binary_path.clone(),
                source,
            })?;

        if !status.success() {
            return Err(DeviceError::ExitStatus {
                command: render_command(&self.binary_path, &argv),
                status: describe_status(status),
            });
        }

        Ok(())
    }
}

#[async_trait]
impl DeviceController for SharkCtrl {
    fn name(&self) -> &str {
        "sharkctrl"
    }

    async fn arm(&self) -> Result<(), DeviceError> {
        self.tune(self.station).await
    }

    async fn indicate_active(&self) -> Result<(), DeviceError> {
        self.sharkctrl(&["-blue", "0"]).await?;
        self.sharkctrl(&["-red", "1"]).await
    }

    async fn indicate_idle(&self) -> Result<(), DeviceError> {
        self.sharkctrl(&["-red", "0"]).await?;
        self.sharkctrl(&["-blue", IDLE_BLUE]).await
    }
}
