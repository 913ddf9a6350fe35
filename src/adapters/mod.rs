//! Adapter interfaces for external systems.
//!
//! The scheduler never talks to hardware or spawns processes itself. It goes
//! through two seams:
//! - `DeviceController`: tunes the radio and flips its indicator light
//! - `RecordingAction`: captures one broadcast to a file

pub mod monitor;
pub mod recorder;
pub mod sharkctrl;

use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::process::Command;

use crate::domain::Event;

// Re-export the concrete adapters
pub use monitor::AlsaMonitor;
pub use recorder::{AlsaRecorder, Encoder, RecorderSettings};
pub use sharkctrl::{Band, SharkCtrl, Station};

/// A device controller call failed
#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("Failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{command}: unexpected exit status ({status})")]
    ExitStatus { command: String, status: String },

    #[error("Device unavailable: {0}")]
    Unavailable(String),
}

/// A capture could not be completed
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("Failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{command}: unexpected exit status ({status})")]
    ExitStatus { command: String, status: String },

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Capture failed: {0}")]
    Other(String),
}

/// Result of a finished capture
#[derive(Debug, Clone)]
pub struct CaptureReport {
    /// File the broadcast was written to
    pub output: PathBuf,

    /// Wall time spent capturing
    pub elapsed: Duration,
}

/// Drives the radio hardware between idle, armed and active.
///
/// Every call is idempotent; issuing `indicate_idle` on an idle device is
/// harmless.
#[async_trait]
pub trait DeviceController: Send + Sync {
    /// Human-readable controller name
    fn name(&self) -> &str;

    /// Tune to the configured station
    async fn arm(&self) -> Result<(), DeviceError>;

    /// Turn on the recording indicator
    async fn indicate_active(&self) -> Result<(), DeviceError>;

    /// Turn off the recording indicator
    async fn indicate_idle(&self) -> Result<(), DeviceError>;
}

/// Captures one broadcast, blocking until the capture finishes or fails
#[async_trait]
pub trait RecordingAction: Send + Sync {
    /// Human-readable action name
    fn name(&self) -> &str;

    /// Capture the broadcast for `event`
    async fn capture(&self, event: &Event) -> Result<CaptureReport, CaptureError>;
}

/// Describe a process exit status the way the console expects: the exit code
/// when there is one, otherwise the terminating signal
pub(crate) fn describe_status(status: ExitStatus) -> String {
    if let Some(code) = status.code() {
        return code.to_string();
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return format!("signal {}", signal);
        }
    }

    "unknown".to_string()
}

/// Command for a helper process (sharkctrl, arecord, encoders).
///
/// On unix the child leads its own process group, so a Ctrl-C typed at the
/// terminal reaches only the daemon. The daemon then decides what to stop.
pub(crate) fn helper_command(program: &str) -> Command {
    let mut command = Command::new(program);
    command.stdin(Stdio::null());
    #[cfg(unix)]
    command.process_group(0);
    command
}

/// Render a command line for error messages
pub(crate) fn render_command(program: &str, args: &[String]) -> String {
    if args.is_empty() {
        program.to_string()
    } else {
        format!("{} {}", program, args.join(" "))
    }
}
