//! Interruption handling.
//!
//! Operator interrupts (Ctrl-C, SIGTERM) are turned into a [`CancellationToken`]
//! that the scheduler races against every wait. Whatever the scheduler was
//! doing when the signal arrived, the device is driven back to idle before the
//! run returns.

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::adapters::DeviceController;

/// What the scheduler was doing when it was interrupted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Waiting for the next trigger time
    Sleeping,

    /// Arming, capturing or restoring the device for an event
    Firing,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sleeping => write!(f, "sleeping"),
            Self::Firing => write!(f, "firing"),
        }
    }
}

/// Spawn a task that cancels `cancel` on Ctrl-C (and SIGTERM on unix)
pub fn listen_for_signals(cancel: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        match wait_for_signal().await {
            Ok(signal) => {
                info!(signal, "Interrupt received");
                cancel.cancel();
            }
            Err(e) => {
                warn!(error = %e, "Failed to install signal handlers");
            }
        }
    })
}

#[cfg(unix)]
async fn wait_for_signal() -> std::io::Result<&'static str> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = signal(SignalKind::terminate())?;
    tokio::select! {
        result = tokio::signal::ctrl_c() => result.map(|_| "SIGINT"),
        _ = terminate.recv() => Ok("SIGTERM"),
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() -> std::io::Result<&'static str> {
    tokio::signal::ctrl_c().await.map(|_| "ctrl-c")
}

/// Best-effort transition back to idle. Failures are logged, never retried.
pub async fn restore_idle(device: &dyn DeviceController) -> bool {
    match device.indicate_idle().await {
        Ok(()) => true,
        Err(e) => {
            error!(device = device.name(), error = %e, "Failed to restore idle indicator");
            false
        }
    }
}

/// Handle a cancellation observed during `phase`.
///
/// Issues exactly one idle transition. An in-flight capture is not resumed;
/// tearing down its processes is the recording action's job.
pub(crate) async fn handle_cancellation(device: &dyn DeviceController, phase: Phase) {
    warn!(%phase, "Cancellation requested, returning device to idle");
    restore_idle(device).await;
}
