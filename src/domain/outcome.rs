//! Terminal result of a scheduler run.

use serde::Serialize;

/// Process exit status for a run that fired everything (or had nothing to fire)
pub const EXIT_SUCCESS: u8 = 0;

/// Process exit status for ingestion, device or capture failures
pub const EXIT_FAILURE: u8 = 1;

/// Process exit status when the operator interrupted the daemon
pub const EXIT_CANCELLED: u8 = 130;

/// How a scheduler run ended.
///
/// `fired` counts events whose firing began, including a firing that failed
/// or was interrupted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RunOutcome {
    /// Every admitted event was captured
    Completed { fired: usize },

    /// A device or capture failure aborted the run
    Failed { fired: usize, error: String },

    /// The operator asked the daemon to stop
    Cancelled { fired: usize },
}

impl RunOutcome {
    /// Number of events whose firing began
    pub fn fired(&self) -> usize {
        match self {
            Self::Completed { fired } | Self::Failed { fired, .. } | Self::Cancelled { fired } => {
                *fired
            }
        }
    }

    /// Exit status the process should report
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Completed { .. } => EXIT_SUCCESS,
            Self::Failed { .. } => EXIT_FAILURE,
            Self::Cancelled { .. } => EXIT_CANCELLED,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }
}
