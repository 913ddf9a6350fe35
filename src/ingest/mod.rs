//! Schedule ingestion.
//!
//! Turns a team schedule file into the list of events handed to the
//! scheduler. Two formats are understood:
//!
//! 1. **ICS**: vCalendar exports (`VEVENT` with `DTSTART` and `SUMMARY`)
//! 2. **CSV**: calendar exports with `START_DATE`, `START_TIME`, `SUBJECT`
//!
//! # Architecture
//!
//! ```text
//! schedule file → parser → Vec<Event> (unique output ids) → Scheduler::load
//! ```
//!
//! Past events are *not* filtered here; admission is the scheduler's job.

pub mod csv;
pub mod ics;
pub mod sample;

use std::path::{Path, PathBuf};

use clap::ValueEnum;
use thiserror::Error;

use crate::domain::{ensure_unique_output_ids, Event, SchedulingZone};

// Re-export key functions
pub use csv::parse_csv;
pub use ics::parse_ics;
pub use sample::sample_ics;

/// A schedule line could not be understood
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("line {line}: {message}")]
pub struct ParseError {
    pub line: usize,
    pub message: String,
}

impl ParseError {
    pub fn new(line: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            message: message.into(),
        }
    }
}

/// The schedule could not be turned into events
#[derive(Debug, Error)]
pub enum IngestionError {
    #[error("{}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{}: unknown schedule format (expected .ics or .csv, or pass --format)", .0.display())]
    UnknownFormat(PathBuf),

    #[error("{}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: ParseError,
    },
}

/// Supported schedule file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ScheduleFormat {
    /// vCalendar / iCalendar
    Ics,

    /// Comma separated calendar export
    Csv,
}

impl ScheduleFormat {
    /// Guess the format from a file extension
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "ics" | "ical" | "ifb" | "vcs" => Some(Self::Ics),
            "csv" => Some(Self::Csv),
            _ => None,
        }
    }
}

/// Parse schedule text in a known format
pub fn parse_schedule(
    text: &str,
    format: ScheduleFormat,
    zone: SchedulingZone,
) -> Result<Vec<Event>, ParseError> {
    let mut events = match format {
        ScheduleFormat::Ics => parse_ics(text, zone)?,
        ScheduleFormat::Csv => parse_csv(text, zone)?,
    };
    ensure_unique_output_ids(&mut events);
    Ok(events)
}

/// Read and parse a schedule file.
///
/// `format` overrides detection from the file extension.
pub async fn read_schedule(
    path: &Path,
    format: Option<ScheduleFormat>,
    zone: SchedulingZone,
) -> Result<Vec<Event>, IngestionError> {
    let format = format
        .or_else(|| ScheduleFormat::from_path(path))
        .ok_or_else(|| IngestionError::UnknownFormat(path.to_path_buf()))?;

    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| IngestionError::Read {
            path: path.to_path_buf(),
            source,
        })?;

    parse_schedule(&text, format, zone).map_err(|source| IngestionError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
