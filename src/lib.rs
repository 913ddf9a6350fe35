//! sharkcast - Unattended radio broadcast recorder
//!
//! Reads a game schedule (ICS or CSV), sleeps until each game starts, tunes a
//! RadioSHARK to the station, lights its recording indicator, captures the
//! broadcast to an encoded file and returns the radio to idle. Then it
//! announces the next game and goes back to sleep.
//!
//! # Modules
//!
//! - `domain`: Data structures (Event, RunOutcome, SchedulingZone)
//! - `ingest`: Schedule file parsing (ICS, CSV) and test schedules
//! - `core`: Scheduler, cancellation, announcements
//! - `adapters`: External system integrations (sharkctrl, arecord, encoders)
//! - `config`: Config file, environment and flag resolution
//! - `cli`: Command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Record every upcoming game in a season schedule
//! sharkcast run 49ers-2024.ics
//!
//! # Preview what would be recorded
//! sharkcast schedule 49ers-2024.ics
//!
//! # Check by ear that a fin's addresses are right
//! sharkcast verify --fin football
//!
//! # Try it out with two short games starting in a minute
//! sharkcast sample /tmp/test.ics && sharkcast run /tmp/test.ics --duration-hours 0.0167
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod ingest;

// Re-export main types at crate root for convenience
pub use adapters::{DeviceController, RecordingAction};
pub use core::{Announcer, CancellationToken, Clock, Scheduler, SchedulerSettings};
pub use domain::{DeviceState, Event, RunOutcome, SchedulingZone};
pub use ingest::{read_schedule, ScheduleFormat};
