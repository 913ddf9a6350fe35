//! Domain types for the sharkcast recorder.
//!
//! This module contains the core data structures:
//! - Event: One scheduled broadcast to capture
//! - SchedulingZone: The timezone schedules are read and announced in
//! - RunOutcome: How a scheduler run ended
//! - DeviceState: What the radio fin is currently doing

pub mod device;
pub mod event;
pub mod outcome;
pub mod zone;

// Re-export commonly used types
pub use device::DeviceState;
pub use event::{ensure_unique_output_ids, Event};
pub use outcome::RunOutcome;
pub use zone::{SchedulingZone, ZoneParseError};
