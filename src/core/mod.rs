//! Core scheduling logic.
//!
//! This module contains:
//! - Scheduler: Sleeps until each event is due and fires it
//! - Interrupt: Signal listening and idle restoration on operator interrupts
//! - Announcer: "What's next" reporting
//! - Clock: Wall-clock abstraction the scheduler sleeps against

pub mod announcer;
pub mod clock;
pub mod interrupt;
pub mod scheduler;

// Re-export commonly used types
pub use announcer::{Announcer, ConsoleAnnouncer};
pub use clock::{Clock, SystemClock};
pub use interrupt::{listen_for_signals, restore_idle, Phase};
pub use tokio_util::sync::CancellationToken;
pub use scheduler::{admit, FireError, Scheduler, SchedulerError, SchedulerSettings};
