//! Wall-clock access for the scheduler.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Source of "now" plus a way to wait.
///
/// The scheduler never trusts `sleep` to be exact: after every wake-up it
/// re-reads `now` and goes back to sleep if the trigger time has not been
/// reached yet.
#[async_trait]
pub trait Clock: Send + Sync {
    /// Current absolute time
    fn now(&self) -> DateTime<Utc>;

    /// Suspend for roughly `duration`
    async fn sleep(&self, duration: Duration);
}

/// The real system clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

#[async_trait]
impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}
