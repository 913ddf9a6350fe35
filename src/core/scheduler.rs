//! Timed trigger scheduler.
//!
//! Holds the pending events in firing order, sleeps until the earliest one is
//! due, and fires it: arm the device, light the recording indicator, capture,
//! return to idle, announce what is next. One event at a time, never early.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::adapters::{
    CaptureError, CaptureReport, DeviceController, DeviceError, RecordingAction,
};
use crate::domain::{Event, RunOutcome};

use super::announcer::Announcer;
use super::clock::{Clock, SystemClock};
use super::interrupt::{self, Phase};

/// Scheduler tuning
#[derive(Debug, Clone)]
pub struct SchedulerSettings {
    /// Longest single sleep. Waking periodically lets wall-clock jumps
    /// (suspend, NTP corrections) be noticed before the trigger time.
    pub max_sleep: Duration,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            max_sleep: Duration::from_secs(300),
        }
    }
}

/// Observable scheduler conditions
#[derive(Debug, Clone, Error)]
pub enum SchedulerError {
    #[error("No future events to schedule")]
    EmptySchedule,
}

/// Why a firing did not complete
#[derive(Debug, Error)]
pub enum FireError {
    #[error(transparent)]
    Device(#[from] DeviceError),

    #[error(transparent)]
    Capture(#[from] CaptureError),
}

enum Wait {
    Due,
    Cancelled,
}

enum Firing {
    Captured(CaptureReport),
    Failed(FireError),
    Cancelled,
}

/// A cancellation always wins over whatever the interrupted step reported
fn settle(err: FireError, cancel: &CancellationToken) -> Firing {
    if cancel.is_cancelled() {
        Firing::Cancelled
    } else {
        Firing::Failed(err)
    }
}

/// Keep the events strictly after `now`, soonest first.
///
/// The sort is stable, so events sharing a trigger time keep their input order.
pub fn admit(events: Vec<Event>, now: DateTime<Utc>) -> Vec<Event> {
    let mut admitted: Vec<Event> = events
        .into_iter()
        .filter(|event| event.trigger_time() > now)
        .collect();
    admitted.sort_by_key(Event::trigger_time);
    admitted
}

/// Fires one capture per event, in ascending trigger time order
pub struct Scheduler {
    pending: VecDeque<Event>,
    device: Arc<dyn DeviceController>,
    recorder: Arc<dyn RecordingAction>,
    announcer: Arc<dyn Announcer>,
    clock: Arc<dyn Clock>,
    settings: SchedulerSettings,
}

impl Scheduler {
    /// Create a scheduler using the system clock
    pub fn new(
        device: Arc<dyn DeviceController>,
        recorder: Arc<dyn RecordingAction>,
        announcer: Arc<dyn Announcer>,
    ) -> Self {
        Self {
            pending: VecDeque::new(),
            device,
            recorder,
            announcer,
            clock: Arc::new(SystemClock),
            settings: SchedulerSettings::default(),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_settings(mut self, settings: SchedulerSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Admit the events whose trigger time is strictly in the future.
    ///
    /// Replaces any previously loaded events. Ties keep their input order.
    /// `EmptySchedule` is reported when nothing was admitted; the scheduler is
    /// still usable and `run` will simply announce that nothing is scheduled.
    #[instrument(skip_all, fields(offered = events.len()))]
    pub fn load(&mut self, events: Vec<Event>) -> Result<usize, SchedulerError> {
        let offered = events.len();
        let admitted = admit(events, self.clock.now());

        let dropped = offered - admitted.len();
        if dropped > 0 {
            info!(dropped, "Discarded events that are already underway or over");
        }

        self.pending = admitted.into();
        info!(admitted = self.pending.len(), "Schedule loaded");

        if self.pending.is_empty() {
            Err(SchedulerError::EmptySchedule)
        } else {
            Ok(self.pending.len())
        }
    }

    /// Events still waiting to fire, soonest first
    pub fn pending(&self) -> impl Iterator<Item = &Event> {
        self.pending.iter()
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// The event that will fire next
    pub fn next_event(&self) -> Option<&Event> {
        self.pending.front()
    }

    /// Fire every pending event in order until none remain, a firing fails, or
    /// `cancel` is triggered.
    ///
    /// Every return path leaves the device idle.
    #[instrument(skip_all, fields(run_id = %Uuid::new_v4()))]
    pub async fn run(&mut self, cancel: &CancellationToken) -> RunOutcome {
        let mut fired = 0;
        self.announcer.next_up(self.pending.front());

        loop {
            let Some(due) = self.pending.front().map(Event::trigger_time) else {
                break;
            };

            if let Wait::Cancelled = self.wait_until(due, cancel).await {
                return self.cancelled(Phase::Sleeping, fired).await;
            }

            let Some(event) = self.pending.pop_front() else {
                break;
            };
            fired += 1;
            info!(event = event.label(), output_id = event.output_id(), "Firing");

            match self.fire(&event, cancel).await {
                Firing::Captured(report) => {
                    info!(
                        event = event.label(),
                        elapsed_secs = report.elapsed.as_secs(),
                        "Capture complete"
                    );
                    self.announcer.recorded(&event, &report);
                    self.announcer.next_up(self.pending.front());
                }
                Firing::Failed(err) => {
                    error!(event = event.label(), error = %err, "Firing failed");
                    interrupt::restore_idle(self.device.as_ref()).await;
                    self.abandon_pending();
                    if cancel.is_cancelled() {
                        // interrupted while restoring idle; the device was
                        // already driven back once
                        self.announcer.interrupted();
                        return RunOutcome::Cancelled { fired };
                    }
                    return RunOutcome::Failed {
                        fired,
                        error: err.to_string(),
                    };
                }
                Firing::Cancelled => {
                    return self.cancelled(Phase::Firing, fired).await;
                }
            }
        }

        info!(fired, "No more events scheduled");
        RunOutcome::Completed { fired }
    }

    /// Sleep until `due`, in chunks, re-reading the clock after every wake-up
    async fn wait_until(&self, due: DateTime<Utc>, cancel: &CancellationToken) -> Wait {
        loop {
            let remaining = match (due - self.clock.now()).to_std() {
                Ok(remaining) if !remaining.is_zero() => remaining,
                _ => return Wait::Due,
            };
            let chunk = remaining.min(self.settings.max_sleep);
            debug!(
                remaining_secs = remaining.as_secs(),
                chunk_secs = chunk.as_secs(),
                "Sleeping"
            );

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Wait::Cancelled,
                _ = self.clock.sleep(chunk) => {}
            }
        }
    }

    /// Run the fire protocol for one event.
    ///
    /// Device calls are short and always run to completion, so no sharkctrl
    /// invocation is left racing the idle restoration. Only the capture is
    /// raced against cancellation.
    async fn fire(&self, event: &Event, cancel: &CancellationToken) -> Firing {
        if let Err(err) = self.indicate_recording(event).await {
            return settle(err.into(), cancel);
        }

        let captured = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Firing::Cancelled,
            result = self.recorder.capture(event) => result,
        };
        let report = match captured {
            Ok(report) => report,
            Err(err) => return settle(err.into(), cancel),
        };

        match self.device.indicate_idle().await {
            Ok(()) => Firing::Captured(report),
            Err(err) => settle(err.into(), cancel),
        }
    }

    async fn indicate_recording(&self, event: &Event) -> Result<(), DeviceError> {
        self.device.arm().await?;
        self.device.indicate_active().await?;
        self.announcer.recording(event);
        Ok(())
    }

    async fn cancelled(&mut self, phase: Phase, fired: usize) -> RunOutcome {
        interrupt::handle_cancellation(self.device.as_ref(), phase).await;
        self.announcer.interrupted();
        self.abandon_pending();
        RunOutcome::Cancelled { fired }
    }

    fn abandon_pending(&mut self) {
        if !self.pending.is_empty() {
            warn!(skipped = self.pending.len(), "Remaining events will not be recorded");
            self.pending.clear();
        }
    }
}
