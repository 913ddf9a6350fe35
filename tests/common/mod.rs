//! Shared fakes for scheduler integration tests.
//!
//! Every test runs on a paused tokio clock, so hours of schedule pass in
//! microseconds of real time.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use tokio::time::Instant;

use sharkcast::adapters::{CaptureError, CaptureReport, DeviceError};
use sharkcast::{
    Announcer, CancellationToken, Clock, DeviceController, DeviceState, Event, RecordingAction,
    SchedulingZone,
};

/// Kickoff of the first game in most scenarios
pub fn kickoff() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 9, 8, 20, 25, 0).unwrap()
}

pub fn event(at: DateTime<Utc>, label: &str) -> Event {
    Event::new(at, label, SchedulingZone::Utc)
}

/// Wall clock driven by tokio's (paused) time
pub struct VirtualClock {
    base: DateTime<Utc>,
    start: Instant,
    /// Wake up after half the requested duration, like a host whose clock
    /// was stepped backwards during the sleep
    early: bool,
    sleeps: Mutex<Vec<Duration>>,
}

impl VirtualClock {
    pub fn new(base: DateTime<Utc>) -> Arc<Self> {
        Arc::new(Self {
            base,
            start: Instant::now(),
            early: false,
            sleeps: Mutex::new(Vec::new()),
        })
    }

    pub fn early(base: DateTime<Utc>) -> Arc<Self> {
        Arc::new(Self {
            base,
            start: Instant::now(),
            early: true,
            sleeps: Mutex::new(Vec::new()),
        })
    }

    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().unwrap().clone()
    }
}

#[async_trait]
impl Clock for VirtualClock {
    fn now(&self) -> DateTime<Utc> {
        self.base + chrono::Duration::from_std(self.start.elapsed()).unwrap()
    }

    async fn sleep(&self, duration: Duration) {
        self.sleeps.lock().unwrap().push(duration);
        let actual = if self.early {
            (duration / 2).max(Duration::from_millis(1))
        } else {
            duration
        };
        tokio::time::sleep(actual).await;
    }
}

/// Device controller that records every call
#[derive(Default)]
pub struct FakeDevice {
    calls: Mutex<Vec<&'static str>>,
    state: Mutex<DeviceState>,
    fail_on: Option<&'static str>,
    slow: Option<(&'static str, Duration)>,
}

impl FakeDevice {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Fail every call named `call` ("arm", "active" or "idle")
    pub fn failing_on(call: &'static str) -> Arc<Self> {
        Arc::new(Self {
            fail_on: Some(call),
            ..Self::default()
        })
    }

    /// Take `delay` to complete every call named `call`
    pub fn slow_on(call: &'static str, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            slow: Some((call, delay)),
            ..Self::default()
        })
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, call: &str) -> usize {
        self.calls().iter().filter(|c| **c == call).count()
    }

    pub fn state(&self) -> DeviceState {
        *self.state.lock().unwrap()
    }

    /// Calls are logged when they complete
    async fn record(&self, call: &'static str, next: DeviceState) -> Result<(), DeviceError> {
        if let Some((slow, delay)) = self.slow {
            if slow == call {
                tokio::time::sleep(delay).await;
            }
        }
        self.calls.lock().unwrap().push(call);
        if self.fail_on == Some(call) {
            return Err(DeviceError::Unavailable(format!("{} failed", call)));
        }
        *self.state.lock().unwrap() = next;
        Ok(())
    }
}

#[async_trait]
impl DeviceController for FakeDevice {
    fn name(&self) -> &str {
        "fake"
    }

    async fn arm(&self) -> Result<(), DeviceError> {
        self.record("arm", DeviceState::Armed).await
    }

    async fn indicate_active(&self) -> Result<(), DeviceError> {
        self.record("active", DeviceState::Active).await
    }

    async fn indicate_idle(&self) -> Result<(), DeviceError> {
        self.record("idle", DeviceState::Idle).await
    }
}

/// Recording action that logs when each capture started
pub struct FakeRecorder {
    clock: Arc<VirtualClock>,
    captures: Mutex<Vec<(String, DateTime<Utc>)>>,
    /// Capture number (1-based) that fails
    fail_at: Option<usize>,
    /// How long each capture takes
    length: Duration,
    /// Cancelled from inside the capture, before it reports failure
    cancel_on_capture: Option<CancellationToken>,
}

impl FakeRecorder {
    pub fn new(clock: Arc<VirtualClock>) -> Self {
        Self {
            clock,
            captures: Mutex::new(Vec::new()),
            fail_at: None,
            length: Duration::ZERO,
            cancel_on_capture: None,
        }
    }

    pub fn failing_at(mut self, capture: usize) -> Self {
        self.fail_at = Some(capture);
        self
    }

    pub fn lasting(mut self, length: Duration) -> Self {
        self.length = length;
        self
    }

    pub fn cancelling(mut self, cancel: CancellationToken) -> Self {
        self.cancel_on_capture = Some(cancel);
        self
    }

    pub fn captures(&self) -> Vec<(String, DateTime<Utc>)> {
        self.captures.lock().unwrap().clone()
    }

    pub fn labels(&self) -> Vec<String> {
        self.captures().into_iter().map(|(label, _)| label).collect()
    }
}

#[async_trait]
impl RecordingAction for FakeRecorder {
    fn name(&self) -> &str {
        "fake"
    }

    async fn capture(&self, event: &Event) -> Result<CaptureReport, CaptureError> {
        let number = {
            let mut captures = self.captures.lock().unwrap();
            captures.push((event.label().to_string(), self.clock.now()));
            captures.len()
        };

        if let Some(cancel) = &self.cancel_on_capture {
            cancel.cancel();
            return Err(CaptureError::Other("recorder killed by signal".to_string()));
        }

        tokio::time::sleep(self.length).await;

        if self.fail_at == Some(number) {
            return Err(CaptureError::Other(format!("capture {} failed", number)));
        }

        Ok(CaptureReport {
            output: PathBuf::from(format!("/tmp/{}.ogg", event.output_id())),
            elapsed: self.length,
        })
    }
}

/// Announcer that keeps a log instead of printing
#[derive(Default)]
pub struct CollectingAnnouncer {
    lines: Mutex<Vec<String>>,
}

impl CollectingAnnouncer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().unwrap().clone()
    }

    fn push(&self, line: String) {
        self.lines.lock().unwrap().push(line);
    }
}

impl Announcer for CollectingAnnouncer {
    fn next_up(&self, next: Option<&Event>) {
        match next {
            Some(event) => self.push(format!("next:{}", event.label())),
            None => self.push("next:none".to_string()),
        }
    }

    fn recording(&self, event: &Event) {
        self.push(format!("recording:{}", event.label()));
    }

    fn recorded(&self, event: &Event, _report: &CaptureReport) {
        self.push(format!("recorded:{}", event.label()));
    }

    fn interrupted(&self) {
        self.push("interrupted".to_string());
    }
}
