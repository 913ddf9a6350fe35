//! Scheduler Integration Tests
//!
//! Ordering, admission, timing and failure handling of the fire loop.

mod common;

use std::sync::Arc;
use std::time::Duration;

use chrono::Duration as Span;
use common::{event, kickoff, CollectingAnnouncer, FakeDevice, FakeRecorder, VirtualClock};
use sharkcast::core::SchedulerError;
use sharkcast::{CancellationToken, DeviceState, RunOutcome, Scheduler, SchedulerSettings};

struct Harness {
    clock: Arc<VirtualClock>,
    device: Arc<FakeDevice>,
    recorder: Arc<FakeRecorder>,
    announcer: Arc<CollectingAnnouncer>,
}

impl Harness {
    fn new(clock: Arc<VirtualClock>, device: Arc<FakeDevice>, recorder: FakeRecorder) -> Self {
        Self {
            clock,
            device,
            recorder: Arc::new(recorder),
            announcer: CollectingAnnouncer::new(),
        }
    }

    fn plain() -> Self {
        let clock = VirtualClock::new(kickoff());
        let recorder = FakeRecorder::new(clock.clone());
        Self::new(clock, FakeDevice::new(), recorder)
    }

    fn scheduler(&self) -> Scheduler {
        Scheduler::new(
            self.device.clone(),
            self.recorder.clone(),
            self.announcer.clone(),
        )
        .with_clock(self.clock.clone())
    }
}

#[tokio::test(start_paused = true)]
async fn test_events_fire_in_trigger_order() {
    let h = Harness::plain();
    let now = kickoff();
    let mut scheduler = h.scheduler();

    let loaded = scheduler
        .load(vec![
            event(now + Span::minutes(30), "Rams at 49ers"),
            event(now + Span::minutes(10), "49ers at Vikings"),
            event(now + Span::minutes(20), "Seahawks at 49ers"),
        ])
        .unwrap();
    assert_eq!(loaded, 3);
    assert_eq!(scheduler.next_event().unwrap().label(), "49ers at Vikings");

    let outcome = scheduler.run(&CancellationToken::new()).await;

    assert_eq!(outcome, RunOutcome::Completed { fired: 3 });
    assert_eq!(
        h.recorder.labels(),
        vec!["49ers at Vikings", "Seahawks at 49ers", "Rams at 49ers"]
    );
    assert_eq!(scheduler.pending_len(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_only_future_events_are_admitted() {
    let h = Harness::plain();
    let now = kickoff();
    let mut scheduler = h.scheduler();

    let loaded = scheduler
        .load(vec![
            event(now - Span::hours(3), "Already over"),
            event(now, "Kicking off right now"),
            event(now + Span::seconds(1), "Just ahead"),
        ])
        .unwrap();

    assert_eq!(loaded, 1);
    let pending: Vec<&str> = scheduler.pending().map(|e| e.label()).collect();
    assert_eq!(pending, vec!["Just ahead"]);
}

#[tokio::test(start_paused = true)]
async fn test_ties_and_past_events() {
    let h = Harness::plain();
    let now = kickoff();
    let mut scheduler = h.scheduler();

    let loaded = scheduler
        .load(vec![
            event(now + Span::seconds(1), "A"),
            event(now + Span::seconds(2), "B"),
            event(now + Span::seconds(1), "C"),
            event(now - Span::seconds(5), "D"),
        ])
        .unwrap();
    assert_eq!(loaded, 3);

    let outcome = scheduler.run(&CancellationToken::new()).await;
    assert_eq!(outcome, RunOutcome::Completed { fired: 3 });

    let captures = h.recorder.captures();
    let labels: Vec<&str> = captures.iter().map(|(l, _)| l.as_str()).collect();
    assert_eq!(labels, vec!["A", "C", "B"]);

    // Both ties fire at their shared time, B not before its own
    assert!(captures[0].1 >= now + Span::seconds(1));
    assert!(captures[1].1 >= now + Span::seconds(1));
    assert!(captures[2].1 >= now + Span::seconds(2));
    assert!(captures[2].1 >= captures[1].1);
}

#[tokio::test(start_paused = true)]
async fn test_never_fires_early_when_sleep_returns_early() {
    let now = kickoff();
    let clock = VirtualClock::early(now);
    let recorder = FakeRecorder::new(clock.clone());
    let h = Harness::new(clock, FakeDevice::new(), recorder);
    let mut scheduler = h.scheduler();

    let first = now + Span::minutes(90);
    let second = now + Span::hours(4);
    scheduler
        .load(vec![event(first, "Early game"), event(second, "Late game")])
        .unwrap();

    let outcome = scheduler.run(&CancellationToken::new()).await;
    assert_eq!(outcome, RunOutcome::Completed { fired: 2 });

    let captures = h.recorder.captures();
    assert!(captures[0].1 >= first);
    assert!(captures[1].1 >= second);
    // Early wake-ups force more than one sleep per event
    assert!(h.clock.sleeps().len() > 2);
}

#[tokio::test(start_paused = true)]
async fn test_sleep_is_chunked() {
    let h = Harness::plain();
    let now = kickoff();
    let mut scheduler = h.scheduler().with_settings(SchedulerSettings {
        max_sleep: Duration::from_secs(60),
    });

    scheduler
        .load(vec![event(now + Span::seconds(150), "Chunked")])
        .unwrap();
    scheduler.run(&CancellationToken::new()).await;

    let sleeps = h.clock.sleeps();
    assert_eq!(sleeps.len(), 3);
    assert_eq!(sleeps[0], Duration::from_secs(60));
    assert_eq!(sleeps[1], Duration::from_secs(60));
    assert!(sleeps[2] <= Duration::from_secs(30));
    assert!(h.recorder.captures()[0].1 >= now + Span::seconds(150));
}

#[tokio::test(start_paused = true)]
async fn test_device_protocol_and_announcements() {
    let h = Harness::plain();
    let now = kickoff();
    let mut scheduler = h.scheduler();

    scheduler
        .load(vec![
            event(now + Span::minutes(1), "Game 1"),
            event(now + Span::minutes(2), "Game 2"),
        ])
        .unwrap();
    let outcome = scheduler.run(&CancellationToken::new()).await;

    assert_eq!(outcome, RunOutcome::Completed { fired: 2 });
    assert_eq!(outcome.exit_code(), 0);
    assert_eq!(
        h.device.calls(),
        vec!["arm", "active", "idle", "arm", "active", "idle"]
    );
    assert_eq!(h.device.state(), DeviceState::Idle);
    assert_eq!(
        h.announcer.lines(),
        vec![
            "next:Game 1",
            "recording:Game 1",
            "recorded:Game 1",
            "next:Game 2",
            "recording:Game 2",
            "recorded:Game 2",
            "next:none",
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_capture_failure_stops_the_run() {
    let now = kickoff();
    let clock = VirtualClock::new(now);
    let recorder = FakeRecorder::new(clock.clone())
        .lasting(Duration::from_secs(600))
        .failing_at(2);
    let h = Harness::new(clock, FakeDevice::new(), recorder);
    let mut scheduler = h.scheduler();

    scheduler
        .load(vec![
            event(now + Span::hours(1), "Game 1"),
            event(now + Span::hours(2), "Game 2"),
            event(now + Span::hours(3), "Game 3"),
        ])
        .unwrap();
    let outcome = scheduler.run(&CancellationToken::new()).await;

    match &outcome {
        RunOutcome::Failed { fired, error } => {
            assert_eq!(*fired, 2);
            assert!(error.contains("capture 2 failed"));
        }
        other => panic!("Expected Failed, got {:?}", other),
    }
    assert_eq!(outcome.exit_code(), 1);
    assert_eq!(h.recorder.labels(), vec!["Game 1", "Game 2"]);
    assert_eq!(h.device.state(), DeviceState::Idle);
    assert_eq!(h.device.calls().last(), Some(&"idle"));
    assert_eq!(scheduler.pending_len(), 0);
    assert!(!h.announcer.lines().contains(&"next:Game 3".to_string()));
}

#[tokio::test(start_paused = true)]
async fn test_device_failure_skips_capture() {
    let now = kickoff();
    let clock = VirtualClock::new(now);
    let recorder = FakeRecorder::new(clock.clone());
    let h = Harness::new(clock, FakeDevice::failing_on("arm"), recorder);
    let mut scheduler = h.scheduler();

    scheduler
        .load(vec![
            event(now + Span::minutes(5), "Game 1"),
            event(now + Span::minutes(10), "Game 2"),
        ])
        .unwrap();
    let outcome = scheduler.run(&CancellationToken::new()).await;

    assert!(matches!(outcome, RunOutcome::Failed { fired: 1, .. }));
    assert!(h.recorder.captures().is_empty());
    assert_eq!(h.device.calls(), vec!["arm", "idle"]);
}

#[tokio::test(start_paused = true)]
async fn test_empty_schedule() {
    let h = Harness::plain();
    let now = kickoff();
    let mut scheduler = h.scheduler();

    let err = scheduler
        .load(vec![event(now - Span::days(1), "Last week")])
        .unwrap_err();
    assert!(matches!(err, SchedulerError::EmptySchedule));

    let outcome = scheduler.run(&CancellationToken::new()).await;
    assert_eq!(outcome, RunOutcome::Completed { fired: 0 });
    assert_eq!(outcome.exit_code(), 0);
    assert_eq!(h.announcer.lines(), vec!["next:none"]);
    assert!(h.device.calls().is_empty());
    assert!(h.recorder.captures().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_reload_replaces_pending_events() {
    let h = Harness::plain();
    let now = kickoff();
    let mut scheduler = h.scheduler();

    scheduler
        .load(vec![event(now + Span::hours(1), "Preseason")])
        .unwrap();
    scheduler
        .load(vec![event(now + Span::hours(2), "Week 1")])
        .unwrap();

    let pending: Vec<&str> = scheduler.pending().map(|e| e.label()).collect();
    assert_eq!(pending, vec!["Week 1"]);
}
