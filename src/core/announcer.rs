//! Human-readable "what's next" reporting.
//!
//! Announcements are plain console lines, not a machine-readable protocol.

use crate::adapters::CaptureReport;
use crate::domain::{Event, SchedulingZone};

/// Receives progress notifications from the scheduler.
///
/// Implementations must not have side effects beyond producing output.
pub trait Announcer: Send + Sync {
    /// Report the soonest pending event, or that nothing is scheduled
    fn next_up(&self, next: Option<&Event>);

    /// A capture is starting
    fn recording(&self, event: &Event);

    /// A capture finished successfully
    fn recorded(&self, event: &Event, report: &CaptureReport);

    /// The run was interrupted by the operator
    fn interrupted(&self);
}

/// Announcer printing to stdout
#[derive(Debug, Clone)]
pub struct ConsoleAnnouncer {
    team: String,
    zone: SchedulingZone,
}

impl ConsoleAnnouncer {
    pub fn new(team: impl Into<String>, zone: SchedulingZone) -> Self {
        Self {
            team: team.into(),
            zone,
        }
    }

    /// Lines printed by `next_up`
    pub fn next_up_lines(&self, next: Option<&Event>) -> Vec<String> {
        let Some(event) = next else {
            return vec!["No more games scheduled.".to_string()];
        };

        let local = event.local_time(self.zone);
        let heading = if self.team.is_empty() {
            "Next up:".to_string()
        } else {
            format!("Next up for the {}:", self.team)
        };

        let mut lines = vec![
            heading,
            format!("    {}", event.label()),
            format!("    {}", local.format("%A, %d %B %Y, %I:%M %p")),
        ];
        if let Some(details) = event.details() {
            lines.push(format!("    {}", details));
        }
        lines
    }

    /// Line printed by `recording`
    pub fn recording_line(&self, event: &Event) -> String {
        let date = event.local_time(self.zone).format("%d %B %Y");
        format!("Recording {} ({}).", event.label(), date)
    }
}

impl Announcer for ConsoleAnnouncer {
    fn next_up(&self, next: Option<&Event>) {
        for line in self.next_up_lines(next) {
            println!("{}", line);
        }
    }

    fn recording(&self, event: &Event) {
        println!("{}", self.recording_line(event));
    }

    fn recorded(&self, _event: &Event, report: &CaptureReport) {
        println!("Recording complete: {}", report.output.display());
    }

    fn interrupted(&self) {
        println!("Killed at user request.");
    }
}
