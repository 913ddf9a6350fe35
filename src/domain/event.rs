//! Scheduled broadcast events.
//!
//! An Event is created once at ingestion and never changes afterwards; the
//! scheduler consumes it exactly once.

use std::collections::HashSet;

use chrono::{DateTime, FixedOffset, Utc};
use serde::Serialize;

use super::zone::SchedulingZone;

/// One scheduled broadcast to capture
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Event {
    trigger_time: DateTime<Utc>,
    label: String,
    output_id: String,
    details: Option<String>,
}

impl Event {
    /// Create an event, deriving its output identifier from the trigger date
    /// (in `zone`) and the label
    pub fn new(trigger_time: DateTime<Utc>, label: impl Into<String>, zone: SchedulingZone) -> Self {
        let label = label.into();
        let output_id = output_id_for(trigger_time, &label, zone);
        Self {
            trigger_time,
            label,
            output_id,
            details: None,
        }
    }

    /// Attach free-form broadcast details (e.g. "Radio: KNBR 680")
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        let details = details.into();
        self.details = (!details.trim().is_empty()).then_some(details);
        self
    }

    /// When the capture must start
    pub fn trigger_time(&self) -> DateTime<Utc> {
        self.trigger_time
    }

    /// Human-readable description, e.g. "49ers at Packers"
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Filesystem-safe identifier, unique within a loaded schedule
    pub fn output_id(&self) -> &str {
        &self.output_id
    }

    pub fn details(&self) -> Option<&str> {
        self.details.as_deref()
    }

    /// Trigger time as wall-clock time in `zone`
    pub fn local_time(&self, zone: SchedulingZone) -> DateTime<FixedOffset> {
        zone.localize(self.trigger_time)
    }
}

/// Build `YYYYMMDD-<label>` with whitespace runs collapsed to `-` and any
/// character that is unsafe in a filename replaced
pub fn output_id_for(trigger_time: DateTime<Utc>, label: &str, zone: SchedulingZone) -> String {
    let date = zone.localize(trigger_time).format("%Y%m%d");
    format!("{}-{}", date, sanitize_label(label))
}

fn sanitize_label(label: &str) -> String {
    let mut out = String::with_capacity(label.len());
    for word in label.split_whitespace() {
        if !out.is_empty() {
            out.push('-');
        }
        out.extend(word.chars().map(|c| {
            if c.is_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '-'
            }
        }));
    }
    if out.is_empty() {
        out.push_str("event");
    }
    out
}

/// Make output ids unique across a loaded schedule.
///
/// The first occurrence keeps its id; later duplicates get `-2`, `-3`, ...
pub fn ensure_unique_output_ids(events: &mut [Event]) {
    let mut taken: HashSet<String> = HashSet::new();
    for event in events.iter_mut() {
        if taken.insert(event.output_id.clone()) {
            continue;
        }
        let mut n = 2;
        loop {
            let candidate = format!("{}-{}", event.output_id, n);
            if taken.insert(candidate.clone()) {
                event.output_id = candidate;
                break;
            }
            n += 1;
        }
    }
}
