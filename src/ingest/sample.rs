//! Sample schedule generation for end-to-end testing.
//!
//! Produces a small calendar whose games start within the next few minutes,
//! so a full run (tune, capture, encode, idle) can be watched without waiting
//! for a real broadcast.

use chrono::{DateTime, Duration, Utc};

/// Build an ICS calendar with `count` events.
///
/// Event `n` (zero based) starts at `first + n * spacing`. Each is labelled
/// `test<MM>` after its start minute. Generation stops early if a start time
/// would leave the representable range.
pub fn sample_ics(first: DateTime<Utc>, count: usize, spacing: Duration) -> String {
    let stamp = Utc::now().format("%Y%m%dT%H%M%SZ");
    let mut out = String::from(
        "BEGIN:VCALENDAR\r\nVERSION:2.0\r\nMETHOD:PUBLISH\r\nPRODID:-//sharkcast//sample schedule//EN\r\nX-WR-CALNAME:sharkcast test schedule\r\n",
    );

    let mut next = Some(first);
    for n in 0..count {
        let Some(start) = next else { break };
        next = start.checked_add_signed(spacing);
        out.push_str("BEGIN:VEVENT\r\n");
        out.push_str(&format!("DTSTART:{}\r\n", start.format("%Y%m%dT%H%M%SZ")));
        out.push_str(&format!("SUMMARY:test{}\r\n", start.format("%M")));
        out.push_str(&format!("UID:sharkcast-sample-{}-{}\r\n", start.timestamp(), n));
        out.push_str(&format!("DTSTAMP:{}\r\n", stamp));
        out.push_str("END:VEVENT\r\n");
    }

    out.push_str("END:VCALENDAR\r\n");
    out
}
