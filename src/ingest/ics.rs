//! vCalendar (ICS) schedule reader.
//!
//! Only what team calendar exports use: `VEVENT` blocks with `DTSTART`,
//! `SUMMARY` and optionally `DESCRIPTION`. Folded lines are unfolded first.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use chrono_tz::Tz;

use super::ParseError;
use crate::domain::{Event, SchedulingZone};

/// A logical (unfolded) content line and where it started
struct ContentLine {
    number: usize,
    text: String,
}

/// Parse every `VEVENT` in `text`
pub fn parse_ics(text: &str, zone: SchedulingZone) -> Result<Vec<Event>, ParseError> {
    let mut events = Vec::new();
    let mut current: Option<PendingEvent> = None;

    for line in unfold(text) {
        if line.text.trim().is_empty() {
            continue;
        }
        let (name, params, value) = split_property(&line.text)
            .ok_or_else(|| ParseError::new(line.number, "expected NAME:VALUE"))?;

        match (name.as_str(), value.trim()) {
            ("BEGIN", v) if v.eq_ignore_ascii_case("VEVENT") => {
                if current.is_some() {
                    return Err(ParseError::new(line.number, "nested VEVENT"));
                }
                current = Some(PendingEvent::new(line.number));
            }
            ("END", v) if v.eq_ignore_ascii_case("VEVENT") => {
                let pending = current
                    .take()
                    .ok_or_else(|| ParseError::new(line.number, "END:VEVENT without BEGIN"))?;
                events.push(pending.finish()?);
            }
            _ => {
                if let Some(pending) = current.as_mut() {
                    match name.as_str() {
                        "DTSTART" => {
                            let start = parse_dtstart(&params, value.trim(), zone)
                                .map_err(|message| ParseError::new(line.number, message))?;
                            pending.start = Some(start);
                        }
                        "SUMMARY" => pending.summary = Some(unescape(value)),
                        "DESCRIPTION" => pending.description = Some(unescape(value)),
                        _ => {}
                    }
                }
            }
        }
    }

    if let Some(pending) = current {
        return Err(ParseError::new(pending.line, "VEVENT is never closed"));
    }

    Ok(events.into_iter().map(|e| e.into_event(zone)).collect())
}

struct PendingEvent {
    line: usize,
    start: Option<DateTime<Utc>>,
    summary: Option<String>,
    description: Option<String>,
}

struct ParsedEvent {
    start: DateTime<Utc>,
    summary: String,
    description: Option<String>,
}

impl PendingEvent {
    fn new(line: usize) -> Self {
        Self {
            line,
            start: None,
            summary: None,
            description: None,
        }
    }

    fn finish(self) -> Result<ParsedEvent, ParseError> {
        let start = self
            .start
            .ok_or_else(|| ParseError::new(self.line, "VEVENT has no DTSTART"))?;
        let summary = self
            .summary
            .ok_or_else(|| ParseError::new(self.line, "VEVENT has no SUMMARY"))?;
        Ok(ParsedEvent {
            start,
            summary,
            description: self.description,
        })
    }
}

impl ParsedEvent {
    fn into_event(self, zone: SchedulingZone) -> Event {
        let event = Event::new(self.start, self.summary.trim(), zone);
        match self.description {
            Some(description) => event.with_details(description),
            None => event,
        }
    }
}

/// Join continuation lines (leading space or tab) onto their predecessor
fn unfold(text: &str) -> Vec<ContentLine> {
    let mut lines: Vec<ContentLine> = Vec::new();
    for (idx, raw) in text.lines().enumerate() {
        let raw = raw.trim_end_matches('\r');
        match (raw.strip_prefix(' ').or_else(|| raw.strip_prefix('\t')), lines.last_mut()) {
            (Some(continuation), Some(previous)) => previous.text.push_str(continuation),
            _ => lines.push(ContentLine {
                number: idx + 1,
                text: raw.to_string(),
            }),
        }
    }
    lines
}

/// A property parameter: upper-cased name, value with quotes removed
type Param = (String, String);

/// Split `NAME;PARAM=X:value` into upper-cased name, params and value.
///
/// Colons inside quoted parameter values do not end the name part.
fn split_property(line: &str) -> Option<(String, Vec<Param>, &str)> {
    let mut in_quotes = false;
    let mut colon = None;
    for (idx, c) in line.char_indices() {
        match c {
            '"' => in_quotes = !in_quotes,
            ':' if !in_quotes => {
                colon = Some(idx);
                break;
            }
            _ => {}
        }
    }

    let colon = colon?;
    let head = &line[..colon];
    let value = &line[colon + 1..];

    let mut parts = head.split(';');
    let name = parts.next()?.trim().to_ascii_uppercase();
    if name.is_empty() {
        return None;
    }
    let params = parts
        .map(|p| {
            let (key, val) = p.split_once('=').unwrap_or((p, ""));
            (
                key.trim().to_ascii_uppercase(),
                val.trim().trim_matches('"').to_string(),
            )
        })
        .collect();
    Some((name, params, value))
}

/// Resolve a DTSTART value into an absolute instant.
///
/// UTC (`...Z`) values are taken as-is. `TZID=` values are read in that zone
/// when it is a known IANA name, otherwise in the scheduling zone, as are
/// floating times. All-day dates start at midnight.
fn parse_dtstart(
    params: &[Param],
    value: &str,
    zone: SchedulingZone,
) -> Result<DateTime<Utc>, String> {
    let zone = params
        .iter()
        .find(|(key, _)| key == "TZID")
        .and_then(|(_, tzid)| tzid.parse::<Tz>().ok())
        .map(SchedulingZone::Named)
        .unwrap_or(zone);

    let all_day = params
        .iter()
        .any(|(key, val)| key == "VALUE" && val.eq_ignore_ascii_case("DATE"))
        || value.len() == 8;
    if all_day {
        let date = NaiveDate::parse_from_str(value, "%Y%m%d")
            .map_err(|e| format!("bad DTSTART date '{}': {}", value, e))?;
        let midnight = date.and_hms_opt(0, 0, 0).ok_or("bad DTSTART date")?;
        return zone
            .resolve(midnight)
            .ok_or_else(|| format!("DTSTART '{}' does not exist in zone {}", value, zone));
    }

    let (naive, utc) = match value.strip_suffix('Z').or_else(|| value.strip_suffix('z')) {
        Some(stripped) => (stripped, true),
        None => (value, false),
    };

    let naive = NaiveDateTime::parse_from_str(naive, "%Y%m%dT%H%M%S")
        .or_else(|_| NaiveDateTime::parse_from_str(naive, "%Y%m%dT%H%M"))
        .map_err(|e| format!("bad DTSTART '{}': {}", value, e))?;

    if utc {
        Ok(naive.and_utc())
    } else {
        zone.resolve(naive)
            .ok_or_else(|| format!("DTSTART '{}' does not exist in zone {}", value, zone))
    }
}

/// Undo RFC 5545 TEXT escaping
fn unescape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') | Some('N') => out.push('\n'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}
