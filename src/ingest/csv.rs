//! CSV schedule reader.
//!
//! Reads the calendar export format teams publish for import into desktop
//! calendars:
//!
//! ```text
//! START_DATE,START_TIME,SUBJECT,DESCRIPTION
//! 04/06/12,01:05 PM,Giants at Diamondbacks,"Radio: KNBR 680, KTRB 860"
//! ```
//!
//! Times are wall-clock times in the scheduling zone.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use csv::{ReaderBuilder, StringRecord, Trim};

use super::ParseError;
use crate::domain::{Event, SchedulingZone};

const START_DATE: &str = "START_DATE";
const START_TIME: &str = "START_TIME";
const SUBJECT: &str = "SUBJECT";
const DESCRIPTION: &str = "DESCRIPTION";

/// Column positions resolved from the header row
struct Columns {
    date: usize,
    time: usize,
    subject: usize,
    description: Option<usize>,
}

impl Columns {
    fn from_header(header: &StringRecord) -> Result<Self, ParseError> {
        let line = record_line(header).unwrap_or(1);
        let find = |name: &str| {
            header
                .iter()
                .position(|h| h.trim_start_matches('\u{feff}').eq_ignore_ascii_case(name))
        };
        let require = |name: &str| {
            find(name).ok_or_else(|| ParseError::new(line, format!("missing {} column", name)))
        };

        Ok(Self {
            date: require(START_DATE)?,
            time: require(START_TIME)?,
            subject: require(SUBJECT)?,
            description: find(DESCRIPTION),
        })
    }
}

fn record_line(record: &StringRecord) -> Option<usize> {
    record.position().map(|p| p.line() as usize)
}

fn csv_error(err: csv::Error, fallback: usize) -> ParseError {
    let line = err.position().map_or(fallback, |p| p.line() as usize);
    ParseError::new(line, err.to_string())
}

/// Parse every data row in `text`.
///
/// Quoted fields may contain commas, doubled quotes and line breaks. Blank
/// lines are skipped.
pub fn parse_csv(text: &str, zone: SchedulingZone) -> Result<Vec<Event>, ParseError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(text.as_bytes());

    let header = reader.headers().map_err(|e| csv_error(e, 1))?.clone();
    if header.iter().all(str::is_empty) {
        return Err(ParseError::new(1, "schedule is empty"));
    }
    let columns = Columns::from_header(&header)?;

    let mut events = Vec::new();
    let mut last_line = record_line(&header).unwrap_or(1);
    for record in reader.records() {
        let record = record.map_err(|e| csv_error(e, last_line + 1))?;
        let number = record_line(&record).unwrap_or(last_line + 1);
        last_line = number;
        let field = |idx: usize| record.get(idx).unwrap_or("");

        let start = parse_start(field(columns.date), field(columns.time))
            .map_err(|m| ParseError::new(number, m))?;
        let start = zone.resolve(start).ok_or_else(|| {
            ParseError::new(number, format!("{} does not exist in zone {}", start, zone))
        })?;

        let subject = field(columns.subject);
        if subject.is_empty() {
            return Err(ParseError::new(number, "empty SUBJECT"));
        }

        let mut event = Event::new(start, subject, zone);
        if let Some(idx) = columns.description {
            event = event.with_details(field(idx));
        }
        events.push(event);
    }

    Ok(events)
}

fn parse_start(date: &str, time: &str) -> Result<NaiveDateTime, String> {
    let date = NaiveDate::parse_from_str(date, "%m/%d/%y")
        .ok()
        .filter(|_| date.rsplit('/').next().map_or(false, |y| y.len() == 2))
        .or_else(|| NaiveDate::parse_from_str(date, "%m/%d/%Y").ok())
        .ok_or_else(|| format!("bad START_DATE '{}'", date))?;

    let time = NaiveTime::parse_from_str(time, "%I:%M %p")
        .or_else(|_| NaiveTime::parse_from_str(time, "%H:%M"))
        .map_err(|_| format!("bad START_TIME '{}'", time))?;

    Ok(date.and_time(time))
}
