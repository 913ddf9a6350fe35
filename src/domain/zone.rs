//! Scheduling timezone.
//!
//! Schedules carry wall-clock times that only become absolute instants once a
//! zone is chosen, and announcements are printed back in that same zone.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, FixedOffset, Local, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use thiserror::Error;

/// Timezone used to resolve schedule times and to print announcements
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulingZone {
    /// The host's local timezone (DST aware)
    Local,

    /// Coordinated Universal Time
    Utc,

    /// A fixed offset from UTC
    Fixed(FixedOffset),

    /// An IANA zone such as `America/Los_Angeles` (DST aware)
    Named(Tz),
}

impl Default for SchedulingZone {
    fn default() -> Self {
        Self::Local
    }
}

#[derive(Debug, Clone, Error)]
#[error("Invalid timezone '{0}': expected 'local', 'utc', an offset like '-08:00' or a zone like 'America/Los_Angeles'")]
pub struct ZoneParseError(pub String);

impl SchedulingZone {
    /// Express an absolute instant as wall-clock time in this zone
    pub fn localize(&self, instant: DateTime<Utc>) -> DateTime<FixedOffset> {
        match self {
            Self::Local => instant.with_timezone(&Local).fixed_offset(),
            Self::Utc => instant.fixed_offset(),
            Self::Fixed(offset) => instant.with_timezone(offset),
            Self::Named(tz) => instant.with_timezone(tz).fixed_offset(),
        }
    }

    /// Resolve a wall-clock time in this zone into an absolute instant.
    ///
    /// Ambiguous local times (DST fall-back) resolve to the earlier instant;
    /// times skipped by a DST jump return `None`.
    pub fn resolve(&self, naive: NaiveDateTime) -> Option<DateTime<Utc>> {
        match self {
            Self::Local => Local
                .from_local_datetime(&naive)
                .earliest()
                .map(|t| t.with_timezone(&Utc)),
            Self::Utc => Some(Utc.from_utc_datetime(&naive)),
            Self::Fixed(offset) => offset
                .from_local_datetime(&naive)
                .single()
                .map(|t| t.with_timezone(&Utc)),
            Self::Named(tz) => tz
                .from_local_datetime(&naive)
                .earliest()
                .map(|t| t.with_timezone(&Utc)),
        }
    }
}

impl FromStr for SchedulingZone {
    type Err = ZoneParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        match trimmed.to_ascii_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "utc" | "z" => Ok(Self::Utc),
            _ => parse_offset(trimmed)
                .map(Self::Fixed)
                .or_else(|| trimmed.parse::<Tz>().ok().map(Self::Named))
                .ok_or_else(|| ZoneParseError(s.to_string())),
        }
    }
}

impl fmt::Display for SchedulingZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local => write!(f, "local"),
            Self::Utc => write!(f, "utc"),
            Self::Fixed(offset) => write!(f, "{}", offset),
            Self::Named(tz) => f.write_str(tz.name()),
        }
    }
}

/// Parse `+HH:MM`, `-HHMM` or `+HH`
fn parse_offset(s: &str) -> Option<FixedOffset> {
    let (sign, rest) = if let Some(rest) = s.strip_prefix('+') {
        (1, rest)
    } else if let Some(rest) = s.strip_prefix('-') {
        (-1, rest)
    } else {
        return None;
    };
    if !rest.is_ascii() {
        return None;
    }

    let (hours, minutes) = match rest.split_once(':') {
        Some(parts) => parts,
        None if rest.len() == 4 => rest.split_at(2),
        None if !rest.is_empty() && rest.len() <= 2 => (rest, "0"),
        None => return None,
    };

    let hours: i32 = hours.parse().ok()?;
    let minutes: i32 = minutes.parse().ok()?;
    if !(0..=23).contains(&hours) || !(0..=59).contains(&minutes) {
        return None;
    }

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}
