//! Prometheus time and duration literals
//!
//! Durations follow the Prometheus grammar (`1h30m`, `500ms`, `2w`): each unit
//! appears at most once, largest first, with integer magnitudes. Timestamps are
//! RFC-3339 only.

use std::time::Duration;

use chrono::{DateTime, FixedOffset, SecondsFormat};
use thiserror::Error;

/// Timestamp as accepted by the Prometheus HTTP API
pub type Timestamp = DateTime<FixedOffset>;

const MS_PER_SECOND: u64 = 1_000;
const MS_PER_MINUTE: u64 = 60 * MS_PER_SECOND;
const MS_PER_HOUR: u64 = 60 * MS_PER_MINUTE;
const MS_PER_DAY: u64 = 24 * MS_PER_HOUR;
const MS_PER_WEEK: u64 = 7 * MS_PER_DAY;
const MS_PER_YEAR: u64 = 365 * MS_PER_DAY;

/// Units in the order they must appear, with their size in milliseconds.
/// `ms` is listed before `m` only for matching; ordering uses the rank.
const UNITS: &[(&str, u64, u8)] = &[
    ("ms", 1, 6),
    ("y", MS_PER_YEAR, 0),
    ("w", MS_PER_WEEK, 1),
    ("d", MS_PER_DAY, 2),
    ("h", MS_PER_HOUR, 3),
    ("m", MS_PER_MINUTE, 4),
    ("s", MS_PER_SECOND, 5),
];

/// Duration literal parse failure
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DurationError {
    /// Empty input
    #[error("empty duration string")]
    Empty,
    /// Input does not match the duration grammar
    #[error("not a valid duration string: {0:?}")]
    Invalid(String),
    /// Magnitude does not fit in 64 bits of milliseconds
    #[error("duration out of range: {0:?}")]
    Overflow(String),
}

/// Parse a Prometheus duration literal such as `15s`, `1h30m` or `0`.
pub fn parse_duration(input: &str) -> Result<Duration, DurationError> {
    if input.is_empty() {
        return Err(DurationError::Empty);
    }
    if input == "0" {
        return Ok(Duration::ZERO);
    }

    let invalid = || DurationError::Invalid(input.to_string());
    let overflow = || DurationError::Overflow(input.to_string());

    let mut rest = input;
    let mut total: u64 = 0;
    let mut last_rank: Option<u8> = None;

    while !rest.is_empty() {
        let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
        if digits == 0 {
            return Err(invalid());
        }
        let magnitude: u64 = rest[..digits].parse().map_err(|_| overflow())?;
        rest = &rest[digits..];

        let &(unit, size, rank) = UNITS
            .iter()
            .find(|(unit, _, _)| rest.starts_with(unit))
            .ok_or_else(invalid)?;
        if last_rank.is_some_and(|last| rank <= last) {
            return Err(invalid());
        }
        last_rank = Some(rank);
        rest = &rest[unit.len()..];

        let part = magnitude.checked_mul(size).ok_or_else(overflow)?;
        total = total.checked_add(part).ok_or_else(overflow)?;
    }

    Ok(Duration::from_millis(total))
}

/// Render a duration the way Prometheus prints it.
///
/// Years, weeks and days are only used when they divide the remainder evenly.
/// Sub-millisecond precision is dropped.
#[must_use]
pub fn format_duration(duration: Duration) -> String {
    let mut ms = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
    if ms == 0 {
        return "0s".to_string();
    }

    let mut out = String::new();
    for (unit, size, exact) in [
        ("y", MS_PER_YEAR, true),
        ("w", MS_PER_WEEK, true),
        ("d", MS_PER_DAY, true),
        ("h", MS_PER_HOUR, false),
        ("m", MS_PER_MINUTE, false),
        ("s", MS_PER_SECOND, false),
        ("ms", 1, false),
    ] {
        if exact && ms % size != 0 {
            continue;
        }
        let count = ms / size;
        if count > 0 {
            out.push_str(&count.to_string());
            out.push_str(unit);
            ms -= count * size;
        }
    }
    out
}

/// Parse an RFC-3339 timestamp, keeping its offset.
pub fn parse_timestamp(input: &str) -> Result<Timestamp, chrono::ParseError> {
    DateTime::parse_from_rfc3339(input)
}

/// Render a timestamp as RFC-3339, using `Z` for UTC and only as many
/// fractional digits as needed.
#[must_use]
pub fn format_timestamp(ts: &Timestamp) -> String {
    ts.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}
