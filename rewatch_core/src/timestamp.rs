// src/timestamp.rs
//
// Normalizes the heterogeneous timestamp shapes the automation agent reports
// into timezone-aware UTC instants. Naive instants are taken as already being
// UTC and tagged as such, never reinterpreted in another zone.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::RecordRejection;

/// Instants up to this many minutes in the future are absorbed as
/// network/agent latency and clamped to `now`; anything further fails
/// validation.
pub const FUTURE_SKEW_TOLERANCE_MINUTES: i64 = 5;

/// Normalize a raw timestamp value against a reference instant.
///
/// Symbolic labels ("today 15:45", "yesterday at 3:45 PM") resolve relative
/// to `now`, not to anything else in the record. Callers outside of tests
/// pass `Utc::now()`.
pub fn normalize(raw: &str, now: DateTime<Utc>) -> Result<DateTime<Utc>, RecordRejection> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(RecordRejection::TimestampParse {
            raw: raw.to_string(),
        });
    }

    let parsed = parse_instant(trimmed, now).ok_or_else(|| RecordRejection::TimestampParse {
        raw: raw.to_string(),
    })?;

    if parsed <= now {
        Ok(parsed)
    } else if parsed - now <= Duration::minutes(FUTURE_SKEW_TOLERANCE_MINUTES) {
        Ok(now)
    } else {
        Err(RecordRejection::TimestampParse {
            raw: raw.to_string(),
        })
    }
}

fn parse_instant(raw: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    // Full RFC 3339 / ISO-8601 with an explicit offset.
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    if let Some(dt) = parse_symbolic(raw, now) {
        return Some(dt);
    }

    // Naive date-times, assumed UTC.
    static DATETIME_FORMATS: Lazy<Vec<&'static str>> = Lazy::new(|| {
        vec![
            "%Y-%m-%dT%H:%M:%S%.f",
            "%Y-%m-%dT%H:%M:%S",
            "%Y-%m-%dT%H:%M",
            "%Y-%m-%d %H:%M:%S",
            "%Y-%m-%d %H:%M",
        ]
    });

    for format in DATETIME_FORMATS.iter() {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }

    // Bare dates resolve to midnight UTC.
    static DATE_FORMATS: Lazy<Vec<&'static str>> = Lazy::new(|| {
        vec![
            "%Y-%m-%d",
            "%b %e, %Y",
            "%b %d, %Y",
            "%B %e, %Y",
            "%B %d, %Y",
        ]
    });

    for format in DATE_FORMATS.iter() {
        if let Ok(date) = NaiveDate::parse_from_str(raw, format) {
            return Some(Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN)));
        }
    }

    None
}

// "today 15:45", "yesterday at 3:45 PM", "Yesterday 15:45:30"
fn parse_symbolic(raw: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    static SYMBOLIC_RE: Lazy<Regex> = Lazy::new(|| {
        Regex::new(
            r"(?i)^(?P<day>today|yesterday)(?:\s+at)?\s+(?P<hour>\d{1,2}):(?P<min>\d{2})(?::(?P<sec>\d{2}))?\s*(?P<ampm>am|pm)?$",
        )
        .unwrap()
    });

    let caps = SYMBOLIC_RE.captures(raw)?;

    let mut hour: u32 = caps.name("hour")?.as_str().parse().ok()?;
    let minute: u32 = caps.name("min")?.as_str().parse().ok()?;
    let second: u32 = match caps.name("sec") {
        Some(m) => m.as_str().parse().ok()?,
        None => 0,
    };

    if let Some(ampm) = caps.name("ampm") {
        let pm = ampm.as_str().eq_ignore_ascii_case("pm");
        hour = match (hour, pm) {
            (12, false) => 0,
            (12, true) => 12,
            (h, false) => h,
            (h, true) => h + 12,
        };
    }

    let date = if caps.name("day")?.as_str().eq_ignore_ascii_case("yesterday") {
        now.date_naive() - Duration::days(1)
    } else {
        now.date_naive()
    };

    let time = NaiveTime::from_hms_opt(hour, minute, second)?;
    Some(Utc.from_utc_datetime(&date.and_time(time)))
}
