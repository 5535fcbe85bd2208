//! Date values in feeds.
//!
//! Only three shapes are understood, recognized by pattern alone:
//! - `YYYYMMDD`: a date, meaning local midnight
//! - `YYYYMMDDTHHMMSSZ`: a UTC instant
//! - `YYYYMMDDTHHMMSS`: a naive local time
//!
//! TZID parameters are dropped before values get here, so zoned times are
//! read as local.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedDate {
    Date(NaiveDate),
    Utc(DateTime<Utc>),
    Floating(NaiveDateTime),
}

impl FeedDate {
    /// Recognize one of the three value shapes. Anything else is `None`.
    pub fn parse(value: &str) -> Option<FeedDate> {
        let value = value.trim();
        let bytes = value.as_bytes();
        let digits = |range: std::ops::Range<usize>| bytes[range].iter().all(u8::is_ascii_digit);

        match bytes.len() {
            8 if digits(0..8) => NaiveDate::parse_from_str(value, "%Y%m%d")
                .ok()
                .map(FeedDate::Date),
            15 if digits(0..8) && bytes[8] == b'T' && digits(9..15) => {
                NaiveDateTime::parse_from_str(value, "%Y%m%dT%H%M%S")
                    .ok()
                    .map(FeedDate::Floating)
            }
            16 if digits(0..8) && bytes[8] == b'T' && digits(9..15) && bytes[15] == b'Z' => {
                NaiveDateTime::parse_from_str(&value[..15], "%Y%m%dT%H%M%S")
                    .ok()
                    .map(|dt| FeedDate::Utc(dt.and_utc()))
            }
            _ => None,
        }
    }

    pub fn is_date(&self) -> bool {
        matches!(self, FeedDate::Date(_))
    }

    /// Resolve to an instant, reading dates and naive times in `tz`.
    pub fn to_utc(&self, tz: Tz) -> DateTime<Utc> {
        match self {
            FeedDate::Utc(dt) => *dt,
            FeedDate::Date(d) => local_to_utc(d.and_time(chrono::NaiveTime::MIN), tz),
            FeedDate::Floating(dt) => local_to_utc(*dt, tz),
        }
    }
}

/// Ambiguous times take the earlier instant; times skipped by a DST jump
/// move forward by an hour.
fn local_to_utc(naive: NaiveDateTime, tz: Tz) -> DateTime<Utc> {
    tz.from_local_datetime(&naive)
        .earliest()
        .or_else(|| tz.from_local_datetime(&(naive + Duration::hours(1))).earliest())
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|| naive.and_utc())
}
