//! Timestamp parsing and quantization helpers
//!
//! All instants in the snapshot data are naive local timestamps in one
//! fixed format; flooring never crosses a date boundary except the week
//! floor, which walks back to the Monday of the ISO week.

use chrono::{Datelike, Duration, NaiveDateTime, Timelike};
use slotwatch_domain::constants::{BUCKET_MINUTES, TIMESTAMP_FORMAT};
use slotwatch_domain::{Result, SlotwatchError};

/// Parse a row timestamp or target-date label.
pub(crate) fn parse_timestamp(label: &str) -> Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(label, TIMESTAMP_FORMAT)
        .map_err(|_| SlotwatchError::InvalidTimestamp(label.to_string()))
}

fn with_hm(ts: NaiveDateTime, hour: u32, minute: u32) -> NaiveDateTime {
    ts.date().and_hms_opt(hour, minute, 0).unwrap_or(ts)
}

/// Floor to the preceding 15-minute attribution bucket.
pub(crate) fn floor_to_bucket(ts: NaiveDateTime) -> NaiveDateTime {
    with_hm(ts, ts.hour(), ts.minute() - ts.minute() % BUCKET_MINUTES)
}

/// Zero out minutes and seconds.
pub(crate) fn floor_to_hour(ts: NaiveDateTime) -> NaiveDateTime {
    with_hm(ts, ts.hour(), 0)
}

/// Floor to midnight.
pub(crate) fn floor_to_day(ts: NaiveDateTime) -> NaiveDateTime {
    with_hm(ts, 0, 0)
}

/// Floor to the Monday midnight of the instant's ISO week.
pub(crate) fn floor_to_week(ts: NaiveDateTime) -> NaiveDateTime {
    floor_to_day(ts) - Duration::days(i64::from(ts.weekday().num_days_from_monday()))
}
