//! Wall clock helpers for rotation buckets.
//!
//! All times are local naive date-times: file names and record timestamps
//! are written in the operator's local time without an offset.

use chrono::{Duration, Local, NaiveDateTime, NaiveTime, Timelike};

/// Current local wall clock time.
pub fn now() -> NaiveDateTime {
    Local::now().naive_local()
}

/// Start of the hour containing `t`.
pub fn truncate_to_hour(t: NaiveDateTime) -> NaiveDateTime {
    truncate_to_day(t) + Duration::hours(i64::from(t.hour()))
}

/// Start of the day containing `t`.
pub fn truncate_to_day(t: NaiveDateTime) -> NaiveDateTime {
    t.date().and_time(NaiveTime::default())
}
