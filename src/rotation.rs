//! File name policy.
//!
//! A session writes into `{prefix}_{yyMMddHHmmss}.txt`. The time in the name
//! is the session start while the session is still in its first rotation
//! bucket, and the start of the bucket after that. Every record in one bucket
//! therefore lands in the same file, and the name only changes when a bucket
//! boundary is crossed.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;

use crate::clock::{truncate_to_day, truncate_to_hour};
use crate::{Error, ErrorKind};

/// `chrono` format of the time embedded in log file names.
pub const FILE_TIMESTAMP_FORMAT: &str = "%y%m%d%H%M%S";

/// How often a new log file is started.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum RotationMode {
    /// One file for the whole session
    #[default]
    Single,
    /// A new file at the start of every hour
    Hourly,
    /// A new file at the start of every day
    Daily,
}

impl RotationMode {
    /// Start of the bucket containing `t`, or `None` if the mode never rotates.
    fn bucket(self, t: NaiveDateTime) -> Option<NaiveDateTime> {
        match self {
            RotationMode::Single => None,
            RotationMode::Hourly => Some(truncate_to_hour(t)),
            RotationMode::Daily => Some(truncate_to_day(t)),
        }
    }
}

impl fmt::Display for RotationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RotationMode::Single => write!(f, "One"),
            RotationMode::Hourly => write!(f, "Hourly"),
            RotationMode::Daily => write!(f, "Daily"),
        }
    }
}

impl FromStr for RotationMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "one" | "single" => Ok(RotationMode::Single),
            "hourly" => Ok(RotationMode::Hourly),
            "daily" => Ok(RotationMode::Daily),
            _ => Err(Error::new(
                ErrorKind::InvalidInput,
                format!("unknown file mode '{}' (expected One, Hourly or Daily)", s),
            )),
        }
    }
}

/// Name of the log file that a record written at `now` belongs to.
pub fn file_name(
    mode: RotationMode,
    start: NaiveDateTime,
    now: NaiveDateTime,
    prefix: &str,
) -> String {
    let stamp = match mode.bucket(now) {
        Some(bucket) if Some(bucket) != mode.bucket(start) => bucket,
        _ => start,
    };
    format!("{}_{}.txt", prefix, stamp.format(FILE_TIMESTAMP_FORMAT))
}
