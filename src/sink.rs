//! Appending timestamped records to the active log file.

use std::fmt;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;

use crate::rotation::{self, RotationMode};

/// `chrono` format of the timestamp leading every record.
pub const RECORD_TIMESTAMP_FORMAT: &str = "%y-%m-%d %H:%M:%S";

cfg_if::cfg_if! {
    if #[cfg(windows)] {
        /// Terminator written after every record.
        pub const LINE_ENDING: &str = "\r\n";
    } else {
        /// Terminator written after every record.
        pub const LINE_ENDING: &str = "\n";
    }
}

/// One piece of data received from the port, stamped with the time it was read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// Local wall-clock time the payload was read at
    pub timestamp: NaiveDateTime,
    /// Received text without its trailing line terminators
    pub payload: String,
}

impl Record {
    pub fn new<T: Into<String>>(timestamp: NaiveDateTime, payload: T) -> Self {
        Record {
            timestamp,
            payload: payload.into(),
        }
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{},{}",
            self.timestamp.format(RECORD_TIMESTAMP_FORMAT),
            self.payload
        )
    }
}

/// Appends a single record to the file at `path`, creating the file if needed.
///
/// The file is opened and closed for every record so nothing stays buffered
/// between calls.
pub fn append_record(path: &Path, timestamp: NaiveDateTime, payload: &str) -> io::Result<()> {
    let line = format!("{}{}", Record::new(timestamp, payload), LINE_ENDING);
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    file.write_all(line.as_bytes())?;
    file.flush()
}

/// Tracks which log file is active and writes records into it.
#[derive(Debug)]
pub struct Recorder {
    directory: PathBuf,
    prefix: String,
    mode: RotationMode,
    started: NaiveDateTime,
    active: Option<String>,
}

impl Recorder {
    pub fn new<P, S>(directory: P, prefix: S, mode: RotationMode, started: NaiveDateTime) -> Self
    where
        P: Into<PathBuf>,
        S: Into<String>,
    {
        Recorder {
            directory: directory.into(),
            prefix: prefix.into(),
            mode,
            started,
            active: None,
        }
    }

    /// Name of the file records are currently written to, if any was started.
    pub fn active_file(&self) -> Option<&str> {
        self.active.as_deref()
    }

    /// Recomputes the file name for `now`.
    ///
    /// Returns the new name only when it differs from the active one, which
    /// is also the case for the very first record of a session.
    pub fn rotate(&mut self, now: NaiveDateTime) -> Option<&str> {
        let name = rotation::file_name(self.mode, self.started, now, &self.prefix);
        if self.active.as_deref() == Some(name.as_str()) {
            return None;
        }
        self.active = Some(name);
        self.active.as_deref()
    }

    /// Appends `record` to the active file and returns the path written to.
    pub fn append(&mut self, record: &Record) -> io::Result<PathBuf> {
        let name = self.active.get_or_insert_with(|| {
            rotation::file_name(self.mode, self.started, record.timestamp, &self.prefix)
        });
        let path = self.directory.join(name.as_str());
        append_record(&path, record.timestamp, &record.payload)?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};
    use std::fs;
    use tempfile::TempDir;

    fn ymd_hms(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, mo, d)
            .unwrap()
            .and_hms_opt(h, mi, s)
            .unwrap()
    }

    #[test]
    fn record_format() {
        let record = Record::new(ymd_hms(2024, 1, 5, 9, 3, 7), "T=21.5");
        assert_eq!(record.to_string(), "24-01-05 09:03:07,T=21.5");
    }

    #[test]
    fn append_keeps_every_record_in_order() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.txt");
        let start = ymd_hms(2024, 1, 1, 12, 0, 0);

        for i in 0..5 {
            append_record(&path, start + Duration::seconds(i), &format!("line {}", i)).unwrap();
        }

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(
            lines,
            [
                "24-01-01 12:00:00,line 0",
                "24-01-01 12:00:01,line 1",
                "24-01-01 12:00:02,line 2",
                "24-01-01 12:00:03,line 3",
                "24-01-01 12:00:04,line 4",
            ]
        );
        assert!(content.ends_with(LINE_ENDING));
    }

    #[test]
    fn append_to_missing_directory_fails() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing").join("out.txt");
        let start = ymd_hms(2024, 1, 1, 12, 0, 0);
        assert!(append_record(&path, start, "lost").is_err());
    }

    #[test]
    fn rotation_notice_fires_only_on_change() {
        let start = ymd_hms(2024, 1, 1, 10, 59, 58);
        let mut recorder = Recorder::new(".", "x", RotationMode::Hourly, start);
        assert_eq!(recorder.active_file(), None);

        assert_eq!(recorder.rotate(start), Some("x_240101105958.txt"));
        assert_eq!(recorder.rotate(ymd_hms(2024, 1, 1, 10, 59, 59)), None);
        assert_eq!(
            recorder.rotate(ymd_hms(2024, 1, 1, 11, 0, 1)),
            Some("x_240101110000.txt")
        );
        assert_eq!(recorder.rotate(ymd_hms(2024, 1, 1, 11, 30, 0)), None);
        assert_eq!(recorder.active_file(), Some("x_240101110000.txt"));
    }

    #[test]
    fn single_mode_never_rotates_after_first_record() {
        let start = ymd_hms(2024, 1, 1, 23, 59, 0);
        let mut recorder = Recorder::new(".", "serialData", RotationMode::Single, start);
        assert!(recorder.rotate(start).is_some());
        for hours in 1..72 {
            assert_eq!(recorder.rotate(start + Duration::hours(hours)), None);
        }
    }

    #[test]
    fn recorder_writes_into_rotated_files() {
        let dir = TempDir::new().unwrap();
        let start = ymd_hms(2024, 1, 1, 10, 59, 58);
        let mut recorder = Recorder::new(dir.path(), "x", RotationMode::Hourly, start);

        for record in [
            Record::new(ymd_hms(2024, 1, 1, 10, 59, 59), "a"),
            Record::new(ymd_hms(2024, 1, 1, 11, 0, 1), "b"),
            Record::new(ymd_hms(2024, 1, 1, 11, 0, 2), "c"),
        ] {
            recorder.rotate(record.timestamp);
            recorder.append(&record).unwrap();
        }

        let first = fs::read_to_string(dir.path().join("x_240101105958.txt")).unwrap();
        let second = fs::read_to_string(dir.path().join("x_240101110000.txt")).unwrap();
        assert_eq!(first.lines().collect::<Vec<_>>(), ["24-01-01 10:59:59,a"]);
        assert_eq!(
            second.lines().collect::<Vec<_>>(),
            ["24-01-01 11:00:01,b", "24-01-01 11:00:02,c"]
        );
    }

    #[test]
    fn append_without_rotate_starts_a_file() {
        let dir = TempDir::new().unwrap();
        let start = ymd_hms(2024, 6, 1, 8, 0, 0);
        let mut recorder = Recorder::new(dir.path(), "dev", RotationMode::Daily, start);

        let path = recorder
            .append(&Record::new(start + Duration::seconds(3), "ok"))
            .unwrap();
        assert_eq!(path, dir.path().join("dev_240601080000.txt"));
        assert_eq!(recorder.active_file(), Some("dev_240601080000.txt"));
    }
}
