//! Extracting payloads from the port byte stream.

use std::fmt;
use std::io::{self, Read};
use std::str::FromStr;
use std::thread;
use std::time::Duration;

use serialport::SerialPort;

use crate::{Error, ErrorKind};

const CHUNK_SIZE: usize = 1024;

/// Longest payload handed out at once. Longer lines, or bursts that keep
/// streaming, are split into several payloads of at most this size.
pub const MAX_PAYLOAD_LEN: usize = 64 * 1024;

/// Strategy for cutting the byte stream into records.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum ReadMode {
    /// One record per line terminated by `\n`
    #[default]
    Line,
    /// One record per burst of data, whatever bytes are available
    Buffer,
}

impl fmt::Display for ReadMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReadMode::Line => write!(f, "Line"),
            ReadMode::Buffer => write!(f, "Buffer"),
        }
    }
}

impl FromStr for ReadMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "line" => Ok(ReadMode::Line),
            "buffer" => Ok(ReadMode::Buffer),
            _ => Err(Error::new(
                ErrorKind::InvalidInput,
                format!("unknown read mode '{}' (expected Line or Buffer)", s),
            )),
        }
    }
}

/// A byte stream that can tell how much data is waiting to be read.
///
/// `read` is expected to block until at least one byte arrives or the
/// source's timeout elapses, in which case it fails with
/// [`io::ErrorKind::TimedOut`].
pub trait DataSource: Read {
    fn bytes_to_read(&self) -> io::Result<u32>;
}

impl DataSource for Box<dyn SerialPort> {
    fn bytes_to_read(&self) -> io::Result<u32> {
        SerialPort::bytes_to_read(self.as_ref()).map_err(io::Error::from)
    }
}

/// Reads payloads from a [`DataSource`] according to a [`ReadMode`].
#[derive(Debug)]
pub struct PortReader<S> {
    source: S,
    mode: ReadMode,
    settle: Duration,
    pending: Vec<u8>,
}

impl<S: DataSource> PortReader<S> {
    /// `settle` is how long buffer mode waits after the first byte of a burst
    /// before draining the rest of it.
    pub fn new(source: S, mode: ReadMode, settle: Duration) -> Self {
        PortReader {
            source,
            mode,
            settle,
            pending: Vec::new(),
        }
    }

    pub fn mode(&self) -> ReadMode {
        self.mode
    }

    /// Waits for the next payload.
    ///
    /// Returns `Ok(None)` if nothing (or only line terminators) arrived before
    /// the source timed out.
    pub fn next_payload(&mut self) -> io::Result<Option<String>> {
        match self.mode {
            ReadMode::Line => self.read_line(),
            ReadMode::Buffer => self.read_buffer(),
        }
    }

    fn read_line(&mut self) -> io::Result<Option<String>> {
        if let Some(line) = self.take_line() {
            return Ok(non_empty(line));
        }

        let mut chunk = [0u8; CHUNK_SIZE];
        match self.source.read(&mut chunk) {
            Ok(n) => self.pending.extend_from_slice(&chunk[..n]),
            // Nothing started yet, so there is nothing to time out on.
            Err(e) if e.kind() == io::ErrorKind::TimedOut && self.pending.is_empty() => {
                return Ok(None)
            }
            Err(e) => return Err(e),
        }

        Ok(self.take_line().and_then(non_empty))
    }

    fn take_line(&mut self) -> Option<String> {
        let end = match self.pending.iter().position(|&b| b == b'\n') {
            Some(newline) => newline + 1,
            None if self.pending.len() >= MAX_PAYLOAD_LEN => MAX_PAYLOAD_LEN,
            None => return None,
        };
        let line: Vec<u8> = self.pending.drain(..end).collect();
        Some(String::from_utf8_lossy(&line).into_owned())
    }

    fn read_buffer(&mut self) -> io::Result<Option<String>> {
        let mut chunk = [0u8; CHUNK_SIZE];
        let mut data = match self.source.read(&mut chunk) {
            Ok(n) => chunk[..n].to_vec(),
            Err(e) if e.kind() == io::ErrorKind::TimedOut => return Ok(None),
            Err(e) => return Err(e),
        };
        if data.is_empty() {
            return Ok(None);
        }

        if !self.settle.is_zero() {
            thread::sleep(self.settle);
        }
        while data.len() < MAX_PAYLOAD_LEN {
            let available = self.source.bytes_to_read()? as usize;
            if available == 0 {
                break;
            }
            let mut rest = vec![0u8; available.min(MAX_PAYLOAD_LEN - data.len())];
            self.source.read_exact(&mut rest)?;
            data.extend_from_slice(&rest);
        }

        Ok(non_empty(String::from_utf8_lossy(&data).into_owned()))
    }
}

/// Drops trailing line terminators, treating a payload of only terminators as no payload.
fn non_empty(mut payload: String) -> Option<String> {
    let trimmed = payload.trim_end_matches(&['\r', '\n'][..]).len();
    payload.truncate(trimmed);
    if payload.is_empty() {
        None
    } else {
        Some(payload)
    }
}
