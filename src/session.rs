//! A logging session on one serial port.
//!
//! The session opens the port, starts a reader thread that turns incoming
//! data into [`Record`]s and writes those records from the calling thread
//! until its [`CancelToken`] is cancelled. In polling mode the calling thread
//! additionally writes the poll command to the port once per interval.
//!
//! ```text
//! Idle -> Open -> Listening | Polling -> Closing -> Closed
//! ```
//!
//! `Closed` is reached on every path out of [`Session::run`], including a
//! failure to open the port.

use std::io;
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, SyncSender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use log::{debug, error, warn};
use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};

use crate::cancel::CancelToken;
use crate::clock;
use crate::reader::{PortReader, ReadMode};
use crate::rotation::RotationMode;
use crate::sink::{Record, Recorder};
use crate::{Error, Result};

/// File name prefix used when none is given.
pub const DEFAULT_PREFIX: &str = "serialData";

/// Read and write timeout of the port.
pub const PORT_TIMEOUT: Duration = Duration::from_millis(500);

/// Interval between two poll commands.
pub const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Extra wait before draining a burst in buffer mode while polling, giving
/// the device time to finish its response.
pub const BUFFER_SETTLE: Duration = Duration::from_millis(100);

/// Records waiting between the reader thread and the writer.
const QUEUE_DEPTH: usize = 64;

/// Upper bound for one wait of the main loop on the record queue.
const TICK: Duration = Duration::from_millis(100);

/// Everything needed to run a session. Not changed once the session starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    pub port: String,
    pub baud_rate: u32,
    pub prefix: String,
    pub rotation: RotationMode,
    /// Command written to the port every [`POLL_INTERVAL`]; `None` listens only.
    pub command: Option<String>,
    pub read_mode: ReadMode,
    /// Directory the log files are created in.
    pub directory: PathBuf,
}

impl SessionConfig {
    pub fn new<T: Into<String>>(port: T, baud_rate: u32) -> Self {
        SessionConfig {
            port: port.into(),
            baud_rate,
            prefix: DEFAULT_PREFIX.to_string(),
            rotation: RotationMode::default(),
            command: None,
            read_mode: ReadMode::default(),
            directory: PathBuf::from("."),
        }
    }
}

/// Where a session is in its life cycle.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Phase {
    /// Created, the port is not opened yet
    Idle,
    /// Port opened, the reader is being started
    Open,
    /// Logging whatever the device sends
    Listening,
    /// Logging while writing the poll command every [`POLL_INTERVAL`]
    Polling,
    /// Cancelled, remaining records are written and the reader is stopped
    Closing,
    /// Port released; final on every path out of [`Session::run`]
    Closed,
}

#[derive(Debug)]
pub struct Session {
    config: SessionConfig,
    phase: Phase,
}

impl Session {
    pub fn new(config: SessionConfig) -> Self {
        Session {
            config,
            phase: Phase::Idle,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Runs the session until `cancel` is cancelled.
    ///
    /// Only a failure to open the port (or to hand it to the reader thread)
    /// ends the session with an error. Read, write and file errors are logged
    /// and the session carries on.
    pub fn run(&mut self, cancel: &CancelToken) -> Result<()> {
        let Session { config, phase } = self;
        let mut phase = scopeguard::guard(phase, |phase| {
            *phase = Phase::Closed;
            debug!("session closed");
            println!("Serial port closed. Exiting...");
        });

        let started = clock::now();
        let mut port = reported(open_port(config), "Failed to open the serial port")?;
        **phase = Phase::Open;
        debug!("opened {} at {} baud", config.port, config.baud_rate);

        let reader_port = reported(
            port.try_clone().map_err(Error::from),
            "Failed to start reading from the serial port",
        )?;
        let settle = match config.command {
            Some(_) => BUFFER_SETTLE,
            None => Duration::ZERO,
        };
        let reader = PortReader::new(reader_port, config.read_mode, settle);
        let (records, queue) = mpsc::sync_channel(QUEUE_DEPTH);
        let reader_thread = spawn_reader(reader, records, cancel.clone());

        let mut recorder = Recorder::new(
            &config.directory,
            config.prefix.as_str(),
            config.rotation,
            started,
        );
        match &config.command {
            Some(command) => {
                **phase = Phase::Polling;
                println!(
                    "Polling the serial port with '{}'. Press 'q' and Enter to quit.",
                    command
                );
                poll(port.as_mut(), command, &queue, &mut recorder, cancel);
            }
            None => {
                **phase = Phase::Listening;
                println!("Listening to the serial port. Press 'q' and Enter to quit.");
                listen(&queue, &mut recorder, cancel);
            }
        }

        **phase = Phase::Closing;
        cancel.cancel();
        // Ends once the reader notices the cancellation and drops its sender.
        for record in queue.iter() {
            log_record(&mut recorder, &record);
        }
        if reader_thread.join().is_err() {
            error!("serial reader thread panicked");
        }
        Ok(())
    }
}

/// Logs a fatal session error and prefixes it with `context`.
fn reported<T>(result: Result<T>, context: &str) -> Result<T> {
    result.map_err(|e| {
        let e = Error::new(e.kind(), format!("{}: {}", context, e));
        error!("{}", e);
        e
    })
}

fn open_port(config: &SessionConfig) -> Result<Box<dyn SerialPort>> {
    let port = serialport::new(config.port.as_str(), config.baud_rate)
        .data_bits(DataBits::Eight)
        .parity(Parity::None)
        .stop_bits(StopBits::One)
        .flow_control(FlowControl::None)
        .timeout(PORT_TIMEOUT)
        .open()?;
    Ok(port)
}

fn spawn_reader(
    mut reader: PortReader<Box<dyn SerialPort>>,
    records: SyncSender<Record>,
    cancel: CancelToken,
) -> JoinHandle<()> {
    thread::spawn(move || {
        debug!("reader started in {} mode", reader.mode());
        while !cancel.is_cancelled() {
            match reader.next_payload() {
                Ok(Some(payload)) => {
                    if records.send(Record::new(clock::now(), payload)).is_err() {
                        break;
                    }
                }
                Ok(None) => {}
                Err(e) if e.kind() == io::ErrorKind::TimedOut => {
                    warn!("Error: serial port timeout");
                }
                Err(e) => {
                    warn!("Error while processing data: {}", e);
                    // Keep a dead port from turning this into a busy loop.
                    thread::sleep(PORT_TIMEOUT);
                }
            }
        }
        debug!("reader stopped");
    })
}

fn listen(queue: &Receiver<Record>, recorder: &mut Recorder, cancel: &CancelToken) {
    while !cancel.is_cancelled() {
        match queue.recv_timeout(TICK) {
            Ok(record) => log_record(recorder, &record),
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
}

fn poll(
    port: &mut dyn SerialPort,
    command: &str,
    queue: &Receiver<Record>,
    recorder: &mut Recorder,
    cancel: &CancelToken,
) {
    let mut next_poll = Instant::now();
    while !cancel.is_cancelled() {
        let now = Instant::now();
        if now >= next_poll {
            if let Err(e) = write_command(port, command) {
                warn!("Error while writing command: {}", e);
            }
            next_poll += POLL_INTERVAL;
            // Don't try to catch up on polls missed while the port was stuck.
            if next_poll < now {
                next_poll = now + POLL_INTERVAL;
            }
        }

        let wait = next_poll.saturating_duration_since(Instant::now()).min(TICK);
        match queue.recv_timeout(wait) {
            Ok(record) => log_record(recorder, &record),
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
}

fn write_command(port: &mut dyn SerialPort, command: &str) -> io::Result<()> {
    port.write_all(command.as_bytes())?;
    port.write_all(b"\n")?;
    port.flush()
}

fn log_record(recorder: &mut Recorder, record: &Record) {
    if let Some(name) = recorder.rotate(record.timestamp) {
        println!("Starting new file: {}", name);
    }
    match recorder.append(record) {
        Ok(_) => println!("Received: {}", record),
        Err(e) => error!("Error while processing data: {}", e),
    }
}
