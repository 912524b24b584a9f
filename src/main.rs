use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use log::{debug, error, warn};

use serial_logger::console;
use serial_logger::session::DEFAULT_PREFIX;
use serial_logger::{CancelToken, ReadMode, RotationMode, Session, SessionConfig};

/// Log timestamped serial port data to time-rotated text files.
#[derive(Debug, Parser)]
#[clap(version, about)]
struct Args {
    /// Serial port name (e.g. COM3 or /dev/ttyUSB0), asked for if missing
    #[clap(short, long)]
    port: Option<String>,
    /// Baud rate (e.g. 9600, 19200), asked for if missing
    #[clap(short, long)]
    baud: Option<u32>,
    /// Prefix of the log file names
    #[clap(long, default_value = DEFAULT_PREFIX)]
    prefix: String,
    /// File mode: One, Hourly or Daily
    #[clap(short, long, default_value = "One")]
    mode: RotationMode,
    /// Command written to the port once per second; listens only if missing
    #[clap(short, long)]
    command: Option<String>,
    /// Read mode: Line or Buffer
    #[clap(short, long, default_value = "Line")]
    read_mode: ReadMode,
    /// Directory the log files are written to
    #[clap(short, long, default_value = ".")]
    dir: PathBuf,
}

impl Args {
    /// Builds the session configuration, asking for the port and the baud
    /// rate on the console when they were not given.
    fn into_config<R: BufRead, W: Write>(
        self,
        input: &mut R,
        output: &mut W,
    ) -> serial_logger::Result<SessionConfig> {
        let port = match self.port.filter(|port| !port.trim().is_empty()) {
            Some(port) => port,
            None => console::prompt_port(input, output)?,
        };
        let baud_rate = match self.baud.filter(|&baud| baud > 0) {
            Some(baud) => baud,
            None => console::prompt_baud(input, output)?,
        };

        Ok(SessionConfig {
            port,
            baud_rate,
            prefix: self.prefix,
            rotation: self.mode,
            command: self.command,
            read_mode: self.read_mode,
            directory: self.dir,
        })
    }
}

/// Exit status once the arguments have been parsed.
///
/// Configuration and open failures have already been reported on the console
/// by then and end the program normally; only argument parsing errors (handled
/// by clap) exit with a non-zero status.
fn exit_status(outcome: &serial_logger::Result<()>) -> u8 {
    if let Err(e) = outcome {
        debug!("stopped early: {}", e);
    }
    0
}

fn run(config: SessionConfig) -> serial_logger::Result<()> {
    let cancel = CancelToken::new();
    let on_signal = cancel.clone();
    if let Err(e) = ctrlc::set_handler(move || on_signal.cancel()) {
        warn!("Ctrl-C handler not installed: {}", e);
    }
    console::spawn_quit_watcher(cancel.clone());

    Session::new(config).run(&cancel)
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    println!("serial-logger v{}\n", env!("CARGO_PKG_VERSION"));

    let args = Args::parse();
    // The stdin lock has to be released before the quit watcher takes it.
    let config = args.into_config(&mut io::stdin().lock(), &mut io::stdout());
    let outcome = match config {
        Ok(config) => run(config),
        Err(e) => {
            error!("{}. Exiting...", e);
            Err(e)
        }
    };

    ExitCode::from(exit_status(&outcome))
}
