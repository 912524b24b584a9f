//! Operator console: prompts for missing settings and the quit command.

use std::io::{self, BufRead, Write};
use std::thread::{self, JoinHandle};

use log::debug;

use crate::cancel::CancelToken;
use crate::{Error, ErrorKind, Result};

cfg_if::cfg_if! {
    if #[cfg(windows)] {
        const PORT_EXAMPLE: &str = "COM3";
    } else if #[cfg(any(target_os = "ios", target_os = "macos"))] {
        const PORT_EXAMPLE: &str = "/dev/cu.usbserial";
    } else {
        const PORT_EXAMPLE: &str = "/dev/ttyUSB0";
    }
}

/// Asks for the serial port name.
pub fn prompt_port<R: BufRead, W: Write>(input: &mut R, output: &mut W) -> Result<String> {
    writeln!(output, "Enter the serial port (e.g. {}):", PORT_EXAMPLE)?;
    output.flush()?;

    let port = read_answer(input)?;
    if port.is_empty() {
        return Err(Error::new(ErrorKind::InvalidInput, "Invalid port name"));
    }
    Ok(port)
}

/// Asks for the baud rate, which has to be a positive integer.
pub fn prompt_baud<R: BufRead, W: Write>(input: &mut R, output: &mut W) -> Result<u32> {
    writeln!(output, "Enter the baud rate (e.g. 9600, 19200):")?;
    output.flush()?;

    match read_answer(input)?.parse::<u32>() {
        Ok(baud) if baud > 0 => Ok(baud),
        _ => Err(Error::new(ErrorKind::InvalidInput, "Invalid baud rate")),
    }
}

fn read_answer<R: BufRead>(input: &mut R) -> Result<String> {
    let mut line = String::new();
    input.read_line(&mut line)?;
    Ok(line.trim().to_string())
}

/// Whether an input line asks to quit.
pub fn is_quit(line: &str) -> bool {
    line.trim().eq_ignore_ascii_case("q")
}

/// Cancels `cancel` once `q` is entered on stdin.
///
/// The thread blocks on stdin and is not joined; it ends with the process.
/// Without a console (stdin closed) it stops watching and leaves the session
/// to Ctrl-C.
pub fn spawn_quit_watcher(cancel: CancelToken) -> JoinHandle<()> {
    thread::spawn(move || {
        let stdin = io::stdin();
        watch_for_quit(stdin.lock(), &cancel);
    })
}

fn watch_for_quit<R: BufRead>(input: R, cancel: &CancelToken) {
    for line in input.lines() {
        match line {
            Ok(line) if is_quit(&line) => {
                cancel.cancel();
                return;
            }
            Ok(_) => {}
            Err(e) => {
                debug!("console input failed: {}", e);
                return;
            }
        }
    }
    debug!("console closed, no longer watching for 'q'");
}
