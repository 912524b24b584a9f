//! serial-logger writes everything a device sends over a serial port into
//! timestamped text files.
//!
//! Each record is one line of the form `yy-MM-dd HH:mm:ss,payload` appended to
//! a file named `{prefix}_{yyMMddHHmmss}.txt`. Depending on the
//! [`RotationMode`] a session keeps one file or starts a new one every hour or
//! every day.
//!
//! A session either listens passively or polls the device by writing a fixed
//! command once per second:
//!
//! ```no_run
//! use serial_logger::{CancelToken, ReadMode, Session, SessionConfig};
//!
//! let mut config = SessionConfig::new("/dev/ttyUSB0", 9600);
//! config.command = Some("MEAS?".to_string());
//! config.read_mode = ReadMode::Buffer;
//!
//! let cancel = CancelToken::new();
//! Session::new(config).run(&cancel)?;
//! # Ok::<(), serial_logger::Error>(())
//! ```

#![deny(missing_debug_implementations, missing_copy_implementations)]
// Don't worry about needing to `unwrap()` or otherwise handle some results in
// doc tests.
#![doc(test(attr(allow(unused_must_use))))]

mod cancel;
pub mod clock;
pub mod console;
mod error;
pub mod reader;
pub mod rotation;
pub mod session;
pub mod sink;

pub use crate::cancel::CancelToken;
pub use crate::error::{Error, ErrorKind, Result};
pub use crate::reader::ReadMode;
pub use crate::rotation::RotationMode;
pub use crate::session::{Phase, Session, SessionConfig};
pub use crate::sink::Record;
