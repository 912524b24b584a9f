use std::error::Error as StdError;
use std::fmt;
use std::io;

/// Categories of errors that can occur while running a logging session.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The configuration is incomplete or holds an invalid value (an empty
    /// port name, a zero baud rate, an unknown mode).
    InvalidInput,

    /// The serial port could not be found or is not available.
    NoDevice,

    /// An I/O error occurred while talking to the port or a log file.
    Io(io::ErrorKind),
}

/// An error type for the logger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Error {
    /// The kind of error this is
    pub kind: ErrorKind,
    /// A description of the error suitable for end-users
    pub description: String,
}

impl Error {
    /// Instantiates a new error
    pub fn new<T: Into<String>>(kind: ErrorKind, description: T) -> Self {
        Error {
            kind,
            description: description.into(),
        }
    }

    /// Returns the corresponding `ErrorKind` for this error.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }
}

impl fmt::Display for Error {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt.write_str(&self.description)
    }
}

impl StdError for Error {}

impl From<io::Error> for Error {
    fn from(io_error: io::Error) -> Error {
        Error::new(ErrorKind::Io(io_error.kind()), format!("{}", io_error))
    }
}

impl From<serialport::Error> for Error {
    fn from(error: serialport::Error) -> Error {
        let kind = match error.kind() {
            serialport::ErrorKind::NoDevice => ErrorKind::NoDevice,
            serialport::ErrorKind::InvalidInput => ErrorKind::InvalidInput,
            serialport::ErrorKind::Io(kind) => ErrorKind::Io(kind),
            serialport::ErrorKind::Unknown => ErrorKind::Io(io::ErrorKind::Other),
        };
        Error::new(kind, error.description)
    }
}

/// A type for results generated by the logger.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_error_keeps_its_kind() {
        let error: Error = io::Error::new(io::ErrorKind::TimedOut, "operation timed out").into();
        assert_eq!(error.kind(), ErrorKind::Io(io::ErrorKind::TimedOut));
        assert_eq!(error.to_string(), "operation timed out");
    }

    #[test]
    fn serialport_no_device_maps_to_no_device() {
        let error: Error =
            serialport::Error::new(serialport::ErrorKind::NoDevice, "no such port").into();
        assert_eq!(error.kind(), ErrorKind::NoDevice);
        assert_eq!(error.description, "no such port");
    }
}
