use crate::sys::platform::sys_strerror;

use std::fmt;
use std::io;
use thiserror::Error;

/// Upper bound, in bytes, of a recorded error message.
pub const MAX_ERROR_MESSAGE: usize = 128;

/// Operation that produced the recorded error.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ErrorOp {
    #[default]
    None,
    Socket,
    Listen,
    Accept,
    Connect,
    Read,
    Write,
    Other,
}

impl ErrorOp {
    /// Name used when the error is reported.
    pub const fn name(self) -> &'static str {
        match self {
            ErrorOp::None => "Generic",
            ErrorOp::Socket => "Socket",
            ErrorOp::Listen => "Listen",
            ErrorOp::Accept => "Accept",
            ErrorOp::Connect => "Connect",
            ErrorOp::Read => "Read",
            ErrorOp::Write => "Write",
            ErrorOp::Other => "Application",
        }
    }
}

impl fmt::Display for ErrorOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Class of the recorded error.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    #[default]
    None,

    /// The operating system reported a failure.
    System,

    /// The peer shut the connection down in an orderly way.
    RemoteHangup,

    /// The caller violated a precondition.
    ApiMisuse,
}

/// Error record kept on every [`Vio`](super::Vio).
///
/// The record is cleared whenever an operation completes or makes a
/// transient no-progress return, so a set record always describes the most
/// recent failure.
#[derive(Clone, Debug, Default, PartialEq, Eq, Error)]
#[error("{operation} error: {message}")]
pub struct VioError {
    pub operation: ErrorOp,
    pub kind: ErrorKind,
    pub message: String,
}

impl VioError {
    /// Creates a record, truncating `message` to [`MAX_ERROR_MESSAGE`] bytes.
    pub fn new(operation: ErrorOp, kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            operation,
            kind,
            message: bounded(message.into()),
        }
    }

    /// Creates a [`ErrorKind::System`] record from an `errno` value.
    pub fn system(operation: ErrorOp, code: i32) -> Self {
        Self::new(operation, ErrorKind::System, sys_strerror(code))
    }

    /// Creates a [`ErrorKind::System`] record from an `io::Error`.
    pub fn from_io(operation: ErrorOp, err: &io::Error) -> Self {
        match err.raw_os_error() {
            Some(code) => Self::system(operation, code),
            None => Self::new(operation, ErrorKind::System, err.to_string()),
        }
    }

    /// Returns `true` if the record describes a failure.
    pub fn is_set(&self) -> bool {
        self.kind != ErrorKind::None
    }
}

fn bounded(mut message: String) -> String {
    if message.len() > MAX_ERROR_MESSAGE {
        let mut end = MAX_ERROR_MESSAGE;
        while !message.is_char_boundary(end) {
            end -= 1;
        }
        message.truncate(end);
    }

    message
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_prefixes_operation_name() {
        let err = VioError::new(ErrorOp::Read, ErrorKind::RemoteHangup, "gone");
        assert_eq!(err.to_string(), "Read error: gone");

        let err = VioError::new(ErrorOp::Other, ErrorKind::System, "boom");
        assert_eq!(err.to_string(), "Application error: boom");

        let err = VioError::new(ErrorOp::None, ErrorKind::System, "boom");
        assert_eq!(err.to_string(), "Generic error: boom");
    }

    #[test]
    fn messages_are_bounded_on_char_boundaries() {
        let long = "é".repeat(MAX_ERROR_MESSAGE);
        let err = VioError::new(ErrorOp::Write, ErrorKind::System, long);

        assert!(err.message.len() <= MAX_ERROR_MESSAGE);
        assert!(err.message.chars().all(|c| c == 'é'));
    }

    #[test]
    fn system_records_use_strerror() {
        let err = VioError::system(ErrorOp::Connect, libc::ECONNREFUSED);

        assert_eq!(err.kind, ErrorKind::System);
        assert!(!err.message.is_empty());
        assert!(!err.message.contains("os error"));
    }

    #[test]
    fn default_record_is_unset() {
        assert!(!VioError::default().is_set());
        assert_eq!(VioError::default().operation, ErrorOp::None);
    }
}
