//! Transient versus hard classification of platform error codes.

use std::io;

/// Outcome class of a failed non-blocking call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Condition {
    /// The call made no progress now but may succeed on a later readiness
    /// notification. Never surfaced as an error.
    Transient,

    /// A real failure that must be recorded and reported.
    Hard,
}

impl Condition {
    /// Returns `true` for [`Condition::Transient`].
    pub fn is_transient(self) -> bool {
        self == Condition::Transient
    }
}

#[cfg(any(target_os = "linux", target_os = "android"))]
const TRANSIENT: &[i32] = &[
    libc::EAGAIN,
    libc::EWOULDBLOCK,
    libc::EINPROGRESS,
    libc::EALREADY,
    libc::EINTR,
    libc::ENOBUFS,
    libc::ETIME,
    libc::ERESTART,
];

#[cfg(not(any(target_os = "linux", target_os = "android")))]
const TRANSIENT: &[i32] = &[
    libc::EAGAIN,
    libc::EWOULDBLOCK,
    libc::EINPROGRESS,
    libc::EALREADY,
    libc::EINTR,
    libc::ENOBUFS,
];

/// Classifies a raw `errno` value.
///
/// This is a pure function of the code so that the event-loop policy can be
/// tested without real sockets.
pub fn classify(code: i32) -> Condition {
    if TRANSIENT.contains(&code) {
        Condition::Transient
    } else {
        Condition::Hard
    }
}

/// Classifies an `io::Error`, falling back to its kind when it carries no
/// OS code.
pub fn classify_io(err: &io::Error) -> Condition {
    match err.raw_os_error() {
        Some(code) => classify(code),
        None => match err.kind() {
            io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted => Condition::Transient,
            _ => Condition::Hard,
        },
    }
}
