use std::io;
use std::os::fd::RawFd;

use thiserror::Error;

/// Errors reported by the [`Multiplexer`](crate::Multiplexer).
///
/// Failures of individual virtual I/O handles are not reported through this
/// type; they are recorded on the handle as a [`VioError`](crate::VioError).
#[derive(Debug, Error)]
pub enum Error {
    /// The kernel readiness context could not be created.
    #[error("failed to create readiness context: {0}")]
    Create(#[source] io::Error),

    /// The kernel readiness context could not be released.
    #[error("failed to close readiness context: {0}")]
    Close(#[source] io::Error),

    /// The descriptor is still armed from a previous association.
    ///
    /// Dissociate it first, or wait for its one-shot event before
    /// associating it again.
    #[error("descriptor {0} is already armed")]
    AlreadyRegistered(RawFd),

    /// The descriptor has no registration to re-arm.
    #[error("descriptor {0} is not registered")]
    NotRegistered(RawFd),

    /// The kernel refused the registration.
    #[error("failed to register descriptor {fd}: {source}")]
    Register {
        fd: RawFd,
        #[source]
        source: io::Error,
    },

    /// The wait was interrupted by a signal. It is not retried internally.
    #[error("readiness wait interrupted by a signal")]
    Interrupted,

    /// The wait failed for any other reason.
    #[error("readiness wait failed: {0}")]
    Wait(#[source] io::Error),
}

/// Result alias used by the multiplexer.
pub type Result<T> = std::result::Result<T, Error>;
