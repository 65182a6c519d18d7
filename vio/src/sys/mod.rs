//! Thin wrappers over the system socket and descriptor API.
//!
//! Everything in here is a single system call (or a short fixed sequence of
//! them) returning `io::Result`. Policy decisions such as which failures are
//! errors and which are merely "try again later" live in [`errno`] and in the
//! transports, never in the wrappers themselves.

pub mod errno;

#[cfg(unix)]
pub(crate) mod unix;

#[cfg(unix)]
pub(crate) use unix as platform;

pub use errno::{Condition, classify, classify_io};
