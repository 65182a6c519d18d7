//! Platform-specific readiness backend.
//!
//! The multiplexer drives exactly one kernel readiness context through this
//! module. The concrete implementation is selected at compile time; only the
//! Linux `epoll` one-shot model is provided.

#[cfg(any(target_os = "linux", target_os = "android"))]
mod epoll;

#[cfg(any(target_os = "linux", target_os = "android"))]
pub(crate) type Poller = epoll::EpollPoller;

#[cfg(not(any(target_os = "linux", target_os = "android")))]
compile_error!("vio only provides an epoll readiness backend");

use super::event::Status;
use std::os::fd::RawFd;

/// A readiness record already translated to the portable bitmask, before it
/// is matched against the registration table.
#[derive(Clone, Copy, Debug)]
pub(crate) struct RawEvent {
    pub(crate) fd: RawFd,
    pub(crate) status: Status,
}
