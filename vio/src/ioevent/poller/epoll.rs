//! Linux `epoll` backend.
//!
//! Every registration is one-shot (`EPOLLONESHOT`): after one event the
//! kernel keeps the descriptor in the interest list but disarms it until it
//! is modified again. The descriptor value itself is stored as the event
//! payload; the multiplexer maps it back to the caller's token.

use super::RawEvent;
use crate::ioevent::event::{Interest, Status};
use crate::sys::platform::sys_close;

use libc::{
    EPOLL_CLOEXEC, EPOLL_CTL_ADD, EPOLL_CTL_DEL, EPOLL_CTL_MOD, EPOLLERR, EPOLLHUP, EPOLLIN,
    EPOLLONESHOT, EPOLLOUT, epoll_create1, epoll_ctl, epoll_event, epoll_wait,
};
use std::io;
use std::mem;
use std::os::fd::RawFd;
use std::time::Duration;

/// Linux `epoll` poller.
///
/// Owns the epoll descriptor and a reusable buffer for kernel events.
pub(crate) struct EpollPoller {
    /// Epoll file descriptor.
    epoll: RawFd,

    /// Reusable buffer for epoll events. Only the first `ready` entries are
    /// meaningful after a wait.
    events: Vec<epoll_event>,

    ready: usize,
}

impl EpollPoller {
    /// Creates the epoll instance.
    pub(crate) fn new(cloexec: bool) -> io::Result<Self> {
        let flags = if cloexec { EPOLL_CLOEXEC } else { 0 };

        let epoll = unsafe { epoll_create1(flags) };
        if epoll < 0 {
            return Err(io::Error::last_os_error());
        }

        Ok(Self {
            epoll,
            events: Vec::with_capacity(64),
            ready: 0,
        })
    }

    /// Registers `fd` with one-shot delivery.
    pub(crate) fn add(&self, fd: RawFd, interest: Interest) -> io::Result<()> {
        self.ctl(EPOLL_CTL_ADD, fd, interest)
    }

    /// Re-arms an already registered descriptor.
    pub(crate) fn modify(&self, fd: RawFd, interest: Interest) -> io::Result<()> {
        self.ctl(EPOLL_CTL_MOD, fd, interest)
    }

    /// Removes `fd` from the interest list.
    pub(crate) fn delete(&self, fd: RawFd) -> io::Result<()> {
        let rc = unsafe { epoll_ctl(self.epoll, EPOLL_CTL_DEL, fd, std::ptr::null_mut()) };
        if rc < 0 {
            Err(io::Error::last_os_error())
        } else {
            Ok(())
        }
    }

    fn ctl(&self, op: i32, fd: RawFd, interest: Interest) -> io::Result<()> {
        let mut event = epoll_event {
            events: interest_to_epoll(interest),
            u64: fd as u64,
        };

        let rc = unsafe { epoll_ctl(self.epoll, op, fd, &mut event) };
        if rc < 0 {
            Err(io::Error::last_os_error())
        } else {
            Ok(())
        }
    }

    /// Waits for at most `max` events.
    ///
    /// Blocks until at least one registered descriptor is ready or the
    /// timeout expires. `None` blocks indefinitely. An interrupted wait is
    /// returned as an `Interrupted` error and not retried.
    pub(crate) fn wait(&mut self, max: usize, timeout: Option<Duration>) -> io::Result<usize> {
        let max = max.clamp(1, i32::MAX as usize);

        self.ready = 0;
        if self.events.len() < max {
            self.events.resize(max, epoll_event { events: 0, u64: 0 });
        }

        let n = unsafe {
            epoll_wait(
                self.epoll,
                self.events.as_mut_ptr(),
                max as i32,
                timeout_to_millis(timeout),
            )
        };

        if n < 0 {
            return Err(io::Error::last_os_error());
        }

        self.ready = n as usize;
        Ok(self.ready)
    }

    /// Events collected by the last [`wait`](Self::wait).
    pub(crate) fn ready(&self) -> impl Iterator<Item = RawEvent> + '_ {
        self.events[..self.ready].iter().map(|ev| RawEvent {
            fd: ev.u64 as RawFd,
            status: epoll_to_status(ev.events),
        })
    }

    /// Releases the epoll descriptor and reports failures.
    pub(crate) fn close(self) -> io::Result<()> {
        let mut this = mem::ManuallyDrop::new(self);
        drop(mem::take(&mut this.events));

        sys_close(this.epoll)
    }
}

impl Drop for EpollPoller {
    fn drop(&mut self) {
        if let Err(err) = sys_close(self.epoll) {
            tracing::warn!(epoll = self.epoll, error = %err, "failed to close epoll descriptor");
        }
    }
}

fn interest_to_epoll(interest: Interest) -> u32 {
    let mut flags = EPOLLONESHOT;

    if interest.read {
        flags |= EPOLLIN;
    }
    if interest.write {
        flags |= EPOLLOUT;
    }

    flags as u32
}

/// Translates kernel readiness bits.
///
/// Hangup replaces readable and writable; error replaces everything.
fn epoll_to_status(events: u32) -> Status {
    if events & EPOLLERR as u32 != 0 {
        return Status::ERROR;
    }
    if events & EPOLLHUP as u32 != 0 {
        return Status::HANGUP;
    }

    let mut status = Status::EMPTY;

    if events & EPOLLIN as u32 != 0 {
        status |= Status::READABLE;
    }
    if events & EPOLLOUT as u32 != 0 {
        status |= Status::WRITABLE;
    }

    status
}

/// Converts a timeout to `epoll_wait` milliseconds.
///
/// Non-zero timeouts shorter than a millisecond round up so that they do not
/// degrade into a busy poll.
fn timeout_to_millis(timeout: Option<Duration>) -> i32 {
    match timeout {
        None => -1,
        Some(t) if t.is_zero() => 0,
        Some(t) => {
            let millis = t.as_nanos().div_ceil(1_000_000);
            millis.min(i32::MAX as u128) as i32
        }
    }
}
