//! One-shot readiness multiplexer.
//!
//! A [`Multiplexer`] owns one kernel readiness context and a table mapping
//! each registered descriptor to the caller's [`Token`]. Every registration
//! is one-shot: after it has produced one [`ReadinessEvent`] it stays silent
//! until it is associated again. See [`ArmState`] for the full state
//! machine.
//!
//! The multiplexer is meant to be owned by a single event-loop thread.
//! [`Multiplexer::get`] is the only call that blocks.

mod builder;
mod event;
mod poller;
mod registration;

pub use builder::{DEFAULT_SIZE_HINT, MultiplexerBuilder};
pub use event::{Interest, ReadinessEvent, Source, Status, Token};
pub use registration::ArmState;

use crate::error::{Error, Result};
use poller::Poller;
use registration::{Arm, Registry};

use std::io;
use std::os::fd::RawFd;
use std::time::Duration;
use tracing::{debug, trace};

/// Waits for readiness on many descriptors at once.
///
/// # Examples
///
/// ```rust,no_run
/// use std::os::fd::AsRawFd;
/// use std::time::Duration;
/// use vio::{Interest, Multiplexer, ReadinessEvent, Source, Token};
///
/// let listener = std::net::TcpListener::bind("127.0.0.1:0")?;
/// let mut mux = Multiplexer::new()?;
///
/// mux.associate(Source::Fd, listener.as_raw_fd(), Interest::READABLE, Token(0))?;
///
/// let mut events = [ReadinessEvent::default(); 16];
/// let n = mux.get(&mut events, Some(Duration::from_millis(100)))?;
/// for event in &events[..n] {
///     println!("{:?} is ready: {:?}", event.opaque, event.status);
/// }
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct Multiplexer {
    poller: Poller,
    registry: Registry,
}

impl Multiplexer {
    /// Creates a multiplexer with the default configuration.
    ///
    /// Use [`MultiplexerBuilder`] to tune it.
    pub fn new() -> Result<Self> {
        MultiplexerBuilder::new().build()
    }

    pub(crate) fn with_config(size_hint: usize, cloexec: bool) -> Result<Self> {
        let poller = Poller::new(cloexec).map_err(Error::Create)?;

        debug!(size_hint, cloexec, "readiness context created");

        Ok(Self {
            poller,
            registry: Registry::with_capacity(size_hint),
        })
    }

    /// Releases the kernel readiness context.
    ///
    /// Dropping the multiplexer does the same but can only log a failure.
    pub fn destroy(self) -> Result<()> {
        let Multiplexer { poller, registry } = self;

        debug!(registered = registry.len(), "destroying readiness context");
        poller.close().map_err(Error::Close)
    }

    /// Arms `object` for one readiness notification.
    ///
    /// `interest` selects readable and/or writable notifications; hangup and
    /// error are always reported. `opaque` is returned untouched in the
    /// matching [`ReadinessEvent`].
    ///
    /// Sources other than [`Source::Fd`] are accepted and ignored.
    ///
    /// A handle closed by a reported error keeps its registration; dissociate
    /// it anyway, otherwise a new descriptor reusing the number is refused
    /// with [`Error::AlreadyRegistered`].
    ///
    /// # Errors
    ///
    /// - [`Error::AlreadyRegistered`] if `object` is still armed. A
    ///   registration whose event has already been delivered is re-armed
    ///   instead.
    /// - [`Error::Register`] if the kernel rejects the descriptor.
    pub fn associate(
        &mut self,
        source: Source,
        object: RawFd,
        interest: Interest,
        opaque: Token,
    ) -> Result<()> {
        if source != Source::Fd {
            trace!(?source, object, "ignoring association for unsupported source");
            return Ok(());
        }

        match self.registry.plan(object)? {
            Arm::Add => self.add(object, interest)?,
            Arm::Modify => self.modify(object, interest)?,
        }

        self.registry.arm(object, opaque, interest);
        debug!(fd = object, token = opaque.0, ?interest, "descriptor armed");

        Ok(())
    }

    /// Re-arms a registered descriptor, replacing its interest and token.
    ///
    /// Unlike [`associate`](Self::associate) this also accepts a descriptor
    /// that is still armed.
    ///
    /// # Errors
    ///
    /// - [`Error::NotRegistered`] if `object` was never associated.
    /// - [`Error::Register`] if the kernel rejects the change.
    pub fn rearm(&mut self, object: RawFd, interest: Interest, opaque: Token) -> Result<()> {
        if self.registry.get(object).is_none() {
            return Err(Error::NotRegistered(object));
        }

        self.modify(object, interest)?;
        self.registry.arm(object, opaque, interest);
        debug!(fd = object, token = opaque.0, ?interest, "descriptor re-armed");

        Ok(())
    }

    /// Removes any interest in `object`.
    ///
    /// Never fails from the caller's point of view: unknown descriptors and
    /// unsupported sources are ignored, and a kernel failure (typically a
    /// descriptor that was already closed) is only logged.
    pub fn dissociate(&mut self, source: Source, object: RawFd) {
        if source != Source::Fd {
            return;
        }

        if self.registry.remove(object).is_none() {
            trace!(fd = object, "dissociate on unregistered descriptor");
            return;
        }

        match self.poller.delete(object) {
            Ok(()) => debug!(fd = object, "descriptor dissociated"),
            Err(err) => debug!(fd = object, error = %err, "kernel dissociation failed"),
        }
    }

    /// Waits for ready descriptors and fills `events` with them.
    ///
    /// At most `events.len()` entries are written. `timeout` of `None` blocks
    /// indefinitely, `Some(Duration::ZERO)` polls without blocking, and any
    /// other value is honoured with millisecond resolution (rounded up).
    ///
    /// Returns the number of entries written, `0` on timeout. Every returned
    /// entry has a non-empty status, and read/write bits are only reported
    /// when they were requested. Each reported descriptor is disarmed until it
    /// is associated again.
    ///
    /// # Errors
    ///
    /// - [`Error::Interrupted`] if a signal interrupted the wait. The wait is
    ///   not retried.
    /// - [`Error::Wait`] for any other kernel failure.
    pub fn get(&mut self, events: &mut [ReadinessEvent], timeout: Option<Duration>) -> Result<usize> {
        if events.is_empty() {
            return Ok(0);
        }

        match self.poller.wait(events.len(), timeout) {
            Ok(_) => {}
            Err(err) if err.kind() == io::ErrorKind::Interrupted => {
                return Err(Error::Interrupted);
            }
            Err(err) => return Err(Error::Wait(err)),
        }

        let mut count = 0;

        for raw in self.poller.ready() {
            let Some(registration) = self.registry.fire(raw.fd) else {
                trace!(fd = raw.fd, "dropping event for stale descriptor");
                continue;
            };

            let status = restrict(raw.status, registration.interest);
            if status.is_empty() {
                continue;
            }

            events[count] = ReadinessEvent {
                source: Source::Fd,
                object: raw.fd,
                opaque: registration.token,
                status,
            };
            count += 1;
        }

        trace!(count, "readiness batch collected");
        Ok(count)
    }

    /// Returns `true` if `object` has a registration, armed or fired.
    pub fn is_registered(&self, object: RawFd) -> bool {
        self.registry.get(object).is_some()
    }

    /// Returns the one-shot state of `object`, or `None` if it is not
    /// registered.
    pub fn registration_state(&self, object: RawFd) -> Option<ArmState> {
        self.registry.get(object).map(|r| r.state)
    }

    /// Number of registered descriptors.
    pub fn len(&self) -> usize {
        self.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn add(&mut self, fd: RawFd, interest: Interest) -> Result<()> {
        self.poller.add(fd, interest).map_err(|err| match err.raw_os_error() {
            Some(libc::EEXIST) => Error::AlreadyRegistered(fd),
            _ => Error::Register { fd, source: err },
        })
    }

    /// Re-arms `fd`. If the kernel no longer knows it (the descriptor was
    /// closed and its number reused) it is added afresh.
    fn modify(&mut self, fd: RawFd, interest: Interest) -> Result<()> {
        match self.poller.modify(fd, interest) {
            Ok(()) => Ok(()),
            Err(err) if err.raw_os_error() == Some(libc::ENOENT) => {
                debug!(fd, "re-arm target unknown to the kernel, adding it again");
                self.add(fd, interest)
            }
            Err(err) => Err(Error::Register { fd, source: err }),
        }
    }
}

/// Drops read/write bits that were not requested. Hangup and error are
/// always kept.
fn restrict(status: Status, interest: Interest) -> Status {
    if status.is_error() || status.is_hangup() {
        return status;
    }

    Status::from_bits(status.bits() & interest.bits())
}
