//! Virtual I/O handles.
//!
//! A [`Vio`] is one socket-like endpoint. It keeps the connection state
//! ([`VioFlags`]), an address buffer, the last [`VioError`] and the
//! descriptor, and forwards every operation to a [`Transport`]. Swapping the
//! transport (plain sockets, or a wrapper adding encryption or framing)
//! changes behaviour without changing caller code.
//!
//! Handles are driven by a single event-loop thread, typically from the
//! events returned by a [`Multiplexer`](crate::Multiplexer). None of the
//! operations block; a call that cannot make progress right now returns zero
//! progress and expects to be retried on the next readiness notification.

mod address;
mod error;
mod flags;
mod plain;
mod transport;

pub use address::{Family, SocketType, VioAddress};
pub use error::{ErrorKind, ErrorOp, MAX_ERROR_MESSAGE, VioError};
pub use flags::VioFlags;
pub use plain::PlainTransport;
pub use transport::Transport;

use crate::sys::platform::{sys_bind, sys_close, sys_sockname};
use address::map_for_family;

use std::fmt;
use std::io;
use std::net::SocketAddr;
use std::os::fd::RawFd;
use tracing::{debug, warn};

/// Connection state of a handle, as seen by its transport.
pub struct VioState {
    fd: Option<RawFd>,
    family: Option<Family>,
    pub(crate) address: VioAddress,
    flags: VioFlags,
    error: VioError,
}

impl VioState {
    /// An unopened state: no descriptor, no flags, no address.
    pub fn new() -> Self {
        Self {
            fd: None,
            family: None,
            address: VioAddress::new(),
            flags: VioFlags::empty(),
            error: VioError::default(),
        }
    }

    /// The owned descriptor, or `None` when unset or closed.
    pub fn fd(&self) -> Option<RawFd> {
        self.fd
    }

    /// Family the current descriptor was created with.
    pub fn family(&self) -> Option<Family> {
        self.family
    }

    /// Current connection state bits.
    pub fn flags(&self) -> VioFlags {
        self.flags
    }

    /// Sets or clears one state bit. Meant for transports; the plain
    /// transport keeps the role bits exclusive.
    pub fn set_flag(&mut self, flag: VioFlags, on: bool) {
        self.flags.set(flag, on);
    }

    /// `true` once the handle connected out or was accepted.
    pub fn is_client(&self) -> bool {
        self.flags.contains(VioFlags::IS_CLIENT)
    }

    /// `true` once the handle listens.
    pub fn is_server(&self) -> bool {
        self.flags.contains(VioFlags::IS_SERVER)
    }

    /// `true` from connect initiation until the first successful read or
    /// write.
    pub fn is_connecting(&self) -> bool {
        self.flags.contains(VioFlags::IS_CONNECTING)
    }

    /// `true` after `close` or a reported failure.
    pub fn is_closed(&self) -> bool {
        self.flags.contains(VioFlags::IS_CLOSED)
    }

    /// The address currently held in the address buffer.
    pub fn address(&self) -> Option<SocketAddr> {
        self.address.get()
    }

    /// Stores `addr` in the address buffer.
    ///
    /// IPv4 addresses are stored IPv4-mapped when the descriptor is a
    /// dual-stack IPv6 socket.
    pub fn set_address(&mut self, addr: SocketAddr) {
        self.address.set(map_for_family(addr, self.family));
    }

    /// Raw view of the address buffer.
    pub fn address_buffer(&self) -> &VioAddress {
        &self.address
    }

    /// The most recent failure. Unset after any success or transient
    /// return.
    pub fn last_error(&self) -> &VioError {
        &self.error
    }

    /// Replaces the error record.
    pub fn record_error(&mut self, error: VioError) {
        self.error = error;
    }

    /// Resets the error record to its unset value.
    pub fn clear_error(&mut self) {
        self.error = VioError::default();
    }

    /// Records an [`ErrorKind::ApiMisuse`] error and returns it.
    ///
    /// Misuse is the caller's mistake, so the handle is left open.
    pub fn record_misuse(&mut self, operation: ErrorOp, message: &str) -> VioError {
        let error = VioError::new(operation, ErrorKind::ApiMisuse, message);

        warn!(op = %operation, "{}", error);
        self.error = error.clone();
        error
    }

    /// Takes ownership of `fd`, releasing any descriptor held before.
    pub(crate) fn attach(&mut self, fd: RawFd, family: Family) {
        if let Err(err) = self.release() {
            debug!(error = %err, "failed to close replaced descriptor");
        }

        self.fd = Some(fd);
        self.family = Some(family);
    }

    /// Closes the owned descriptor. The descriptor is forgotten before the
    /// call, so it is released at most once.
    pub(crate) fn release(&mut self) -> io::Result<()> {
        match self.fd.take() {
            Some(fd) => sys_close(fd),
            None => Ok(()),
        }
    }
}

impl Default for VioState {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for VioState {
    fn drop(&mut self) {
        if let Err(err) = self.release() {
            debug!(error = %err, "failed to close descriptor on drop");
        }
    }
}

impl fmt::Debug for VioState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VioState")
            .field("fd", &self.fd)
            .field("family", &self.family)
            .field("address", &self.address)
            .field("flags", &self.flags)
            .field("error", &self.error)
            .finish()
    }
}

/// A virtual I/O handle: connection state plus a swappable transport.
///
/// # Examples
///
/// ```rust,no_run
/// use vio::{Family, SocketType, Vio};
///
/// let mut client = Vio::new();
/// client.socket(Family::Inet, SocketType::Stream, 0)?;
/// client.set_address("127.0.0.1:6667".parse().unwrap());
/// client.connect()?;
///
/// // Wait for write readiness, then:
/// client.write(b"NICK vio\r\n")?;
/// assert!(!client.is_connecting());
/// # Ok::<(), vio::VioError>(())
/// ```
pub struct Vio {
    pub(crate) state: VioState,
    transport: Box<dyn Transport>,
}

impl Vio {
    /// Creates an unopened handle using [`PlainTransport`].
    pub fn new() -> Self {
        Self::with_transport(PlainTransport::new())
    }

    /// Creates an unopened handle driven by `transport`.
    pub fn with_transport<T: Transport + 'static>(transport: T) -> Self {
        Self {
            state: VioState::new(),
            transport: Box::new(transport),
        }
    }

    /// Creates the underlying descriptor.
    ///
    /// [`Family::Unspec`] yields a dual-stack IPv6 socket. The descriptor is
    /// non-blocking. A failure is recorded and returned but closes nothing;
    /// call [`error`](Self::error) to report it.
    pub fn socket(
        &mut self,
        family: Family,
        kind: SocketType,
        protocol: i32,
    ) -> Result<(), VioError> {
        self.transport
            .socket(&mut self.state, family, kind, protocol)
    }

    /// Binds the descriptor to `addr`, which is also kept in the address
    /// buffer.
    ///
    /// Binding is not a transport operation; a failure is recorded as an
    /// [`ErrorOp::Other`] error and reported through the transport.
    pub fn bind(&mut self, addr: SocketAddr) -> Result<(), VioError> {
        let Some(fd) = self.state.fd() else {
            return Err(self
                .state
                .record_misuse(ErrorOp::Other, "bind called without a socket"));
        };

        self.state.set_address(addr);

        let result = match self.state.address.raw() {
            Some((storage, len)) => sys_bind(fd, storage, len),
            None => Ok(()),
        };

        let result = result
            .map(|()| self.state.clear_error())
            .map_err(|err| VioError::from_io(ErrorOp::Other, &err));

        self.settle(result)
    }

    /// Starts listening; the handle takes the server role.
    pub fn listen(&mut self, backlog: i32) -> Result<(), VioError> {
        let result = self.transport.listen(&mut self.state, backlog);
        self.settle(result)
    }

    /// Accepts one pending connection into `new`.
    ///
    /// Returns `Ok(true)` when a connection was accepted and `Ok(false)` when
    /// none was pending. Passing `None` records an
    /// [`ErrorKind::ApiMisuse`] error and leaves this handle untouched.
    pub fn accept(&mut self, new: Option<&mut Vio>) -> Result<bool, VioError> {
        let result = self.transport.accept(&mut self.state, new);
        self.settle(result)
    }

    /// Starts connecting to the address in the address buffer.
    ///
    /// The handle stays [`is_connecting`](Self::is_connecting) until the
    /// first successful read or write; wait for write readiness before
    /// treating the connection as established.
    pub fn connect(&mut self) -> Result<(), VioError> {
        let result = self.transport.connect(&mut self.state);
        self.settle(result)
    }

    /// Stores `addr` and starts connecting to it.
    pub fn connect_to(&mut self, addr: SocketAddr) -> Result<(), VioError> {
        self.state.set_address(addr);
        self.connect()
    }

    /// Reads into `buffer`.
    ///
    /// `Ok(0)` means no data is available right now. An orderly shutdown by
    /// the peer is reported as an [`ErrorKind::RemoteHangup`] error.
    pub fn read(&mut self, buffer: &mut [u8]) -> Result<usize, VioError> {
        let result = self.transport.read(&mut self.state, buffer);
        self.settle(result)
    }

    /// Writes from `buffer`. `Ok(0)` means the socket cannot take data right
    /// now.
    pub fn write(&mut self, buffer: &[u8]) -> Result<usize, VioError> {
        let result = self.transport.write(&mut self.state, buffer);
        self.settle(result)
    }

    /// Closes the handle. Calling it again is harmless.
    pub fn close(&mut self) {
        self.transport.close(&mut self.state);
    }

    /// Reports the recorded error, closes the handle and returns the record.
    ///
    /// After this call the handle is closed; only `close` and dropping it
    /// remain meaningful.
    pub fn error(&mut self) -> VioError {
        self.transport.report_error(&mut self.state)
    }

    /// Hands every failure except misuse to the transport's error sink,
    /// which closes the handle.
    fn settle<T>(&mut self, result: Result<T, VioError>) -> Result<T, VioError> {
        match result {
            Err(err) if err.kind != ErrorKind::ApiMisuse => {
                self.state.record_error(err);
                Err(self.transport.report_error(&mut self.state))
            }
            other => other,
        }
    }

    /// Local address of the descriptor.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        match self.state.fd() {
            Some(fd) => sys_sockname(fd),
            None => Err(io::Error::new(
                io::ErrorKind::NotConnected,
                "handle has no descriptor",
            )),
        }
    }

    /// Connection state shared with the transport.
    pub fn state(&self) -> &VioState {
        &self.state
    }

    /// Mutable connection state, for callers driving a transport by hand.
    pub fn state_mut(&mut self) -> &mut VioState {
        &mut self.state
    }

    /// The owned descriptor, `None` when unopened or closed. Register this
    /// with a [`Multiplexer`](crate::Multiplexer).
    pub fn fd(&self) -> Option<RawFd> {
        self.state.fd()
    }

    /// See [`VioState::flags`].
    pub fn flags(&self) -> VioFlags {
        self.state.flags()
    }

    /// See [`VioState::is_client`].
    pub fn is_client(&self) -> bool {
        self.state.is_client()
    }

    /// See [`VioState::is_server`].
    pub fn is_server(&self) -> bool {
        self.state.is_server()
    }

    /// See [`VioState::is_connecting`].
    pub fn is_connecting(&self) -> bool {
        self.state.is_connecting()
    }

    /// See [`VioState::is_closed`]. Check it before dispatching a queued
    /// readiness event to the handle.
    pub fn is_closed(&self) -> bool {
        self.state.is_closed()
    }

    /// Address held in the address buffer: the bind address, the connect
    /// target, or the peer of an accepted connection.
    pub fn address(&self) -> Option<SocketAddr> {
        self.state.address()
    }

    /// See [`VioState::set_address`].
    pub fn set_address(&mut self, addr: SocketAddr) {
        self.state.set_address(addr);
    }

    /// The most recent failure recorded on the handle.
    pub fn last_error(&self) -> &VioError {
        self.state.last_error()
    }
}

impl Default for Vio {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Vio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Vio")
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}
