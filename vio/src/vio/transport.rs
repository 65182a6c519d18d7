use super::{Family, SocketType, Vio, VioError, VioState};

use tracing::error;

/// The operation table of a [`Vio`].
///
/// A transport implements the eight operations a handle exposes. The
/// handle's connection state is passed in as `vio`; anything the transport
/// needs beyond that (an encryption context, framing buffers, ...) lives in
/// the transport value itself and is owned by it.
///
/// [`PlainTransport`](super::PlainTransport) maps each operation onto the
/// system socket API. A wrapping transport typically holds a
/// `PlainTransport`, performs a handshake inside [`connect`](Self::connect)
/// and [`accept`](Self::accept) after delegating, and transforms bytes in
/// [`read`](Self::read) and [`write`](Self::write).
///
/// # Contract
///
/// - Transient "try again later" conditions return zero progress and leave
///   no error recorded.
/// - Hard failures record a [`VioError`] on `vio` and return it. They do not
///   report it: the owning [`Vio`] hands every returned failure except
///   misuse to [`report_error`](Self::report_error) of its outermost
///   transport.
/// - Precondition violations record an
///   [`ErrorKind::ApiMisuse`](super::ErrorKind::ApiMisuse) error and return
///   it without closing anything.
/// - A failed [`socket`](Self::socket) closes nothing: it did not open a
///   descriptor.
pub trait Transport: Send {
    /// Creates the underlying descriptor.
    fn socket(
        &mut self,
        vio: &mut VioState,
        family: Family,
        kind: SocketType,
        protocol: i32,
    ) -> Result<(), VioError>;

    /// Starts listening; the handle takes the server role.
    fn listen(&mut self, vio: &mut VioState, backlog: i32) -> Result<(), VioError>;

    /// Accepts one pending connection into `new`.
    ///
    /// Returns `Ok(false)` when no connection was pending.
    fn accept(&mut self, vio: &mut VioState, new: Option<&mut Vio>) -> Result<bool, VioError>;

    /// Starts connecting to the address stored in the handle; the handle
    /// takes the client role and is marked connecting.
    fn connect(&mut self, vio: &mut VioState) -> Result<(), VioError>;

    /// Reads into `buffer`, returning the number of bytes read.
    fn read(&mut self, vio: &mut VioState, buffer: &mut [u8]) -> Result<usize, VioError>;

    /// Writes from `buffer`, returning the number of bytes written.
    fn write(&mut self, vio: &mut VioState, buffer: &[u8]) -> Result<usize, VioError>;

    /// Marks the handle closed and releases its descriptor. Must be safe to
    /// call more than once.
    fn close(&mut self, vio: &mut VioState);

    /// Reports the recorded error, force-closes the handle through
    /// [`close`](Self::close) and returns the record.
    ///
    /// The provided implementation logs `"<Op> error: <message>"` at error
    /// level. Overrides should still end up in `self.close`.
    fn report_error(&mut self, vio: &mut VioState) -> VioError {
        let err = vio.last_error().clone();

        error!(
            fd = vio.fd(),
            op = %err.operation,
            kind = ?err.kind,
            "{} error: {}",
            err.operation,
            err.message
        );

        self.close(vio);
        err
    }
}
