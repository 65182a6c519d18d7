use super::{ErrorKind, ErrorOp, Family, SocketType, Transport, Vio, VioError, VioFlags, VioState};
use crate::sys::classify_io;
use crate::sys::platform::{
    sys_accept, sys_close, sys_connect, sys_listen, sys_recv, sys_send, sys_set_v6only,
    sys_socket,
};

use std::io;
use tracing::{debug, trace};

/// Transport backed directly by the system socket API.
#[derive(Clone, Copy, Debug, Default)]
pub struct PlainTransport;

impl PlainTransport {
    pub fn new() -> Self {
        PlainTransport
    }
}

/// Records a hard system failure on `vio` and returns it. Reporting is left
/// to the owning handle.
fn fail(vio: &mut VioState, op: ErrorOp, err: &io::Error) -> VioError {
    vio.record_error(VioError::from_io(op, err));
    vio.last_error().clone()
}

impl Transport for PlainTransport {
    fn socket(
        &mut self,
        vio: &mut VioState,
        family: Family,
        kind: SocketType,
        protocol: i32,
    ) -> Result<(), VioError> {
        // A failed creation leaves any descriptor the handle already owns alone.
        let fd = match sys_socket(family.domain(), kind.raw(), protocol) {
            Ok(fd) => fd,
            Err(err) => {
                debug!(?family, ?kind, protocol, error = %err, "socket creation failed");
                return Err(fail(vio, ErrorOp::Socket, &err));
            }
        };

        if family == Family::Unspec {
            if let Err(err) = sys_set_v6only(fd, false) {
                if let Err(close_err) = sys_close(fd) {
                    debug!(fd, error = %close_err, "failed to close unusable socket");
                }
                return Err(fail(vio, ErrorOp::Socket, &err));
            }
        }

        vio.attach(fd, family);

        vio.set_flag(VioFlags::IS_CONNECTING, false);
        vio.set_flag(VioFlags::IS_CLOSED, false);
        vio.clear_error();

        trace!(fd, ?family, ?kind, "socket created");
        Ok(())
    }

    fn listen(&mut self, vio: &mut VioState, backlog: i32) -> Result<(), VioError> {
        let Some(fd) = vio.fd() else {
            return Err(vio.record_misuse(ErrorOp::Listen, "listen called without a socket"));
        };

        if let Err(err) = sys_listen(fd, backlog) {
            return Err(fail(vio, ErrorOp::Listen, &err));
        }

        vio.set_flag(VioFlags::IS_SERVER, true);
        vio.set_flag(VioFlags::IS_CLIENT, false);
        vio.set_flag(VioFlags::IS_CLOSED, false);
        vio.clear_error();

        trace!(fd, backlog, "listening");
        Ok(())
    }

    fn accept(&mut self, vio: &mut VioState, new: Option<&mut Vio>) -> Result<bool, VioError> {
        let Some(new) = new else {
            return Err(vio.record_misuse(
                ErrorOp::Accept,
                "accept not called with valid new VIO object",
            ));
        };

        let Some(fd) = vio.fd() else {
            return Err(vio.record_misuse(ErrorOp::Accept, "accept called without a socket"));
        };

        let target = &mut new.state;

        match sys_accept(fd, target.address.storage_mut()) {
            Ok((client_fd, len)) => {
                target.address.commit(len);
                target.attach(client_fd, vio.family().unwrap_or_default());

                // The accepted side is never a server.
                target.set_flag(VioFlags::IS_CLIENT, true);
                target.set_flag(VioFlags::IS_SERVER, false);
                target.set_flag(VioFlags::IS_CONNECTING, false);
                target.set_flag(VioFlags::IS_CLOSED, false);
                target.clear_error();
                vio.clear_error();

                debug!(listener = fd, fd = client_fd, peer = ?target.address(), "connection accepted");
                Ok(true)
            }
            Err(err) if classify_io(&err).is_transient() => {
                vio.clear_error();
                Ok(false)
            }
            Err(err) => Err(fail(vio, ErrorOp::Accept, &err)),
        }
    }

    fn connect(&mut self, vio: &mut VioState) -> Result<(), VioError> {
        let Some(fd) = vio.fd() else {
            return Err(vio.record_misuse(ErrorOp::Connect, "connect called without a socket"));
        };

        let Some((storage, len)) = vio.address.raw() else {
            return Err(vio.record_misuse(ErrorOp::Connect, "connect called without an address"));
        };

        match sys_connect(fd, storage, len) {
            Ok(()) => {}
            Err(err) if classify_io(&err).is_transient() => {
                trace!(fd, error = %err, "connection in progress");
            }
            Err(err) => return Err(fail(vio, ErrorOp::Connect, &err)),
        }

        vio.set_flag(VioFlags::IS_CLIENT, true);
        vio.set_flag(VioFlags::IS_SERVER, false);
        vio.set_flag(VioFlags::IS_CONNECTING, true);
        vio.set_flag(VioFlags::IS_CLOSED, false);
        vio.clear_error();

        Ok(())
    }

    fn read(&mut self, vio: &mut VioState, buffer: &mut [u8]) -> Result<usize, VioError> {
        let Some(fd) = vio.fd() else {
            return Err(vio.record_misuse(ErrorOp::Read, "read called without a socket"));
        };

        if buffer.is_empty() {
            return Ok(0);
        }

        match sys_recv(fd, buffer) {
            Ok(0) => {
                vio.record_error(VioError::new(
                    ErrorOp::Read,
                    ErrorKind::RemoteHangup,
                    "Remote host closed the socket",
                ));

                Err(vio.last_error().clone())
            }
            Ok(n) => {
                vio.set_flag(VioFlags::IS_CONNECTING, false);
                vio.clear_error();
                Ok(n)
            }
            Err(err) if classify_io(&err).is_transient() => {
                vio.clear_error();
                Ok(0)
            }
            Err(err) => Err(fail(vio, ErrorOp::Read, &err)),
        }
    }

    fn write(&mut self, vio: &mut VioState, buffer: &[u8]) -> Result<usize, VioError> {
        let Some(fd) = vio.fd() else {
            return Err(vio.record_misuse(ErrorOp::Write, "write called without a socket"));
        };

        if buffer.is_empty() {
            return Ok(0);
        }

        match sys_send(fd, buffer) {
            Ok(n) => {
                vio.set_flag(VioFlags::IS_CONNECTING, false);
                vio.clear_error();
                Ok(n)
            }
            Err(err) if classify_io(&err).is_transient() => {
                vio.clear_error();
                Ok(0)
            }
            Err(err) => Err(fail(vio, ErrorOp::Write, &err)),
        }
    }

    fn close(&mut self, vio: &mut VioState) {
        vio.set_flag(VioFlags::IS_CONNECTING, false);
        vio.set_flag(VioFlags::IS_CLOSED, true);

        if let Some(fd) = vio.fd() {
            match vio.release() {
                Ok(()) => trace!(fd, "descriptor closed"),
                Err(err) => debug!(fd, error = %err, "close failed"),
            }
        }
    }
}
