//! Socket and descriptor calls on Unix.
//!
//! Every socket handed out here is non-blocking and close-on-exec.

use libc::{
    AF_INET, AF_INET6, F_GETFD, F_GETFL, F_SETFD, F_SETFL, FD_CLOEXEC, IPPROTO_IPV6, IPV6_V6ONLY,
    O_NONBLOCK, c_char, c_int, sa_family_t, sockaddr, sockaddr_in, sockaddr_in6, sockaddr_storage,
    socklen_t, ssize_t,
};
use std::ffi::CStr;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr, SocketAddrV4, SocketAddrV6};
use std::os::fd::RawFd;
use std::{io, mem, ptr};

#[cfg(any(target_os = "linux", target_os = "android"))]
const SEND_FLAGS: c_int = libc::MSG_NOSIGNAL;

#[cfg(not(any(target_os = "linux", target_os = "android")))]
const SEND_FLAGS: c_int = 0;

/// Turns a `-1` return into the thread's `errno`.
fn check(rc: c_int) -> io::Result<c_int> {
    if rc < 0 {
        Err(io::Error::last_os_error())
    } else {
        Ok(rc)
    }
}

fn check_len(n: ssize_t) -> io::Result<usize> {
    if n < 0 {
        Err(io::Error::last_os_error())
    } else {
        Ok(n as usize)
    }
}

pub(crate) fn sys_recv(fd: RawFd, buffer: &mut [u8]) -> io::Result<usize> {
    check_len(unsafe { libc::recv(fd, buffer.as_mut_ptr().cast(), buffer.len(), 0) })
}

/// `send` without `SIGPIPE` on platforms that support `MSG_NOSIGNAL`.
pub(crate) fn sys_send(fd: RawFd, buffer: &[u8]) -> io::Result<usize> {
    check_len(unsafe { libc::send(fd, buffer.as_ptr().cast(), buffer.len(), SEND_FLAGS) })
}

pub(crate) fn sys_close(fd: RawFd) -> io::Result<()> {
    check(unsafe { libc::close(fd) }).map(drop)
}

/// Adds `bits` to the flag word read with `get` and written with `set`.
fn fcntl_add(fd: RawFd, get: c_int, set: c_int, bits: c_int) -> io::Result<()> {
    let current = check(unsafe { libc::fcntl(fd, get) })?;
    if current & bits == bits {
        return Ok(());
    }

    check(unsafe { libc::fcntl(fd, set, current | bits) }).map(drop)
}

pub(crate) fn sys_set_nonblocking(fd: RawFd) -> io::Result<()> {
    fcntl_add(fd, F_GETFL, F_SETFL, O_NONBLOCK)
}

pub(crate) fn sys_set_cloexec(fd: RawFd) -> io::Result<()> {
    fcntl_add(fd, F_GETFD, F_SETFD, FD_CLOEXEC)
}

/// Puts a freshly obtained descriptor in the mode the crate expects, closing
/// it if that fails.
fn adopt(fd: RawFd) -> io::Result<RawFd> {
    match sys_set_nonblocking(fd).and_then(|()| sys_set_cloexec(fd)) {
        Ok(()) => Ok(fd),
        Err(err) => {
            unsafe { libc::close(fd) };
            Err(err)
        }
    }
}

pub(crate) fn sys_socket(domain: c_int, kind: c_int, protocol: c_int) -> io::Result<RawFd> {
    adopt(check(unsafe { libc::socket(domain, kind, protocol) })?)
}

pub(crate) fn sys_bind(fd: RawFd, addr: &sockaddr_storage, len: socklen_t) -> io::Result<()> {
    check(unsafe { libc::bind(fd, ptr::from_ref(addr).cast::<sockaddr>(), len) }).map(drop)
}

pub(crate) fn sys_listen(fd: RawFd, backlog: c_int) -> io::Result<()> {
    check(unsafe { libc::listen(fd, backlog) }).map(drop)
}

/// Accepts one connection, writing the peer address into `peer`.
///
/// Returns the new descriptor and the number of address bytes written.
pub(crate) fn sys_accept(
    fd: RawFd,
    peer: &mut sockaddr_storage,
) -> io::Result<(RawFd, socklen_t)> {
    let mut len = mem::size_of::<sockaddr_storage>() as socklen_t;

    let conn = check(unsafe { libc::accept(fd, ptr::from_mut(peer).cast::<sockaddr>(), &mut len) })?;

    Ok((adopt(conn)?, len))
}

pub(crate) fn sys_connect(fd: RawFd, addr: &sockaddr_storage, len: socklen_t) -> io::Result<()> {
    check(unsafe { libc::connect(fd, ptr::from_ref(addr).cast::<sockaddr>(), len) }).map(drop)
}

pub(crate) fn sys_sockname(fd: RawFd) -> io::Result<SocketAddr> {
    let mut storage: sockaddr_storage = unsafe { mem::zeroed() };
    let mut len = mem::size_of::<sockaddr_storage>() as socklen_t;

    check(unsafe {
        libc::getsockname(fd, ptr::from_mut(&mut storage).cast::<sockaddr>(), &mut len)
    })?;

    storage_to_addr(&storage)
}

/// Clears or sets `IPV6_V6ONLY`. Cleared means the socket also carries IPv4
/// traffic through mapped addresses.
pub(crate) fn sys_set_v6only(fd: RawFd, v6only: bool) -> io::Result<()> {
    let value = c_int::from(v6only);

    check(unsafe {
        libc::setsockopt(
            fd,
            IPPROTO_IPV6,
            IPV6_V6ONLY,
            ptr::from_ref(&value).cast(),
            mem::size_of::<c_int>() as socklen_t,
        )
    })
    .map(drop)
}

/// Platform text for an `errno` value. Unlike `io::Error`'s `Display` it
/// carries no `(os error N)` suffix.
pub(crate) fn sys_strerror(code: c_int) -> String {
    let mut buf = [0 as c_char; 128];

    if unsafe { libc::strerror_r(code, buf.as_mut_ptr(), buf.len()) } != 0 {
        return format!("Unknown error {code}");
    }

    unsafe { CStr::from_ptr(buf.as_ptr()) }
        .to_string_lossy()
        .into_owned()
}

/// Decodes an IPv4 or IPv6 address from a socket address buffer.
pub(crate) fn storage_to_addr(storage: &sockaddr_storage) -> io::Result<SocketAddr> {
    match c_int::from(storage.ss_family) {
        AF_INET => {
            let sin = unsafe { ptr::read(ptr::from_ref(storage).cast::<sockaddr_in>()) };

            Ok(SocketAddr::V4(SocketAddrV4::new(
                Ipv4Addr::from(sin.sin_addr.s_addr.to_ne_bytes()),
                u16::from_be(sin.sin_port),
            )))
        }
        AF_INET6 => {
            let sin6 = unsafe { ptr::read(ptr::from_ref(storage).cast::<sockaddr_in6>()) };

            Ok(SocketAddr::V6(SocketAddrV6::new(
                Ipv6Addr::from(sin6.sin6_addr.s6_addr),
                u16::from_be(sin6.sin6_port),
                sin6.sin6_flowinfo,
                sin6.sin6_scope_id,
            )))
        }
        family => Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("address family {family} is not supported"),
        )),
    }
}

/// Encodes `addr` into a socket address buffer and returns the meaningful
/// length.
pub(crate) fn addr_to_storage(addr: &SocketAddr) -> (sockaddr_storage, socklen_t) {
    let mut storage: sockaddr_storage = unsafe { mem::zeroed() };

    let len = match addr {
        SocketAddr::V4(v4) => {
            let mut sin: sockaddr_in = unsafe { mem::zeroed() };
            sin.sin_family = AF_INET as sa_family_t;
            sin.sin_port = v4.port().to_be();
            sin.sin_addr.s_addr = u32::from_ne_bytes(v4.ip().octets());

            unsafe { ptr::write(ptr::from_mut(&mut storage).cast::<sockaddr_in>(), sin) };
            mem::size_of::<sockaddr_in>()
        }
        SocketAddr::V6(v6) => {
            let mut sin6: sockaddr_in6 = unsafe { mem::zeroed() };
            sin6.sin6_family = AF_INET6 as sa_family_t;
            sin6.sin6_port = v6.port().to_be();
            sin6.sin6_flowinfo = v6.flowinfo();
            sin6.sin6_addr.s6_addr = v6.ip().octets();
            sin6.sin6_scope_id = v6.scope_id();

            unsafe { ptr::write(ptr::from_mut(&mut storage).cast::<sockaddr_in6>(), sin6) };
            mem::size_of::<sockaddr_in6>()
        }
    };

    (storage, len as socklen_t)
}
