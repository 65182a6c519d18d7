use crate::sys::platform::{addr_to_storage, storage_to_addr};

use libc::{c_int, sockaddr_storage, socklen_t};
use std::fmt;
use std::mem;
use std::net::{SocketAddr, SocketAddrV6};

/// Address family requested from [`Vio::socket`](super::Vio::socket).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Family {
    /// Let the handle pick. Resolved to a dual-stack [`Family::Inet6`]
    /// socket, which also reaches IPv4 peers through mapped addresses.
    #[default]
    Unspec,
    Inet,
    Inet6,
}

impl Family {
    pub(crate) fn domain(self) -> c_int {
        match self {
            Family::Unspec | Family::Inet6 => libc::AF_INET6,
            Family::Inet => libc::AF_INET,
        }
    }
}

/// Socket type requested from [`Vio::socket`](super::Vio::socket).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum SocketType {
    #[default]
    Stream,
    Datagram,
}

impl SocketType {
    pub(crate) fn raw(self) -> c_int {
        match self {
            SocketType::Stream => libc::SOCK_STREAM,
            SocketType::Datagram => libc::SOCK_DGRAM,
        }
    }
}

/// Fixed-capacity address buffer of a handle.
///
/// Holds the peer address before `connect`, the local address before
/// `bind`, and the peer address of an accepted connection.
#[derive(Clone, Copy)]
pub struct VioAddress {
    storage: sockaddr_storage,
    len: socklen_t,
}

impl VioAddress {
    /// Capacity of the buffer in bytes.
    pub const CAPACITY: usize = mem::size_of::<sockaddr_storage>();

    pub fn new() -> Self {
        Self {
            storage: unsafe { mem::zeroed() },
            len: 0,
        }
    }

    /// Stores `addr`, replacing the previous content.
    pub fn set(&mut self, addr: SocketAddr) {
        let (storage, len) = addr_to_storage(&addr);

        self.storage = storage;
        self.len = len;
    }

    /// Returns the stored address, if any.
    pub fn get(&self) -> Option<SocketAddr> {
        if self.len == 0 {
            return None;
        }

        storage_to_addr(&self.storage).ok()
    }

    pub fn is_set(&self) -> bool {
        self.len != 0
    }

    pub fn clear(&mut self) {
        *self = Self::new();
    }

    /// Number of meaningful bytes in the buffer.
    pub fn len(&self) -> usize {
        self.len as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub(crate) fn raw(&self) -> Option<(&sockaddr_storage, socklen_t)> {
        (self.len != 0).then_some((&self.storage, self.len))
    }

    /// Buffer handed to `accept`; the written length is committed through
    /// [`commit`](Self::commit).
    pub(crate) fn storage_mut(&mut self) -> &mut sockaddr_storage {
        &mut self.storage
    }

    pub(crate) fn commit(&mut self, len: socklen_t) {
        self.len = len.min(Self::CAPACITY as socklen_t);
    }
}

impl Default for VioAddress {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for VioAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.get() {
            Some(addr) => write!(f, "VioAddress({addr})"),
            None => f.write_str("VioAddress(unset)"),
        }
    }
}

/// Rewrites IPv4 addresses as IPv4-mapped IPv6 ones for dual-stack sockets.
pub(crate) fn map_for_family(addr: SocketAddr, family: Option<Family>) -> SocketAddr {
    match (family, addr) {
        (Some(Family::Unspec | Family::Inet6), SocketAddr::V4(v4)) => {
            SocketAddr::V6(SocketAddrV6::new(v4.ip().to_ipv6_mapped(), v4.port(), 0, 0))
        }
        _ => addr,
    }
}
