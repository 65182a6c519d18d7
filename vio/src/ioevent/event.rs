use std::fmt;
use std::os::fd::RawFd;

/// Kind of object a registration refers to.
///
/// Only [`Source::Fd`] is backed by the kernel today. The other kinds are
/// accepted by [`Multiplexer::associate`](super::Multiplexer::associate) and
/// [`Multiplexer::dissociate`](super::Multiplexer::dissociate) as no-ops so
/// callers can already be written against them.
#[non_exhaustive]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Source {
    /// A file-descriptor-like object (socket, pipe, eventfd, ...).
    #[default]
    Fd,

    /// A timer source. Reserved.
    Timer,

    /// A signal source. Reserved.
    Signal,
}

/// Non-owning back-reference handed back with every readiness event.
///
/// The multiplexer stores and returns it verbatim and never interprets it.
/// It is typically an index into the caller's table of handles.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Token(pub usize);

impl From<usize> for Token {
    fn from(value: usize) -> Self {
        Token(value)
    }
}

/// Read and write interest requested for a registration.
///
/// The bit positions match [`Status`]: bit 0 is readable, bit 1 is writable.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Interest {
    pub read: bool,
    pub write: bool,
}

impl Interest {
    /// Hangup and error only.
    pub const NONE: Self = Self {
        read: false,
        write: false,
    };

    pub const READABLE: Self = Self {
        read: true,
        write: false,
    };

    pub const WRITABLE: Self = Self {
        read: false,
        write: true,
    };

    pub const BOTH: Self = Self {
        read: true,
        write: true,
    };

    /// Builds an interest from wire bits. Bits other than readable and
    /// writable are ignored.
    pub const fn from_bits(bits: u8) -> Self {
        Self {
            read: bits & Status::READABLE.0 != 0,
            write: bits & Status::WRITABLE.0 != 0,
        }
    }

    pub const fn bits(self) -> u8 {
        let mut bits = 0;

        if self.read {
            bits |= Status::READABLE.0;
        }
        if self.write {
            bits |= Status::WRITABLE.0;
        }

        bits
    }
}

/// Portable readiness bitmask.
///
/// The layout is stable: bit 0 readable, bit 1 writable, bit 2 hangup,
/// bit 3 error. When hangup or error is reported it replaces the read and
/// write bits rather than being added to them.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Status(u8);

impl Status {
    pub const EMPTY: Self = Self(0);
    pub const READABLE: Self = Self(0x01);
    pub const WRITABLE: Self = Self(0x02);
    pub const HANGUP: Self = Self(0x04);
    pub const ERROR: Self = Self(0x08);

    const ALL: u8 = 0x0f;

    /// Builds a status from wire bits, dropping undefined bits.
    pub const fn from_bits(bits: u8) -> Self {
        Self(bits & Self::ALL)
    }

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub const fn contains(self, other: Status) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn is_readable(self) -> bool {
        self.contains(Self::READABLE)
    }

    pub const fn is_writable(self) -> bool {
        self.contains(Self::WRITABLE)
    }

    pub const fn is_hangup(self) -> bool {
        self.contains(Self::HANGUP)
    }

    pub const fn is_error(self) -> bool {
        self.contains(Self::ERROR)
    }
}

impl std::ops::BitOr for Status {
    type Output = Status;

    fn bitor(self, rhs: Status) -> Status {
        Status(self.0 | rhs.0)
    }
}

impl std::ops::BitOrAssign for Status {
    fn bitor_assign(&mut self, rhs: Status) {
        self.0 |= rhs.0;
    }
}

impl fmt::Debug for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names = [
            (Self::READABLE, "READABLE"),
            (Self::WRITABLE, "WRITABLE"),
            (Self::HANGUP, "HANGUP"),
            (Self::ERROR, "ERROR"),
        ];

        let mut first = true;
        f.write_str("Status(")?;
        for (flag, name) in names {
            if self.contains(flag) {
                if !first {
                    f.write_str(" | ")?;
                }
                f.write_str(name)?;
                first = false;
            }
        }
        if first {
            f.write_str("EMPTY")?;
        }
        f.write_str(")")
    }
}

/// One entry of a readiness batch returned by
/// [`Multiplexer::get`](super::Multiplexer::get).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReadinessEvent {
    /// Kind of the watched object.
    pub source: Source,

    /// The watched descriptor.
    pub object: RawFd,

    /// The back-reference supplied at registration time.
    pub opaque: Token,

    /// What the object is ready for. Never empty in a returned batch.
    pub status: Status,
}
