use std::fmt;

/// Connection state bits of a [`Vio`](super::Vio).
///
/// At most one of [`IS_CLIENT`](Self::IS_CLIENT) and
/// [`IS_SERVER`](Self::IS_SERVER) is set once a role is established.
/// [`IS_CONNECTING`](Self::IS_CONNECTING) lasts from connect initiation to the
/// first successful read or write. [`IS_CLOSED`](Self::IS_CLOSED) is set by
/// `close` and by every reported failure.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct VioFlags(u8);

impl VioFlags {
    pub const IS_CLIENT: Self = Self(0x01);
    pub const IS_SERVER: Self = Self(0x02);
    pub const IS_CONNECTING: Self = Self(0x04);
    pub const IS_CLOSED: Self = Self(0x08);

    pub const fn empty() -> Self {
        Self(0)
    }

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub const fn contains(self, other: VioFlags) -> bool {
        self.0 & other.0 == other.0
    }

    /// Sets or clears `flag`.
    pub fn set(&mut self, flag: VioFlags, on: bool) {
        if on {
            self.0 |= flag.0;
        } else {
            self.0 &= !flag.0;
        }
    }
}

impl fmt::Debug for VioFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names = [
            (Self::IS_CLIENT, "IS_CLIENT"),
            (Self::IS_SERVER, "IS_SERVER"),
            (Self::IS_CONNECTING, "IS_CONNECTING"),
            (Self::IS_CLOSED, "IS_CLOSED"),
        ];

        f.debug_set()
            .entries(
                names
                    .iter()
                    .filter(|(flag, _)| self.contains(*flag))
                    .map(|(_, name)| name),
            )
            .finish()
    }
}
