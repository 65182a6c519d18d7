use super::event::{Interest, Token};
use crate::error::{Error, Result};

use std::collections::HashMap;
use std::os::fd::RawFd;

/// One-shot arming state of a registered descriptor.
///
/// ```text
/// unregistered --associate--> Armed --event delivered--> Fired
///       ^                       ^                          |
///       |                       +----associate / rearm-----+
///       +------------------- dissociate (from any state)
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArmState {
    /// The kernel will report the next readiness change.
    Armed,

    /// One event was delivered; the kernel has disarmed the descriptor and
    /// it stays silent until it is re-armed.
    Fired,
}

/// Kernel call needed to (re-)arm a descriptor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Arm {
    Add,
    Modify,
}

#[derive(Clone, Copy, Debug)]
pub(crate) struct Registration {
    pub(crate) token: Token,
    pub(crate) interest: Interest,
    pub(crate) state: ArmState,
}

/// Descriptor to registration table owned by the multiplexer.
///
/// It is sized dynamically; there is no bound on descriptor values.
pub(crate) struct Registry {
    entries: HashMap<RawFd, Registration>,
}

impl Registry {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: HashMap::with_capacity(capacity),
        }
    }

    /// Decides how `fd` must be armed, refusing descriptors that are still
    /// armed.
    pub(crate) fn plan(&self, fd: RawFd) -> Result<Arm> {
        match self.entries.get(&fd).map(|r| r.state) {
            None => Ok(Arm::Add),
            Some(ArmState::Fired) => Ok(Arm::Modify),
            Some(ArmState::Armed) => Err(Error::AlreadyRegistered(fd)),
        }
    }

    pub(crate) fn arm(&mut self, fd: RawFd, token: Token, interest: Interest) {
        self.entries.insert(
            fd,
            Registration {
                token,
                interest,
                state: ArmState::Armed,
            },
        );
    }

    /// Records a delivery for `fd`.
    ///
    /// Returns the registration if it was armed. A descriptor that is unknown
    /// or already fired yields `None` and its event must be dropped.
    pub(crate) fn fire(&mut self, fd: RawFd) -> Option<Registration> {
        let registration = self.entries.get_mut(&fd)?;

        if registration.state == ArmState::Fired {
            return None;
        }

        registration.state = ArmState::Fired;
        Some(*registration)
    }

    pub(crate) fn remove(&mut self, fd: RawFd) -> Option<Registration> {
        self.entries.remove(&fd)
    }

    pub(crate) fn get(&self, fd: RawFd) -> Option<&Registration> {
        self.entries.get(&fd)
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_descriptor_is_added() {
        let registry = Registry::with_capacity(4);

        assert_eq!(registry.plan(7).unwrap(), Arm::Add);
    }

    #[test]
    fn armed_descriptor_is_refused() {
        let mut registry = Registry::with_capacity(4);
        registry.arm(7, Token(1), Interest::READABLE);

        assert!(matches!(registry.plan(7), Err(Error::AlreadyRegistered(7))));
    }

    #[test]
    fn fired_descriptor_is_modified() {
        let mut registry = Registry::with_capacity(4);
        registry.arm(7, Token(1), Interest::READABLE);

        let fired = registry.fire(7).unwrap();
        assert_eq!(fired.token, Token(1));
        assert_eq!(registry.get(7).unwrap().state, ArmState::Fired);
        assert_eq!(registry.plan(7).unwrap(), Arm::Modify);
    }

    #[test]
    fn fire_delivers_at_most_once() {
        let mut registry = Registry::with_capacity(4);
        registry.arm(3, Token(9), Interest::BOTH);

        assert!(registry.fire(3).is_some());
        assert!(registry.fire(3).is_none());
        assert!(registry.fire(4).is_none());
    }

    #[test]
    fn rearm_replaces_token_and_interest() {
        let mut registry = Registry::with_capacity(4);
        registry.arm(3, Token(1), Interest::READABLE);
        registry.fire(3);
        registry.arm(3, Token(2), Interest::WRITABLE);

        let registration = registry.get(3).unwrap();
        assert_eq!(registration.token, Token(2));
        assert_eq!(registration.interest, Interest::WRITABLE);
        assert_eq!(registration.state, ArmState::Armed);
    }

    #[test]
    fn remove_forgets_descriptor() {
        let mut registry = Registry::with_capacity(4);
        registry.arm(3, Token(1), Interest::READABLE);

        assert!(registry.remove(3).is_some());
        assert!(registry.remove(3).is_none());
        assert_eq!(registry.len(), 0);
        assert_eq!(registry.plan(3).unwrap(), Arm::Add);
    }
}
