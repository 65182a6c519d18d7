use super::Multiplexer;
use crate::error::Result;

/// Conservative descriptor-table bound used to pre-size the registration
/// table when no hint is given.
pub const DEFAULT_SIZE_HINT: usize = 1024;

/// Builder for configuring and creating a [`Multiplexer`].
///
/// # Examples
///
/// ```rust,no_run
/// let mux = vio::MultiplexerBuilder::new()
///     .size_hint(256)
///     .build()?;
/// # Ok::<(), vio::Error>(())
/// ```
#[derive(Clone, Debug)]
pub struct MultiplexerBuilder {
    /// Expected number of simultaneously registered descriptors.
    size_hint: usize,

    /// Whether the kernel context is closed across `exec`.
    cloexec: bool,
}

impl MultiplexerBuilder {
    /// Creates a builder with the default configuration: a size hint of
    /// [`DEFAULT_SIZE_HINT`] and a close-on-exec context.
    pub fn new() -> Self {
        Self {
            size_hint: DEFAULT_SIZE_HINT,
            cloexec: true,
        }
    }

    /// Sets the expected number of registered descriptors.
    ///
    /// This only pre-sizes allocations; more descriptors can always be
    /// registered.
    ///
    /// # Panics
    ///
    /// Panics if `n == 0`.
    pub fn size_hint(mut self, n: usize) -> Self {
        assert!(n > 0, "size_hint must be > 0");

        self.size_hint = n;
        self
    }

    /// Sets whether the kernel context is inherited by child processes.
    pub fn cloexec(mut self, enabled: bool) -> Self {
        self.cloexec = enabled;
        self
    }

    /// Creates the multiplexer and its kernel readiness context.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Create`](crate::Error::Create) if the kernel context
    /// cannot be created.
    pub fn build(self) -> Result<Multiplexer> {
        Multiplexer::with_config(self.size_hint, self.cloexec)
    }
}

impl Default for MultiplexerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
