//! # vio
//!
//! **vio** couples a one-shot kernel readiness multiplexer with socket-like
//! handles whose transport can be swapped without touching caller code.
//!
//! It is the I/O core of an event loop, not an event loop itself: the
//! caller owns the loop, polls the [`Multiplexer`] for ready descriptors and
//! dispatches each event to the matching [`Vio`] handle.
//!
//! - [`Multiplexer`] owns one `epoll` context. Registrations are one-shot:
//!   each produces a single [`ReadinessEvent`] and must then be re-armed.
//! - [`Vio`] is a socket-like endpoint with connection state ([`VioFlags`]),
//!   an address buffer and an error record ([`VioError`]), driven by a
//!   [`Transport`].
//! - [`PlainTransport`] is the default transport over the system socket API.
//!   Wrapping it is the extension point for encrypted or framed transports.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use vio::{Family, Interest, Multiplexer, ReadinessEvent, SocketType, Source, Token, Vio};
//!
//! let mut mux = Multiplexer::new()?;
//!
//! let mut listener = Vio::new();
//! listener.socket(Family::Inet, SocketType::Stream, 0)?;
//! listener.bind("127.0.0.1:6667".parse().unwrap())?;
//! listener.listen(128)?;
//!
//! let fd = listener.fd().unwrap();
//! mux.associate(Source::Fd, fd, Interest::READABLE, Token(0))?;
//!
//! let mut events = [ReadinessEvent::default(); 64];
//! loop {
//!     let n = mux.get(&mut events, Some(Duration::from_secs(1)))?;
//!
//!     for event in &events[..n] {
//!         if event.opaque == Token(0) {
//!             let mut client = Vio::new();
//!             if listener.accept(Some(&mut client))? {
//!                 // register `client` under its own token ...
//!             }
//!             mux.associate(Source::Fd, fd, Interest::READABLE, Token(0))?;
//!         }
//!     }
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Logging
//!
//! The crate emits [`tracing`] events (reported handle failures at `error`
//! level, registrations at `debug`, per-call details at `trace`) and never
//! installs a subscriber itself.

mod error;
mod ioevent;
mod vio;

pub mod sys;

pub use error::{Error, Result};
pub use ioevent::{
    ArmState, DEFAULT_SIZE_HINT, Interest, Multiplexer, MultiplexerBuilder, ReadinessEvent,
    Source, Status, Token,
};
pub use vio::{
    ErrorKind, ErrorOp, Family, MAX_ERROR_MESSAGE, PlainTransport, SocketType, Transport, Vio,
    VioAddress, VioError, VioFlags, VioState,
};
