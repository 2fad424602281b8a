//! PTY session management for chirp.
//!
//! Runs the user's shell on a pseudo-terminal, relays bytes between it and
//! the real terminal, and reports every relayed chunk to a [`SessionObserver`].

pub mod error;
pub mod raw_mode;
pub mod session;
pub mod signals;
pub mod stop;

pub use error::SessionError;
pub use raw_mode::{
    CrosstermRawMode, CrosstermWindowSize, FixedWindowSize, NoRawMode, RawMode, WindowSize,
};
pub use session::{Session, SessionConfig, SessionIo, SessionObserver, SessionState};
pub use stop::StopSignal;
