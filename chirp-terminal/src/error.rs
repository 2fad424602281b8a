//! Typed error types for chirp-terminal.
//!
//! Failures before the loops run are fatal-startup errors; once the session
//! is running, stream errors tear the session down through `Session::stop`
//! instead of surfacing here.

use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    /// The OS refused to allocate a pseudo-terminal pair.
    #[error("Failed to allocate PTY: {0}")]
    PtyOpen(String),

    /// The shell could not be started on the PTY's slave side.
    #[error("Failed to spawn shell '{shell}': {reason}")]
    Spawn {
        /// Shell command that was being started.
        shell: String,
        /// Error reported by the PTY layer.
        reason: String,
    },

    /// The PTY master's reader or writer handle could not be obtained.
    #[error("Failed to set up PTY I/O: {0}")]
    PtyIo(String),

    /// The real terminal could not be switched into raw mode.
    #[error("Failed to set raw mode: {0}")]
    RawMode(#[source] io::Error),

    /// One of the session's loops could not be spawned.
    #[error("Failed to start {name} thread: {source}")]
    Thread {
        name: &'static str,
        #[source]
        source: io::Error,
    },

    #[error("Session already started")]
    AlreadyStarted,

    #[error("Shell not started or already waited on")]
    NotStarted,

    /// Waiting for the shell process failed.
    #[error("Error waiting for shell exit: {0}")]
    Wait(#[source] io::Error),

    /// A POSIX signal handler could not be installed.
    #[error("Failed to install {0} handler")]
    Signal(&'static str),
}
