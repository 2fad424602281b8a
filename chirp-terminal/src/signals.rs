//! POSIX signal flags for resize and external termination.
//!
//! Handlers only store into atomics (async-signal-safe); the session's
//! resize loop polls and clears the flags.

use crate::error::SessionError;
use std::sync::atomic::{AtomicBool, Ordering};

static RESIZE_PENDING: AtomicBool = AtomicBool::new(false);
static TERMINATE_PENDING: AtomicBool = AtomicBool::new(false);

#[cfg(unix)]
extern "C" fn handle_sigwinch(_: libc::c_int) {
    RESIZE_PENDING.store(true, Ordering::SeqCst);
}

#[cfg(unix)]
extern "C" fn handle_terminate(_: libc::c_int) {
    TERMINATE_PENDING.store(true, Ordering::SeqCst);
}

/// Install handlers for SIGWINCH, SIGTERM, SIGHUP and SIGINT.
///
/// In raw mode Ctrl+C reaches the shell as a byte, so SIGINT only arrives
/// from outside (e.g. `kill -INT`).
#[cfg(unix)]
pub fn install() -> Result<(), SessionError> {
    let winch = handle_sigwinch as *const () as libc::sighandler_t;
    let terminate = handle_terminate as *const () as libc::sighandler_t;
    let handlers = [
        (libc::SIGWINCH, winch, "SIGWINCH"),
        (libc::SIGTERM, terminate, "SIGTERM"),
        (libc::SIGHUP, terminate, "SIGHUP"),
        (libc::SIGINT, terminate, "SIGINT"),
    ];
    for (signal, handler, name) in handlers {
        // SAFETY: the handlers only touch atomics.
        if unsafe { libc::signal(signal, handler) } == libc::SIG_ERR {
            log::error!("Failed to install {} handler", name);
            return Err(SessionError::Signal(name));
        }
    }
    log::debug!("Installed signal handlers");
    Ok(())
}

#[cfg(not(unix))]
pub fn install() -> Result<(), SessionError> {
    Ok(())
}

/// Take a pending resize notification, clearing it.
pub fn take_resize() -> bool {
    RESIZE_PENDING.swap(false, Ordering::SeqCst)
}

/// Take a pending termination request, clearing it.
pub fn take_terminate() -> bool {
    TERMINATE_PENDING.swap(false, Ordering::SeqCst)
}
