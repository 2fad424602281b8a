//! Broadcast stop signal shared by every loop of a session.
//!
//! The signal is a zero-capacity channel whose only sender is dropped on
//! `stop()`. Every receiver then sees the channel disconnect, so a loop can
//! either poll `is_stopped()` between blocking calls or `select!` on
//! `receiver()` alongside its own work channel.

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, bounded};
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

#[derive(Clone)]
pub struct StopSignal {
    inner: Arc<StopInner>,
}

struct StopInner {
    sender: Mutex<Option<Sender<()>>>,
    receiver: Receiver<()>,
    stopped: AtomicBool,
}

impl Default for StopSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for StopSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StopSignal")
            .field("stopped", &self.is_stopped())
            .finish()
    }
}

impl StopSignal {
    pub fn new() -> Self {
        let (sender, receiver) = bounded(0);
        Self {
            inner: Arc::new(StopInner {
                sender: Mutex::new(Some(sender)),
                receiver,
                stopped: AtomicBool::new(false),
            }),
        }
    }

    /// Close the signal. Returns `true` only for the call that closed it;
    /// later calls are no-ops.
    pub fn stop(&self) -> bool {
        let sender = self.inner.sender.lock().take();
        match sender {
            Some(sender) => {
                // Flag first so a loop woken by the disconnect sees it set.
                self.inner.stopped.store(true, Ordering::SeqCst);
                drop(sender);
                true
            }
            None => false,
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.inner.stopped.load(Ordering::SeqCst)
    }

    /// A receiver that becomes ready (disconnected) once the signal closes.
    pub fn receiver(&self) -> Receiver<()> {
        self.inner.receiver.clone()
    }

    /// Block for up to `timeout`. Returns `true` if the signal closed.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        match self.inner.receiver.recv_timeout(timeout) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => true,
            Err(RecvTimeoutError::Timeout) => self.is_stopped(),
        }
    }

    /// Block until the signal closes.
    pub fn wait(&self) {
        let _ = self.inner.receiver.recv();
    }
}
