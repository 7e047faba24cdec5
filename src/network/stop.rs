//! Cooperative stop signal
//!
//! Checked by the session loop between frames and by the supervisor while
//! it waits out a backoff. It never interrupts a blocked read; the read
//! deadline bounds how long a stop can take to be noticed.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crossbeam::channel::{bounded, Receiver, Sender};

struct Inner {
    stopped: AtomicBool,
    wake_tx: Sender<()>,
    wake_rx: Receiver<()>,
}

/// Shared stop flag
#[derive(Clone)]
pub struct StopSignal {
    inner: Arc<Inner>,
}

impl Default for StopSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl StopSignal {
    pub fn new() -> Self {
        let (wake_tx, wake_rx) = bounded(1);
        Self {
            inner: Arc::new(Inner {
                stopped: AtomicBool::new(false),
                wake_tx,
                wake_rx,
            }),
        }
    }

    /// Request a stop. Idempotent.
    pub fn stop(&self) {
        if !self.inner.stopped.swap(true, Ordering::SeqCst) {
            tracing::debug!("Stop requested");
        }
        let _ = self.inner.wake_tx.try_send(());
    }

    pub fn is_stopped(&self) -> bool {
        self.inner.stopped.load(Ordering::SeqCst)
    }

    /// Sleep for up to `timeout`, waking early on stop
    ///
    /// Returns true if a stop has been requested.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        if self.is_stopped() {
            return true;
        }
        if self.inner.wake_rx.recv_timeout(timeout).is_ok() {
            // Put the token back for any other waiter
            let _ = self.inner.wake_tx.try_send(());
        }
        self.is_stopped()
    }
}

impl std::fmt::Debug for StopSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StopSignal")
            .field("stopped", &self.is_stopped())
            .finish()
    }
}
