//! Shutdown controller
//!
//! Replaces a process-global stop flag with an explicit cancellation
//! handle. Signal delivery only sends on a watch channel; everything else
//! (closing the listener, draining workers, deleting the log store)
//! happens on the acceptor's normal exit path.

use tokio::sync::watch;

/// Owner side of the shutdown channel.
///
/// Cloning shares the same channel; `trigger` is idempotent and the
/// transition to the stopping state is never reversed.
#[derive(Debug, Clone)]
pub struct ShutdownController {
    tx: std::sync::Arc<watch::Sender<bool>>,
}

impl ShutdownController {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self {
            tx: std::sync::Arc::new(tx),
        }
    }

    /// Request shutdown. Safe to call from any task at any point; does no
    /// work beyond flipping the channel value.
    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }

    /// Create a signal handle observing this controller.
    pub fn signal(&self) -> ShutdownSignal {
        ShutdownSignal {
            rx: self.tx.subscribe(),
        }
    }
}

impl Default for ShutdownController {
    fn default() -> Self {
        Self::new()
    }
}

/// Observer side of the shutdown channel.
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    rx: watch::Receiver<bool>,
}

impl ShutdownSignal {
    /// Whether shutdown has been requested.
    pub fn is_triggered(&self) -> bool {
        *self.rx.borrow()
    }

    /// Wait until shutdown is requested.
    ///
    /// Also resolves if every controller has been dropped, so a server
    /// whose owner went away stops instead of running unsupervised.
    pub async fn triggered(&mut self) {
        loop {
            if *self.rx.borrow_and_update() {
                return;
            }
            if self.rx.changed().await.is_err() {
                return;
            }
        }
    }
}
