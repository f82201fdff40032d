//! Shutdown signalling for the watch loop
//!
//! The event loop runs on its own thread and checks a shared flag between
//! events. Stopping the daemon flips the flag; the loop observes it within one
//! poll interval and returns.

use parking_lot::RwLock;
use std::sync::Arc;

/// Cloneable cancellation flag shared by a daemon and its event loop.
#[derive(Clone, Default)]
pub struct ShutdownSignal {
    cancelled: Arc<RwLock<bool>>,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request shutdown. Idempotent.
    pub fn cancel(&self) {
        *self.cancelled.write() = true;
    }

    pub fn is_cancelled(&self) -> bool {
        *self.cancelled.read()
    }
}

impl std::fmt::Debug for ShutdownSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShutdownSignal")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}
