//! Edge-style notification that a control request is pending.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

/// A settable/resettable flag with a bounded blocking wait.
///
/// Senders push a request and then `set()`; the control loop `clear()`s
/// before popping so a request pushed in between is never missed.
#[derive(Debug, Default)]
pub struct WakeSignal {
    flag: AtomicBool,
    notify: Notify,
}

impl WakeSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an Arc-wrapped signal for sharing between both ends.
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Sets the flag and wakes every waiter.
    pub fn set(&self) {
        self.flag.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    /// Resets the flag.
    pub fn clear(&self) {
        self.flag.store(false, Ordering::SeqCst);
    }

    pub fn is_set(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Waits until the flag is set or `timeout` elapses.
    ///
    /// Returns the flag value at the end of the wait.
    pub async fn wait(&self, timeout: Duration) -> bool {
        let notified = self.notify.notified();
        tokio::pin!(notified);
        // Register before checking the flag so a concurrent set() is seen.
        notified.as_mut().enable();
        if self.is_set() {
            return true;
        }
        let _ = tokio::time::timeout(timeout, notified).await;
        self.is_set()
    }
}
