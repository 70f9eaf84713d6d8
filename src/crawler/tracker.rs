//! Completion tracker for a dynamically growing set of work
//!
//! Every unit of work is registered before it is handed to a pool and
//! arrives exactly once when it terminates, whether it succeeded, failed or
//! was discarded on shutdown. Arrival is tied to dropping the
//! [`PendingUnit`], so the pairing cannot be broken by an early return.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

/// Counts outstanding units of work and wakes waiters at zero
#[derive(Debug, Default)]
pub struct CompletionTracker {
    pending: AtomicUsize,
    quiescent: Notify,
}

/// One registered unit of work; arrives when dropped
#[derive(Debug)]
#[must_use = "dropping the unit immediately marks the work as finished"]
pub struct PendingUnit {
    tracker: Arc<CompletionTracker>,
}

impl CompletionTracker {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Registers one unit of work
    pub fn register(self: &Arc<Self>) -> PendingUnit {
        self.pending.fetch_add(1, Ordering::AcqRel);
        PendingUnit {
            tracker: Arc::clone(self),
        }
    }

    /// Number of units registered and not yet arrived
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::Acquire)
    }

    /// Waits until no unit is outstanding
    ///
    /// The count is re-checked after every wake-up: new work may be
    /// registered between the count hitting zero and this waiter running.
    pub async fn quiescent(&self) {
        loop {
            let notified = self.quiescent.notified();
            tokio::pin!(notified);
            // Subscribe before reading the count so a concurrent arrival at
            // zero cannot slip between the check and the await.
            notified.as_mut().enable();

            if self.pending() == 0 {
                return;
            }

            notified.await;
        }
    }

    fn arrive(&self) {
        let previous = self.pending.fetch_sub(1, Ordering::AcqRel);
        debug_assert!(previous > 0, "arrive without matching register");
        if previous == 1 {
            self.quiescent.notify_waiters();
        }
    }
}

impl Drop for PendingUnit {
    fn drop(&mut self) {
        self.tracker.arrive();
    }
}
