//! Per-host admission gate
//!
//! Bounds the number of concurrent downloads per host. Each host gets its
//! own semaphore with `per_host` permits; a download holds an
//! [`OwnedSemaphorePermit`] for as long as it talks to the host. Waiters are
//! served in FIFO order as permits are returned.

use dashmap::DashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Limits concurrent downloads per host
pub struct HostGate {
    per_host: usize,
    semaphores: DashMap<String, Arc<Semaphore>>,
    closed: AtomicBool,
}

impl HostGate {
    pub fn new(per_host: usize) -> Self {
        Self {
            per_host,
            semaphores: DashMap::new(),
            closed: AtomicBool::new(false),
        }
    }

    /// Returns the semaphore for `host`, creating it on first use
    fn semaphore(&self, host: &str) -> Arc<Semaphore> {
        Arc::clone(
            self.semaphores
                .entry(host.to_string())
                .or_insert_with(|| {
                    tracing::debug!("New host {} (limit {})", host, self.per_host);
                    let semaphore = Semaphore::new(self.per_host);
                    // A host first seen after close must not admit anything either
                    if self.closed.load(Ordering::SeqCst) {
                        semaphore.close();
                    }
                    Arc::new(semaphore)
                })
                .value(),
        )
    }

    /// Waits for a download slot on `host`
    ///
    /// # Returns
    ///
    /// * `Some(permit)` - A slot is held until the permit is dropped
    /// * `None` - The gate was closed before a slot became free
    pub async fn acquire(&self, host: &str) -> Option<OwnedSemaphorePermit> {
        let semaphore = self.semaphore(host);
        if semaphore.available_permits() == 0 {
            tracing::trace!("{} saturated, waiting for a slot", host);
        }

        match semaphore.acquire_owned().await {
            Ok(permit) => Some(permit),
            Err(_) => {
                tracing::debug!("Gate closed, dropping request for {}", host);
                None
            }
        }
    }

    /// Wakes every waiter empty-handed and refuses new ones; idempotent
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        for entry in self.semaphores.iter() {
            entry.value().close();
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Number of hosts seen so far
    pub fn hosts(&self) -> usize {
        self.semaphores.len()
    }

    /// Slots currently held for `host`
    pub fn in_flight(&self, host: &str) -> usize {
        self.semaphores
            .get(host)
            .map(|semaphore| self.per_host.saturating_sub(semaphore.available_permits()))
            .unwrap_or(0)
    }
}

impl fmt::Debug for HostGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostGate")
            .field("per_host", &self.per_host)
            .field("hosts", &self.semaphores.len())
            .field("closed", &self.is_closed())
            .finish()
    }
}
