//! Fixed-size worker pools
//!
//! A pool owns `size` long-lived worker tasks pulling jobs from one shared
//! queue. Each worker runs a single job at a time, so at most `size` jobs
//! of a pool are in flight. Closing the pool cancels its token: running
//! jobs are aborted at their next suspension point and queued jobs are
//! dropped with the queue once the last worker exits.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;

/// A unit of work for a pool
pub type Job = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// A job the pool refused because it is closed
///
/// The job is handed back so the caller can record the failure before the
/// job (and whatever it owns) is dropped.
pub struct Rejected {
    pub pool: &'static str,
    pub job: Job,
}

impl fmt::Debug for Rejected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rejected").field("pool", &self.pool).finish()
    }
}

pub struct WorkerPool {
    name: &'static str,
    size: usize,
    jobs: mpsc::UnboundedSender<Job>,
    cancel: CancellationToken,
}

impl WorkerPool {
    /// Spawns `size` workers on the current tokio runtime
    ///
    /// The pool stops when `cancel` (or a parent of it) is cancelled.
    pub fn new(name: &'static str, size: usize, cancel: CancellationToken) -> Self {
        let (jobs, queue) = mpsc::unbounded_channel();
        let queue = Arc::new(Mutex::new(queue));

        for worker_id in 0..size {
            tokio::spawn(worker(name, worker_id, Arc::clone(&queue), cancel.clone()));
        }

        tracing::debug!("Started {} pool with {} workers", name, size);

        Self {
            name,
            size,
            jobs,
            cancel,
        }
    }

    /// Queues `task` for execution on some worker
    pub fn submit<F>(&self, task: F) -> Result<(), Rejected>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let job: Job = Box::pin(task);

        if self.cancel.is_cancelled() {
            return Err(Rejected {
                pool: self.name,
                job,
            });
        }

        self.jobs.send(job).map_err(|err| Rejected {
            pool: self.name,
            job: err.0,
        })
    }

    /// Stops the pool; idempotent
    pub fn close(&self) {
        self.cancel.cancel();
    }

    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerPool")
            .field("name", &self.name)
            .field("size", &self.size)
            .field("closed", &self.is_closed())
            .finish()
    }
}

async fn worker(
    pool: &'static str,
    worker_id: usize,
    queue: Arc<Mutex<mpsc::UnboundedReceiver<Job>>>,
    cancel: CancellationToken,
) {
    tracing::trace!("{} worker {} starting", pool, worker_id);
    let mut processed = 0usize;

    loop {
        let job = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            job = async { queue.lock().await.recv().await } => job,
        };

        let Some(job) = job else {
            break;
        };

        // Run the job as its own task so a panicking job costs one job,
        // not one worker.
        let mut handle = tokio::spawn(job);
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                handle.abort();
                break;
            }
            result = &mut handle => {
                if let Err(e) = result {
                    if e.is_panic() {
                        tracing::error!("{} worker {}: job panicked", pool, worker_id);
                    }
                }
            }
        }
        processed += 1;
    }

    tracing::trace!(
        "{} worker {} stopping after {} jobs",
        pool,
        worker_id,
        processed
    );
}
