//! Bounded task pool for handler execution.
//!
//! The router hands every handler invocation to a [`TaskPool`] and moves on
//! without awaiting it. The pool caps how many handlers run at once with a
//! semaphore; submissions beyond the cap queue on the semaphore in FIFO
//! order rather than being dropped, so a burst of events degrades to
//! latency, never to lost work.
//!
//! A panicking handler is contained inside its own task: the panic is
//! caught and recorded in the fault counter, and the pool keeps serving.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use futures::FutureExt;
use tokio::sync::{Notify, Semaphore};
use tracing::error;

/// Default cap on concurrently running handler tasks.
pub const DEFAULT_WORKERS: usize = 32;

/// Concurrency-capped executor for fire-and-forget handler tasks.
///
/// Cloning is cheap and all clones share the same permits and counters.
#[derive(Clone)]
pub struct TaskPool {
    permits: Arc<Semaphore>,
    capacity: usize,
    /// Tasks submitted but not yet finished, counted at submission time so
    /// [`idle`](Self::idle) cannot miss a task that has not reached the
    /// semaphore yet.
    in_flight: Arc<AtomicU64>,
    drained: Arc<Notify>,
    completed: Arc<AtomicU64>,
    faulted: Arc<AtomicU64>,
}

impl TaskPool {
    /// Creates a pool running at most `workers` tasks concurrently.
    ///
    /// A zero cap is bumped to one so the pool can always make progress.
    pub fn new(workers: usize) -> Self {
        let capacity = workers.max(1);
        Self {
            permits: Arc::new(Semaphore::new(capacity)),
            capacity,
            in_flight: Arc::new(AtomicU64::new(0)),
            drained: Arc::new(Notify::new()),
            completed: Arc::new(AtomicU64::new(0)),
            faulted: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Submits a task for execution. Never blocks the caller.
    ///
    /// The task starts once a permit is free; waiting submissions are
    /// served in submission order. A panic inside the task is caught and
    /// logged without affecting other tasks.
    pub fn spawn<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.in_flight.fetch_add(1, Ordering::AcqRel);

        let permits = Arc::clone(&self.permits);
        let in_flight = Arc::clone(&self.in_flight);
        let drained = Arc::clone(&self.drained);
        let completed = Arc::clone(&self.completed);
        let faulted = Arc::clone(&self.faulted);

        tokio::spawn(async move {
            // acquire_owned only fails when the semaphore is closed, which
            // this pool never does; either way the in-flight count drops.
            if let Ok(_permit) = permits.acquire_owned().await {
                match std::panic::AssertUnwindSafe(task).catch_unwind().await {
                    Ok(()) => {
                        completed.fetch_add(1, Ordering::Relaxed);
                    }
                    Err(payload) => {
                        faulted.fetch_add(1, Ordering::Relaxed);
                        error!(panic = panic_message(&payload), "handler task panicked");
                    }
                }
            }

            if in_flight.fetch_sub(1, Ordering::AcqRel) == 1 {
                drained.notify_waiters();
            }
        });
    }

    /// Point-in-time counters for observability and tests.
    pub fn stats(&self) -> PoolStats {
        PoolStats {
            capacity: self.capacity,
            available: self.permits.available_permits(),
            in_flight: self.in_flight.load(Ordering::Acquire),
            completed: self.completed.load(Ordering::Relaxed),
            faulted: self.faulted.load(Ordering::Relaxed),
        }
    }

    /// Waits until every submitted task has finished, running or queued.
    ///
    /// New submissions made while waiting extend the wait. The runtime does
    /// not drain at shutdown; this is for embedders and tests that need a
    /// quiescence point.
    pub async fn idle(&self) {
        loop {
            let drained = self.drained.notified();
            if self.in_flight.load(Ordering::Acquire) == 0 {
                return;
            }
            drained.await;
        }
    }
}

impl std::fmt::Debug for TaskPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let stats = self.stats();
        f.debug_struct("TaskPool")
            .field("capacity", &stats.capacity)
            .field("available", &stats.available)
            .field("in_flight", &stats.in_flight)
            .field("completed", &stats.completed)
            .field("faulted", &stats.faulted)
            .finish()
    }
}

/// Snapshot of pool counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    /// Maximum number of concurrently running tasks.
    pub capacity: usize,
    /// Permits currently free.
    pub available: usize,
    /// Tasks submitted and not yet finished.
    pub in_flight: u64,
    /// Tasks that ran to completion.
    pub completed: u64,
    /// Tasks that panicked and were contained.
    pub faulted: u64,
}

/// Best-effort extraction of a panic payload for the fault log.
fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(text) = payload.downcast_ref::<&str>() {
        text
    } else if let Some(text) = payload.downcast_ref::<String>() {
        text.as_str()
    } else {
        "non-string panic payload"
    }
}
