//! Pool status counters.

use std::sync::atomic::{AtomicUsize, Ordering};

use serde::{Deserialize, Serialize};

use crate::error::TaskError;
use crate::pool::Lifecycle;

/// Point-in-time snapshot returned by `WorkerPool::status()`.
///
/// Counters are read one by one, so a snapshot taken while tasks are running
/// may be slightly inconsistent (e.g. `succeeded + failed + panicked` briefly
/// lagging `submitted - queued`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolStatus {
    pub lifecycle: Lifecycle,
    pub workers: usize,
    pub running_workers: usize,
    pub queued: usize,
    pub submitted: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub panicked: usize,
}

impl PoolStatus {
    /// Tasks that have left the queue and finished, whatever the outcome.
    pub fn completed(&self) -> usize {
        self.succeeded + self.failed + self.panicked
    }
}

/// Shared counters. Workers hold an `Arc` to this, never to the pool.
#[derive(Debug, Default)]
pub(crate) struct PoolStats {
    pub(crate) running_workers: AtomicUsize,
    pub(crate) queued: AtomicUsize,
    pub(crate) submitted: AtomicUsize,
    succeeded: AtomicUsize,
    failed: AtomicUsize,
    panicked: AtomicUsize,
}

impl PoolStats {
    pub(crate) fn record<R>(&self, outcome: &Result<R, TaskError>) {
        let counter = match outcome {
            Ok(_) => &self.succeeded,
            Err(TaskError::Panicked(_)) => &self.panicked,
            Err(_) => &self.failed,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self, lifecycle: Lifecycle, workers: usize) -> PoolStatus {
        PoolStatus {
            lifecycle,
            workers,
            running_workers: self.running_workers.load(Ordering::Relaxed),
            queued: self.queued.load(Ordering::Relaxed),
            submitted: self.submitted.load(Ordering::Relaxed),
            succeeded: self.succeeded.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            panicked: self.panicked.load(Ordering::Relaxed),
        }
    }
}
