//! Pool configuration.

use std::num::NonZeroUsize;

use serde::{Deserialize, Serialize};

pub const DEFAULT_THREAD_NAME: &str = "spindle-worker";

/// Configuration for a [`WorkerPool`](super::WorkerPool).
///
/// Missing fields fall back to [`PoolConfig::default`] when deserialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Number of worker threads. 0 is clamped to 1 at construction.
    pub workers: usize,

    /// Threads are named `{thread_name}-{index}`.
    pub thread_name: String,

    /// Stack size in bytes; `None` uses the platform default.
    pub stack_size: Option<usize>,
}

impl PoolConfig {
    pub fn new(workers: usize) -> Self {
        Self {
            workers,
            ..Self::default()
        }
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = name.into();
        self
    }

    pub fn with_stack_size(mut self, bytes: usize) -> Self {
        self.stack_size = Some(bytes);
        self
    }

    /// Worker count actually used by the pool (never 0).
    pub fn effective_workers(&self) -> usize {
        self.workers.max(1)
    }
}

impl Default for PoolConfig {
    /// One worker per available hardware thread, or 1 if that is unknown.
    fn default() -> Self {
        Self {
            workers: available_parallelism(),
            thread_name: DEFAULT_THREAD_NAME.to_string(),
            stack_size: None,
        }
    }
}

pub(crate) fn available_parallelism() -> usize {
    std::thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(1)
}
