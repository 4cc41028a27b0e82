//! Cooperative cancellation for long-running task bodies.
//!
//! The pool never interrupts a task once a worker has picked it up. A task
//! that wants to be stoppable captures a [`StopToken`] and polls it.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Owner side: requests the stop.
#[derive(Debug, Clone, Default)]
pub struct StopSource {
    flag: Arc<AtomicBool>,
}

/// Observer side: cheap to clone and poll.
#[derive(Debug, Clone)]
pub struct StopToken {
    flag: Arc<AtomicBool>,
}

impl StopSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn token(&self) -> StopToken {
        StopToken {
            flag: Arc::clone(&self.flag),
        }
    }

    /// Returns `true` if this call made the request, `false` if a stop had
    /// already been requested.
    pub fn request_stop(&self) -> bool {
        !self.flag.swap(true, Ordering::Release)
    }

    pub fn stop_requested(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}

impl StopToken {
    pub fn stop_requested(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}
