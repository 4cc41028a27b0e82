//! Worker and pool state machines.

use serde::{Deserialize, Serialize};

/// Worker state.
///
/// State transitions:
/// - Running -> Stopped (after dequeuing its stop signal)
///
/// `Stopped` is terminal and reached exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerState {
    /// Looping: blocked on the queue or executing a task.
    Running,

    /// Left its loop; the thread has exited.
    Stopped,
}

impl WorkerState {
    pub fn is_terminal(self) -> bool {
        matches!(self, WorkerState::Stopped)
    }
}

/// Pool lifecycle.
///
/// State transitions:
/// - Open -> ShuttingDown (first `shutdown()` call; stop signals enqueued)
/// - ShuttingDown -> Stopped (every worker joined)
///
/// Submissions are only accepted while `Open`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Lifecycle {
    Open,
    ShuttingDown,
    Stopped,
}

impl Lifecycle {
    pub fn accepts_tasks(self) -> bool {
        matches!(self, Lifecycle::Open)
    }
}
