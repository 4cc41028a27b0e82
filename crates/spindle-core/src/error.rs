//! Error types for the pool and for task outcomes.
//!
//! - `PoolError`: returned synchronously from `submit*` / construction
//! - `TaskError`: stored in a `ResultHandle` and surfaced by `get()`

use std::sync::Arc;

use thiserror::Error;

/// Boxed error accepted from fallible tasks.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Usage errors reported at the call site.
#[derive(Debug, Error)]
pub enum PoolError {
    #[error("empty task not supported")]
    EmptyTask,

    #[error("pool is shutting down; no further tasks are accepted")]
    ShuttingDown,

    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[source] std::io::Error),
}

/// Outcome of a task that did not produce a value.
///
/// `Clone` so that every `SharedResultHandle` can hand out the same failure.
#[derive(Debug, Clone, Error)]
pub enum TaskError {
    /// The task returned `Err`.
    #[error("task failed: {0}")]
    Failed(#[source] Arc<dyn std::error::Error + Send + Sync + 'static>),

    /// The task panicked. Holds the panic message when it was a string.
    #[error("task panicked: {0}")]
    Panicked(String),

    /// The producing side went away without recording an outcome.
    #[error("task was dropped before producing a result")]
    Abandoned,
}

impl TaskError {
    pub fn failed(err: impl Into<BoxError>) -> Self {
        TaskError::Failed(Arc::from(err.into()))
    }

    pub fn is_panic(&self) -> bool {
        matches!(self, TaskError::Panicked(_))
    }

    /// Try to view the original error as a concrete type.
    pub fn downcast_ref<E: std::error::Error + 'static>(&self) -> Option<&E> {
        match self {
            TaskError::Failed(err) => err.downcast_ref::<E>(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Error)]
    #[error("out of range: {0}")]
    struct OutOfRange(usize);

    #[test]
    fn failed_keeps_the_original_error() {
        let err = TaskError::failed(OutOfRange(5));
        assert_eq!(err.to_string(), "task failed: out of range: 5");
        assert!(matches!(err.downcast_ref::<OutOfRange>(), Some(OutOfRange(5))));
        assert!(!err.is_panic());
    }

    #[test]
    fn failed_accepts_plain_strings() {
        let err = TaskError::failed("Error#3");
        assert_eq!(err.to_string(), "task failed: Error#3");
    }

    #[test]
    fn clones_share_the_same_source() {
        let err = TaskError::failed(OutOfRange(1));
        let cloned = err.clone();
        match (&err, &cloned) {
            (TaskError::Failed(a), TaskError::Failed(b)) => assert!(Arc::ptr_eq(a, b)),
            _ => panic!("expected Failed"),
        }
    }

    #[test]
    fn pool_error_messages() {
        assert_eq!(PoolError::EmptyTask.to_string(), "empty task not supported");
        assert!(PoolError::ShuttingDown.to_string().contains("shutting down"));
    }
}
