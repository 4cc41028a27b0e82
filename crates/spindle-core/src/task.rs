//! Task - 引数なしで一度だけ呼べる仕事の単位
//!
//! # 二層構造
//! - **表層**: `Task<R>` - 値か失敗を返す callable（空にもできる）
//! - **内部**: `Message::{Run, Stop}` - キューに流れる型消去済みの job と停止合図

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use crate::error::{BoxError, TaskError};
use crate::ids::TaskId;

pub(crate) type Thunk<R> = Box<dyn FnOnce() -> Result<R, BoxError> + Send + 'static>;

/// Type-erased job as it travels through the queue.
pub(crate) type Job = Box<dyn FnOnce() + Send + 'static>;

/// What workers pull from the shared queue.
pub(crate) enum Message {
    Run { id: TaskId, job: Job },
    /// Poison pill: the worker that dequeues it leaves its loop.
    Stop,
}

/// A unit of work that may be empty.
///
/// An empty task is rejected by `WorkerPool::submit_task` with
/// `PoolError::EmptyTask` and never reaches the queue.
pub struct Task<R> {
    thunk: Option<Thunk<R>>,
}

impl<R> Task<R> {
    pub fn new<F>(f: F) -> Self
    where
        F: FnOnce() -> R + Send + 'static,
    {
        Self {
            thunk: Some(Box::new(move || Ok(f()))),
        }
    }

    /// A task whose `Err` is reported as `TaskError::Failed`.
    pub fn fallible<F, E>(f: F) -> Self
    where
        F: FnOnce() -> Result<R, E> + Send + 'static,
        E: Into<BoxError>,
    {
        Self {
            thunk: Some(Box::new(move || f().map_err(Into::into))),
        }
    }

    pub fn empty() -> Self {
        Self { thunk: None }
    }

    pub fn is_empty(&self) -> bool {
        self.thunk.is_none()
    }

    pub(crate) fn into_thunk(self) -> Option<Thunk<R>> {
        self.thunk
    }
}

impl<R> Default for Task<R> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<R> std::fmt::Debug for Task<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Task")
            .field("empty", &self.is_empty())
            .finish()
    }
}

/// Run a thunk, turning both `Err` and panics into `TaskError`.
pub(crate) fn run_contained<R>(thunk: Thunk<R>) -> Result<R, TaskError> {
    match panic::catch_unwind(AssertUnwindSafe(thunk)) {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err)) => Err(TaskError::failed(err)),
        Err(payload) => Err(TaskError::Panicked(panic_message(payload.as_ref()))),
    }
}

/// `err.to_string()` with a panicking user `Display` impl contained.
pub(crate) fn describe_contained(err: &TaskError) -> String {
    panic::catch_unwind(AssertUnwindSafe(|| err.to_string()))
        .unwrap_or_else(|payload| format!("<Display panicked: {}>", panic_message(payload.as_ref())))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
