//! ResultHandle - タスク結果の受け取り口（future）
//!
//! # 学習ポイント
//! - Mutex + Condvar による one-shot channel
//! - 消費する `get(self)` と共有ビュー `share()` の使い分け
//! - spawn_blocking による async への橋渡し
//!
//! `ResultHandle::get` consumes the handle: there is one consumer and the
//! value is moved out. To read the same outcome from several threads, turn
//! the handle into a [`SharedResultHandle`] with [`ResultHandle::share`].

mod shared;
mod slot;

pub use self::shared::SharedResultHandle;

pub(crate) use self::slot::Promise;

use std::sync::Arc;
use std::time::Duration;

use self::slot::{Slot, SlotState};
use crate::error::TaskError;
use crate::ids::TaskId;

/// Result of [`ResultHandle::wait_for`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitStatus {
    Ready,
    Timeout,
}

/// Create a connected producer/consumer pair for task `id`.
pub(crate) fn channel<R>(id: TaskId) -> (Promise<R>, ResultHandle<R>) {
    let slot = Arc::new(Slot::new());
    let promise = Promise::new(Arc::clone(&slot));
    (promise, ResultHandle { id, slot })
}

/// Handle to the eventual outcome of one submitted task.
///
/// # 使用例
/// ```
/// use spindle_core::WorkerPool;
///
/// let pool = WorkerPool::new(2)?;
/// let handle = pool.submit(|| 6 * 7)?;
/// assert_eq!(handle.get()?, 42);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[must_use = "dropping a ResultHandle discards the task's outcome, including failures"]
pub struct ResultHandle<R> {
    id: TaskId,
    slot: Arc<Slot<R>>,
}

impl<R> ResultHandle<R> {
    pub fn id(&self) -> TaskId {
        self.id
    }

    /// Block until the task finishes, then return its value or failure.
    pub fn get(self) -> Result<R, TaskError> {
        let mut state = self.slot.wait_resolved();
        match std::mem::replace(&mut *state, SlotState::Taken) {
            SlotState::Ready(outcome) => outcome,
            SlotState::Pending | SlotState::Taken => {
                unreachable!("consuming get() saw a slot that was not ready")
            }
        }
    }

    /// Block until the task finishes without taking the outcome.
    pub fn wait(&self) {
        drop(self.slot.wait_resolved());
    }

    /// Wait at most `timeout`. Does not cancel the task.
    pub fn wait_for(&self, timeout: Duration) -> WaitStatus {
        if self.slot.wait_resolved_for(timeout) {
            WaitStatus::Ready
        } else {
            WaitStatus::Timeout
        }
    }

    pub fn is_ready(&self) -> bool {
        self.slot.is_resolved()
    }

    /// Convert into a cloneable view; every clone observes the same outcome.
    pub fn share(self) -> SharedResultHandle<R>
    where
        R: Clone,
    {
        SharedResultHandle::new(self.id, self.slot)
    }

    /// Await the outcome from async code.
    ///
    /// The blocking wait runs on tokio's blocking thread pool, so this must be
    /// called from within a tokio runtime.
    pub async fn get_async(self) -> Result<R, TaskError>
    where
        R: Send + 'static,
    {
        match tokio::task::spawn_blocking(move || self.get()).await {
            Ok(outcome) => outcome,
            Err(join_err) => Err(TaskError::Panicked(join_err.to_string())),
        }
    }
}

impl<R> std::fmt::Debug for ResultHandle<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultHandle")
            .field("id", &self.id)
            .field("ready", &self.is_ready())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Instant;

    #[test]
    fn get_returns_value_set_on_another_thread() {
        let (promise, handle) = channel(TaskId::generate());
        let producer = thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            promise.set(Ok(String::from("done")));
        });
        assert_eq!(handle.get().unwrap(), "done");
        producer.join().unwrap();
    }

    #[test]
    fn get_surfaces_failure() {
        let (promise, handle) = channel::<i32>(TaskId::generate());
        promise.set(Err(TaskError::failed("Error#3")));
        let err = handle.get().unwrap_err();
        assert_eq!(err.to_string(), "task failed: Error#3");
    }

    #[test]
    fn wait_for_reports_timeout_then_ready() {
        let (promise, handle) = channel(TaskId::generate());
        let start = Instant::now();
        assert_eq!(handle.wait_for(Duration::from_millis(50)), WaitStatus::Timeout);
        assert!(start.elapsed() >= Duration::from_millis(50));
        assert!(!handle.is_ready());

        promise.set(Ok(1u8));
        assert_eq!(handle.wait_for(Duration::from_millis(50)), WaitStatus::Ready);
        assert!(handle.is_ready());
        handle.wait();
        assert_eq!(handle.get().unwrap(), 1);
    }

    #[test]
    fn dropped_producer_resolves_to_abandoned() {
        let (promise, handle) = channel::<()>(TaskId::generate());
        drop(promise);
        assert!(matches!(handle.get(), Err(TaskError::Abandoned)));
    }

    #[test]
    fn debug_shows_id_and_readiness() {
        let id = TaskId::generate();
        let (_promise, handle) = channel::<()>(id);
        let s = format!("{handle:?}");
        assert!(s.contains("ready: false"));
        assert_eq!(handle.id(), id);
    }

    #[tokio::test]
    async fn get_async_awaits_the_outcome() {
        let (promise, handle) = channel(TaskId::generate());
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            promise.set(Ok(9u32));
        });
        assert_eq!(handle.get_async().await.unwrap(), 9);
    }
}
