//! SynchronizedQueue - スレッド間の受け渡し用 FIFO キュー
//!
//! # 学習ポイント
//! - Mutex + Condvar による blocking pop
//! - `wait_while` で述語を再チェック（spurious wakeup 対策）
//! - `try_lock` による non-blocking pop
//!
//! No user code ever runs while the lock is held, so a poisoned mutex still
//! guards a consistent `VecDeque`; every lock site recovers with
//! `PoisonError::into_inner`.

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError, TryLockError};
use std::time::Duration;

/// Unbounded FIFO queue shared between producers and consumers.
///
/// # 使用例
/// ```
/// use spindle_core::SynchronizedQueue;
///
/// let queue = SynchronizedQueue::new();
/// queue.push(1);
/// queue.push_batch([2, 3]);
/// assert_eq!(queue.pop(), 1);
/// assert_eq!(queue.try_pop(), Some(2));
/// ```
pub struct SynchronizedQueue<T> {
    items: Mutex<VecDeque<T>>,
    /// push 時の通知用
    not_empty: Condvar,
}

impl<T> SynchronizedQueue<T> {
    pub fn new() -> Self {
        Self {
            items: Mutex::new(VecDeque::new()),
            not_empty: Condvar::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<T>> {
        self.items.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append one item and wake one blocked consumer.
    pub fn push(&self, item: T) {
        self.lock().push_back(item);
        // Lock released here
        self.not_empty.notify_one();
    }

    /// Append a whole batch under a single lock acquisition, then wake every
    /// blocked consumer.
    ///
    /// No other push can land between two items of the same batch.
    pub fn push_batch<I>(&self, items: I)
    where
        I: IntoIterator<Item = T>,
    {
        let pushed = {
            let mut guard = self.lock();
            let before = guard.len();
            guard.extend(items);
            guard.len() - before
        };
        if pushed > 0 {
            self.not_empty.notify_all();
        }
    }

    /// Remove the head item, waiting as long as it takes for one to arrive.
    pub fn pop(&self) -> T {
        let guard = self.lock();
        let mut guard = self
            .not_empty
            .wait_while(guard, |items| items.is_empty())
            .unwrap_or_else(PoisonError::into_inner);
        match guard.pop_front() {
            Some(item) => item,
            None => unreachable!("wait_while returned with an empty queue"),
        }
    }

    /// Like [`pop`](Self::pop) but gives up after `timeout`.
    pub fn pop_timeout(&self, timeout: Duration) -> Option<T> {
        let guard = self.lock();
        let (mut guard, _result) = self
            .not_empty
            .wait_timeout_while(guard, timeout, |items| items.is_empty())
            .unwrap_or_else(PoisonError::into_inner);
        // An item may have arrived right at the deadline, so look regardless
        // of `timed_out()`.
        guard.pop_front()
    }

    /// Non-blocking pop.
    ///
    /// Returns `None` immediately when the lock is contended or the queue is
    /// empty.
    pub fn try_pop(&self) -> Option<T> {
        let mut guard = match self.items.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
            Err(TryLockError::WouldBlock) => return None,
        };
        guard.pop_front()
    }

    /// Snapshot; may be stale by the time the caller looks at it.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Snapshot; may be stale by the time the caller looks at it.
    pub fn len(&self) -> usize {
        self.lock().len()
    }
}

impl<T> Default for SynchronizedQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for SynchronizedQueue<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SynchronizedQueue")
            .field("len", &self.len())
            .finish()
    }
}
