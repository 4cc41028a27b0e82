//! Slot / Promise - 結果の受け渡し（producer 側）
//!
//! A `Slot` is written at most once. Mutex release on the writer side and
//! acquire on the reader side give the happens-before edge between "task
//! finished" and "`get()` returned".

use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::error::TaskError;

pub(crate) enum SlotState<R> {
    Pending,
    Ready(Result<R, TaskError>),
    /// Value moved out by a consuming `get()`.
    Taken,
}

impl<R> SlotState<R> {
    fn is_pending(&self) -> bool {
        matches!(self, SlotState::Pending)
    }
}

pub(crate) struct Slot<R> {
    state: Mutex<SlotState<R>>,
    ready: Condvar,
}

impl<R> Slot<R> {
    pub(crate) fn new() -> Self {
        Self {
            state: Mutex::new(SlotState::Pending),
            ready: Condvar::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SlotState<R>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn resolve(&self, outcome: Result<R, TaskError>) {
        {
            let mut state = self.lock();
            debug_assert!(state.is_pending(), "result slot resolved twice");
            if !state.is_pending() {
                return;
            }
            *state = SlotState::Ready(outcome);
        }
        self.ready.notify_all();
    }

    /// Block until the slot is no longer pending and return the locked state.
    pub(crate) fn wait_resolved(&self) -> MutexGuard<'_, SlotState<R>> {
        self.ready
            .wait_while(self.lock(), |state| state.is_pending())
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns `true` if the slot resolved before `timeout` elapsed.
    pub(crate) fn wait_resolved_for(&self, timeout: Duration) -> bool {
        let (state, _) = self
            .ready
            .wait_timeout_while(self.lock(), timeout, |state| state.is_pending())
            .unwrap_or_else(PoisonError::into_inner);
        !state.is_pending()
    }

    pub(crate) fn is_resolved(&self) -> bool {
        !self.lock().is_pending()
    }
}

/// Producer half. Dropping it unresolved resolves the slot to
/// `TaskError::Abandoned` so consumers never hang on a job that will not run.
pub(crate) struct Promise<R> {
    slot: Option<Arc<Slot<R>>>,
}

impl<R> Promise<R> {
    pub(crate) fn new(slot: Arc<Slot<R>>) -> Self {
        Self { slot: Some(slot) }
    }

    pub(crate) fn set(mut self, outcome: Result<R, TaskError>) {
        if let Some(slot) = self.slot.take() {
            slot.resolve(outcome);
        }
    }
}

impl<R> Drop for Promise<R> {
    fn drop(&mut self) {
        if let Some(slot) = self.slot.take() {
            slot.resolve(Err(TaskError::Abandoned));
        }
    }
}
