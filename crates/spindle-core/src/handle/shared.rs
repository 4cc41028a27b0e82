//! SharedResultHandle - 複数スレッドから読める結果ビュー

use std::sync::Arc;
use std::time::Duration;

use super::WaitStatus;
use super::slot::{Slot, SlotState};
use crate::error::TaskError;
use crate::ids::TaskId;

/// Read-only, cloneable view of a task outcome.
///
/// All clones resolve together, exactly once. `get()` may be called any
/// number of times and returns a clone of the stored value or failure.
pub struct SharedResultHandle<R> {
    id: TaskId,
    slot: Arc<Slot<R>>,
}

impl<R: Clone> SharedResultHandle<R> {
    pub(super) fn new(id: TaskId, slot: Arc<Slot<R>>) -> Self {
        Self { id, slot }
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn get(&self) -> Result<R, TaskError> {
        let state = self.slot.wait_resolved();
        match &*state {
            SlotState::Ready(outcome) => outcome.clone(),
            SlotState::Pending | SlotState::Taken => {
                unreachable!("shared handle saw a slot that was not ready")
            }
        }
    }

    pub fn wait(&self) {
        drop(self.slot.wait_resolved());
    }

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
}

impl<R> Clone for SharedResultHandle<R> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            slot: Arc::clone(&self.slot),
        }
    }
}

impl<R> std::fmt::Debug for SharedResultHandle<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedResultHandle")
            .field("id", &self.id)
            .field("ready", &self.slot.is_resolved())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::super::channel;
    use super::*;
    use std::thread;

    #[test]
    fn all_clones_see_the_same_value() {
        let (promise, handle) = channel(TaskId::generate());
        let shared = handle.share();

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let shared = shared.clone();
                thread::spawn(move || shared.get().unwrap())
            })
            .collect();

        thread::sleep(Duration::from_millis(20));
        promise.set(Ok(vec![1, 2, 3]));

        for reader in readers {
            assert_eq!(reader.join().unwrap(), vec![1, 2, 3]);
        }
        // repeated reads keep working
        assert_eq!(shared.get().unwrap(), vec![1, 2, 3]);
        assert_eq!(shared.get().unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn all_clones_see_the_same_failure() {
        let (promise, handle) = channel::<u32>(TaskId::generate());
        let a = handle.share();
        let b = a.clone();
        promise.set(Err(TaskError::Panicked("boom".into())));

        assert!(matches!(a.get(), Err(TaskError::Panicked(msg)) if msg == "boom"));
        assert!(matches!(b.get(), Err(TaskError::Panicked(msg)) if msg == "boom"));
        assert_eq!(a.id(), b.id());
    }

    #[test]
    fn wait_for_on_shared_view() {
        let (promise, handle) = channel(TaskId::generate());
        let shared = handle.share();
        assert_eq!(shared.wait_for(Duration::from_millis(10)), WaitStatus::Timeout);
        promise.set(Ok('x'));
        shared.wait();
        assert!(shared.is_ready());
        assert_eq!(shared.wait_for(Duration::ZERO), WaitStatus::Ready);
    }
}
