use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle, ThreadId};

use tracing::{debug, debug_span, error, info_span};

use super::{PoolConfig, WorkerState};
use crate::queue::SynchronizedQueue;
use crate::status::PoolStats;
use crate::task::Message;

/// One worker thread.
/// - 共有キューへの参照（Arc）と統計だけを持ち、プール本体は参照しない
/// - `state()` はスレッド自身が立てる停止フラグを読むので、join 中でも正しい
/// - join handle は `take_joiner()` で取り出し、ロックの外で join する
pub(crate) struct Worker {
    id: usize,
    thread_id: ThreadId,
    stopped: Arc<AtomicBool>,
    joiner: Option<Joiner>,
}

/// The join handle of one worker, taken out of its `Worker` for the join.
pub(crate) struct Joiner {
    id: usize,
    handle: JoinHandle<()>,
}

impl Worker {
    pub(crate) fn spawn(
        id: usize,
        config: &PoolConfig,
        queue: Arc<SynchronizedQueue<Message>>,
        stats: Arc<PoolStats>,
    ) -> io::Result<Self> {
        let mut builder = thread::Builder::new().name(format!("{}-{id}", config.thread_name));
        if let Some(size) = config.stack_size {
            builder = builder.stack_size(size);
        }

        // Count before the thread starts so a status() right after
        // construction already sees every worker.
        stats.running_workers.fetch_add(1, Ordering::Relaxed);
        let stopped = Arc::new(AtomicBool::new(false));
        let handle = builder
            .spawn({
                let stats = Arc::clone(&stats);
                let stopped = Arc::clone(&stopped);
                move || worker_loop(id, &queue, &stats, &stopped)
            })
            .inspect_err(|_| {
                stats.running_workers.fetch_sub(1, Ordering::Relaxed);
            })?;

        Ok(Self {
            id,
            thread_id: handle.thread().id(),
            stopped,
            joiner: Some(Joiner { id, handle }),
        })
    }

    pub(crate) fn thread_id(&self) -> ThreadId {
        self.thread_id
    }

    pub(crate) fn state(&self) -> WorkerState {
        if self.stopped.load(Ordering::Acquire) {
            WorkerState::Stopped
        } else {
            WorkerState::Running
        }
    }

    /// `None` once the handle has been handed out (and not given back).
    pub(crate) fn take_joiner(&mut self) -> Option<Joiner> {
        self.joiner.take()
    }

    pub(crate) fn restore_joiner(&mut self, joiner: Joiner) {
        debug_assert_eq!(joiner.id, self.id);
        self.joiner = Some(joiner);
    }

    pub(crate) fn join(mut self) {
        if let Some(joiner) = self.take_joiner() {
            joiner.join();
        }
    }
}

impl Joiner {
    pub(crate) fn id(&self) -> usize {
        self.id
    }

    pub(crate) fn thread_id(&self) -> ThreadId {
        self.handle.thread().id()
    }

    pub(crate) fn join(self) {
        if self.handle.join().is_err() {
            // Jobs contain their own panics, so this only fires on a bug in
            // the loop itself.
            error!(worker = self.id, "worker thread panicked");
        }
    }
}

fn worker_loop(
    id: usize,
    queue: &SynchronizedQueue<Message>,
    stats: &PoolStats,
    stopped: &AtomicBool,
) {
    let _span = info_span!("worker", id).entered();
    debug!(state = ?WorkerState::Running, "worker started");

    loop {
        match queue.pop() {
            Message::Stop => break,
            Message::Run { id: task_id, job } => {
                stats.queued.fetch_sub(1, Ordering::Relaxed);
                let _task = debug_span!("task", %task_id).entered();
                // User Drop/Display impls can still panic around the
                // contained task body; the loop must survive them.
                if panic::catch_unwind(AssertUnwindSafe(job)).is_err() {
                    error!(%task_id, "job panicked outside the task body");
                }
            }
        }
    }

    stats.running_workers.fetch_sub(1, Ordering::Relaxed);
    stopped.store(true, Ordering::Release);
    debug!(state = ?WorkerState::Stopped, "worker stopped");
}
