//! WorkerPool: a fixed set of threads pulling tasks from one shared queue.
//!
//! # Shutdown
//! `shutdown()` (or `Drop`) enqueues exactly one `Message::Stop` per worker
//! behind all work accepted so far, then joins every worker. Each worker
//! therefore drains the tasks queued ahead of its own stop signal and exits;
//! no worker can be left blocked in `pop()` waiting for work that never
//! comes.
//!
//! Concurrent `shutdown()` callers wait on `joins_done` until whoever took
//! the join handles has joined them; only a worker thread calling in skips
//! itself.
//!
//! Submissions that arrive after shutdown has begun are rejected with
//! `PoolError::ShuttingDown`. The lifecycle lock makes "accepted" and
//! "queued ahead of the stop signals" the same thing.

mod config;
mod state;
mod worker;

pub use self::config::{DEFAULT_THREAD_NAME, PoolConfig};
pub use self::state::{Lifecycle, WorkerState};

use std::iter;
use std::sync::atomic::Ordering;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError, RwLock};
use std::thread;

use tracing::{debug, info, warn};

use self::worker::{Joiner, Worker};
use crate::error::{BoxError, PoolError, TaskError};
use crate::handle::{self, ResultHandle};
use crate::ids::TaskId;
use crate::queue::SynchronizedQueue;
use crate::status::{PoolStats, PoolStatus};
use crate::task::{self, Job, Message, Task, Thunk};

/// Fixed-size FIFO thread pool.
///
/// # 使用例
/// ```
/// use spindle_core::WorkerPool;
///
/// let pool = WorkerPool::new(4)?;
/// let handles: Vec<_> = (1..=5)
///     .map(|x| pool.submit(move || x * x))
///     .collect::<Result<_, _>>()?;
/// let squares: Vec<i32> = handles
///     .into_iter()
///     .map(|h| h.get())
///     .collect::<Result<_, _>>()?;
/// assert_eq!(squares, vec![1, 4, 9, 16, 25]);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct WorkerPool {
    queue: Arc<SynchronizedQueue<Message>>,
    stats: Arc<PoolStats>,
    lifecycle: RwLock<Lifecycle>,
    roster: Mutex<Roster>,
    /// Signaled when a shutdown caller finishes its joins.
    joins_done: Condvar,
    worker_count: usize,
}

/// Workers plus whether some `shutdown()` caller is currently joining them.
struct Roster {
    workers: Vec<Worker>,
    joining: bool,
}

impl WorkerPool {
    /// Spawn `worker_count` workers (at least one).
    pub fn new(worker_count: usize) -> Result<Self, PoolError> {
        Self::with_config(PoolConfig::default().with_workers(worker_count))
    }

    /// One worker per available hardware thread.
    pub fn with_available_parallelism() -> Result<Self, PoolError> {
        Self::with_config(PoolConfig::default())
    }

    pub fn with_config(config: PoolConfig) -> Result<Self, PoolError> {
        if config.workers == 0 {
            warn!("worker pool requested with 0 workers; using 1");
        }
        let worker_count = config.effective_workers();

        let queue = Arc::new(SynchronizedQueue::new());
        let stats = Arc::new(PoolStats::default());

        let mut workers = Vec::with_capacity(worker_count);
        for id in 0..worker_count {
            match Worker::spawn(id, &config, Arc::clone(&queue), Arc::clone(&stats)) {
                Ok(worker) => workers.push(worker),
                Err(err) => {
                    warn!(spawned = workers.len(), error = %err, "failed to spawn worker; stopping the rest");
                    queue.push_batch(iter::repeat_with(|| Message::Stop).take(workers.len()));
                    for worker in workers {
                        worker.join();
                    }
                    return Err(PoolError::Spawn(err));
                }
            }
        }

        info!(workers = worker_count, name = %config.thread_name, "worker pool started");

        Ok(Self {
            queue,
            stats,
            lifecycle: RwLock::new(Lifecycle::Open),
            roster: Mutex::new(Roster {
                workers,
                joining: false,
            }),
            joins_done: Condvar::new(),
            worker_count,
        })
    }

    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    /// Submit a closure and get a handle to its return value.
    ///
    /// A panic inside `f` is caught on the worker and surfaces as
    /// `TaskError::Panicked` from the handle. If the handle is dropped
    /// without calling `get()`, that failure is only visible in the status
    /// counters and a `warn!` log line.
    pub fn submit<F, R>(&self, f: F) -> Result<ResultHandle<R>, PoolError>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        self.submit_task(Task::new(f))
    }

    /// Submit a closure returning `Result`; `Err` becomes `TaskError::Failed`.
    pub fn submit_fallible<F, R, E>(&self, f: F) -> Result<ResultHandle<R>, PoolError>
    where
        F: FnOnce() -> Result<R, E> + Send + 'static,
        R: Send + 'static,
        E: Into<BoxError>,
    {
        self.submit_task(Task::fallible(f))
    }

    /// Submit a prepared [`Task`]. An empty task is rejected with
    /// `PoolError::EmptyTask` and nothing is queued.
    pub fn submit_task<R>(&self, task: Task<R>) -> Result<ResultHandle<R>, PoolError>
    where
        R: Send + 'static,
    {
        let thunk = task.into_thunk().ok_or(PoolError::EmptyTask)?;
        let id = TaskId::generate();
        let (promise, handle) = handle::channel(id);

        let stats = Arc::clone(&self.stats);
        let job: Job = Box::new(move || {
            promise.set(run_and_record(id, thunk, &stats));
        });
        self.enqueue(id, job)?;
        Ok(handle)
    }

    /// Fire-and-forget. Failures are contained, counted and logged.
    pub fn execute<F>(&self, f: F) -> Result<(), PoolError>
    where
        F: FnOnce() + Send + 'static,
    {
        let id = TaskId::generate();
        let stats = Arc::clone(&self.stats);
        let thunk: Thunk<()> = Box::new(move || {
            f();
            Ok(())
        });
        let job: Job = Box::new(move || {
            let _ = run_and_record(id, thunk, &stats);
        });
        self.enqueue(id, job)
    }

    fn enqueue(&self, id: TaskId, job: Job) -> Result<(), PoolError> {
        // Held (shared) across the push so shutdown cannot slip its stop
        // signals in between the check and the push.
        let lifecycle = self.lifecycle.read().unwrap_or_else(PoisonError::into_inner);
        if !lifecycle.accepts_tasks() {
            drop(lifecycle);
            // The job owns the caller's closure; drop it outside the lock.
            drop(job);
            debug!(task_id = %id, "rejected task: pool is shutting down");
            return Err(PoolError::ShuttingDown);
        }

        self.stats.submitted.fetch_add(1, Ordering::Relaxed);
        self.stats.queued.fetch_add(1, Ordering::Relaxed);
        self.queue.push(Message::Run { id, job });
        debug!(task_id = %id, "task queued");
        Ok(())
    }

    /// Stop accepting tasks, let every worker drain the queue up to its stop
    /// signal, and join all workers.
    ///
    /// Idempotent. Concurrent callers all block until the workers are
    /// joined and the pool is `Stopped`. Called from a worker thread (a task
    /// shutting down its own pool), that worker is not joined and the call
    /// returns once the other workers are; the skipped worker is joined by
    /// the next `shutdown()` from outside the pool (or `Drop`).
    pub fn shutdown(&self) {
        {
            let mut lifecycle = self.lifecycle.write().unwrap_or_else(PoisonError::into_inner);
            if *lifecycle == Lifecycle::Open {
                *lifecycle = Lifecycle::ShuttingDown;
                info!(workers = self.worker_count, "shutting down worker pool");
                self.queue
                    .push_batch(iter::repeat_with(|| Message::Stop).take(self.worker_count));
            }
        }

        let current = thread::current().id();
        let mut roster = self.lock_roster();
        if roster.joining {
            if roster.workers.iter().any(|w| w.thread_id() == current) {
                // The joining caller is (or will be) waiting on this very
                // thread; waiting here would deadlock.
                debug!("shutdown already joining; returning to let this worker exit");
                return;
            }
            roster = self
                .joins_done
                .wait_while(roster, |r| r.joining)
                .unwrap_or_else(PoisonError::into_inner);
        }

        let joiners: Vec<Joiner> = roster
            .workers
            .iter_mut()
            .filter_map(Worker::take_joiner)
            .collect();
        if joiners.is_empty() {
            return;
        }
        roster.joining = true;
        drop(roster);

        let mut own = None;
        for joiner in joiners {
            if joiner.thread_id() == current {
                warn!("shutdown called from a worker thread; not joining it");
                own = Some(joiner);
                continue;
            }
            joiner.join();
        }

        let mut roster = self.lock_roster();
        roster.joining = false;
        match own {
            Some(joiner) => {
                let id = joiner.id();
                if let Some(worker) = roster.workers.get_mut(id) {
                    worker.restore_joiner(joiner);
                }
            }
            None => {
                *self.lifecycle.write().unwrap_or_else(PoisonError::into_inner) = Lifecycle::Stopped;
                info!("worker pool stopped");
            }
        }
        drop(roster);
        self.joins_done.notify_all();
    }

    pub fn lifecycle(&self) -> Lifecycle {
        *self.lifecycle.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Per-worker state, as reported by each worker thread itself.
    pub fn worker_states(&self) -> Vec<WorkerState> {
        self.lock_roster().workers.iter().map(Worker::state).collect()
    }

    pub fn status(&self) -> PoolStatus {
        self.stats.snapshot(self.lifecycle(), self.worker_count)
    }

    fn lock_roster(&self) -> MutexGuard<'_, Roster> {
        self.roster.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("workers", &self.worker_count)
            .field("lifecycle", &self.lifecycle())
            .field("queued", &self.queue.len())
            .finish()
    }
}

/// Runs on the worker: execute, count, log.
fn run_and_record<R>(id: TaskId, thunk: Thunk<R>, stats: &PoolStats) -> Result<R, TaskError> {
    let outcome = task::run_contained(thunk);
    stats.record(&outcome);
    match &outcome {
        Ok(_) => debug!(task_id = %id, "task succeeded"),
        Err(err) => {
            // user Display impls run here, outside the task body
            let error = task::describe_contained(err);
            warn!(task_id = %id, %error, "task did not complete");
        }
    }
    outcome
}
