//! spindle-core
//!
//! Fixed-size thread pool built on a blocking FIFO queue.
//!
//! # モジュール構成
//! - **queue**: `SynchronizedQueue<T>`（Mutex + Condvar、blocking / non-blocking pop）
//! - **pool**: `WorkerPool`（固定数のワーカー、poison pill による停止）
//! - **handle**: `ResultHandle<R>` / `SharedResultHandle<R>`（タスク結果の受け取り口）
//! - **task**: `Task<R>`（空にもできる一回限りの callable）
//! - **cancel**: `StopSource` / `StopToken`（協調的キャンセル）
//! - **status**: `PoolStatus`（カウンタのスナップショット）
//! - **error**: `PoolError` / `TaskError`

pub mod cancel;
pub mod error;
pub mod handle;
pub mod ids;
pub mod pool;
pub mod queue;
pub mod status;
pub mod task;

pub use self::cancel::{StopSource, StopToken};
pub use self::error::{BoxError, PoolError, TaskError};
pub use self::handle::{ResultHandle, SharedResultHandle, WaitStatus};
pub use self::ids::TaskId;
pub use self::pool::{Lifecycle, PoolConfig, WorkerPool, WorkerState};
pub use self::queue::SynchronizedQueue;
pub use self::status::PoolStatus;
pub use self::task::Task;
