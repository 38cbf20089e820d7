//! Comicflip Scheduler Library
//!
//! Background decode scheduling for the page pipeline.
//!
//! A bounded [`WorkQueue`] orders [`WorkItem`]s by priority (foreground pages
//! before speculative preloads, FIFO within a tier) and drops new items when
//! full. A [`WorkerPool`] drains it on a fixed set of threads. The UI side
//! uses [`RenderGeneration`] to recognise stale results and a [`Debouncer`]
//! to collapse bursts of navigation input.
//!
//! # Example
//!
//! ```
//! use comicflip_scheduler::{WorkExecutor, WorkItem, WorkQueue, WorkerPool, WorkerPoolConfig};
//! use std::sync::Arc;
//!
//! let queue = Arc::new(WorkQueue::new(4));
//! let executor: WorkExecutor = Arc::new(|item: &WorkItem| {
//!     println!("rendering page {} at {}x{}", item.page_index, item.width, item.height);
//!     Ok(())
//! });
//!
//! let mut pool = WorkerPool::new(queue.clone(), executor, WorkerPoolConfig::new(2))?;
//! queue.try_push(WorkItem::foreground(0, 1280, 800, 0));
//! queue.try_push(WorkItem::speculative(1, 1280, 800, 0));
//!
//! pool.stop();
//! # Ok::<(), std::io::Error>(())
//! ```

mod debounce;
mod generation;
mod priority;
mod queue;
mod worker;

pub use debounce::{DebounceState, Debouncer, DEFAULT_DEBOUNCE};
pub use generation::RenderGeneration;
pub use priority::{Priority, WorkItem};
pub use queue::{QueueStats, WorkQueue, DEFAULT_QUEUE_CAPACITY};
pub use worker::{PoolStats, WorkError, WorkExecutor, WorkerPool, WorkerPoolConfig, DEFAULT_WORKER_COUNT};
