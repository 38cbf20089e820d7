//! Render worker pool consuming the work queue.
//!
//! Workers run on their own threads, pop items from a shared [`WorkQueue`]
//! and hand each one to an executor callback. A failing or panicking item is
//! logged and the worker moves on to the next one.

use crate::queue::WorkQueue;
use crate::WorkItem;
use std::any::Any;
use std::error::Error;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Default number of worker threads
pub const DEFAULT_WORKER_COUNT: usize = 4;

/// Error type returned by an executor for a single item
pub type WorkError = Box<dyn Error + Send + Sync>;

/// Callback run by a worker for every item it pops.
///
/// Returning an error only logs it; the worker keeps going.
pub type WorkExecutor = Arc<dyn Fn(&WorkItem) -> Result<(), WorkError> + Send + Sync>;

/// Configuration for the worker pool.
#[derive(Debug, Clone)]
pub struct WorkerPoolConfig {
    /// Number of worker threads to spawn, at least one.
    pub num_workers: usize,

    /// Prefix for thread names; the worker id is appended.
    pub thread_name: String,
}

impl Default for WorkerPoolConfig {
    fn default() -> Self {
        Self::new(DEFAULT_WORKER_COUNT)
    }
}

impl WorkerPoolConfig {
    pub fn new(num_workers: usize) -> Self {
        Self { num_workers: num_workers.max(1), thread_name: "comicflip-worker".to_string() }
    }

    /// Set the thread name prefix.
    pub fn with_thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = name.into();
        self
    }
}

/// Counters shared by all workers of a pool
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Items the executor finished without error
    pub completed: u64,

    /// Items whose executor returned an error
    pub failed: u64,

    /// Items whose executor panicked
    pub panicked: u64,
}

#[derive(Default)]
struct SharedStats {
    completed: AtomicU64,
    failed: AtomicU64,
    panicked: AtomicU64,
}

/// Fixed set of worker threads draining one [`WorkQueue`].
///
/// Threads start in [`WorkerPool::new`]. [`WorkerPool::stop`] raises the stop
/// flag, closes the queue and joins every thread; it also runs on drop.
pub struct WorkerPool {
    queue: Arc<WorkQueue>,
    handles: Vec<JoinHandle<()>>,
    shutdown: Arc<AtomicBool>,
    stats: Arc<SharedStats>,
    num_workers: usize,
}

impl WorkerPool {
    /// Spawn the workers.
    ///
    /// If a thread fails to spawn, the ones already started are stopped
    /// again before the error is returned.
    pub fn new(
        queue: Arc<WorkQueue>,
        executor: WorkExecutor,
        config: WorkerPoolConfig,
    ) -> io::Result<Self> {
        let num_workers = config.num_workers.max(1);
        let mut pool = Self {
            queue,
            handles: Vec::with_capacity(num_workers),
            shutdown: Arc::new(AtomicBool::new(false)),
            stats: Arc::new(SharedStats::default()),
            num_workers,
        };

        for id in 0..num_workers {
            let queue = pool.queue.clone();
            let executor = executor.clone();
            let shutdown = pool.shutdown.clone();
            let stats = pool.stats.clone();

            let spawned = thread::Builder::new()
                .name(format!("{}-{}", config.thread_name, id))
                .spawn(move || run(id, queue, executor, shutdown, stats));

            match spawned {
                Ok(handle) => pool.handles.push(handle),
                Err(e) => {
                    log::error!("Failed to spawn worker {id}: {e}");
                    pool.stop();
                    return Err(e);
                }
            }
        }

        log::debug!("Started {num_workers} render workers");
        Ok(pool)
    }

    pub fn num_workers(&self) -> usize {
        self.num_workers
    }

    pub fn queue(&self) -> &Arc<WorkQueue> {
        &self.queue
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutdown.load(Ordering::Acquire)
    }

    /// Number of threads not yet joined
    pub fn live_workers(&self) -> usize {
        self.handles.iter().filter(|h| !h.is_finished()).count()
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            completed: self.stats.completed.load(Ordering::Relaxed),
            failed: self.stats.failed.load(Ordering::Relaxed),
            panicked: self.stats.panicked.load(Ordering::Relaxed),
        }
    }

    /// Signal, drain and join every worker.
    ///
    /// A worker busy with an item finishes it first. A thread that cannot be
    /// joined is logged and the remaining ones are still joined. Calling this
    /// more than once is a no-op.
    pub fn stop(&mut self) {
        self.shutdown.store(true, Ordering::Release);
        let drained = self.queue.close();
        if drained > 0 {
            log::debug!("Discarded {drained} queued items on stop");
        }

        let current = thread::current().id();
        for handle in self.handles.drain(..) {
            let name = handle.thread().name().unwrap_or("worker").to_string();
            if handle.thread().id() == current {
                log::warn!("{name} asked to stop its own pool; not joining itself");
                continue;
            }
            if let Err(payload) = handle.join() {
                log::error!("{name} terminated abnormally: {}", panic_message(payload.as_ref()));
            }
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run(
    id: usize,
    queue: Arc<WorkQueue>,
    executor: WorkExecutor,
    shutdown: Arc<AtomicBool>,
    stats: Arc<SharedStats>,
) {
    while let Some(item) = queue.pop() {
        if shutdown.load(Ordering::Acquire) {
            break;
        }

        log::debug!(
            "Worker {id} processing page {} at {}x{}{}",
            item.page_index,
            item.width,
            item.height,
            if item.is_speculative { " (preload)" } else { "" }
        );

        match panic::catch_unwind(AssertUnwindSafe(|| executor(&item))) {
            Ok(Ok(())) => {
                stats.completed.fetch_add(1, Ordering::Relaxed);
                log::debug!("Worker {id} finished page {}", item.page_index);
            }
            Ok(Err(e)) => {
                stats.failed.fetch_add(1, Ordering::Relaxed);
                log::warn!("Worker {id} failed on page {}: {e}", item.page_index);
            }
            Err(payload) => {
                stats.panicked.fetch_add(1, Ordering::Relaxed);
                log::error!(
                    "Worker {id} panicked on page {}: {}",
                    item.page_index,
                    panic_message(payload.as_ref())
                );
            }
        }
    }

    log::debug!("Worker {id} exiting");
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
