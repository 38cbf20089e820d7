//! Bounded priority work queue with drop-on-full backpressure

use crate::priority::{Queued, WorkItem};
use std::collections::BinaryHeap;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

/// Default number of items the queue holds
pub const DEFAULT_QUEUE_CAPACITY: usize = 4;

/// Counters for queue traffic
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueStats {
    /// Items accepted by `try_push`
    pub pushed: u64,

    /// Items rejected because the queue was full or closed
    pub dropped: u64,

    /// Items handed to a consumer
    pub popped: u64,

    /// Items discarded by `close`
    pub drained: u64,
}

struct QueueState {
    heap: BinaryHeap<Queued>,
    insertion_counter: u64,
    closed: bool,
    stats: QueueStats,
}

/// Multi-producer multi-consumer priority queue with a hard bound.
///
/// `try_push` never blocks: when the queue is full the item is dropped.
/// `pop` blocks until an item is available or the queue is closed.
/// Foreground items come out before speculative ones, FIFO within a tier.
///
/// ```
/// use comicflip_scheduler::{WorkItem, WorkQueue};
///
/// let queue = WorkQueue::new(1);
/// assert!(queue.try_push(WorkItem::foreground(0, 800, 600, 0)));
/// assert!(!queue.try_push(WorkItem::foreground(1, 800, 600, 0)));
/// assert_eq!(queue.pop().map(|item| item.page_index), Some(0));
/// ```
pub struct WorkQueue {
    capacity: usize,
    state: Mutex<QueueState>,
    available: Condvar,
}

impl Default for WorkQueue {
    fn default() -> Self {
        Self::new(DEFAULT_QUEUE_CAPACITY)
    }
}

impl WorkQueue {
    /// A capacity of zero is treated as one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            state: Mutex::new(QueueState {
                heap: BinaryHeap::with_capacity(capacity),
                insertion_counter: 0,
                closed: false,
                stats: QueueStats::default(),
            }),
            available: Condvar::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Enqueue without blocking. Returns `false` if the item was dropped.
    pub fn try_push(&self, item: WorkItem) -> bool {
        let mut state = self.lock();
        if state.closed || state.heap.len() >= self.capacity {
            state.stats.dropped += 1;
            log::debug!(
                "Dropped work item for page {} (queue {})",
                item.page_index,
                if state.closed { "closed" } else { "full" }
            );
            return false;
        }

        let insertion_order = state.insertion_counter;
        state.insertion_counter += 1;
        state.heap.push(Queued { item, insertion_order });
        state.stats.pushed += 1;
        drop(state);

        self.available.notify_one();
        true
    }

    /// Block until an item is available. `None` once the queue is closed.
    pub fn pop(&self) -> Option<WorkItem> {
        let mut state = self.lock();
        loop {
            if state.closed {
                return None;
            }
            if let Some(queued) = state.heap.pop() {
                state.stats.popped += 1;
                return Some(queued.item);
            }
            state = self.available.wait(state).unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Pop without blocking
    pub fn try_pop(&self) -> Option<WorkItem> {
        let mut state = self.lock();
        if state.closed {
            return None;
        }
        let queued = state.heap.pop()?;
        state.stats.popped += 1;
        Some(queued.item)
    }

    /// Close the queue, discard pending items and wake every waiter.
    ///
    /// Returns the number of discarded items. Closing twice is harmless.
    pub fn close(&self) -> usize {
        let mut state = self.lock();
        state.closed = true;
        let drained = state.heap.len();
        state.heap.clear();
        state.stats.drained += drained as u64;
        drop(state);

        self.available.notify_all();
        drained
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    pub fn len(&self) -> usize {
        self.lock().heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().heap.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn stats(&self) -> QueueStats {
        self.lock().stats
    }
}
