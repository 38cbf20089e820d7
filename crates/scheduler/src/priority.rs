//! Work items and their priorities

use std::cmp::Ordering;

/// Priority tiers. Lower values are served first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Priority {
    /// The page the user asked to see
    Foreground = 0,

    /// Preload of the next page
    Speculative = 1,
}

impl Priority {
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

/// One page to decode and scale for a given viewport.
///
/// `generation` pins the item to the navigation state that created it so
/// the UI thread can discard the result if the user has moved on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WorkItem {
    pub priority: Priority,
    pub page_index: usize,
    pub width: u32,
    pub height: u32,
    pub is_speculative: bool,
    pub generation: u64,
}

impl WorkItem {
    /// A directly requested page
    pub fn foreground(page_index: usize, width: u32, height: u32, generation: u64) -> Self {
        Self {
            priority: Priority::Foreground,
            page_index,
            width,
            height,
            is_speculative: false,
            generation,
        }
    }

    /// A preload of a page the user is likely to ask for next
    pub fn speculative(page_index: usize, width: u32, height: u32, generation: u64) -> Self {
        Self {
            priority: Priority::Speculative,
            page_index,
            width,
            height,
            is_speculative: true,
            generation,
        }
    }
}

/// Heap entry: priority first, then FIFO within a tier.
#[derive(Debug)]
pub(crate) struct Queued {
    pub(crate) item: WorkItem,
    pub(crate) insertion_order: u64,
}

impl PartialEq for Queued {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Queued {}

impl PartialOrd for Queued {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Queued {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max heap, so both comparisons are reversed
        other
            .item
            .priority
            .cmp(&self.item.priority)
            .then_with(|| other.insertion_order.cmp(&self.insertion_order))
    }
}
