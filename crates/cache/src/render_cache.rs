//! Rendered pages keyed by page and target size

use crate::lru::{CacheStats, LruCache};

/// Number of rendered pages kept by default
pub const DEFAULT_RENDER_CACHE_CAPACITY: usize = 20;

/// Identifies one rendering of a page.
///
/// Different viewport sizes are different entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RenderKey {
    pub page_index: usize,
    pub width: u32,
    pub height: u32,
}

impl RenderKey {
    pub fn new(page_index: usize, width: u32, height: u32) -> Self {
        Self { page_index, width, height }
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

/// LRU cache of rendered pages.
///
/// Values are cheap handles (typically `Arc`s) and are cloned out on lookup.
/// Only the UI thread touches this cache.
#[derive(Debug)]
pub struct RenderCache<V: Clone> {
    entries: LruCache<RenderKey, V>,
}

impl<V: Clone> Default for RenderCache<V> {
    fn default() -> Self {
        Self::new(DEFAULT_RENDER_CACHE_CAPACITY)
    }
}

impl<V: Clone> RenderCache<V> {
    pub fn new(capacity: usize) -> Self {
        Self { entries: LruCache::new(capacity) }
    }

    /// Look up a rendering, refreshing its recency
    pub fn get(&mut self, key: &RenderKey) -> Option<V> {
        let value = self.entries.get(key).cloned();
        if value.is_some() {
            log::debug!("Render cache hit for page {} at {}x{}", key.page_index, key.width, key.height);
        } else {
            log::debug!("Render cache miss for page {} at {}x{}", key.page_index, key.width, key.height);
        }
        value
    }

    pub fn contains(&self, key: &RenderKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn insert(&mut self, key: RenderKey, value: V) {
        if let Some((evicted, _)) = self.entries.insert(key, value) {
            log::debug!(
                "Evicted page {} at {}x{} from render cache",
                evicted.page_index,
                evicted.width,
                evicted.height
            );
        }
    }

    /// Most recent rendering of `page_index` at any size other than `exclude`.
    ///
    /// Used as the source for a low-quality preview; does not touch recency.
    pub fn find_for_page(&self, page_index: usize, exclude: &RenderKey) -> Option<(RenderKey, V)> {
        self.entries
            .iter()
            .filter(|(key, _)| key.page_index == page_index && *key != exclude)
            .last()
            .map(|(key, value)| (*key, value.clone()))
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.entries.capacity()
    }

    pub fn stats(&self) -> CacheStats {
        self.entries.stats()
    }
}
