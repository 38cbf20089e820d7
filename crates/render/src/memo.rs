//! Memoizing wrapper around a resize backend

use crate::backend::ResizeBackend;
use crate::error::RenderResult;
use crate::fit::FitMode;
use crate::PageImage;
use comicflip_cache::{CacheStats, LruCache};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::{Mutex, PoisonError};

/// Default number of memoized renders
pub const DEFAULT_MEMO_CAPACITY: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct MemoKey {
    digest: u64,
    len: usize,
    width: u32,
    height: u32,
    fit: FitMode,
}

impl MemoKey {
    fn new(raw: &[u8], width: u32, height: u32, fit: FitMode) -> Self {
        let mut hasher = DefaultHasher::new();
        raw.hash(&mut hasher);
        Self { digest: hasher.finish(), len: raw.len(), width, height, fit }
    }
}

/// Caches backend results keyed on (bytes, width, height, fit).
///
/// A capacity of zero turns the wrapper into a pass-through. Errors are
/// never cached. Two workers missing on the same key may both render it.
pub struct MemoizedBackend<B> {
    inner: B,
    memo: Option<Mutex<LruCache<MemoKey, PageImage>>>,
}

impl<B: ResizeBackend> MemoizedBackend<B> {
    pub fn new(inner: B, capacity: usize) -> Self {
        let memo = (capacity > 0).then(|| Mutex::new(LruCache::new(capacity)));
        Self { inner, memo }
    }

    pub fn inner(&self) -> &B {
        &self.inner
    }

    /// Hit/miss counters of the memo layer, `None` when disabled
    pub fn stats(&self) -> Option<CacheStats> {
        self.memo
            .as_ref()
            .map(|memo| memo.lock().unwrap_or_else(PoisonError::into_inner).stats())
    }
}

impl<B: ResizeBackend> ResizeBackend for MemoizedBackend<B> {
    fn render(&self, raw: &[u8], width: u32, height: u32, fit: FitMode) -> RenderResult<PageImage> {
        let Some(memo) = &self.memo else {
            return self.inner.render(raw, width, height, fit);
        };

        let key = MemoKey::new(raw, width, height, fit);
        if let Some(image) = memo.lock().unwrap_or_else(PoisonError::into_inner).get(&key) {
            return Ok(image.clone());
        }

        // Render outside the lock so workers do not serialize on it
        let image = self.inner.render(raw, width, height, fit)?;
        memo.lock().unwrap_or_else(PoisonError::into_inner).insert(key, image.clone());
        Ok(image)
    }
}
