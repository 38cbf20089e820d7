//! Comicflip Cache Library
//!
//! Entry-count bounded LRU caches used by the render pipeline.
//!
//! [`LruCache`] is the generic building block. [`RenderCache`] keys rendered
//! pages by page index and target viewport size so that a page rendered for
//! one window size is never shown at another.

pub mod lru;
pub mod render_cache;

pub use lru::{CacheStats, LruCache};
pub use render_cache::{RenderCache, RenderKey, DEFAULT_RENDER_CACHE_CAPACITY};
