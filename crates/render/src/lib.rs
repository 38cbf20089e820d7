//! Comicflip Render Library
//!
//! Decodes page bytes and scales them to fit a target box.
//!
//! The [`ResizeBackend`] trait is the only thing the worker pool knows about.
//! [`ImageBackend`] implements it with a SIMD fast path and a plain fallback,
//! and [`MemoizedBackend`] optionally wraps any backend with a small LRU keyed
//! on the exact inputs.

mod backend;
mod error;
mod fit;
mod memo;

pub use backend::{preview_nearest, ImageBackend, ResizeBackend};
pub use error::{RenderError, RenderResult};
pub use fit::{fit_dimensions, FitMode, Quality};
pub use memo::{MemoizedBackend, DEFAULT_MEMO_CAPACITY};

/// A decoded page, scaled and ready to display. Cheap to clone.
pub type PageImage = std::sync::Arc<image::RgbaImage>;
