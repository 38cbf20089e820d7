//! Comicflip Core Library
//!
//! Page sources for comic archives and image folders.
//!
//! A [`PageSource`] turns a container (zip, tar, RAR-like archive, directory
//! or single image) into an ordered list of page names plus a byte fetch.
//! Pages are ordered with [`natural_key`] so that `page2` sorts before
//! `page10`, with info/text pages placed ahead of the images.
//!
//! # Example
//!
//! ```no_run
//! use comicflip_core::open_comic;
//!
//! let source = open_comic("issue-01.cbz")?;
//! for name in source.pages() {
//!     let bytes = source.get_bytes(name)?;
//!     println!("{name}: {} bytes", bytes.len());
//! }
//! source.cleanup();
//! # Ok::<(), comicflip_core::SourceError>(())
//! ```

mod loader;
pub mod natural;
pub mod page;
pub mod perf;
mod source;
pub mod sources;

pub use loader::{open_comic, open_comic_with, ContainerKind};
pub use natural::{natural_cmp, natural_key, NaturalKey};
pub use page::{is_image_name, is_text_name, order_pages, PageKind, IMAGE_EXTENSIONS, TEXT_EXTENSIONS};
pub use perf::PerfTimer;
pub use source::{PageSource, SourceError, SourceKind, SourceResult};
