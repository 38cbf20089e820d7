//! Comicflip Viewer Library
//!
//! The UI-thread half of the page pipeline.
//!
//! A [`Viewer`] holds the open document, the current page index, the render
//! generation and the render cache. Navigation bumps the generation, looks
//! the page up in the cache and on a miss enqueues a work item for the
//! document's worker pool. Workers hand results back through a
//! [`UiDispatcher`]; the viewer re-checks generation and index before
//! caching or showing anything.
//!
//! # Example
//!
//! ```no_run
//! use comicflip_viewer::{PipelineConfig, RecordingSurface, SharedViewport, UiLoop, Viewer};
//! use std::time::Duration;
//!
//! let ui = UiLoop::new();
//! let viewport = SharedViewport::new(1280, 800);
//! let surface = RecordingSurface::new();
//! let mut viewer = Viewer::new(PipelineConfig::default(), ui.dispatcher(), viewport, surface.clone());
//!
//! viewer.open("issue-01.cbz")?;
//! ui.run_until_idle(&mut viewer, Duration::from_secs(5));
//! viewer.next();
//! ui.run_until_idle(&mut viewer, Duration::from_secs(5));
//! println!("{}", viewer.title());
//! # Ok::<(), comicflip_viewer::ViewerError>(())
//! ```

pub mod config;
mod dispatch;
mod error;
mod nav;
mod pipeline;
mod surface;
mod viewer;
mod viewport;

pub use config::{ConfigError, PipelineConfig, PreviewPolicy};
pub use dispatch::{UiDispatcher, UiLoop, UiTask};
pub use error::{ViewerError, ViewerResult};
pub use nav::{resolve_nav_target, NavTarget};
pub use pipeline::{RenderOutcome, RenderPipeline};
pub use surface::{DisplaySurface, Frame, RecordingSurface, SurfaceEvent};
pub use viewer::{default_backend, next_image_index, Viewer};
pub use viewport::{clamp_viewport, SharedViewport, ViewportProvider};
