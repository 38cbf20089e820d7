//! What the viewer draws on

use comicflip_render::{PageImage, Quality};
use std::sync::{Arc, Mutex, PoisonError};

/// A page image ready to paint
#[derive(Debug, Clone)]
pub struct Frame {
    pub page_index: usize,
    pub image: PageImage,
    pub quality: Quality,
    /// Viewport the image was fitted into
    pub viewport: (u32, u32),
}

/// Window-side collaborator. All calls happen on the UI thread.
pub trait DisplaySurface {
    fn show_page(&mut self, frame: &Frame);

    /// Overlay an info page's text
    fn show_info(&mut self, name: &str, text: &str);

    fn hide_info(&mut self);

    /// Remove everything, e.g. after the document is closed
    fn clear(&mut self);

    fn set_title(&mut self, title: &str);
}

/// One call made on a [`RecordingSurface`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurfaceEvent {
    Page { page_index: usize, width: u32, height: u32, quality: Quality },
    Info { name: String, text: String },
    HideInfo,
    Clear,
    Title(String),
}

/// Surface that records every call, for headless use.
#[derive(Debug, Clone, Default)]
pub struct RecordingSurface {
    events: Arc<Mutex<Vec<SurfaceEvent>>>,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the events recorded so far
    pub fn drain(&self) -> Vec<SurfaceEvent> {
        std::mem::take(&mut *self.events.lock().unwrap_or_else(PoisonError::into_inner))
    }

    pub fn events(&self) -> Vec<SurfaceEvent> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Pages shown so far, in order
    pub fn pages(&self) -> Vec<(usize, Quality)> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                SurfaceEvent::Page { page_index, quality, .. } => Some((page_index, quality)),
                _ => None,
            })
            .collect()
    }

    fn push(&self, event: SurfaceEvent) {
        self.events.lock().unwrap_or_else(PoisonError::into_inner).push(event);
    }
}

impl DisplaySurface for RecordingSurface {
    fn show_page(&mut self, frame: &Frame) {
        self.push(SurfaceEvent::Page {
            page_index: frame.page_index,
            width: frame.image.width(),
            height: frame.image.height(),
            quality: frame.quality,
        });
    }

    fn show_info(&mut self, name: &str, text: &str) {
        self.push(SurfaceEvent::Info { name: name.to_string(), text: text.to_string() });
    }

    fn hide_info(&mut self) {
        self.push(SurfaceEvent::HideInfo);
    }

    fn clear(&mut self) {
        self.push(SurfaceEvent::Clear);
    }

    fn set_title(&mut self, title: &str) {
        self.push(SurfaceEvent::Title(title.to_string()));
    }
}
