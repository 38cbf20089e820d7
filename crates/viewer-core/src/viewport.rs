//! Viewport size provider

use std::sync::{Arc, Mutex, PoisonError};

/// Reports the current drawable size, polled on the UI thread.
///
/// May report zero before the window is laid out; callers clamp with
/// [`clamp_viewport`].
pub trait ViewportProvider {
    fn viewport_size(&self) -> (u32, u32);
}

impl<F> ViewportProvider for F
where
    F: Fn() -> (u32, u32),
{
    fn viewport_size(&self) -> (u32, u32) {
        self()
    }
}

/// Clamp a reported size to at least 1x1
pub fn clamp_viewport((width, height): (u32, u32)) -> (u32, u32) {
    (width.max(1), height.max(1))
}

/// A viewport size that can be updated from elsewhere, e.g. a resize handler.
#[derive(Debug, Clone, Default)]
pub struct SharedViewport {
    size: Arc<Mutex<(u32, u32)>>,
}

impl SharedViewport {
    pub fn new(width: u32, height: u32) -> Self {
        Self { size: Arc::new(Mutex::new((width, height))) }
    }

    pub fn set(&self, width: u32, height: u32) {
        *self.size.lock().unwrap_or_else(PoisonError::into_inner) = (width, height);
    }

    pub fn get(&self) -> (u32, u32) {
        *self.size.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ViewportProvider for SharedViewport {
    fn viewport_size(&self) -> (u32, u32) {
        self.get()
    }
}
