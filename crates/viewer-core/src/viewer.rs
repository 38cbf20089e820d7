//! UI-thread viewer state.
//!
//! [`Viewer`] owns the current index, the render generation, the render
//! cache and the open document. It is only ever touched from the UI thread;
//! workers reach it through [`UiDispatcher`] tasks.

use crate::config::{PipelineConfig, PreviewPolicy};
use crate::dispatch::UiDispatcher;
use crate::error::{ViewerError, ViewerResult};
use crate::nav::{resolve_nav_target, NavTarget};
use crate::pipeline::{RenderOutcome, RenderPipeline};
use crate::surface::{DisplaySurface, Frame};
use crate::viewport::{clamp_viewport, ViewportProvider};
use comicflip_cache::{CacheStats, RenderCache, RenderKey};
use comicflip_core::sources::Unpacker;
use comicflip_core::{is_image_name, open_comic_with, PageKind, PageSource, PerfTimer};
use comicflip_render::{
    preview_nearest, ImageBackend, MemoizedBackend, PageImage, Quality, ResizeBackend,
};
use comicflip_scheduler::{Debouncer, RenderGeneration, WorkItem};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

const APP_NAME: &str = "comicflip";

struct OpenDocument {
    id: u64,
    path: PathBuf,
    display_name: String,
    source: Arc<dyn PageSource>,
    pipeline: RenderPipeline,
}

/// The backend used when none is supplied: Lanczos3 scaling behind a memo.
pub fn default_backend(config: &PipelineConfig) -> Arc<dyn ResizeBackend> {
    Arc::new(MemoizedBackend::new(ImageBackend::new(), config.memo_capacity))
}

/// Index of the first image page after `index`
pub fn next_image_index(pages: &[String], index: usize) -> Option<usize> {
    pages
        .iter()
        .enumerate()
        .skip(index.saturating_add(1))
        .find(|(_, name)| is_image_name(name))
        .map(|(i, _)| i)
}

/// Single-threaded page viewer driving the render pipeline.
pub struct Viewer {
    config: PipelineConfig,
    backend: Arc<dyn ResizeBackend>,
    dispatcher: Arc<dyn UiDispatcher>,
    viewport: Box<dyn ViewportProvider>,
    surface: Box<dyn DisplaySurface>,
    unpacker: Unpacker,
    document: Option<OpenDocument>,
    next_document_id: u64,
    cache: RenderCache<PageImage>,
    generation: RenderGeneration,
    debouncer: Debouncer<NavTarget>,
    current_index: usize,
    /// Image page currently shown; differs from `current_index` on info pages
    displayed_index: Option<usize>,
    first_render_done: bool,
    skip_preview_once: bool,
    stable_viewport: Option<(u32, u32)>,
    /// Items enqueued whose outcome has not come back yet
    outstanding: usize,
}

impl Viewer {
    pub fn new(
        config: PipelineConfig,
        dispatcher: Arc<dyn UiDispatcher>,
        viewport: impl ViewportProvider + 'static,
        surface: impl DisplaySurface + 'static,
    ) -> Self {
        let mut viewer = Self {
            backend: default_backend(&config),
            cache: RenderCache::new(config.cache_capacity),
            debouncer: Debouncer::new(config.debounce()),
            config,
            dispatcher,
            viewport: Box::new(viewport),
            surface: Box::new(surface),
            unpacker: Unpacker::default(),
            document: None,
            next_document_id: 1,
            generation: RenderGeneration::new(),
            current_index: 0,
            displayed_index: None,
            first_render_done: false,
            skip_preview_once: false,
            stable_viewport: None,
            outstanding: 0,
        };
        viewer.update_title();
        viewer
    }

    pub fn with_backend(mut self, backend: Arc<dyn ResizeBackend>) -> Self {
        self.backend = backend;
        self
    }

    /// Unpacker used for RAR-like archives
    pub fn with_unpacker(mut self, unpacker: Unpacker) -> Self {
        self.unpacker = unpacker;
        self
    }

    /// Open a comic, replacing the current one on success.
    ///
    /// On failure the previously open document, if any, stays open.
    pub fn open<P: AsRef<Path>>(&mut self, path: P) -> ViewerResult<()> {
        let path = path.as_ref();
        let _timer = PerfTimer::new("open_document").with_extra(path.display().to_string());

        let source = open_comic_with(path, &self.unpacker).map_err(|e| {
            log::warn!("Failed to open {}: {e}", path.display());
            ViewerError::Open(e)
        })?;
        self.open_source(path, Arc::from(source))
    }

    /// Install an already constructed source as the open document.
    pub fn open_source<P: AsRef<Path>>(
        &mut self,
        path: P,
        source: Arc<dyn PageSource>,
    ) -> ViewerResult<()> {
        let path = path.as_ref();
        let id = self.next_document_id;
        self.next_document_id += 1;

        let pipeline = match RenderPipeline::start(
            id,
            &source,
            self.backend.clone(),
            self.dispatcher.clone(),
            &self.config,
        ) {
            Ok(pipeline) => pipeline,
            Err(e) => {
                source.cleanup();
                return Err(ViewerError::Workers(e));
            }
        };

        self.close_document();

        let display_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        log::info!("Opened {} with {} pages", path.display(), source.len());

        self.document =
            Some(OpenDocument { id, path: path.to_path_buf(), display_name, source, pipeline });
        self.current_index = 0;
        self.first_render_done = false;
        self.skip_preview_once = false;
        self.render_current();
        Ok(())
    }

    /// Close the open document, stopping its workers before cleanup.
    pub fn close(&mut self) {
        self.close_document();
        self.surface.clear();
        self.update_title();
    }

    fn close_document(&mut self) {
        if let Some(mut document) = self.document.take() {
            document.pipeline.stop();
            document.source.cleanup();
            log::info!("Closed {}", document.path.display());
        }
        self.cache.clear();
        self.debouncer.cancel();
        self.outstanding = 0;
        self.current_index = 0;
        self.displayed_index = None;
    }

    pub fn next(&mut self) {
        self.navigate(NavTarget::Next);
    }

    pub fn prev(&mut self) {
        self.navigate(NavTarget::Prev);
    }

    pub fn first(&mut self) {
        self.navigate(NavTarget::First);
    }

    pub fn last(&mut self) {
        self.navigate(NavTarget::Last);
    }

    /// Execute a navigation now: bump the generation, move, render.
    pub fn navigate(&mut self, target: NavTarget) {
        let Some(page_count) = self.document.as_ref().map(|doc| doc.source.len()) else {
            return;
        };

        let index = resolve_nav_target(self.current_index, page_count, target);
        let generation = self.generation.bump();
        log::debug!(
            "Navigate {:?}: page {} -> {} (generation {})",
            target,
            self.current_index,
            index,
            generation
        );
        self.current_index = index;
        self.render_current();
    }

    /// Debounced navigation; only the last request of a burst runs.
    pub fn request_nav(&mut self, target: NavTarget) {
        self.request_nav_at(target, Instant::now());
    }

    pub fn request_nav_at(&mut self, target: NavTarget, now: Instant) {
        if self.document.is_some() {
            self.debouncer.trigger(target, now);
        }
    }

    /// Fire the pending debounced navigation if its quiet period is over.
    pub fn tick(&mut self, now: Instant) {
        if let Some(target) = self.debouncer.poll(now) {
            self.navigate(target);
        }
    }

    /// When [`Viewer::tick`] next has something to do
    pub fn next_deadline(&self) -> Option<Instant> {
        self.debouncer.deadline()
    }

    /// Re-render after the window size changed.
    ///
    /// Sizes below the stable minimum are ignored. The render that follows
    /// never shows a preview.
    pub fn on_viewport_resized(&mut self) {
        let size = self.viewport_size();
        if !self.is_stable(size) {
            log::debug!("Ignoring unstable viewport {}x{}", size.0, size.1);
            return;
        }
        if self.stable_viewport == Some(size) {
            return;
        }

        self.stable_viewport = Some(size);
        self.skip_preview_once = true;
        if self.document.is_some() {
            self.render_current();
        }
    }

    /// Show the current page from cache, or request it from the workers.
    pub fn render_current(&mut self) {
        let Some(source) = self.document.as_ref().map(|doc| doc.source.clone()) else {
            self.surface.clear();
            self.update_title();
            return;
        };

        let index = self.current_index;
        let size = self.viewport_size();
        let displayed = match source.page_name(index) {
            Some(name) if PageKind::of(name) == Some(PageKind::Text) => {
                self.show_info_page(source.as_ref(), name);
                next_image_index(source.pages(), index)
            }
            Some(_) => {
                self.surface.hide_info();
                Some(index)
            }
            None => None,
        };
        self.displayed_index = displayed;

        if let Some(page) = displayed {
            let key = RenderKey::new(page, size.0, size.1);
            if let Some(image) = self.cache.get(&key) {
                self.show(page, image, Quality::Crisp, size);
            } else {
                self.show_preview(page, &key);
                let item = WorkItem::foreground(page, size.0, size.1, self.generation.current());
                self.enqueue(item);
            }

            if self.config.preload_next {
                self.preload_after(source.pages(), page, size);
            }
        }

        self.skip_preview_once = false;
        self.update_title();
    }

    /// Apply a worker result; runs on the UI thread.
    ///
    /// Results for another document, an older generation or a page no longer
    /// displayed are dropped. Anything else is cached when it was rendered
    /// for a stably sized viewport and shown if it matches the current size.
    pub fn apply_render_result(&mut self, outcome: RenderOutcome) {
        let Some(document) = &self.document else {
            log::debug!("No document open; dropping result for page {}", outcome.item.page_index);
            return;
        };
        if document.id != outcome.document_id {
            log::debug!("Dropping result from closed document {}", outcome.document_id);
            return;
        }
        self.outstanding = self.outstanding.saturating_sub(1);

        let item = outcome.item;
        let image = match outcome.result {
            Ok(image) => image,
            Err(e) => {
                log::debug!("No image for page {}: {e}", item.page_index);
                return;
            }
        };

        if !self.generation.is_current(item.generation) {
            log::debug!(
                "Discarding stale result for page {} (generation {}, now {})",
                item.page_index,
                item.generation,
                self.generation.current()
            );
            return;
        }

        let is_displayed = self.displayed_index == Some(item.page_index);
        if !item.is_speculative && !is_displayed {
            log::debug!("Discarding result for page {}; no longer displayed", item.page_index);
            return;
        }

        let size = self.viewport_size();
        let key = RenderKey::new(item.page_index, item.width, item.height);
        if self.is_stable(key.size()) {
            self.cache.insert(key, image.clone());
        }

        if is_displayed && key.size() == size {
            self.show(item.page_index, image, Quality::Crisp, size);
            self.update_title();
        }
    }

    fn show(&mut self, page_index: usize, image: PageImage, quality: Quality, viewport: (u32, u32)) {
        self.surface.show_page(&Frame { page_index, image, quality, viewport });
        if quality == Quality::Crisp {
            self.first_render_done = true;
        }
    }

    fn show_info_page(&mut self, source: &dyn PageSource, name: &str) {
        let text = match source.get_bytes(name) {
            Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Err(e) => {
                log::warn!("Could not read info page {name}: {e}");
                name.to_string()
            }
        };
        self.surface.show_info(name, &text);
    }

    fn preview_allowed(&self) -> bool {
        match self.config.preview {
            PreviewPolicy::Never => false,
            PreviewPolicy::Always => true,
            PreviewPolicy::AfterFirstRender => self.first_render_done && !self.skip_preview_once,
        }
    }

    fn show_preview(&mut self, page: usize, key: &RenderKey) {
        if !self.preview_allowed() {
            return;
        }
        let Some((from, image)) = self.cache.find_for_page(page, key) else {
            return;
        };

        log::debug!(
            "Preview of page {} from {}x{} render",
            page,
            from.width,
            from.height
        );
        let preview = preview_nearest(&image, key.width, key.height, self.config.fit);
        self.show(page, preview, Quality::Preview, key.size());
    }

    fn preload_after(&mut self, pages: &[String], page: usize, size: (u32, u32)) {
        let Some(next) = next_image_index(pages, page) else {
            return;
        };
        if self.cache.contains(&RenderKey::new(next, size.0, size.1)) {
            return;
        }

        log::debug!("Preloading page {next}");
        self.enqueue(WorkItem::speculative(next, size.0, size.1, self.generation.current()));
    }

    fn enqueue(&mut self, item: WorkItem) -> bool {
        let Some(document) = &self.document else {
            return false;
        };
        if document.pipeline.enqueue(item) {
            self.outstanding += 1;
            true
        } else {
            false
        }
    }

    fn viewport_size(&self) -> (u32, u32) {
        clamp_viewport(self.viewport.viewport_size())
    }

    fn is_stable(&self, (width, height): (u32, u32)) -> bool {
        width >= self.config.stable_viewport_min && height >= self.config.stable_viewport_min
    }

    fn update_title(&mut self) {
        let title = self.title();
        self.surface.set_title(&title);
    }

    /// Window title for the current state
    pub fn title(&self) -> String {
        match &self.document {
            Some(document) => format!(
                "{APP_NAME} - {} ({}/{})",
                document.display_name,
                self.current_index + 1,
                document.source.len()
            ),
            None => APP_NAME.to_string(),
        }
    }

    /// No pending debounce and no outstanding worker results
    pub fn is_idle(&self) -> bool {
        !self.debouncer.is_pending() && self.outstanding == 0
    }

    pub fn has_document(&self) -> bool {
        self.document.is_some()
    }

    pub fn document_id(&self) -> Option<u64> {
        self.document.as_ref().map(|doc| doc.id)
    }

    pub fn document_path(&self) -> Option<&Path> {
        self.document.as_ref().map(|doc| doc.path.as_path())
    }

    pub fn pages(&self) -> &[String] {
        self.document.as_ref().map(|doc| doc.source.pages()).unwrap_or(&[])
    }

    pub fn page_count(&self) -> usize {
        self.pages().len()
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn displayed_index(&self) -> Option<usize> {
        self.displayed_index
    }

    pub fn generation(&self) -> u64 {
        self.generation.current()
    }

    pub fn outstanding(&self) -> usize {
        self.outstanding
    }

    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Whether a rendering of `page_index` at `size` is cached
    pub fn is_cached(&self, page_index: usize, size: (u32, u32)) -> bool {
        self.cache.contains(&RenderKey::new(page_index, size.0, size.1))
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }
}

impl Drop for Viewer {
    fn drop(&mut self) {
        self.close_document();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::UiLoop;
    use crate::surface::{RecordingSurface, SurfaceEvent};
    use crate::viewport::SharedViewport;
    use comicflip_core::{SourceError, SourceKind, SourceResult};
    use std::collections::HashMap;
    use std::io::Cursor;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    const IDLE_TIMEOUT: Duration = Duration::from_secs(10);
    const SIZE: (u32, u32) = (400, 300);

    struct MemorySource {
        pages: Vec<String>,
        data: HashMap<String, Vec<u8>>,
        cleanups: Arc<AtomicUsize>,
    }

    impl PageSource for MemorySource {
        fn pages(&self) -> &[String] {
            &self.pages
        }

        fn get_bytes(&self, name: &str) -> SourceResult<Vec<u8>> {
            self.data.get(name).cloned().ok_or_else(|| SourceError::NotFound(name.to_string()))
        }

        fn cleanup(&self) {
            self.cleanups.fetch_add(1, Ordering::SeqCst);
        }

        fn kind(&self) -> SourceKind {
            SourceKind::Directory
        }
    }

    fn png(width: u32, height: u32) -> Vec<u8> {
        let image = image::RgbaImage::from_pixel(width, height, image::Rgba([10, 20, 30, 255]));
        let mut out = Cursor::new(Vec::new());
        image::DynamicImage::ImageRgba8(image).write_to(&mut out, image::ImageFormat::Png).unwrap();
        out.into_inner()
    }

    fn memory_source(entries: &[(&str, Vec<u8>)], cleanups: &Arc<AtomicUsize>) -> Arc<dyn PageSource> {
        Arc::new(MemorySource {
            pages: entries.iter().map(|(name, _)| name.to_string()).collect(),
            data: entries.iter().map(|(name, data)| (name.to_string(), data.clone())).collect(),
            cleanups: cleanups.clone(),
        })
    }

    fn three_pages(cleanups: &Arc<AtomicUsize>) -> Arc<dyn PageSource> {
        memory_source(
            &[("p1.png", png(200, 100)), ("p2.png", png(200, 100)), ("p3.png", png(200, 100))],
            cleanups,
        )
    }

    struct Harness {
        ui: UiLoop,
        viewport: SharedViewport,
        surface: RecordingSurface,
        viewer: Viewer,
    }

    impl Harness {
        fn new(config: PipelineConfig) -> Self {
            let ui = UiLoop::new();
            let viewport = SharedViewport::new(SIZE.0, SIZE.1);
            let surface = RecordingSurface::new();
            let viewer = Viewer::new(config, ui.dispatcher(), viewport.clone(), surface.clone());
            Self { ui, viewport, surface, viewer }
        }

        fn settle(&mut self) {
            assert!(self.ui.run_until_idle(&mut self.viewer, IDLE_TIMEOUT), "pipeline never went idle");
        }

        fn last_page(&self) -> Option<(usize, Quality)> {
            self.surface.pages().last().copied()
        }
    }

    fn test_config() -> PipelineConfig {
        PipelineConfig::default().with_workers(2).with_debounce_ms(20)
    }

    #[test]
    fn test_next_image_index() {
        let pages: Vec<String> =
            ["a.txt", "b.nfo", "1.png", "c.txt", "2.png"].iter().map(|s| s.to_string()).collect();
        assert_eq!(next_image_index(&pages, 0), Some(2));
        assert_eq!(next_image_index(&pages, 2), Some(4));
        assert_eq!(next_image_index(&pages, 4), None);
    }

    #[test]
    fn test_open_shows_info_page_over_first_image() {
        let cleanups = Arc::new(AtomicUsize::new(0));
        let source = memory_source(
            &[("info.txt", b"Scanned by nobody".to_vec()), ("p1.png", png(200, 100)), ("p2.png", png(200, 100))],
            &cleanups,
        );
        let mut h = Harness::new(test_config());

        h.viewer.open_source("issue.cbz", source).unwrap();
        assert_eq!(h.viewer.current_index(), 0);
        assert_eq!(h.viewer.displayed_index(), Some(1));
        assert!(h.surface.events().contains(&SurfaceEvent::Info {
            name: "info.txt".to_string(),
            text: "Scanned by nobody".to_string(),
        }));

        h.settle();
        assert_eq!(h.last_page(), Some((1, Quality::Crisp)));
        assert!(h.viewer.is_cached(1, SIZE));
        // Preloaded next image
        assert!(h.viewer.is_cached(2, SIZE));
        assert_eq!(h.viewer.title(), "comicflip - issue.cbz (1/3)");
    }

    #[test]
    fn test_displayed_page_is_scaled_to_viewport() {
        let cleanups = Arc::new(AtomicUsize::new(0));
        let mut h = Harness::new(test_config());
        h.viewer.open_source("a.cbz", three_pages(&cleanups)).unwrap();
        h.settle();

        let sizes: Vec<_> = h
            .surface
            .events()
            .into_iter()
            .filter_map(|event| match event {
                SurfaceEvent::Page { width, height, .. } => Some((width, height)),
                _ => None,
            })
            .collect();
        // 200x100 into 400x300: width bound, scale 2
        assert_eq!(sizes, vec![(400, 200)]);
    }

    #[test]
    fn test_navigation_uses_preloaded_page() {
        let cleanups = Arc::new(AtomicUsize::new(0));
        let mut h = Harness::new(test_config());
        h.viewer.open_source("a.cbz", three_pages(&cleanups)).unwrap();
        h.settle();
        assert_eq!(h.viewer.generation(), 0);

        h.viewer.next();
        // Served from cache before any worker result arrives
        assert_eq!(h.last_page(), Some((1, Quality::Crisp)));
        assert_eq!(h.viewer.generation(), 1);
        assert_eq!(h.viewer.title(), "comicflip - a.cbz (2/3)");

        h.settle();
        assert!(h.viewer.is_cached(2, SIZE));
        assert!(h.viewer.cache_stats().hits >= 1);
    }

    #[test]
    fn test_navigation_clamps_and_bumps_generation() {
        let cleanups = Arc::new(AtomicUsize::new(0));
        let mut h = Harness::new(test_config());
        h.viewer.open_source("a.cbz", three_pages(&cleanups)).unwrap();

        h.viewer.prev();
        assert_eq!(h.viewer.current_index(), 0);
        assert_eq!(h.viewer.generation(), 1);
        h.settle();

        h.viewer.last();
        h.settle();
        h.viewer.next();
        assert_eq!(h.viewer.current_index(), 2);
        assert_eq!(h.viewer.generation(), 3);
        h.settle();

        h.viewer.first();
        assert_eq!(h.viewer.current_index(), 0);
        h.settle();
        assert_eq!(h.last_page(), Some((0, Quality::Crisp)));
    }

    #[test]
    fn test_stale_result_is_discarded() {
        let cleanups = Arc::new(AtomicUsize::new(0));
        let mut h = Harness::new(test_config().with_preload_next(false));
        h.viewer.open_source("a.cbz", three_pages(&cleanups)).unwrap();
        let document_id = h.viewer.document_id().unwrap();

        // Generation 0 work for page 0 is in flight; the user moves on
        h.viewer.next();
        assert_eq!(h.viewer.generation(), 1);

        let late = Arc::new(image::RgbaImage::new(400, 200));
        h.viewer.apply_render_result(RenderOutcome {
            document_id,
            item: WorkItem::foreground(0, SIZE.0, SIZE.1, 0),
            result: Ok(late),
        });

        assert!(!h.viewer.is_cached(0, SIZE));
        assert!(!h.surface.pages().contains(&(0, Quality::Crisp)));
    }

    #[test]
    fn test_result_for_other_page_is_discarded() {
        let cleanups = Arc::new(AtomicUsize::new(0));
        let mut h = Harness::new(test_config().with_preload_next(false));
        h.viewer.open_source("a.cbz", three_pages(&cleanups)).unwrap();
        let document_id = h.viewer.document_id().unwrap();

        let image = Arc::new(image::RgbaImage::new(400, 200));
        h.viewer.apply_render_result(RenderOutcome {
            document_id,
            item: WorkItem::foreground(2, SIZE.0, SIZE.1, 0),
            result: Ok(image.clone()),
        });
        assert!(!h.viewer.is_cached(2, SIZE));

        // A current-generation preload is cached but not shown
        h.viewer.apply_render_result(RenderOutcome {
            document_id,
            item: WorkItem::speculative(2, SIZE.0, SIZE.1, 0),
            result: Ok(image.clone()),
        });
        assert!(h.viewer.is_cached(2, SIZE));
        assert!(!h.surface.pages().contains(&(2, Quality::Crisp)));

        // Results tagged with another document are ignored
        h.viewer.apply_render_result(RenderOutcome {
            document_id: document_id + 1,
            item: WorkItem::foreground(0, SIZE.0, SIZE.1, 0),
            result: Ok(image),
        });
        assert!(!h.viewer.is_cached(0, SIZE));
    }

    #[test]
    fn test_unstable_viewport_is_not_cached() {
        let cleanups = Arc::new(AtomicUsize::new(0));
        let mut h = Harness::new(test_config());
        h.viewport.set(50, 0);

        h.viewer.open_source("a.cbz", three_pages(&cleanups)).unwrap();
        h.settle();

        assert_eq!(h.last_page(), Some((0, Quality::Crisp)));
        assert_eq!(h.viewer.cache_len(), 0);
    }

    #[test]
    fn test_result_rendered_at_small_size_is_not_cached() {
        let cleanups = Arc::new(AtomicUsize::new(0));
        let mut h = Harness::new(test_config().with_preload_next(false));
        h.viewport.set(50, 50);
        h.viewer.open_source("a.cbz", three_pages(&cleanups)).unwrap();
        let document_id = h.viewer.document_id().unwrap();

        // The window settles before the small render comes back
        h.viewport.set(SIZE.0, SIZE.1);
        h.viewer.apply_render_result(RenderOutcome {
            document_id,
            item: WorkItem::foreground(0, 50, 50, 0),
            result: Ok(Arc::new(image::RgbaImage::new(50, 25))),
        });

        assert!(!h.viewer.is_cached(0, (50, 50)));
        assert_eq!(h.viewer.cache_len(), 0);
        assert!(h.surface.pages().is_empty());
    }

    #[test]
    fn test_debounce_collapses_navigation() {
        let cleanups = Arc::new(AtomicUsize::new(0));
        let mut h = Harness::new(test_config().with_debounce_ms(30));
        h.viewer.open_source("a.cbz", three_pages(&cleanups)).unwrap();

        let start = Instant::now();
        h.viewer.request_nav_at(NavTarget::Next, start);
        h.viewer.request_nav_at(NavTarget::Next, start + Duration::from_millis(10));
        h.viewer.request_nav_at(NavTarget::Last, start + Duration::from_millis(20));

        h.viewer.tick(start + Duration::from_millis(40));
        assert_eq!(h.viewer.current_index(), 0);
        assert_eq!(h.viewer.generation(), 0);
        assert_eq!(h.viewer.next_deadline(), Some(start + Duration::from_millis(50)));

        h.viewer.tick(start + Duration::from_millis(50));
        assert_eq!(h.viewer.current_index(), 2);
        assert_eq!(h.viewer.generation(), 1);
        assert!(h.viewer.next_deadline().is_none());
    }

    #[test]
    fn test_debounced_navigation_through_ui_loop() {
        let cleanups = Arc::new(AtomicUsize::new(0));
        let mut h = Harness::new(test_config());
        h.viewer.open_source("a.cbz", three_pages(&cleanups)).unwrap();
        h.settle();

        h.viewer.request_nav(NavTarget::Next);
        h.viewer.request_nav(NavTarget::Next);
        h.settle();

        assert_eq!(h.viewer.current_index(), 1);
        assert_eq!(h.viewer.generation(), 1);
        assert_eq!(h.last_page(), Some((1, Quality::Crisp)));
    }

    #[test]
    fn test_preview_policy_after_first_render() {
        let cleanups = Arc::new(AtomicUsize::new(0));
        let mut h = Harness::new(test_config().with_preload_next(false));
        h.viewer.open_source("a.cbz", three_pages(&cleanups)).unwrap();
        h.settle();
        assert!(!h.surface.pages().iter().any(|(_, q)| *q == Quality::Preview));

        // The window grew without a resize notification; navigating back to
        // page 0 can preview from the 400x300 render
        h.viewport.set(600, 500);
        h.surface.drain();
        h.viewer.first();
        assert_eq!(h.surface.pages(), vec![(0, Quality::Preview)]);
        h.settle();
        assert_eq!(h.last_page(), Some((0, Quality::Crisp)));

        // A real resize never previews
        h.viewport.set(800, 700);
        h.surface.drain();
        h.viewer.on_viewport_resized();
        h.settle();
        assert_eq!(h.surface.pages(), vec![(0, Quality::Crisp)]);
    }

    #[test]
    fn test_preview_policy_never() {
        let cleanups = Arc::new(AtomicUsize::new(0));
        let config = test_config().with_preload_next(false).with_preview(PreviewPolicy::Never);
        let mut h = Harness::new(config);
        h.viewer.open_source("a.cbz", three_pages(&cleanups)).unwrap();
        h.settle();

        h.viewport.set(600, 500);
        h.viewer.first();
        h.settle();
        assert!(!h.surface.pages().iter().any(|(_, q)| *q == Quality::Preview));
    }

    #[test]
    fn test_resize_rerenders_at_new_size() {
        let cleanups = Arc::new(AtomicUsize::new(0));
        let mut h = Harness::new(test_config().with_preload_next(false));
        h.viewport.set(10, 10);
        h.viewer.open_source("a.cbz", three_pages(&cleanups)).unwrap();
        h.settle();

        h.viewport.set(SIZE.0, SIZE.1);
        h.viewer.on_viewport_resized();
        h.settle();
        assert!(h.viewer.is_cached(0, SIZE));

        // Same size again is a no-op
        let generation = h.viewer.generation();
        h.surface.drain();
        h.viewer.on_viewport_resized();
        assert!(h.surface.pages().is_empty());
        assert_eq!(h.viewer.generation(), generation);
    }

    #[test]
    fn test_bad_page_does_not_stop_browsing() {
        let cleanups = Arc::new(AtomicUsize::new(0));
        let source = memory_source(
            &[("p1.png", b"not a png".to_vec()), ("p2.png", png(50, 50))],
            &cleanups,
        );
        let mut h = Harness::new(test_config());
        h.viewer.open_source("a.cbz", source).unwrap();
        h.settle();
        assert!(h.surface.pages().is_empty());
        assert!(!h.viewer.is_cached(0, SIZE));

        h.viewer.next();
        h.settle();
        assert_eq!(h.last_page(), Some((1, Quality::Crisp)));
    }

    #[test]
    fn test_close_stops_pool_and_cleans_up() {
        let cleanups = Arc::new(AtomicUsize::new(0));
        let mut h = Harness::new(test_config());
        h.viewer.open_source("a.cbz", three_pages(&cleanups)).unwrap();
        h.settle();
        let document_id = h.viewer.document_id().unwrap();

        h.viewer.close();
        assert_eq!(cleanups.load(Ordering::SeqCst), 1);
        assert!(!h.viewer.has_document());
        assert_eq!(h.viewer.cache_len(), 0);
        assert_eq!(h.viewer.title(), "comicflip");
        assert_eq!(h.surface.events().last(), Some(&SurfaceEvent::Title("comicflip".to_string())));

        // Late results and navigation are ignored
        h.viewer.apply_render_result(RenderOutcome {
            document_id,
            item: WorkItem::foreground(0, SIZE.0, SIZE.1, 0),
            result: Ok(Arc::new(image::RgbaImage::new(1, 1))),
        });
        h.viewer.next();
        assert_eq!(h.viewer.cache_len(), 0);
        assert_eq!(h.viewer.generation(), 0);

        h.viewer.close();
        assert_eq!(cleanups.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_failed_open_keeps_previous_document() {
        let cleanups = Arc::new(AtomicUsize::new(0));
        let mut h = Harness::new(test_config());
        h.viewer.open_source("a.cbz", three_pages(&cleanups)).unwrap();
        h.settle();

        let dir = tempfile::tempdir().unwrap();
        let empty = dir.path().join("empty.cbz");
        std::fs::write(&empty, b"").unwrap();

        let err = h.viewer.open(&empty).unwrap_err();
        assert!(matches!(err, ViewerError::Open(SourceError::EmptyArchive(_))));
        assert!(h.viewer.has_document());
        assert_eq!(h.viewer.document_path(), Some(Path::new("a.cbz")));
        assert_eq!(cleanups.load(Ordering::SeqCst), 0);
        assert!(h.viewer.is_cached(0, SIZE));
    }

    #[test]
    fn test_open_replaces_previous_document() {
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));
        let mut h = Harness::new(test_config());
        h.viewer.open_source("a.cbz", three_pages(&first)).unwrap();
        h.settle();
        h.viewer.last();
        h.settle();

        h.viewer.open_source("b.cbz", three_pages(&second)).unwrap();
        assert_eq!(first.load(Ordering::SeqCst), 1);
        assert_eq!(second.load(Ordering::SeqCst), 0);
        assert_eq!(h.viewer.current_index(), 0);
        assert_eq!(h.viewer.title(), "comicflip - b.cbz (1/3)");

        h.settle();
        assert_eq!(h.last_page(), Some((0, Quality::Crisp)));
        drop(h);
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_single_worker_pipeline() {
        let cleanups = Arc::new(AtomicUsize::new(0));
        let mut h = Harness::new(test_config().with_workers(1).with_queue_capacity(1));
        h.viewer.open_source("a.cbz", three_pages(&cleanups)).unwrap();
        h.settle();
        assert_eq!(h.last_page(), Some((0, Quality::Crisp)));

        for _ in 0..2 {
            h.viewer.next();
            h.settle();
        }
        assert_eq!(h.last_page(), Some((2, Quality::Crisp)));
    }

    #[test]
    fn test_open_directory_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("page10.png"), png(30, 30)).unwrap();
        std::fs::write(dir.path().join("page2.png"), png(30, 30)).unwrap();

        let mut h = Harness::new(test_config());
        h.viewer.open(dir.path()).unwrap();
        assert_eq!(h.viewer.pages(), &["page2.png", "page10.png"]);
        h.settle();
        assert_eq!(h.last_page(), Some((0, Quality::Crisp)));
    }
}
