//! Per-document queue and worker pool

use crate::config::PipelineConfig;
use crate::dispatch::UiDispatcher;
use crate::viewer::Viewer;
use comicflip_core::{PageSource, PerfTimer};
use comicflip_render::{FitMode, PageImage, ResizeBackend};
use comicflip_scheduler::{WorkExecutor, WorkItem, WorkQueue, WorkerPool, WorkerPoolConfig};
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Weak};

/// What a worker produced for one item, delivered to the UI thread
#[derive(Debug, Clone)]
pub struct RenderOutcome {
    /// Document the item belonged to
    pub document_id: u64,
    pub item: WorkItem,
    /// The rendered page, or why it failed
    pub result: Result<PageImage, String>,
}

/// Queue and workers serving one open document.
///
/// Workers hold only a weak reference to the source, so once the document
/// is dropped any remaining items are skipped.
pub struct RenderPipeline {
    queue: Arc<WorkQueue>,
    pool: WorkerPool,
}

impl RenderPipeline {
    pub fn start(
        document_id: u64,
        source: &Arc<dyn PageSource>,
        backend: Arc<dyn ResizeBackend>,
        dispatcher: Arc<dyn UiDispatcher>,
        config: &PipelineConfig,
    ) -> io::Result<Self> {
        let queue = Arc::new(WorkQueue::new(config.queue_capacity));
        let executor = render_executor(
            document_id,
            Arc::downgrade(source),
            backend,
            dispatcher,
            config.fit,
        );
        let pool = WorkerPool::new(
            queue.clone(),
            executor,
            WorkerPoolConfig::new(config.worker_count).with_thread_name(format!("comicflip-doc{document_id}")),
        )?;
        Ok(Self { queue, pool })
    }

    /// Non-blocking enqueue; `false` if the item was dropped
    pub fn enqueue(&self, item: WorkItem) -> bool {
        self.queue.try_push(item)
    }

    pub fn queue(&self) -> &WorkQueue {
        &self.queue
    }

    pub fn pool(&self) -> &WorkerPool {
        &self.pool
    }

    /// Stop and join all workers. Idempotent.
    pub fn stop(&mut self) {
        self.pool.stop();
    }
}

fn render_executor(
    document_id: u64,
    source: Weak<dyn PageSource>,
    backend: Arc<dyn ResizeBackend>,
    dispatcher: Arc<dyn UiDispatcher>,
    fit: FitMode,
) -> WorkExecutor {
    Arc::new(move |item: &WorkItem| {
        let Some(source) = source.upgrade() else {
            log::debug!("Document closed; skipping page {}", item.page_index);
            return Ok(());
        };

        let rendered = panic::catch_unwind(AssertUnwindSafe(|| {
            render_item(source.as_ref(), backend.as_ref(), item, fit)
        }))
        .unwrap_or_else(|_| Err(format!("renderer panicked on page {}", item.page_index)));

        let failure = rendered.as_ref().err().cloned();
        let outcome = RenderOutcome { document_id, item: *item, result: rendered };
        dispatcher.schedule_on_ui_thread(Box::new(move |viewer: &mut Viewer| {
            viewer.apply_render_result(outcome)
        }));

        match failure {
            Some(message) => Err(message.into()),
            None => Ok(()),
        }
    })
}

fn render_item(
    source: &dyn PageSource,
    backend: &dyn ResizeBackend,
    item: &WorkItem,
    fit: FitMode,
) -> Result<PageImage, String> {
    let name = source
        .page_name(item.page_index)
        .ok_or_else(|| format!("no page at index {}", item.page_index))?;
    let _timer = PerfTimer::new("render_page")
        .with_extra(format!("page={} size={}x{}", item.page_index, item.width, item.height));

    let bytes = source.get_bytes(name).map_err(|e| e.to_string())?;
    backend.render(&bytes, item.width, item.height, fit).map_err(|e| format!("{name}: {e}"))
}
