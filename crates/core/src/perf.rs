//! Operation timing for the `comicflip::perf` log target

use std::time::{Duration, Instant};

/// Log target for timing lines.
pub const PERF_TARGET: &str = "comicflip::perf";

/// Logs how long a scope took when dropped.
///
/// Lines are emitted at debug level under [`PERF_TARGET`], so they only show
/// up with e.g. `RUST_LOG=comicflip::perf=debug`.
///
/// ```
/// use comicflip_core::PerfTimer;
///
/// {
///     let _timer = PerfTimer::new("load_comic").with_extra("path=issue.cbz");
///     // ... work ...
/// }
/// ```
#[derive(Debug)]
pub struct PerfTimer {
    operation: &'static str,
    extra: String,
    start: Instant,
}

impl PerfTimer {
    /// Start timing `operation`
    pub fn new(operation: &'static str) -> Self {
        Self { operation, extra: String::new(), start: Instant::now() }
    }

    /// Attach free-form context to the log line
    pub fn with_extra(mut self, extra: impl Into<String>) -> Self {
        self.extra = extra.into();
        self
    }

    /// Time elapsed so far
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

impl Drop for PerfTimer {
    fn drop(&mut self) {
        log::debug!(
            target: PERF_TARGET,
            "PERF {}: {:.6}s {}",
            self.operation,
            self.start.elapsed().as_secs_f64(),
            self.extra
        );
    }
}
