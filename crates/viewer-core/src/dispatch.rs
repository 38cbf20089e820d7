//! Hand-off of work from worker threads to the UI thread

use crate::viewer::Viewer;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::time::{Duration, Instant};

/// A closure run on the UI thread with exclusive access to the viewer
pub type UiTask = Box<dyn FnOnce(&mut Viewer) + Send>;

/// Thread-safe way to run a task on the UI thread.
///
/// Workers never touch viewer state directly; everything they produce
/// arrives through here.
pub trait UiDispatcher: Send + Sync {
    fn schedule_on_ui_thread(&self, task: UiTask);
}

struct ChannelDispatcher {
    sender: Sender<UiTask>,
}

impl UiDispatcher for ChannelDispatcher {
    fn schedule_on_ui_thread(&self, task: UiTask) {
        if self.sender.send(task).is_err() {
            log::debug!("UI loop is gone; dropping task");
        }
    }
}

/// Minimal single-threaded event loop over an `mpsc` channel.
///
/// Besides running queued tasks it fires the viewer's debounced navigation
/// once its deadline passes. Embedders with their own event loop can
/// implement [`UiDispatcher`] instead.
pub struct UiLoop {
    sender: Sender<UiTask>,
    receiver: Receiver<UiTask>,
}

impl Default for UiLoop {
    fn default() -> Self {
        Self::new()
    }
}

impl UiLoop {
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::channel();
        Self { sender, receiver }
    }

    /// Dispatcher feeding this loop, to hand to the viewer
    pub fn dispatcher(&self) -> std::sync::Arc<dyn UiDispatcher> {
        std::sync::Arc::new(ChannelDispatcher { sender: self.sender.clone() })
    }

    /// Run every task already queued plus any due debounce, without waiting.
    pub fn pump(&self, viewer: &mut Viewer) -> usize {
        let mut ran = 0;
        while let Ok(task) = self.receiver.try_recv() {
            task(viewer);
            ran += 1;
        }
        viewer.tick(Instant::now());
        ran
    }

    /// Process tasks and debounce deadlines until `duration` has passed.
    pub fn run_for(&self, viewer: &mut Viewer, duration: Duration) {
        let end = Instant::now() + duration;
        while self.step(viewer, end) {}
    }

    /// Process until the viewer is idle or `timeout` passes.
    ///
    /// Returns `true` if the viewer went idle.
    pub fn run_until_idle(&self, viewer: &mut Viewer, timeout: Duration) -> bool {
        let end = Instant::now() + timeout;
        loop {
            self.pump(viewer);
            if viewer.is_idle() {
                return true;
            }
            if !self.step(viewer, end) {
                return viewer.is_idle();
            }
        }
    }

    /// Wait for one task or deadline. `false` once `end` is reached.
    fn step(&self, viewer: &mut Viewer, end: Instant) -> bool {
        let now = Instant::now();
        if now >= end {
            return false;
        }

        let wake = viewer.next_deadline().map_or(end, |deadline| deadline.min(end));
        match self.receiver.recv_timeout(wake.saturating_duration_since(now)) {
            Ok(task) => task(viewer),
            Err(RecvTimeoutError::Timeout) => {}
            // Unreachable while we hold a sender
            Err(RecvTimeoutError::Disconnected) => return false,
        }
        viewer.tick(Instant::now());
        true
    }
}
