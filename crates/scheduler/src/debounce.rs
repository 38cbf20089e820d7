//! Navigation debouncer
//!
//! Collapses a burst of triggers into one action carrying the last intent.
//! The debouncer holds no timer of its own: the owner asks for the
//! [`Debouncer::deadline`] and calls [`Debouncer::poll`] once it passes.

use std::time::{Duration, Instant};

/// Default quiet period
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(150);

/// Debouncer state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebounceState {
    Idle,
    PendingDebounce,
}

#[derive(Debug)]
pub struct Debouncer<T> {
    quiet: Duration,
    pending: Option<(T, Instant)>,
}

impl<T> Default for Debouncer<T> {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE)
    }
}

impl<T> Debouncer<T> {
    pub fn new(quiet: Duration) -> Self {
        Self { quiet, pending: None }
    }

    pub fn quiet_period(&self) -> Duration {
        self.quiet
    }

    pub fn state(&self) -> DebounceState {
        if self.pending.is_some() {
            DebounceState::PendingDebounce
        } else {
            DebounceState::Idle
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Replace any pending intent and restart the quiet period from `now`.
    pub fn trigger(&mut self, intent: T, now: Instant) {
        if self.pending.is_some() {
            log::trace!("Debounce restarted");
        }
        self.pending = Some((intent, now + self.quiet));
    }

    /// When the pending intent fires, if any
    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|(_, deadline)| *deadline)
    }

    /// Take the pending intent if its quiet period has elapsed by `now`.
    pub fn poll(&mut self, now: Instant) -> Option<T> {
        let due = matches!(&self.pending, Some((_, deadline)) if now >= *deadline);
        if due {
            self.flush()
        } else {
            None
        }
    }

    /// Take the pending intent regardless of the deadline
    pub fn flush(&mut self) -> Option<T> {
        self.pending.take().map(|(intent, _)| intent)
    }

    /// Drop the pending intent
    pub fn cancel(&mut self) {
        self.pending = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const QUIET: Duration = Duration::from_millis(150);

    #[test]
    fn test_burst_collapses_to_last_intent() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(QUIET);

        debouncer.trigger("next", start);
        debouncer.trigger("prev", start + Duration::from_millis(50));
        debouncer.trigger("last", start + Duration::from_millis(100));

        let mut fired = Vec::new();
        for ms in (0..=400).step_by(10) {
            if let Some(intent) = debouncer.poll(start + Duration::from_millis(ms)) {
                fired.push((intent, ms));
            }
        }

        assert_eq!(fired, vec![("last", 250)]);
        assert_eq!(debouncer.state(), DebounceState::Idle);
    }

    #[test]
    fn test_state_machine() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(QUIET);
        assert_eq!(debouncer.state(), DebounceState::Idle);
        assert!(debouncer.deadline().is_none());

        debouncer.trigger(1, start);
        assert_eq!(debouncer.state(), DebounceState::PendingDebounce);
        assert_eq!(debouncer.deadline(), Some(start + QUIET));

        // Retrigger pushes the deadline out
        debouncer.trigger(2, start + Duration::from_millis(100));
        assert_eq!(debouncer.poll(start + QUIET), None);
        assert_eq!(debouncer.poll(start + Duration::from_millis(250)), Some(2));
        assert_eq!(debouncer.poll(start + Duration::from_secs(5)), None);
    }

    #[test]
    fn test_flush_and_cancel() {
        let start = Instant::now();
        let mut debouncer = Debouncer::default();
        assert_eq!(debouncer.quiet_period(), DEFAULT_DEBOUNCE);

        debouncer.trigger('a', start);
        assert_eq!(debouncer.flush(), Some('a'));

        debouncer.trigger('b', start);
        debouncer.cancel();
        assert!(!debouncer.is_pending());
        assert_eq!(debouncer.poll(start + Duration::from_secs(1)), None);
    }
}
