//! Test loading indicator.

use std::sync::atomic::{AtomicUsize, Ordering};

use waypoint_core::adapters::LoadingIndicator;
use waypoint_core::context::TransitionContext;

/// Counts `show`/`hide` calls.
#[derive(Debug, Default)]
pub struct RecordingIndicator {
    shown: AtomicUsize,
    hidden: AtomicUsize,
}

impl RecordingIndicator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shown(&self) -> usize {
        self.shown.load(Ordering::SeqCst)
    }

    pub fn hidden(&self) -> usize {
        self.hidden.load(Ordering::SeqCst)
    }
}

impl LoadingIndicator for RecordingIndicator {
    fn show(&self, _context: &TransitionContext) {
        self.shown.fetch_add(1, Ordering::SeqCst);
    }

    fn hide(&self) {
        self.hidden.fetch_add(1, Ordering::SeqCst);
    }
}
