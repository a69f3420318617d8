//! Click emitter that only counts, for tests and dry runs

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::binding::TargetButton;

use super::ClickEmitter;

/// Records how many clicks each target received
#[derive(Debug, Default)]
pub struct RecordingClicker {
    counts: [AtomicUsize; 2],
}

impl RecordingClicker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self, target: TargetButton) -> usize {
        self.counts[target.index()].load(Ordering::SeqCst)
    }

    pub fn total(&self) -> usize {
        TargetButton::ALL.iter().map(|t| self.count(*t)).sum()
    }
}

impl ClickEmitter for RecordingClicker {
    fn click(&self, target: TargetButton) {
        self.counts[target.index()].fetch_add(1, Ordering::SeqCst);
    }
}
