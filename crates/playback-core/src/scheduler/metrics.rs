//! Scheduler instrumentation, mirrored from
//! `mesio::hls::metrics::PerformanceMetrics` / `output::ReorderBufferMetrics`:
//! plain atomic counters plus a single structured summary line on teardown.

use std::sync::atomic::{AtomicU64, Ordering};
use tracing::info;

#[derive(Debug, Default)]
pub struct SchedulerMetrics {
    pub segments_requested: AtomicU64,
    pub segments_loaded: AtomicU64,
    pub segments_skipped_redundant: AtomicU64,
    pub gc_triggered: AtomicU64,
    pub precondition_failures: AtomicU64,
}

impl SchedulerMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_requested(&self) {
        self.segments_requested.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_loaded(&self) {
        self.segments_loaded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_skipped_redundant(&self) {
        self.segments_skipped_redundant.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_gc_triggered(&self) {
        self.gc_triggered.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_precondition_failure(&self) {
        self.precondition_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Emit one structured summary line. Called when a scheduler instance
    /// is torn down.
    pub fn log_summary(&self) {
        info!(
            segments_requested = self.segments_requested.load(Ordering::Relaxed),
            segments_loaded = self.segments_loaded.load(Ordering::Relaxed),
            segments_skipped_redundant = self.segments_skipped_redundant.load(Ordering::Relaxed),
            gc_triggered = self.gc_triggered.load(Ordering::Relaxed),
            precondition_failures = self.precondition_failures.load(Ordering::Relaxed),
            "scheduler metrics summary"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::Ordering;

    #[test]
    fn counters_start_at_zero_and_accumulate() {
        let metrics = SchedulerMetrics::new();
        metrics.record_requested();
        metrics.record_requested();
        metrics.record_loaded();
        assert_eq!(metrics.segments_requested.load(Ordering::Relaxed), 2);
        assert_eq!(metrics.segments_loaded.load(Ordering::Relaxed), 1);
    }
}
