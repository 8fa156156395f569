// Batch metrics module
//
// Lightweight counters summarising what an apply batch did

use crate::models::{ApplyStep, OperationOutcome};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

/// Counters for apply batches
///
/// Uses atomic operations so the batch worker can record while the caller
/// reads. Logged once a batch completes.
#[derive(Debug)]
pub struct Metrics {
    /// Games whose pipeline ran (successfully or not)
    pub games_processed: AtomicUsize,

    /// Games rejected before any copy (missing folders, no icons, ...)
    pub games_skipped: AtomicUsize,

    /// Successful copy steps
    pub icon_batches_applied: AtomicUsize,

    /// Individual icon copies that failed
    pub copy_failures: AtomicUsize,

    pub thumbnails_updated: AtomicUsize,
    pub thumbnail_failures: AtomicUsize,

    pub shortcut_updates: AtomicUsize,
    pub shortcut_failures: AtomicUsize,

    /// Total time spent inside game pipelines in milliseconds
    pub total_apply_time_ms: AtomicU64,

    start_time: Instant,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            games_processed: AtomicUsize::new(0),
            games_skipped: AtomicUsize::new(0),
            icon_batches_applied: AtomicUsize::new(0),
            copy_failures: AtomicUsize::new(0),
            thumbnails_updated: AtomicUsize::new(0),
            thumbnail_failures: AtomicUsize::new(0),
            shortcut_updates: AtomicUsize::new(0),
            shortcut_failures: AtomicUsize::new(0),
            total_apply_time_ms: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    /// Record one outcome under the counter for its step.
    pub fn record_outcome(&self, outcome: &OperationOutcome) {
        let counter = match (outcome.step, outcome.success) {
            (ApplyStep::Validate, _) => &self.games_skipped,
            (ApplyStep::Copy, true) => &self.icon_batches_applied,
            (ApplyStep::Copy, false) => &self.copy_failures,
            (ApplyStep::Thumbnail, true) => &self.thumbnails_updated,
            (ApplyStep::Thumbnail, false) => &self.thumbnail_failures,
            (ApplyStep::Shortcuts, true) => &self.shortcut_updates,
            (ApplyStep::Shortcuts, false) => &self.shortcut_failures,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a finished game pipeline and how long it took
    pub fn record_game(&self, duration: Duration) {
        self.games_processed.fetch_add(1, Ordering::Relaxed);
        self.total_apply_time_ms
            .fetch_add(duration.as_millis() as u64, Ordering::Relaxed);
    }

    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Average pipeline time per game in milliseconds
    pub fn avg_apply_time_ms(&self) -> f64 {
        let total = self.total_apply_time_ms.load(Ordering::Relaxed);
        let count = self.games_processed.load(Ordering::Relaxed);
        if count > 0 {
            total as f64 / count as f64
        } else {
            0.0
        }
    }

    /// Log metrics summary
    pub fn log_summary(&self) {
        tracing::info!("=== Apply Metrics Summary ===");
        tracing::info!("Uptime: {:.2}s", self.uptime().as_secs_f64());
        tracing::info!(
            "Games: {} processed, {} skipped (avg {:.2}ms per game)",
            self.games_processed.load(Ordering::Relaxed),
            self.games_skipped.load(Ordering::Relaxed),
            self.avg_apply_time_ms()
        );
        tracing::info!(
            "Icons: {} applied, {} copy failures",
            self.icon_batches_applied.load(Ordering::Relaxed),
            self.copy_failures.load(Ordering::Relaxed)
        );
        tracing::info!(
            "Library images: {} updated, {} failed; shortcuts: {} updated, {} failed",
            self.thumbnails_updated.load(Ordering::Relaxed),
            self.thumbnail_failures.load(Ordering::Relaxed),
            self.shortcut_updates.load(Ordering::Relaxed),
            self.shortcut_failures.load(Ordering::Relaxed)
        );
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
