//! Scan progress reporting.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use tokio::sync::broadcast;

/// Number of files between two progress snapshots.
const PUBLISH_EVERY: u64 = 1000;

/// Progress information during a scan.
#[derive(Debug, Clone)]
pub struct ScanProgress {
    /// Number of files scanned so far.
    pub files_scanned: u64,
    /// Number of directories listed so far.
    pub dirs_scanned: u64,
    /// Total bytes scanned so far.
    pub bytes_scanned: u64,
    /// Number of errors counted so far.
    pub errors_count: u64,
    /// Estimated number of files in the tree, when known.
    pub estimated_total: Option<u64>,
    /// Time elapsed since scan started.
    pub elapsed: Duration,
    /// Set on the final snapshot of a run.
    pub finished: bool,
}

impl ScanProgress {
    /// Create initial progress state.
    pub fn new() -> Self {
        Self {
            files_scanned: 0,
            dirs_scanned: 0,
            bytes_scanned: 0,
            errors_count: 0,
            estimated_total: None,
            elapsed: Duration::ZERO,
            finished: false,
        }
    }

    /// Calculate scan rate in files per second.
    pub fn files_per_second(&self) -> f64 {
        if self.elapsed.as_secs_f64() > 0.0 {
            self.files_scanned as f64 / self.elapsed.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Fraction of the estimated total scanned, capped at 1.0.
    pub fn fraction(&self) -> Option<f64> {
        self.estimated_total
            .filter(|total| *total > 0)
            .map(|total| (self.files_scanned as f64 / total as f64).min(1.0))
    }
}

impl Default for ScanProgress {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-run progress counters shared by all workers.
///
/// Counters are atomics, so workers update them without locks; snapshots go
/// out on a broadcast channel and are dropped when nobody listens.
#[derive(Debug)]
pub(crate) struct ProgressTracker {
    start_time: Instant,
    files_scanned: AtomicU64,
    dirs_scanned: AtomicU64,
    bytes_scanned: AtomicU64,
    errors_count: AtomicU64,
    estimated_total: AtomicU64,
    tx: broadcast::Sender<ScanProgress>,
}

impl ProgressTracker {
    pub fn new(tx: broadcast::Sender<ScanProgress>) -> Self {
        Self {
            start_time: Instant::now(),
            files_scanned: AtomicU64::new(0),
            dirs_scanned: AtomicU64::new(0),
            bytes_scanned: AtomicU64::new(0),
            errors_count: AtomicU64::new(0),
            estimated_total: AtomicU64::new(0),
            tx,
        }
    }

    pub fn record_file(&self, size: u64) {
        self.bytes_scanned.fetch_add(size, Ordering::Relaxed);
        let count = self.files_scanned.fetch_add(1, Ordering::Relaxed) + 1;
        if count % PUBLISH_EVERY == 0 {
            self.publish(false);
        }
    }

    pub fn record_dir(&self) {
        self.dirs_scanned.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_error(&self) {
        self.errors_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn set_estimated_total(&self, total: u64) {
        self.estimated_total.store(total, Ordering::Relaxed);
    }

    pub fn snapshot(&self, finished: bool) -> ScanProgress {
        let estimated = self.estimated_total.load(Ordering::Relaxed);
        ScanProgress {
            files_scanned: self.files_scanned.load(Ordering::Relaxed),
            dirs_scanned: self.dirs_scanned.load(Ordering::Relaxed),
            bytes_scanned: self.bytes_scanned.load(Ordering::Relaxed),
            errors_count: self.errors_count.load(Ordering::Relaxed),
            estimated_total: (estimated > 0).then_some(estimated),
            elapsed: self.start_time.elapsed(),
            finished,
        }
    }

    pub fn publish(&self, finished: bool) {
        // No receivers is fine.
        let _ = self.tx.send(self.snapshot(finished));
    }
}
