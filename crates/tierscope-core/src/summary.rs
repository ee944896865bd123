//! Result of a completed scan.

use std::path::PathBuf;
use std::time::{Duration, SystemTime};

use serde::{Deserialize, Serialize};

use crate::aggregate::Aggregate;

/// Everything a scan hands to the report renderers besides the tier plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanSummary {
    /// Canonical root path that was scanned.
    pub root_path: PathBuf,

    /// Merged statistics for the whole tree.
    pub aggregate: Aggregate,

    /// Reference time all recency values were measured against.
    pub reference_time: SystemTime,

    /// Duration of the scan.
    pub scan_duration: Duration,

    /// Number of workers the scan ran with.
    pub workers: usize,

    /// Whether top-level subdirectories were walked in parallel.
    pub parallel: bool,
}

impl ScanSummary {
    /// Get the total size of the tree.
    pub fn total_bytes(&self) -> u64 {
        self.aggregate.total_bytes()
    }

    /// Get the total number of files.
    pub fn total_files(&self) -> u64 {
        self.aggregate.total_files()
    }

    /// Get the number of non-fatal errors.
    pub fn error_count(&self) -> u64 {
        self.aggregate.error_count()
    }

    /// Check if any errors were counted during the scan.
    pub fn has_errors(&self) -> bool {
        self.error_count() > 0
    }
}
