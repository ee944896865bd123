//! Per-file recency record derived from metadata.

use std::fs::Metadata;
use std::time::SystemTime;

use crate::category::Category;

const SECS_PER_DAY: f64 = 86_400.0;

/// Size and recency of a single file at scan time. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FileRecord {
    /// Size in bytes.
    pub size: u64,
    /// Days between the reference time and the last use. Negative when the
    /// file's timestamps lie in the future.
    pub last_use_days: f64,
}

impl FileRecord {
    /// Create a record from raw values.
    pub fn new(size: u64, last_use_days: f64) -> Self {
        Self {
            size,
            last_use_days,
        }
    }

    /// Build a record from file metadata against a fixed reference time.
    ///
    /// Last use is the later of access and modify time, since many
    /// filesystems are mounted with `noatime` or `relatime`.
    pub fn from_metadata(metadata: &Metadata, reference: SystemTime) -> Self {
        let last_use = last_use_time(metadata.accessed().ok(), metadata.modified().ok());
        Self {
            size: metadata.len(),
            last_use_days: last_use.map_or(0.0, |t| days_between(reference, t)),
        }
    }

    /// Recency category of this record.
    pub fn category(&self) -> Category {
        Category::classify_days(self.last_use_days)
    }
}

/// The later of the two timestamps, whichever are available.
pub fn last_use_time(
    accessed: Option<SystemTime>,
    modified: Option<SystemTime>,
) -> Option<SystemTime> {
    match (accessed, modified) {
        (Some(a), Some(m)) => Some(a.max(m)),
        (a, m) => a.or(m),
    }
}

/// Signed number of days from `then` to `reference`.
pub fn days_between(reference: SystemTime, then: SystemTime) -> f64 {
    match reference.duration_since(then) {
        Ok(elapsed) => elapsed.as_secs_f64() / SECS_PER_DAY,
        Err(ahead) => -(ahead.duration().as_secs_f64() / SECS_PER_DAY),
    }
}
