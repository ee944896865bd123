//! Traversal and aggregation engine for tierscope.
//!
//! This crate walks a directory tree and folds every regular file into a
//! per-category [`Aggregate`]. Key features:
//!
//! - **Parallel fan-out**: one walker per top-level subdirectory on a
//!   bounded rayon pool, merged with an associative, commutative reduce
//! - **Partial failure**: unreadable entries and directories are counted,
//!   never fatal
//! - **Loop safety**: canonical-path visited sets guard symlink cycles
//! - **Depth limit**: a hard cutoff, nothing beyond it is listed
//! - **Progress updates** via broadcast channels
//!
//! # Example
//!
//! ```rust,no_run
//! use tierscope_scan::{ScanConfig, TierScanner};
//!
//! let config = ScanConfig::new("/mnt/efs");
//! let scanner = TierScanner::new();
//! let summary = scanner.scan(&config).unwrap();
//!
//! println!("Total size: {} bytes", summary.total_bytes());
//! println!("Errors: {}", summary.error_count());
//! ```
//!
//! # Progress Monitoring
//!
//! ```rust,no_run
//! use tierscope_scan::TierScanner;
//!
//! let scanner = TierScanner::new();
//! let mut progress_rx = scanner.subscribe();
//!
//! std::thread::spawn(move || {
//!     while let Ok(progress) = progress_rx.blocking_recv() {
//!         eprintln!("Scanned {} files", progress.files_scanned);
//!     }
//! });
//! ```

mod context;
mod estimate;
mod filter;
mod progress;
mod scanner;
mod visited;
mod walker;

pub use context::ScanContext;
pub use estimate::{DEFAULT_ESTIMATE_LIMIT, FileEstimate, estimate_file_count};
pub use filter::{DirVerdict, PathFilter};
pub use progress::ScanProgress;
pub use scanner::TierScanner;
pub use visited::VisitedSet;
pub use walker::{Candidate, Walker};

// Re-export core types for convenience
pub use tierscope_core::{
    Aggregate, Category, CategoryTotals, ScanConfig, ScanConfigBuilder, ScanError, ScanPhase,
    ScanSummary, WarningKind,
};
