//! Core types for tierscope.
//!
//! This crate provides the data structures shared by the scanner and the
//! cost model: recency categories and the classifier, the mergeable
//! aggregate, scan configuration, and error types.

mod aggregate;
mod category;
mod config;
mod error;
mod record;
mod summary;

pub use aggregate::{Aggregate, CategoryTotals};
pub use category::{Category, classify};
pub use config::{ScanConfig, ScanConfigBuilder, default_system_prefixes};
pub use error::{ScanError, ScanPhase, WarningKind};
pub use record::{FileRecord, days_between, last_use_time};
pub use summary::ScanSummary;
