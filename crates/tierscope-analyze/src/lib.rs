//! Cost analysis for tierscope.
//!
//! Turns a scan's per-category [`Aggregate`] into a priced tier plan:
//!
//! - **Tier policy** - which recency categories stay hot, go to the
//!   infrequent tier or get archived
//! - **Cost model** - current (all hot) versus optimized monthly cost
//! - **Reports** - recommendations and a plain-text report
//!
//! ```rust,no_run
//! use tierscope_analyze::{AnalysisReport, CostModel};
//! use tierscope_scan::{ScanConfig, TierScanner};
//!
//! let summary = TierScanner::new().scan(&ScanConfig::new("/mnt/efs")).unwrap();
//! let report = AnalysisReport::new(summary, &CostModel::default());
//!
//! println!("Savings: ${:.2}/month", report.plan.savings);
//! print!("{}", report.render_text());
//! ```

pub mod cost;
mod report;

pub use cost::{
    BYTES_PER_GB, CostError, CostModel, DEFAULT_HOT_THROUGH, DEFAULT_INFREQUENT_THROUGH,
    PricingTable, Tier, TierAllocation, TierPlan, TierPolicy, TierPolicyBuilder, evaluate,
};
pub use report::{AnalysisReport, Recommendation, recommendations, render_text};

// Re-export core types
pub use tierscope_core::{Aggregate, Category, ScanSummary};
