//! Recommendations and report rendering.

use std::fmt::{self, Write as _};

use chrono::{DateTime, Local};
use humansize::{BINARY, format_size};
use serde::{Deserialize, Serialize};

use tierscope_core::{Aggregate, Category, ScanSummary};

use crate::cost::{CostModel, TierPlan};

const RULE_WIDTH: usize = 80;

/// Savings above this percentage are significant.
const SIGNIFICANT_SAVINGS_PERCENT: f64 = 20.0;
/// Savings above this percentage are moderate.
const MODERATE_SAVINGS_PERCENT: f64 = 5.0;
/// Share of bytes untouched for two years that suggests archiving.
const ARCHIVE_SHARE: f64 = 0.30;

/// Advice derived from a tier plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recommendation {
    SignificantSavings,
    ModerateSavings,
    MinimalSavings,
    ConsiderArchiving,
}

impl Recommendation {
    pub fn headline(self) -> &'static str {
        match self {
            Self::SignificantSavings => {
                "SIGNIFICANT SAVINGS OPPORTUNITY: Consider implementing lifecycle policies"
            }
            Self::ModerateSavings => {
                "MODERATE SAVINGS OPPORTUNITY: Review your data access patterns and consider"
            }
            Self::MinimalSavings => {
                "MINIMAL SAVINGS OPPORTUNITY: Your current storage usage appears optimized."
            }
            Self::ConsiderArchiving => {
                "CONSIDER ARCHIVING: More than 30% of your data hasn't been accessed in over 2 years."
            }
        }
    }

    pub fn detail(self) -> Option<&'static str> {
        match self {
            Self::SignificantSavings => Some(
                "to automatically transition data between storage tiers based on access patterns.",
            ),
            Self::ModerateSavings => {
                Some("implementing lifecycle policies for less frequently accessed data.")
            }
            Self::MinimalSavings => None,
            Self::ConsiderArchiving => Some(
                "Consider moving this data to an archive tier or cold object storage for long-term retention.",
            ),
        }
    }
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.headline())?;
        if let Some(detail) = self.detail() {
            write!(f, "\n   {detail}")?;
        }
        Ok(())
    }
}

/// Recommendations for `plan`: exactly one savings verdict, optionally
/// followed by an archiving hint.
pub fn recommendations(aggregate: &Aggregate, plan: &TierPlan) -> Vec<Recommendation> {
    let verdict = if plan.savings_percent > SIGNIFICANT_SAVINGS_PERCENT {
        Recommendation::SignificantSavings
    } else if plan.savings_percent > MODERATE_SAVINGS_PERCENT {
        Recommendation::ModerateSavings
    } else {
        Recommendation::MinimalSavings
    };

    let mut out = vec![verdict];
    // `share` is 0 for an empty aggregate.
    if aggregate.share(Category::Over730Days) > ARCHIVE_SHARE {
        out.push(Recommendation::ConsiderArchiving);
    }
    out
}

/// Scan summary, tier plan and advice, as written by `--format json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub summary: ScanSummary,
    pub plan: TierPlan,
    pub recommendations: Vec<Recommendation>,
}

impl AnalysisReport {
    pub fn new(summary: ScanSummary, model: &CostModel) -> Self {
        let plan = model.evaluate(&summary.aggregate);
        let recommendations = recommendations(&summary.aggregate, &plan);
        Self {
            summary,
            plan,
            recommendations,
        }
    }

    pub fn render_text(&self) -> String {
        render_text(&self.summary, &self.plan)
    }
}

/// Render the plain-text report.
pub fn render_text(summary: &ScanSummary, plan: &TierPlan) -> String {
    let aggregate = &summary.aggregate;
    let mut out = String::new();

    // Writing into a String cannot fail.
    let _ = write_report(&mut out, summary, aggregate, plan);
    out
}

fn write_report(
    out: &mut String,
    summary: &ScanSummary,
    aggregate: &Aggregate,
    plan: &TierPlan,
) -> fmt::Result {
    let heavy = "=".repeat(RULE_WIDTH);
    let light = "-".repeat(RULE_WIDTH);
    let reference: DateTime<Local> = summary.reference_time.into();

    writeln!(out, "{heavy}")?;
    writeln!(out, "STORAGE TIER ANALYSIS REPORT")?;
    writeln!(out, "{heavy}")?;
    writeln!(out, "Root: {}", summary.root_path.display())?;
    writeln!(out, "Reference time: {}", reference.format("%Y-%m-%d %H:%M:%S %Z"))?;
    writeln!(
        out,
        "Scan duration: {:.2}s ({} worker{}{})",
        summary.scan_duration.as_secs_f64(),
        summary.workers,
        if summary.workers == 1 { "" } else { "s" },
        if summary.parallel { ", parallel" } else { "" }
    )?;
    writeln!(out)?;

    writeln!(out, "SUMMARY STATISTICS")?;
    writeln!(out, "{light}")?;
    writeln!(out, "Total files scanned: {}", group_thousands(aggregate.total_files()))?;
    writeln!(out, "Total storage size: {}", format_size(aggregate.total_bytes(), BINARY))?;
    writeln!(out, "Scan errors: {}", aggregate.error_count())?;
    writeln!(out)?;

    writeln!(out, "FILE ACCESS STATISTICS")?;
    writeln!(out, "{light}")?;
    for (category, totals) in aggregate.iter() {
        writeln!(
            out,
            "{:<12} {:>12} ({:>5.1}%)  {} files",
            category.label(),
            format_size(totals.bytes, BINARY),
            aggregate.share(category) * 100.0,
            group_thousands(totals.files)
        )?;
    }
    writeln!(out)?;

    writeln!(out, "COST ANALYSIS")?;
    writeln!(out, "{light}")?;
    writeln!(out, "Current monthly cost (all hot tier): ${:.2}", plan.current_cost)?;
    writeln!(out, "Optimized monthly cost: ${:.2}", plan.optimized_cost)?;
    writeln!(
        out,
        "Potential monthly savings: ${:.2} ({:.1}%)",
        plan.savings, plan.savings_percent
    )?;
    writeln!(out)?;

    writeln!(out, "RECOMMENDED TIER DISTRIBUTION")?;
    writeln!(out, "{light}")?;
    for allocation in &plan.tiers {
        writeln!(
            out,
            "{} tier: {:.2} GB (${:.2}/month)",
            allocation.tier, allocation.gigabytes, allocation.monthly_cost
        )?;
    }
    writeln!(out)?;

    writeln!(out, "RECOMMENDATIONS")?;
    writeln!(out, "{light}")?;
    for recommendation in recommendations(aggregate, plan) {
        writeln!(out, "* {recommendation}")?;
    }

    Ok(())
}

/// `1234567` -> `"1,234,567"`.
fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
