//! Recency categories and the file classifier.
//!
//! Every file lands in exactly one [`Category`] based on the whole number of
//! days since it was last used. The bucket bounds are an ordered table, so
//! the set is exhaustive and exclusive by construction.

use serde::{Deserialize, Serialize};
use strum::{EnumCount, EnumIter, IntoEnumIterator};

/// A recency bucket, ordered from most to least recently used.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    EnumIter,
    EnumCount,
)]
pub enum Category {
    #[serde(rename = "0-7_days")]
    Days0To7,
    #[serde(rename = "8-14_days")]
    Days8To14,
    #[serde(rename = "15-30_days")]
    Days15To30,
    #[serde(rename = "31-60_days")]
    Days31To60,
    #[serde(rename = "61-90_days")]
    Days61To90,
    #[serde(rename = "91-365_days")]
    Days91To365,
    #[serde(rename = "1-2_years")]
    Days366To730,
    #[serde(rename = "2+_years")]
    Over730Days,
}

impl Category {
    /// Inclusive upper bound in whole days, `None` for the open-ended bucket.
    pub const fn max_days(self) -> Option<u64> {
        match self {
            Category::Days0To7 => Some(7),
            Category::Days8To14 => Some(14),
            Category::Days15To30 => Some(30),
            Category::Days31To60 => Some(60),
            Category::Days61To90 => Some(90),
            Category::Days91To365 => Some(365),
            Category::Days366To730 => Some(730),
            Category::Over730Days => None,
        }
    }

    /// Position of this category in the ordered table.
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Human-readable label.
    pub const fn label(self) -> &'static str {
        match self {
            Category::Days0To7 => "0-7 days",
            Category::Days8To14 => "8-14 days",
            Category::Days15To30 => "15-30 days",
            Category::Days31To60 => "31-60 days",
            Category::Days61To90 => "61-90 days",
            Category::Days91To365 => "91-365 days",
            Category::Days366To730 => "1-2 years",
            Category::Over730Days => "2+ years",
        }
    }

    /// Iterate all categories, most recent first.
    pub fn all() -> impl Iterator<Item = Category> {
        Category::iter()
    }

    /// Map days since last use onto a category.
    ///
    /// Negative and NaN inputs (timestamps in the future, clock skew) are
    /// clamped to zero. Fractional days are truncated, so a file used 7.9
    /// days ago is still in `0-7`.
    pub fn classify_days(last_use_days: f64) -> Category {
        let whole = if last_use_days.is_nan() || last_use_days < 0.0 {
            0.0
        } else {
            last_use_days.floor()
        };

        Category::iter()
            .find(|c| c.max_days().is_none_or(|max| whole <= max as f64))
            .unwrap_or(Category::Over730Days)
    }

    /// The bounded category whose last day is exactly `days`.
    pub fn ending_at(days: u64) -> Option<Category> {
        Category::iter().find(|c| c.max_days() == Some(days))
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Classify a file, returning its category and the bytes it contributes.
pub fn classify(size: u64, last_use_days: f64) -> (Category, u64) {
    (Category::classify_days(last_use_days), size)
}
