//! Storage-tier cost model.
//!
//! Maps each recency [`Category`] to a storage [`Tier`] and prices the
//! resulting distribution against a baseline where everything is hot.

use derive_builder::Builder;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumCount, EnumIter, IntoEnumIterator};
use thiserror::Error;
use tracing::debug;

use tierscope_core::{Aggregate, Category};

/// Bytes per billed gigabyte.
pub const BYTES_PER_GB: f64 = (1u64 << 30) as f64;

/// A storage cost class.
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
    Display,
    EnumIter,
    EnumCount,
)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Hot,
    Infrequent,
    Archive,
}

/// Errors from building a cost model.
#[derive(Debug, Error)]
pub enum CostError {
    #[error("Invalid {tier} rate: {rate} (must be a finite, non-negative price)")]
    InvalidRate { tier: Tier, rate: f64 },

    #[error("Invalid tier policy: {message}")]
    InvalidPolicy { message: String },
}

/// Monthly price per GB for each tier, in USD.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricingTable {
    pub hot: f64,
    pub infrequent: f64,
    pub archive: f64,
}

impl PricingTable {
    pub fn new(hot: f64, infrequent: f64, archive: f64) -> Result<Self, CostError> {
        let table = Self {
            hot,
            infrequent,
            archive,
        };
        table.validate()?;
        Ok(table)
    }

    pub fn rate(&self, tier: Tier) -> f64 {
        match tier {
            Tier::Hot => self.hot,
            Tier::Infrequent => self.infrequent,
            Tier::Archive => self.archive,
        }
    }

    /// Reject negative, infinite and NaN rates.
    pub fn validate(&self) -> Result<(), CostError> {
        for tier in Tier::iter() {
            let rate = self.rate(tier);
            if !rate.is_finite() || rate < 0.0 {
                return Err(CostError::InvalidRate { tier, rate });
            }
        }
        Ok(())
    }
}

impl Default for PricingTable {
    /// EFS list prices, US East.
    fn default() -> Self {
        Self {
            hot: 0.30,
            infrequent: 0.025,
            archive: 0.016,
        }
    }
}

/// Last category kept hot by default.
pub const DEFAULT_HOT_THROUGH: Category = Category::Days0To7;

/// Last category sent to the infrequent tier by default.
pub const DEFAULT_INFREQUENT_THROUGH: Category = Category::Days15To30;

/// Which categories go to which tier.
///
/// Categories up to and including `hot_through` stay hot, those up to
/// `infrequent_through` go to the infrequent tier, everything older is
/// archived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Builder, Serialize, Deserialize)]
#[builder(build_fn(validate = "Self::validate"))]
pub struct TierPolicy {
    #[builder(default = "DEFAULT_HOT_THROUGH")]
    pub hot_through: Category,

    #[builder(default = "DEFAULT_INFREQUENT_THROUGH")]
    pub infrequent_through: Category,
}

impl TierPolicyBuilder {
    fn validate(&self) -> Result<(), String> {
        let hot = self.hot_through.unwrap_or(DEFAULT_HOT_THROUGH);
        let infrequent = self.infrequent_through.unwrap_or(DEFAULT_INFREQUENT_THROUGH);
        if hot > infrequent {
            return Err(format!(
                "hot tier ({hot}) must not extend past the infrequent tier ({infrequent})"
            ));
        }
        Ok(())
    }
}

impl TierPolicy {
    pub fn builder() -> TierPolicyBuilder {
        TierPolicyBuilder::default()
    }

    pub fn new(hot_through: Category, infrequent_through: Category) -> Result<Self, CostError> {
        Self::builder()
            .hot_through(hot_through)
            .infrequent_through(infrequent_through)
            .build()
            .map_err(|e| CostError::InvalidPolicy {
                message: e.to_string(),
            })
    }

    /// The tier a category is assigned to.
    pub fn tier_for(&self, category: Category) -> Tier {
        if category <= self.hot_through {
            Tier::Hot
        } else if category <= self.infrequent_through {
            Tier::Infrequent
        } else {
            Tier::Archive
        }
    }

    /// Categories assigned to `tier`, most recent first.
    pub fn categories_in(&self, tier: Tier) -> impl Iterator<Item = Category> + '_ {
        Category::all().filter(move |c| self.tier_for(*c) == tier)
    }
}

impl Default for TierPolicy {
    fn default() -> Self {
        Self {
            hot_through: DEFAULT_HOT_THROUGH,
            infrequent_through: DEFAULT_INFREQUENT_THROUGH,
        }
    }
}

/// Bytes and cost placed in one tier.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TierAllocation {
    pub tier: Tier,
    pub bytes: u64,
    pub gigabytes: f64,
    /// USD per GB-month.
    pub rate: f64,
    /// USD per month.
    pub monthly_cost: f64,
}

/// Priced tier distribution for one aggregate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierPlan {
    pub total_gb: f64,
    /// Monthly cost with every byte in the hot tier.
    pub current_cost: f64,
    /// Monthly cost with every byte in its assigned tier.
    pub optimized_cost: f64,
    pub savings: f64,
    /// Savings as a percentage of `current_cost`, 0 when that is 0.
    pub savings_percent: f64,
    /// One entry per tier, hot first.
    pub tiers: Vec<TierAllocation>,
}

impl TierPlan {
    pub fn allocation(&self, tier: Tier) -> Option<&TierAllocation> {
        self.tiers.iter().find(|a| a.tier == tier)
    }
}

/// Prices aggregates with a fixed pricing table and tier policy.
#[derive(Debug, Clone, Default)]
pub struct CostModel {
    pricing: PricingTable,
    policy: TierPolicy,
}

impl CostModel {
    pub fn new(pricing: PricingTable, policy: TierPolicy) -> Result<Self, CostError> {
        pricing.validate()?;
        Ok(Self { pricing, policy })
    }

    pub fn pricing(&self) -> &PricingTable {
        &self.pricing
    }

    pub fn policy(&self) -> &TierPolicy {
        &self.policy
    }

    pub fn evaluate(&self, aggregate: &Aggregate) -> TierPlan {
        evaluate(aggregate, &self.pricing, &self.policy)
    }
}

/// Price `aggregate` under `pricing`, placing categories by `policy`.
pub fn evaluate(aggregate: &Aggregate, pricing: &PricingTable, policy: &TierPolicy) -> TierPlan {
    let tiers: Vec<TierAllocation> = Tier::iter()
        .map(|tier| {
            let bytes: u64 = policy
                .categories_in(tier)
                .map(|c| aggregate.bytes_in(c))
                .sum();
            let gigabytes = bytes as f64 / BYTES_PER_GB;
            let rate = pricing.rate(tier);
            TierAllocation {
                tier,
                bytes,
                gigabytes,
                rate,
                monthly_cost: gigabytes * rate,
            }
        })
        .collect();

    let total_gb = aggregate.total_bytes() as f64 / BYTES_PER_GB;
    let current_cost = total_gb * pricing.hot;
    let optimized_cost: f64 = tiers.iter().map(|a| a.monthly_cost).sum();
    let savings = current_cost - optimized_cost;
    let savings_percent = if current_cost > 0.0 {
        savings / current_cost * 100.0
    } else {
        0.0
    };

    debug!(
        total_gb,
        current_cost, optimized_cost, savings_percent, "evaluated tier plan"
    );

    TierPlan {
        total_gb,
        current_cost,
        optimized_cost,
        savings,
        savings_percent,
        tiers,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy_boundaries() {
        let policy = TierPolicy::default();
        assert_eq!(policy.tier_for(Category::Days0To7), Tier::Hot);
        assert_eq!(policy.tier_for(Category::Days8To14), Tier::Infrequent);
        assert_eq!(policy.tier_for(Category::Days15To30), Tier::Infrequent);
        assert_eq!(policy.tier_for(Category::Days31To60), Tier::Archive);
        assert_eq!(policy.tier_for(Category::Over730Days), Tier::Archive);
        assert_eq!(policy.categories_in(Tier::Archive).count(), 5);
    }

    #[test]
    fn test_policy_builder_rejects_inverted_bounds() {
        assert!(TierPolicy::builder()
            .hot_through(Category::Days61To90)
            .infrequent_through(Category::Days15To30)
            .build()
            .is_err());
        assert!(TierPolicy::new(Category::Days15To30, Category::Days15To30).is_ok());
        assert_eq!(TierPolicy::builder().build().unwrap(), TierPolicy::default());
    }

    #[test]
    fn test_partial_builder_validates_against_defaults() {
        let policy = TierPolicy::builder()
            .infrequent_through(Category::Days0To7)
            .build()
            .unwrap();
        assert_eq!(policy.hot_through, DEFAULT_HOT_THROUGH);
        assert_eq!(policy.tier_for(Category::Days8To14), Tier::Archive);

        // Only the hot bound set: checked against the default infrequent bound.
        assert!(TierPolicy::builder()
            .hot_through(Category::Days31To60)
            .build()
            .is_err());
        let policy = TierPolicy::builder()
            .hot_through(DEFAULT_INFREQUENT_THROUGH)
            .build()
            .unwrap();
        assert_eq!(policy.categories_in(Tier::Infrequent).count(), 0);
    }

    #[test]
    fn test_pricing_validation() {
        assert!(PricingTable::new(0.30, 0.025, 0.016).is_ok());
        assert!(matches!(
            PricingTable::new(0.30, -1.0, 0.016),
            Err(CostError::InvalidRate { tier: Tier::Infrequent, .. })
        ));
        assert!(PricingTable::new(f64::NAN, 0.0, 0.0).is_err());
    }

    #[test]
    fn test_empty_aggregate_costs_nothing() {
        let plan = evaluate(
            &Aggregate::new(),
            &PricingTable::default(),
            &TierPolicy::default(),
        );
        assert_eq!(plan.current_cost, 0.0);
        assert_eq!(plan.optimized_cost, 0.0);
        assert_eq!(plan.savings_percent, 0.0);
        assert_eq!(plan.tiers.len(), Tier::COUNT);
    }

    #[test]
    fn test_all_hot_saves_nothing() {
        let mut aggregate = Aggregate::new();
        aggregate.record_file(1 << 30, 0.0);
        let plan = CostModel::default().evaluate(&aggregate);

        assert!((plan.current_cost - 0.30).abs() < 1e-12);
        assert!(plan.savings.abs() < 1e-12);
        assert_eq!(plan.allocation(Tier::Hot).unwrap().bytes, 1 << 30);
    }

    #[test]
    fn test_tier_display() {
        assert_eq!(Tier::Infrequent.to_string(), "Infrequent");
    }
}
