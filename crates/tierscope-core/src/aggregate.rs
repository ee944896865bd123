//! Mergeable per-category accumulator.

use std::iter::Sum;
use std::ops::{Add, AddAssign};

use serde::{Deserialize, Serialize};
use strum::EnumCount;

use crate::category::Category;
use crate::record::FileRecord;

/// Byte and file totals for one category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryTotals {
    /// Total bytes of files in this category.
    pub bytes: u64,
    /// Number of files in this category.
    pub files: u64,
}

impl AddAssign for CategoryTotals {
    fn add_assign(&mut self, rhs: Self) {
        self.bytes += rhs.bytes;
        self.files += rhs.files;
    }
}

/// Accumulated statistics for one traversal unit.
///
/// Each aggregate is owned by exactly one walker while it is being filled,
/// then merged by addition. Merging is associative and commutative with
/// [`Aggregate::default`] as identity, so partial results from workers can
/// be combined in any order.
///
/// The totals are only reachable through methods that keep
/// `total_bytes == Σ category bytes` and `total_files == Σ category files`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Aggregate {
    #[serde(with = "category_map")]
    categories: [CategoryTotals; Category::COUNT],
    total_bytes: u64,
    total_files: u64,
    error_count: u64,
}

impl Aggregate {
    /// Create an empty aggregate.
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty aggregate carrying a single error, used for failed units.
    pub fn failed() -> Self {
        Self {
            error_count: 1,
            ..Self::default()
        }
    }

    /// Fold a file into its category. Returns the category it landed in.
    pub fn record_file(&mut self, size: u64, last_use_days: f64) -> Category {
        let category = Category::classify_days(last_use_days);
        let slot = &mut self.categories[category.index()];
        slot.bytes += size;
        slot.files += 1;
        self.total_bytes += size;
        self.total_files += 1;
        category
    }

    /// Fold a [`FileRecord`] into its category.
    pub fn record(&mut self, record: FileRecord) -> Category {
        self.record_file(record.size, record.last_use_days)
    }

    /// Count one non-fatal error.
    pub fn record_error(&mut self) {
        self.error_count += 1;
    }

    /// Merge two aggregates.
    pub fn merge(mut self, other: Aggregate) -> Aggregate {
        self += other;
        self
    }

    /// Totals for a category.
    pub fn totals(&self, category: Category) -> CategoryTotals {
        self.categories[category.index()]
    }

    /// Bytes in a category.
    pub fn bytes_in(&self, category: Category) -> u64 {
        self.totals(category).bytes
    }

    /// Files in a category.
    pub fn files_in(&self, category: Category) -> u64 {
        self.totals(category).files
    }

    /// Fraction of all bytes that fall in `category` (0 when empty).
    pub fn share(&self, category: Category) -> f64 {
        if self.total_bytes == 0 {
            0.0
        } else {
            self.bytes_in(category) as f64 / self.total_bytes as f64
        }
    }

    /// Iterate categories with their totals, most recent first.
    pub fn iter(&self) -> impl Iterator<Item = (Category, CategoryTotals)> + '_ {
        Category::all().map(|c| (c, self.categories[c.index()]))
    }

    pub fn total_bytes(&self) -> u64 {
        self.total_bytes
    }

    pub fn total_files(&self) -> u64 {
        self.total_files
    }

    pub fn error_count(&self) -> u64 {
        self.error_count
    }

    /// True when no file and no error has been recorded.
    pub fn is_empty(&self) -> bool {
        self.total_files == 0 && self.error_count == 0
    }
}

impl AddAssign for Aggregate {
    fn add_assign(&mut self, rhs: Self) {
        for (slot, other) in self.categories.iter_mut().zip(rhs.categories) {
            *slot += other;
        }
        self.total_bytes += rhs.total_bytes;
        self.total_files += rhs.total_files;
        self.error_count += rhs.error_count;
    }
}

impl Add for Aggregate {
    type Output = Aggregate;

    fn add(self, rhs: Self) -> Self::Output {
        self.merge(rhs)
    }
}

impl Sum for Aggregate {
    fn sum<I: Iterator<Item = Aggregate>>(iter: I) -> Self {
        iter.fold(Aggregate::default(), Aggregate::merge)
    }
}

/// Serializes the category array as a map keyed by category.
mod category_map {
    use std::collections::BTreeMap;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use strum::EnumCount;

    use super::CategoryTotals;
    use crate::category::Category;

    pub fn serialize<S: Serializer>(
        categories: &[CategoryTotals; Category::COUNT],
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let map: BTreeMap<Category, CategoryTotals> = Category::all()
            .map(|c| (c, categories[c.index()]))
            .collect();
        map.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<[CategoryTotals; Category::COUNT], D::Error> {
        let map = BTreeMap::<Category, CategoryTotals>::deserialize(deserializer)?;
        let mut categories = [CategoryTotals::default(); Category::COUNT];
        for (category, totals) in map {
            categories[category.index()] = totals;
        }
        Ok(categories)
    }
}
