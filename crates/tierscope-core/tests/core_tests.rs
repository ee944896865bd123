use proptest::prelude::*;
use tierscope_core::{Aggregate, Category, ScanConfig, classify};

fn arb_aggregate() -> impl Strategy<Value = Aggregate> {
    (
        prop::collection::vec((0u64..10_000_000_000, -5.0f64..2_000.0), 0..20),
        0u64..5,
    )
        .prop_map(|(files, errors)| {
            let mut agg = Aggregate::new();
            for (size, days) in files {
                agg.record_file(size, days);
            }
            for _ in 0..errors {
                agg.record_error();
            }
            agg
        })
}

proptest! {
    #[test]
    fn classify_picks_exactly_one_bucket(days in 0.0f64..100_000.0) {
        let (category, _) = classify(1, days);
        let matching: Vec<Category> = Category::all()
            .filter(|c| {
                let whole = days.floor();
                let lower = Category::all()
                    .take_while(|p| p < c)
                    .last()
                    .and_then(|p| p.max_days())
                    .map_or(0.0, |m| m as f64 + 1.0);
                let upper = c.max_days().map_or(f64::INFINITY, |m| m as f64);
                whole >= lower && whole <= upper
            })
            .collect();
        prop_assert_eq!(matching, vec![category]);
    }

    #[test]
    fn classify_is_monotonic(a in 0.0f64..5_000.0, b in 0.0f64..5_000.0) {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(Category::classify_days(lo) <= Category::classify_days(hi));
    }

    #[test]
    fn merge_is_commutative(a in arb_aggregate(), b in arb_aggregate()) {
        prop_assert_eq!(a.clone().merge(b.clone()), b.merge(a));
    }

    #[test]
    fn merge_is_associative(a in arb_aggregate(), b in arb_aggregate(), c in arb_aggregate()) {
        let left = a.clone().merge(b.clone()).merge(c.clone());
        let right = a.merge(b.merge(c));
        prop_assert_eq!(left, right);
    }

    #[test]
    fn merge_keeps_invariants(a in arb_aggregate(), b in arb_aggregate()) {
        let merged = a.clone() + b.clone();
        let bytes: u64 = merged.iter().map(|(_, t)| t.bytes).sum();
        let files: u64 = merged.iter().map(|(_, t)| t.files).sum();
        prop_assert_eq!(bytes, merged.total_bytes());
        prop_assert_eq!(files, merged.total_files());
        prop_assert_eq!(merged.error_count(), a.error_count() + b.error_count());
    }

    #[test]
    fn empty_is_identity(a in arb_aggregate()) {
        prop_assert_eq!(a.clone().merge(Aggregate::default()), a);
    }
}

#[test]
fn test_sum_matches_fold() {
    let parts: Vec<Aggregate> = (0..5)
        .map(|i| {
            let mut agg = Aggregate::new();
            agg.record_file(i * 100, i as f64 * 50.0);
            agg
        })
        .collect();

    let summed: Aggregate = parts.iter().cloned().sum();
    let folded = parts.into_iter().rev().fold(Aggregate::new(), |acc, a| acc + a);
    assert_eq!(summed, folded);
    assert_eq!(summed.total_files(), 5);
    assert_eq!(summed.total_bytes(), 1_000);
}

#[test]
fn test_scenario_buckets() {
    let mut agg = Aggregate::new();
    agg.record_file(100, 1.0);
    agg.record_file(2_000_000, 40.0);
    agg.record_file(5_000_000_000, 800.0);

    assert_eq!(agg.total_files(), 3);
    assert_eq!(agg.total_bytes(), 5_002_000_100);
    assert_eq!(agg.bytes_in(Category::Days0To7), 100);
    assert_eq!(agg.bytes_in(Category::Days31To60), 2_000_000);
    assert_eq!(agg.bytes_in(Category::Over730Days), 5_000_000_000);
}

#[test]
fn test_config_roundtrips_through_json() {
    let config = ScanConfig::builder()
        .root("/srv/share")
        .exclude(vec!["node_modules".to_string()])
        .max_depth(5u32)
        .build()
        .unwrap();

    let json = serde_json::to_string(&config).unwrap();
    let back: ScanConfig = serde_json::from_str(&json).unwrap();
    assert_eq!(back.root, config.root);
    assert_eq!(back.exclude, config.exclude);
    assert_eq!(back.max_depth, Some(5));
    assert_eq!(back.reference_time, config.reference_time);
}
