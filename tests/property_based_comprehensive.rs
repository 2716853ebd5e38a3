//! Property-based tests for the decomposition pipeline
//!
//! Core properties:
//! 1. Reported weights sum to one and never exceed K entries
//! 2. Block compression is exactly reversible
//! 3. Hotness at 100% keeps the universe
//! 4. Similarity stays in [0, 100] and falls as deviation grows
//! 5. Record parsing never panics

use proptest::prelude::*;
use selector::compression::{merge_blocks, retain_hottest, Compressor};
use selector::config::SelectorConfig;
use selector::histogram::{parse_records, HistogramSet, ProfileRecord};
use selector::similarity::similarity;
use std::collections::BTreeMap;

fn histo_strategy() -> impl Strategy<Value = BTreeMap<String, i64>> {
    prop::collection::btree_map("[a-f]", 1i64..20, 1..5)
}

fn records_strategy() -> impl Strategy<Value = Vec<ProfileRecord>> {
    (
        histo_strategy(),
        prop::collection::vec(histo_strategy(), 1..5),
    )
        .prop_map(|(reference, samples)| {
            let mut records = vec![ProfileRecord {
                kind: selector::histogram::ProfileKind::Reference,
                source_path: "reference".to_string(),
                histo: reference,
            }];
            records.extend(samples.into_iter().enumerate().map(|(i, histo)| ProfileRecord {
                kind: selector::histogram::ProfileKind::Sample,
                source_path: format!("sample_{:02}", i),
                histo,
            }));
            records
        })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn prop_weights_sum_to_one_within_cardinality(
        records in records_strategy(),
        k in 1usize..4,
        min_similarity in 0.0f64..100.0,
    ) {
        let config = SelectorConfig {
            hotness_compression: 100.0,
            max_selected_samples: k,
            min_similarity,
            time_limit_seconds: 10.0,
            threads_count: 1,
            ..SelectorConfig::default()
        };
        let result = selector::decompose(&records, &config).unwrap();
        let record = result.record;

        prop_assert!(!record.selected_samples.is_empty());
        prop_assert!(record.selected_samples.len() <= k);
        prop_assert!((record.weight_sum() - 1.0).abs() < 1e-9);
        prop_assert!(record.selected_samples.iter().all(|s| s.weight > 0.0 && s.weight <= 1.0));
        prop_assert!((0.0..=100.0).contains(&record.similarity));
        if record.threshold_met {
            prop_assert!(record.similarity + 0.01 >= min_similarity);
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn prop_block_merge_round_trip(records in records_strategy()) {
        let set = HistogramSet::from_records(&records).unwrap();
        let (compressed, blocks) = merge_blocks(&set);

        prop_assert_eq!(blocks.expand(&compressed.reference), set.reference.clone());
        for (merged, original) in compressed.samples.iter().zip(&set.samples) {
            prop_assert_eq!(&blocks.expand(merged), original);
        }
    }

    #[test]
    fn prop_compression_keeps_identifier_sets_aligned(
        records in records_strategy(),
        hotness in 1.0f64..=100.0,
    ) {
        let set = HistogramSet::from_records(&records).unwrap();
        let compressed = Compressor::new(hotness, true).compress(&set).unwrap();
        let universe = compressed.set.universe();

        prop_assert!(universe.len() <= set.universe().len());
        prop_assert_eq!(universe.len(), compressed.stats.after_blocks);
        for histogram in compressed.set.iter() {
            prop_assert!(histogram.counts.keys().all(|id| universe.contains(id)));
        }
    }

    #[test]
    fn prop_full_hotness_keeps_universe(records in records_strategy()) {
        let set = HistogramSet::from_records(&records).unwrap();
        let retained: Vec<String> = retain_hottest(&set, 100.0).into_iter().collect();
        prop_assert_eq!(retained, set.universe());
    }

    #[test]
    fn prop_similarity_bounded(
        target in prop::collection::vec(0.0f64..100.0, 1..8),
        scale in 0.0f64..3.0,
    ) {
        let combination: Vec<f64> = target.iter().rev().map(|v| v * scale).collect();
        let s = similarity(&target, &combination);
        prop_assert!((0.0..=100.0).contains(&s));
    }

    #[test]
    fn prop_similarity_monotone_in_deviation(
        target in prop::collection::vec(1.0f64..100.0, 1..8),
        index in 0usize..8,
        steps in prop::collection::vec(0.0f64..20.0, 1..10),
    ) {
        let index = index % target.len();
        let mut combination = target.clone();
        let mut previous = similarity(&target, &combination);
        prop_assert_eq!(previous, 100.0);

        for step in steps {
            combination[index] += step;
            let current = similarity(&target, &combination);
            prop_assert!(current <= previous + 1e-12);
            previous = current;
        }
    }

    #[test]
    fn prop_parse_records_never_panics(input in ".{0,200}") {
        let _ = parse_records(&input);
    }
}
