//! End-to-end decomposition scenarios through `selector::decompose`

mod utils;

use selector::config::SelectorConfig;
use selector::histogram::ProfileRecord;
use selector::{decompose, SelectorError};

fn config(max_selected_samples: usize, min_similarity: f64) -> SelectorConfig {
    SelectorConfig {
        hotness_compression: 100.0,
        max_selected_samples,
        min_similarity,
        time_limit_seconds: 30.0,
        threads_count: 1,
        ..SelectorConfig::default()
    }
}

#[test]
fn test_identical_sample_gets_full_weight() {
    let records = vec![
        ProfileRecord::reference("prod", &[("x", 3), ("y", 9), ("z", 1)]),
        ProfileRecord::sample("a", &[("x", 1), ("y", 1)]),
        ProfileRecord::sample("b", &[("x", 6), ("y", 18), ("z", 2)]),
        ProfileRecord::sample("c", &[("z", 4)]),
    ];
    let result = decompose(&records, &config(5, 95.0)).unwrap();

    assert_eq!(result.record.similarity, 100.0);
    assert_eq!(result.record.selected_samples.len(), 1);
    assert_eq!(result.record.selected_samples[0].sample_path, "b");
    assert_eq!(result.record.selected_samples[0].weight, 1.0);
    assert!(result.record.threshold_met);
    assert!(result.record.is_optimal);
}

#[test]
fn test_two_way_mixture() {
    let result = decompose(&utils::two_way_mixture(), &config(5, 95.0)).unwrap();

    let paths: Vec<&str> = result
        .record
        .selected_samples
        .iter()
        .map(|s| s.sample_path.as_str())
        .collect();
    assert_eq!(paths, vec!["left.histo", "right.histo"]);
    assert_eq!(result.record.selected_samples[0].weight, 0.5);
    assert_eq!(result.record.selected_samples[1].weight, 0.5);
    assert_eq!(result.record.similarity, 100.0);
}

/// Scenario: K is large and the threshold trivial
/// Expected: first phase succeeds, no relaxation
#[test]
fn test_low_threshold_succeeds_without_relaxation() {
    let result = decompose(&utils::two_way_mixture(), &config(10, 1.0)).unwrap();
    assert!(!result.record.relaxed);
    assert!(result.record.threshold_met);
    assert!((result.record.weight_sum() - 1.0).abs() < 1e-9);
}

/// Scenario: the mixture needs two samples, only one allowed
/// Expected: relaxed result below the threshold, still a success
#[test]
fn test_unreachable_threshold_reports_best_effort() {
    let result = decompose(&utils::two_way_mixture(), &config(1, 95.0)).unwrap();

    assert!(result.record.relaxed);
    assert!(!result.record.threshold_met);
    assert!(result.record.similarity < 95.0);
    assert_eq!(result.record.selected_samples.len(), 1);
    assert_eq!(result.record.selected_samples[0].weight, 1.0);
}

#[test]
fn test_cardinality_never_exceeded() {
    let records = vec![
        ProfileRecord::reference("prod", &[("a", 1), ("b", 1), ("c", 1), ("d", 1), ("e", 1)]),
        ProfileRecord::sample("s1", &[("a", 1)]),
        ProfileRecord::sample("s2", &[("b", 1)]),
        ProfileRecord::sample("s3", &[("c", 1)]),
        ProfileRecord::sample("s4", &[("d", 1)]),
        ProfileRecord::sample("s5", &[("e", 1)]),
    ];
    for k in 1..=5 {
        let result = decompose(&records, &config(k, 99.0)).unwrap();
        assert!(result.record.selected_samples.len() <= k);
        assert!((result.record.weight_sum() - 1.0).abs() < 1e-9);
        // Each selected sample covers exactly one fifth of the reference
        assert!((result.record.similarity - 20.0 * k as f64).abs() < 0.01);
    }
}

#[test]
fn test_hotness_drops_cold_sample() {
    let records = vec![
        ProfileRecord::reference("prod", &[("hot", 990), ("cold", 10)]),
        ProfileRecord::sample("hot_test", &[("hot", 50)]),
        ProfileRecord::sample("cold_test", &[("cold", 1), ("hot", 1)]),
    ];
    let config = SelectorConfig {
        hotness_compression: 50.0,
        ..config(5, 95.0)
    };
    let result = decompose(&records, &config).unwrap();

    assert_eq!(result.compression.after_hotness, 1);
    assert_eq!(result.record.selected_samples[0].sample_path, "cold_test");
    assert_eq!(result.record.similarity, 100.0);
}

#[test]
fn test_input_errors() {
    let missing_reference = vec![ProfileRecord::sample("s", &[("a", 1)])];
    assert_eq!(
        decompose(&missing_reference, &config(5, 95.0)).unwrap_err(),
        SelectorError::MissingReference
    );

    let negative = vec![
        ProfileRecord::reference("r", &[("a", 1)]),
        ProfileRecord::sample("s", &[("a", -4)]),
    ];
    assert!(matches!(
        decompose(&negative, &config(5, 95.0)).unwrap_err(),
        SelectorError::NegativeCount { count: -4, .. }
    ));

    let zero_hotness = SelectorConfig {
        hotness_compression: 0.0,
        ..config(5, 95.0)
    };
    let err = decompose(&utils::two_way_mixture(), &zero_hotness).unwrap_err();
    assert!(err.is_input_error());
}

#[test]
fn test_counts_near_integer_limit() {
    let max = i64::MAX;
    let records = vec![
        ProfileRecord::reference("prod", &[("a", max), ("b", max), ("c", max)]),
        ProfileRecord::sample("huge", &[("a", max), ("b", max), ("c", max)]),
        ProfileRecord::sample("small", &[("d", 1)]),
    ];
    let result = decompose(&records, &SelectorConfig::default()).unwrap();

    assert_eq!(result.compression.blocks_formed, 0);
    assert_eq!(result.record.selected_samples.len(), 1);
    assert_eq!(result.record.selected_samples[0].sample_path, "huge");
    assert_eq!(result.record.similarity, 100.0);
}

#[test]
fn test_deterministic_across_runs() {
    let first = decompose(&utils::two_way_mixture(), &config(2, 99.0)).unwrap();
    let second = decompose(&utils::two_way_mixture(), &config(2, 99.0)).unwrap();
    assert_eq!(first.record, second.record);
}
