//! Selection solver scaling benchmark
//!
//! Measures the full decomposition (compression, alignment, two-phase solve)
//! on synthetic profiles as the number of samples grows, and the compression
//! step alone as the identifier universe grows.
//!
//! # Run Instructions
//!
//! ```bash
//! cargo bench --bench solver_scaling
//! ```

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use selector::compression::Compressor;
use selector::config::SelectorConfig;
use selector::histogram::{HistogramSet, ProfileKind, ProfileRecord};
use std::collections::BTreeMap;

/// Reference built as a known mixture of three samples plus noise samples
fn synthetic_records(samples: usize, identifiers: usize, seed: u64) -> Vec<ProfileRecord> {
    let mut rng = StdRng::seed_from_u64(seed);

    let profiles: Vec<BTreeMap<String, i64>> = (0..samples)
        .map(|_| {
            (0..identifiers)
                .filter(|_| rng.gen_bool(0.3))
                .map(|id| (format!("main;fn_{:04}", id), rng.gen_range(1..500)))
                .collect()
        })
        .collect();

    let mut reference: BTreeMap<String, i64> = BTreeMap::new();
    for (profile, weight) in profiles.iter().zip([5, 3, 2]) {
        for (id, count) in profile {
            *reference.entry(id.clone()).or_insert(0) += count * weight;
        }
    }
    reference.entry("main".to_string()).or_insert(1);

    let mut records = vec![ProfileRecord {
        kind: ProfileKind::Reference,
        source_path: "reference.histo".to_string(),
        histo: reference,
    }];
    records.extend(profiles.into_iter().enumerate().map(|(i, histo)| ProfileRecord {
        kind: ProfileKind::Sample,
        source_path: format!("sample_{:04}.histo", i),
        histo,
    }));
    records
}

fn bench_decompose(c: &mut Criterion) {
    let mut group = c.benchmark_group("decompose");
    group.sample_size(10);

    let config = SelectorConfig {
        time_limit_seconds: 10.0,
        threads_count: 1,
        ..SelectorConfig::default()
    };

    for samples in [8, 16, 32] {
        let records = synthetic_records(samples, 200, 42);
        group.bench_with_input(BenchmarkId::from_parameter(samples), &records, |b, records| {
            b.iter(|| selector::decompose(black_box(records), &config))
        });
    }

    group.finish();
}

fn bench_compression(c: &mut Criterion) {
    let mut group = c.benchmark_group("compression");

    for identifiers in [500, 2_000, 8_000] {
        let records = synthetic_records(16, identifiers, 7);
        let set = HistogramSet::from_records(&records).unwrap();
        let compressor = Compressor::new(97.0, true);
        group.bench_with_input(BenchmarkId::from_parameter(identifiers), &set, |b, set| {
            b.iter(|| compressor.compress(black_box(set)))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_decompose, bench_compression);
criterion_main!(benches);
