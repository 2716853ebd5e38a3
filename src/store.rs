//! Aligned histogram vectors over the compressed identifier universe
//!
//! The store owns every vector used in a run. Each histogram is re-expressed
//! as a dense vector in one fixed identifier order and normalized to sum to
//! 100, so a convex combination of samples is directly comparable with the
//! target.

use crate::error::{Result, SelectorError};
use crate::histogram::{Histogram, HistogramSet};
use fnv::FnvHashMap;

/// Total mass of every normalized, non-empty vector
pub const NORMALIZED_MASS: f64 = 100.0;

/// A sample profile aligned to the store's universe
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedSample {
    pub source_path: String,
    pub vector: Vec<f64>,
}

/// Owner of the identifier universe and all aligned vectors of a run
#[derive(Debug, Clone, PartialEq)]
pub struct HistogramStore {
    reference_path: String,
    universe: Vec<String>,
    index: FnvHashMap<String, usize>,
    target: Vec<f64>,
    samples: Vec<AlignedSample>,
}

/// Scale a vector so its entries sum to 100 (zero vectors stay zero)
pub fn normalize(vector: &mut [f64]) {
    let total: f64 = vector.iter().sum();
    if total > 0.0 {
        for v in vector.iter_mut() {
            *v = *v / total * NORMALIZED_MASS;
        }
    }
}

impl HistogramStore {
    /// Build aligned vectors from a (compressed) histogram set
    ///
    /// Samples with no calls left in the universe cannot contribute to any
    /// combination and are dropped with a warning.
    ///
    /// # Errors
    /// `SelectorError::EmptyUniverse` if the set has no identifiers at all,
    /// `SelectorError::NoSamples` if every sample was dropped.
    pub fn build(set: &HistogramSet) -> Result<Self> {
        let universe = set.universe();
        if universe.is_empty() {
            return Err(SelectorError::EmptyUniverse(0.0));
        }
        let index: FnvHashMap<String, usize> = universe
            .iter()
            .enumerate()
            .map(|(i, id)| (id.clone(), i))
            .collect();

        let target = Self::align(&set.reference, &index, universe.len());
        if target.iter().all(|&v| v == 0.0) {
            tracing::warn!(
                "Reference {} has no calls left after compression; similarity will be 0",
                set.reference.source_path
            );
        }

        let mut samples = Vec::with_capacity(set.samples.len());
        for histogram in &set.samples {
            if histogram.total() == 0 {
                tracing::warn!(
                    "Dropping sample {}: no calls left after compression",
                    histogram.source_path
                );
                continue;
            }
            samples.push(AlignedSample {
                source_path: histogram.source_path.clone(),
                vector: Self::align(histogram, &index, universe.len()),
            });
        }

        if samples.is_empty() {
            return Err(SelectorError::NoSamples);
        }

        tracing::debug!(
            "Aligned {} samples over {} identifiers",
            samples.len(),
            universe.len()
        );

        Ok(Self {
            reference_path: set.reference.source_path.clone(),
            universe,
            index,
            target,
            samples,
        })
    }

    fn align(histogram: &Histogram, index: &FnvHashMap<String, usize>, len: usize) -> Vec<f64> {
        let mut vector = vec![0.0; len];
        for (id, &count) in &histogram.counts {
            if let Some(&i) = index.get(id) {
                vector[i] = count as f64;
            }
        }
        normalize(&mut vector);
        vector
    }

    pub fn reference_path(&self) -> &str {
        &self.reference_path
    }

    /// Identifiers in vector order
    pub fn universe(&self) -> &[String] {
        &self.universe
    }

    /// Vector position of an identifier
    pub fn index_of(&self, identifier: &str) -> Option<usize> {
        self.index.get(identifier).copied()
    }

    /// Normalized target vector T
    pub fn target(&self) -> &[f64] {
        &self.target
    }

    pub fn samples(&self) -> &[AlignedSample] {
        &self.samples
    }

    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }

    pub fn dimension(&self) -> usize {
        self.universe.len()
    }

    /// Σ wᵢ·sᵢ for a weight per sample
    pub fn combine(&self, weights: &[f64]) -> Vec<f64> {
        let mut combined = vec![0.0; self.dimension()];
        for (sample, &w) in self.samples.iter().zip(weights) {
            if w == 0.0 {
                continue;
            }
            for (c, &s) in combined.iter_mut().zip(&sample.vector) {
                *c += w * s;
            }
        }
        combined
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::histogram::ProfileRecord;

    fn store(records: Vec<ProfileRecord>) -> HistogramStore {
        let set = HistogramSet::from_records(&records).unwrap();
        HistogramStore::build(&set).unwrap()
    }

    #[test]
    fn test_vectors_share_layout() {
        let s = store(vec![
            ProfileRecord::reference("r", &[("b", 1), ("a", 3)]),
            ProfileRecord::sample("t1", &[("c", 2)]),
            ProfileRecord::sample("t2", &[("a", 1), ("c", 1)]),
        ]);
        assert_eq!(s.universe(), &["a", "b", "c"]);
        assert_eq!(s.index_of("c"), Some(2));
        assert_eq!(s.target(), &[75.0, 25.0, 0.0]);
        assert_eq!(s.samples()[0].vector, vec![0.0, 0.0, 100.0]);
        assert_eq!(s.samples()[1].vector, vec![50.0, 0.0, 50.0]);
        for sample in s.samples() {
            assert_eq!(sample.vector.len(), s.dimension());
        }
    }

    #[test]
    fn test_zero_sample_dropped() {
        let s = store(vec![
            ProfileRecord::reference("r", &[("a", 3)]),
            ProfileRecord::sample("t1", &[("a", 0)]),
            ProfileRecord::sample("t2", &[("a", 5)]),
        ]);
        assert_eq!(s.sample_count(), 1);
        assert_eq!(s.samples()[0].source_path, "t2");
    }

    #[test]
    fn test_all_samples_zero() {
        let records = vec![
            ProfileRecord::reference("r", &[("a", 3)]),
            ProfileRecord::sample("t1", &[("a", 0)]),
        ];
        let set = HistogramSet::from_records(&records).unwrap();
        assert_eq!(HistogramStore::build(&set), Err(SelectorError::NoSamples));
    }

    #[test]
    fn test_combine() {
        let s = store(vec![
            ProfileRecord::reference("r", &[("a", 1), ("b", 1)]),
            ProfileRecord::sample("t1", &[("a", 1)]),
            ProfileRecord::sample("t2", &[("b", 1)]),
        ]);
        assert_eq!(s.combine(&[0.5, 0.5]), vec![50.0, 50.0]);
        assert_eq!(s.combine(&[1.0, 0.0]), vec![100.0, 0.0]);
    }

    #[test]
    fn test_normalize_zero_vector() {
        let mut v = vec![0.0, 0.0];
        normalize(&mut v);
        assert_eq!(v, vec![0.0, 0.0]);
    }
}
