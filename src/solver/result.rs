// Decomposition result record
//
// Turns raw solver weights into the reported form: negligible weights are
// dropped, the rest are rounded to the configured precision and corrected so
// they sum to exactly one.

use super::Selection;
use crate::store::HistogramStore;
use serde::{Deserialize, Serialize};

/// Weights at or below this are treated as unselected
pub const WEIGHT_EPSILON: f64 = 1e-6;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectedSample {
    pub sample_path: String,
    pub weight: f64,
}

/// Reported outcome of one decomposition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecompositionRecord {
    pub reference_file: String,
    /// Achieved similarity, 0-100
    pub similarity: f64,
    pub selected_samples: Vec<SelectedSample>,
    pub min_similarity: f64,
    /// Whether `similarity` reaches `min_similarity`
    pub threshold_met: bool,
    /// False when the time limit cut the search short
    pub is_optimal: bool,
    /// True when the threshold was dropped to find any selection
    pub relaxed: bool,
}

impl DecompositionRecord {
    pub fn from_selection(
        store: &HistogramStore,
        selection: &Selection,
        min_similarity: f64,
        weight_precision: u32,
        similarity_precision: u32,
    ) -> Self {
        let selected_samples = round_weights(&selection.weights, weight_precision)
            .into_iter()
            .map(|(i, weight)| SelectedSample {
                sample_path: store.samples()[i].source_path.clone(),
                weight,
            })
            .collect();

        Self {
            reference_file: store.reference_path().to_string(),
            similarity: round_to(selection.similarity, similarity_precision),
            selected_samples,
            min_similarity,
            threshold_met: selection.threshold_met,
            is_optimal: selection.is_optimal,
            relaxed: selection.relaxed,
        }
    }

    pub fn weight_sum(&self) -> f64 {
        self.selected_samples.iter().map(|s| s.weight).sum()
    }
}

/// Round to `places` decimal places (half away from zero)
pub fn round_to(value: f64, places: u32) -> f64 {
    let scale = 10f64.powi(places as i32);
    (value * scale).round() / scale
}

/// Round selected weights, keeping their sum at one
///
/// Returns `(sample index, weight)` pairs in index order. The rounding residue
/// goes to the largest weight (lowest index on ties).
///
/// # Example
/// ```
/// use selector::solver::round_weights;
///
/// let rounded = round_weights(&[1.0 / 3.0, 1.0 / 3.0, 1.0 / 3.0, 0.0], 2);
/// assert_eq!(rounded.len(), 3);
/// assert_eq!(rounded[0], (0, 0.34));
/// let sum: f64 = rounded.iter().map(|(_, w)| w).sum();
/// assert!((sum - 1.0).abs() < 1e-9);
/// ```
pub fn round_weights(weights: &[f64], precision: u32) -> Vec<(usize, f64)> {
    let raw: Vec<(usize, f64)> = weights
        .iter()
        .enumerate()
        .filter(|&(_, &w)| w > WEIGHT_EPSILON)
        .map(|(i, &w)| (i, w))
        .collect();
    let Some(&(heaviest, _)) = raw
        .iter()
        .reduce(|best, candidate| if candidate.1 > best.1 { candidate } else { best })
    else {
        return Vec::new();
    };

    let mut rounded: Vec<(usize, f64)> = raw
        .iter()
        .map(|&(i, w)| (i, round_to(w, precision)))
        .filter(|&(_, w)| w > 0.0)
        .collect();

    if let Some(largest) = rounded
        .iter()
        .enumerate()
        .reduce(|best, candidate| if candidate.1 .1 > best.1 .1 { candidate } else { best })
        .map(|(pos, _)| pos)
    {
        let sum: f64 = rounded.iter().map(|(_, w)| w).sum();
        rounded[largest].1 = round_to(rounded[largest].1 + (1.0 - sum), precision);
        rounded.retain(|&(_, w)| w > 0.0);
    }

    if rounded.is_empty() {
        // Every weight rounded away
        return vec![(heaviest, 1.0)];
    }
    rounded
}
