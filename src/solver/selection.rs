// MILP formulation of the sample selection problem
//
// Variables, in model order:
//   w_i ∈ [0, 1]   weight of sample i
//   z_i ∈ {0, 1}   sample i is selected
//   d⁺_j, d⁻_j ≥ 0 positive and negative deviation on identifier j
//
// Constraints:
//   w_i − z_i ≤ 0                     (link)
//   Σ z_i ≤ K                         (cardinality)
//   Σ w_i = 1                         (normalization)
//   Σ_i s_ij·w_i − d⁺_j + d⁻_j = T_j  (deviation, one per identifier)
//   Σ_j (d⁺_j + d⁻_j) ≤ budget        (threshold, optional)
//
// Objective: minimize Σ_j (d⁺_j + d⁻_j)

use crate::milp::{Comparison, MilpModel, VarId, VarKind};
use crate::similarity::l1_deviation;
use crate::store::HistogramStore;

/// A built selection model plus handles to its variables
#[derive(Debug, Clone)]
pub struct Formulation {
    pub model: MilpModel,
    pub weights: Vec<VarId>,
    pub selectors: Vec<VarId>,
    /// (d⁺_j, d⁻_j) per identifier
    pub deviations: Vec<(VarId, VarId)>,
}

/// Builder for selection formulations over one store
#[derive(Debug, Clone)]
pub struct FormulationBuilder<'a> {
    store: &'a HistogramStore,
    cardinality: usize,
    deviation_limit: Option<f64>,
    allowed: Option<Vec<bool>>,
}

impl<'a> FormulationBuilder<'a> {
    pub fn new(store: &'a HistogramStore, cardinality: usize) -> Self {
        Self {
            store,
            cardinality,
            deviation_limit: None,
            allowed: None,
        }
    }

    /// Require Σ_j (d⁺_j + d⁻_j) ≤ `limit`
    pub fn deviation_limit(mut self, limit: f64) -> Self {
        self.deviation_limit = Some(limit);
        self
    }

    /// Restrict the selection to samples whose mask entry is true
    pub fn allowed(mut self, mask: Vec<bool>) -> Self {
        self.allowed = Some(mask);
        self
    }

    pub fn build(self) -> Formulation {
        let store = self.store;
        let n = store.sample_count();
        let mut model = MilpModel::new();

        let is_allowed = |i: usize| self.allowed.as_ref().map_or(true, |mask| mask[i]);

        let weights: Vec<VarId> = (0..n)
            .map(|i| {
                let upper = if is_allowed(i) { 1.0 } else { 0.0 };
                model.add_variable(format!("w_{}", i), VarKind::Continuous, 0.0, upper)
            })
            .collect();
        let selectors: Vec<VarId> = (0..n)
            .map(|i| {
                let upper = if is_allowed(i) { 1.0 } else { 0.0 };
                model.add_variable(format!("z_{}", i), VarKind::Binary, 0.0, upper)
            })
            .collect();
        let deviations: Vec<(VarId, VarId)> = (0..store.dimension())
            .map(|j| {
                let plus = model.add_variable(
                    format!("dp_{}", j),
                    VarKind::Continuous,
                    0.0,
                    f64::INFINITY,
                );
                let minus = model.add_variable(
                    format!("dm_{}", j),
                    VarKind::Continuous,
                    0.0,
                    f64::INFINITY,
                );
                (plus, minus)
            })
            .collect();

        for (i, (&w, &z)) in weights.iter().zip(&selectors).enumerate() {
            model.add_constraint(
                format!("link_{}", i),
                vec![(w, 1.0), (z, -1.0)],
                Comparison::Le,
                0.0,
            );
        }

        model.add_constraint(
            "cardinality",
            selectors.iter().map(|&z| (z, 1.0)).collect(),
            Comparison::Le,
            self.cardinality as f64,
        );
        model.add_constraint(
            "normalization",
            weights.iter().map(|&w| (w, 1.0)).collect(),
            Comparison::Eq,
            1.0,
        );

        for (j, &(plus, minus)) in deviations.iter().enumerate() {
            let mut terms: Vec<(VarId, f64)> = store
                .samples()
                .iter()
                .zip(&weights)
                .filter(|(sample, _)| sample.vector[j] != 0.0)
                .map(|(sample, &w)| (w, sample.vector[j]))
                .collect();
            terms.push((plus, -1.0));
            terms.push((minus, 1.0));
            model.add_constraint(
                format!("deviation_{}", j),
                terms,
                Comparison::Eq,
                store.target()[j],
            );
        }

        let deviation_terms: Vec<(VarId, f64)> = deviations
            .iter()
            .flat_map(|&(plus, minus)| [(plus, 1.0), (minus, 1.0)])
            .collect();

        if let Some(limit) = self.deviation_limit {
            model.add_constraint("threshold", deviation_terms.clone(), Comparison::Le, limit);
        }
        model.set_objective(deviation_terms);

        Formulation {
            model,
            weights,
            selectors,
            deviations,
        }
    }
}

impl Formulation {
    /// Full assignment that puts all weight on one sample
    pub fn single_sample_point(&self, store: &HistogramStore, sample: usize) -> Vec<f64> {
        let mut values = vec![0.0; self.model.variables().len()];
        values[self.weights[sample].index()] = 1.0;
        values[self.selectors[sample].index()] = 1.0;

        let vector = &store.samples()[sample].vector;
        for (j, &(plus, minus)) in self.deviations.iter().enumerate() {
            let diff = vector[j] - store.target()[j];
            values[plus.index()] = diff.max(0.0);
            values[minus.index()] = (-diff).max(0.0);
        }
        values
    }

    /// Sample weights read from a solved assignment
    pub fn extract_weights(&self, values: &[f64]) -> Vec<f64> {
        self.weights
            .iter()
            .map(|w| {
                let value = values[w.index()].clamp(0.0, 1.0);
                if value < 1e-9 {
                    0.0
                } else {
                    value
                }
            })
            .collect()
    }
}

/// Sample whose vector alone is closest to the target (lowest index on ties)
pub fn best_single_sample(store: &HistogramStore) -> usize {
    let mut best = (0, f64::INFINITY);
    for (i, sample) in store.samples().iter().enumerate() {
        let deviation = l1_deviation(&sample.vector, store.target());
        if deviation < best.1 {
            best = (i, deviation);
        }
    }
    best.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::histogram::{HistogramSet, ProfileRecord};

    fn store() -> HistogramStore {
        let records = vec![
            ProfileRecord::reference("ref", &[("a", 1), ("b", 1)]),
            ProfileRecord::sample("s0", &[("a", 1)]),
            ProfileRecord::sample("s1", &[("a", 1), ("b", 1)]),
            ProfileRecord::sample("s2", &[("b", 1)]),
        ];
        HistogramStore::build(&HistogramSet::from_records(&records).unwrap()).unwrap()
    }

    #[test]
    fn test_model_shape() {
        let store = store();
        let f = FormulationBuilder::new(&store, 2).build();
        // 3 weights, 3 selectors, 2 × 2 deviations
        assert_eq!(f.model.variables().len(), 10);
        // 3 links, cardinality, normalization, 2 deviation rows
        assert_eq!(f.model.constraints().len(), 7);
        assert_eq!(f.model.binary_variables().len(), 3);
    }

    #[test]
    fn test_threshold_adds_constraint() {
        let store = store();
        let f = FormulationBuilder::new(&store, 2)
            .deviation_limit(10.0)
            .build();
        let last = f.model.constraints().last().unwrap();
        assert_eq!(last.name, "threshold");
        assert_eq!(last.rhs, 10.0);
    }

    #[test]
    fn test_single_sample_point_is_feasible() {
        let store = store();
        let f = FormulationBuilder::new(&store, 1).build();
        let point = f.single_sample_point(&store, 0);
        assert!(f.model.is_feasible(&point));
        // s0 = [100, 0] against T = [50, 50]
        assert!((f.model.evaluate_objective(&point) - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_mask_blocks_sample() {
        let store = store();
        let f = FormulationBuilder::new(&store, 3)
            .allowed(vec![true, false, true])
            .build();
        let point = f.single_sample_point(&store, 1);
        assert!(!f.model.is_feasible(&point));
        assert!(f.model.is_feasible(&f.single_sample_point(&store, 2)));
    }

    #[test]
    fn test_best_single_sample() {
        assert_eq!(best_single_sample(&store()), 1);
    }

    #[test]
    fn test_extract_weights_cleans_noise() {
        let store = store();
        let f = FormulationBuilder::new(&store, 3).build();
        let mut values = vec![0.0; f.model.variables().len()];
        values[f.weights[0].index()] = 1e-12;
        values[f.weights[1].index()] = 1.0000000001;
        values[f.weights[2].index()] = -1e-12;
        assert_eq!(f.extract_weights(&values), vec![0.0, 1.0, 0.0]);
    }
}
