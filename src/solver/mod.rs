// Sample selection: which samples, in which proportions, best reproduce the
// reference histogram?
//
// The problem is a MILP (see `selection.rs`) solved in at most two phases that
// share one deadline:
//
// 1. Threshold phase: deviation limited to what `min_similarity` allows.
//    Feasible means the threshold is met with at most K samples.
// 2. Relaxed phase: threshold dropped, same K. Reports the best similarity
//    reachable, below the requested minimum.
//
// A sparsification pass then removes selected samples that do not improve the
// deviation, so ties prefer fewer samples.

mod result;
mod selection;

pub use result::{round_to, round_weights, DecompositionRecord, SelectedSample, WEIGHT_EPSILON};
pub use selection::{best_single_sample, Formulation, FormulationBuilder};

use crate::config::SelectorConfig;
use crate::error::{Result, SelectorError};
use crate::milp::{BranchAndBound, MilpBackend, MilpOutcome, MilpSolution, SolveLimits};
use crate::similarity::{deviation_budget, l1_deviation, similarity};
use crate::store::{HistogramStore, NORMALIZED_MASS};
use std::time::Duration;

/// A removal is accepted if the deviation grows by at most this much
const SPARSIFY_TOLERANCE: f64 = 1e-9;

/// Matches the `time_limit_seconds` default of `SelectorConfig`
const DEFAULT_TIME_LIMIT: Duration = Duration::from_secs(60);

/// Slack when comparing achieved and requested similarity
const THRESHOLD_TOLERANCE: f64 = 1e-6;

/// Parameters of one selection solve
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolverParams {
    pub max_selected_samples: usize,
    pub min_similarity: f64,
    pub time_limit: Duration,
    pub threads: usize,
}

impl SolverParams {
    /// Solver parameters from a configuration, validating it first
    ///
    /// # Errors
    /// `SelectorError::InvalidConfig` for any value `SelectorConfig::validate`
    /// rejects.
    pub fn from_config(config: &SelectorConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            max_selected_samples: config.max_selected_samples,
            min_similarity: config.min_similarity,
            time_limit: config.time_limit()?,
            threads: config.threads_count,
        })
    }
}

impl Default for SolverParams {
    fn default() -> Self {
        let config = SelectorConfig::default();
        Self {
            max_selected_samples: config.max_selected_samples,
            min_similarity: config.min_similarity,
            time_limit: DEFAULT_TIME_LIMIT,
            threads: config.threads_count,
        }
    }
}

/// Raw outcome of a selection solve, one weight per store sample
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub weights: Vec<f64>,
    /// L1 deviation of the weighted combination from the target
    pub deviation: f64,
    pub similarity: f64,
    /// Proven optimal for the phase that produced it
    pub is_optimal: bool,
    pub threshold_met: bool,
    pub relaxed: bool,
    pub nodes_explored: usize,
}

impl Selection {
    /// Indices of samples with non-negligible weight
    pub fn selected(&self) -> Vec<usize> {
        self.weights
            .iter()
            .enumerate()
            .filter(|&(_, &w)| w > WEIGHT_EPSILON)
            .map(|(i, _)| i)
            .collect()
    }

    pub fn selected_count(&self) -> usize {
        self.selected().len()
    }
}

/// Two-phase selection solver over a `MilpBackend`
///
/// # Example
/// ```
/// use selector::histogram::{HistogramSet, ProfileRecord};
/// use selector::solver::{SelectionSolver, SolverParams};
/// use selector::store::HistogramStore;
///
/// let records = vec![
///     ProfileRecord::reference("ref", &[("a", 3), ("b", 1)]),
///     ProfileRecord::sample("s1", &[("a", 1)]),
///     ProfileRecord::sample("s2", &[("a", 3), ("b", 1)]),
/// ];
/// let store = HistogramStore::build(&HistogramSet::from_records(&records).unwrap()).unwrap();
///
/// let selection = SelectionSolver::new(SolverParams::default()).solve(&store).unwrap();
/// assert_eq!(selection.selected(), vec![1]);
/// assert_eq!(selection.similarity, 100.0);
/// assert!(selection.threshold_met);
/// ```
#[derive(Debug, Clone)]
pub struct SelectionSolver<B = BranchAndBound> {
    backend: B,
    params: SolverParams,
}

impl SelectionSolver<BranchAndBound> {
    pub fn new(params: SolverParams) -> Self {
        Self::with_backend(BranchAndBound::new(), params)
    }
}

impl<B: MilpBackend> SelectionSolver<B> {
    pub fn with_backend(backend: B, params: SolverParams) -> Self {
        Self { backend, params }
    }

    pub fn params(&self) -> &SolverParams {
        &self.params
    }

    /// Select samples for `store`
    ///
    /// Never fails for a timeout or an unreachable threshold; those are
    /// reported through `is_optimal`, `threshold_met` and `relaxed`.
    ///
    /// # Errors
    /// `SelectorError::InvalidConfig` if K is zero, `SelectorError::Solver`
    /// if the backend fails or proves a feasible formulation infeasible.
    pub fn solve(&self, store: &HistogramStore) -> Result<Selection> {
        if self.params.max_selected_samples == 0 {
            return Err(SelectorError::InvalidConfig(
                "max_selected_samples must be at least 1".into(),
            ));
        }

        let limits = SolveLimits::new(self.params.time_limit, self.params.threads);
        let cardinality = self.params.max_selected_samples.min(store.sample_count());
        let seed = best_single_sample(store);
        let budget = deviation_budget(self.params.min_similarity, NORMALIZED_MASS);

        tracing::info!(
            "Selecting up to {} of {} samples (min similarity {}%, backend {})",
            cardinality,
            store.sample_count(),
            self.params.min_similarity,
            self.backend.name()
        );

        let threshold = FormulationBuilder::new(store, cardinality)
            .deviation_limit(budget)
            .build();
        let hint = threshold.single_sample_point(store, seed);
        let outcome = self.backend.solve(&threshold.model, &limits, Some(&hint))?;

        let (mut selection, mut nodes) = match outcome {
            MilpOutcome::Solved(solution) => {
                tracing::info!(
                    "Threshold phase: {:?} after {} nodes",
                    solution.status,
                    solution.nodes_explored
                );
                (self.selection_from(store, &threshold, &solution, false), solution.nodes_explored)
            }
            unreached => {
                tracing::info!(
                    "Similarity {}% not reachable with {} samples ({:?}); relaxing threshold",
                    self.params.min_similarity,
                    cardinality,
                    unreached
                );
                self.solve_relaxed(store, cardinality, seed, &limits)?
            }
        };

        if !limits.expired() {
            nodes += self.sparsify(store, &mut selection, &limits)?;
        }
        selection.nodes_explored = nodes;

        tracing::info!(
            "Selected {} samples, similarity {:.4}% (optimal: {}, relaxed: {})",
            selection.selected_count(),
            selection.similarity,
            selection.is_optimal,
            selection.relaxed
        );

        Ok(selection)
    }

    fn solve_relaxed(
        &self,
        store: &HistogramStore,
        cardinality: usize,
        seed: usize,
        limits: &SolveLimits,
    ) -> Result<(Selection, usize)> {
        let relaxed = FormulationBuilder::new(store, cardinality).build();
        let hint = relaxed.single_sample_point(store, seed);

        match self.backend.solve(&relaxed.model, limits, Some(&hint))? {
            MilpOutcome::Solved(solution) => {
                tracing::info!(
                    "Relaxed phase: {:?} after {} nodes",
                    solution.status,
                    solution.nodes_explored
                );
                let nodes = solution.nodes_explored;
                Ok((self.selection_from(store, &relaxed, &solution, true), nodes))
            }
            MilpOutcome::NoSolution => {
                tracing::warn!("No incumbent before the deadline; reporting best single sample");
                let mut weights = vec![0.0; store.sample_count()];
                weights[seed] = 1.0;
                Ok((self.build_selection(store, weights, false, true), 0))
            }
            MilpOutcome::Infeasible => Err(SelectorError::Solver(
                "relaxed selection model reported infeasible".into(),
            )),
        }
    }

    fn selection_from(
        &self,
        store: &HistogramStore,
        formulation: &Formulation,
        solution: &MilpSolution,
        relaxed: bool,
    ) -> Selection {
        let weights = formulation.extract_weights(&solution.assignment.values);
        let mut selection = self.build_selection(store, weights, solution.is_optimal(), relaxed);
        selection.nodes_explored = solution.nodes_explored;
        selection
    }

    fn build_selection(
        &self,
        store: &HistogramStore,
        weights: Vec<f64>,
        is_optimal: bool,
        relaxed: bool,
    ) -> Selection {
        let combination = store.combine(&weights);
        let deviation = l1_deviation(store.target(), &combination);
        let similarity = similarity(store.target(), &combination);
        let threshold_met =
            !relaxed || similarity + THRESHOLD_TOLERANCE >= self.params.min_similarity;

        Selection {
            weights,
            deviation,
            similarity,
            is_optimal,
            threshold_met,
            relaxed,
            nodes_explored: 0,
        }
    }

    /// Drop selected samples whose removal keeps the deviation
    ///
    /// Candidates are tried lightest first (lowest index on ties). Returns the
    /// number of nodes explored by the re-solves.
    fn sparsify(
        &self,
        store: &HistogramStore,
        selection: &mut Selection,
        limits: &SolveLimits,
    ) -> Result<usize> {
        let mut candidates = selection.selected();
        if candidates.len() <= 1 {
            return Ok(0);
        }
        candidates.sort_by(|&a, &b| {
            selection.weights[a]
                .total_cmp(&selection.weights[b])
                .then(a.cmp(&b))
        });

        let mut nodes = 0;
        for candidate in candidates {
            if limits.expired() {
                break;
            }
            if selection.weights[candidate] <= WEIGHT_EPSILON {
                continue;
            }
            let mut mask: Vec<bool> = selection
                .weights
                .iter()
                .map(|&w| w > WEIGHT_EPSILON)
                .collect();
            mask[candidate] = false;
            let remaining = mask.iter().filter(|&&allowed| allowed).count();
            if remaining == 0 {
                continue;
            }

            let restricted = FormulationBuilder::new(store, remaining)
                .allowed(mask)
                .build();
            let MilpOutcome::Solved(solution) = self.backend.solve(&restricted.model, limits, None)?
            else {
                continue;
            };
            nodes += solution.nodes_explored;

            let weights = restricted.extract_weights(&solution.assignment.values);
            let combination = store.combine(&weights);
            let deviation = l1_deviation(store.target(), &combination);
            if deviation <= selection.deviation + SPARSIFY_TOLERANCE {
                tracing::debug!(
                    "Dropped sample {} without losing similarity",
                    store.samples()[candidate].source_path
                );
                let is_optimal = selection.is_optimal;
                let relaxed = selection.relaxed;
                *selection = self.build_selection(store, weights, is_optimal, relaxed);
            }
        }

        Ok(nodes)
    }
}
