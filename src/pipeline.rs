//! End-to-end decomposition: records in, result record out
//!
//! validate config -> histogram set -> compression -> aligned store ->
//! selection -> rounded record

use crate::compression::{CompressionStats, Compressor};
use crate::config::SelectorConfig;
use crate::error::Result;
use crate::histogram::{HistogramSet, ProfileRecord};
use crate::solver::{DecompositionRecord, SelectionSolver, SolverParams};
use crate::store::HistogramStore;

/// Everything a run produced, beyond the record itself
#[derive(Debug, Clone, PartialEq)]
pub struct Decomposition {
    pub record: DecompositionRecord,
    pub compression: CompressionStats,
    /// Samples that entered the solver (after dropping empty ones)
    pub candidate_samples: usize,
    pub nodes_explored: usize,
}

/// Run a full decomposition with the default backend
///
/// # Example
/// ```
/// use selector::config::SelectorConfig;
/// use selector::histogram::ProfileRecord;
/// use selector::pipeline::decompose;
///
/// let records = vec![
///     ProfileRecord::reference("prod.histo", &[("main;run", 30), ("main;io", 10)]),
///     ProfileRecord::sample("test_io.histo", &[("main;io", 4)]),
///     ProfileRecord::sample("test_run.histo", &[("main;run", 9)]),
/// ];
///
/// let result = decompose(&records, &SelectorConfig::default()).unwrap();
/// assert_eq!(result.record.similarity, 100.0);
/// assert_eq!(result.record.selected_samples.len(), 2);
/// assert_eq!(result.record.selected_samples[1].weight, 0.75);
/// ```
pub fn decompose(records: &[ProfileRecord], config: &SelectorConfig) -> Result<Decomposition> {
    config.validate()?;

    let set = HistogramSet::from_records(records)?;
    tracing::info!(
        "Loaded reference {} and {} sample(s)",
        set.reference.source_path,
        set.samples.len()
    );

    let compressed = Compressor::from_config(config).compress(&set)?;
    let store = HistogramStore::build(&compressed.set)?;

    let solver = SelectionSolver::new(SolverParams::from_config(config)?);
    let selection = solver.solve(&store)?;

    let record = DecompositionRecord::from_selection(
        &store,
        &selection,
        config.min_similarity,
        config.weight_precision,
        config.similarity_precision,
    );

    if !record.threshold_met {
        tracing::warn!(
            "Similarity {}% is below the requested {}% with at most {} samples",
            record.similarity,
            config.min_similarity,
            config.max_selected_samples
        );
    }
    if !record.is_optimal {
        tracing::warn!("Time limit reached; result is the best found, not proven optimal");
    }

    Ok(Decomposition {
        record,
        compression: compressed.stats,
        candidate_samples: store.sample_count(),
        nodes_explored: selection.nodes_explored,
    })
}
