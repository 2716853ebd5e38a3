// Identifier-universe compression
//
// Shrinks the identifier space shared by the reference and all samples while
// keeping every histogram comparable with every other:
//
// 1. Hotness filtering drops the cold tail (same identifiers from every file)
// 2. Block compression collapses identifiers that no histogram can tell apart
//
// Both steps are pure functions of the input set and produce identical
// identifier sets across histograms.

mod block;
mod hotness;

pub use block::{merge_blocks, Block, BlockMap};
pub use hotness::{rank_by_hotness, retain_hottest, RankedIdentifier};

use crate::config::SelectorConfig;
use crate::error::{Result, SelectorError};
use crate::histogram::HistogramSet;
use serde::{Deserialize, Serialize};

/// Universe sizes observed at each compression step
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompressionStats {
    pub raw_universe: usize,
    pub after_hotness: usize,
    pub after_blocks: usize,
    pub blocks_formed: usize,
}

impl CompressionStats {
    /// Fraction of the raw universe removed, in percent
    pub fn reduction_percent(&self) -> f64 {
        if self.raw_universe == 0 {
            return 0.0;
        }
        (1.0 - self.after_blocks as f64 / self.raw_universe as f64) * 100.0
    }
}

/// Output of a compression run
#[derive(Debug, Clone, PartialEq)]
pub struct Compressed {
    pub set: HistogramSet,
    pub blocks: BlockMap,
    pub stats: CompressionStats,
}

/// Hotness + block compressor
///
/// # Example
/// ```
/// use selector::compression::Compressor;
/// use selector::histogram::{HistogramSet, ProfileRecord};
///
/// let records = vec![
///     ProfileRecord::reference("ref", &[("id1", 2), ("id2", 2), ("id3", 2)]),
///     ProfileRecord::sample("t1", &[("id1", 8), ("id2", 8), ("id3", 8)]),
/// ];
/// let set = HistogramSet::from_records(&records).unwrap();
///
/// let compressed = Compressor::new(100.0, true).compress(&set).unwrap();
/// assert_eq!(compressed.stats.after_blocks, 1);
/// assert_eq!(compressed.set.reference.total(), 6);
/// assert_eq!(compressed.set.samples[0].total(), 24);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Compressor {
    hotness_compression: f64,
    block_compression: bool,
}

impl Compressor {
    pub fn new(hotness_compression: f64, block_compression: bool) -> Self {
        Self {
            hotness_compression,
            block_compression,
        }
    }

    pub fn from_config(config: &SelectorConfig) -> Self {
        Self::new(config.hotness_compression, config.block_compression)
    }

    /// Compress the identifier universe of `set`
    ///
    /// # Errors
    /// `SelectorError::EmptyUniverse` when hotness filtering leaves nothing,
    /// which happens at 0%.
    pub fn compress(&self, set: &HistogramSet) -> Result<Compressed> {
        let raw_universe = set.universe().len();

        let retained = retain_hottest(set, self.hotness_compression);
        if retained.is_empty() {
            return Err(SelectorError::EmptyUniverse(self.hotness_compression));
        }
        let filtered = if retained.len() == raw_universe {
            set.clone()
        } else {
            set.retain(|id| retained.contains(id))
        };
        let after_hotness = retained.len();

        let (set, blocks) = if self.block_compression {
            merge_blocks(&filtered)
        } else {
            (filtered, BlockMap::default())
        };

        let stats = CompressionStats {
            raw_universe,
            after_hotness,
            after_blocks: set.universe().len(),
            blocks_formed: blocks.len(),
        };

        tracing::info!(
            "Compressed identifier universe {} -> {} (hotness {}%) -> {} ({} blocks)",
            stats.raw_universe,
            stats.after_hotness,
            self.hotness_compression,
            stats.after_blocks,
            stats.blocks_formed
        );

        Ok(Compressed { set, blocks, stats })
    }
}
