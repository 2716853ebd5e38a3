// Block compression
//
// Identifiers that carry exactly the same value in every histogram (or are
// absent from the same histograms) are indistinguishable to the solver, so a
// run of them can be collapsed into a single identifier without changing the
// optimum. The check is global: a candidate block must be valid in every
// histogram of the run before anything is merged.
//
// Candidates are formed over one canonical ordering of the universe: by
// per-histogram signature, then by identifier. Identical signatures are
// therefore always consecutive, and every maximal run of them becomes one
// block. A run whose merged count would not fit in a u64 in some histogram is
// left unmerged.

use crate::histogram::{Histogram, HistogramSet};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Per-histogram presence/value of one identifier, reference first
type Signature = Vec<Option<u64>>;

/// A group of identifiers merged into one synthetic identifier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    /// Identifier used for the block in compressed histograms, `<first>+<n>`
    /// where n counts the other members
    pub id: String,
    /// Original identifiers, in canonical order
    pub members: Vec<String>,
}

impl Block {
    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// All blocks formed in one run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockMap {
    blocks: Vec<Block>,
}

impl BlockMap {
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Block> {
        self.blocks.iter().find(|b| b.id == id)
    }

    /// Number of original identifiers that disappeared into blocks
    pub fn identifiers_saved(&self) -> usize {
        self.blocks.iter().map(|b| b.len() - 1).sum()
    }

    /// Reconstruct per-identifier counts from a compressed histogram
    ///
    /// A block count is spread evenly over its members, which inverts the
    /// merge exactly because every member carried the same value.
    pub fn expand(&self, histogram: &Histogram) -> Histogram {
        let mut counts = BTreeMap::new();
        for (id, &count) in &histogram.counts {
            match self.get(id) {
                Some(block) => {
                    let per_member = count / block.len() as u64;
                    for member in &block.members {
                        counts.insert(member.clone(), per_member);
                    }
                }
                None => {
                    counts.insert(id.clone(), count);
                }
            }
        }
        Histogram::new(histogram.source_path.clone(), counts)
    }
}

fn signature(set: &HistogramSet, identifier: &str) -> Signature {
    set.iter().map(|h| h.get(identifier)).collect()
}

/// Block count in one histogram: shared value times run length
fn merged_count(value: u64, run_len: usize) -> Option<u64> {
    u64::try_from(run_len)
        .ok()
        .and_then(|len| value.checked_mul(len))
}

/// Synthetic identifier for a block, distinct from every identifier in `taken`
fn block_id(members: &[String], taken: &BTreeSet<String>) -> String {
    let base = format!("{}+{}", members[0], members.len() - 1);
    let mut id = base.clone();
    let mut suffix = 1;
    while taken.contains(&id) {
        id = format!("{}#{}", base, suffix);
        suffix += 1;
    }
    id
}

/// Merge every maximal run of identically-valued identifiers
///
/// Returns the compressed set and the blocks needed to undo the merge.
/// When no run is longer than one identifier the set is returned unchanged.
pub fn merge_blocks(set: &HistogramSet) -> (HistogramSet, BlockMap) {
    let universe = set.universe();
    let mut taken: BTreeSet<String> = universe.iter().cloned().collect();

    let mut ordered: Vec<(Signature, String)> = universe
        .into_iter()
        .map(|id| (signature(set, &id), id))
        .collect();
    ordered.sort();

    let mut runs: Vec<(Signature, Vec<String>)> = Vec::new();
    for (sig, id) in ordered {
        match runs.last_mut() {
            Some((last_sig, members)) if *last_sig == sig => members.push(id),
            _ => runs.push((sig, vec![id])),
        }
    }

    let mut blocks = Vec::new();
    let mut reference = BTreeMap::new();
    let mut samples: Vec<BTreeMap<String, u64>> = vec![BTreeMap::new(); set.samples.len()];

    for (sig, members) in runs {
        let run_len = members.len();
        let fits = sig
            .iter()
            .flatten()
            .all(|&v| merged_count(v, run_len).is_some());

        let groups: Vec<Vec<String>> = if run_len == 1 || fits {
            vec![members]
        } else {
            tracing::warn!(
                "Keeping {} identifiers starting at {} unmerged: block count overflows",
                run_len,
                members[0]
            );
            members.into_iter().map(|m| vec![m]).collect()
        };

        for members in groups {
            let len = members.len();
            let id = if len > 1 {
                block_id(&members, &taken)
            } else {
                members[0].clone()
            };

            for (profile, value) in sig.iter().enumerate() {
                let Some(count) = value.and_then(|v| merged_count(v, len)) else {
                    continue;
                };
                if profile == 0 {
                    reference.insert(id.clone(), count);
                } else {
                    samples[profile - 1].insert(id.clone(), count);
                }
            }

            if len > 1 {
                tracing::trace!("Merged {} identifiers into block {}", len, id);
                taken.insert(id.clone());
                blocks.push(Block { id, members });
            }
        }
    }

    let compressed = HistogramSet {
        reference: Histogram::new(set.reference.source_path.clone(), reference),
        samples: set
            .samples
            .iter()
            .zip(samples)
            .map(|(s, counts)| Histogram::new(s.source_path.clone(), counts))
            .collect(),
    };

    (compressed, BlockMap { blocks })
}
