// Hotness filtering
//
// Ranks identifiers by how much of each profile's calls they account for and
// keeps the smallest leading set that covers the requested cumulative share.
// Every profile contributes its own percentage breakdown, so a reference with
// millions of samples does not drown out unit tests with a few thousand.

use crate::histogram::HistogramSet;
use std::collections::{BTreeMap, BTreeSet};

/// Slack for floating-point comparisons of cumulative shares
const SHARE_EPSILON: f64 = 1e-9;

/// An identifier with its profile-consistent hotness score
#[derive(Debug, Clone, PartialEq)]
pub struct RankedIdentifier {
    pub identifier: String,
    /// Sum over profiles of (count / profile total * 100)
    pub share: f64,
}

/// Rank every identifier in the set by descending hotness
///
/// Ties are broken by identifier so the ranking is reproducible.
pub fn rank_by_hotness(set: &HistogramSet) -> Vec<RankedIdentifier> {
    let mut shares: BTreeMap<&str, f64> = BTreeMap::new();

    for histogram in set.iter() {
        let total = histogram.total();
        for (identifier, &count) in &histogram.counts {
            let entry = shares.entry(identifier.as_str()).or_insert(0.0);
            if total > 0 {
                *entry += count as f64 / total as f64 * 100.0;
            }
        }
    }

    let mut ranked: Vec<RankedIdentifier> = shares
        .into_iter()
        .map(|(identifier, share)| RankedIdentifier {
            identifier: identifier.to_string(),
            share,
        })
        .collect();

    ranked.sort_by(|a, b| {
        b.share
            .total_cmp(&a.share)
            .then_with(|| a.identifier.cmp(&b.identifier))
    });

    ranked
}

/// Select the identifiers that survive hotness filtering at `percent`
///
/// - `percent >= 100` keeps the whole universe, including identifiers that
///   never fire
/// - `percent <= 0` keeps nothing; rejecting that is the caller's job
pub fn retain_hottest(set: &HistogramSet, percent: f64) -> BTreeSet<String> {
    let ranked = rank_by_hotness(set);

    if percent >= 100.0 {
        return ranked.into_iter().map(|r| r.identifier).collect();
    }
    if percent <= 0.0 {
        return BTreeSet::new();
    }

    let total_share: f64 = ranked.iter().map(|r| r.share).sum();
    let goal = total_share * percent / 100.0;

    let mut retained = BTreeSet::new();
    let mut cumulative = 0.0;
    for entry in ranked {
        if cumulative + SHARE_EPSILON >= goal {
            break;
        }
        cumulative += entry.share;
        retained.insert(entry.identifier);
    }

    retained
}
