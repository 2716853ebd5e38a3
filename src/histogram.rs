//! Per-profile call-stack histograms
//!
//! Histograms arrive already extracted from native profiling formats as JSON
//! records. This module validates those records into one reference histogram
//! (the production workload) and the sample histograms (unit tests) that will
//! be combined to approximate it.

use crate::error::{Result, SelectorError};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Role of a profile in a decomposition run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProfileKind {
    /// The target workload
    Reference,
    /// A candidate contributor to the target
    Sample,
}

/// A raw histogram record as produced by the extraction stage
///
/// Counts are kept signed so that negative values can be reported with
/// their location instead of failing deep inside the JSON parser.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProfileRecord {
    #[serde(rename = "type")]
    pub kind: ProfileKind,
    #[serde(alias = "source_file")]
    pub source_path: String,
    pub histo: BTreeMap<String, i64>,
}

impl ProfileRecord {
    pub fn reference(source_path: impl Into<String>, histo: &[(&str, i64)]) -> Self {
        Self::new(ProfileKind::Reference, source_path, histo)
    }

    pub fn sample(source_path: impl Into<String>, histo: &[(&str, i64)]) -> Self {
        Self::new(ProfileKind::Sample, source_path, histo)
    }

    fn new(kind: ProfileKind, source_path: impl Into<String>, histo: &[(&str, i64)]) -> Self {
        Self {
            kind,
            source_path: source_path.into(),
            histo: histo.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
        }
    }
}

/// Load histogram records from a JSON array file (histos.json)
pub fn load_records<P: AsRef<Path>>(path: P) -> anyhow::Result<Vec<ProfileRecord>> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to load input json file {}", path.display()))?;
    parse_records(&content)
}

/// Parse histogram records from JSON text
///
/// Structural problems (wrong keys, non-integer counts) are reported as
/// `SelectorError::Malformed` so callers can classify them as input errors.
pub fn parse_records(content: &str) -> anyhow::Result<Vec<ProfileRecord>> {
    serde_json::from_str(content)
        .map_err(|e| SelectorError::Malformed(e.to_string()))
        .context("Invalid histogram records")
}

/// Validated identifier -> count mapping for one profile
///
/// An identifier missing from `counts` has an implicit count of zero but is
/// distinguishable from an identifier present with count zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Histogram {
    pub source_path: String,
    pub counts: BTreeMap<String, u64>,
}

impl Histogram {
    pub fn new(source_path: impl Into<String>, counts: BTreeMap<String, u64>) -> Self {
        Self {
            source_path: source_path.into(),
            counts,
        }
    }

    /// Validate a raw record into a histogram
    pub fn from_record(record: &ProfileRecord) -> Result<Self> {
        let mut counts = BTreeMap::new();
        for (identifier, &count) in &record.histo {
            if count < 0 {
                return Err(SelectorError::NegativeCount {
                    source_path: record.source_path.clone(),
                    identifier: identifier.clone(),
                    count,
                });
            }
            counts.insert(identifier.clone(), count as u64);
        }
        Ok(Self::new(record.source_path.clone(), counts))
    }

    pub fn get(&self, identifier: &str) -> Option<u64> {
        self.counts.get(identifier).copied()
    }

    /// Sum of all counts, widened so that any number of `u64` counts fits
    pub fn total(&self) -> u128 {
        self.counts.values().map(|&c| u128::from(c)).sum()
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Keep only identifiers accepted by `keep`
    pub fn retain<F: FnMut(&str) -> bool>(&self, mut keep: F) -> Self {
        Self {
            source_path: self.source_path.clone(),
            counts: self
                .counts
                .iter()
                .filter(|(id, _)| keep(id.as_str()))
                .map(|(id, &c)| (id.clone(), c))
                .collect(),
        }
    }
}

/// One reference histogram plus its candidate samples
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistogramSet {
    pub reference: Histogram,
    pub samples: Vec<Histogram>,
}

impl HistogramSet {
    /// Validate records into a histogram set
    ///
    /// Sample records with an empty histogram are skipped. Samples are
    /// ordered by source path so that downstream tie-breaking is stable
    /// regardless of record order.
    pub fn from_records(records: &[ProfileRecord]) -> Result<Self> {
        let references: Vec<&ProfileRecord> = records
            .iter()
            .filter(|r| r.kind == ProfileKind::Reference)
            .collect();

        let reference = match references.as_slice() {
            [] => return Err(SelectorError::MissingReference),
            [single] => Histogram::from_record(single)?,
            many => return Err(SelectorError::MultipleReferences(many.len())),
        };

        if reference.is_empty() {
            return Err(SelectorError::EmptyReference(reference.source_path));
        }

        let mut samples = Vec::new();
        for record in records.iter().filter(|r| r.kind == ProfileKind::Sample) {
            let histogram = Histogram::from_record(record)?;
            if histogram.is_empty() {
                tracing::warn!("Skipping empty sample histogram {}", record.source_path);
                continue;
            }
            samples.push(histogram);
        }

        if samples.is_empty() {
            return Err(SelectorError::NoSamples);
        }

        samples.sort_by(|a, b| a.source_path.cmp(&b.source_path));

        Ok(Self { reference, samples })
    }

    /// All histograms, reference first
    pub fn iter(&self) -> impl Iterator<Item = &Histogram> {
        std::iter::once(&self.reference).chain(self.samples.iter())
    }

    /// Number of histograms including the reference
    pub fn profile_count(&self) -> usize {
        1 + self.samples.len()
    }

    /// Union of identifiers across every histogram, in sorted order
    pub fn universe(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .iter()
            .flat_map(|h| h.counts.keys().cloned())
            .collect();
        ids.sort();
        ids.dedup();
        ids
    }

    /// Apply the same identifier filter to every histogram
    pub fn retain<F: FnMut(&str) -> bool>(&self, mut keep: F) -> Self {
        Self {
            reference: self.reference.retain(&mut keep),
            samples: self.samples.iter().map(|s| s.retain(&mut keep)).collect(),
        }
    }
}
