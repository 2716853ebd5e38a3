// Configuration for histogram decomposition
//
// Values come from three layers: built-in defaults, an optional selector.toml,
// and command-line flags (highest precedence). All layers funnel through
// `SelectorConfig::validate` before any work starts.

use crate::error::{Result, SelectorError};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Upper bound for `time_limit_seconds` (one year)
pub(crate) const MAX_TIME_LIMIT_SECONDS: f64 = 365.0 * 24.0 * 3600.0;

/// Configuration accepted by the decomposition core
///
/// # Example
/// ```
/// use selector::config::SelectorConfig;
///
/// let config = SelectorConfig::default();
/// assert_eq!(config.max_selected_samples, 5);
/// assert_eq!(config.min_similarity, 95.0);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SelectorConfig {
    /// Percentage of cumulative call share to keep when filtering cold identifiers
    ///
    /// - 100: keep the full identifier universe
    /// - 97 (default): drop the long tail that together makes up 3% of calls
    /// - 0: degenerate, rejected because nothing would be left to compare
    pub hotness_compression: f64,

    /// Merge runs of identifiers that are uniformly equal (or uniformly absent)
    /// across every histogram
    ///
    /// Default: true
    pub block_compression: bool,

    /// Minimum similarity (0-100%) the selection should reach
    ///
    /// If it cannot be reached with `max_selected_samples` samples, the
    /// best achievable similarity is reported instead.
    ///
    /// Default: 95.0
    pub min_similarity: f64,

    /// Upper bound on the number of samples with non-zero weight (K)
    ///
    /// Default: 5
    pub max_selected_samples: usize,

    /// Wall-clock budget shared by both solve phases
    ///
    /// Default: 60 seconds
    pub time_limit_seconds: f64,

    /// Worker threads used by the branch-and-bound search
    ///
    /// Only affects latency, never the feasible region.
    ///
    /// Default: 4
    pub threads_count: usize,

    /// Decimal places kept for reported weights
    ///
    /// Default: 4
    pub weight_precision: u32,

    /// Decimal places kept for the reported similarity
    ///
    /// Default: 2
    pub similarity_precision: u32,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            hotness_compression: 97.0,
            block_compression: true,
            min_similarity: 95.0,
            max_selected_samples: 5,
            time_limit_seconds: 60.0,
            threads_count: 4,
            weight_precision: 4,
            similarity_precision: 2,
        }
    }
}

impl SelectorConfig {
    /// Tight configuration: higher similarity target over a narrower hot path
    pub fn strict() -> Self {
        Self {
            hotness_compression: 90.0,
            min_similarity: 98.0,
            max_selected_samples: 3,
            ..Self::default()
        }
    }

    /// Loose configuration: full identifier universe, lower similarity target
    pub fn permissive() -> Self {
        Self {
            hotness_compression: 100.0,
            min_similarity: 80.0,
            max_selected_samples: 10,
            ..Self::default()
        }
    }

    /// Load configuration from a selector.toml file
    ///
    /// Missing keys fall back to defaults. The result is not validated here so
    /// that command-line overrides can still be applied.
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        toml::from_str(content).context("Failed to parse TOML")
    }

    /// Solver time budget as a `Duration`
    ///
    /// # Errors
    /// `SelectorError::InvalidConfig` when `time_limit_seconds` is negative,
    /// NaN or too large for a `Duration`.
    pub fn time_limit(&self) -> Result<Duration> {
        Duration::try_from_secs_f64(self.time_limit_seconds).map_err(|e| {
            SelectorError::InvalidConfig(format!(
                "time_limit_seconds {} is not a valid duration: {}",
                self.time_limit_seconds, e
            ))
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=100.0).contains(&self.hotness_compression) {
            return Err(SelectorError::InvalidConfig(format!(
                "hotness_compression must be in [0, 100], got {}",
                self.hotness_compression
            )));
        }

        if !(0.0..=100.0).contains(&self.min_similarity) {
            return Err(SelectorError::InvalidConfig(format!(
                "min_similarity must be in [0, 100], got {}",
                self.min_similarity
            )));
        }

        if self.max_selected_samples < 1 {
            return Err(SelectorError::InvalidConfig(format!(
                "max_selected_samples must be >= 1, got {}",
                self.max_selected_samples
            )));
        }

        // Also rejects NaN
        if !(self.time_limit_seconds > 0.0 && self.time_limit_seconds <= MAX_TIME_LIMIT_SECONDS) {
            return Err(SelectorError::InvalidConfig(format!(
                "time_limit_seconds must be in (0, {}], got {}",
                MAX_TIME_LIMIT_SECONDS, self.time_limit_seconds
            )));
        }

        if self.threads_count < 1 {
            return Err(SelectorError::InvalidConfig(format!(
                "threads_count must be >= 1, got {}",
                self.threads_count
            )));
        }

        if self.weight_precision > 12 || self.similarity_precision > 12 {
            return Err(SelectorError::InvalidConfig(format!(
                "precision must be at most 12 decimal places, got weight={} similarity={}",
                self.weight_precision, self.similarity_precision
            )));
        }

        Ok(())
    }
}
