//! CLI argument parsing for Selector

use crate::config::SelectorConfig;
use crate::discovery::DEFAULT_LOOKUP_MASK;
use anyhow::Context;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "selector")]
#[command(version)]
#[command(
    about = "Approximate a production profile with a weighted mix of unit-test profiles",
    long_about = None
)]
pub struct Cli {
    /// Enable debug tracing output to stderr
    #[arg(long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Find reference and sample profiles and write a manifest
    Discover(DiscoverArgs),
    /// Select samples that best reproduce the reference histogram
    Solve(SolveArgs),
    /// Copy the selected artifacts and write the weight file
    Export(ExportArgs),
}

#[derive(Args, Debug)]
pub struct DiscoverArgs {
    /// Directory containing the reference (production) profile
    #[arg(long, value_name = "DIR")]
    pub reference_dir: PathBuf,

    /// Directory containing sample (unit test) profiles
    #[arg(long, value_name = "DIR")]
    pub sample_dir: PathBuf,

    /// File name mask identifying profiles (`*` and `?` wildcards)
    #[arg(long, value_name = "MASK", default_value = DEFAULT_LOOKUP_MASK)]
    pub lookup_mask: String,

    /// Write the manifest here instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

/// Built-in configuration presets
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Preset {
    Default,
    Strict,
    Permissive,
}

impl Preset {
    pub fn config(self) -> SelectorConfig {
        match self {
            Preset::Default => SelectorConfig::default(),
            Preset::Strict => SelectorConfig::strict(),
            Preset::Permissive => SelectorConfig::permissive(),
        }
    }
}

#[derive(Args, Debug)]
pub struct SolveArgs {
    /// JSON array of histogram records (histos.json)
    #[arg(short, long, value_name = "FILE")]
    pub input: PathBuf,

    /// Write the result record here instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// TOML configuration file (selector.toml)
    #[arg(long, value_name = "FILE", conflicts_with = "preset")]
    pub config: Option<PathBuf>,

    /// Start from a built-in configuration preset
    #[arg(long, value_enum)]
    pub preset: Option<Preset>,

    /// Cumulative call share (0-100) kept by hotness filtering
    #[arg(long, value_name = "PERCENT")]
    pub hotness_compression: Option<f64>,

    /// Merge identifiers that are uniformly equal across all histograms
    #[arg(long, value_name = "BOOL")]
    pub block_compression: Option<bool>,

    /// Minimum similarity (0-100) the selection should reach
    #[arg(long, value_name = "PERCENT")]
    pub min_similarity: Option<f64>,

    /// Maximum number of samples with non-zero weight
    #[arg(short = 'k', long, value_name = "K")]
    pub max_selected_samples: Option<usize>,

    /// Solver time budget in seconds, shared by both phases
    #[arg(long = "time-limit", value_name = "SECONDS")]
    pub time_limit_seconds: Option<f64>,

    /// Solver worker threads
    #[arg(short = 'j', long = "threads", value_name = "N")]
    pub threads_count: Option<usize>,

    /// Decimal places for reported weights
    #[arg(long, value_name = "DIGITS")]
    pub weight_precision: Option<u32>,

    /// Decimal places for the reported similarity
    #[arg(long, value_name = "DIGITS")]
    pub similarity_precision: Option<u32>,
}

impl SolveArgs {
    /// Defaults or preset, then config file, then flags; validated
    pub fn resolve_config(&self) -> anyhow::Result<SelectorConfig> {
        let mut config = match (&self.config, self.preset) {
            (Some(path), _) => SelectorConfig::from_file(path)?,
            (None, Some(preset)) => preset.config(),
            (None, None) => SelectorConfig::default(),
        };

        if let Some(v) = self.hotness_compression {
            config.hotness_compression = v;
        }
        if let Some(v) = self.block_compression {
            config.block_compression = v;
        }
        if let Some(v) = self.min_similarity {
            config.min_similarity = v;
        }
        if let Some(v) = self.max_selected_samples {
            config.max_selected_samples = v;
        }
        if let Some(v) = self.time_limit_seconds {
            config.time_limit_seconds = v;
        }
        if let Some(v) = self.threads_count {
            config.threads_count = v;
        }
        if let Some(v) = self.weight_precision {
            config.weight_precision = v;
        }
        if let Some(v) = self.similarity_precision {
            config.similarity_precision = v;
        }

        config.validate().context("Invalid solver configuration")?;
        Ok(config)
    }
}

#[derive(Args, Debug)]
pub struct ExportArgs {
    /// Decomposition record written by `selector solve`
    #[arg(short, long, value_name = "FILE")]
    pub input: PathBuf,

    /// Destination for copied artifacts and the weight file
    #[arg(long, value_name = "DIR")]
    pub work_dir: PathBuf,

    /// Directory levels from the reference profile up to its artifact root
    #[arg(long, value_name = "DEPTH", default_value = "2")]
    pub reference_artifact_depth: usize,

    /// Directory levels from each sample profile up to its artifact root
    #[arg(long, value_name = "DEPTH", default_value = "2")]
    pub sample_artifact_depth: usize,
}
