//! Selector - histogram decomposition of a production profile into unit tests
//!
//! Given call-stack histograms for one reference workload and many samples,
//! this library finds a small weighted combination of samples whose merged
//! histogram is as close as possible to the reference. The pipeline:
//!
//! 1. [`histogram`]: validate input records
//! 2. [`compression`]: shrink the identifier universe (hotness + blocks)
//! 3. [`store`]: align every histogram to one dense, normalized layout
//! 4. [`solver`]: two-phase MILP selection over a [`milp`] backend
//! 5. [`artifacts`]: copy the selected artifacts and write weights

pub mod artifacts;
pub mod cli;
pub mod compression;
pub mod config;
pub mod discovery;
pub mod error;
pub mod histogram;
pub mod milp;
pub mod pipeline;
pub mod similarity;
pub mod solver;
pub mod store;

pub use config::SelectorConfig;
pub use error::{Result, SelectorError};
pub use pipeline::{decompose, Decomposition};
