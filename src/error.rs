//! Error types for histogram decomposition
//!
//! Only input problems are fatal. A degenerate compression, a solver timeout and
//! an unreachable similarity threshold all still produce a selection result, so
//! none of them appear here.

use thiserror::Error;

/// Errors surfaced before (or instead of) a solve attempt
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SelectorError {
    #[error("No reference histogram found")]
    MissingReference,

    #[error("Expected exactly one reference histogram, found {0}")]
    MultipleReferences(usize),

    #[error("Reference histogram is empty in '{0}'")]
    EmptyReference(String),

    #[error("No valid sample histograms found")]
    NoSamples,

    #[error("Negative count {count} for identifier '{identifier}' in '{source_path}'")]
    NegativeCount {
        source_path: String,
        identifier: String,
        count: i64,
    },

    #[error("Malformed histogram record: {0}")]
    Malformed(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Identifier universe is empty after hotness compression at {0}%")]
    EmptyUniverse(f64),

    #[error("Solver failed: {0}")]
    Solver(String),
}

impl SelectorError {
    /// Whether this error belongs to the fatal input-error family
    ///
    /// Solver failures are reported separately: they indicate a broken
    /// backend rather than bad data.
    pub fn is_input_error(&self) -> bool {
        !matches!(self, SelectorError::Solver(_))
    }
}

/// Result type for decomposition operations
pub type Result<T> = std::result::Result<T, SelectorError>;
