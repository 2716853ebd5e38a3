//! Profile discovery
//!
//! Walks a reference directory and a sample directory for profile files whose
//! names match a shell-style mask, and produces the manifest consumed by the
//! histogram builder.

use crate::error::SelectorError;
use crate::histogram::ProfileKind;
use anyhow::{Context, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Mask used when none is given
pub const DEFAULT_LOOKUP_MASK: &str = "*.histo";

/// One discovered profile file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ManifestEntry {
    #[serde(rename = "type")]
    pub kind: ProfileKind,
    #[serde(alias = "source_file")]
    pub source_path: String,
}

/// File-name matcher compiled from a mask using `*` and `?`
#[derive(Debug, Clone)]
pub struct LookupMask {
    mask: String,
    regex: Regex,
}

impl LookupMask {
    /// Compile a mask such as `*.histo` or `test_??.jfr`
    ///
    /// # Example
    /// ```
    /// use selector::discovery::LookupMask;
    ///
    /// let mask = LookupMask::new("*.histo").unwrap();
    /// assert!(mask.matches("unit_test.histo"));
    /// assert!(!mask.matches("unit_test.histo.bak"));
    /// ```
    pub fn new(mask: &str) -> Result<Self> {
        let mut pattern = String::with_capacity(mask.len() + 8);
        pattern.push('^');
        for c in mask.chars() {
            match c {
                '*' => pattern.push_str(".*"),
                '?' => pattern.push('.'),
                other => pattern.push_str(&regex::escape(&other.to_string())),
            }
        }
        pattern.push('$');

        let regex = Regex::new(&pattern)
            .with_context(|| format!("Invalid lookup mask '{}'", mask))?;
        Ok(Self {
            mask: mask.to_string(),
            regex,
        })
    }

    pub fn matches(&self, file_name: &str) -> bool {
        self.regex.is_match(file_name)
    }

    pub fn as_str(&self) -> &str {
        &self.mask
    }
}

/// Recursively collect matching files under `dir`, as absolute sorted paths
pub fn find_profiles(dir: &Path, mask: &LookupMask) -> Result<Vec<PathBuf>> {
    let root = fs::canonicalize(dir)
        .with_context(|| format!("Failed to access directory {}", dir.display()))?;

    let mut files = Vec::new();
    for entry in WalkDir::new(&root).follow_links(false) {
        let entry = entry.with_context(|| format!("Failed to walk {}", root.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        if entry.file_name().to_str().is_some_and(|name| mask.matches(name)) {
            files.push(entry.path().to_path_buf());
        }
    }
    files.sort();
    Ok(files)
}

/// Build the manifest: one reference followed by samples in path order
///
/// Files found under the reference directory never appear as samples, even
/// when the sample directory contains the reference directory.
///
/// # Errors
/// `SelectorError::MissingReference` / `MultipleReferences` unless exactly
/// one reference file matches; I/O errors while walking either directory.
pub fn discover(
    reference_dir: &Path,
    sample_dir: &Path,
    mask: &LookupMask,
) -> Result<Vec<ManifestEntry>> {
    let references = find_profiles(reference_dir, mask)?;
    let samples: Vec<PathBuf> = find_profiles(sample_dir, mask)?
        .into_iter()
        .filter(|path| !references.contains(path))
        .collect();

    tracing::info!(
        "Found {} reference file(s) and {} sample file(s) matching '{}'",
        references.len(),
        samples.len(),
        mask.as_str()
    );

    let reference = match references.as_slice() {
        [single] => single,
        [] => return Err(SelectorError::MissingReference.into()),
        many => return Err(SelectorError::MultipleReferences(many.len()).into()),
    };

    let mut manifest = Vec::with_capacity(samples.len() + 1);
    manifest.push(ManifestEntry {
        kind: ProfileKind::Reference,
        source_path: reference.display().to_string(),
    });
    manifest.extend(samples.iter().map(|path| ManifestEntry {
        kind: ProfileKind::Sample,
        source_path: path.display().to_string(),
    }));
    Ok(manifest)
}
