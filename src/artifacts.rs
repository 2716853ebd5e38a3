//! Artifact export for a finished decomposition
//!
//! Each profile lives somewhere inside the build artifact that produced it.
//! Exporting copies the artifact root (found by climbing a fixed number of
//! directory levels from the profile) of the reference and every selected
//! sample into a work directory, and writes a `weight` file that pairs each
//! copied sample artifact with its weight.

use crate::solver::DecompositionRecord;
use anyhow::{bail, Context, Result};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Name of the weight file written into the work directory
pub const WEIGHT_FILE: &str = "weight";

/// How far above each profile its artifact root sits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArtifactDepths {
    pub reference: usize,
    pub sample: usize,
}

impl Default for ArtifactDepths {
    fn default() -> Self {
        Self {
            reference: 2,
            sample: 2,
        }
    }
}

/// Summary of one export
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportReport {
    pub reference_artifact: String,
    pub sample_artifacts: Vec<String>,
    pub weight_file: PathBuf,
}

/// Load a decomposition record written by `selector solve`
pub fn load_record<P: AsRef<Path>>(path: P) -> Result<DecompositionRecord> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to load decomposition record {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Invalid decomposition record in {}", path.display()))
}

/// Directory `depth` levels above `profile` (the file itself for depth 0)
pub fn artifact_root(profile: &Path, depth: usize) -> Result<PathBuf> {
    let mut root = profile.to_path_buf();
    for _ in 0..depth {
        root = match root.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => bail!(
                "Profile {} has fewer than {} parent directories",
                profile.display(),
                depth
            ),
        };
    }
    Ok(root)
}

/// Copy the artifact containing `profile` into `destination`
///
/// Returns the copied artifact's name. Existing files at the destination are
/// overwritten.
pub fn copy_artifact(profile: &Path, depth: usize, destination: &Path) -> Result<String> {
    let source = artifact_root(profile, depth)?;
    let name = source
        .file_name()
        .with_context(|| format!("Artifact root {} has no name", source.display()))?
        .to_string_lossy()
        .into_owned();
    let target = destination.join(&name);

    if source.is_dir() {
        copy_tree(&source, &target)?;
    } else {
        fs::copy(&source, &target).with_context(|| {
            format!("Failed to copy {} to {}", source.display(), target.display())
        })?;
    }

    tracing::debug!("Copied artifact {} -> {}", source.display(), target.display());
    Ok(name)
}

fn copy_tree(source: &Path, target: &Path) -> Result<()> {
    for entry in WalkDir::new(source).follow_links(false) {
        let entry = entry.with_context(|| format!("Failed to walk {}", source.display()))?;
        let relative = entry
            .path()
            .strip_prefix(source)
            .with_context(|| format!("Unexpected path {}", entry.path().display()))?;
        let dest = target.join(relative);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&dest)
                .with_context(|| format!("Failed to create {}", dest.display()))?;
        } else if entry.file_type().is_file() {
            fs::copy(entry.path(), &dest).with_context(|| {
                format!("Failed to copy {} to {}", entry.path().display(), dest.display())
            })?;
        }
    }
    Ok(())
}

/// Copy all artifacts of `record` into `work_dir` and write the weight file
pub fn export_artifacts(
    record: &DecompositionRecord,
    work_dir: &Path,
    depths: ArtifactDepths,
) -> Result<ExportReport> {
    if !work_dir.is_dir() {
        bail!("Work directory {} does not exist", work_dir.display());
    }

    let reference_artifact =
        copy_artifact(Path::new(&record.reference_file), depths.reference, work_dir)?;

    let mut sample_artifacts = Vec::with_capacity(record.selected_samples.len());
    let mut lines = String::new();
    for sample in &record.selected_samples {
        let name = copy_artifact(Path::new(&sample.sample_path), depths.sample, work_dir)?;
        lines.push_str(&format!("{} {}\n", name, sample.weight));
        sample_artifacts.push(name);
    }

    let weight_file = work_dir.join(WEIGHT_FILE);
    let mut file = fs::File::create(&weight_file)
        .with_context(|| format!("Failed to create {}", weight_file.display()))?;
    file.write_all(lines.as_bytes())
        .with_context(|| format!("Failed to write {}", weight_file.display()))?;

    tracing::info!(
        "Exported {} artifact(s); weights written to {}",
        sample_artifacts.len() + 1,
        weight_file.display()
    );

    Ok(ExportReport {
        reference_artifact,
        sample_artifacts,
        weight_file,
    })
}
