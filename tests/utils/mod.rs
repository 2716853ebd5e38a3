// Shared helpers for integration tests
//
// Builds histogram record files and artifact directory layouts on disk.

#![allow(dead_code)]

use selector::histogram::ProfileRecord;
use std::fs;
use std::path::{Path, PathBuf};

/// Path of a file under tests/fixtures
pub fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

/// Write records as a histos.json file into `dir`
pub fn write_records(dir: &Path, records: &[ProfileRecord]) -> PathBuf {
    let path = dir.join("histos.json");
    fs::write(&path, serde_json::to_string_pretty(records).unwrap()).unwrap();
    path
}

/// Create `<root>/<artifact>/run/profile.histo` and return the profile path
pub fn make_artifact(root: &Path, artifact: &str) -> PathBuf {
    let run = root.join(artifact).join("run");
    fs::create_dir_all(&run).unwrap();
    fs::write(run.join("output.log"), artifact).unwrap();
    let profile = run.join("profile.histo");
    fs::write(&profile, "{}").unwrap();
    profile
}

/// Reference that is exactly ½·left + ½·right after normalization
pub fn two_way_mixture() -> Vec<ProfileRecord> {
    vec![
        ProfileRecord::reference("prod.histo", &[("a", 10), ("b", 10), ("c", 20)]),
        ProfileRecord::sample("left.histo", &[("a", 5), ("c", 5)]),
        ProfileRecord::sample("right.histo", &[("b", 30), ("c", 30)]),
        ProfileRecord::sample("noise.histo", &[("d", 7)]),
    ]
}
