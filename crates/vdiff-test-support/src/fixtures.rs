//! Scratch directory fixtures.
//!
//! Temporary directories live under `<repo>/.server_root` so test artefacts
//! stay inside the workspace and are easy to inspect after a failure.

use std::fs;
use std::path::PathBuf;

use tempfile::TempDir;

use crate::TestResult;

/// Locate the workspace root by walking up from this crate's manifest.
#[must_use]
pub fn repo_root() -> PathBuf {
    let manifest_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    for ancestor in manifest_dir.ancestors() {
        let manifest = ancestor.join("Cargo.toml");
        if fs::read_to_string(&manifest).is_ok_and(|text| text.contains("[workspace]")) {
            return ancestor.to_path_buf();
        }
    }
    manifest_dir
}

/// Directory that hosts all scratch directories, created on demand.
///
/// # Errors
///
/// Returns an error if the directory cannot be created.
pub fn server_root() -> TestResult<PathBuf> {
    let root = repo_root().join(".server_root");
    fs::create_dir_all(&root)?;
    Ok(root)
}

/// Fresh scratch directory removed when the handle drops.
///
/// # Errors
///
/// Returns an error if the directory cannot be created.
pub fn temp_dir(prefix: &str) -> TestResult<TempDir> {
    Ok(tempfile::Builder::new()
        .prefix(&format!("vdiff-{prefix}-"))
        .tempdir_in(server_root()?)?)
}
