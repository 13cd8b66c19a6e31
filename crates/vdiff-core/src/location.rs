//! Fingerprinting and the per-build directory layout.
//!
//! ```text
//! <work_dir>/<hash>/
//!   actual/        candidate artifacts
//!   expect/        reference artifacts
//!   diff/          rendered difference images
//!   index.json     persisted report
//!   building.now   lock marker
//! ```

use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::error::{CoreError, CoreResult};
use crate::model::BuildParam;

const ACTUAL_DIR: &str = "actual";
const EXPECT_DIR: &str = "expect";
const DIFF_DIR: &str = "diff";
const RESULT_FILE: &str = "index.json";
const LOCK_MARKER: &str = "building.now";

/// Deterministic paths for one set of build parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkLocation {
    hash: String,
    root: PathBuf,
    actual_dir: PathBuf,
    expect_dir: PathBuf,
    diff_dir: PathBuf,
    result_file: PathBuf,
    lock_marker: PathBuf,
}

impl WorkLocation {
    /// Resolve the layout for `param` below `work_dir`. No I/O.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Hash`] if the parameters cannot be encoded.
    pub fn resolve(work_dir: &Path, param: &BuildParam) -> CoreResult<Self> {
        let hash = fingerprint(param)?;
        let root = work_dir.join(&hash);
        Ok(Self {
            actual_dir: root.join(ACTUAL_DIR),
            expect_dir: root.join(EXPECT_DIR),
            diff_dir: root.join(DIFF_DIR),
            result_file: root.join(RESULT_FILE),
            lock_marker: root.join(LOCK_MARKER),
            root,
            hash,
        })
    }

    /// Lowercase hex fingerprint.
    #[must_use]
    pub fn hash(&self) -> &str {
        &self.hash
    }

    /// Build workspace directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Local copy of the candidate artifacts.
    #[must_use]
    pub fn actual_dir(&self) -> &Path {
        &self.actual_dir
    }

    /// Local copy of the reference artifacts.
    #[must_use]
    pub fn expect_dir(&self) -> &Path {
        &self.expect_dir
    }

    /// Rendered difference images.
    #[must_use]
    pub fn diff_dir(&self) -> &Path {
        &self.diff_dir
    }

    /// Persisted report.
    #[must_use]
    pub fn result_file(&self) -> &Path {
        &self.result_file
    }

    /// Lock marker file.
    #[must_use]
    pub fn lock_marker(&self) -> &Path {
        &self.lock_marker
    }
}

/// Hex SHA-256 of the canonical JSON encoding of `param`.
///
/// # Errors
///
/// Returns [`CoreError::Hash`] if the parameters cannot be encoded.
pub fn fingerprint(param: &BuildParam) -> CoreResult<String> {
    let canonical = serde_json::to_vec(param).map_err(|source| CoreError::Hash { source })?;
    let digest = Sha256::digest(&canonical);
    Ok(format!("{digest:x}"))
}
