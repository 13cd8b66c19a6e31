//! Narrow contracts for the external collaborators of a build.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::error::CoreResult;
use crate::model::Tuning;
use crate::notify::Notification;

/// Object store view: fetches one prefix into a local directory.
#[async_trait]
pub trait ArtifactSource: Send + Sync {
    /// Copy every object under `prefix` into `local_dir`, preserving relative
    /// paths. Not retried.
    ///
    /// # Errors
    ///
    /// Returns [`crate::CoreError::Download`] when the prefix cannot be fetched.
    async fn fetch(&self, prefix: &str, local_dir: &Path) -> CoreResult<()>;

    /// URL under which the comparator can read `relative` (a `/`-prefixed
    /// path) inside `prefix`.
    fn file_url(&self, prefix: &str, relative: &str) -> String;
}

/// Inputs of one file comparison.
#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonRequest {
    /// Comparison mode.
    pub mode: String,
    /// `/`-prefixed relative path.
    pub path: String,
    /// Local copy of the candidate file.
    pub actual_file: PathBuf,
    /// Local copy of the reference file.
    pub expect_file: PathBuf,
    /// Remote location of the candidate file.
    pub actual_url: String,
    /// Remote location of the reference file.
    pub expect_url: String,
    /// Comparator tuning values.
    pub tuning: Tuning,
}

/// Outcome of one file comparison.
#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    /// Fraction of differing pixels.
    pub percentage: f64,
    /// Encoded difference image.
    pub image: Vec<u8>,
}

/// Per-file image comparison service.
#[async_trait]
pub trait Comparator: Send + Sync {
    /// Compare one pair of files.
    ///
    /// # Errors
    ///
    /// Returns [`crate::CoreError::Comparison`] when the comparison fails.
    async fn compare(&self, request: &ComparisonRequest) -> CoreResult<Comparison>;
}

/// Best-effort chat notification channel.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver a notification.
    ///
    /// # Errors
    ///
    /// Returns [`crate::CoreError::Notify`] when delivery fails; callers log
    /// and continue.
    async fn send(&self, notification: &Notification) -> CoreResult<()>;
}
