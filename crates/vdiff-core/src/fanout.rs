//! Concurrent per-file comparison over the paired trees.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use futures_util::future::try_join_all;
use tokio::fs;

use crate::capability::{ArtifactSource, Comparator, ComparisonRequest};
use crate::error::{CoreError, CoreResult};
use crate::filter::PathFilter;
use crate::model::{ImageDiff, Tuning};
use crate::pairing::{PairedFile, PairedTrees};

/// Where comparisons come from and where their images go.
#[derive(Clone, Copy)]
pub struct DiffTarget<'a> {
    /// Comparison mode.
    pub mode: &'a str,
    /// Storage prefix of the reference artifacts.
    pub expect_prefix: &'a str,
    /// Storage prefix of the candidate artifacts.
    pub actual_prefix: &'a str,
    /// Comparator tuning values.
    pub tuning: Tuning,
    /// Directory receiving difference images.
    pub diff_dir: &'a Path,
    /// Source used to derive file URLs.
    pub source: &'a dyn ArtifactSource,
}

/// Compare every common, filter-accepted path concurrently.
///
/// `progress(completed, total)` runs after each comparison with a strictly
/// increasing `completed`. The first failure aborts the remaining work.
/// Results come back in path order.
///
/// # Errors
///
/// Returns the first comparator error, or [`CoreError::Io`] when a
/// difference image cannot be written.
pub async fn diff_all<P>(
    pairs: &PairedTrees,
    filter: &PathFilter,
    target: &DiffTarget<'_>,
    comparator: &dyn Comparator,
    progress: P,
) -> CoreResult<Vec<ImageDiff>>
where
    P: Fn(usize, usize) + Send + Sync,
{
    let selected: Vec<&PairedFile> = pairs
        .common
        .iter()
        .filter(|pair| filter.accepts(&pair.path))
        .collect();
    let total = selected.len();
    let completed = AtomicUsize::new(0);

    let tasks = selected.into_iter().map(|pair| {
        let completed = &completed;
        let progress = &progress;
        async move {
            let diff = diff_one(pair, target, comparator).await?;
            let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
            progress(done, total);
            Ok::<_, CoreError>(diff)
        }
    });
    try_join_all(tasks).await
}

async fn diff_one(
    pair: &PairedFile,
    target: &DiffTarget<'_>,
    comparator: &dyn Comparator,
) -> CoreResult<ImageDiff> {
    let request = ComparisonRequest {
        mode: target.mode.to_string(),
        path: pair.path.clone(),
        actual_file: pair.actual.clone(),
        expect_file: pair.expect.clone(),
        actual_url: target.source.file_url(target.actual_prefix, &pair.path),
        expect_url: target.source.file_url(target.expect_prefix, &pair.path),
        tuning: target.tuning,
    };
    let comparison = comparator.compare(&request).await?;

    let image_path = target.diff_dir.join(pair.path.trim_start_matches('/'));
    if let Some(parent) = image_path.parent() {
        fs::create_dir_all(parent)
            .await
            .map_err(|err| CoreError::io("fanout.create_diff_dir", parent, err))?;
    }
    fs::write(&image_path, &comparison.image)
        .await
        .map_err(|err| CoreError::io("fanout.write_diff_image", &image_path, err))?;

    Ok(ImageDiff {
        path: pair.path.clone(),
        percentage: comparison.percentage,
    })
}
