//! Summary statistics over per-file comparison scores.

use crate::model::{ImageDiff, Report};

/// Build the report for one finished build.
///
/// Images are sorted by path. Maximum and mean are `0` when nothing was
/// compared. An image exceeds the threshold strictly above it; an image is
/// near the threshold when its score is above zero and at most the threshold.
#[must_use]
pub fn aggregate(
    fingerprint: &str,
    mut images: Vec<ImageDiff>,
    new_images: Vec<String>,
    del_images: Vec<String>,
    threshold: f64,
) -> Report {
    images.sort_by(|left, right| left.path.cmp(&right.path));

    let max_percentage = images
        .iter()
        .map(|image| image.percentage)
        .fold(0.0_f64, f64::max);
    let avg_percentage = mean(&images);
    let diff_count = images.iter().filter(|image| image.percentage > 0.0).count();
    let exceeding_count = images
        .iter()
        .filter(|image| image.percentage > threshold)
        .count();
    let near_threshold_count = images
        .iter()
        .filter(|image| image.percentage > 0.0 && image.percentage <= threshold)
        .count();

    Report {
        fingerprint: fingerprint.to_string(),
        images,
        new_images,
        del_images,
        max_percentage,
        avg_percentage,
        diff_count,
        threshold,
        exceeding_count,
        near_threshold_count,
    }
}

fn mean(images: &[ImageDiff]) -> f64 {
    if images.is_empty() {
        return 0.0;
    }
    let total: f64 = images.iter().map(|image| image.percentage).sum();
    #[allow(clippy::cast_precision_loss)]
    let count = images.len() as f64;
    total / count
}
