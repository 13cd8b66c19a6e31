//! Report view with asset URLs attached, as served to report viewers.

use serde::Serialize;

use crate::model::Report;

/// Compared image with links to its three renditions.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageResource {
    /// `/`-prefixed relative path.
    pub path: String,
    /// Difference score.
    pub percentage: f64,
    /// Candidate image URL.
    pub actual_image_path: String,
    /// Reference image URL.
    pub expect_image_path: String,
    /// Difference image URL.
    pub diff_image_path: String,
}

/// New or deleted image with a link to its only rendition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetLink {
    /// `/`-prefixed relative path.
    pub path: String,
    /// Image URL.
    pub image_path: String,
}

/// Report plus asset URLs.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportResource {
    /// Fingerprint of the build parameters.
    pub fingerprint: String,
    /// Compared images sorted by path.
    pub images: Vec<ImageResource>,
    /// Images only in the candidate tree.
    pub new_images: Vec<AssetLink>,
    /// Images only in the reference tree.
    pub del_images: Vec<AssetLink>,
    /// Highest score.
    pub max_percentage: f64,
    /// Mean score.
    pub avg_percentage: f64,
    /// Images with a non-zero score.
    pub diff_count: usize,
    /// Threshold of the build.
    pub threshold: f64,
    /// Images above the threshold.
    pub exceeding_count: usize,
    /// Images above zero and at most the threshold.
    pub near_threshold_count: usize,
}

impl ReportResource {
    /// Attach URLs under `asset_uri` (no trailing slash) to every image.
    #[must_use]
    pub fn from_report(report: &Report, asset_uri: &str) -> Self {
        let link = |kind: &str, path: &str| format!("{asset_uri}/{kind}{path}");
        Self {
            fingerprint: report.fingerprint.clone(),
            images: report
                .images
                .iter()
                .map(|image| ImageResource {
                    path: image.path.clone(),
                    percentage: image.percentage,
                    actual_image_path: link("actual", &image.path),
                    expect_image_path: link("expect", &image.path),
                    diff_image_path: link("diff", &image.path),
                })
                .collect(),
            new_images: report
                .new_images
                .iter()
                .map(|path| AssetLink {
                    path: path.clone(),
                    image_path: link("actual", path),
                })
                .collect(),
            del_images: report
                .del_images
                .iter()
                .map(|path| AssetLink {
                    path: path.clone(),
                    image_path: link("expect", path),
                })
                .collect(),
            max_percentage: report.max_percentage,
            avg_percentage: report.avg_percentage,
            diff_count: report.diff_count,
            threshold: report.threshold,
            exceeding_count: report.exceeding_count,
            near_threshold_count: report.near_threshold_count,
        }
    }
}
