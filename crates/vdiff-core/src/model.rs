//! Build request, validated build parameters, and the persisted report.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::filter::PathFilter;

/// Threshold applied when a request omits it or passes zero.
pub const DEFAULT_THRESHOLD: f64 = 0.005;

/// Numeric field accepted as a JSON number or a numeric string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NumberInput {
    /// Plain JSON number.
    Number(f64),
    /// Number encoded as a string, e.g. from a query string.
    Text(String),
}

impl NumberInput {
    fn resolve(&self, field: &'static str) -> CoreResult<Option<f64>> {
        let value = match self {
            Self::Number(value) => *value,
            Self::Text(text) => {
                let text = text.trim();
                if text.is_empty() {
                    return Ok(None);
                }
                text.parse::<f64>().map_err(|_| {
                    CoreError::validation(field, "not_a_number", Some(text.to_string()))
                })?
            }
        };
        if !value.is_finite() {
            return Err(CoreError::validation(
                field,
                "not_finite",
                Some(value.to_string()),
            ));
        }
        Ok(Some(value))
    }
}

impl From<f64> for NumberInput {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

/// One pattern or a list of patterns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathFilterInput {
    /// Single pattern.
    One(String),
    /// Several patterns, all of which must match.
    Many(Vec<String>),
}

impl PathFilterInput {
    fn into_vec(self) -> Vec<String> {
        match self {
            Self::One(pattern) => vec![pattern],
            Self::Many(patterns) => patterns,
        }
    }
}

/// Wire form of a build request. Unknown fields are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildRequest {
    /// Comparison mode forwarded to the comparator.
    #[serde(default)]
    pub mode: String,
    /// Storage prefix of the reference artifacts.
    #[serde(default)]
    pub expect_path: String,
    /// Storage prefix of the candidate artifacts.
    #[serde(default)]
    pub actual_path: String,
    /// Difference ratio above which an image counts as exceeding.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold: Option<NumberInput>,
    /// Regex patterns a relative path must all match to be compared.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path_filters: Option<PathFilterInput>,
    /// Comparator tuning: radius.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub radius: Option<NumberInput>,
    /// Comparator tuning: stroke width.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub swidth: Option<NumberInput>,
    /// Comparator tuning: colour distance.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub colordist: Option<NumberInput>,
}

impl BuildRequest {
    /// Request comparing `actual_path` against `expect_path` with defaults.
    #[must_use]
    pub fn new(
        mode: impl Into<String>,
        expect_path: impl Into<String>,
        actual_path: impl Into<String>,
    ) -> Self {
        Self {
            mode: mode.into(),
            expect_path: expect_path.into(),
            actual_path: actual_path.into(),
            ..Self::default()
        }
    }
}

/// Optional comparator tuning values. Zero is normalised to absent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Tuning {
    /// Radius parameter.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub radius: Option<f64>,
    /// Stroke width parameter.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub swidth: Option<f64>,
    /// Colour distance parameter.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub colordist: Option<f64>,
}

/// Validated, immutable build descriptor and the sole input to fingerprinting.
///
/// Field order is fixed and filters are sorted and de-duplicated, so the JSON
/// encoding is canonical.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildParam {
    mode: String,
    expect_path: String,
    actual_path: String,
    threshold: f64,
    path_filters: Vec<String>,
    radius: Option<f64>,
    swidth: Option<f64>,
    colordist: Option<f64>,
}

impl BuildParam {
    /// Validate a request into build parameters.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Validation`] for empty or identical paths, an empty
    /// mode, non-numeric or non-finite numbers and negative thresholds, and
    /// [`CoreError::InvalidPattern`] for malformed path filters.
    pub fn new(request: BuildRequest) -> CoreResult<Self> {
        let mode = require_non_empty("mode", request.mode)?;
        let expect_path = require_non_empty("expect_path", request.expect_path)?;
        let actual_path = require_non_empty("actual_path", request.actual_path)?;
        if expect_path == actual_path {
            return Err(CoreError::validation(
                "actual_path",
                "same_as_expect_path",
                Some(actual_path),
            ));
        }

        let threshold = match resolve_number("threshold", request.threshold.as_ref())? {
            None => DEFAULT_THRESHOLD,
            Some(value) if value == 0.0 => DEFAULT_THRESHOLD,
            Some(value) if value < 0.0 => {
                return Err(CoreError::validation(
                    "threshold",
                    "negative",
                    Some(value.to_string()),
                ));
            }
            Some(value) => value,
        };

        let mut path_filters = request
            .path_filters
            .map(PathFilterInput::into_vec)
            .unwrap_or_default();
        path_filters.sort();
        path_filters.dedup();
        PathFilter::compile(&path_filters)?;

        Ok(Self {
            mode,
            expect_path,
            actual_path,
            threshold,
            path_filters,
            radius: resolve_tuning("radius", request.radius.as_ref())?,
            swidth: resolve_tuning("swidth", request.swidth.as_ref())?,
            colordist: resolve_tuning("colordist", request.colordist.as_ref())?,
        })
    }

    /// Comparison mode.
    #[must_use]
    pub fn mode(&self) -> &str {
        &self.mode
    }

    /// Storage prefix of the reference artifacts.
    #[must_use]
    pub fn expect_path(&self) -> &str {
        &self.expect_path
    }

    /// Storage prefix of the candidate artifacts.
    #[must_use]
    pub fn actual_path(&self) -> &str {
        &self.actual_path
    }

    /// Effective threshold.
    #[must_use]
    pub const fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Sorted, de-duplicated path filter patterns.
    #[must_use]
    pub fn path_filters(&self) -> &[String] {
        &self.path_filters
    }

    /// Comparator tuning values.
    #[must_use]
    pub const fn tuning(&self) -> Tuning {
        Tuning {
            radius: self.radius,
            swidth: self.swidth,
            colordist: self.colordist,
        }
    }
}

impl TryFrom<BuildRequest> for BuildParam {
    type Error = CoreError;

    fn try_from(request: BuildRequest) -> CoreResult<Self> {
        Self::new(request)
    }
}

fn require_non_empty(field: &'static str, value: String) -> CoreResult<String> {
    if value.trim().is_empty() {
        return Err(CoreError::validation(field, "empty", None));
    }
    Ok(value)
}

fn resolve_number(field: &'static str, input: Option<&NumberInput>) -> CoreResult<Option<f64>> {
    input.map_or(Ok(None), |input| input.resolve(field))
}

fn resolve_tuning(field: &'static str, input: Option<&NumberInput>) -> CoreResult<Option<f64>> {
    Ok(resolve_number(field, input)?.filter(|value| *value != 0.0))
}

/// Difference score of one compared file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageDiff {
    /// `/`-prefixed relative path.
    pub path: String,
    /// Fraction of differing pixels reported by the comparator.
    pub percentage: f64,
}

/// Aggregated outcome of a build, persisted as `index.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    /// Fingerprint of the build parameters.
    pub fingerprint: String,
    /// Per-file scores sorted by path.
    pub images: Vec<ImageDiff>,
    /// Paths present only in the actual tree.
    pub new_images: Vec<String>,
    /// Paths present only in the expect tree.
    pub del_images: Vec<String>,
    /// Highest score, 0 when nothing was compared.
    pub max_percentage: f64,
    /// Mean score, 0 when nothing was compared.
    pub avg_percentage: f64,
    /// Images with a non-zero score.
    pub diff_count: usize,
    /// Threshold the counts below were computed with.
    pub threshold: f64,
    /// Images scoring above the threshold.
    pub exceeding_count: usize,
    /// Images scoring above zero and at most the threshold.
    pub near_threshold_count: usize,
}
