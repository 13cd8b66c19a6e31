//! Image comparison over HTTP.
//!
//! The service receives `{ mode, actual, expect, radius?, swidth?, colordist? }`
//! with file URLs and answers `{ percent, image }`, where `image` is the
//! base64-encoded difference image.

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;
use vdiff_core::{Comparator, Comparison, ComparisonRequest, CoreResult};

use crate::error::{AdapterError, AdapterResult};

#[derive(Debug, Serialize)]
struct CompareBody<'a> {
    mode: &'a str,
    actual: &'a str,
    expect: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    radius: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    swidth: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    colordist: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct CompareResponse {
    #[serde(alias = "percentage")]
    percent: f64,
    #[serde(alias = "renderedDifferenceImage")]
    image: String,
}

/// Comparator calling a remote diff endpoint.
#[derive(Debug, Clone)]
pub struct HttpComparator {
    client: Client,
    endpoint: Url,
}

impl HttpComparator {
    /// Comparator posting to `endpoint` with a per-request `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::InvalidUrl`] for a malformed endpoint and
    /// [`AdapterError::ClientBuild`] when the HTTP client cannot be built.
    pub fn new(endpoint: &str, timeout: Duration) -> AdapterResult<Self> {
        let endpoint = Url::parse(endpoint).map_err(|source| AdapterError::InvalidUrl {
            field: "comparator.url",
            value: endpoint.to_string(),
            source,
        })?;
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|source| AdapterError::ClientBuild { source })?;
        Ok(Self { client, endpoint })
    }

    /// Endpoint requests are posted to.
    #[must_use]
    pub const fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    async fn request(&self, request: &ComparisonRequest) -> AdapterResult<Comparison> {
        let body = CompareBody {
            mode: &request.mode,
            actual: &request.actual_url,
            expect: &request.expect_url,
            radius: request.tuning.radius,
            swidth: request.tuning.swidth,
            colordist: request.tuning.colordist,
        };
        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&body)
            .send()
            .await
            .map_err(|source| self.request_error(source))?;
        let status = response.status();
        if !status.is_success() {
            return Err(AdapterError::Status {
                endpoint: self.endpoint.to_string(),
                status: status.as_u16(),
            });
        }
        let payload: CompareResponse = response
            .json()
            .await
            .map_err(|source| self.request_error(source))?;
        let image = STANDARD
            .decode(payload.image.as_bytes())
            .map_err(|source| AdapterError::Decode {
                field: "image",
                source,
            })?;
        Ok(Comparison {
            percentage: payload.percent,
            image,
        })
    }

    fn request_error(&self, source: reqwest::Error) -> AdapterError {
        AdapterError::Request {
            endpoint: self.endpoint.to_string(),
            source,
        }
    }
}

#[async_trait]
impl Comparator for HttpComparator {
    async fn compare(&self, request: &ComparisonRequest) -> CoreResult<Comparison> {
        let comparison = self
            .request(request)
            .await
            .map_err(|err| err.into_comparison(&request.path))?;
        debug!(
            path = %request.path,
            percentage = comparison.percentage,
            "image compared"
        );
        Ok(comparison)
    }
}
