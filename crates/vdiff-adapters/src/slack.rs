//! Slack incoming-webhook notifier.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use tracing::debug;
use url::Url;
use vdiff_core::{CoreResult, Notification, Notifier, slack_payload};

use crate::error::{AdapterError, AdapterResult};

const CHANNEL: &str = "slack";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Posts build outcomes to a Slack incoming webhook. Not retried.
#[derive(Debug, Clone)]
pub struct SlackNotifier {
    client: Client,
    webhook: Url,
}

impl SlackNotifier {
    /// Notifier posting to `webhook`.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::InvalidUrl`] for a malformed webhook and
    /// [`AdapterError::ClientBuild`] when the HTTP client cannot be built.
    pub fn new(webhook: &str) -> AdapterResult<Self> {
        let webhook = Url::parse(webhook).map_err(|source| AdapterError::InvalidUrl {
            field: "notify.slack_webhook",
            value: webhook.to_string(),
            source,
        })?;
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|source| AdapterError::ClientBuild { source })?;
        Ok(Self { client, webhook })
    }

    async fn post(&self, notification: &Notification) -> AdapterResult<()> {
        let payload = slack_payload(notification, Utc::now().timestamp());
        let response = self
            .client
            .post(self.webhook.clone())
            .json(&payload)
            .send()
            .await
            .map_err(|source| AdapterError::Request {
                endpoint: self.webhook.to_string(),
                source,
            })?;
        let status = response.status();
        if !status.is_success() {
            return Err(AdapterError::Status {
                endpoint: self.webhook.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl Notifier for SlackNotifier {
    async fn send(&self, notification: &Notification) -> CoreResult<()> {
        self.post(notification)
            .await
            .map_err(|err| err.into_notify(CHANNEL))?;
        debug!(channel = CHANNEL, "notification delivered");
        Ok(())
    }
}
