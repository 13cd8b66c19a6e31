//! Validation helpers for loaded configuration.

use url::Url;

use crate::error::{ConfigError, ConfigResult};
use crate::model::AppConfig;

impl AppConfig {
    /// Check the configuration for values the services cannot run with.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidField`] for the first offending field.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.work_dir.as_os_str().is_empty() {
            return Err(ConfigError::invalid_field("root", "work_dir", None, "empty"));
        }
        if self.artifacts.root.as_os_str().is_empty() {
            return Err(ConfigError::invalid_field("artifacts", "root", None, "empty"));
        }
        require_non_empty("artifacts", "bucket", &self.artifacts.bucket)?;
        if let Some(url) = &self.artifacts.public_base_url {
            require_http_url("artifacts", "public_base_url", url)?;
        }

        require_http_url("comparator", "url", &self.comparator.url)?;
        if self.comparator.timeout_secs == 0 {
            return Err(ConfigError::invalid_field(
                "comparator",
                "timeout_secs",
                Some("0".to_string()),
                "zero",
            ));
        }

        if let Some(url) = &self.notify.slack_webhook {
            require_http_url("notify", "slack_webhook", url)?;
        }
        if let Some(url) = &self.notify.report_base_url {
            require_http_url("notify", "report_base_url", url)?;
        }
        if let Some(url) = &self.notify.asset_base_url {
            require_http_url("notify", "asset_base_url", url)?;
        }

        if self.build.stale_after_secs == 0 {
            return Err(ConfigError::invalid_field(
                "build",
                "stale_after_secs",
                Some("0".to_string()),
                "zero",
            ));
        }
        if self.build.poll_interval_secs == 0 {
            return Err(ConfigError::invalid_field(
                "build",
                "poll_interval_secs",
                Some("0".to_string()),
                "zero",
            ));
        }
        if self.build.poll_max_attempts == 0 {
            return Err(ConfigError::invalid_field(
                "build",
                "poll_max_attempts",
                Some("0".to_string()),
                "zero",
            ));
        }

        require_non_empty("logging", "level", &self.logging.level)?;
        if let Some(format) = &self.logging.format
            && !matches!(format.as_str(), "json" | "pretty")
        {
            return Err(ConfigError::invalid_field(
                "logging",
                "format",
                Some(format.clone()),
                "unknown_format",
            ));
        }
        Ok(())
    }
}

fn require_non_empty(section: &'static str, field: &'static str, value: &str) -> ConfigResult<()> {
    if value.trim().is_empty() {
        return Err(ConfigError::invalid_field(
            section,
            field,
            Some(value.to_string()),
            "empty",
        ));
    }
    Ok(())
}

fn require_http_url(section: &'static str, field: &'static str, value: &str) -> ConfigResult<()> {
    let parsed = Url::parse(value).map_err(|_| {
        ConfigError::invalid_field(section, field, Some(value.to_string()), "invalid_url")
    })?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ConfigError::invalid_field(
            section,
            field,
            Some(value.to_string()),
            "unsupported_scheme",
        ));
    }
    Ok(())
}
