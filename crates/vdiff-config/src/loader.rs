//! Configuration loading: optional YAML document, then `VDIFF_*` environment
//! overrides, then validation.

use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::{ConfigError, ConfigResult};
use crate::model::AppConfig;

/// Prefix shared by every environment override.
pub const ENV_PREFIX: &str = "VDIFF_";

const WORK_DIR: &str = "VDIFF_WORK_DIR";
const CLEAN_ON_START: &str = "VDIFF_CLEAN_ON_START";
const ARTIFACT_ROOT: &str = "VDIFF_ARTIFACT_ROOT";
const ARTIFACT_BUCKET: &str = "VDIFF_ARTIFACT_BUCKET";
const ARTIFACT_BASE_URL: &str = "VDIFF_ARTIFACT_BASE_URL";
const COMPARATOR_URL: &str = "VDIFF_COMPARATOR_URL";
const COMPARATOR_TIMEOUT_SECS: &str = "VDIFF_COMPARATOR_TIMEOUT_SECS";
const SLACK_WEBHOOK: &str = "VDIFF_SLACK_WEBHOOK";
const REPORT_BASE_URL: &str = "VDIFF_REPORT_BASE_URL";
const ASSET_BASE_URL: &str = "VDIFF_ASSET_BASE_URL";
const STALE_AFTER_SECS: &str = "VDIFF_STALE_AFTER_SECS";
const POLL_INTERVAL_SECS: &str = "VDIFF_POLL_INTERVAL_SECS";
const POLL_MAX_ATTEMPTS: &str = "VDIFF_POLL_MAX_ATTEMPTS";
const LOG_LEVEL: &str = "VDIFF_LOG_LEVEL";
const LOG_FORMAT: &str = "VDIFF_LOG_FORMAT";

impl AppConfig {
    /// Load configuration from an optional file and the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error when the file cannot be read or parsed, an override
    /// is malformed, or the merged configuration fails validation.
    pub fn load(path: Option<&Path>) -> ConfigResult<Self> {
        Self::load_with(path, |name| std::env::var(name).ok())
    }

    /// Load configuration using `lookup` to resolve environment overrides.
    ///
    /// # Errors
    ///
    /// Same as [`AppConfig::load`].
    pub fn load_with<F>(path: Option<&Path>, lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env(lookup)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a YAML configuration document from disk.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] or [`ConfigError::Parse`].
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            operation: "config.read",
            path: path.to_path_buf(),
            source,
        })?;
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Overlay `VDIFF_*` values onto the configuration. Unset or blank
    /// variables leave the current value untouched.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidEnv`] when a numeric or boolean override
    /// cannot be parsed.
    pub fn apply_env<F>(&mut self, lookup: F) -> ConfigResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        if let Some(value) = get(WORK_DIR) {
            self.work_dir = PathBuf::from(value);
        }
        if let Some(value) = get(CLEAN_ON_START) {
            self.clean_on_start = parse_flag(CLEAN_ON_START, value)?;
        }
        if let Some(value) = get(ARTIFACT_ROOT) {
            self.artifacts.root = PathBuf::from(value);
        }
        if let Some(value) = get(ARTIFACT_BUCKET) {
            self.artifacts.bucket = value;
        }
        if let Some(value) = get(ARTIFACT_BASE_URL) {
            self.artifacts.public_base_url = Some(value);
        }
        if let Some(value) = get(COMPARATOR_URL) {
            self.comparator.url = value;
        }
        if let Some(value) = get(COMPARATOR_TIMEOUT_SECS) {
            self.comparator.timeout_secs = parse_number(COMPARATOR_TIMEOUT_SECS, value)?;
        }
        if let Some(value) = get(SLACK_WEBHOOK) {
            self.notify.slack_webhook = Some(value);
        }
        if let Some(value) = get(REPORT_BASE_URL) {
            self.notify.report_base_url = Some(value);
        }
        if let Some(value) = get(ASSET_BASE_URL) {
            self.notify.asset_base_url = Some(value);
        }
        if let Some(value) = get(STALE_AFTER_SECS) {
            self.build.stale_after_secs = parse_number(STALE_AFTER_SECS, value)?;
        }
        if let Some(value) = get(POLL_INTERVAL_SECS) {
            self.build.poll_interval_secs = parse_number(POLL_INTERVAL_SECS, value)?;
        }
        if let Some(value) = get(POLL_MAX_ATTEMPTS) {
            self.build.poll_max_attempts = parse_number(POLL_MAX_ATTEMPTS, value)?;
        }
        if let Some(value) = get(LOG_LEVEL) {
            self.logging.level = value;
        }
        if let Some(value) = get(LOG_FORMAT) {
            self.logging.format = Some(value.to_ascii_lowercase());
        }
        Ok(())
    }
}

fn parse_number<T: FromStr>(name: &'static str, value: String) -> ConfigResult<T> {
    value.parse().map_err(|_| ConfigError::InvalidEnv {
        name,
        value,
        reason: "not_a_number",
    })
}

fn parse_flag(name: &'static str, value: String) -> ConfigResult<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidEnv {
            name,
            value,
            reason: "not_a_flag",
        }),
    }
}
