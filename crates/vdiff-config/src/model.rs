//! Typed configuration sections.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::defaults;

/// Complete application configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    /// Directory holding one workspace per build fingerprint.
    pub work_dir: PathBuf,
    /// Wipe the work directory before a fresh build starts.
    pub clean_on_start: bool,
    /// Artifact mirror settings.
    pub artifacts: ArtifactConfig,
    /// Comparison service settings.
    pub comparator: ComparatorConfig,
    /// Chat notification settings.
    pub notify: NotifyConfig,
    /// Lock and polling settings.
    pub build: BuildConfig,
    /// Logging settings.
    pub logging: LoggingSettings,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            work_dir: PathBuf::from(defaults::WORK_DIR),
            clean_on_start: false,
            artifacts: ArtifactConfig::default(),
            comparator: ComparatorConfig::default(),
            notify: NotifyConfig::default(),
            build: BuildConfig::default(),
            logging: LoggingSettings::default(),
        }
    }
}

/// Where build artifacts are mirrored and how they are addressed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ArtifactConfig {
    /// Root directory containing one folder per bucket.
    pub root: PathBuf,
    /// Bucket name below the root.
    pub bucket: String,
    /// Public base URL the comparator uses to download artifacts.
    pub public_base_url: Option<String>,
}

impl Default for ArtifactConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from(defaults::ARTIFACT_ROOT),
            bucket: defaults::ARTIFACT_BUCKET.to_string(),
            public_base_url: None,
        }
    }
}

/// Comparison service endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ComparatorConfig {
    /// Endpoint receiving comparison requests.
    pub url: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl ComparatorConfig {
    /// Request timeout as a duration.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for ComparatorConfig {
    fn default() -> Self {
        Self {
            url: defaults::COMPARATOR_URL.to_string(),
            timeout_secs: defaults::COMPARATOR_TIMEOUT_SECS,
        }
    }
}

/// Chat notification and report link settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NotifyConfig {
    /// Incoming webhook URL; notifications are disabled when absent.
    pub slack_webhook: Option<String>,
    /// Base URL of the report viewer linked from notifications.
    pub report_base_url: Option<String>,
    /// Base URL serving the work directory (actual/expect/diff images).
    pub asset_base_url: Option<String>,
}

/// Lock staleness and completion polling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BuildConfig {
    /// Age in seconds after which a lock marker is ignored.
    pub stale_after_secs: u64,
    /// Seconds between result polls.
    pub poll_interval_secs: u64,
    /// Number of result polls before timing out.
    pub poll_max_attempts: u32,
}

impl BuildConfig {
    /// Staleness window as a duration.
    #[must_use]
    pub const fn stale_after(&self) -> Duration {
        Duration::from_secs(self.stale_after_secs)
    }

    /// Poll interval as a duration.
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            stale_after_secs: defaults::STALE_AFTER_SECS,
            poll_interval_secs: defaults::POLL_INTERVAL_SECS,
            poll_max_attempts: defaults::POLL_MAX_ATTEMPTS,
        }
    }
}

/// Logging level and output format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingSettings {
    /// Level directive used when `RUST_LOG` is absent.
    pub level: String,
    /// `json` or `pretty`; inferred from the build profile when absent.
    pub format: Option<String>,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: defaults::LOG_LEVEL.to_string(),
            format: None,
        }
    }
}
