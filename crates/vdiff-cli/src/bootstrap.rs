//! Wiring of configuration, telemetry and adapters into a build service.

use std::sync::Arc;

use tracing::info;
use vdiff_adapters::{HttpComparator, MirrorSource, SlackNotifier};
use vdiff_config::AppConfig;
use vdiff_core::{BuildService, BuildSettings, PollPolicy};
use vdiff_events::EventBus;
use vdiff_telemetry::{LogFormat, LoggingConfig, Metrics, init_logging};

use crate::error::{CliError, CliResult};

/// Install the tracing subscriber described by the logging section.
pub(crate) fn install_logging(config: &AppConfig) -> CliResult<()> {
    let format = match config.logging.format.as_deref() {
        Some(raw) => raw.parse::<LogFormat>().map_err(|value| {
            CliError::validation(format!("logging.format: unsupported format ({value})"))
        })?,
        None => LogFormat::infer(),
    };
    init_logging(&LoggingConfig {
        level: &config.logging.level,
        format,
        build_sha: option_env!("VDIFF_BUILD_SHA").unwrap_or(env!("CARGO_PKG_VERSION")),
    })?;
    Ok(())
}

/// Build settings derived from the loaded configuration.
pub(crate) fn build_settings(config: &AppConfig) -> BuildSettings {
    BuildSettings {
        work_dir: config.work_dir.clone(),
        stale_after: config.build.stale_after(),
        poll: PollPolicy {
            interval: config.build.poll_interval(),
            max_attempts: config.build.poll_max_attempts,
        },
        report_base_url: config.notify.report_base_url.clone(),
        asset_base_url: config.notify.asset_base_url.clone(),
    }
}

/// Construct the build service with its adapters and create the work
/// directory. Existing contents are kept; only a fresh `build` wipes them.
pub(crate) async fn build_service(config: &AppConfig) -> CliResult<BuildService> {
    let metrics = Metrics::new()?;
    let events = EventBus::new();

    let source = MirrorSource::new(
        &config.artifacts.root,
        &config.artifacts.bucket,
        config.artifacts.public_base_url.as_deref(),
    )?;
    let comparator = HttpComparator::new(&config.comparator.url, config.comparator.timeout())?;

    let mut service = BuildService::new(
        build_settings(config),
        Arc::new(source),
        Arc::new(comparator),
        events,
        metrics,
    );
    if let Some(webhook) = config.notify.slack_webhook.as_deref() {
        service = service.with_notifier(Arc::new(SlackNotifier::new(webhook)?));
    }

    service.prepare_workspace(false).await?;
    info!(
        work_dir = %config.work_dir.display(),
        comparator = %config.comparator.url,
        slack = config.notify.slack_webhook.is_some(),
        "build service ready"
    );
    Ok(service)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use vdiff_test_support::TestResult;
    use vdiff_test_support::fixtures::temp_dir;

    #[test]
    fn settings_follow_the_build_section() {
        let mut config = AppConfig::default();
        config.build.stale_after_secs = 30;
        config.build.poll_interval_secs = 2;
        config.build.poll_max_attempts = 7;
        config.notify.report_base_url = Some("https://reports.example".into());

        let settings = build_settings(&config);
        assert_eq!(settings.work_dir, config.work_dir);
        assert_eq!(settings.stale_after, Duration::from_secs(30));
        assert_eq!(settings.poll.interval, Duration::from_secs(2));
        assert_eq!(settings.poll.max_attempts, 7);
        assert_eq!(settings.report_base_url.as_deref(), Some("https://reports.example"));
        assert_eq!(settings.asset_base_url, None);
    }

    #[tokio::test]
    async fn service_creates_the_work_directory() -> TestResult {
        let dir = temp_dir("bootstrap")?;
        let mut config = AppConfig::default();
        config.work_dir = dir.path().join("work");
        config.artifacts.root = dir.path().join("artifacts");

        let service = build_service(&config).await?;
        assert!(config.work_dir.is_dir());
        assert_eq!(service.settings().work_dir, config.work_dir);
        Ok(())
    }

    #[tokio::test]
    async fn service_keeps_existing_work_contents() -> TestResult {
        let dir = temp_dir("bootstrap")?;
        let mut config = AppConfig::default();
        config.work_dir = dir.path().join("work");
        config.artifacts.root = dir.path().join("artifacts");
        config.clean_on_start = true;
        std::fs::create_dir_all(&config.work_dir)?;
        std::fs::write(config.work_dir.join("keep.txt"), "cached")?;

        build_service(&config).await?;
        assert!(config.work_dir.join("keep.txt").is_file());
        Ok(())
    }

    #[tokio::test]
    async fn malformed_comparator_url_is_a_usage_error() -> TestResult {
        let dir = temp_dir("bootstrap")?;
        let mut config = AppConfig::default();
        config.work_dir = dir.path().join("work");
        config.comparator.url = "not a url".into();

        let Err(err) = build_service(&config).await else {
            anyhow::bail!("expected invalid comparator url");
        };
        assert_eq!(err.exit_code(), 2);
        assert!(err.display_message().starts_with("invalid adapter url"));
        Ok(())
    }
}
