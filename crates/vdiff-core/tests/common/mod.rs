//! In-memory collaborators for build service tests.

#![allow(dead_code, unreachable_pub)]

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use vdiff_core::{
    ArtifactSource, BuildParam, BuildRequest, BuildService, BuildSettings, Comparator, Comparison,
    ComparisonRequest, CoreError, CoreResult, Notification, Notifier, PollPolicy,
};
use vdiff_events::{Event, EventBus};
use vdiff_telemetry::Metrics;
use vdiff_test_support::TestResult;

/// Artifact source serving fixed file sets per prefix.
#[derive(Default)]
pub struct FakeSource {
    prefixes: HashMap<String, Vec<(String, String)>>,
    fetches: Mutex<Vec<String>>,
}

impl FakeSource {
    pub fn with_prefix(mut self, prefix: &str, files: &[(&str, &str)]) -> Self {
        self.prefixes.insert(
            prefix.to_string(),
            files
                .iter()
                .map(|(path, body)| ((*path).to_string(), (*body).to_string()))
                .collect(),
        );
        self
    }

    pub fn fetches(&self) -> Vec<String> {
        self.fetches.lock().expect("fetches").clone()
    }
}

#[async_trait]
impl ArtifactSource for FakeSource {
    async fn fetch(&self, prefix: &str, local_dir: &Path) -> CoreResult<()> {
        self.fetches.lock().expect("fetches").push(prefix.to_string());
        let files = self
            .prefixes
            .get(prefix)
            .ok_or_else(|| CoreError::Download {
                prefix: prefix.to_string(),
                detail: "no such prefix".into(),
            })?;
        std::fs::create_dir_all(local_dir).map_err(|err| CoreError::Download {
            prefix: prefix.to_string(),
            detail: err.to_string(),
        })?;
        for (path, body) in files {
            let target = local_dir.join(path.trim_start_matches('/'));
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent).map_err(|err| CoreError::Download {
                    prefix: prefix.to_string(),
                    detail: err.to_string(),
                })?;
            }
            std::fs::write(&target, body).map_err(|err| CoreError::Download {
                prefix: prefix.to_string(),
                detail: err.to_string(),
            })?;
        }
        Ok(())
    }

    fn file_url(&self, prefix: &str, relative: &str) -> String {
        format!("mem://{prefix}{relative}")
    }
}

/// Comparator returning fixed scores; unknown paths score zero unless
/// listed as failing.
#[derive(Default)]
pub struct FakeComparator {
    scores: HashMap<String, f64>,
    failing: Vec<String>,
    delay: Duration,
    calls: Mutex<Vec<String>>,
}

impl FakeComparator {
    pub fn score(mut self, path: &str, percentage: f64) -> Self {
        self.scores.insert(path.to_string(), percentage);
        self
    }

    pub fn fail(mut self, path: &str) -> Self {
        self.failing.push(path.to_string());
        self
    }

    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> Vec<String> {
        let mut calls = self.calls.lock().expect("calls").clone();
        calls.sort();
        calls
    }
}

#[async_trait]
impl Comparator for FakeComparator {
    async fn compare(&self, request: &ComparisonRequest) -> CoreResult<Comparison> {
        self.calls.lock().expect("calls").push(request.path.clone());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.failing.contains(&request.path) {
            return Err(CoreError::Comparison {
                path: request.path.clone(),
                detail: "comparator crashed".into(),
            });
        }
        Ok(Comparison {
            percentage: self.scores.get(&request.path).copied().unwrap_or(0.0),
            image: format!("diff of {}", request.path).into_bytes(),
        })
    }
}

/// Notifier recording every delivery, optionally failing each one.
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<Notification>>,
    fail: bool,
}

impl RecordingNotifier {
    pub fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().expect("sent").clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, notification: &Notification) -> CoreResult<()> {
        self.sent.lock().expect("sent").push(notification.clone());
        if self.fail {
            return Err(CoreError::Notify {
                channel: "test",
                detail: "webhook offline".into(),
            });
        }
        Ok(())
    }
}

/// Source with `v1` = {same, changed} and `v2` = {same, changed, added}.
pub fn standard_source() -> FakeSource {
    FakeSource::default()
        .with_prefix("v1", &[("/same.png", "s"), ("/changed.png", "old")])
        .with_prefix(
            "v2",
            &[
                ("/same.png", "s"),
                ("/changed.png", "new"),
                ("/added.png", "a"),
            ],
        )
}

pub fn standard_param() -> TestResult<BuildParam> {
    Ok(BuildParam::new(BuildRequest::new("pixel", "v1", "v2"))?)
}

pub const FAST_POLL: PollPolicy = PollPolicy {
    interval: Duration::from_millis(10),
    max_attempts: 200,
};

pub struct Harness {
    pub service: BuildService,
    pub events: EventBus,
    pub metrics: Metrics,
    pub source: Arc<FakeSource>,
    pub comparator: Arc<FakeComparator>,
    pub notifier: Arc<RecordingNotifier>,
}

pub fn harness(
    work_dir: &Path,
    source: FakeSource,
    comparator: FakeComparator,
    notifier: RecordingNotifier,
) -> TestResult<Harness> {
    let events = EventBus::new();
    let metrics = Metrics::new()?;
    let source = Arc::new(source);
    let comparator = Arc::new(comparator);
    let notifier = Arc::new(notifier);
    let mut settings = BuildSettings::new(work_dir);
    settings.poll = FAST_POLL;
    settings.report_base_url = Some("https://vdiff.example/report".into());
    settings.asset_base_url = Some("https://vdiff.example/assets/".into());
    let service = BuildService::new(
        settings,
        source.clone(),
        comparator.clone(),
        events.clone(),
        metrics.clone(),
    )
    .with_notifier(notifier.clone());
    Ok(Harness {
        service,
        events,
        metrics,
        source,
        comparator,
        notifier,
    })
}

pub fn recorded_events(bus: &EventBus) -> Vec<Event> {
    bus.backlog_since(0)
        .into_iter()
        .map(|envelope| envelope.event)
        .collect()
}
