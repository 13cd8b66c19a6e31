//! Build orchestration: lock, download, pair, compare, aggregate, persist.
//!
//! # Design
//! - One build is one async task; the two downloads and all comparisons run
//!   concurrently, every other stage runs in order.
//! - Each stage is logged, counted in metrics, and reported as a progress
//!   event when it carries a percentage.
//! - The lock lease is released before completion events and notifications
//!   go out, so observers never see a finished build that still looks busy.
//! - Notification failures are logged and never change the build outcome.

use std::future::Future;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use tokio::fs;
use tracing::{debug, error, info, warn};
use vdiff_events::{Event, EventBus};
use vdiff_telemetry::{Metrics, with_build_context};

use crate::aggregate::aggregate;
use crate::capability::{ArtifactSource, Comparator, Comparison, ComparisonRequest, Notifier};
use crate::error::{CoreError, CoreResult};
use crate::fanout::{DiffTarget, diff_all};
use crate::filter::PathFilter;
use crate::location::WorkLocation;
use crate::lock::{BuildLock, DEFAULT_STALE_AFTER};
use crate::model::{BuildParam, Report};
use crate::notify::{Notification, ReportSummary};
use crate::pairing::pair_trees;
use crate::poller::{self, PollPolicy};
use crate::resource::ReportResource;
use crate::store::{read_report, write_report};

const HEALTH_COMPONENT: &str = "builds";
const OUTCOME_SUCCEEDED: &str = "succeeded";
const OUTCOME_FAILED: &str = "failed";
const OUTCOME_REJECTED: &str = "rejected";
const FILE_PROGRESS_PERCENT: u8 = 80;
const COMPLETE_PERCENT: u8 = 100;
const COMPLETE_MESSAGE: &str = "complete";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum StepKind {
    DownloadExpect,
    DownloadActual,
    PairTrees,
    Compare,
    Aggregate,
    Persist,
}

impl StepKind {
    const fn as_str(self) -> &'static str {
        match self {
            Self::DownloadExpect => "download_expect",
            Self::DownloadActual => "download_actual",
            Self::PairTrees => "pair_trees",
            Self::Compare => "compare",
            Self::Aggregate => "aggregate",
            Self::Persist => "persist",
        }
    }

    const fn progress(self) -> Option<(u8, &'static str)> {
        match self {
            Self::DownloadExpect => Some((20, "downloadExpectArtifacts")),
            Self::DownloadActual => Some((40, "downloadActualArtifacts")),
            Self::Compare => Some((60, "makeDiffImages")),
            Self::PairTrees | Self::Aggregate | Self::Persist => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum StepStatus {
    Started,
    Completed,
    Failed,
}

impl StepStatus {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Started => "started",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

/// Runtime settings of the build service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildSettings {
    /// Directory holding one workspace per fingerprint.
    pub work_dir: PathBuf,
    /// Age after which a lock marker is ignored.
    pub stale_after: Duration,
    /// Schedule used when waiting for another build.
    pub poll: PollPolicy,
    /// Base URL of the report viewer; the fingerprint is appended.
    pub report_base_url: Option<String>,
    /// Base URL serving workspace files; the fingerprint is appended.
    pub asset_base_url: Option<String>,
}

impl BuildSettings {
    /// Settings with default timings rooted at `work_dir`.
    #[must_use]
    pub fn new(work_dir: impl Into<PathBuf>) -> Self {
        Self {
            work_dir: work_dir.into(),
            stale_after: DEFAULT_STALE_AFTER,
            poll: PollPolicy::default(),
            report_base_url: None,
            asset_base_url: None,
        }
    }
}

/// Entry point for building, caching and awaiting diff reports.
#[derive(Clone)]
pub struct BuildService {
    settings: Arc<BuildSettings>,
    source: Arc<dyn ArtifactSource>,
    comparator: Arc<dyn Comparator>,
    notifier: Option<Arc<dyn Notifier>>,
    lock: BuildLock,
    events: EventBus,
    metrics: Metrics,
    health_degraded: Arc<Mutex<bool>>,
}

impl BuildService {
    /// Construct a service over the given collaborators.
    #[must_use]
    pub fn new(
        settings: BuildSettings,
        source: Arc<dyn ArtifactSource>,
        comparator: Arc<dyn Comparator>,
        events: EventBus,
        metrics: Metrics,
    ) -> Self {
        let lock = BuildLock::new(settings.stale_after);
        Self {
            settings: Arc::new(settings),
            source,
            comparator,
            notifier: None,
            lock,
            events,
            metrics,
            health_degraded: Arc::new(Mutex::new(false)),
        }
    }

    /// Attach a notifier receiving build outcomes.
    #[must_use]
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Settings in effect.
    #[must_use]
    pub fn settings(&self) -> &BuildSettings {
        &self.settings
    }

    /// Event bus progress and outcomes are published on.
    #[must_use]
    pub const fn events(&self) -> &EventBus {
        &self.events
    }

    /// Workspace layout for `param`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Hash`] if the parameters cannot be encoded.
    pub fn locate(&self, param: &BuildParam) -> CoreResult<WorkLocation> {
        WorkLocation::resolve(&self.settings.work_dir, param)
    }

    /// Create the work directory, removing previous contents when `clean`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Io`] when the directory cannot be wiped or created.
    pub async fn prepare_workspace(&self, clean: bool) -> CoreResult<()> {
        let work_dir = &self.settings.work_dir;
        if clean {
            match fs::remove_dir_all(work_dir).await {
                Ok(()) => info!(work_dir = %work_dir.display(), "work directory cleaned"),
                Err(err) if err.kind() == ErrorKind::NotFound => {}
                Err(err) => return Err(CoreError::io("service.clean_work_dir", work_dir, err)),
            }
        }
        fs::create_dir_all(work_dir)
            .await
            .map_err(|err| CoreError::io("service.create_work_dir", work_dir, err))
    }

    /// Whether a build for `param` holds a fresh lock.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Hash`] if the parameters cannot be encoded.
    pub fn is_building(&self, param: &BuildParam) -> CoreResult<bool> {
        Ok(self.lock.is_building(&self.locate(param)?))
    }

    /// Previously persisted report for `param`, if any.
    ///
    /// # Errors
    ///
    /// Returns an error when the report exists but cannot be read.
    pub async fn load_report(&self, param: &BuildParam) -> CoreResult<Option<Report>> {
        read_report(self.locate(param)?.result_file()).await
    }

    /// Poll for the report of a build running elsewhere.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::WaitTimeout`] when the report does not appear in
    /// time.
    pub async fn await_result(&self, param: &BuildParam) -> CoreResult<Report> {
        let location = self.locate(param)?;
        poller::await_result(&location, self.settings.poll).await
    }

    /// Return the cached report, wait for an in-flight build, or build.
    ///
    /// # Errors
    ///
    /// Returns the build error, or [`CoreError::WaitTimeout`] when waiting
    /// for another build times out.
    pub async fn ensure_report(
        &self,
        param: &BuildParam,
        label: Option<&str>,
    ) -> CoreResult<Report> {
        let location = self.locate(param)?;
        if let Some(report) = read_report(location.result_file()).await? {
            debug!(fingerprint = %location.hash(), "serving cached report");
            return Ok(report);
        }
        if self.lock.is_building(&location) {
            info!(fingerprint = %location.hash(), "build in progress; waiting for result");
            return poller::await_result(&location, self.settings.poll).await;
        }
        match self.build(param, label).await {
            Err(CoreError::DuplicateBuild { fingerprint }) => {
                info!(fingerprint = %fingerprint, "lost build race; waiting for result");
                poller::await_result(&location, self.settings.poll).await
            }
            other => other,
        }
    }

    /// Run a build for `param` and persist its report.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::DuplicateBuild`] when the fingerprint is locked,
    /// or the error of the first failing stage.
    pub async fn build(&self, param: &BuildParam, label: Option<&str>) -> CoreResult<Report> {
        let location = self.locate(param)?;
        let fingerprint = location.hash().to_string();
        let lease = match self.lock.begin(&location) {
            Ok(lease) => lease,
            Err(err) => {
                if matches!(err, CoreError::DuplicateBuild { .. }) {
                    self.metrics.inc_build(OUTCOME_REJECTED);
                    info!(fingerprint = %fingerprint, "build rejected; already in progress");
                }
                return Err(err);
            }
        };

        self.metrics.build_started();
        info!(
            fingerprint = %fingerprint,
            mode = param.mode(),
            expect = param.expect_path(),
            actual = param.actual_path(),
            "build started"
        );
        self.publish_event(Event::BuildStarted {
            fingerprint: fingerprint.clone(),
            mode: param.mode().to_string(),
        });

        let outcome =
            with_build_context(fingerprint.clone(), self.execute_pipeline(param, &location)).await;

        if let Err(err) = lease.release() {
            warn!(
                error = %err.detail(),
                fingerprint = %fingerprint,
                "failed to release build lock"
            );
        }
        self.metrics.build_finished();

        match outcome {
            Ok(report) => {
                self.metrics.inc_build(OUTCOME_SUCCEEDED);
                info!(
                    fingerprint = %fingerprint,
                    diff_count = report.diff_count,
                    max_percentage = report.max_percentage,
                    "build completed"
                );
                self.publish_event(Event::BuildCompleted {
                    fingerprint,
                    diff_count: report.diff_count,
                    max_percentage: report.max_percentage,
                });
                self.mark_recovered();
                self.notify(Notification::Finished {
                    summary: ReportSummary::from(&report),
                    report_url: self.report_url(&location),
                    label: label.map(str::to_string),
                })
                .await;
                Ok(report)
            }
            Err(err) => {
                let detail = err.detail();
                self.metrics.inc_build(OUTCOME_FAILED);
                error!(error = %detail, fingerprint = %fingerprint, "build failed");
                self.publish_event(Event::BuildFailed {
                    fingerprint,
                    message: detail.clone(),
                });
                self.mark_degraded(&detail);
                self.notify(Notification::Failed { message: detail }).await;
                Err(err)
            }
        }
    }

    /// Persisted report for `param` with asset URLs attached.
    ///
    /// # Errors
    ///
    /// Returns an error when the report exists but cannot be read.
    pub async fn resource(&self, param: &BuildParam) -> CoreResult<Option<ReportResource>> {
        let location = self.locate(param)?;
        let report = read_report(location.result_file()).await?;
        Ok(report.map(|report| ReportResource::from_report(&report, &self.asset_uri(&location))))
    }

    /// Viewer URL for a workspace, or its local path without a base URL.
    #[must_use]
    pub fn report_url(&self, location: &WorkLocation) -> String {
        join_base(self.settings.report_base_url.as_deref(), location)
    }

    /// Base URL of the workspace files, or its local path without a base URL.
    #[must_use]
    pub fn asset_uri(&self, location: &WorkLocation) -> String {
        join_base(self.settings.asset_base_url.as_deref(), location)
    }

    async fn execute_pipeline(
        &self,
        param: &BuildParam,
        location: &WorkLocation,
    ) -> CoreResult<Report> {
        let fingerprint = location.hash();
        let filter = PathFilter::compile(param.path_filters())?;

        let download_expect = self.run_step(
            fingerprint,
            StepKind::DownloadExpect,
            self.source.fetch(param.expect_path(), location.expect_dir()),
        );
        let download_actual = self.run_step(
            fingerprint,
            StepKind::DownloadActual,
            self.source.fetch(param.actual_path(), location.actual_dir()),
        );
        tokio::try_join!(download_expect, download_actual)?;

        let pairs = self
            .run_step(fingerprint, StepKind::PairTrees, async {
                pair_trees(location.actual_dir(), location.expect_dir())
            })
            .await?;
        debug!(
            common = pairs.common.len(),
            new = pairs.new.len(),
            deleted = pairs.deleted.len(),
            "artifact trees paired"
        );

        let target = DiffTarget {
            mode: param.mode(),
            expect_prefix: param.expect_path(),
            actual_prefix: param.actual_path(),
            tuning: param.tuning(),
            diff_dir: location.diff_dir(),
            source: self.source.as_ref(),
        };
        let comparator = MeteredComparator {
            inner: self.comparator.as_ref(),
            metrics: &self.metrics,
        };
        let images = self
            .run_step(
                fingerprint,
                StepKind::Compare,
                diff_all(&pairs, &filter, &target, &comparator, |done, total| {
                    self.emit_progress(
                        fingerprint,
                        FILE_PROGRESS_PERCENT,
                        format!("Image Diff Progress ... ({done} / {total})"),
                    );
                }),
            )
            .await?;

        let report = self
            .run_step(fingerprint, StepKind::Aggregate, async {
                Ok::<_, CoreError>(aggregate(
                    fingerprint,
                    images,
                    pairs.new,
                    pairs.deleted,
                    param.threshold(),
                ))
            })
            .await?;

        self.run_step(
            fingerprint,
            StepKind::Persist,
            write_report(location.result_file(), &report),
        )
        .await?;
        self.emit_progress(fingerprint, COMPLETE_PERCENT, COMPLETE_MESSAGE.to_string());
        Ok(report)
    }

    async fn run_step<T, F>(&self, fingerprint: &str, step: StepKind, op: F) -> CoreResult<T>
    where
        F: Future<Output = CoreResult<T>>,
    {
        if let Some((percent, message)) = step.progress() {
            self.emit_progress(fingerprint, percent, message.to_string());
        }
        self.record_step(step, StepStatus::Started);
        debug!(step = step.as_str(), "build step started");

        match op.await {
            Ok(value) => {
                self.record_step(step, StepStatus::Completed);
                debug!(step = step.as_str(), "build step completed");
                Ok(value)
            }
            Err(err) => {
                self.record_step(step, StepStatus::Failed);
                warn!(
                    step = step.as_str(),
                    error = %err.detail(),
                    "build step failed"
                );
                Err(err)
            }
        }
    }

    fn record_step(&self, step: StepKind, status: StepStatus) {
        self.metrics.inc_build_stage(step.as_str(), status.as_str());
    }

    fn emit_progress(&self, fingerprint: &str, percent: u8, message: String) {
        debug!(percent, message = %message, "build progress");
        self.publish_event(Event::BuildProgress {
            fingerprint: fingerprint.to_string(),
            percent,
            message,
        });
    }

    async fn notify(&self, notification: Notification) {
        let Some(notifier) = &self.notifier else {
            return;
        };
        if let Err(err) = notifier.send(&notification).await {
            warn!(error = %err.detail(), "failed to deliver build notification");
        }
    }

    fn publish_event(&self, event: Event) {
        self.metrics.inc_event(event.kind());
        let _id = self.events.publish(event);
    }

    fn mark_degraded(&self, detail: &str) {
        let mut guard = self.lock_health_flag();
        if *guard {
            drop(guard);
            warn!(
                component = HEALTH_COMPONENT,
                detail = detail,
                "build pipeline still degraded"
            );
        } else {
            *guard = true;
            drop(guard);
            warn!(
                component = HEALTH_COMPONENT,
                detail = detail,
                "build pipeline degraded"
            );
            self.publish_event(Event::HealthChanged {
                degraded: vec![HEALTH_COMPONENT.to_string()],
            });
        }
    }

    fn mark_recovered(&self) {
        let mut guard = self.lock_health_flag();
        if std::mem::take(&mut *guard) {
            drop(guard);
            self.publish_event(Event::HealthChanged { degraded: vec![] });
            info!(component = HEALTH_COMPONENT, "build pipeline recovered");
        }
    }

    fn lock_health_flag(&self) -> MutexGuard<'_, bool> {
        match self.health_degraded.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                error!("build health mutex poisoned; continuing with recovered guard");
                poisoned.into_inner()
            }
        }
    }
}

fn join_base(base: Option<&str>, location: &WorkLocation) -> String {
    match base {
        Some(base) => format!("{}/{}", base.trim_end_matches('/'), location.hash()),
        None => location.root().display().to_string(),
    }
}

struct MeteredComparator<'a> {
    inner: &'a dyn Comparator,
    metrics: &'a Metrics,
}

#[async_trait]
impl Comparator for MeteredComparator<'_> {
    async fn compare(&self, request: &ComparisonRequest) -> CoreResult<Comparison> {
        let result = self.inner.compare(request).await;
        self.metrics.inc_comparison(if result.is_ok() {
            OUTCOME_SUCCEEDED
        } else {
            OUTCOME_FAILED
        });
        result
    }
}
