//! Prometheus-backed metrics registry and snapshot helpers.
//!
//! # Design
//! - Encapsulates collector registration to keep the public API small.
//! - Exposes the counters/gauges relevant to diff builds.

use std::sync::Arc;

use prometheus::core::Collector;
use prometheus::{Encoder, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};
use serde::Serialize;

use crate::error::{Result, TelemetryError};

/// Prometheus-backed metrics registry shared across services.
#[derive(Clone)]
pub struct Metrics {
    inner: Arc<MetricsInner>,
}

struct MetricsInner {
    registry: Registry,
    builds_total: IntCounterVec,
    build_stages_total: IntCounterVec,
    comparisons_total: IntCounterVec,
    events_emitted_total: IntCounterVec,
    builds_in_flight: IntGauge,
}

/// Snapshot of selected gauges and counters for health reporting.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    /// Builds currently holding a lock in this process.
    pub builds_in_flight: i64,
    /// Builds that persisted a report.
    pub builds_succeeded: u64,
    /// Builds that failed after acquiring the lock.
    pub builds_failed: u64,
    /// Builds rejected because another build held the lock.
    pub builds_rejected: u64,
    /// Individual file comparisons that succeeded.
    pub comparisons_succeeded: u64,
    /// Individual file comparisons that failed.
    pub comparisons_failed: u64,
}

impl Metrics {
    /// Construct a new metrics registry with the standard collectors registered.
    ///
    /// # Errors
    ///
    /// Returns an error if any of the Prometheus collectors cannot be
    /// built or registered.
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let builds_total = counter_vec(
            "builds_total",
            "Diff builds finished by outcome",
            &["outcome"],
        )?;
        let build_stages_total = counter_vec(
            "build_stages_total",
            "Diff build stages executed by status",
            &["stage", "status"],
        )?;
        let comparisons_total = counter_vec(
            "comparisons_total",
            "Per-file comparisons by outcome",
            &["outcome"],
        )?;
        let events_emitted_total = counter_vec(
            "events_emitted_total",
            "Domain events emitted by type",
            &["type"],
        )?;
        let builds_in_flight = IntGauge::with_opts(Opts::new(
            "builds_in_flight",
            "Diff builds currently holding a lock",
        ))
        .map_err(|source| TelemetryError::MetricsCollector {
            name: "builds_in_flight",
            source,
        })?;

        register(&registry, "builds_total", builds_total.clone())?;
        register(&registry, "build_stages_total", build_stages_total.clone())?;
        register(&registry, "comparisons_total", comparisons_total.clone())?;
        register(&registry, "events_emitted_total", events_emitted_total.clone())?;
        register(&registry, "builds_in_flight", builds_in_flight.clone())?;

        Ok(Self {
            inner: Arc::new(MetricsInner {
                registry,
                builds_total,
                build_stages_total,
                comparisons_total,
                events_emitted_total,
                builds_in_flight,
            }),
        })
    }

    /// Increment the finished build counter for the given outcome
    /// (`succeeded`, `failed`, `rejected`).
    pub fn inc_build(&self, outcome: &str) {
        self.inner
            .builds_total
            .with_label_values(&[outcome])
            .inc();
    }

    /// Increment the build stage counter.
    pub fn inc_build_stage(&self, stage: &str, status: &str) {
        self.inner
            .build_stages_total
            .with_label_values(&[stage, status])
            .inc();
    }

    /// Increment the per-file comparison counter.
    pub fn inc_comparison(&self, outcome: &str) {
        self.inner
            .comparisons_total
            .with_label_values(&[outcome])
            .inc();
    }

    /// Increment the emitted event counter for the specific event type.
    pub fn inc_event(&self, event_type: &str) {
        self.inner
            .events_emitted_total
            .with_label_values(&[event_type])
            .inc();
    }

    /// Track a build acquiring its lock.
    pub fn build_started(&self) {
        self.inner.builds_in_flight.inc();
    }

    /// Track a build releasing its lock.
    pub fn build_finished(&self) {
        self.inner.builds_in_flight.dec();
    }

    /// Render the metrics registry using the Prometheus text exposition format.
    ///
    /// # Errors
    ///
    /// Returns an error if the metrics cannot be encoded or if the encoded
    /// buffer is not valid UTF-8.
    pub fn render(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.inner.registry.gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&metric_families, &mut buffer)
            .map_err(|source| TelemetryError::MetricsEncode { source })?;
        String::from_utf8(buffer).map_err(|source| TelemetryError::MetricsUtf8 { source })
    }

    /// Take a point-in-time snapshot of the most relevant gauges and counters.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        let builds = |outcome: &str| self.inner.builds_total.with_label_values(&[outcome]).get();
        let comparisons = |outcome: &str| {
            self.inner
                .comparisons_total
                .with_label_values(&[outcome])
                .get()
        };
        MetricsSnapshot {
            builds_in_flight: self.inner.builds_in_flight.get(),
            builds_succeeded: builds("succeeded"),
            builds_failed: builds("failed"),
            builds_rejected: builds("rejected"),
            comparisons_succeeded: comparisons("succeeded"),
            comparisons_failed: comparisons("failed"),
        }
    }
}

fn counter_vec(name: &'static str, help: &str, labels: &[&str]) -> Result<IntCounterVec> {
    IntCounterVec::new(Opts::new(name, help), labels)
        .map_err(|source| TelemetryError::MetricsCollector { name, source })
}

fn register<C>(registry: &Registry, name: &'static str, collector: C) -> Result<()>
where
    C: Collector + 'static,
{
    registry
        .register(Box::new(collector))
        .map_err(|source| TelemetryError::MetricsRegister { name, source })
}
