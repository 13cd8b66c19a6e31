//! Event payload types carried across the platform.

use chrono::{DateTime, Utc};

/// Identifier assigned to each event emitted by the platform.
pub type EventId = u64;

/// Default buffer size for the in-memory replay ring.
pub const DEFAULT_REPLAY_CAPACITY: usize = 1_024;

/// Typed domain events surfaced across the system.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// A build acquired its lock and started working.
    BuildStarted {
        /// Fingerprint of the build parameters.
        fingerprint: String,
        /// Comparison mode requested by the caller.
        mode: String,
    },
    /// Coarse progress report for a running build.
    BuildProgress {
        /// Fingerprint of the build parameters.
        fingerprint: String,
        /// Stage percentage (0-100).
        percent: u8,
        /// Stage label or per-file progress message.
        message: String,
    },
    /// A build persisted its report.
    BuildCompleted {
        /// Fingerprint of the build parameters.
        fingerprint: String,
        /// Number of images with a non-zero difference.
        diff_count: usize,
        /// Highest difference percentage observed.
        max_percentage: f64,
    },
    /// A build failed and released its lock without a report.
    BuildFailed {
        /// Fingerprint of the build parameters.
        fingerprint: String,
        /// Human-readable error detail describing the failure.
        message: String,
    },
    /// System health status changed (degraded or restored components).
    HealthChanged {
        /// Components currently considered degraded.
        degraded: Vec<String>,
    },
}

impl Event {
    /// Machine-friendly discriminator for stream consumers.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::BuildStarted { .. } => "build_started",
            Self::BuildProgress { .. } => "build_progress",
            Self::BuildCompleted { .. } => "build_completed",
            Self::BuildFailed { .. } => "build_failed",
            Self::HealthChanged { .. } => "health_changed",
        }
    }

    /// Fingerprint the event refers to, when it is build-scoped.
    #[must_use]
    pub fn fingerprint(&self) -> Option<&str> {
        match self {
            Self::BuildStarted { fingerprint, .. }
            | Self::BuildProgress { fingerprint, .. }
            | Self::BuildCompleted { fingerprint, .. }
            | Self::BuildFailed { fingerprint, .. } => Some(fingerprint),
            Self::HealthChanged { .. } => None,
        }
    }
}

/// Metadata wrapper around events. Each envelope tracks the event id and emission timestamp.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq)]
pub struct EventEnvelope {
    /// Monotonic identifier assigned to the wrapped event.
    pub id: EventId,
    /// Timestamp recording when the envelope was produced.
    pub timestamp: DateTime<Utc>,
    /// Wrapped event payload.
    pub event: Event,
}
