//! Waiting for a build started elsewhere to publish its report.

use std::time::Duration;

use tokio::time::sleep;
use tracing::debug;

use crate::error::{CoreError, CoreResult};
use crate::location::WorkLocation;
use crate::model::Report;
use crate::store::read_report;

/// Default pause between result checks.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);
/// Default number of result checks before giving up.
pub const DEFAULT_POLL_ATTEMPTS: u32 = 60;

/// Bounded polling schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    /// Pause between checks.
    pub interval: Duration,
    /// Total number of checks.
    pub max_attempts: u32,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            max_attempts: DEFAULT_POLL_ATTEMPTS,
        }
    }
}

/// Check for the result file up to `policy.max_attempts` times, sleeping
/// between checks but not after the last one.
///
/// # Errors
///
/// Returns [`CoreError::WaitTimeout`] when no report appears, and any error
/// from reading an existing report.
pub async fn await_result(location: &WorkLocation, policy: PollPolicy) -> CoreResult<Report> {
    for attempt in 1..=policy.max_attempts {
        if let Some(report) = read_report(location.result_file()).await? {
            debug!(fingerprint = %location.hash(), attempt, "build result available");
            return Ok(report);
        }
        if attempt < policy.max_attempts {
            sleep(policy.interval).await;
        }
    }
    Err(CoreError::WaitTimeout {
        fingerprint: location.hash().to_string(),
        attempts: policy.max_attempts,
    })
}
