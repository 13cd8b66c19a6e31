//! Default values for configuration sections.
//!
//! # Design
//! - Centralize defaults so the loader, validation and docs stay consistent.
//! - Keep time-based defaults explicit.

/// Directory holding per-fingerprint build workspaces.
pub const WORK_DIR: &str = ".vdiff/work";
/// Directory containing the mirrored artifact buckets.
pub const ARTIFACT_ROOT: &str = ".vdiff/artifacts";
/// Bucket name under the artifact root.
pub const ARTIFACT_BUCKET: &str = "artifacts";
/// Endpoint of the image comparison service.
pub const COMPARATOR_URL: &str = "http://127.0.0.1:8080/diff";
/// Comparator request timeout in seconds.
pub const COMPARATOR_TIMEOUT_SECS: u64 = 120;
/// Age after which a build lock marker is considered abandoned.
pub const STALE_AFTER_SECS: u64 = 600;
/// Delay between result polls.
pub const POLL_INTERVAL_SECS: u64 = 5;
/// Number of result polls before giving up.
pub const POLL_MAX_ATTEMPTS: u32 = 60;
/// Log level used when `RUST_LOG` is absent.
pub const LOG_LEVEL: &str = "info";
