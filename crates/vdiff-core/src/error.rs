//! # Design
//!
//! - Provide structured, constant-message errors for the build pipeline.
//! - Capture operation context (paths, fields, inputs) to make failures reproducible in tests.
//! - Preserve source errors without interpolating context into error messages.

use std::error::Error as _;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type for build operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors produced by the build orchestration engine.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The build request was rejected before any I/O happened.
    #[error("invalid build request")]
    Validation {
        /// Field that failed validation.
        field: &'static str,
        /// Static reason for the failure.
        reason: &'static str,
        /// Offending value when available.
        value: Option<String>,
    },
    /// A path filter could not be compiled.
    #[error("invalid path filter")]
    InvalidPattern {
        /// Pattern that failed to compile.
        pattern: String,
        /// Underlying regex error.
        source: regex::Error,
    },
    /// Another build for the same fingerprint holds a fresh lock.
    #[error("build already in progress")]
    DuplicateBuild {
        /// Fingerprint of the contended build.
        fingerprint: String,
    },
    /// Fetching an artifact prefix failed.
    #[error("artifact download failed")]
    Download {
        /// Storage prefix being fetched.
        prefix: String,
        /// Detail reported by the artifact source.
        detail: String,
    },
    /// Comparing a single file failed.
    #[error("image comparison failed")]
    Comparison {
        /// Relative path of the compared file.
        path: String,
        /// Detail reported by the comparator.
        detail: String,
    },
    /// A local artifact tree was missing when pairing.
    #[error("artifacts not found")]
    ArtifactsNotFound {
        /// Directory that was expected to exist.
        path: PathBuf,
    },
    /// The completion poller exhausted its attempts.
    #[error("timed out waiting for build result")]
    WaitTimeout {
        /// Fingerprint being awaited.
        fingerprint: String,
        /// Number of checks performed.
        attempts: u32,
    },
    /// Delivering a notification failed.
    #[error("notification delivery failed")]
    Notify {
        /// Channel the notification was sent to.
        channel: &'static str,
        /// Detail reported by the transport.
        detail: String,
    },
    /// IO failures while interacting with the filesystem.
    #[error("build io failure")]
    Io {
        /// Operation that triggered the IO failure.
        operation: &'static str,
        /// Path involved in the IO failure.
        path: PathBuf,
        /// Underlying IO error.
        source: io::Error,
    },
    /// JSON parsing or serialization failures for the result file.
    #[error("build json failure")]
    Json {
        /// Operation that triggered the JSON failure.
        operation: &'static str,
        /// Path involved in the JSON failure.
        path: PathBuf,
        /// Underlying JSON error.
        source: serde_json::Error,
    },
    /// Walkdir traversal failures.
    #[error("build walkdir failure")]
    Walkdir {
        /// Operation that triggered the walkdir failure.
        operation: &'static str,
        /// Path involved in the walkdir failure.
        path: PathBuf,
        /// Underlying walkdir error.
        source: walkdir::Error,
    },
    /// Build parameters could not be encoded for fingerprinting.
    #[error("failed to encode build parameters")]
    Hash {
        /// Underlying JSON error.
        source: serde_json::Error,
    },
}

impl CoreError {
    pub(crate) fn io(operation: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            operation,
            path: path.into(),
            source,
        }
    }

    pub(crate) fn json(
        operation: &'static str,
        path: impl Into<PathBuf>,
        source: serde_json::Error,
    ) -> Self {
        Self::Json {
            operation,
            path: path.into(),
            source,
        }
    }

    pub(crate) fn walkdir(
        operation: &'static str,
        path: impl Into<PathBuf>,
        source: walkdir::Error,
    ) -> Self {
        Self::Walkdir {
            operation,
            path: path.into(),
            source,
        }
    }

    pub(crate) fn validation(
        field: &'static str,
        reason: &'static str,
        value: Option<String>,
    ) -> Self {
        Self::Validation {
            field,
            reason,
            value,
        }
    }

    /// Human-readable description including the context fields and the
    /// source chain, used for chat notifications and CLI output.
    #[must_use]
    pub fn detail(&self) -> String {
        let context = match self {
            Self::Validation {
                field,
                reason,
                value,
            } => match value {
                Some(value) => format!("{field}: {reason} ({value})"),
                None => format!("{field}: {reason}"),
            },
            Self::InvalidPattern { pattern, .. } => format!("pattern {pattern}"),
            Self::DuplicateBuild { fingerprint } => format!("fingerprint {fingerprint}"),
            Self::Download { prefix, detail } => format!("prefix {prefix}: {detail}"),
            Self::Comparison { path, detail } => format!("{path}: {detail}"),
            Self::ArtifactsNotFound { path } => path.display().to_string(),
            Self::WaitTimeout {
                fingerprint,
                attempts,
            } => format!("fingerprint {fingerprint} after {attempts} checks"),
            Self::Notify { channel, detail } => format!("{channel}: {detail}"),
            Self::Io {
                operation, path, ..
            }
            | Self::Json {
                operation, path, ..
            }
            | Self::Walkdir {
                operation, path, ..
            } => format!("{operation} {}", path.display()),
            Self::Hash { .. } => String::new(),
        };

        let mut message = self.to_string();
        if !context.is_empty() {
            message.push_str(": ");
            message.push_str(&context);
        }
        let mut source = self.source();
        while let Some(err) = source {
            message.push_str(": ");
            message.push_str(&err.to_string());
            source = err.source();
        }
        message
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_stays_constant() {
        let err = CoreError::DuplicateBuild {
            fingerprint: "abc".into(),
        };
        assert_eq!(err.to_string(), "build already in progress");
    }

    #[test]
    fn detail_includes_context_and_sources() {
        let err = CoreError::io(
            "lock.create_marker",
            "/work/abc/building.now",
            io::Error::other("disk full"),
        );
        assert_eq!(
            err.detail(),
            "build io failure: lock.create_marker /work/abc/building.now: disk full"
        );

        let err = CoreError::validation("actual_path", "same_as_expect_path", Some("v1".into()));
        assert_eq!(
            err.detail(),
            "invalid build request: actual_path: same_as_expect_path (v1)"
        );
    }

    #[test]
    fn wait_timeout_detail_reports_attempts() {
        let err = CoreError::WaitTimeout {
            fingerprint: "abc".into(),
            attempts: 60,
        };
        assert_eq!(
            err.detail(),
            "timed out waiting for build result: fingerprint abc after 60 checks"
        );
    }
}
