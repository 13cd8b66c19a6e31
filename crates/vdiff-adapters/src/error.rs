//! # Design
//!
//! - Constant-message errors for the storage, comparator and chat adapters.
//! - Context lives in fields; [`AdapterError::detail`] renders it together
//!   with the source chain when the error crosses into a [`CoreError`].

use std::error::Error as _;
use std::io;
use std::path::PathBuf;

use thiserror::Error;
use vdiff_core::CoreError;

/// Result alias for adapter operations.
pub type AdapterResult<T> = Result<T, AdapterError>;

/// Errors raised by the adapters.
#[derive(Debug, Error)]
pub enum AdapterError {
    /// The HTTP client could not be constructed.
    #[error("failed to build http client")]
    ClientBuild {
        /// Underlying reqwest error.
        source: reqwest::Error,
    },
    /// A configured URL could not be parsed.
    #[error("invalid adapter url")]
    InvalidUrl {
        /// Setting the URL came from.
        field: &'static str,
        /// Offending value.
        value: String,
        /// Underlying parse error.
        source: url::ParseError,
    },
    /// The HTTP request did not complete or its body could not be decoded.
    #[error("http request failed")]
    Request {
        /// Endpoint that was called.
        endpoint: String,
        /// Underlying reqwest error.
        source: reqwest::Error,
    },
    /// The remote answered with a non-success status.
    #[error("unexpected http status")]
    Status {
        /// Endpoint that was called.
        endpoint: String,
        /// Status code returned.
        status: u16,
    },
    /// A base64 response field could not be decoded.
    #[error("failed to decode response field")]
    Decode {
        /// Field that failed to decode.
        field: &'static str,
        /// Underlying decode error.
        source: base64::DecodeError,
    },
    /// A storage prefix was rejected before touching the filesystem.
    #[error("invalid artifact prefix")]
    InvalidPrefix {
        /// Offending prefix.
        prefix: String,
    },
    /// A storage prefix does not exist in the mirror.
    #[error("artifact prefix not found")]
    MissingPrefix {
        /// Directory expected to hold the prefix.
        path: PathBuf,
    },
    /// Filesystem failure.
    #[error("adapter io failure")]
    Io {
        /// Operation that failed.
        operation: &'static str,
        /// Path involved.
        path: PathBuf,
        /// Underlying IO error.
        source: io::Error,
    },
    /// Directory traversal failure.
    #[error("adapter walkdir failure")]
    Walkdir {
        /// Operation that failed.
        operation: &'static str,
        /// Path involved.
        path: PathBuf,
        /// Underlying walkdir error.
        source: walkdir::Error,
    },
    /// A blocking copy task panicked or was cancelled.
    #[error("blocking task failed")]
    Join {
        /// Underlying join error.
        source: tokio::task::JoinError,
    },
}

impl AdapterError {
    pub(crate) fn io(operation: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            operation,
            path: path.into(),
            source,
        }
    }

    /// Human-readable description including context and the source chain.
    #[must_use]
    pub fn detail(&self) -> String {
        let context = match self {
            Self::ClientBuild { .. } | Self::Join { .. } => String::new(),
            Self::InvalidUrl { field, value, .. } => format!("{field}={value}"),
            Self::Request { endpoint, .. } => endpoint.clone(),
            Self::Status { endpoint, status } => format!("{endpoint} returned {status}"),
            Self::Decode { field, .. } => (*field).to_string(),
            Self::InvalidPrefix { prefix } => prefix.clone(),
            Self::MissingPrefix { path } => path.display().to_string(),
            Self::Io {
                operation, path, ..
            }
            | Self::Walkdir {
                operation, path, ..
            } => format!("{operation} {}", path.display()),
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

    pub(crate) fn into_download(self, prefix: &str) -> CoreError {
        CoreError::Download {
            prefix: prefix.to_string(),
            detail: self.detail(),
        }
    }

    pub(crate) fn into_comparison(self, path: &str) -> CoreError {
        CoreError::Comparison {
            path: path.to_string(),
            detail: self.detail(),
        }
    }

    pub(crate) fn into_notify(self, channel: &'static str) -> CoreError {
        CoreError::Notify {
            channel,
            detail: self.detail(),
        }
    }
}
