//! CLI error type separating usage problems from operational failures.

use std::fmt::{self, Display, Formatter};

use anyhow::anyhow;
use vdiff_adapters::AdapterError;
use vdiff_config::ConfigError;
use vdiff_core::CoreError;
use vdiff_telemetry::TelemetryError;

/// CLI-level error type to distinguish validation from operational failures.
#[derive(Debug)]
pub(crate) enum CliError {
    Validation(String),
    Failure(anyhow::Error),
}

/// Convenience alias for functions returning a `CliError`.
pub(crate) type CliResult<T> = Result<T, CliError>;

impl CliError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub(crate) fn failure(error: impl Into<anyhow::Error>) -> Self {
        Self::Failure(error.into())
    }

    pub(crate) const fn exit_code(&self) -> i32 {
        match self {
            Self::Validation(_) => 2,
            Self::Failure(_) => 3,
        }
    }

    pub(crate) fn display_message(&self) -> String {
        match self {
            Self::Validation(message) => message.clone(),
            Self::Failure(error) => format!("{error:#}"),
        }
    }
}

impl Display for CliError {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str("cli error")
    }
}

impl std::error::Error for CliError {}

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Validation { .. } | CoreError::InvalidPattern { .. } => {
                Self::validation(err.detail())
            }
            other => Self::failure(anyhow!(other.detail())),
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        let context = match &err {
            ConfigError::InvalidField {
                section,
                field,
                value,
                reason,
            } => match value {
                Some(value) => format!("{section}.{field}: {reason} ({value})"),
                None => format!("{section}.{field}: {reason}"),
            },
            ConfigError::InvalidEnv {
                name,
                value,
                reason,
            } => format!("{name}={value}: {reason}"),
            ConfigError::Io {
                operation,
                path,
                source,
            } => format!("{operation} {}: {source}", path.display()),
            ConfigError::Parse { path, source } => format!("{}: {source}", path.display()),
        };
        Self::validation(format!("{err}: {context}"))
    }
}

impl From<AdapterError> for CliError {
    fn from(err: AdapterError) -> Self {
        match err {
            AdapterError::InvalidUrl { .. } => Self::validation(err.detail()),
            other => Self::failure(anyhow!(other.detail())),
        }
    }
}

impl From<TelemetryError> for CliError {
    fn from(err: TelemetryError) -> Self {
        let mut message = err.to_string();
        let mut source = std::error::Error::source(&err);
        while let Some(cause) = source {
            message.push_str(": ");
            message.push_str(&cause.to_string());
            source = cause.source();
        }
        Self::failure(anyhow!(message))
    }
}
