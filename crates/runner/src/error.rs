//! Error types for scenario execution

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Suite-level errors: configuration, driver startup, file IO
#[derive(Error, Debug)]
pub enum E2eError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Playwright not found. Install with: npx playwright install")]
    PlaywrightNotFound,

    #[error("Playwright error: {0}")]
    Playwright(String),

    #[error("Server failed to start: {0}")]
    ServerStartup(String),

    #[error("Server health check failed after {0} attempts")]
    ServerHealthCheck(usize),

    #[error("Scenario spec parse error: {0}")]
    SpecParse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("TOML parse error: {0}")]
    TomlDe(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

pub type E2eResult<T> = Result<T, E2eError>;

impl E2eError {
    /// Reported kind for errors caused by bad input rather than the browser
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            E2eError::Configuration(_)
            | E2eError::SpecParse(_)
            | E2eError::Yaml(_)
            | E2eError::TomlDe(_) => Some(ErrorKind::ConfigurationError),
            _ => None,
        }
    }
}

/// Errors that abort the scenario they occur in.
///
/// Assertion failures are not step errors: they are recorded in the report
/// and execution continues.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StepError {
    #[error("Navigation to {url} timed out after {timeout_ms} ms")]
    NavigationTimeout { url: String, timeout_ms: u64 },

    #[error("Timed out after {timeout_ms} ms waiting for {condition}")]
    WaitTimeout { condition: String, timeout_ms: u64 },

    #[error("Target not found: {0}")]
    TargetNotFound(String),

    #[error("Interaction failed: {0}")]
    InteractionFailed(String),

    #[error("Cancelled: suite deadline exceeded")]
    Cancelled,
}

impl StepError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            StepError::NavigationTimeout { .. } => ErrorKind::NavigationTimeout,
            StepError::WaitTimeout { .. } => ErrorKind::WaitTimeout,
            StepError::TargetNotFound(_) => ErrorKind::TargetNotFound,
            StepError::InteractionFailed(_) => ErrorKind::InteractionFailed,
            StepError::Cancelled => ErrorKind::Cancelled,
        }
    }
}

/// Reported error taxonomy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NavigationTimeout,
    WaitTimeout,
    TargetNotFound,
    InteractionFailed,
    AssertionFailed,
    Cancelled,
    ConfigurationError,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ErrorKind::NavigationTimeout => "NavigationTimeout",
            ErrorKind::WaitTimeout => "WaitTimeout",
            ErrorKind::TargetNotFound => "TargetNotFound",
            ErrorKind::InteractionFailed => "InteractionFailed",
            ErrorKind::AssertionFailed => "AssertionFailed",
            ErrorKind::Cancelled => "Cancelled",
            ErrorKind::ConfigurationError => "ConfigurationError",
        };
        f.write_str(s)
    }
}

/// Errors reported by a [`crate::driver::BrowserDriver`]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DriverError {
    #[error("no element matches {0}")]
    NotFound(String),

    #[error("browser did not respond within {0:?}")]
    Timeout(Duration),

    #[error("{0}")]
    Failed(String),

    #[error("browser session is closed")]
    Closed,
}

pub type DriverResult<T> = Result<T, DriverError>;

impl From<DriverError> for StepError {
    fn from(e: DriverError) -> Self {
        match e {
            DriverError::NotFound(target) => StepError::TargetNotFound(target),
            other => StepError::InteractionFailed(other.to_string()),
        }
    }
}
