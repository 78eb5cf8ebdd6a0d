//! Error types for E2E testing

use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum E2eError {
    /// Missing or unreadable config source, or a blank resolved base URL.
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Unsupported browser: {name}")]
    UnsupportedEngine { name: String },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Timed out after {timeout:?} waiting for {condition}")]
    WaitTimeout { condition: String, timeout: Duration },

    #[error("No browser session is registered for this scenario")]
    NoActiveSession,

    #[error("Browser session {0} has already been quit")]
    StaleSession(String),

    #[error("Session does not support screenshot capture")]
    CaptureUnsupported,

    #[error("WebDriver error: {error} - {message}")]
    WebDriver { error: String, message: String },

    #[error("Test spec parse error: {0}")]
    SpecParse(String),

    #[error("Step failed: {step} - {reason}")]
    StepFailed { step: String, reason: String },

    #[error("Assertion failed: {0}")]
    AssertionFailed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl E2eError {
    /// Whether this error is a timeout raised by the wait engine.
    pub fn is_wait_timeout(&self) -> bool {
        matches!(self, E2eError::WaitTimeout { .. })
    }
}

pub type E2eResult<T> = Result<T, E2eError>;
