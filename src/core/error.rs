//! Custom error types for dashcheck
//!
//! Every failure is fatal for a verification run, so the variants map onto
//! the ways a run can end early: environment, navigation, timeout, assertion.

use thiserror::Error;

/// Main error type for dashcheck operations
#[derive(Error, Debug)]
pub enum DashcheckError {
    /// Browser binary missing or failed to start
    #[error("Browser launch failed: {0}. Install Chromium/Chrome or pass --chrome <path>")]
    Launch(String),

    /// Target URL unreachable or navigation failed
    #[error("Navigation failed: {0}")]
    Navigation(String),

    /// Expected element or text did not appear in time
    #[error("Timed out after {timeout_ms}ms waiting for {what}")]
    Timeout { what: String, timeout_ms: u64 },

    /// Visibility expectation not met
    #[error("Assertion failed for {locator}: expected {expected}, but was {actual}")]
    Assertion {
        locator: String,
        expected: String,
        actual: String,
    },

    /// Mocked payload does not satisfy the scenario's requirements
    #[error("Fixture error: {0}")]
    Fixture(String),

    /// Browser automation errors outside the categories above
    #[error("Browser error: {0}")]
    Browser(String),

    /// DevTools protocol errors
    #[error("CDP error: {0}")]
    Cdp(#[from] chromiumoxide::error::CdpError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON parsing errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Generic error for other cases
    #[error("{0}")]
    Other(String),
}

/// Convenience Result type for dashcheck operations
pub type Result<T> = std::result::Result<T, DashcheckError>;

impl DashcheckError {
    /// Create a launch error
    pub fn launch(msg: impl Into<String>) -> Self {
        Self::Launch(msg.into())
    }

    /// Create a navigation error
    pub fn navigation(msg: impl Into<String>) -> Self {
        Self::Navigation(msg.into())
    }

    /// Create a timeout error
    pub fn timeout(what: impl Into<String>, timeout_ms: u64) -> Self {
        Self::Timeout {
            what: what.into(),
            timeout_ms,
        }
    }

    /// Create an assertion error
    pub fn assertion(
        locator: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self::Assertion {
            locator: locator.into(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Create a fixture error
    pub fn fixture(msg: impl Into<String>) -> Self {
        Self::Fixture(msg.into())
    }

    /// Create a browser error
    pub fn browser(msg: impl Into<String>) -> Self {
        Self::Browser(msg.into())
    }

    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Wrap an error with additional context
    pub fn with_context<E>(context: impl Into<String>, error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::WithContext {
            context: context.into(),
            source: Box::new(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assertion_message_names_expected_and_actual() {
        let err = DashcheckError::assertion("text \"Normal Issue\"", "visible", "not found");
        assert_eq!(
            err.to_string(),
            "Assertion failed for text \"Normal Issue\": expected visible, but was not found"
        );
    }

    #[test]
    fn test_timeout_message_names_selector() {
        let err = DashcheckError::timeout("text=チケット一覧", 10_000);
        assert_eq!(
            err.to_string(),
            "Timed out after 10000ms waiting for text=チケット一覧"
        );
    }
}
