//! Result and error types for Comprobar.

use thiserror::Error;

/// Result type for harness operations
pub type HarnessResult<T> = Result<T, HarnessError>;

/// Errors that can occur while driving a verification scenario
#[derive(Debug, Error)]
pub enum HarnessError {
    /// Target unreachable or errored before any DOM settled. Fatal to the
    /// scenario, distinct from an application-level failure.
    #[error("Navigation to {url} failed: {message}")]
    Navigation {
        /// URL that failed
        url: String,
        /// Error message
        message: String,
    },

    /// Expected condition did not occur within the bound
    #[error("Wait for {condition} timed out after {timeout_ms}ms")]
    WaitTimeout {
        /// Description of the condition waited for
        condition: String,
        /// Timeout in milliseconds
        timeout_ms: u64,
    },

    /// Condition observed but value differs from expectation
    #[error("Assertion mismatch: expected {expected}, observed {actual}")]
    AssertionMismatch {
        /// Expected value or state
        expected: String,
        /// Observed value or state
        actual: String,
    },

    /// Injected session was ignored by the application under test
    #[error("Injected session rejected: redirected to {redirect_url}")]
    SessionRejected {
        /// Login route the application redirected to
        redirect_url: String,
    },

    /// Session token invariant violation at build or injection time
    #[error("Invalid session token: {message}")]
    InvalidToken {
        /// Error message
        message: String,
    },

    /// A registered mock rule never matched any request during the run
    #[error("Mock rule never matched: {pattern}")]
    MockConfiguration {
        /// Pattern of the stale rule
        pattern: String,
    },

    /// Harness configuration error (missing namespace, bad base URL)
    #[error("Configuration error: {message}")]
    Configuration {
        /// Error message
        message: String,
    },

    /// Diagnostic capture failed
    #[error("Screenshot failed: {message}")]
    Screenshot {
        /// Error message
        message: String,
    },

    /// Interaction with a page element failed
    #[error("Interaction failed on {selector}: {message}")]
    Interaction {
        /// Selector of the target element
        selector: String,
        /// Error message
        message: String,
    },

    /// Browser launch or connection error
    #[error("Browser error: {message}")]
    Browser {
        /// Error message
        message: String,
    },

    /// Scenario file could not be parsed or failed validation
    #[error("Scenario definition error: {message}")]
    ScenarioDefinition {
        /// Error message
        message: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),
}

impl HarnessError {
    /// Whether this failure aborts the scenario before any step can recover.
    ///
    /// Navigation errors are fatal; everything else is recorded against the
    /// failing step.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::Navigation { .. })
    }

    /// Whether this is a warning-grade condition rather than a scenario
    /// failure. Stale mock rules usually indicate a wrong pattern, not an
    /// application defect.
    #[must_use]
    pub const fn is_warning(&self) -> bool {
        matches!(self, Self::MockConfiguration { .. })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn test_navigation_is_fatal() {
        let err = HarnessError::Navigation {
            url: "http://localhost:3000".to_string(),
            message: "connection refused".to_string(),
        };
        assert!(err.is_fatal());
        assert!(!err.is_warning());
    }

    #[test]
    fn test_mock_configuration_is_warning() {
        let err = HarnessError::MockConfiguration {
            pattern: "**/api/usage".to_string(),
        };
        assert!(err.is_warning());
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_wait_timeout_message() {
        let err = HarnessError::WaitTimeout {
            condition: "selector text=Loading visible".to_string(),
            timeout_ms: 5000,
        };
        let msg = err.to_string();
        assert!(msg.contains("5000ms"));
        assert!(msg.contains("text=Loading"));
    }

    #[test]
    fn test_assertion_mismatch_carries_both_sides() {
        let err = HarnessError::AssertionMismatch {
            expected: "QUEUED".to_string(),
            actual: "FAILED".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("QUEUED"));
        assert!(msg.contains("FAILED"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: HarnessError = io.into();
        assert!(matches!(err, HarnessError::Io(_)));
    }
}
