//! Harness configuration.
//!
//! Everything environment-specific — the base URL of the application under
//! test, the identifier used to namespace injected session storage keys, and
//! the artifact directory — is sourced from environment variables or a local
//! YAML file rather than hard-coded, so the harness is portable across
//! environments.

use crate::result::{HarnessError, HarnessResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable for the application base URL
pub const ENV_BASE_URL: &str = "COMPROBAR_BASE_URL";

/// Environment variable for the session storage namespace
pub const ENV_STORAGE_NAMESPACE: &str = "COMPROBAR_STORAGE_NAMESPACE";

/// Environment variable for the diagnostic artifact directory
pub const ENV_ARTIFACT_DIR: &str = "COMPROBAR_ARTIFACT_DIR";

/// Environment variable for the default wait timeout in milliseconds
pub const ENV_TIMEOUT_MS: &str = "COMPROBAR_TIMEOUT_MS";

/// Default base URL of the application under test
pub const DEFAULT_BASE_URL: &str = "http://localhost:3000";

/// Default wait timeout (10 seconds)
pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;

/// Harness configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct HarnessConfig {
    /// Base URL of the application under test
    pub base_url: String,
    /// Identifier used to namespace injected session storage keys.
    /// Required before any session can be injected.
    pub storage_namespace: Option<String>,
    /// Directory for diagnostic screenshots
    pub artifact_dir: PathBuf,
    /// Default timeout for wait operations in milliseconds
    pub timeout_ms: u64,
    /// Treat rules that never matched as failures instead of warnings
    pub strict_mocks: bool,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            storage_namespace: None,
            artifact_dir: PathBuf::from("verification"),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            strict_mocks: false,
        }
    }
}

impl HarnessConfig {
    /// Create a new default configuration
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a configuration from the process environment.
    ///
    /// Unset variables fall back to defaults; the storage namespace stays
    /// `None` until supplied, which blocks session injection with a clear
    /// configuration error instead of a silently-ignored token.
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(url) = std::env::var(ENV_BASE_URL) {
            config.base_url = url;
        }
        if let Ok(ns) = std::env::var(ENV_STORAGE_NAMESPACE) {
            if !ns.is_empty() {
                config.storage_namespace = Some(ns);
            }
        }
        if let Ok(dir) = std::env::var(ENV_ARTIFACT_DIR) {
            config.artifact_dir = PathBuf::from(dir);
        }
        if let Ok(ms) = std::env::var(ENV_TIMEOUT_MS) {
            if let Ok(parsed) = ms.parse() {
                config.timeout_ms = parsed;
            }
        }
        config
    }

    /// Load configuration from a YAML file, then apply environment overrides.
    pub fn load(path: &Path) -> HarnessResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: Self = serde_yaml_ng::from_str(&contents)?;
        if let Ok(url) = std::env::var(ENV_BASE_URL) {
            config.base_url = url;
        }
        if let Ok(ns) = std::env::var(ENV_STORAGE_NAMESPACE) {
            if !ns.is_empty() {
                config.storage_namespace = Some(ns);
            }
        }
        config.validate()?;
        Ok(config)
    }

    /// Set the base URL
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set the storage namespace
    #[must_use]
    pub fn with_storage_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.storage_namespace = Some(namespace.into());
        self
    }

    /// Set the artifact directory
    #[must_use]
    pub fn with_artifact_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.artifact_dir = dir.into();
        self
    }

    /// Set the default wait timeout
    #[must_use]
    pub const fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Treat unmatched mock rules as failures
    #[must_use]
    pub const fn with_strict_mocks(mut self) -> Self {
        self.strict_mocks = true;
        self
    }

    /// Resolve a page path against the base URL
    #[must_use]
    pub fn page_url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// Return the storage namespace or a configuration error.
    pub fn require_namespace(&self) -> HarnessResult<&str> {
        self.storage_namespace
            .as_deref()
            .filter(|ns| !ns.is_empty())
            .ok_or_else(|| HarnessError::Configuration {
                message: format!(
                    "storage namespace not set; supply {ENV_STORAGE_NAMESPACE} or the \
                     storage_namespace config key before injecting a session"
                ),
            })
    }

    /// Validate invariants that can be checked without the environment
    pub fn validate(&self) -> HarnessResult<()> {
        if self.base_url.is_empty() {
            return Err(HarnessError::Configuration {
                message: "base_url must not be empty".to_string(),
            });
        }
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(HarnessError::Configuration {
                message: format!("base_url must be an http(s) URL, got {}", self.base_url),
            });
        }
        if self.timeout_ms == 0 {
            return Err(HarnessError::Configuration {
                message: "timeout_ms must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}
