//! Verification contexts.
//!
//! A context owns everything a scenario is allowed to touch: its mock rule
//! set, its per-origin storage and cookies, and its init scripts. Contexts
//! never share state; routes and storage registered in one context do not
//! propagate to another, so a simulated mobile context must be configured
//! independently of the desktop one.

use crate::config::HarnessConfig;
use crate::routes::RuleSet;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Viewport dimensions for a context
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    /// Width in CSS pixels
    pub width: u32,
    /// Height in CSS pixels
    pub height: u32,
}

impl Viewport {
    /// Default desktop viewport
    pub const DESKTOP: Self = Self {
        width: 1280,
        height: 720,
    };

    /// Simulated phone viewport used by the mobile verification flows
    pub const MOBILE: Self = Self {
        width: 375,
        height: 667,
    };

    /// Create a viewport
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::DESKTOP
    }
}

/// Same site cookie setting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SameSite {
    /// Strict same site
    Strict,
    /// Lax same site
    Lax,
    /// No same site restriction
    None,
}

/// A browser cookie
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cookie {
    /// Cookie name
    pub name: String,
    /// Cookie value
    pub value: String,
    /// Domain
    pub domain: String,
    /// Path
    pub path: String,
    /// Expiration timestamp (seconds since epoch)
    pub expires: Option<i64>,
    /// HTTP only flag
    pub http_only: bool,
    /// Secure flag
    pub secure: bool,
    /// Same site setting
    pub same_site: SameSite,
}

impl Cookie {
    /// Create a new cookie with Lax defaults
    #[must_use]
    pub fn new(name: &str, value: &str, domain: &str) -> Self {
        Self {
            name: name.to_string(),
            value: value.to_string(),
            domain: domain.to_string(),
            path: "/".to_string(),
            expires: None,
            http_only: false,
            secure: false,
            same_site: SameSite::Lax,
        }
    }

    /// Set expiration
    #[must_use]
    pub const fn with_expires(mut self, expires: i64) -> Self {
        self.expires = Some(expires);
        self
    }

    /// Set path
    #[must_use]
    pub fn with_path(mut self, path: &str) -> Self {
        self.path = path.to_string();
        self
    }
}

/// Per-origin storage for a context
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageState {
    /// Cookies
    pub cookies: Vec<Cookie>,
    /// Local storage data, keyed by origin then key
    pub local_storage: HashMap<String, HashMap<String, String>>,
    /// Session storage data, keyed by origin then key
    pub session_storage: HashMap<String, HashMap<String, String>>,
}

impl StorageState {
    /// Create empty storage state
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a cookie
    pub fn add_cookie(&mut self, cookie: Cookie) {
        self.cookies.push(cookie);
    }

    /// Write a local storage item for an origin
    pub fn set_local(&mut self, origin: &str, key: &str, value: &str) {
        self.local_storage
            .entry(origin.to_string())
            .or_default()
            .insert(key.to_string(), value.to_string());
    }

    /// Read a local storage item for an origin
    #[must_use]
    pub fn get_local(&self, origin: &str, key: &str) -> Option<&str> {
        self.local_storage
            .get(origin)
            .and_then(|items| items.get(key))
            .map(String::as_str)
    }

    /// Find a cookie by name
    #[must_use]
    pub fn cookie(&self, name: &str) -> Option<&Cookie> {
        self.cookies.iter().find(|c| c.name == name)
    }

    /// Check if storage is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty() && self.local_storage.is_empty() && self.session_storage.is_empty()
    }

    /// Clear all storage
    pub fn clear(&mut self) {
        self.cookies.clear();
        self.local_storage.clear();
        self.session_storage.clear();
    }
}

/// Configuration for a verification context
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextConfig {
    /// Context name, used in artifact paths and logs
    pub name: String,
    /// Viewport dimensions
    pub viewport: Viewport,
    /// User agent override
    pub user_agent: Option<String>,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            viewport: Viewport::DESKTOP,
            user_agent: None,
        }
    }
}

impl ContextConfig {
    /// Create a named context config
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    /// Set the viewport
    #[must_use]
    pub const fn with_viewport(mut self, viewport: Viewport) -> Self {
        self.viewport = viewport;
        self
    }

    /// Use the mobile viewport preset
    #[must_use]
    pub const fn mobile(mut self) -> Self {
        self.viewport = Viewport::MOBILE;
        self
    }

    /// Set the user agent
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: &str) -> Self {
        self.user_agent = Some(user_agent.to_string());
        self
    }
}

/// An isolated verification context
#[derive(Debug)]
pub struct VerifyContext {
    /// Context identifier
    pub id: String,
    /// Configuration
    pub config: ContextConfig,
    /// Harness configuration this context was created under
    pub harness: HarnessConfig,
    rules: RuleSet,
    storage: StorageState,
    init_scripts: Vec<String>,
    closed: bool,
}

impl VerifyContext {
    /// Create a new context under a harness configuration
    #[must_use]
    pub fn new(config: ContextConfig, harness: HarnessConfig) -> Self {
        let id = format!("ctx-{}", uuid::Uuid::new_v4());
        tracing::debug!(context = %id, name = %config.name, "creating verification context");
        Self {
            id,
            config,
            harness,
            rules: RuleSet::new(),
            storage: StorageState::new(),
            init_scripts: Vec::new(),
            closed: false,
        }
    }

    /// Origin of the application under test (scheme://host[:port])
    #[must_use]
    pub fn origin(&self) -> String {
        let url = &self.harness.base_url;
        match url.find("://") {
            Some(scheme_end) => {
                let rest = &url[scheme_end + 3..];
                let host_end = rest.find('/').unwrap_or(rest.len());
                format!("{}{}", &url[..scheme_end + 3], &rest[..host_end])
            }
            None => url.clone(),
        }
    }

    /// Host portion of the origin, used as the cookie domain
    #[must_use]
    pub fn host(&self) -> String {
        let origin = self.origin();
        let host = origin.split("://").nth(1).unwrap_or(&origin);
        host.split(':').next().unwrap_or(host).to_string()
    }

    /// The context's mock rule set
    #[must_use]
    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// Mutable access to the mock rule set
    pub fn rules_mut(&mut self) -> &mut RuleSet {
        &mut self.rules
    }

    /// The context's storage state
    #[must_use]
    pub fn storage(&self) -> &StorageState {
        &self.storage
    }

    /// Mutable access to the storage state
    pub fn storage_mut(&mut self) -> &mut StorageState {
        &mut self.storage
    }

    /// Split-borrow the rule set together with the local storage map of an
    /// origin, creating the origin's map if it does not exist yet. Page
    /// drivers use this to route application fetches and storage reads
    /// through the context within one page lifecycle.
    pub fn interception_parts(
        &mut self,
        origin: &str,
    ) -> (&mut RuleSet, &HashMap<String, String>) {
        let local = self
            .storage
            .local_storage
            .entry(origin.to_string())
            .or_default();
        (&mut self.rules, &*local)
    }

    /// Register a script that runs before the first page script of every
    /// page in this context
    pub fn add_init_script(&mut self, script: impl Into<String>) {
        self.init_scripts.push(script.into());
    }

    /// Registered init scripts, in registration order
    #[must_use]
    pub fn init_scripts(&self) -> &[String] {
        &self.init_scripts
    }

    /// Close the context, clearing its rules and storage
    pub fn close(&mut self) {
        tracing::debug!(context = %self.id, "closing verification context");
        self.rules.clear();
        self.storage.clear();
        self.init_scripts.clear();
        self.closed = true;
    }

    /// Whether the context has been closed
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        self.closed
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;

    fn context() -> VerifyContext {
        VerifyContext::new(ContextConfig::new("test"), HarnessConfig::default())
    }

    #[test]
    fn test_viewport_presets() {
        assert_eq!(Viewport::DESKTOP.width, 1280);
        assert_eq!(Viewport::MOBILE.width, 375);
        assert_eq!(Viewport::MOBILE.height, 667);
    }

    #[test]
    fn test_context_config_mobile() {
        let config = ContextConfig::new("mobile").mobile();
        assert_eq!(config.viewport, Viewport::MOBILE);
    }

    #[test]
    fn test_origin_extraction() {
        let ctx = context();
        assert_eq!(ctx.origin(), "http://localhost:3000");
        assert_eq!(ctx.host(), "localhost");
    }

    #[test]
    fn test_origin_with_path_in_base_url() {
        let harness = HarnessConfig::default().with_base_url("https://app.example.com/dashboard");
        let ctx = VerifyContext::new(ContextConfig::new("x"), harness);
        assert_eq!(ctx.origin(), "https://app.example.com");
        assert_eq!(ctx.host(), "app.example.com");
    }

    #[test]
    fn test_storage_local_roundtrip() {
        let mut storage = StorageState::new();
        storage.set_local("http://localhost:3000", "key", "value");
        assert_eq!(storage.get_local("http://localhost:3000", "key"), Some("value"));
        assert_eq!(storage.get_local("http://other", "key"), None);
    }

    #[test]
    fn test_contexts_do_not_share_state() {
        let mut a = context();
        let b = context();
        a.storage_mut().set_local("http://localhost:3000", "k", "v");
        a.rules_mut()
            .get("**/api/usage", crate::responder::MockResponse::json(&serde_json::json!({})).unwrap())
            .unwrap();
        assert!(b.storage().is_empty());
        assert_eq!(b.rules().rule_count(), 0);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_close_clears_everything() {
        let mut ctx = context();
        ctx.storage_mut().set_local("http://localhost:3000", "k", "v");
        ctx.add_init_script("localStorage.setItem('a', 'b');");
        ctx.close();
        assert!(ctx.is_closed());
        assert!(ctx.storage().is_empty());
        assert!(ctx.init_scripts().is_empty());
    }

    #[test]
    fn test_cookie_builder() {
        let cookie = Cookie::new("session", "abc", "localhost")
            .with_path("/app")
            .with_expires(1_900_000_000);
        assert_eq!(cookie.path, "/app");
        assert_eq!(cookie.expires, Some(1_900_000_000));
        assert_eq!(cookie.same_site, SameSite::Lax);
    }
}
