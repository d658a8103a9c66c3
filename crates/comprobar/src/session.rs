//! Session injection.
//!
//! Writes pre-authenticated identity state into a context's per-origin
//! storage (and optionally a same-domain cookie) before the first page script
//! runs, so the application renders as a logged-in user without performing a
//! real login.
//!
//! Tokens are produced only through [`SessionTokenBuilder`], which guarantees
//! the fields the application's auth client reads are always present and the
//! expiry is in the future. The storage key is derived from the configured
//! namespace identifier; an unset namespace is a configuration error rather
//! than a silently-ignored session.

use crate::context::{Cookie, VerifyContext};
use crate::result::{HarnessError, HarnessResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Route the application redirects to when it treats the user as
/// unauthenticated
pub const LOGIN_ROUTE: &str = "/login";

/// The authenticated user embedded in a session token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionUser {
    /// User identifier
    pub id: String,
    /// Email address
    pub email: String,
    /// Role, typically "authenticated"
    pub role: String,
    /// Arbitrary user metadata
    #[serde(default)]
    pub user_metadata: Value,
}

/// A session token as the application's auth client persists it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionToken {
    /// Access token
    pub access_token: String,
    /// Refresh token
    pub refresh_token: String,
    /// Token type, always "bearer"
    pub token_type: String,
    /// Lifetime in seconds
    pub expires_in: i64,
    /// Absolute expiry as epoch seconds
    pub expires_at: i64,
    /// The authenticated user
    pub user: SessionUser,
}

impl SessionToken {
    /// Start building a token for a user id and email
    #[must_use]
    pub fn builder(user_id: &str, email: &str) -> SessionTokenBuilder {
        SessionTokenBuilder::new(user_id, email)
    }

    /// Whether the token is expired at `now` (epoch seconds)
    #[must_use]
    pub const fn is_expired_at(&self, now: i64) -> bool {
        self.expires_at <= now
    }

    /// Whether the token is expired right now
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(chrono::Utc::now().timestamp())
    }
}

/// Builder that guarantees required token fields are present and valid
#[derive(Debug, Clone)]
pub struct SessionTokenBuilder {
    user_id: String,
    email: String,
    role: String,
    user_metadata: Value,
    access_token: String,
    refresh_token: String,
    expires_in: i64,
    expires_at: Option<i64>,
}

impl SessionTokenBuilder {
    /// Create a builder with one hour of validity and fixture token strings
    #[must_use]
    pub fn new(user_id: &str, email: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            email: email.to_string(),
            role: "authenticated".to_string(),
            user_metadata: Value::Object(serde_json::Map::new()),
            access_token: "fake-token".to_string(),
            refresh_token: "fake-refresh-token".to_string(),
            expires_in: 3600,
            expires_at: None,
        }
    }

    /// Set the role
    #[must_use]
    pub fn role(mut self, role: &str) -> Self {
        self.role = role.to_string();
        self
    }

    /// Set user metadata
    #[must_use]
    pub fn user_metadata(mut self, metadata: Value) -> Self {
        self.user_metadata = metadata;
        self
    }

    /// Set the access token string
    #[must_use]
    pub fn access_token(mut self, token: &str) -> Self {
        self.access_token = token.to_string();
        self
    }

    /// Set the refresh token string
    #[must_use]
    pub fn refresh_token(mut self, token: &str) -> Self {
        self.refresh_token = token.to_string();
        self
    }

    /// Set the lifetime in seconds; expiry is computed from now
    #[must_use]
    pub const fn expires_in(mut self, seconds: i64) -> Self {
        self.expires_in = seconds;
        self
    }

    /// Pin an absolute expiry (epoch seconds). Only needed when a scenario
    /// deliberately constructs a stale token to verify the logged-out path.
    #[must_use]
    pub const fn expires_at(mut self, epoch_seconds: i64) -> Self {
        self.expires_at = Some(epoch_seconds);
        self
    }

    /// Build the token, enforcing required-field invariants
    pub fn build(self) -> HarnessResult<SessionToken> {
        if self.user_id.is_empty() {
            return Err(HarnessError::InvalidToken {
                message: "user id must not be empty".to_string(),
            });
        }
        if self.email.is_empty() || !self.email.contains('@') {
            return Err(HarnessError::InvalidToken {
                message: format!("email {:?} is not a valid address", self.email),
            });
        }
        if self.expires_in <= 0 && self.expires_at.is_none() {
            return Err(HarnessError::InvalidToken {
                message: "expires_in must be positive".to_string(),
            });
        }
        let now = chrono::Utc::now().timestamp();
        let expires_at = self.expires_at.unwrap_or(now + self.expires_in);
        Ok(SessionToken {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            token_type: "bearer".to_string(),
            expires_in: self.expires_in,
            expires_at,
            user: SessionUser {
                id: self.user_id,
                email: self.email,
                role: self.role,
                user_metadata: self.user_metadata,
            },
        })
    }
}

/// Injects a session token into a verification context before navigation
#[derive(Debug, Clone, Default)]
pub struct SessionInjector {
    mirror_cookie: bool,
}

impl SessionInjector {
    /// Create an injector that only writes local storage
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Also mirror the token into a same-domain cookie
    #[must_use]
    pub const fn with_cookie_mirror(mut self) -> Self {
        self.mirror_cookie = true;
        self
    }

    /// Derive the storage key for a namespace identifier
    #[must_use]
    pub fn storage_key(namespace: &str) -> String {
        format!("sb-{namespace}-auth-token")
    }

    /// Register the session in `context`.
    ///
    /// Writes the serialized token into the context's local storage under the
    /// namespaced key and registers an init script that replays the write
    /// before the first page script of every page, so navigation cannot race
    /// app initialization. An expired token is rejected here; injecting one
    /// would produce a logged-out run that fails later with a confusing
    /// timeout.
    pub fn prepare(&self, context: &mut VerifyContext, token: &SessionToken) -> HarnessResult<()> {
        if token.is_expired() {
            return Err(HarnessError::InvalidToken {
                message: format!(
                    "token for {} expired at {}; the app would treat the session as stale",
                    token.user.email, token.expires_at
                ),
            });
        }
        let namespace = context.harness.require_namespace()?.to_string();
        let key = Self::storage_key(&namespace);
        let value = serde_json::to_string(token)?;
        let origin = context.origin();

        tracing::info!(context = %context.id, key = %key, user = %token.user.email, "injecting session");

        context.storage_mut().set_local(&origin, &key, &value);

        // JS string literals via serde_json keeps quoting correct for any
        // token contents.
        let key_js = serde_json::to_string(&key)?;
        let value_js = serde_json::to_string(&value)?;
        context.add_init_script(format!("localStorage.setItem({key_js}, {value_js});"));

        if self.mirror_cookie {
            let host = context.host();
            let cookie = Cookie::new(&key, &value, &host).with_expires(token.expires_at);
            context.storage_mut().add_cookie(cookie);
        }
        Ok(())
    }

    /// Detect a silently-ignored session from a post-navigation URL.
    ///
    /// When the namespace does not match what the application expects, the
    /// injected session is ignored and the app redirects to its login route.
    /// Surfacing that as [`HarnessError::SessionRejected`] keeps it
    /// distinguishable from a generic wait timeout.
    #[must_use]
    pub fn detect_rejection(current_url: &str) -> Option<HarnessError> {
        let path = current_url
            .split_once("://")
            .map_or(current_url, |(_, rest)| rest);
        let path = path.find('/').map_or("", |i| &path[i..]);
        if path == LOGIN_ROUTE || path.starts_with("/login?") {
            Some(HarnessError::SessionRejected {
                redirect_url: current_url.to_string(),
            })
        } else {
            None
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::config::HarnessConfig;
    use crate::context::ContextConfig;

    fn context_with_namespace() -> VerifyContext {
        VerifyContext::new(
            ContextConfig::new("test"),
            HarnessConfig::default().with_storage_namespace("dyadqaccvdsislghpolv"),
        )
    }

    mod token_builder_tests {
        use super::*;

        #[test]
        fn test_build_defaults() {
            let token = SessionToken::builder("fake-user-id", "test@example.com")
                .build()
                .unwrap();
            assert_eq!(token.token_type, "bearer");
            assert_eq!(token.user.role, "authenticated");
            assert!(!token.is_expired());
        }

        #[test]
        fn test_build_rejects_empty_user_id() {
            let result = SessionToken::builder("", "test@example.com").build();
            assert!(matches!(result, Err(HarnessError::InvalidToken { .. })));
        }

        #[test]
        fn test_build_rejects_bad_email() {
            let result = SessionToken::builder("uid", "not-an-email").build();
            assert!(matches!(result, Err(HarnessError::InvalidToken { .. })));
        }

        #[test]
        fn test_build_rejects_non_positive_lifetime() {
            let result = SessionToken::builder("uid", "a@b.com").expires_in(0).build();
            assert!(result.is_err());
        }

        #[test]
        fn test_pinned_expiry_in_past_builds_but_reads_expired() {
            let token = SessionToken::builder("uid", "a@b.com")
                .expires_at(1_000)
                .build()
                .unwrap();
            assert!(token.is_expired());
        }

        #[test]
        fn test_serialized_shape_matches_auth_client() {
            let token = SessionToken::builder("fake-user-id", "test@example.com")
                .build()
                .unwrap();
            let value = serde_json::to_value(&token).unwrap();
            assert!(value.get("access_token").is_some());
            assert!(value.get("refresh_token").is_some());
            assert!(value.get("expires_at").is_some());
            assert_eq!(value["user"]["id"], "fake-user-id");
            assert_eq!(value["user"]["email"], "test@example.com");
        }
    }

    mod injector_tests {
        use super::*;

        #[test]
        fn test_storage_key_derivation() {
            assert_eq!(
                SessionInjector::storage_key("dyadqaccvdsislghpolv"),
                "sb-dyadqaccvdsislghpolv-auth-token"
            );
        }

        #[test]
        fn test_prepare_writes_storage_and_init_script() {
            let mut ctx = context_with_namespace();
            let token = SessionToken::builder("uid", "a@b.com").build().unwrap();
            SessionInjector::new().prepare(&mut ctx, &token).unwrap();

            let stored = ctx
                .storage()
                .get_local("http://localhost:3000", "sb-dyadqaccvdsislghpolv-auth-token")
                .unwrap();
            let parsed: SessionToken = serde_json::from_str(stored).unwrap();
            assert_eq!(parsed.user.email, "a@b.com");

            assert_eq!(ctx.init_scripts().len(), 1);
            assert!(ctx.init_scripts()[0].starts_with("localStorage.setItem("));
        }

        #[test]
        fn test_prepare_rejects_expired_token() {
            let mut ctx = context_with_namespace();
            let token = SessionToken::builder("uid", "a@b.com")
                .expires_at(1_000)
                .build()
                .unwrap();
            let err = SessionInjector::new().prepare(&mut ctx, &token).unwrap_err();
            assert!(matches!(err, HarnessError::InvalidToken { .. }));
            assert!(ctx.storage().is_empty());
        }

        #[test]
        fn test_prepare_requires_namespace() {
            let mut ctx = VerifyContext::new(ContextConfig::new("x"), HarnessConfig::default());
            let token = SessionToken::builder("uid", "a@b.com").build().unwrap();
            let err = SessionInjector::new().prepare(&mut ctx, &token).unwrap_err();
            assert!(matches!(err, HarnessError::Configuration { .. }));
        }

        #[test]
        fn test_cookie_mirror() {
            let mut ctx = context_with_namespace();
            let token = SessionToken::builder("uid", "a@b.com").build().unwrap();
            SessionInjector::new()
                .with_cookie_mirror()
                .prepare(&mut ctx, &token)
                .unwrap();
            let cookie = ctx
                .storage()
                .cookie("sb-dyadqaccvdsislghpolv-auth-token")
                .unwrap();
            assert_eq!(cookie.domain, "localhost");
            assert_eq!(cookie.expires, Some(token.expires_at));
        }

        #[test]
        fn test_detect_rejection_on_login_redirect() {
            let err =
                SessionInjector::detect_rejection("http://localhost:3000/login").unwrap();
            assert!(matches!(err, HarnessError::SessionRejected { .. }));
            assert!(SessionInjector::detect_rejection(
                "http://localhost:3000/login?next=%2Fportfolio"
            )
            .is_some());
        }

        #[test]
        fn test_detect_rejection_ignores_other_routes() {
            assert!(SessionInjector::detect_rejection("http://localhost:3000/portfolio").is_none());
            assert!(SessionInjector::detect_rejection("http://localhost:3000/loginz").is_none());
        }
    }
}
