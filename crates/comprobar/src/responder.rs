//! Mock response synthesis.
//!
//! A [`Responder`] produces the HTTP response for a matched request. Fixed
//! responders return a stored [`MockResponse`]; dynamic responders inspect the
//! request body and query to branch, e.g. returning a 400 "invalid
//! credentials" payload only for one specific email/password pair.
//!
//! Responders own no shared mutable state. Stateful sequences ("list is empty
//! until the upload succeeds, then contains one item") are modeled by swapping
//! the active rule via `RuleSet::replace`, not by mutation inside a responder.

use crate::result::{HarnessError, HarnessResult};
use crate::routes::HttpMethod;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// Upper bound on artificial response delay. Scenarios observe transient
/// loading states through delays, but a mock must never block a run
/// indefinitely.
pub const MAX_DELAY_MS: u64 = 5_000;

/// A synthesized HTTP response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MockResponse {
    /// HTTP status code
    pub status: u16,
    /// Response headers
    pub headers: HashMap<String, String>,
    /// Response body
    pub body: Vec<u8>,
    /// Content type
    pub content_type: String,
    /// Artificial delay in milliseconds, clamped to [`MAX_DELAY_MS`]
    pub delay_ms: u64,
}

impl Default for MockResponse {
    fn default() -> Self {
        Self {
            status: 200,
            headers: HashMap::new(),
            body: Vec::new(),
            content_type: "application/json".to_string(),
            delay_ms: 0,
        }
    }
}

impl MockResponse {
    /// Create a new empty 200 response
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a 200 JSON response from a serializable value
    pub fn json<T: Serialize>(data: &T) -> HarnessResult<Self> {
        let body = serde_json::to_vec(data)?;
        Ok(Self {
            body,
            ..Self::default()
        })
    }

    /// Create a 200 text response
    #[must_use]
    pub fn text(content: &str) -> Self {
        Self {
            body: content.as_bytes().to_vec(),
            content_type: "text/plain".to_string(),
            ..Self::default()
        }
    }

    /// Create an error response with a JSON `{"error": ...}` body
    #[must_use]
    pub fn error(status: u16, code: &str) -> Self {
        let body = serde_json::json!({ "error": code }).to_string();
        Self {
            status,
            body: body.into_bytes(),
            ..Self::default()
        }
    }

    /// Set status code
    #[must_use]
    pub const fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    /// Set raw body bytes
    #[must_use]
    pub fn with_body(mut self, body: Vec<u8>) -> Self {
        self.body = body;
        self
    }

    /// Set JSON body and content type
    pub fn with_json<T: Serialize>(mut self, data: &T) -> HarnessResult<Self> {
        self.body = serde_json::to_vec(data)?;
        self.content_type = "application/json".to_string();
        Ok(self)
    }

    /// Add a header
    #[must_use]
    pub fn with_header(mut self, key: &str, value: &str) -> Self {
        self.headers.insert(key.to_string(), value.to_string());
        self
    }

    /// Set content type
    #[must_use]
    pub fn with_content_type(mut self, content_type: &str) -> Self {
        self.content_type = content_type.to_string();
        self
    }

    /// Set artificial delay. Values above [`MAX_DELAY_MS`] are clamped.
    #[must_use]
    pub fn with_delay(mut self, delay_ms: u64) -> Self {
        self.delay_ms = delay_ms.min(MAX_DELAY_MS);
        self
    }

    /// Get body as a lossy string
    #[must_use]
    pub fn body_string(&self) -> String {
        String::from_utf8_lossy(&self.body).to_string()
    }

    /// Whether the status is in the 2xx range
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status <= 299
    }

    /// Check the well-formedness invariant: a 2xx response with a JSON
    /// content type must carry a parseable body.
    pub fn validate(&self) -> HarnessResult<()> {
        if self.is_success() && self.content_type.starts_with("application/json") {
            if self.body.is_empty() {
                return Err(HarnessError::ScenarioDefinition {
                    message: format!(
                        "2xx mock with content-type {} has an empty body",
                        self.content_type
                    ),
                });
            }
            serde_json::from_slice::<serde_json::Value>(&self.body).map_err(|e| {
                HarnessError::ScenarioDefinition {
                    message: format!("2xx mock declares JSON but body does not parse: {e}"),
                }
            })?;
        }
        Ok(())
    }
}

/// A request seen by the interception layer before it reaches the network
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterceptedRequest {
    /// Request URL
    pub url: String,
    /// HTTP method
    pub method: HttpMethod,
    /// Request headers
    pub headers: HashMap<String, String>,
    /// Request body
    pub body: Option<Vec<u8>>,
    /// Milliseconds since interception started
    pub timestamp_ms: u64,
}

impl InterceptedRequest {
    /// Create a new intercepted request
    #[must_use]
    pub fn new(url: &str, method: HttpMethod, timestamp_ms: u64) -> Self {
        Self {
            url: url.to_string(),
            method,
            headers: HashMap::new(),
            body: None,
            timestamp_ms,
        }
    }

    /// Attach a request body
    #[must_use]
    pub fn with_body(mut self, body: Vec<u8>) -> Self {
        self.body = Some(body);
        self
    }

    /// Attach a JSON request body
    pub fn with_json_body<T: Serialize>(mut self, data: &T) -> HarnessResult<Self> {
        self.body = Some(serde_json::to_vec(data)?);
        self.headers
            .insert("content-type".to_string(), "application/json".to_string());
        Ok(self)
    }

    /// Get body as a lossy string
    #[must_use]
    pub fn body_string(&self) -> Option<String> {
        self.body
            .as_ref()
            .map(|b| String::from_utf8_lossy(b).to_string())
    }

    /// Parse the body as JSON
    pub fn body_json<T: for<'de> Deserialize<'de>>(&self) -> HarnessResult<T> {
        let body = self
            .body
            .as_ref()
            .ok_or_else(|| HarnessError::ScenarioDefinition {
                message: format!("request to {} has no body", self.url),
            })?;
        let data = serde_json::from_slice(body)?;
        Ok(data)
    }

    /// Parse the URL's query string into key/value pairs. Duplicate keys keep
    /// the last value.
    #[must_use]
    pub fn query(&self) -> HashMap<String, String> {
        let mut params = HashMap::new();
        if let Some((_, qs)) = self.url.split_once('?') {
            for pair in qs.split('&') {
                if pair.is_empty() {
                    continue;
                }
                match pair.split_once('=') {
                    Some((k, v)) => params.insert(k.to_string(), v.to_string()),
                    None => params.insert(pair.to_string(), String::new()),
                };
            }
        }
        params
    }

    /// URL without its query string
    #[must_use]
    pub fn path_url(&self) -> &str {
        self.url.split_once('?').map_or(&*self.url, |(p, _)| p)
    }
}

/// Function type for dynamic responders
pub type ResponderFn = dyn Fn(&InterceptedRequest) -> MockResponse + Send + Sync;

/// Produces a [`MockResponse`] for a matched request
#[derive(Clone)]
pub enum Responder {
    /// Always return the same response
    Fixed(MockResponse),
    /// Compute the response from the request
    Dynamic(Arc<ResponderFn>),
}

impl std::fmt::Debug for Responder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fixed(response) => f.debug_tuple("Fixed").field(response).finish(),
            Self::Dynamic(_) => f.debug_tuple("Dynamic").field(&"<fn>").finish(),
        }
    }
}

impl Responder {
    /// Fixed responder returning `response` for every match
    #[must_use]
    pub const fn fixed(response: MockResponse) -> Self {
        Self::Fixed(response)
    }

    /// Dynamic responder computed per request
    pub fn dynamic<F>(f: F) -> Self
    where
        F: Fn(&InterceptedRequest) -> MockResponse + Send + Sync + 'static,
    {
        Self::Dynamic(Arc::new(f))
    }

    /// Produce the response for `request`. Delays are clamped here as well so
    /// a dynamic responder cannot exceed the bound.
    #[must_use]
    pub fn respond(&self, request: &InterceptedRequest) -> MockResponse {
        let mut response = match self {
            Self::Fixed(response) => response.clone(),
            Self::Dynamic(f) => f(request),
        };
        response.delay_ms = response.delay_ms.min(MAX_DELAY_MS);
        response
    }
}

impl From<MockResponse> for Responder {
    fn from(response: MockResponse) -> Self {
        Self::Fixed(response)
    }
}
