//! Route interception and matching.
//!
//! Mock rules are held in an ordered sequence per verification context.
//! Matching scans newest-first, so the most recently registered matching rule
//! wins (last-write-priority), mirroring standard browser-automation route
//! semantics. Scenario authors register more specific rules after more
//! general ones; that ordering dependency is documented contract.
//!
//! Glob semantics: `*` matches within a path segment, `**` matches across
//! segments. A trailing `?*` makes the query string optional, so one
//! registration covers both `/api/airlock` and `/api/airlock?status=QUEUED`.

use crate::responder::{InterceptedRequest, MockResponse, Responder};
use crate::result::{HarnessError, HarnessResult};
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// HTTP methods for request matching
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HttpMethod {
    /// GET request
    Get,
    /// POST request
    Post,
    /// PUT request
    Put,
    /// DELETE request
    Delete,
    /// PATCH request
    Patch,
    /// HEAD request
    Head,
    /// OPTIONS request
    Options,
    /// Any method (no filter)
    Any,
}

impl HttpMethod {
    /// Parse from a method string; unknown methods match everything
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.to_uppercase().as_str() {
            "GET" => Self::Get,
            "POST" => Self::Post,
            "PUT" => Self::Put,
            "DELETE" => Self::Delete,
            "PATCH" => Self::Patch,
            "HEAD" => Self::Head,
            "OPTIONS" => Self::Options,
            _ => Self::Any,
        }
    }

    /// Convert to the wire string
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
            Self::Patch => "PATCH",
            Self::Head => "HEAD",
            Self::Options => "OPTIONS",
            Self::Any => "*",
        }
    }

    /// Check whether this filter accepts another method
    #[must_use]
    pub fn matches(&self, other: &Self) -> bool {
        *self == Self::Any || *other == Self::Any || *self == *other
    }
}

/// Pattern for matching request URLs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum UrlPattern {
    /// Exact URL match
    Exact(String),
    /// Prefix match
    Prefix(String),
    /// Contains substring
    Contains(String),
    /// Regex match
    Regex(String),
    /// Glob pattern: `*` within a segment, `**` across segments, optional
    /// trailing `?*` for "with or without a query string"
    Glob(String),
    /// Match any URL
    Any,
}

impl UrlPattern {
    /// Convenience constructor for a glob pattern
    #[must_use]
    pub fn glob(pattern: impl Into<String>) -> Self {
        Self::Glob(pattern.into())
    }

    /// Check if a URL matches this pattern
    #[must_use]
    pub fn matches(&self, url: &str) -> bool {
        match self {
            Self::Exact(pattern) => url == pattern,
            Self::Prefix(pattern) => url.starts_with(pattern),
            Self::Contains(pattern) => url.contains(pattern),
            Self::Regex(pattern) => regex::Regex::new(pattern)
                .map(|re| re.is_match(url))
                .unwrap_or(false),
            Self::Glob(pattern) => Self::glob_matches(pattern, url),
            Self::Any => true,
        }
    }

    /// Regex source equivalent to this pattern, usable both by the Rust
    /// matcher and by the in-page fetch shim's `RegExp`.
    #[must_use]
    pub fn to_regex_source(&self) -> String {
        match self {
            Self::Exact(s) => format!("^{}$", regex::escape(s)),
            Self::Prefix(s) => format!("^{}", regex::escape(s)),
            Self::Contains(s) => regex::escape(s),
            Self::Regex(s) => s.clone(),
            Self::Glob(s) => Self::glob_to_regex(s),
            Self::Any => ".*".to_string(),
        }
    }

    /// Segment-aware glob matching via regex translation.
    fn glob_matches(pattern: &str, url: &str) -> bool {
        regex::Regex::new(&Self::glob_to_regex(pattern))
            .map(|re| re.is_match(url))
            .unwrap_or(false)
    }

    /// Translate a glob into an anchored regex. `**` crosses `/` boundaries,
    /// `*` does not, and a trailing `?*` becomes an optional query suffix.
    fn glob_to_regex(pattern: &str) -> String {
        let (base, optional_query) = match pattern.strip_suffix("?*") {
            Some(stripped) => (stripped, true),
            None => (pattern, false),
        };

        let mut re = String::with_capacity(base.len() + 16);
        re.push('^');
        let mut chars = base.chars().peekable();
        while let Some(c) = chars.next() {
            match c {
                '*' => {
                    if chars.peek() == Some(&'*') {
                        chars.next();
                        re.push_str(".*");
                    } else {
                        re.push_str("[^/]*");
                    }
                }
                _ => {
                    if regex_metachar(c) {
                        re.push('\\');
                    }
                    re.push(c);
                }
            }
        }
        if optional_query {
            re.push_str("(\\?.*)?");
        }
        re.push('$');
        re
    }
}

const fn regex_metachar(c: char) -> bool {
    matches!(
        c,
        '.' | '+' | '?' | '(' | ')' | '[' | ']' | '{' | '}' | '^' | '$' | '|' | '\\'
    )
}

impl std::fmt::Display for UrlPattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Exact(s) | Self::Prefix(s) | Self::Contains(s) | Self::Regex(s) | Self::Glob(s) => {
                write!(f, "{s}")
            }
            Self::Any => write!(f, "*"),
        }
    }
}

/// Identifier of a registered rule, used for removal and replacement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RuleId(u64);

/// A registered mock rule
#[derive(Debug, Clone)]
pub struct MockRule {
    /// Rule identifier
    pub id: RuleId,
    /// URL pattern to match
    pub pattern: UrlPattern,
    /// Method filter; [`HttpMethod::Any`] means no filter
    pub method: HttpMethod,
    /// Responder producing the mock response
    pub responder: Responder,
    /// Number of requests this rule has answered
    pub invocations: usize,
}

impl MockRule {
    /// Check if this rule matches a request
    #[must_use]
    pub fn matches(&self, request: &InterceptedRequest) -> bool {
        self.pattern.matches(&request.url) && self.method.matches(&request.method)
    }

    /// Whether the rule answered at least one request during the run
    #[must_use]
    pub const fn was_invoked(&self) -> bool {
        self.invocations > 0
    }
}

/// Ordered, context-scoped collection of mock rules.
///
/// Also captures every request it answers so scenarios can assert on observed
/// traffic (e.g. the commit endpoint received exactly the expected payload).
#[derive(Debug)]
pub struct RuleSet {
    rules: Vec<MockRule>,
    captured: Vec<InterceptedRequest>,
    next_id: u64,
    start_time: Instant,
}

impl Default for RuleSet {
    fn default() -> Self {
        Self::new()
    }
}

impl RuleSet {
    /// Create an empty rule set
    #[must_use]
    pub fn new() -> Self {
        Self {
            rules: Vec::new(),
            captured: Vec::new(),
            next_id: 0,
            start_time: Instant::now(),
        }
    }

    /// Register a rule. Fixed responders are validated eagerly so a
    /// malformed 2xx JSON body fails at registration, not mid-scenario.
    pub fn register(
        &mut self,
        pattern: UrlPattern,
        method: HttpMethod,
        responder: impl Into<Responder>,
    ) -> HarnessResult<RuleId> {
        let responder = responder.into();
        if let Responder::Fixed(ref response) = responder {
            response.validate()?;
        }
        let id = RuleId(self.next_id);
        self.next_id += 1;
        tracing::debug!(rule = %pattern, method = method.as_str(), "registering mock rule");
        self.rules.push(MockRule {
            id,
            pattern,
            method,
            responder,
            invocations: 0,
        });
        Ok(id)
    }

    /// Register a GET rule for a glob pattern
    pub fn get(
        &mut self,
        pattern: &str,
        responder: impl Into<Responder>,
    ) -> HarnessResult<RuleId> {
        self.register(UrlPattern::glob(pattern), HttpMethod::Get, responder)
    }

    /// Register a POST rule for a glob pattern
    pub fn post(
        &mut self,
        pattern: &str,
        responder: impl Into<Responder>,
    ) -> HarnessResult<RuleId> {
        self.register(UrlPattern::glob(pattern), HttpMethod::Post, responder)
    }

    /// Remove a rule by id. Returns true if the rule existed.
    pub fn unregister(&mut self, id: RuleId) -> bool {
        let before = self.rules.len();
        self.rules.retain(|rule| rule.id != id);
        before != self.rules.len()
    }

    /// Swap the responder of an existing rule in place, keeping its pattern
    /// and position. This is the named transition for stateful mocks:
    /// "list is empty until the upload succeeds" becomes a single `replace`
    /// after the upload step instead of an unregister/register dance.
    pub fn replace(&mut self, id: RuleId, responder: impl Into<Responder>) -> HarnessResult<()> {
        let responder = responder.into();
        if let Responder::Fixed(ref response) = responder {
            response.validate()?;
        }
        let rule = self
            .rules
            .iter_mut()
            .find(|rule| rule.id == id)
            .ok_or_else(|| HarnessError::ScenarioDefinition {
                message: format!("replace on unknown rule id {id:?}"),
            })?;
        tracing::debug!(rule = %rule.pattern, "replacing mock responder");
        rule.responder = responder;
        Ok(())
    }

    /// Find the winning rule for a request without recording an invocation
    #[must_use]
    pub fn match_request(&self, request: &InterceptedRequest) -> Option<&MockRule> {
        self.rules.iter().rev().find(|rule| rule.matches(request))
    }

    /// Answer a request. Returns the synthesized response of the winning
    /// rule, or `None` when no rule matches and the caller must forward the
    /// request unmodified to the real network.
    pub fn handle_request(&mut self, mut request: InterceptedRequest) -> Option<MockResponse> {
        request.timestamp_ms = self.start_time.elapsed().as_millis() as u64;
        let position = self
            .rules
            .iter()
            .rposition(|rule| rule.matches(&request))?;
        let rule = &mut self.rules[position];
        rule.invocations += 1;
        let response = rule.responder.respond(&request);
        tracing::debug!(
            url = %request.url,
            method = request.method.as_str(),
            status = response.status,
            "request intercepted"
        );
        self.captured.push(request);
        Some(response)
    }

    /// All requests answered by this rule set, in arrival order
    #[must_use]
    pub fn captured_requests(&self) -> &[InterceptedRequest] {
        &self.captured
    }

    /// Captured requests whose URL matches a pattern
    #[must_use]
    pub fn requests_matching(&self, pattern: &UrlPattern) -> Vec<&InterceptedRequest> {
        self.captured
            .iter()
            .filter(|r| pattern.matches(&r.url))
            .collect()
    }

    /// First captured request matching a pattern
    #[must_use]
    pub fn find_request(&self, pattern: &UrlPattern) -> Option<&InterceptedRequest> {
        self.captured.iter().find(|r| pattern.matches(&r.url))
    }

    /// Assert that at least one request matching `pattern` was answered
    pub fn assert_requested(&self, pattern: &UrlPattern) -> HarnessResult<()> {
        if self.requests_matching(pattern).is_empty() {
            return Err(HarnessError::AssertionMismatch {
                expected: format!("at least one request matching {pattern}"),
                actual: "no matching request captured".to_string(),
            });
        }
        Ok(())
    }

    /// Assert that exactly `times` requests matching `pattern` were answered
    pub fn assert_requested_times(&self, pattern: &UrlPattern, times: usize) -> HarnessResult<()> {
        let found = self.requests_matching(pattern).len();
        if found != times {
            return Err(HarnessError::AssertionMismatch {
                expected: format!("{times} requests matching {pattern}"),
                actual: format!("{found} captured"),
            });
        }
        Ok(())
    }

    /// Rules that never answered a request. A stale pattern is usually a
    /// harness bug, not an application defect, so callers report these as
    /// warnings distinct from assertion failures.
    #[must_use]
    pub fn unmatched_rules(&self) -> Vec<&MockRule> {
        self.rules.iter().filter(|rule| !rule.was_invoked()).collect()
    }

    /// Registered rules in registration order
    #[must_use]
    pub fn rules(&self) -> &[MockRule] {
        &self.rules
    }

    /// Number of registered rules
    #[must_use]
    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// Remove all rules and captured requests
    pub fn clear(&mut self) {
        self.rules.clear();
        self.captured.clear();
    }
}
