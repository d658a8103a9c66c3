//! YAML scenario documents.
//!
//! A playbook declares everything one verification run needs: the mock rules
//! for the endpoints the page touches, an optional session fixture, and the
//! ordered steps. Documents are strict: unknown fields and unsupported
//! schema versions are rejected at load time, not silently ignored.
//!
//! ```yaml
//! version: "1.0"
//! name: airlock empty state
//! mocks:
//!   - pattern: "**/api/airlock?*"
//!     body: []
//! session:
//!   user_id: fake-user-id
//!   email: test@example.com
//! steps:
//!   - type: navigate
//!     path: /airlock
//!   - type: wait
//!     condition: { type: visible, selector: { type: text, value: "All Systems Nominal" } }
//!   - type: assert
//!     selector: { type: text, value: "No pending data" }
//!     expected: { type: visible }
//! ```

use comprobar::prelude::*;
use comprobar::result::HarnessResult;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Supported schema version
pub const SCHEMA_VERSION: &str = "1.0";

/// Root playbook document
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PlaybookDoc {
    /// Schema version (must be "1.0")
    pub version: String,
    /// Scenario name
    pub name: String,
    /// Human-readable description
    #[serde(default)]
    pub description: String,
    /// Session fixture injected before navigation
    #[serde(default)]
    pub session: Option<SessionSpec>,
    /// Mock rules registered before the run, in order
    #[serde(default)]
    pub mocks: Vec<MockSpec>,
    /// Ordered steps
    pub steps: Vec<StepSpec>,
}

/// Session fixture declaration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SessionSpec {
    /// User id
    pub user_id: String,
    /// Email address
    pub email: String,
    /// Role; defaults to "authenticated"
    #[serde(default)]
    pub role: Option<String>,
    /// Token lifetime in seconds; defaults to one hour
    #[serde(default)]
    pub expires_in: Option<i64>,
    /// Also mirror the token into a same-domain cookie
    #[serde(default)]
    pub cookie_mirror: bool,
}

/// Mock rule declaration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MockSpec {
    /// URL glob pattern
    pub pattern: String,
    /// HTTP method filter; any method when absent
    #[serde(default)]
    pub method: Option<String>,
    /// Status code
    #[serde(default = "default_status")]
    pub status: u16,
    /// Content type override
    #[serde(default)]
    pub content_type: Option<String>,
    /// Response body as a JSON value
    pub body: serde_json::Value,
    /// Artificial delay in milliseconds
    #[serde(default)]
    pub delay_ms: u64,
}

const fn default_status() -> u16 {
    200
}

/// Element selector declaration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", deny_unknown_fields)]
pub enum SelectorSpec {
    /// CSS selector, optionally filtered by text
    Css {
        /// Selector string
        value: String,
        /// Text filter
        #[serde(default)]
        text: Option<String>,
    },
    /// Visible text
    Text {
        /// Text content
        value: String,
    },
    /// data-testid attribute
    TestId {
        /// Test id
        value: String,
    },
    /// ARIA role, optionally with an accessible name
    Role {
        /// Role string
        value: String,
        /// Accessible name
        #[serde(default)]
        name: Option<String>,
    },
}

impl SelectorSpec {
    fn to_selector(&self) -> Selector {
        match self {
            Self::Css { value, text } => match text {
                Some(text) => Selector::css(value.clone()).with_text(text.clone()),
                None => Selector::css(value.clone()),
            },
            Self::Text { value } => Selector::text(value.clone()),
            Self::TestId { value } => Selector::test_id(value.clone()),
            Self::Role { value, name } => match name {
                Some(name) => Selector::role_named(value.clone(), name.clone()),
                None => Selector::role(value.clone()),
            },
        }
    }
}

/// Wait condition declaration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", deny_unknown_fields)]
pub enum ConditionSpec {
    /// Selector resolves to a visible element
    Visible {
        /// Target element
        selector: SelectorSpec,
    },
    /// Selector resolves to no visible element
    Hidden {
        /// Target element
        selector: SelectorSpec,
    },
    /// Page URL matches a glob pattern
    Url {
        /// URL glob
        pattern: String,
    },
    /// No requests in flight
    NetworkIdle,
}

impl ConditionSpec {
    fn to_condition(&self) -> WaitCondition {
        match self {
            Self::Visible { selector } => WaitCondition::SelectorVisible(selector.to_selector()),
            Self::Hidden { selector } => WaitCondition::SelectorHidden(selector.to_selector()),
            Self::Url { pattern } => WaitCondition::UrlMatches(UrlPattern::glob(pattern.clone())),
            Self::NetworkIdle => WaitCondition::NetworkIdle,
        }
    }
}

/// Post-condition declaration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", deny_unknown_fields)]
pub enum ExpectSpec {
    /// Element is visible
    Visible,
    /// Element is absent or hidden
    Hidden,
    /// Text equals a value
    TextEquals {
        /// Expected text
        value: String,
    },
    /// Text contains a value
    TextContains {
        /// Expected fragment
        value: String,
    },
    /// Attribute equals a value
    Attribute {
        /// Attribute name
        name: String,
        /// Expected value
        value: String,
    },
    /// Element carries a CSS class
    HasClass {
        /// Class name
        value: String,
    },
}

impl ExpectSpec {
    fn to_expectation(&self) -> Expectation {
        match self {
            Self::Visible => Expectation::Visible,
            Self::Hidden => Expectation::Hidden,
            Self::TextEquals { value } => Expectation::TextEquals(value.clone()),
            Self::TextContains { value } => Expectation::TextContains(value.clone()),
            Self::Attribute { name, value } => Expectation::AttributeEquals {
                name: name.clone(),
                value: value.clone(),
            },
            Self::HasClass { value } => Expectation::HasClass(value.clone()),
        }
    }
}

/// One step declaration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", deny_unknown_fields)]
pub enum StepSpec {
    /// Navigate to a page path
    Navigate {
        /// Path, resolved against the base URL
        path: String,
    },
    /// Suspend until a condition holds
    Wait {
        /// Condition
        condition: ConditionSpec,
        /// Timeout override in milliseconds
        #[serde(default)]
        timeout_ms: Option<u64>,
    },
    /// Fill an input
    Fill {
        /// Target element
        selector: SelectorSpec,
        /// Value to fill
        value: String,
    },
    /// Click an element
    Click {
        /// Target element
        selector: SelectorSpec,
    },
    /// Choose a select option
    Select {
        /// Target element
        selector: SelectorSpec,
        /// Option value
        value: String,
    },
    /// Set the files of a file input
    SetFiles {
        /// Target element
        selector: SelectorSpec,
        /// File paths
        files: Vec<String>,
    },
    /// Check a post-condition
    Assert {
        /// Target element
        selector: SelectorSpec,
        /// Expected state
        expected: ExpectSpec,
    },
    /// Capture an informational screenshot
    Screenshot {
        /// Artifact name
        name: String,
    },
}

impl PlaybookDoc {
    /// Parse a playbook from YAML text
    pub fn parse(contents: &str) -> HarnessResult<Self> {
        let doc: Self = serde_yaml_ng::from_str(contents)?;
        doc.validate()?;
        Ok(doc)
    }

    /// Load a playbook from a file
    pub fn load(path: &Path) -> HarnessResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Check document invariants
    pub fn validate(&self) -> HarnessResult<()> {
        if self.version != SCHEMA_VERSION {
            return Err(HarnessError::ScenarioDefinition {
                message: format!(
                    "unsupported schema version {:?}, expected {SCHEMA_VERSION:?}",
                    self.version
                ),
            });
        }
        if self.name.trim().is_empty() {
            return Err(HarnessError::ScenarioDefinition {
                message: "playbook name must not be empty".to_string(),
            });
        }
        if self.steps.is_empty() {
            return Err(HarnessError::ScenarioDefinition {
                message: format!("playbook {:?} has no steps", self.name),
            });
        }
        Ok(())
    }

    /// Register the document's mocks and session fixture in a context
    pub fn apply(&self, ctx: &mut VerifyContext) -> HarnessResult<()> {
        for mock in &self.mocks {
            let mut response = MockResponse::json(&mock.body)?
                .with_status(mock.status)
                .with_delay(mock.delay_ms);
            if let Some(content_type) = &mock.content_type {
                response = response.with_content_type(content_type);
            }
            let method = mock
                .method
                .as_deref()
                .map_or(HttpMethod::Any, HttpMethod::parse);
            ctx.rules_mut()
                .register(UrlPattern::glob(mock.pattern.clone()), method, response)?;
        }

        if let Some(session) = &self.session {
            let mut builder = SessionToken::builder(&session.user_id, &session.email);
            if let Some(role) = &session.role {
                builder = builder.role(role);
            }
            if let Some(expires_in) = session.expires_in {
                builder = builder.expires_in(expires_in);
            }
            let token = builder.build()?;
            let injector = if session.cookie_mirror {
                SessionInjector::new().with_cookie_mirror()
            } else {
                SessionInjector::new()
            };
            injector.prepare(ctx, &token)?;
        }
        Ok(())
    }

    /// Compile the steps into a runnable scenario
    #[must_use]
    pub fn compile(&self) -> Scenario {
        let mut scenario = Scenario::new(self.name.clone());
        for step in &self.steps {
            scenario = match step {
                StepSpec::Navigate { path } => scenario.navigate(path.clone()),
                StepSpec::Wait {
                    condition,
                    timeout_ms,
                } => match timeout_ms {
                    Some(timeout_ms) => {
                        scenario.wait_until_for(condition.to_condition(), *timeout_ms)
                    }
                    None => scenario.wait_until(condition.to_condition()),
                },
                StepSpec::Fill { selector, value } => {
                    scenario.fill(selector.to_selector(), value.clone())
                }
                StepSpec::Click { selector } => scenario.click(selector.to_selector()),
                StepSpec::Select { selector, value } => {
                    scenario.select(selector.to_selector(), value.clone())
                }
                StepSpec::SetFiles { selector, files } => {
                    scenario.set_files(selector.to_selector(), files.clone())
                }
                StepSpec::Assert { selector, expected } => {
                    scenario.expect_state(selector.to_selector(), expected.to_expectation())
                }
                StepSpec::Screenshot { name } => scenario.screenshot(name.clone()),
            };
        }
        scenario
    }
}
