//! Scenario execution.
//!
//! A scenario is an ordered sequence of steps executed exactly once against a
//! fresh context: Idle -> Navigating -> Waiting -> Acting -> Asserting ->
//! {Passed, Failed}. Failure at any step short-circuits the remaining steps,
//! writes a diagnostic screenshot, and records which step failed with what
//! was expected and observed. Scenarios may chain several wait/act/assert
//! cycles (verify the empty state, trigger an upload, verify the populated
//! state) within one run.

use crate::config::HarnessConfig;
use crate::context::VerifyContext;
use crate::diagnostics::DiagnosticWriter;
use crate::driver::PageDriver;
use crate::locator::{Interaction, Selector};
use crate::result::{HarnessError, HarnessResult};
use crate::session::{SessionInjector, LOGIN_ROUTE};
use crate::sim::url_path;
use crate::wait::{poll_until, WaitCondition, WaitOptions};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Scenario lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScenarioState {
    /// Not started
    Idle,
    /// Issuing a navigation
    Navigating,
    /// Suspended on a wait condition
    Waiting,
    /// Performing a UI interaction
    Acting,
    /// Checking post-conditions
    Asserting,
    /// All steps passed
    Passed,
    /// A step failed; remaining steps were skipped
    Failed,
}

impl std::fmt::Display for ScenarioState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Navigating => "navigating",
            Self::Waiting => "waiting",
            Self::Acting => "acting",
            Self::Asserting => "asserting",
            Self::Passed => "passed",
            Self::Failed => "failed",
        };
        write!(f, "{name}")
    }
}

/// Post-condition checked against a located element
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expectation {
    /// Element is visible
    Visible,
    /// Element is absent or hidden
    Hidden,
    /// Text content equals a value
    TextEquals(String),
    /// Text content contains a value
    TextContains(String),
    /// Attribute equals a value
    AttributeEquals {
        /// Attribute name
        name: String,
        /// Expected value
        value: String,
    },
    /// Element carries a CSS class
    HasClass(String),
}

impl std::fmt::Display for Expectation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Visible => write!(f, "visible"),
            Self::Hidden => write!(f, "hidden"),
            Self::TextEquals(t) => write!(f, "text == {t:?}"),
            Self::TextContains(t) => write!(f, "text contains {t:?}"),
            Self::AttributeEquals { name, value } => write!(f, "[{name}] == {value:?}"),
            Self::HasClass(c) => write!(f, "has class {c:?}"),
        }
    }
}

/// Hook run between steps, used to swap mock rules mid-scenario
pub type ScenarioHook = Arc<dyn Fn(&mut VerifyContext) -> HarnessResult<()> + Send + Sync>;

/// One step of a scenario
#[derive(Clone)]
pub enum Action {
    /// Navigate to a page path (resolved against the configured base URL)
    Navigate(String),
    /// Suspend until a condition holds
    WaitFor {
        /// Condition to wait for
        condition: WaitCondition,
        /// Timeout override in milliseconds; the harness default applies
        /// when absent
        timeout_ms: Option<u64>,
    },
    /// Perform a UI interaction
    Interact {
        /// Target element
        selector: Selector,
        /// Operation to perform
        operation: Interaction,
    },
    /// Check a post-condition
    Assert {
        /// Target element
        selector: Selector,
        /// Expected state
        expected: Expectation,
    },
    /// Capture an informational screenshot
    Screenshot {
        /// Artifact name
        name: String,
    },
    /// Run a named hook against the context (e.g. a mock-rule swap)
    Hook {
        /// Label shown in reports
        label: String,
        /// The hook
        hook: ScenarioHook,
    },
}

impl std::fmt::Debug for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self}")
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Navigate(path) => write!(f, "navigate {path}"),
            Self::WaitFor { condition, .. } => write!(f, "wait for {condition}"),
            Self::Interact {
                selector,
                operation,
            } => write!(f, "{operation} on {selector}"),
            Self::Assert { selector, expected } => write!(f, "assert {selector} {expected}"),
            Self::Screenshot { name } => write!(f, "screenshot {name}"),
            Self::Hook { label, .. } => write!(f, "hook {label}"),
        }
    }
}

impl Action {
    /// The state the runner enters while executing this step
    #[must_use]
    pub const fn state(&self) -> ScenarioState {
        match self {
            Self::Navigate(_) => ScenarioState::Navigating,
            Self::WaitFor { .. } => ScenarioState::Waiting,
            Self::Interact { .. } | Self::Hook { .. } | Self::Screenshot { .. } => {
                ScenarioState::Acting
            }
            Self::Assert { .. } => ScenarioState::Asserting,
        }
    }
}

/// An ordered sequence of steps, constructed per test and executed once
#[derive(Debug, Clone)]
pub struct Scenario {
    /// Scenario name, used in reports and artifact paths
    pub name: String,
    /// Ordered steps
    pub steps: Vec<Action>,
}

impl Scenario {
    /// Create an empty scenario
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            steps: Vec::new(),
        }
    }

    /// Append a raw action
    #[must_use]
    pub fn step(mut self, action: Action) -> Self {
        self.steps.push(action);
        self
    }

    /// Navigate to a page path
    #[must_use]
    pub fn navigate(self, path: impl Into<String>) -> Self {
        self.step(Action::Navigate(path.into()))
    }

    /// Wait for a condition with the harness default timeout
    #[must_use]
    pub fn wait_until(self, condition: WaitCondition) -> Self {
        self.step(Action::WaitFor {
            condition,
            timeout_ms: None,
        })
    }

    /// Wait for a condition with an explicit timeout
    #[must_use]
    pub fn wait_until_for(self, condition: WaitCondition, timeout_ms: u64) -> Self {
        self.step(Action::WaitFor {
            condition,
            timeout_ms: Some(timeout_ms),
        })
    }

    /// Fill an input
    #[must_use]
    pub fn fill(self, selector: Selector, value: impl Into<String>) -> Self {
        self.step(Action::Interact {
            selector,
            operation: Interaction::Fill(value.into()),
        })
    }

    /// Click an element
    #[must_use]
    pub fn click(self, selector: Selector) -> Self {
        self.step(Action::Interact {
            selector,
            operation: Interaction::Click,
        })
    }

    /// Choose a select option
    #[must_use]
    pub fn select(self, selector: Selector, value: impl Into<String>) -> Self {
        self.step(Action::Interact {
            selector,
            operation: Interaction::Select(value.into()),
        })
    }

    /// Set the files of a file input
    #[must_use]
    pub fn set_files(self, selector: Selector, files: Vec<String>) -> Self {
        self.step(Action::Interact {
            selector,
            operation: Interaction::SetFiles(files),
        })
    }

    /// Assert a post-condition
    #[must_use]
    pub fn expect_state(self, selector: Selector, expected: Expectation) -> Self {
        self.step(Action::Assert { selector, expected })
    }

    /// Capture an informational screenshot
    #[must_use]
    pub fn screenshot(self, name: impl Into<String>) -> Self {
        self.step(Action::Screenshot { name: name.into() })
    }

    /// Run a named hook against the context, e.g. swapping a mock responder
    /// after the action that changes application state
    #[must_use]
    pub fn hook<F>(self, label: impl Into<String>, hook: F) -> Self
    where
        F: Fn(&mut VerifyContext) -> HarnessResult<()> + Send + Sync + 'static,
    {
        self.step(Action::Hook {
            label: label.into(),
            hook: Arc::new(hook),
        })
    }
}

/// Outcome of a single step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    /// Step completed
    Passed,
    /// Step failed with a cause
    Failed(String),
    /// Step skipped because an earlier step failed
    Skipped,
}

/// Record of one executed step
#[derive(Debug, Clone)]
pub struct StepRecord {
    /// Step index within the scenario
    pub index: usize,
    /// Human-readable description
    pub description: String,
    /// Outcome
    pub outcome: StepOutcome,
    /// Time spent on the step
    pub elapsed: Duration,
}

/// Result of one scenario run
#[derive(Debug, Clone)]
pub struct ScenarioReport {
    /// Scenario name
    pub scenario: String,
    /// Terminal state
    pub state: ScenarioState,
    /// Per-step records
    pub steps: Vec<StepRecord>,
    /// Failure cause, when failed
    pub failure: Option<String>,
    /// Diagnostic screenshot path, when failed
    pub diagnostic: Option<PathBuf>,
    /// Patterns of registered rules that never matched a request
    pub stale_rules: Vec<String>,
    /// Total run time
    pub duration: Duration,
}

impl ScenarioReport {
    /// Whether the scenario passed
    #[must_use]
    pub const fn passed(&self) -> bool {
        matches!(self.state, ScenarioState::Passed)
    }
}

/// Executes scenarios against a page driver
#[derive(Debug, Clone)]
pub struct ScenarioRunner {
    config: HarnessConfig,
    diagnostics: DiagnosticWriter,
}

impl ScenarioRunner {
    /// Create a runner for a harness configuration
    #[must_use]
    pub fn new(config: HarnessConfig) -> Self {
        let diagnostics = DiagnosticWriter::new(config.artifact_dir.clone());
        Self {
            config,
            diagnostics,
        }
    }

    /// The runner's diagnostic writer
    #[must_use]
    pub fn diagnostics(&self) -> &DiagnosticWriter {
        &self.diagnostics
    }

    /// Execute a scenario once against a context and driver.
    ///
    /// Every failure is local to this run; the report carries the failing
    /// step, the cause, and the diagnostic screenshot path.
    pub fn run<D: PageDriver>(
        &self,
        ctx: &mut VerifyContext,
        driver: &mut D,
        scenario: &Scenario,
    ) -> ScenarioReport {
        let started = Instant::now();
        let mut steps = Vec::with_capacity(scenario.steps.len());
        let mut failure: Option<String> = None;
        let mut diagnostic: Option<PathBuf> = None;

        tracing::info!(scenario = %scenario.name, "starting scenario");

        for (index, action) in scenario.steps.iter().enumerate() {
            if failure.is_some() {
                steps.push(StepRecord {
                    index,
                    description: action.to_string(),
                    outcome: StepOutcome::Skipped,
                    elapsed: Duration::ZERO,
                });
                continue;
            }

            let state = action.state();
            tracing::debug!(scenario = %scenario.name, step = index, %state, action = %action, "step");

            let step_start = Instant::now();
            let outcome = match self.execute(ctx, driver, &scenario.name, action) {
                Ok(()) => StepOutcome::Passed,
                Err(error) => {
                    let cause = format!("step {index} ({action}): {error}");
                    tracing::warn!(scenario = %scenario.name, %cause, "scenario failed");
                    // Mandatory diagnostic capture before propagating; a
                    // capture failure must not mask the original cause.
                    match self.diagnostics.capture_failure(driver, &scenario.name, index) {
                        Ok(path) => diagnostic = Some(path),
                        Err(capture_error) => {
                            tracing::warn!(%capture_error, "diagnostic capture failed");
                        }
                    }
                    failure = Some(cause.clone());
                    StepOutcome::Failed(cause)
                }
            };
            steps.push(StepRecord {
                index,
                description: action.to_string(),
                outcome,
                elapsed: step_start.elapsed(),
            });
        }

        let stale_rules: Vec<String> = ctx
            .rules()
            .unmatched_rules()
            .iter()
            .map(|rule| rule.pattern.to_string())
            .collect();
        for pattern in &stale_rules {
            tracing::warn!(scenario = %scenario.name, %pattern, "mock rule never matched");
        }

        let state = if failure.is_some() {
            ScenarioState::Failed
        } else if self.config.strict_mocks && !stale_rules.is_empty() {
            failure = Some(format!(
                "strict mocks: {} registered rule(s) never matched: {}",
                stale_rules.len(),
                stale_rules.join(", ")
            ));
            ScenarioState::Failed
        } else {
            ScenarioState::Passed
        };

        tracing::info!(scenario = %scenario.name, %state, "scenario finished");
        ScenarioReport {
            scenario: scenario.name.clone(),
            state,
            steps,
            failure,
            diagnostic,
            stale_rules,
            duration: started.elapsed(),
        }
    }

    fn execute<D: PageDriver>(
        &self,
        ctx: &mut VerifyContext,
        driver: &mut D,
        scenario: &str,
        action: &Action,
    ) -> HarnessResult<()> {
        match action {
            Action::Navigate(path) => {
                let url = self.config.page_url(path);
                driver.goto(ctx, &url)?;
                // A session was injected but the app redirected to its login
                // route: the namespace is wrong or the token was ignored.
                // Surface that as a distinct failure, not a later timeout.
                if has_injected_session(ctx) && url_path(&url) != LOGIN_ROUTE {
                    if let Some(rejection) = SessionInjector::detect_rejection(&driver.current_url())
                    {
                        return Err(rejection);
                    }
                }
                Ok(())
            }
            Action::WaitFor {
                condition,
                timeout_ms,
            } => {
                let options = WaitOptions::new(timeout_ms.unwrap_or(self.config.timeout_ms));
                poll_until(options, &condition.to_string(), || {
                    check_condition(driver, condition)
                })?;
                Ok(())
            }
            Action::Interact {
                selector,
                operation,
            } => driver.interact(ctx, selector, operation),
            Action::Assert { selector, expected } => check_expectation(driver, selector, expected),
            Action::Screenshot { name } => {
                self.diagnostics.capture_named(driver, scenario, name)?;
                Ok(())
            }
            Action::Hook { hook, .. } => hook(ctx),
        }
    }
}

fn has_injected_session(ctx: &VerifyContext) -> bool {
    ctx.storage().local_storage.values().any(|items| {
        items
            .keys()
            .any(|key| key.starts_with("sb-") && key.ends_with("-auth-token"))
    })
}

fn check_condition<D: PageDriver>(driver: &D, condition: &WaitCondition) -> HarnessResult<bool> {
    match condition {
        WaitCondition::SelectorVisible(selector) => driver.is_visible(selector),
        WaitCondition::SelectorHidden(selector) => Ok(!driver.is_visible(selector)?),
        WaitCondition::UrlMatches(pattern) => Ok(pattern.matches(&driver.current_url())),
        WaitCondition::NetworkIdle => Ok(driver.pending_requests() == 0),
    }
}

fn check_expectation<D: PageDriver>(
    driver: &D,
    selector: &Selector,
    expected: &Expectation,
) -> HarnessResult<()> {
    let mismatch = |actual: String| {
        Err(HarnessError::AssertionMismatch {
            expected: format!("{selector} {expected}"),
            actual,
        })
    };
    match expected {
        Expectation::Visible => {
            if driver.is_visible(selector)? {
                Ok(())
            } else {
                mismatch("not visible".to_string())
            }
        }
        Expectation::Hidden => {
            if driver.is_visible(selector)? {
                mismatch("visible".to_string())
            } else {
                Ok(())
            }
        }
        Expectation::TextEquals(text) => match driver.text_of(selector)? {
            Some(actual) if actual == *text => Ok(()),
            Some(actual) => mismatch(format!("text == {actual:?}")),
            None => mismatch("no matching element".to_string()),
        },
        Expectation::TextContains(text) => match driver.text_of(selector)? {
            Some(actual) if actual.contains(text.as_str()) => Ok(()),
            Some(actual) => mismatch(format!("text == {actual:?}")),
            None => mismatch("no matching element".to_string()),
        },
        Expectation::AttributeEquals { name, value } => {
            match driver.attribute_of(selector, name)? {
                Some(actual) if actual == *value => Ok(()),
                Some(actual) => mismatch(format!("[{name}] == {actual:?}")),
                None => mismatch(format!("attribute {name} absent")),
            }
        }
        Expectation::HasClass(class) => {
            if driver.has_class(selector, class)? {
                Ok(())
            } else {
                mismatch(format!("class {class:?} absent"))
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::context::ContextConfig;
    use crate::sim::{SimElement, SimulatedPage, StaticApp};

    fn runner(dir: &std::path::Path) -> ScenarioRunner {
        ScenarioRunner::new(HarnessConfig::default().with_artifact_dir(dir).with_timeout_ms(500))
    }

    fn dashboard_page() -> SimulatedPage {
        SimulatedPage::new(StaticApp::new().page(
            "/",
            vec![
                ("nav".to_string(), SimElement::new("Portfolio")),
                ("h1".to_string(), SimElement::new("Net Worth")),
            ],
        ))
    }

    #[test]
    fn test_passing_scenario_reaches_passed() {
        let dir = tempfile::tempdir().unwrap();
        let runner = runner(dir.path());
        let mut ctx = VerifyContext::new(ContextConfig::new("t"), HarnessConfig::default());
        let mut page = dashboard_page();

        let scenario = Scenario::new("dashboard smoke")
            .navigate("/")
            .wait_until(WaitCondition::SelectorVisible(Selector::css("nav")))
            .expect_state(Selector::css("h1"), Expectation::TextContains("Net Worth".to_string()));

        let report = runner.run(&mut ctx, &mut page, &scenario);
        assert!(report.passed());
        assert_eq!(report.steps.len(), 3);
        assert!(report
            .steps
            .iter()
            .all(|s| s.outcome == StepOutcome::Passed));
        assert!(report.diagnostic.is_none());
    }

    #[test]
    fn test_failed_assertion_short_circuits_and_captures() {
        let dir = tempfile::tempdir().unwrap();
        let runner = runner(dir.path());
        let mut ctx = VerifyContext::new(ContextConfig::new("t"), HarnessConfig::default());
        let mut page = dashboard_page();

        let scenario = Scenario::new("bad assertion")
            .navigate("/")
            .expect_state(Selector::css("h1"), Expectation::TextEquals("Wrong".to_string()))
            .click(Selector::css("nav"));

        let report = runner.run(&mut ctx, &mut page, &scenario);
        assert!(!report.passed());
        assert!(matches!(report.steps[1].outcome, StepOutcome::Failed(_)));
        assert_eq!(report.steps[2].outcome, StepOutcome::Skipped);
        let diagnostic = report.diagnostic.unwrap();
        assert!(diagnostic.exists());
        let failure = report.failure.unwrap();
        assert!(failure.contains("expected"));
        assert!(failure.contains("Wrong"));
    }

    #[test]
    fn test_wait_timeout_fails_scenario() {
        let dir = tempfile::tempdir().unwrap();
        let runner = runner(dir.path());
        let mut ctx = VerifyContext::new(ContextConfig::new("t"), HarnessConfig::default());
        let mut page = dashboard_page();

        let scenario = Scenario::new("timeout")
            .navigate("/")
            .wait_until_for(
                WaitCondition::SelectorVisible(Selector::text("Never Appears")),
                100,
            );

        let report = runner.run(&mut ctx, &mut page, &scenario);
        assert_eq!(report.state, ScenarioState::Failed);
        assert!(report.failure.unwrap().contains("timed out"));
    }

    #[test]
    fn test_stale_rules_reported_as_warning_by_default() {
        let dir = tempfile::tempdir().unwrap();
        let runner = runner(dir.path());
        let mut ctx = VerifyContext::new(ContextConfig::new("t"), HarnessConfig::default());
        ctx.rules_mut()
            .get("**/api/never-called", crate::responder::MockResponse::json(&serde_json::json!({})).unwrap())
            .unwrap();
        let mut page = dashboard_page();

        let scenario = Scenario::new("stale rule").navigate("/");
        let report = runner.run(&mut ctx, &mut page, &scenario);
        assert!(report.passed());
        assert_eq!(report.stale_rules, vec!["**/api/never-called".to_string()]);
    }

    #[test]
    fn test_strict_mocks_upgrade_stale_rules_to_failure() {
        let dir = tempfile::tempdir().unwrap();
        let config = HarnessConfig::default()
            .with_artifact_dir(dir.path())
            .with_strict_mocks();
        let runner = ScenarioRunner::new(config);
        let mut ctx = VerifyContext::new(ContextConfig::new("t"), HarnessConfig::default());
        ctx.rules_mut()
            .get("**/api/never-called", crate::responder::MockResponse::json(&serde_json::json!({})).unwrap())
            .unwrap();
        let mut page = dashboard_page();

        let report = runner.run(&mut ctx, &mut page, &Scenario::new("strict").navigate("/"));
        assert_eq!(report.state, ScenarioState::Failed);
        assert!(report.failure.unwrap().contains("never matched"));
    }

    #[test]
    fn test_hook_runs_against_context() {
        let dir = tempfile::tempdir().unwrap();
        let runner = runner(dir.path());
        let mut ctx = VerifyContext::new(ContextConfig::new("t"), HarnessConfig::default());
        let mut page = dashboard_page();

        let scenario = Scenario::new("hooked").navigate("/").hook("register rule", |ctx| {
            ctx.rules_mut()
                .get("**/api/usage", crate::responder::MockResponse::json(&serde_json::json!({"limit": 5})).unwrap())?;
            Ok(())
        });
        let report = runner.run(&mut ctx, &mut page, &scenario);
        assert!(report.passed());
        assert_eq!(ctx.rules().rule_count(), 1);
    }

    #[test]
    fn test_action_state_mapping() {
        assert_eq!(Action::Navigate("/".to_string()).state(), ScenarioState::Navigating);
        assert_eq!(
            Action::Assert {
                selector: Selector::css("h1"),
                expected: Expectation::Visible
            }
            .state(),
            ScenarioState::Asserting
        );
    }

    #[test]
    fn test_idempotence_across_fresh_contexts() {
        let dir = tempfile::tempdir().unwrap();
        let runner = runner(dir.path());
        let scenario = Scenario::new("idempotent")
            .navigate("/")
            .expect_state(Selector::css("h1"), Expectation::Visible);

        let mut outcomes = Vec::new();
        for _ in 0..2 {
            let mut ctx = VerifyContext::new(ContextConfig::new("t"), HarnessConfig::default());
            let mut page = dashboard_page();
            outcomes.push(runner.run(&mut ctx, &mut page, &scenario).passed());
        }
        assert_eq!(outcomes, vec![true, true]);
    }
}
