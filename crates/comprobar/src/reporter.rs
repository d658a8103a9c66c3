//! Suite results and report rendering.

use crate::scenario::{ScenarioReport, StepOutcome};
use std::time::Duration;

/// Results from running a set of scenarios
#[derive(Debug, Clone, Default)]
pub struct SuiteResults {
    /// Individual scenario reports
    pub reports: Vec<ScenarioReport>,
}

impl SuiteResults {
    /// Create empty results
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a scenario report
    pub fn push(&mut self, report: ScenarioReport) {
        self.reports.push(report);
    }

    /// Whether every scenario passed
    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.reports.iter().all(ScenarioReport::passed)
    }

    /// Count of passed scenarios
    #[must_use]
    pub fn passed_count(&self) -> usize {
        self.reports.iter().filter(|r| r.passed()).count()
    }

    /// Count of failed scenarios
    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.reports.len() - self.passed_count()
    }

    /// Failed scenario reports
    #[must_use]
    pub fn failures(&self) -> Vec<&ScenarioReport> {
        self.reports.iter().filter(|r| !r.passed()).collect()
    }

    /// Scenario reports that carry stale-rule warnings
    #[must_use]
    pub fn warnings(&self) -> Vec<&ScenarioReport> {
        self.reports
            .iter()
            .filter(|r| !r.stale_rules.is_empty())
            .collect()
    }

    /// Total wall-clock time across scenarios
    #[must_use]
    pub fn total_duration(&self) -> Duration {
        self.reports.iter().map(|r| r.duration).sum()
    }
}

/// Renders scenario and suite reports as plain text
#[derive(Debug, Clone, Copy, Default)]
pub struct TextReporter {
    /// Include per-step lines for passing scenarios
    pub verbose: bool,
}

impl TextReporter {
    /// Create a reporter
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Include per-step detail for passing scenarios too
    #[must_use]
    pub const fn verbose(mut self) -> Self {
        self.verbose = true;
        self
    }

    /// Render one scenario report
    #[must_use]
    pub fn render_scenario(&self, report: &ScenarioReport) -> String {
        let mut out = String::new();
        let marker = if report.passed() { "PASS" } else { "FAIL" };
        out.push_str(&format!(
            "{marker} {} ({:.2}s)\n",
            report.scenario,
            report.duration.as_secs_f64()
        ));

        if self.verbose || !report.passed() {
            for step in &report.steps {
                let tag = match &step.outcome {
                    StepOutcome::Passed => "ok  ",
                    StepOutcome::Failed(_) => "FAIL",
                    StepOutcome::Skipped => "skip",
                };
                out.push_str(&format!("  {tag} [{}] {}\n", step.index, step.description));
            }
        }
        if let Some(failure) = &report.failure {
            out.push_str(&format!("  cause: {failure}\n"));
        }
        if let Some(diagnostic) = &report.diagnostic {
            out.push_str(&format!("  screenshot: {}\n", diagnostic.display()));
        }
        for pattern in &report.stale_rules {
            out.push_str(&format!("  warning: mock rule never matched: {pattern}\n"));
        }
        out
    }

    /// Render a whole suite
    #[must_use]
    pub fn render_suite(&self, results: &SuiteResults) -> String {
        let mut out = String::new();
        for report in &results.reports {
            out.push_str(&self.render_scenario(report));
        }
        out.push_str(&format!(
            "\n{} passed, {} failed ({:.2}s)\n",
            results.passed_count(),
            results.failed_count(),
            results.total_duration().as_secs_f64()
        ));
        out
    }
}
