//! Styled terminal output for scenario results.

use comprobar::prelude::*;
use console::style;

/// Prints scenario and suite results to the terminal
#[derive(Debug, Clone, Copy, Default)]
pub struct OutputWriter {
    /// Include per-step detail for passing scenarios
    pub show_steps: bool,
}

impl OutputWriter {
    /// Create a writer
    #[must_use]
    pub fn new(show_steps: bool) -> Self {
        Self { show_steps }
    }

    /// Print one scenario result
    pub fn scenario(&self, report: &ScenarioReport) {
        let marker = if report.passed() {
            style("PASS").green().bold()
        } else {
            style("FAIL").red().bold()
        };
        println!(
            "{marker} {} ({:.2}s)",
            style(&report.scenario).bold(),
            report.duration.as_secs_f64()
        );

        if self.show_steps || !report.passed() {
            for step in &report.steps {
                let tag = match &step.outcome {
                    StepOutcome::Passed => style("ok").green(),
                    StepOutcome::Failed(_) => style("fail").red(),
                    StepOutcome::Skipped => style("skip").dim(),
                };
                println!("  {tag:>4} [{}] {}", step.index, step.description);
            }
        }
        if let Some(failure) = &report.failure {
            println!("  {} {failure}", style("cause:").red());
        }
        if let Some(diagnostic) = &report.diagnostic {
            println!("  {} {}", style("screenshot:").yellow(), diagnostic.display());
        }
        for pattern in &report.stale_rules {
            println!(
                "  {} mock rule never matched: {pattern}",
                style("warning:").yellow()
            );
        }
    }

    /// Print the suite summary line
    pub fn summary(&self, results: &SuiteResults) {
        let passed = style(format!("{} passed", results.passed_count())).green();
        let failed = if results.failed_count() > 0 {
            style(format!("{} failed", results.failed_count())).red()
        } else {
            style("0 failed".to_string()).dim()
        };
        println!(
            "\n{passed}, {failed} ({:.2}s)",
            results.total_duration().as_secs_f64()
        );
    }
}
