//! Diagnostic artifacts.
//!
//! On any wait or assertion failure a screenshot is written to a predictable
//! path derived from the scenario name and the failing step, so failures are
//! triageable without re-running. The artifacts are for human triage, never
//! machine-checked.

use crate::driver::PageDriver;
use crate::result::{HarnessError, HarnessResult};
use std::path::{Path, PathBuf};

/// Writes screenshot artifacts under a configured directory
#[derive(Debug, Clone)]
pub struct DiagnosticWriter {
    dir: PathBuf,
}

impl DiagnosticWriter {
    /// Create a writer rooted at `dir`
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The artifact directory
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Artifact path for a scenario failure at a step index
    #[must_use]
    pub fn failure_path(&self, scenario: &str, step_index: usize) -> PathBuf {
        self.dir
            .join(format!("{}_step{step_index}_failure.png", slug(scenario)))
    }

    /// Artifact path for an explicitly requested screenshot
    #[must_use]
    pub fn named_path(&self, scenario: &str, name: &str) -> PathBuf {
        self.dir.join(format!("{}_{}.png", slug(scenario), slug(name)))
    }

    /// Capture the page and write a failure artifact. Returns the path.
    pub fn capture_failure(
        &self,
        driver: &dyn PageDriver,
        scenario: &str,
        step_index: usize,
    ) -> HarnessResult<PathBuf> {
        let path = self.failure_path(scenario, step_index);
        self.write(driver, &path)?;
        tracing::warn!(artifact = %path.display(), "diagnostic screenshot written");
        Ok(path)
    }

    /// Capture the page and write a named artifact. Returns the path.
    pub fn capture_named(
        &self,
        driver: &dyn PageDriver,
        scenario: &str,
        name: &str,
    ) -> HarnessResult<PathBuf> {
        let path = self.named_path(scenario, name);
        self.write(driver, &path)?;
        tracing::info!(artifact = %path.display(), "screenshot written");
        Ok(path)
    }

    fn write(&self, driver: &dyn PageDriver, path: &Path) -> HarnessResult<()> {
        let bytes = driver.screenshot()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, bytes).map_err(|e| HarnessError::Screenshot {
            message: format!("could not write {}: {e}", path.display()),
        })
    }
}

/// Filesystem-safe slug of a scenario or artifact name
fn slug(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut last_underscore = false;
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_lowercase());
            last_underscore = false;
        } else if !last_underscore && !out.is_empty() {
            out.push('_');
            last_underscore = true;
        }
    }
    while out.ends_with('_') {
        out.pop();
    }
    out
}
