//! Wait conditions and bounded polling.
//!
//! Every suspension point in a scenario has an explicit upper bound. A wait
//! that never becomes true fails at >= its timeout and within one poll
//! interval past it, never earlier and never unboundedly later.

use crate::locator::Selector;
use crate::result::{HarnessError, HarnessResult};
use crate::routes::UrlPattern;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Default polling interval (50ms)
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 50;

/// Condition a scenario can suspend on
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum WaitCondition {
    /// A selector resolves to a visible element
    SelectorVisible(Selector),
    /// A selector resolves to no visible element
    SelectorHidden(Selector),
    /// The page URL matches a pattern
    UrlMatches(UrlPattern),
    /// No network requests are in flight
    NetworkIdle,
}

impl std::fmt::Display for WaitCondition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SelectorVisible(selector) => write!(f, "{selector} visible"),
            Self::SelectorHidden(selector) => write!(f, "{selector} hidden"),
            Self::UrlMatches(pattern) => write!(f, "url matches {pattern}"),
            Self::NetworkIdle => write!(f, "network idle"),
        }
    }
}

/// Options for a wait operation
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct WaitOptions {
    /// Timeout in milliseconds
    pub timeout_ms: u64,
    /// Polling interval in milliseconds
    pub poll_interval_ms: u64,
}

impl WaitOptions {
    /// Create options with the given timeout and the default poll interval
    #[must_use]
    pub const fn new(timeout_ms: u64) -> Self {
        Self {
            timeout_ms,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }

    /// Set the polling interval
    #[must_use]
    pub const fn with_poll_interval(mut self, poll_interval_ms: u64) -> Self {
        self.poll_interval_ms = poll_interval_ms;
        self
    }

    /// Timeout as a Duration
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Result of a successful wait
#[derive(Debug, Clone, Copy)]
pub struct WaitOutcome {
    /// Time spent waiting
    pub elapsed: Duration,
}

/// Poll `predicate` until it returns true or the timeout elapses.
///
/// The predicate is checked immediately, then once per poll interval, and one
/// final time after the deadline so a condition that becomes true exactly at
/// the bound still passes. A predicate error aborts the wait immediately.
pub fn poll_until<F>(
    options: WaitOptions,
    description: &str,
    mut predicate: F,
) -> HarnessResult<WaitOutcome>
where
    F: FnMut() -> HarnessResult<bool>,
{
    let start = Instant::now();
    let timeout = options.timeout();
    let poll_interval = Duration::from_millis(options.poll_interval_ms);

    loop {
        if predicate()? {
            return Ok(WaitOutcome {
                elapsed: start.elapsed(),
            });
        }
        if start.elapsed() >= timeout {
            break;
        }
        let remaining = timeout.saturating_sub(start.elapsed());
        std::thread::sleep(poll_interval.min(remaining));
    }

    // Final check at or past the deadline.
    if predicate()? {
        return Ok(WaitOutcome {
            elapsed: start.elapsed(),
        });
    }

    Err(HarnessError::WaitTimeout {
        condition: description.to_string(),
        timeout_ms: options.timeout_ms,
    })
}
