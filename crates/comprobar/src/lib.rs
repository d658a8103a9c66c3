//! Comprobar: deterministic HTTP-mocking and session-injection harness for
//! browser-driven UI verification.
//!
//! Comprobar drives a page against a running web application and asserts on
//! visible state, with outgoing requests answered synthetically and a
//! pre-authenticated session injected before any page script runs.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                     COMPROBAR Architecture                       │
//! ├──────────────────────────────────────────────────────────────────┤
//! │  ┌───────────┐   ┌──────────────┐   ┌───────────────────────┐    │
//! │  │ Scenario  │──►│ VerifyContext│──►│ PageDriver            │    │
//! │  │ (steps)   │   │ rules        │   │  SimulatedPage (dflt) │    │
//! │  │           │   │ storage      │   │  BrowserPage (cdp)    │    │
//! │  └───────────┘   │ init scripts │   └───────────────────────┘    │
//! │        │         └──────────────┘              │                 │
//! │        ▼                ▲                      ▼                 │
//! │  ScenarioRunner   SessionInjector      target application        │
//! │  (state machine)  (token → storage)    (http://localhost:3000)   │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Matched requests are answered by the context's newest-first rule set and
//! never reach the network; unmatched requests pass through. Each scenario
//! runs in one isolated context, every suspension point has a timeout, and
//! any failure writes a diagnostic screenshot before propagating.

#![warn(missing_docs)]
#![cfg_attr(test, allow(clippy::large_stack_arrays, clippy::large_stack_frames))]

pub mod browser;
pub mod config;
pub mod context;
pub mod diagnostics;
pub mod driver;
pub mod locator;
pub mod reporter;
pub mod responder;
pub mod result;
pub mod routes;
pub mod scenario;
pub mod session;
pub mod sim;
pub mod wait;

/// Commonly used types, re-exported for scenario authors.
pub mod prelude {
    pub use crate::browser::BrowserConfig;
    pub use crate::config::HarnessConfig;
    pub use crate::context::{ContextConfig, Cookie, StorageState, VerifyContext, Viewport};
    pub use crate::diagnostics::DiagnosticWriter;
    pub use crate::driver::PageDriver;
    pub use crate::locator::{Interaction, Selector};
    pub use crate::reporter::{SuiteResults, TextReporter};
    pub use crate::responder::{InterceptedRequest, MockResponse, Responder};
    pub use crate::result::{HarnessError, HarnessResult};
    pub use crate::routes::{HttpMethod, MockRule, RuleId, RuleSet, UrlPattern};
    pub use crate::scenario::{
        Action, Expectation, Scenario, ScenarioReport, ScenarioRunner, ScenarioState, StepOutcome,
    };
    pub use crate::session::{SessionInjector, SessionToken, SessionTokenBuilder, SessionUser};
    pub use crate::sim::{AppModel, Dom, NetSession, SimElement, SimulatedPage, StaticApp};
    pub use crate::wait::{WaitCondition, WaitOptions};

    #[cfg(feature = "browser")]
    pub use crate::browser::{Browser, BrowserPage};
}
