//! Abstract page driver.
//!
//! The scenario runner drives a page through this trait, which captures the
//! only capabilities the harness consumes from a browser: navigate, query
//! rendered DOM, interact, observe in-flight requests, and capture an image.
//!
//! Two implementations exist: [`crate::sim::SimulatedPage`], a deterministic
//! in-process model used by the test suite, and, behind the `browser`
//! feature, a Chromium-backed page speaking CDP.

use crate::context::VerifyContext;
use crate::locator::{Interaction, Selector};
use crate::result::HarnessResult;

/// Driver for one page of a verification context.
///
/// Methods that can trigger application activity take the owning context so
/// the driver can route outgoing requests through the context's rule set and
/// read its injected storage.
pub trait PageDriver {
    /// Navigate to an absolute URL
    fn goto(&mut self, ctx: &mut VerifyContext, url: &str) -> HarnessResult<()>;

    /// The page's current URL
    fn current_url(&self) -> String;

    /// Whether a selector resolves to a visible element
    fn is_visible(&self, selector: &Selector) -> HarnessResult<bool>;

    /// Text content of the first matching element
    fn text_of(&self, selector: &Selector) -> HarnessResult<Option<String>>;

    /// Attribute value of the first matching element
    fn attribute_of(&self, selector: &Selector, name: &str) -> HarnessResult<Option<String>>;

    /// Whether the first matching element carries a CSS class
    fn has_class(&self, selector: &Selector, class: &str) -> HarnessResult<bool> {
        Ok(self
            .attribute_of(selector, "class")?
            .is_some_and(|classes| classes.split_whitespace().any(|c| c == class)))
    }

    /// Perform an interaction on the first matching element
    fn interact(
        &mut self,
        ctx: &mut VerifyContext,
        selector: &Selector,
        operation: &Interaction,
    ) -> HarnessResult<()>;

    /// Number of requests currently in flight
    fn pending_requests(&self) -> usize;

    /// Capture the page as PNG bytes
    fn screenshot(&self) -> HarnessResult<Vec<u8>>;
}
