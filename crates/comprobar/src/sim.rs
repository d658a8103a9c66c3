//! Deterministic in-process page simulation.
//!
//! [`SimulatedPage`] implements [`PageDriver`] against a small DOM model and
//! an [`AppModel`] that plays the application under test: on navigation and
//! interaction it issues requests through the context's rule set and mutates
//! the DOM from the mocked responses. Tests supply an app model shaped like
//! the page they verify (a login form, a pending-item queue), which keeps
//! every harness property observable without a Chromium binary.
//!
//! Screenshots from a simulated page are textual DOM snapshots rather than
//! pixels; the diagnostic artifact is still written on failure.

use crate::context::VerifyContext;
use crate::driver::PageDriver;
use crate::locator::{Interaction, Selector};
use crate::responder::{InterceptedRequest, MockResponse};
use crate::result::{HarnessError, HarnessResult};
use crate::routes::{HttpMethod, RuleSet};
use std::collections::HashMap;

/// Redirect chain bound for one navigation
const MAX_REDIRECTS: usize = 5;

/// A rendered element in the simulated DOM
#[derive(Debug, Clone, Default)]
pub struct SimElement {
    /// Whether the element is visible
    pub visible: bool,
    /// Text content
    pub text: String,
    /// Attributes
    pub attributes: HashMap<String, String>,
    /// CSS classes
    pub classes: Vec<String>,
}

impl SimElement {
    /// Create a visible element with text content
    #[must_use]
    pub fn new(text: &str) -> Self {
        Self {
            visible: true,
            text: text.to_string(),
            ..Self::default()
        }
    }

    /// Set an attribute
    #[must_use]
    pub fn with_attr(mut self, name: &str, value: &str) -> Self {
        self.attributes.insert(name.to_string(), value.to_string());
        self
    }

    /// Add a CSS class
    #[must_use]
    pub fn with_class(mut self, class: &str) -> Self {
        self.classes.push(class.to_string());
        self
    }

    /// Mark the element hidden
    #[must_use]
    pub const fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }
}

/// The simulated document: elements keyed by their CSS selector
#[derive(Debug, Clone, Default)]
pub struct Dom {
    elements: Vec<(String, SimElement)>,
}

impl Dom {
    /// Create an empty document
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an element under a CSS key
    pub fn upsert(&mut self, css: &str, element: SimElement) {
        if let Some((_, existing)) = self.elements.iter_mut().find(|(key, _)| key == css) {
            *existing = element;
        } else {
            self.elements.push((css.to_string(), element));
        }
    }

    /// Remove an element
    pub fn remove(&mut self, css: &str) {
        self.elements.retain(|(key, _)| key != css);
    }

    /// Remove everything
    pub fn clear(&mut self) {
        self.elements.clear();
    }

    fn selector_hits(css_key: &str, element: &SimElement, selector: &Selector) -> bool {
        match selector {
            Selector::Css(css) => css_key == css,
            Selector::Text(text) => element.text.contains(text.as_str()),
            Selector::TestId(id) => {
                element.attributes.get("data-testid").map(String::as_str) == Some(id)
            }
            Selector::Role { role, name } => {
                let role_hit = element.attributes.get("role").map(String::as_str) == Some(role)
                    || css_key == role;
                let name_hit = name.as_ref().map_or(true, |n| {
                    element
                        .attributes
                        .get("aria-label")
                        .is_some_and(|label| label.contains(n.as_str()))
                        || element.text.contains(n.as_str())
                });
                role_hit && name_hit
            }
            Selector::CssWithText { css, text } => {
                css_key == css && element.text.contains(text.as_str())
            }
        }
    }

    /// First element matching a selector
    #[must_use]
    pub fn find(&self, selector: &Selector) -> Option<&SimElement> {
        self.elements
            .iter()
            .find(|(key, el)| Self::selector_hits(key, el, selector))
            .map(|(_, el)| el)
    }

    /// Mutable access to the first element matching a selector
    pub fn find_mut(&mut self, selector: &Selector) -> Option<&mut SimElement> {
        self.elements
            .iter_mut()
            .find(|(key, el)| Self::selector_hits(key, el, selector))
            .map(|(_, el)| el)
    }

    /// Count of matching elements
    #[must_use]
    pub fn count(&self, selector: &Selector) -> usize {
        self.elements
            .iter()
            .filter(|(key, el)| Self::selector_hits(key, el, selector))
            .count()
    }

    /// Text rendering of the document, used as the simulated screenshot
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::new();
        for (key, el) in &self.elements {
            let marker = if el.visible { ' ' } else { '-' };
            out.push_str(&format!("{marker} {key}: {}\n", el.text));
        }
        out
    }
}

/// The application-facing view of a context during one page lifecycle.
///
/// App models fetch through here so every request flows through the
/// context's rule set; an unmatched request has no network to fall through
/// to in simulation and surfaces as `None`.
pub struct NetSession<'a> {
    rules: &'a mut RuleSet,
    storage_local: &'a HashMap<String, String>,
    origin: String,
}

impl<'a> NetSession<'a> {
    /// Resolve a path against the page origin
    fn absolute(&self, url: &str) -> String {
        if url.starts_with("http://") || url.starts_with("https://") {
            url.to_string()
        } else {
            format!("{}/{}", self.origin, url.trim_start_matches('/'))
        }
    }

    /// Issue a request through the rule set. `None` means no rule matched.
    pub fn fetch(
        &mut self,
        method: HttpMethod,
        url: &str,
        body: Option<serde_json::Value>,
    ) -> HarnessResult<Option<MockResponse>> {
        let mut request = InterceptedRequest::new(&self.absolute(url), method, 0);
        if let Some(body) = body {
            request = request.with_json_body(&body)?;
        }
        Ok(self.rules.handle_request(request))
    }

    /// Read a local storage value for the page origin
    #[must_use]
    pub fn local_storage(&self, key: &str) -> Option<&str> {
        self.storage_local.get(key).map(String::as_str)
    }
}

/// Plays the application under test inside a [`SimulatedPage`].
pub trait AppModel: Send {
    /// Populate the DOM for a URL. Returning a path requests a redirect.
    fn on_load(
        &mut self,
        url: &str,
        dom: &mut Dom,
        net: &mut NetSession<'_>,
    ) -> HarnessResult<Option<String>>;

    /// React to an interaction. Returning a path requests a redirect.
    fn on_interaction(
        &mut self,
        url: &str,
        dom: &mut Dom,
        net: &mut NetSession<'_>,
        selector: &Selector,
        operation: &Interaction,
    ) -> HarnessResult<Option<String>> {
        let _ = (url, dom, net, selector, operation);
        Ok(None)
    }
}

/// Static app model rendering fixed elements per path, for harness tests
/// that need a page but no behavior
#[derive(Debug, Default)]
pub struct StaticApp {
    pages: HashMap<String, Vec<(String, SimElement)>>,
}

impl StaticApp {
    /// Create an empty static app
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Define the elements rendered at a path
    #[must_use]
    pub fn page(mut self, path: &str, elements: Vec<(String, SimElement)>) -> Self {
        self.pages.insert(path.to_string(), elements);
        self
    }
}

impl AppModel for StaticApp {
    fn on_load(
        &mut self,
        url: &str,
        dom: &mut Dom,
        _net: &mut NetSession<'_>,
    ) -> HarnessResult<Option<String>> {
        if let Some(elements) = self.pages.get(url_path(url)) {
            for (css, element) in elements {
                dom.upsert(css, element.clone());
            }
        }
        Ok(None)
    }
}

/// Path component of a URL, including the leading slash
#[must_use]
pub fn url_path(url: &str) -> &str {
    let rest = url.split_once("://").map_or(url, |(_, rest)| rest);
    rest.find('/').map_or("/", |i| {
        let path = &rest[i..];
        path.split_once('?').map_or(path, |(p, _)| p)
    })
}

/// A deterministic page driven by an [`AppModel`]
pub struct SimulatedPage {
    dom: Dom,
    url: String,
    app: Box<dyn AppModel>,
}

impl std::fmt::Debug for SimulatedPage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimulatedPage")
            .field("url", &self.url)
            .finish_non_exhaustive()
    }
}

impl SimulatedPage {
    /// Create a page driven by an app model
    #[must_use]
    pub fn new(app: impl AppModel + 'static) -> Self {
        Self {
            dom: Dom::new(),
            url: "about:blank".to_string(),
            app: Box::new(app),
        }
    }

    /// Direct access to the DOM, for app-model tests
    #[must_use]
    pub fn dom(&self) -> &Dom {
        &self.dom
    }

    fn run_load(&mut self, ctx: &mut VerifyContext, url: &str) -> HarnessResult<()> {
        let harness = ctx.harness.clone();
        let mut target = url.to_string();
        for _ in 0..MAX_REDIRECTS {
            self.url = target.clone();
            self.dom.clear();
            let origin = ctx.origin();
            let current = self.url.clone();
            let (rules, local) = ctx.interception_parts(&origin);
            let mut net = NetSession {
                rules,
                storage_local: local,
                origin,
            };
            match self.app.on_load(&current, &mut self.dom, &mut net)? {
                Some(redirect) => target = harness.page_url(&redirect),
                None => return Ok(()),
            }
        }
        Err(HarnessError::Navigation {
            url: url.to_string(),
            message: format!("redirect chain exceeded {MAX_REDIRECTS} hops"),
        })
    }
}

impl PageDriver for SimulatedPage {
    fn goto(&mut self, ctx: &mut VerifyContext, url: &str) -> HarnessResult<()> {
        if ctx.is_closed() {
            return Err(HarnessError::Navigation {
                url: url.to_string(),
                message: "context is closed".to_string(),
            });
        }
        tracing::debug!(url, "simulated navigation");
        self.run_load(ctx, url)
    }

    fn current_url(&self) -> String {
        self.url.clone()
    }

    fn is_visible(&self, selector: &Selector) -> HarnessResult<bool> {
        Ok(self.dom.find(selector).is_some_and(|el| el.visible))
    }

    fn text_of(&self, selector: &Selector) -> HarnessResult<Option<String>> {
        Ok(self.dom.find(selector).map(|el| el.text.clone()))
    }

    fn attribute_of(&self, selector: &Selector, name: &str) -> HarnessResult<Option<String>> {
        Ok(self
            .dom
            .find(selector)
            .and_then(|el| el.attributes.get(name).cloned()))
    }

    fn has_class(&self, selector: &Selector, class: &str) -> HarnessResult<bool> {
        Ok(self
            .dom
            .find(selector)
            .is_some_and(|el| el.classes.iter().any(|c| c == class)))
    }

    fn interact(
        &mut self,
        ctx: &mut VerifyContext,
        selector: &Selector,
        operation: &Interaction,
    ) -> HarnessResult<()> {
        let element = self
            .dom
            .find_mut(selector)
            .ok_or_else(|| HarnessError::Interaction {
                selector: selector.to_string(),
                message: "no matching element".to_string(),
            })?;
        if !element.visible && !matches!(operation, Interaction::SetFiles(_)) {
            return Err(HarnessError::Interaction {
                selector: selector.to_string(),
                message: "element is not visible".to_string(),
            });
        }
        match operation {
            Interaction::Fill(value) | Interaction::Select(value) => {
                element.attributes.insert("value".to_string(), value.clone());
            }
            Interaction::SetFiles(files) => {
                element
                    .attributes
                    .insert("files".to_string(), files.join(","));
            }
            Interaction::Click => {}
        }

        let harness = ctx.harness.clone();
        let origin = ctx.origin();
        let current = self.url.clone();
        let (rules, local) = ctx.interception_parts(&origin);
        let mut net = NetSession {
            rules,
            storage_local: local,
            origin,
        };
        let redirect =
            self.app
                .on_interaction(&current, &mut self.dom, &mut net, selector, operation)?;
        if let Some(path) = redirect {
            let target = harness.page_url(&path);
            self.run_load(ctx, &target)?;
        }
        Ok(())
    }

    fn pending_requests(&self) -> usize {
        0
    }

    fn screenshot(&self) -> HarnessResult<Vec<u8>> {
        Ok(self.dom.render().into_bytes())
    }
}
