//! Real browser control.
//!
//! With the `browser` feature enabled this module drives headless Chromium
//! over the Chrome DevTools Protocol via chromiumoxide. Without the feature,
//! only [`BrowserConfig`] and the fetch-shim generator are compiled; the
//! deterministic [`crate::sim::SimulatedPage`] covers everything else.
//!
//! Interception inside a real page is installed as an init script that wraps
//! `window.fetch`: the context's fixed mock rules are serialized into the
//! shim, matched newest-first exactly like the Rust matcher, and unmatched
//! requests pass through to the real network with an in-flight counter that
//! backs network-idle waits. Dynamic responders cannot cross into the page
//! and are reported; scenarios that branch per request run against the
//! simulated driver.

use crate::responder::Responder;
use crate::routes::RuleSet;

/// Browser launch configuration
#[derive(Debug, Clone)]
pub struct BrowserConfig {
    /// Run in headless mode
    pub headless: bool,
    /// Viewport width
    pub viewport_width: u32,
    /// Viewport height
    pub viewport_height: u32,
    /// Path to chromium binary (None = auto-detect)
    pub chromium_path: Option<String>,
    /// Sandbox mode (disable for containers)
    pub sandbox: bool,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            viewport_width: 1280,
            viewport_height: 720,
            chromium_path: None,
            sandbox: true,
        }
    }
}

impl BrowserConfig {
    /// Set viewport dimensions
    #[must_use]
    pub const fn with_viewport(mut self, width: u32, height: u32) -> Self {
        self.viewport_width = width;
        self.viewport_height = height;
        self
    }

    /// Set headless mode
    #[must_use]
    pub const fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    /// Set chromium path
    #[must_use]
    pub fn with_chromium_path(mut self, path: impl Into<String>) -> Self {
        self.chromium_path = Some(path.into());
        self
    }

    /// Disable sandbox (for containers/CI)
    #[must_use]
    pub const fn with_no_sandbox(mut self) -> Self {
        self.sandbox = false;
        self
    }
}

/// Generate the `window.fetch` shim carrying a rule set into a page.
///
/// Rules are emitted in registration order and the shim scans them
/// newest-first, preserving last-write-priority. Only fixed responders can
/// be serialized; dynamic ones are skipped with a warning.
#[must_use]
pub fn fetch_shim_script(rules: &RuleSet) -> String {
    let mut entries = String::new();
    for rule in rules.rules() {
        let response = match &rule.responder {
            Responder::Fixed(response) => response,
            Responder::Dynamic(_) => {
                tracing::warn!(
                    pattern = %rule.pattern,
                    "dynamic responder cannot be installed in a real page; use the simulated driver"
                );
                continue;
            }
        };
        let headers = serde_json::to_string(&response.headers).unwrap_or_else(|_| "{}".to_string());
        let body = serde_json::to_string(&response.body_string()).unwrap_or_else(|_| "\"\"".to_string());
        let re = serde_json::to_string(&rule.pattern.to_regex_source())
            .unwrap_or_else(|_| "\"$^\"".to_string());
        let content_type = serde_json::to_string(&response.content_type)
            .unwrap_or_else(|_| "\"application/json\"".to_string());
        entries.push_str(&format!(
            "{{re: {re}, method: '{method}', status: {status}, contentType: {content_type}, headers: {headers}, body: {body}, delay: {delay}}},\n",
            method = rule.method.as_str(),
            status = response.status,
            delay = response.delay_ms,
        ));
    }

    format!(
        r"(() => {{
  const rules = [
{entries}  ];
  window.__comprobar_pending = 0;
  const realFetch = window.fetch.bind(window);
  window.fetch = async (input, init) => {{
    const url = typeof input === 'string' ? input : input.url;
    const method = ((init && init.method) || (input && input.method) || 'GET').toUpperCase();
    for (let i = rules.length - 1; i >= 0; i--) {{
      const r = rules[i];
      if (new RegExp(r.re).test(url) && (r.method === '*' || r.method === method)) {{
        if (r.delay > 0) await new Promise(res => setTimeout(res, r.delay));
        const headers = Object.assign({{'content-type': r.contentType}}, r.headers);
        return new Response(r.body, {{status: r.status, headers: headers}});
      }}
    }}
    window.__comprobar_pending += 1;
    try {{ return await realFetch(input, init); }}
    finally {{ window.__comprobar_pending -= 1; }}
  }};
}})();"
    )
}

// ============================================================================
// Real CDP Implementation (when `browser` feature is enabled)
// ============================================================================

#[cfg(feature = "browser")]
mod cdp {
    use super::BrowserConfig;
    use crate::context::VerifyContext;
    use crate::driver::PageDriver;
    use crate::locator::{Interaction, Selector};
    use crate::result::{HarnessError, HarnessResult};
    use chromiumoxide::browser::{Browser as CdpBrowser, BrowserConfig as CdpConfig};
    use chromiumoxide::cdp::browser_protocol::page::{
        AddScriptToEvaluateOnNewDocumentParams, CaptureScreenshotFormat, CaptureScreenshotParams,
    };
    use chromiumoxide::page::Page as CdpPage;
    use futures::StreamExt;
    use std::sync::Arc;

    /// Browser instance owning its own tokio runtime so the synchronous
    /// scenario runner can drive it
    pub struct Browser {
        config: BrowserConfig,
        runtime: Arc<tokio::runtime::Runtime>,
        inner: CdpBrowser,
        #[allow(dead_code)]
        handle: tokio::task::JoinHandle<()>,
    }

    impl std::fmt::Debug for Browser {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("Browser").field("config", &self.config).finish_non_exhaustive()
        }
    }

    impl Browser {
        /// Launch a headless browser
        pub fn launch(config: BrowserConfig) -> HarnessResult<Self> {
            let runtime = tokio::runtime::Runtime::new().map_err(|e| HarnessError::Browser {
                message: format!("runtime: {e}"),
            })?;

            let mut builder = CdpConfig::builder();
            if !config.sandbox {
                builder = builder.no_sandbox();
            }
            if let Some(ref path) = config.chromium_path {
                builder = builder.chrome_executable(path);
            }
            builder = builder.window_size(config.viewport_width, config.viewport_height);
            let cdp_config = builder.build().map_err(|e| HarnessError::Browser {
                message: e.to_string(),
            })?;

            let (browser, mut handler) = runtime
                .block_on(CdpBrowser::launch(cdp_config))
                .map_err(|e| HarnessError::Browser {
                    message: e.to_string(),
                })?;

            let handle = runtime.spawn(async move {
                while let Some(h) = handler.next().await {
                    if h.is_err() {
                        break;
                    }
                }
            });

            Ok(Self {
                config,
                runtime: Arc::new(runtime),
                inner: browser,
                handle,
            })
        }

        /// Open a page. Context init scripts and the fetch shim are
        /// installed on first navigation, before any page script runs.
        pub fn new_page(&self) -> HarnessResult<BrowserPage> {
            let page = self
                .runtime
                .block_on(self.inner.new_page("about:blank"))
                .map_err(|e| HarnessError::Browser {
                    message: e.to_string(),
                })?;
            Ok(BrowserPage {
                runtime: self.runtime.clone(),
                page,
                url: String::from("about:blank"),
                bootstrapped: false,
            })
        }

        /// The launch configuration
        #[must_use]
        pub const fn config(&self) -> &BrowserConfig {
            &self.config
        }
    }

    /// A Chromium-backed page
    pub struct BrowserPage {
        runtime: Arc<tokio::runtime::Runtime>,
        page: CdpPage,
        url: String,
        bootstrapped: bool,
    }

    impl std::fmt::Debug for BrowserPage {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("BrowserPage").field("url", &self.url).finish_non_exhaustive()
        }
    }

    impl BrowserPage {
        fn eval_json(&self, expr: &str) -> HarnessResult<serde_json::Value> {
            let result = self
                .runtime
                .block_on(self.page.evaluate(expr))
                .map_err(|e| HarnessError::Browser {
                    message: e.to_string(),
                })?;
            result.into_value().map_err(|e| HarnessError::Browser {
                message: e.to_string(),
            })
        }

        fn install_on_new_document(&self, source: String) -> HarnessResult<()> {
            let params = AddScriptToEvaluateOnNewDocumentParams::builder()
                .source(source)
                .build()
                .map_err(|e| HarnessError::Browser { message: e })?;
            self.runtime
                .block_on(self.page.execute(params))
                .map_err(|e| HarnessError::Browser {
                    message: e.to_string(),
                })?;
            Ok(())
        }

        /// Install context init scripts and the fetch shim. Runs once per
        /// page, before the first navigation, which guarantees
        /// setup-before-first-script ordering.
        fn ensure_bootstrap(&mut self, ctx: &VerifyContext) -> HarnessResult<()> {
            if self.bootstrapped {
                return Ok(());
            }
            for script in ctx.init_scripts() {
                self.install_on_new_document(script.clone())?;
            }
            self.install_on_new_document(super::fetch_shim_script(ctx.rules()))?;
            self.bootstrapped = true;
            Ok(())
        }

        fn element_op(&self, selector: &Selector, op_js: &str) -> HarnessResult<()> {
            let expr = format!(
                "(() => {{ const el = {}; if (!el) return false; {op_js}; return true; }})()",
                selector.to_query()
            );
            match self.eval_json(&expr)? {
                serde_json::Value::Bool(true) => Ok(()),
                _ => Err(HarnessError::Interaction {
                    selector: selector.to_string(),
                    message: "no matching element".to_string(),
                }),
            }
        }
    }

    impl PageDriver for BrowserPage {
        fn goto(&mut self, ctx: &mut VerifyContext, url: &str) -> HarnessResult<()> {
            self.ensure_bootstrap(ctx)?;
            self.runtime
                .block_on(self.page.goto(url))
                .map_err(|e| HarnessError::Navigation {
                    url: url.to_string(),
                    message: e.to_string(),
                })?;
            // Catch client-side redirects before the runner inspects the URL.
            if let serde_json::Value::String(current) = self.eval_json("window.location.href")? {
                self.url = current;
            } else {
                self.url = url.to_string();
            }
            Ok(())
        }

        fn current_url(&self) -> String {
            self.url.clone()
        }

        fn is_visible(&self, selector: &Selector) -> HarnessResult<bool> {
            let expr = format!(
                "(() => {{ const el = {}; if (!el) return false; \
                 const s = window.getComputedStyle(el); \
                 return s.display !== 'none' && s.visibility !== 'hidden' && el.getClientRects().length > 0; }})()",
                selector.to_query()
            );
            Ok(matches!(self.eval_json(&expr)?, serde_json::Value::Bool(true)))
        }

        fn text_of(&self, selector: &Selector) -> HarnessResult<Option<String>> {
            let expr = format!(
                "(() => {{ const el = {}; return el ? el.textContent : null; }})()",
                selector.to_query()
            );
            match self.eval_json(&expr)? {
                serde_json::Value::String(text) => Ok(Some(text)),
                _ => Ok(None),
            }
        }

        fn attribute_of(&self, selector: &Selector, name: &str) -> HarnessResult<Option<String>> {
            let name_js = serde_json::to_string(name)?;
            let expr = format!(
                "(() => {{ const el = {}; return el ? el.getAttribute({name_js}) : null; }})()",
                selector.to_query()
            );
            match self.eval_json(&expr)? {
                serde_json::Value::String(value) => Ok(Some(value)),
                _ => Ok(None),
            }
        }

        fn interact(
            &mut self,
            _ctx: &mut VerifyContext,
            selector: &Selector,
            operation: &Interaction,
        ) -> HarnessResult<()> {
            match operation {
                Interaction::Click => self.element_op(selector, "el.click()"),
                Interaction::Fill(value) => {
                    let value_js = serde_json::to_string(value)?;
                    self.element_op(
                        selector,
                        &format!(
                            "el.value = {value_js}; \
                             el.dispatchEvent(new Event('input', {{bubbles: true}})); \
                             el.dispatchEvent(new Event('change', {{bubbles: true}}))"
                        ),
                    )
                }
                Interaction::Select(value) => {
                    let value_js = serde_json::to_string(value)?;
                    self.element_op(
                        selector,
                        &format!(
                            "el.value = {value_js}; \
                             el.dispatchEvent(new Event('change', {{bubbles: true}}))"
                        ),
                    )
                }
                Interaction::SetFiles(files) => {
                    // Files are materialized in-page; the mocked upload
                    // endpoint never reads real disk content.
                    let names: Vec<&str> = files
                        .iter()
                        .map(|f| f.rsplit('/').next().unwrap_or(f.as_str()))
                        .collect();
                    let names_js = serde_json::to_string(&names)?;
                    self.element_op(
                        selector,
                        &format!(
                            "const dt = new DataTransfer(); \
                             for (const name of {names_js}) {{ \
                               dt.items.add(new File(['comprobar fixture'], name)); \
                             }} \
                             el.files = dt.files; \
                             el.dispatchEvent(new Event('change', {{bubbles: true}}))"
                        ),
                    )
                }
            }
        }

        fn pending_requests(&self) -> usize {
            self.eval_json("window.__comprobar_pending || 0")
                .ok()
                .and_then(|v| v.as_u64())
                .unwrap_or(0) as usize
        }

        fn screenshot(&self) -> HarnessResult<Vec<u8>> {
            let params = CaptureScreenshotParams::builder()
                .format(CaptureScreenshotFormat::Png)
                .build();
            let screenshot = self
                .runtime
                .block_on(self.page.execute(params))
                .map_err(|e| HarnessError::Screenshot {
                    message: e.to_string(),
                })?;
            use base64::Engine;
            base64::engine::general_purpose::STANDARD
                .decode(&screenshot.data)
                .map_err(|e| HarnessError::Screenshot {
                    message: e.to_string(),
                })
        }
    }
}

#[cfg(feature = "browser")]
pub use cdp::{Browser, BrowserPage};

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::responder::{MockResponse, Responder};

    #[test]
    fn test_browser_config_builder() {
        let config = BrowserConfig::default()
            .with_viewport(375, 667)
            .with_no_sandbox();
        assert_eq!(config.viewport_width, 375);
        assert!(!config.sandbox);
        assert!(config.headless);
    }

    #[test]
    fn test_fetch_shim_contains_fixed_rules() {
        let mut rules = RuleSet::new();
        rules
            .get("**/api/airlock?*", MockResponse::json(&serde_json::json!([])).unwrap())
            .unwrap();
        let shim = fetch_shim_script(&rules);
        assert!(shim.contains("window.__comprobar_pending"));
        assert!(shim.contains("method: 'GET'"));
        assert!(shim.contains("status: 200"));
        // Newest-first scan mirrors the Rust matcher.
        assert!(shim.contains("for (let i = rules.length - 1; i >= 0; i--)"));
    }

    #[test]
    fn test_fetch_shim_skips_dynamic_responders() {
        let mut rules = RuleSet::new();
        rules
            .get("**/api/airlock?*", MockResponse::json(&serde_json::json!([])).unwrap())
            .unwrap();
        rules
            .register(
                crate::routes::UrlPattern::glob("**/auth/v1/token?*"),
                crate::routes::HttpMethod::Post,
                Responder::dynamic(|_| MockResponse::error(400, "invalid_grant")),
            )
            .unwrap();
        let shim = fetch_shim_script(&rules);
        assert!(!shim.contains("auth/v1/token"));
        assert!(shim.contains("api/airlock"));
    }

    #[test]
    fn test_fetch_shim_escapes_body_as_js_literal() {
        let mut rules = RuleSet::new();
        rules
            .get(
                "**/api/usage",
                MockResponse::json(&serde_json::json!({"msg": "hello"})).unwrap(),
            )
            .unwrap();
        let shim = fetch_shim_script(&rules);
        // The body is embedded as a JS string literal with its quotes escaped.
        assert!(shim.contains(r#"{\"msg\":\"hello\"}"#));
    }
}
