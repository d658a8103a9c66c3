//! End-to-end harness flows against the simulated driver.
//!
//! The app models here play the pages of the dashboard under test: a login
//! form backed by the third-party token endpoint, the pending-item queue
//! with its upload input, and a session-guarded portfolio page.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use comprobar::prelude::*;
use comprobar::result::HarnessResult;
use serde_json::{json, Value};

fn harness_config(dir: &std::path::Path) -> HarnessConfig {
    HarnessConfig::default()
        .with_artifact_dir(dir)
        .with_timeout_ms(1_000)
        .with_storage_namespace("dyadqaccvdsislghpolv")
}

fn fresh_context(config: &HarnessConfig) -> VerifyContext {
    VerifyContext::new(ContextConfig::new("flow"), config.clone())
}

// ---------------------------------------------------------------------------
// Pending-item queue page
// ---------------------------------------------------------------------------

struct AirlockApp;

impl AirlockApp {
    fn render_list(dom: &mut Dom, net: &mut NetSession<'_>) -> HarnessResult<()> {
        dom.clear();
        dom.upsert("main", SimElement::new("Airlock"));
        dom.upsert(
            "input[type='file']",
            SimElement::new("").with_attr("type", "file").hidden(),
        );
        dom.upsert(
            "button.upload",
            SimElement::new("")
                .with_attr("role", "button")
                .with_attr("aria-label", "Upload"),
        );

        let response = net.fetch(HttpMethod::Get, "/api/airlock?limit=50", None)?;
        let items: Vec<Value> = match response {
            Some(response) if response.is_success() => {
                serde_json::from_slice(&response.body).unwrap_or_default()
            }
            _ => Vec::new(),
        };

        if items.is_empty() {
            dom.upsert("h2.empty", SimElement::new("All Systems Nominal"));
            dom.upsert("p.empty", SimElement::new("No pending data"));
        } else {
            for item in &items {
                let id = item["id"].as_str().unwrap_or("unknown");
                let file = item["file_path"].as_str().unwrap_or("");
                let name = file.rsplit('/').next().unwrap_or(file);
                let status = item["status"].as_str().unwrap_or("").to_lowercase();
                dom.upsert(
                    &format!("div.item-{id}"),
                    SimElement::new(&format!("{name} {status}")),
                );
            }
        }
        Ok(())
    }
}

impl AppModel for AirlockApp {
    fn on_load(
        &mut self,
        _url: &str,
        dom: &mut Dom,
        net: &mut NetSession<'_>,
    ) -> HarnessResult<Option<String>> {
        Self::render_list(dom, net)?;
        Ok(None)
    }

    fn on_interaction(
        &mut self,
        _url: &str,
        dom: &mut Dom,
        net: &mut NetSession<'_>,
        selector: &Selector,
        operation: &Interaction,
    ) -> HarnessResult<Option<String>> {
        if matches!(operation, Interaction::SetFiles(_))
            && *selector == Selector::css("input[type='file']")
        {
            let uploaded = net.fetch(
                HttpMethod::Post,
                "/api/airlock/upload",
                Some(json!({"file": "test-document.pdf"})),
            )?;
            if uploaded.is_some_and(|r| r.is_success()) {
                // Successful upload revalidates the listing.
                Self::render_list(dom, net)?;
            }
        }
        Ok(None)
    }
}

#[test]
fn empty_to_populated_queue_flow() {
    let dir = tempfile::tempdir().unwrap();
    let config = harness_config(dir.path());
    let mut ctx = fresh_context(&config);

    let listing = ctx
        .rules_mut()
        .get("**/api/airlock?*", MockResponse::json(&json!([])).unwrap())
        .unwrap();
    ctx.rules_mut()
        .post(
            "**/api/airlock/upload",
            MockResponse::json(&json!({"success": true, "id": "item-123"})).unwrap(),
        )
        .unwrap();

    let scenario = Scenario::new("airlock upload")
        .navigate("/airlock")
        .wait_until(WaitCondition::SelectorVisible(Selector::text(
            "All Systems Nominal",
        )))
        .expect_state(Selector::text("No pending data"), Expectation::Visible)
        .hook("populate listing mock", move |ctx| {
            ctx.rules_mut().replace(
                listing,
                MockResponse::json(&json!([{
                    "id": "item-123",
                    "status": "QUEUED",
                    "traffic_light": null,
                    "confidence_score": 0,
                    "file_path": "unassigned/uuid/test-document.pdf"
                }]))
                .unwrap(),
            )
        })
        .set_files(
            Selector::css("input[type='file']"),
            vec!["verification/test-document.pdf".to_string()],
        )
        .wait_until(WaitCondition::SelectorVisible(Selector::text(
            "test-document.pdf",
        )))
        .expect_state(Selector::text("queued"), Expectation::Visible);

    let runner = ScenarioRunner::new(config);
    let mut page = SimulatedPage::new(AirlockApp);
    let report = runner.run(&mut ctx, &mut page, &scenario);

    assert!(report.passed(), "failure: {:?}", report.failure);
    assert!(report.stale_rules.is_empty());

    // The upload endpoint saw exactly one request with the expected body.
    let upload = UrlPattern::glob("**/api/airlock/upload");
    ctx.rules().assert_requested_times(&upload, 1).unwrap();
    let captured = ctx.rules().find_request(&upload).unwrap();
    let body: Value = captured.body_json().unwrap();
    assert_eq!(body["file"], "test-document.pdf");

    // The listing was fetched on load and again after the upload.
    ctx.rules()
        .assert_requested_times(&UrlPattern::glob("**/api/airlock?*"), 2)
        .unwrap();
}

// ---------------------------------------------------------------------------
// Login page against the third-party token endpoint
// ---------------------------------------------------------------------------

struct LoginApp;

impl LoginApp {
    fn render_login(dom: &mut Dom) {
        dom.upsert("h1", SimElement::new("LOGIN"));
        dom.upsert("input[type='email']", SimElement::new(""));
        dom.upsert("input[type='password']", SimElement::new(""));
        dom.upsert("button.submit", SimElement::new("SIGN IN"));
    }
}

impl AppModel for LoginApp {
    fn on_load(
        &mut self,
        url: &str,
        dom: &mut Dom,
        _net: &mut NetSession<'_>,
    ) -> HarnessResult<Option<String>> {
        match comprobar::sim::url_path(url) {
            "/login" => Self::render_login(dom),
            "/" => {
                dom.upsert("nav", SimElement::new("Portfolio Airlock Settings"));
                dom.upsert("h1", SimElement::new("Net Worth"));
            }
            _ => {}
        }
        Ok(None)
    }

    fn on_interaction(
        &mut self,
        _url: &str,
        dom: &mut Dom,
        net: &mut NetSession<'_>,
        selector: &Selector,
        operation: &Interaction,
    ) -> HarnessResult<Option<String>> {
        let clicked_sign_in = matches!(operation, Interaction::Click)
            && dom
                .find(selector)
                .is_some_and(|el| el.text.contains("SIGN IN"));
        if !clicked_sign_in {
            return Ok(None);
        }

        let email = dom
            .find(&Selector::css("input[type='email']"))
            .and_then(|el| el.attributes.get("value").cloned())
            .unwrap_or_default();
        let password = dom
            .find(&Selector::css("input[type='password']"))
            .and_then(|el| el.attributes.get("value").cloned())
            .unwrap_or_default();

        let response = net.fetch(
            HttpMethod::Post,
            "/auth/v1/token?grant_type=password",
            Some(json!({"email": email, "password": password})),
        )?;
        match response {
            Some(response) if response.status == 400 => {
                dom.upsert(
                    "div.toast",
                    SimElement::new("Invalid login credentials"),
                );
                Ok(None)
            }
            Some(response) if response.is_success() => Ok(Some("/".to_string())),
            _ => Ok(None),
        }
    }
}

fn register_token_endpoint(ctx: &mut VerifyContext) {
    ctx.rules_mut()
        .register(
            UrlPattern::glob("**/auth/v1/token?*"),
            HttpMethod::Post,
            Responder::dynamic(|request| {
                let creds: Value = match request.body_json() {
                    Ok(v) => v,
                    Err(_) => return MockResponse::error(400, "bad_request"),
                };
                if creds["email"] == "user@example.com" && creds["password"] == "wrongpassword" {
                    MockResponse::error(400, "invalid_grant")
                } else {
                    MockResponse::json(&json!({
                        "access_token": "fake-token",
                        "refresh_token": "fake-refresh-token",
                        "user": {"id": "fake-user-id", "email": creds["email"]}
                    }))
                    .unwrap()
                }
            }),
        )
        .unwrap();
}

#[test]
fn auth_failure_then_success_flow() {
    let dir = tempfile::tempdir().unwrap();
    let config = harness_config(dir.path());
    let mut ctx = fresh_context(&config);
    register_token_endpoint(&mut ctx);

    let email = Selector::css("input[type='email']");
    let password = Selector::css("input[type='password']");
    let sign_in = Selector::css("button.submit").with_text("SIGN IN");

    let scenario = Scenario::new("auth failure then success")
        .navigate("/login")
        .wait_until(WaitCondition::SelectorVisible(Selector::text("LOGIN")))
        .fill(email.clone(), "user@example.com")
        .fill(password.clone(), "wrongpassword")
        .click(sign_in.clone())
        .wait_until(WaitCondition::SelectorVisible(Selector::text(
            "Invalid login credentials",
        )))
        .screenshot("login error")
        .fill(password, "hunter2")
        .click(sign_in)
        .wait_until(WaitCondition::SelectorVisible(Selector::text("Net Worth")))
        .expect_state(
            Selector::text("Invalid login credentials"),
            Expectation::Hidden,
        )
        .wait_until(WaitCondition::UrlMatches(UrlPattern::Exact(
            "http://localhost:3000/".to_string(),
        )));

    let runner = ScenarioRunner::new(config);
    let mut page = SimulatedPage::new(LoginApp);
    let report = runner.run(&mut ctx, &mut page, &scenario);
    assert!(report.passed(), "failure: {:?}", report.failure);

    // Both submissions reached the mocked endpoint; nothing fell through.
    ctx.rules()
        .assert_requested_times(&UrlPattern::glob("**/auth/v1/token?*"), 2)
        .unwrap();
}

// ---------------------------------------------------------------------------
// Session-guarded portfolio page
// ---------------------------------------------------------------------------

/// Plays a page that reads the auth token under a fixed storage key, the way
/// the dashboard's auth client does with its project namespace.
struct PortfolioApp {
    expected_key: String,
}

impl AppModel for PortfolioApp {
    fn on_load(
        &mut self,
        url: &str,
        dom: &mut Dom,
        net: &mut NetSession<'_>,
    ) -> HarnessResult<Option<String>> {
        match comprobar::sim::url_path(url) {
            "/portfolio" => {
                let now = chrono::Utc::now().timestamp();
                let authenticated = net
                    .local_storage(&self.expected_key)
                    .and_then(|raw| serde_json::from_str::<Value>(raw).ok())
                    .and_then(|token| token["expires_at"].as_i64())
                    .is_some_and(|expires_at| expires_at > now);
                if !authenticated {
                    return Ok(Some("/login".to_string()));
                }
                dom.upsert(
                    "nav",
                    SimElement::new("Portfolio Airlock Settings").with_attr("role", "navigation"),
                );
                dom.upsert("h1", SimElement::new("Portfolio"));
                Ok(None)
            }
            "/login" => {
                dom.upsert("h1", SimElement::new("LOGIN"));
                Ok(None)
            }
            _ => Ok(None),
        }
    }
}

#[test]
fn injected_session_yields_authenticated_view() {
    let dir = tempfile::tempdir().unwrap();
    let config = harness_config(dir.path());
    let mut ctx = fresh_context(&config);

    let token = SessionToken::builder("fake-user-id", "test@example.com")
        .build()
        .unwrap();
    SessionInjector::new().prepare(&mut ctx, &token).unwrap();

    let scenario = Scenario::new("portfolio authenticated")
        .navigate("/portfolio")
        .wait_until(WaitCondition::SelectorVisible(Selector::role("navigation")))
        .expect_state(Selector::text("Portfolio"), Expectation::Visible);

    let runner = ScenarioRunner::new(config);
    let mut page = SimulatedPage::new(PortfolioApp {
        expected_key: SessionInjector::storage_key("dyadqaccvdsislghpolv"),
    });
    let report = runner.run(&mut ctx, &mut page, &scenario);
    assert!(report.passed(), "failure: {:?}", report.failure);
}

#[test]
fn expired_session_is_treated_as_absent() {
    let dir = tempfile::tempdir().unwrap();
    let config = harness_config(dir.path());
    let mut ctx = fresh_context(&config);

    // A stale fixture written around the builder, the way hand-rolled
    // scripts used to do it. The app must treat it as logged out.
    let stale = serde_json::to_string(&json!({
        "access_token": "fake-token",
        "refresh_token": "fake-refresh-token",
        "token_type": "bearer",
        "expires_in": 3600,
        "expires_at": 1_000,
        "user": {"id": "fake-user-id", "email": "test@example.com", "role": "authenticated"}
    }))
    .unwrap();
    let origin = ctx.origin();
    let key = SessionInjector::storage_key("dyadqaccvdsislghpolv");
    ctx.storage_mut().set_local(&origin, &key, &stale);

    let scenario = Scenario::new("portfolio stale session").navigate("/portfolio");

    let runner = ScenarioRunner::new(config);
    let mut page = SimulatedPage::new(PortfolioApp { expected_key: key });
    let report = runner.run(&mut ctx, &mut page, &scenario);

    assert_eq!(report.state, ScenarioState::Failed);
    let failure = report.failure.unwrap();
    assert!(failure.contains("session rejected"), "got: {failure}");
}

#[test]
fn namespace_mismatch_surfaces_as_session_rejection_not_timeout() {
    let dir = tempfile::tempdir().unwrap();
    // Harness configured with a different namespace than the app expects:
    // the injected key is never read and the app redirects to login.
    let config = HarnessConfig::default()
        .with_artifact_dir(dir.path())
        .with_timeout_ms(1_000)
        .with_storage_namespace("some-other-environment");
    let mut ctx = fresh_context(&config);

    let token = SessionToken::builder("fake-user-id", "test@example.com")
        .build()
        .unwrap();
    SessionInjector::new().prepare(&mut ctx, &token).unwrap();

    let scenario = Scenario::new("portfolio wrong namespace").navigate("/portfolio");

    let runner = ScenarioRunner::new(config);
    let mut page = SimulatedPage::new(PortfolioApp {
        expected_key: SessionInjector::storage_key("dyadqaccvdsislghpolv"),
    });
    let report = runner.run(&mut ctx, &mut page, &scenario);

    assert_eq!(report.state, ScenarioState::Failed);
    let failure = report.failure.unwrap();
    assert!(failure.contains("session rejected"), "got: {failure}");
    assert!(!failure.contains("timed out"), "got: {failure}");
    assert!(report.diagnostic.is_some());
}

// ---------------------------------------------------------------------------
// Isolation between contexts
// ---------------------------------------------------------------------------

#[test]
fn mobile_context_requires_its_own_mocks() {
    let dir = tempfile::tempdir().unwrap();
    let config = harness_config(dir.path());

    let mut desktop = VerifyContext::new(ContextConfig::new("desktop"), config.clone());
    desktop
        .rules_mut()
        .get("**/api/airlock?*", MockResponse::json(&json!([])).unwrap())
        .unwrap();

    let mobile = VerifyContext::new(
        ContextConfig::new("mobile").mobile(),
        config,
    );
    assert_eq!(mobile.config.viewport, Viewport::MOBILE);
    assert_eq!(mobile.rules().rule_count(), 0);
    assert_eq!(desktop.rules().rule_count(), 1);
}
