//! Example: mock registration, session injection, and a scenario run
//!
//! Demonstrates: rule priority, the structured token builder, and the
//! scenario state machine against the simulated driver.
//!
//! Run with: `cargo run --example mock_and_verify`

use comprobar::prelude::*;

fn main() -> HarnessResult<()> {
    println!("=== Mock and Verify Example ===\n");

    // 1. Configure the harness
    println!("1. Building harness configuration...");
    let config = HarnessConfig::default()
        .with_storage_namespace("demo-project-ref")
        .with_artifact_dir("target/comprobar-demo");
    println!("   base url: {}", config.base_url);

    // 2. Create an isolated context and register mocks
    println!("\n2. Registering mock rules...");
    let mut ctx = VerifyContext::new(ContextConfig::new("demo"), config.clone());
    let listing = ctx.rules_mut().get(
        "**/api/airlock?*",
        MockResponse::json(&serde_json::json!([]))?,
    )?;
    println!("   rules registered: {}", ctx.rules().rule_count());

    // 3. Swap the responder in place (stateful mock)
    println!("\n3. Swapping responder via replace...");
    ctx.rules_mut().replace(
        listing,
        MockResponse::json(&serde_json::json!([
            {"id": "item-123", "status": "QUEUED", "file_path": "unassigned/uuid/test-document.pdf"}
        ]))?,
    )?;

    // 4. Inject a session
    println!("\n4. Injecting a session token...");
    let token = SessionToken::builder("demo-user", "demo@example.com").build()?;
    SessionInjector::new().prepare(&mut ctx, &token)?;
    println!("   init scripts: {}", ctx.init_scripts().len());

    // 5. Run a scenario against a simulated page
    println!("\n5. Running scenario...");
    let app = StaticApp::new().page(
        "/",
        vec![("h1".to_string(), SimElement::new("Net Worth"))],
    );
    let mut page = SimulatedPage::new(app);

    let scenario = Scenario::new("dashboard smoke")
        .navigate("/")
        .wait_until(WaitCondition::SelectorVisible(Selector::css("h1")))
        .expect_state(Selector::css("h1"), Expectation::TextContains("Net Worth".to_string()));

    let runner = ScenarioRunner::new(config);
    let report = runner.run(&mut ctx, &mut page, &scenario);

    println!("\n{}", TextReporter::new().verbose().render_scenario(&report));
    Ok(())
}
