//! Comprobar CLI: browser-driven UI verification with deterministic mocks.
//!
//! ## Usage
//!
//! ```bash
//! comprobar run flows/airlock.yaml          # Run a playbook
//! comprobar run --mobile flows/*.yaml       # Run with the mobile viewport
//! comprobar validate flows/*.yaml           # Check playbooks without running
//! ```

use clap::Parser;
use comprobar::prelude::*;
use comprobar::result::HarnessResult;
use comprobar_cli::{Cli, Commands, OutputWriter, PlaybookDoc, RunArgs, ValidateArgs};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    match run() {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> HarnessResult<bool> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let config = build_config(&cli)?;

    match &cli.command {
        Commands::Validate(args) => validate(args),
        Commands::Run(args) => run_playbooks(&config, args),
    }
}

fn init_tracing(verbosity: u8) {
    let default = match verbosity {
        0 => "comprobar=info",
        1 => "comprobar=debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn build_config(cli: &Cli) -> HarnessResult<HarnessConfig> {
    let mut config = match &cli.config {
        Some(path) => HarnessConfig::load(path)?,
        None => HarnessConfig::from_env(),
    };
    if let Some(base_url) = &cli.base_url {
        config.base_url = base_url.clone();
    }
    if let Some(namespace) = &cli.storage_namespace {
        config.storage_namespace = Some(namespace.clone());
    }
    if let Some(dir) = &cli.artifact_dir {
        config.artifact_dir = dir.clone();
    }
    if cli.strict_mocks {
        config.strict_mocks = true;
    }
    config.validate()?;
    Ok(config)
}

fn validate(args: &ValidateArgs) -> HarnessResult<bool> {
    let mut all_ok = true;
    for file in &args.files {
        match PlaybookDoc::load(file) {
            Ok(doc) => {
                let scenario = doc.compile();
                println!(
                    "ok   {} ({} steps, {} mocks)",
                    file.display(),
                    scenario.steps.len(),
                    doc.mocks.len()
                );
            }
            Err(e) => {
                println!("FAIL {}: {e}", file.display());
                all_ok = false;
            }
        }
    }
    Ok(all_ok)
}

#[cfg(feature = "browser")]
fn run_playbooks(config: &HarnessConfig, args: &RunArgs) -> HarnessResult<bool> {
    let viewport = if args.mobile {
        Viewport::MOBILE
    } else {
        Viewport::DESKTOP
    };
    let browser = Browser::launch(
        BrowserConfig::default().with_viewport(viewport.width, viewport.height),
    )?;

    let runner = ScenarioRunner::new(config.clone());
    let output = OutputWriter::new(args.show_steps);
    let mut results = SuiteResults::new();

    for file in &args.files {
        let doc = PlaybookDoc::load(file)?;
        let mut context_config = ContextConfig::new(&doc.name);
        context_config = context_config.with_viewport(viewport);
        // Mocks, storage, and session never propagate between contexts;
        // every playbook gets a fresh one.
        let mut ctx = VerifyContext::new(context_config, config.clone());
        doc.apply(&mut ctx)?;

        let mut page = browser.new_page()?;
        let report = runner.run(&mut ctx, &mut page, &doc.compile());
        output.scenario(&report);
        results.push(report);
        ctx.close();
    }

    output.summary(&results);
    Ok(results.all_passed())
}

#[cfg(not(feature = "browser"))]
fn run_playbooks(_config: &HarnessConfig, _args: &RunArgs) -> HarnessResult<bool> {
    Err(HarnessError::Configuration {
        message: "this build has no browser support; rebuild with --features browser to run \
                  playbooks, or use `validate` to check them"
            .to_string(),
    })
}
