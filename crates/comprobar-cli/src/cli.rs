//! Command-line interface definition.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Browser-driven UI verification with deterministic mocks
#[derive(Debug, Parser)]
#[command(name = "comprobar", version, about, long_about = None)]
pub struct Cli {
    /// Path to a harness configuration file (YAML)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Base URL of the application under test
    #[arg(long, global = true, env = "COMPROBAR_BASE_URL")]
    pub base_url: Option<String>,

    /// Namespace for injected session storage keys
    #[arg(long, global = true, env = "COMPROBAR_STORAGE_NAMESPACE")]
    pub storage_namespace: Option<String>,

    /// Directory for diagnostic screenshots
    #[arg(long, global = true, env = "COMPROBAR_ARTIFACT_DIR")]
    pub artifact_dir: Option<PathBuf>,

    /// Treat mock rules that never matched as failures
    #[arg(long, global = true)]
    pub strict_mocks: bool,

    /// Increase log verbosity (-v, -vv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Subcommand
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run playbook files against the application under test
    Run(RunArgs),
    /// Parse and validate playbook files without running them
    Validate(ValidateArgs),
}

/// Arguments for `comprobar run`
#[derive(Debug, Args)]
pub struct RunArgs {
    /// Playbook files to run, in order
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Use the mobile viewport preset (375x667)
    #[arg(long)]
    pub mobile: bool,

    /// Print per-step detail for passing scenarios too
    #[arg(long)]
    pub show_steps: bool,
}

/// Arguments for `comprobar validate`
#[derive(Debug, Args)]
pub struct ValidateArgs {
    /// Playbook files to validate
    #[arg(required = true)]
    pub files: Vec<PathBuf>,
}
