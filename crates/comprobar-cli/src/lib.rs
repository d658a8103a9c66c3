//! Comprobar CLI library.
//!
//! Loads YAML playbooks, builds verification contexts from configuration,
//! and runs them against the application under test.

#![warn(missing_docs)]

pub mod cli;
pub mod output;
pub mod playbook;

pub use cli::{Cli, Commands, RunArgs, ValidateArgs};
pub use output::OutputWriter;
pub use playbook::PlaybookDoc;
