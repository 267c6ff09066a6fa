//! Estimate CLI - command line front end for the estimating core
//!
//! Loads an estimate either from a JSON bundle (estimate, catalog, carrier
//! and jurisdiction profiles with their rules) or from PostgreSQL, runs it
//! through the submission gate and prints the result as JSON.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;

pub use cli::{Cli, Command, SourceArgs};
pub use commands::{execute, load_bundle, CommandOutput};
pub use config::CliConfig;
pub use error::CliError;
