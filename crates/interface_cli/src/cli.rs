//! Command line arguments

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "estimate-check")]
#[command(about = "Validate, price and submit repair estimates")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
    /// Validator settings file; overrides ESTIMATE_VALIDATOR_CONFIG
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
    /// PostgreSQL connection string; overrides ESTIMATE_DATABASE_URL
    #[arg(long, global = true)]
    pub database_url: Option<String>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the full pipeline and print the validation result
    Validate {
        #[command(flatten)]
        source: SourceArgs,
        /// Print the whole pipeline report instead of the validation result
        #[arg(long)]
        full: bool,
    },
    /// Validate and, when there are no errors, lock the estimate for review
    Submit {
        #[command(flatten)]
        source: SourceArgs,
    },
    /// Check a quantity formula without evaluating it
    CheckFormula {
        formula: String,
    },
    /// Apply pending schema migrations to the configured database
    Migrate,
}

/// Where the estimate comes from
#[derive(Debug, Clone, Args)]
#[group(required = true, multiple = false)]
pub struct SourceArgs {
    /// JSON bundle with the estimate, catalog, profiles and rules
    #[arg(short, long)]
    pub bundle: Option<PathBuf>,
    /// Estimate id to load from the database
    #[arg(short, long)]
    pub estimate: Option<String>,
}
