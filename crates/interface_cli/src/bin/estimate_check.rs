//! Estimate Check - validation and submission from the command line
//!
//! # Usage
//!
//! ```bash
//! # Validate a bundle and print the issues
//! estimate-check validate --bundle estimate.json
//!
//! # Submit a stored estimate
//! ESTIMATE_DATABASE_URL=postgres://... estimate-check submit --estimate EST-...
//!
//! # Create or update the schema
//! ESTIMATE_DATABASE_URL=postgres://... estimate-check migrate
//!
//! # Check a quantity formula
//! estimate-check check-formula "MAX(3, CEIL(FLOOR_SF(zone)/500))"
//! ```
//!
//! # Environment Variables
//!
//! * `ESTIMATE_LOG_LEVEL` - Log level when `RUST_LOG` is unset (default: info)
//! * `ESTIMATE_JSON_LOGS` - Emit logs as JSON lines (default: false)
//! * `ESTIMATE_DATABASE_URL` - PostgreSQL connection string
//! * `ESTIMATE_VALIDATOR_CONFIG` - Validator settings file
//!
//! Exit codes: 0 pass, 2 validation errors or blocked submission,
//! 3 already submitted, 4 estimate not found, 1 anything else.

use clap::Parser;
use std::process::ExitCode;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use interface_cli::{execute, Cli, CliConfig};

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = CliConfig::from_env()?;
    init_tracing(&config);

    match execute(&cli, &config).await {
        Ok(output) => {
            println!("{}", serde_json::to_string_pretty(&output.body)?);
            Ok(if output.success { ExitCode::SUCCESS } else { ExitCode::from(2) })
        }
        Err(err) => {
            tracing::error!(error = %err, "Command failed");
            eprintln!("error: {err}");
            Ok(ExitCode::from(u8::try_from(err.exit_code()).unwrap_or(1)))
        }
    }
}

/// Logs go to stderr so stdout stays machine readable
fn init_tracing(config: &CliConfig) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(filter);
    if config.json_logs {
        registry.with(fmt::layer().json().with_writer(std::io::stderr)).init();
    } else {
        registry.with(fmt::layer().with_writer(std::io::stderr)).init();
    }
}
