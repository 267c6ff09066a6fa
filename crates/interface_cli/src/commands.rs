//! Command execution

use serde_json::{json, Value};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, instrument};

use core_kernel::EstimateId;
use domain_estimate::validate_formula;
use domain_validation::{
    EstimateBundle, EstimateRepository, InMemoryEstimateRepository, SubmissionGate, SubmissionOutcome,
};
use infra_db::{create_pool, run_migrations, DatabaseConfig, DatabasePool, PostgresEstimateAdapter};

use crate::cli::{Cli, Command, SourceArgs};
use crate::config::CliConfig;
use crate::error::CliError;

/// What a command prints and whether it counts as a pass
#[derive(Debug, Clone, PartialEq)]
pub struct CommandOutput {
    pub body: Value,
    pub success: bool,
}

/// Runs the parsed command against the configured sources
pub async fn execute(cli: &Cli, config: &CliConfig) -> Result<CommandOutput, CliError> {
    let mut config = config.clone();
    if let Some(path) = &cli.config {
        config.validator_config = Some(path.clone());
    }
    if let Some(url) = &cli.database_url {
        config.database_url = Some(url.clone());
    }

    match &cli.command {
        Command::Validate { source, full } => validate(source, *full, &config).await,
        Command::Submit { source } => submit(source, &config).await,
        Command::CheckFormula { formula } => check_formula(formula),
        Command::Migrate => migrate(&config).await,
    }
}

#[instrument(skip(config))]
async fn validate(source: &SourceArgs, full: bool, config: &CliConfig) -> Result<CommandOutput, CliError> {
    let (gate, estimate_id) = open_gate(source, config).await?;
    let report = gate.validate_for_submission(estimate_id).await?;

    info!(
        estimate_id = %estimate_id,
        is_valid = report.validation.is_valid,
        errors = report.validation.error_count,
        warnings = report.validation.warning_count,
        "Estimate validated"
    );

    let success = report.validation.is_valid;
    let body = if full {
        serde_json::to_value(&report)?
    } else {
        serde_json::to_value(&report.validation)?
    };
    Ok(CommandOutput { body, success })
}

#[instrument(skip(config))]
async fn submit(source: &SourceArgs, config: &CliConfig) -> Result<CommandOutput, CliError> {
    let (gate, estimate_id) = open_gate(source, config).await?;
    let outcome = gate.submit(estimate_id).await?;

    match &outcome {
        SubmissionOutcome::Submitted { submitted_at, .. } => {
            info!(estimate_id = %estimate_id, submitted_at = %submitted_at, "Estimate submitted")
        }
        SubmissionOutcome::Blocked { validation } => {
            info!(estimate_id = %estimate_id, errors = validation.error_count, "Submission blocked")
        }
    }

    Ok(CommandOutput {
        success: outcome.is_submitted(),
        body: serde_json::to_value(&outcome)?,
    })
}

fn check_formula(formula: &str) -> Result<CommandOutput, CliError> {
    let validation = validate_formula(formula);
    Ok(CommandOutput {
        success: validation.valid,
        body: json!({
            "formula": formula,
            "validation": serde_json::to_value(&validation)?,
        }),
    })
}

async fn migrate(config: &CliConfig) -> Result<CommandOutput, CliError> {
    let pool = connect(config).await?;
    run_migrations(&pool).await?;
    Ok(CommandOutput {
        body: json!({ "migrated": true }),
        success: true,
    })
}

async fn connect(config: &CliConfig) -> Result<DatabasePool, CliError> {
    let url = config.database_url.as_deref().ok_or(CliError::MissingDatabaseUrl)?;
    Ok(create_pool(DatabaseConfig::new(url)).await?)
}

async fn open_gate(source: &SourceArgs, config: &CliConfig) -> Result<(SubmissionGate, EstimateId), CliError> {
    let validator_config = config.load_validator_config()?;
    let (repository, estimate_id) = open_repository(source, config).await?;
    Ok((SubmissionGate::new(repository, validator_config), estimate_id))
}

async fn open_repository(
    source: &SourceArgs,
    config: &CliConfig,
) -> Result<(Arc<dyn EstimateRepository>, EstimateId), CliError> {
    if let Some(path) = &source.bundle {
        let bundle = load_bundle(path).await?;
        let estimate_id = bundle.estimate.id;
        debug!(path = %path.display(), estimate_id = %estimate_id, "Loaded estimate bundle");
        return Ok((Arc::new(InMemoryEstimateRepository::from_bundle(bundle)), estimate_id));
    }

    let raw_id = source.estimate.as_deref().unwrap_or_default();
    let estimate_id: EstimateId = raw_id
        .parse()
        .map_err(|_| CliError::InvalidEstimateId(raw_id.to_string()))?;
    let pool = connect(config).await?;
    Ok((Arc::new(PostgresEstimateAdapter::new(pool)), estimate_id))
}

/// Reads an [`EstimateBundle`] from a JSON file
pub async fn load_bundle(path: &Path) -> Result<EstimateBundle, CliError> {
    let raw = tokio::fs::read_to_string(path).await.map_err(|source| CliError::BundleRead {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| CliError::BundleParse {
        path: path.to_path_buf(),
        source,
    })
}
