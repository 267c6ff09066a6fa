//! CLI error handling

use std::path::PathBuf;
use thiserror::Error;

use domain_validation::SubmissionError;
use infra_db::DatabaseError;

/// CLI error types
#[derive(Debug, Error)]
pub enum CliError {
    #[error("Failed to read bundle {path}: {source}")]
    BundleRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Bundle {path} is not a valid estimate bundle: {source}")]
    BundleParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("No database configured; set ESTIMATE_DATABASE_URL or pass --database-url")]
    MissingDatabaseUrl,

    #[error("Invalid estimate id '{0}'")]
    InvalidEstimateId(String),

    #[error(transparent)]
    Submission(#[from] SubmissionError),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Configuration error: {0}")]
    Configuration(#[from] config::ConfigError),

    #[error("Output error: {0}")]
    Output(#[from] serde_json::Error),
}

impl CliError {
    /// Process exit code for the error
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Submission(SubmissionError::AlreadySubmitted(_)) => 3,
            CliError::Submission(SubmissionError::EstimateNotFound(_)) => 4,
            _ => 1,
        }
    }
}
