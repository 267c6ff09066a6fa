//! CLI configuration

use serde::Deserialize;
use std::path::PathBuf;

use domain_validation::ValidatorConfig;

/// Settings read from `ESTIMATE_*` environment variables
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CliConfig {
    /// Log filter used when `RUST_LOG` is not set
    pub log_level: String,
    /// Emit logs as JSON lines
    pub json_logs: bool,
    /// PostgreSQL connection string for `--estimate` sources
    pub database_url: Option<String>,
    /// Validator settings file (TOML, YAML or JSON)
    pub validator_config: Option<PathBuf>,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
            database_url: None,
            validator_config: None,
        }
    }
}

impl CliConfig {
    /// Loads configuration from environment
    pub fn from_env() -> Result<Self, config::ConfigError> {
        Self::from_source(config::Environment::with_prefix("ESTIMATE"))
    }

    /// Loads configuration from an arbitrary source layered over the defaults
    pub fn from_source<S>(source: S) -> Result<Self, config::ConfigError>
    where
        S: config::Source + Send + Sync + 'static,
    {
        config::Config::builder()
            .set_default("log_level", "info")?
            .set_default("json_logs", false)?
            .add_source(source)
            .build()?
            .try_deserialize()
    }

    /// Validator settings from the configured file, or the defaults
    pub fn load_validator_config(&self) -> Result<ValidatorConfig, config::ConfigError> {
        match &self.validator_config {
            Some(path) => ValidatorConfig::from_file(path),
            None => Ok(ValidatorConfig::default()),
        }
    }
}
