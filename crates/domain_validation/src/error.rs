//! Submission workflow errors
//!
//! These are operational failures, distinct from the [`ValidationIssue`]s a
//! validation pass reports. They short-circuit before validation runs.
//!
//! [`ValidationIssue`]: crate::issue::ValidationIssue

use thiserror::Error;

use core_kernel::{EstimateId, PortError};
use domain_estimate::EstimateError;

/// Errors raised by the submission workflow
#[derive(Debug, Error)]
pub enum SubmissionError {
    /// The estimate is locked; it has already been submitted
    #[error("Estimate {0} has already been submitted")]
    AlreadySubmitted(EstimateId),

    #[error("Estimate not found: {0}")]
    EstimateNotFound(EstimateId),

    #[error("Repository error: {0}")]
    Repository(#[from] PortError),

    /// Recalculation or settlement failed (unknown code, missing zone)
    #[error("Estimate error: {0}")]
    Estimate(#[from] EstimateError),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl SubmissionError {
    /// Maps a repository error for the given estimate, turning lookups and
    /// lost lock races into their workflow meaning
    pub fn from_port(estimate_id: EstimateId, err: PortError) -> Self {
        if err.is_not_found() {
            SubmissionError::EstimateNotFound(estimate_id)
        } else if err.is_conflict() {
            SubmissionError::AlreadySubmitted(estimate_id)
        } else {
            SubmissionError::Repository(err)
        }
    }
}

impl From<config::ConfigError> for SubmissionError {
    fn from(err: config::ConfigError) -> Self {
        SubmissionError::Configuration(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_port_error_mapping() {
        let id = EstimateId::new();
        assert!(matches!(
            SubmissionError::from_port(id, PortError::not_found("Estimate", id)),
            SubmissionError::EstimateNotFound(found) if found == id
        ));
        assert!(matches!(
            SubmissionError::from_port(id, PortError::conflict("locked")),
            SubmissionError::AlreadySubmitted(_)
        ));
        assert!(matches!(
            SubmissionError::from_port(id, PortError::connection("down")),
            SubmissionError::Repository(_)
        ));
    }
}
