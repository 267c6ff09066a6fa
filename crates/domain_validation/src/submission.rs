//! Submission gate
//!
//! The single entry point that validates an estimate for submission and
//! performs the locking transition. A locked estimate is refused before any
//! rule runs or any audit entry is written; an estimate with validation
//! errors is left untouched.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use core_kernel::EstimateId;
use domain_estimate::{EstimateError, EstimateStatus};

use crate::config::ValidatorConfig;
use crate::error::SubmissionError;
use crate::issue::ValidationResult;
use crate::pipeline::{EstimatePipeline, PipelineReport};
use crate::ports::EstimateRepository;

/// Result of a submission attempt that reached validation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SubmissionOutcome {
    /// Locked and moved to pending review
    Submitted {
        validation: ValidationResult,
        submitted_at: DateTime<Utc>,
    },
    /// Validation reported errors; nothing changed
    Blocked { validation: ValidationResult },
}

impl SubmissionOutcome {
    pub fn validation(&self) -> &ValidationResult {
        match self {
            SubmissionOutcome::Submitted { validation, .. } | SubmissionOutcome::Blocked { validation } => validation,
        }
    }

    pub fn is_submitted(&self) -> bool {
        matches!(self, SubmissionOutcome::Submitted { .. })
    }
}

/// Validates and locks estimates through an [`EstimateRepository`]
pub struct SubmissionGate {
    repository: Arc<dyn EstimateRepository>,
    config: ValidatorConfig,
}

impl SubmissionGate {
    pub fn new(repository: Arc<dyn EstimateRepository>, config: ValidatorConfig) -> Self {
        Self { repository, config }
    }

    pub fn config(&self) -> &ValidatorConfig {
        &self.config
    }

    /// Runs extended validation for an unlocked estimate
    ///
    /// Loads the estimate and its reference data, runs the pipeline and, when
    /// configured, appends the rules audit log to the audit store.
    ///
    /// # Errors
    ///
    /// - `AlreadySubmitted` if the estimate is locked
    /// - `EstimateNotFound` if it does not exist
    /// - `Estimate` for recalculation failures (unknown code or zone)
    /// - `Repository` for any other storage failure
    pub async fn validate_for_submission(&self, estimate_id: EstimateId) -> Result<PipelineReport, SubmissionError> {
        let estimate = self
            .repository
            .load_estimate(estimate_id)
            .await
            .map_err(|e| SubmissionError::from_port(estimate_id, e))?;
        if estimate.is_locked {
            return Err(SubmissionError::AlreadySubmitted(estimate_id));
        }

        let catalog = self.repository.load_catalog().await?;
        let sources = self
            .repository
            .load_rule_sources(estimate.carrier_id, estimate.jurisdiction_id)
            .await?;
        let carrier = self.repository.load_carrier_profile(estimate.carrier_id).await?;
        let jurisdiction = self
            .repository
            .load_jurisdiction_profile(estimate.jurisdiction_id)
            .await?;

        let report = EstimatePipeline::new(&catalog, &self.config).run(
            &estimate,
            &sources,
            &carrier,
            &jurisdiction,
            Utc::now(),
        )?;

        if self.config.persist_audit_log && !report.rules.audit_log.is_empty() {
            self.repository
                .append_audit_entries(report.rules.audit_log.entries())
                .await?;
        }

        Ok(report)
    }

    /// Validates the estimate and locks it when there are no errors
    ///
    /// # Returns
    ///
    /// `Submitted` with the lock timestamp, or `Blocked` with the validation
    /// result when at least one error was found
    pub async fn submit(&self, estimate_id: EstimateId) -> Result<SubmissionOutcome, SubmissionError> {
        let estimate = self
            .repository
            .load_estimate(estimate_id)
            .await
            .map_err(|e| SubmissionError::from_port(estimate_id, e))?;
        if estimate.is_locked {
            return Err(SubmissionError::AlreadySubmitted(estimate_id));
        }
        if !estimate.status.can_submit() {
            return Err(SubmissionError::Estimate(EstimateError::InvalidStatusTransition {
                from: estimate.status.to_string(),
                to: EstimateStatus::PendingReview.to_string(),
            }));
        }

        let validation = self.validate_for_submission(estimate_id).await?.validation;

        if validation.error_count > 0 {
            info!(
                estimate_id = %estimate_id,
                errors = validation.error_count,
                warnings = validation.warning_count,
                "Submission blocked by validation errors"
            );
            return Ok(SubmissionOutcome::Blocked { validation });
        }

        let submitted_at = Utc::now();
        if let Err(err) = self.repository.lock_for_submission(estimate_id, submitted_at).await {
            if err.is_conflict() {
                warn!(estimate_id = %estimate_id, "Submission lost the lock race");
            }
            return Err(SubmissionError::from_port(estimate_id, err));
        }

        info!(
            estimate_id = %estimate_id,
            warnings = validation.warning_count,
            infos = validation.info_count,
            "Estimate submitted"
        );
        Ok(SubmissionOutcome::Submitted {
            validation,
            submitted_at,
        })
    }
}
