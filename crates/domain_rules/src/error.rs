//! Rules domain errors

use thiserror::Error;

use core_kernel::RuleId;

/// Errors raised while normalising or evaluating carrier rules
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RuleError {
    /// A raw rule row could not be interpreted
    #[error("Malformed rule {rule_id}: {message}")]
    MalformedRecord { rule_id: RuleId, message: String },

    #[error("Rule {0} has neither a target code nor a category prefix")]
    MissingTarget(RuleId),

    #[error("Rule {rule_id} has unknown effect type '{effect}'")]
    UnknownEffect { rule_id: RuleId, effect: String },

    /// A cap or adjustment carries a limit that cannot be applied
    #[error("Rule {rule_id} has an invalid limit: {message}")]
    InvalidLimit { rule_id: RuleId, message: String },

    #[error("Rule evaluation failed: {0}")]
    Evaluation(String),
}

impl RuleError {
    pub fn malformed(rule_id: RuleId, message: impl Into<String>) -> Self {
        RuleError::MalformedRecord {
            rule_id,
            message: message.into(),
        }
    }

    pub fn invalid_limit(rule_id: RuleId, message: impl Into<String>) -> Self {
        RuleError::InvalidLimit {
            rule_id,
            message: message.into(),
        }
    }

    /// Identifier of the offending rule, when the error concerns one record
    pub fn rule_id(&self) -> Option<RuleId> {
        match self {
            RuleError::MalformedRecord { rule_id, .. }
            | RuleError::UnknownEffect { rule_id, .. }
            | RuleError::InvalidLimit { rule_id, .. } => Some(*rule_id),
            RuleError::MissingTarget(rule_id) => Some(*rule_id),
            RuleError::Evaluation(_) => None,
        }
    }
}
