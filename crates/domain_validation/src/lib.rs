//! Validation Domain - Estimate linting and the submission gate
//!
//! This crate turns a recalculated estimate into a pass/fail verdict:
//! - Structural checks: dependencies, quantities, exclusions, replacements,
//!   completeness, depreciation and coverage
//! - Extended validation folding in carrier and jurisdiction rule outcomes
//! - The submission gate that locks an estimate once it has no errors
//! - The repository port and an in-memory adapter

pub mod error;
pub mod config;
pub mod issue;
pub mod validator;
pub mod pipeline;
pub mod ports;
pub mod adapters;
pub mod submission;

pub use error::SubmissionError;
pub use config::{ItemPairing, ValidatorConfig};
pub use issue::{codes, IssueCategory, Severity, ValidationIssue, ValidationResult};
pub use validator::{rule_issues, EstimateValidator};
pub use pipeline::{EstimatePipeline, PipelineReport};
pub use ports::EstimateRepository;
pub use adapters::{EstimateBundle, InMemoryEstimateRepository};
pub use submission::{SubmissionGate, SubmissionOutcome};
