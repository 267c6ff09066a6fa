//! Carrier and Jurisdiction Rules
//!
//! This crate applies insurer and regional rules to priced line items:
//! exclusions deny an item outright, caps clamp its quantity or unit price,
//! and documentation rules attach required evidence. Every automated change
//! is explained and written to an append-only audit log.
//!
//! Raw rule rows are normalised first. A row that cannot be interpreted
//! never blocks the claim: [`evaluate_rules`] logs it and returns an outcome
//! in which no rules applied.

pub mod model;
pub mod records;
pub mod audit;
pub mod engine;
pub mod explanation;
pub mod error;

pub use model::{CarrierRule, EffectType, RuleConditions, RuleEffect, RuleSource, RuleTarget};
pub use records::{CarrierCap, CarrierExclusion, CarrierRuleRecord, RuleSources};
pub use audit::{AppliedRule, AuditEntry, AuditLog};
pub use engine::{
    evaluate_rules, EvaluationContext, LineItemRuleResult, RuleStatus, RulesEngine, RulesOutcome, ZoneConditions,
};
pub use explanation::{generate_explanation, NO_RULES_APPLIED};
pub use error::RuleError;
