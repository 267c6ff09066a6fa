//! Repository implementations
//!
//! Repositories encapsulate SQL and map between database rows and the
//! documents stored in JSONB columns. They never apply domain rules.
//!
//! # Architecture
//!
//! - Runtime-checked queries with `sqlx::query_as` and `FromRow` rows
//! - Transactions for multi-row writes
//! - Conditional updates for the submission lock

pub mod estimate;

pub use estimate::{EstimateRecordRepository, RuleOwner};
