//! Adapters for the estimate repository port
//!
//! - **InMemoryEstimateRepository**: process-local store used by tests and
//!   the `estimate-check` tool, seeded from an [`EstimateBundle`]
//!
//! The PostgreSQL adapter lives in `infra_db`.

pub mod memory;

pub use memory::{EstimateBundle, InMemoryEstimateRepository};
