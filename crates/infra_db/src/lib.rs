//! Infrastructure Database Layer
//!
//! This crate provides PostgreSQL persistence for the estimating core using
//! SQLx: estimates with their zones and line items, the line item catalog,
//! carrier and jurisdiction profiles and rule tables, and the append-only
//! rules audit trail.
//!
//! # Architecture
//!
//! The crate follows the repository pattern. Repositories speak in row types
//! and [`DatabaseError`]; adapters implement the domain ports on top of them
//! and translate rows back into domain values.
//!
//! # Example
//!
//! ```rust,ignore
//! use infra_db::{create_pool, DatabaseConfig, PostgresEstimateAdapter};
//!
//! let pool = create_pool(DatabaseConfig::new("postgres://localhost/estimating")).await?;
//! let repository = PostgresEstimateAdapter::new(pool);
//! ```

pub mod pool;
pub mod error;
pub mod repositories;
pub mod adapters;

pub use pool::{
    DatabasePool, create_pool, create_pool_from_url, run_migrations, DatabaseConfig, DEFAULT_DATABASE_URL,
};
pub use error::DatabaseError;
pub use repositories::{EstimateRecordRepository, RuleOwner};
pub use adapters::PostgresEstimateAdapter;
