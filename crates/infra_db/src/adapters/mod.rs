//! Domain Adapters
//!
//! Adapter implementations connecting domain ports to PostgreSQL.
//!
//! # Architecture
//!
//! Each adapter:
//! - Implements a domain port trait
//! - Translates between domain models and database row types
//! - Uses the repository layer for database operations
//!
//! # Usage
//!
//! ```rust,ignore
//! use infra_db::adapters::PostgresEstimateAdapter;
//! use domain_validation::EstimateRepository;
//!
//! let adapter = PostgresEstimateAdapter::new(pool);
//! let estimate = adapter.load_estimate(estimate_id).await?;
//! ```

pub mod estimate;

pub use estimate::PostgresEstimateAdapter;
