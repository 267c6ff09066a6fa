//! Test Utilities Crate
//!
//! Provides shared test infrastructure, fixtures, and helpers for the
//! repair estimating test suite.
//!
//! # Modules
//!
//! - `fixtures`: Catalog rows, carrier rules, zones and fixed timestamps
//! - `builders`: Builders for zones, line items, estimates and bundles
//! - `database`: PostgreSQL containers, schema setup and bundle seeding
//! - `assertions`: Decimal, money and validation issue assertions
//! - `generators`: Proptest strategies for geometry, formulas and issues

pub mod fixtures;
pub mod builders;
pub mod database;
pub mod assertions;
pub mod generators;

pub use fixtures::*;
pub use builders::*;
pub use database::*;
pub use assertions::*;
pub use generators::*;
