//! Core Kernel - Foundational types for the repair estimating core
//!
//! This crate provides the building blocks shared by the estimate, rules and
//! validation domains:
//! - Money and rate types with precise decimal arithmetic
//! - Strongly-typed identifiers for estimates, zones, line items and rules
//! - The error taxonomy used by repository ports

pub mod money;
pub mod identifiers;
pub mod ports;

pub use money::{Money, Currency, MoneyError, Rate};
pub use identifiers::{
    EstimateId, ZoneId, LineItemId, RuleId, CarrierId, JurisdictionId, AuditEntryId,
};
pub use ports::{PortError, DomainPort};
