//! Estimate Repository Port
//!
//! The validator and submission gate are pure computations over data fetched
//! into the call. This port is the boundary to everything they fetch or
//! persist: the estimate, the catalog, carrier and jurisdiction rule tables
//! and profiles, and the rules audit store.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐     ┌───────────────────────┐
//! │  SubmissionGate  │────►│  EstimateRepository   │ (Port)
//! └──────────────────┘     └───────────────────────┘
//!                                    ▲
//!                     ┌──────────────┴──────────────┐
//!                     │                             │
//!          ┌──────────────────────┐     ┌─────────────────────┐
//!          │ InMemoryEstimateRepo │     │ PgEstimateRepository│
//!          │   (tests, CLI)       │     │   (infra_db)        │
//!          └──────────────────────┘     └─────────────────────┘
//! ```
//!
//! # Locking
//!
//! [`EstimateRepository::lock_for_submission`] is the only state-changing
//! call. Implementations must make it a single check-then-set: when two
//! callers race, exactly one succeeds and the other receives
//! [`PortError::Conflict`].
//!
//! # Usage
//!
//! ```rust,ignore
//! use domain_validation::{EstimateRepository, InMemoryEstimateRepository, SubmissionGate};
//! use std::sync::Arc;
//!
//! let repository: Arc<dyn EstimateRepository> = Arc::new(InMemoryEstimateRepository::new());
//! let gate = SubmissionGate::new(repository, ValidatorConfig::default());
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use core_kernel::{CarrierId, DomainPort, EstimateId, JurisdictionId, PortError};
use domain_estimate::{CarrierProfile, Catalog, Estimate, JurisdictionProfile};
use domain_rules::{AuditEntry, RuleSources};

/// Port for estimate data and the audit store
#[async_trait]
pub trait EstimateRepository: DomainPort {
    /// Loads an estimate with its zones and line items
    ///
    /// # Errors
    ///
    /// Returns `PortError::NotFound` if no estimate has the id
    async fn load_estimate(&self, id: EstimateId) -> Result<Estimate, PortError>;

    /// Loads the line item catalog
    async fn load_catalog(&self) -> Result<Catalog, PortError>;

    /// Loads the rules, caps and exclusions for a carrier and jurisdiction
    ///
    /// Carrier rows come first, jurisdiction rows after them, so that
    /// same-priority rules keep that declaration order.
    async fn load_rule_sources(
        &self,
        carrier_id: CarrierId,
        jurisdiction_id: JurisdictionId,
    ) -> Result<RuleSources, PortError>;

    async fn load_carrier_profile(&self, carrier_id: CarrierId) -> Result<CarrierProfile, PortError>;

    async fn load_jurisdiction_profile(&self, jurisdiction_id: JurisdictionId) -> Result<JurisdictionProfile, PortError>;

    /// Locks the estimate and moves it to pending review
    ///
    /// # Arguments
    ///
    /// * `id` - The estimate to lock
    /// * `submitted_at` - Submission timestamp recorded on the estimate
    ///
    /// # Errors
    ///
    /// Returns `PortError::Conflict` if the estimate is already locked and
    /// `PortError::NotFound` if it does not exist
    async fn lock_for_submission(&self, id: EstimateId, submitted_at: DateTime<Utc>) -> Result<(), PortError>;

    /// Appends rules audit entries; entries are never updated afterwards
    async fn append_audit_entries(&self, entries: &[AuditEntry]) -> Result<(), PortError>;
}
