//! In-memory estimate repository
//!
//! Backs the test suite and the command line tool. State lives behind a
//! `tokio::sync::RwLock`; the submission lock is taken under the write guard,
//! which makes the check-then-set atomic.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;
use tracing::warn;

use core_kernel::{CarrierId, DomainPort, EstimateId, JurisdictionId, PortError};
use domain_estimate::{CarrierProfile, Catalog, Estimate, JurisdictionProfile};
use domain_rules::{AuditEntry, RuleSources};

use crate::ports::EstimateRepository;

/// A self-contained estimate with everything needed to run the pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EstimateBundle {
    pub estimate: Estimate,
    pub catalog: Catalog,
    pub carrier: CarrierProfile,
    pub jurisdiction: JurisdictionProfile,
    #[serde(default)]
    pub carrier_rules: RuleSources,
    #[serde(default)]
    pub jurisdiction_rules: RuleSources,
}

#[derive(Debug, Default)]
struct Store {
    estimates: HashMap<EstimateId, Estimate>,
    catalog: Catalog,
    carriers: HashMap<CarrierId, CarrierProfile>,
    jurisdictions: HashMap<JurisdictionId, JurisdictionProfile>,
    carrier_rules: HashMap<CarrierId, RuleSources>,
    jurisdiction_rules: HashMap<JurisdictionId, RuleSources>,
    audit: Vec<AuditEntry>,
}

/// Repository holding everything in process memory
#[derive(Debug, Default)]
pub struct InMemoryEstimateRepository {
    store: RwLock<Store>,
}

impl InMemoryEstimateRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a repository from a bundle
    pub fn from_bundle(bundle: EstimateBundle) -> Self {
        let mut store = Store {
            catalog: bundle.catalog,
            ..Store::default()
        };
        store.carrier_rules.insert(bundle.carrier.id, bundle.carrier_rules);
        store.jurisdiction_rules.insert(bundle.jurisdiction.id, bundle.jurisdiction_rules);
        store.carriers.insert(bundle.carrier.id, bundle.carrier);
        store.jurisdictions.insert(bundle.jurisdiction.id, bundle.jurisdiction);
        store.estimates.insert(bundle.estimate.id, bundle.estimate);
        Self {
            store: RwLock::new(store),
        }
    }

    pub async fn insert_estimate(&self, estimate: Estimate) {
        self.store.write().await.estimates.insert(estimate.id, estimate);
    }

    pub async fn set_catalog(&self, catalog: Catalog) {
        self.store.write().await.catalog = catalog;
    }

    pub async fn insert_carrier(&self, profile: CarrierProfile, rules: RuleSources) {
        let mut store = self.store.write().await;
        store.carrier_rules.insert(profile.id, rules);
        store.carriers.insert(profile.id, profile);
    }

    pub async fn insert_jurisdiction(&self, profile: JurisdictionProfile, rules: RuleSources) {
        let mut store = self.store.write().await;
        store.jurisdiction_rules.insert(profile.id, rules);
        store.jurisdictions.insert(profile.id, profile);
    }

    /// Audit entries persisted so far, in append order
    pub async fn audit_entries(&self) -> Vec<AuditEntry> {
        self.store.read().await.audit.clone()
    }
}

impl DomainPort for InMemoryEstimateRepository {}

#[async_trait]
impl EstimateRepository for InMemoryEstimateRepository {
    async fn load_estimate(&self, id: EstimateId) -> Result<Estimate, PortError> {
        self.store
            .read()
            .await
            .estimates
            .get(&id)
            .cloned()
            .ok_or_else(|| PortError::not_found("Estimate", id))
    }

    async fn load_catalog(&self) -> Result<Catalog, PortError> {
        Ok(self.store.read().await.catalog.clone())
    }

    async fn load_rule_sources(
        &self,
        carrier_id: CarrierId,
        jurisdiction_id: JurisdictionId,
    ) -> Result<RuleSources, PortError> {
        let store = self.store.read().await;
        let mut sources = store.carrier_rules.get(&carrier_id).cloned().unwrap_or_default();
        if let Some(jurisdiction) = store.jurisdiction_rules.get(&jurisdiction_id) {
            sources.rules.extend(jurisdiction.rules.iter().cloned());
            sources.caps.extend(jurisdiction.caps.iter().cloned());
            sources.exclusions.extend(jurisdiction.exclusions.iter().cloned());
        }
        Ok(sources)
    }

    async fn load_carrier_profile(&self, carrier_id: CarrierId) -> Result<CarrierProfile, PortError> {
        self.store
            .read()
            .await
            .carriers
            .get(&carrier_id)
            .cloned()
            .ok_or_else(|| PortError::not_found("CarrierProfile", carrier_id))
    }

    async fn load_jurisdiction_profile(&self, jurisdiction_id: JurisdictionId) -> Result<JurisdictionProfile, PortError> {
        self.store
            .read()
            .await
            .jurisdictions
            .get(&jurisdiction_id)
            .cloned()
            .ok_or_else(|| PortError::not_found("JurisdictionProfile", jurisdiction_id))
    }

    async fn lock_for_submission(&self, id: EstimateId, submitted_at: DateTime<Utc>) -> Result<(), PortError> {
        let mut store = self.store.write().await;
        let estimate = store
            .estimates
            .get_mut(&id)
            .ok_or_else(|| PortError::not_found("Estimate", id))?;

        if estimate.is_locked {
            warn!(estimate_id = %id, "Lock refused: estimate already locked");
            return Err(PortError::conflict(format!("Estimate {} is already locked", id)));
        }
        estimate
            .mark_submitted(submitted_at)
            .map_err(|e| PortError::conflict(e.to_string()))
    }

    async fn append_audit_entries(&self, entries: &[AuditEntry]) -> Result<(), PortError> {
        let mut store = self.store.write().await;
        // Same contract as the audit table's primary key: nothing is written
        // when any id is already present.
        let mut seen: HashSet<_> = store.audit.iter().map(|e| e.id).collect();
        if let Some(duplicate) = entries.iter().find(|e| !seen.insert(e.id)) {
            warn!(audit_entry_id = %duplicate.id, "Audit append refused: duplicate entry id");
            return Err(PortError::conflict(format!("Audit entry {} already recorded", duplicate.id)));
        }
        store.audit.extend(entries.iter().cloned());
        Ok(())
    }
}
