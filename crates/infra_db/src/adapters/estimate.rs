//! PostgreSQL Estimate Adapter
//!
//! This module provides the database adapter for the validation domain,
//! implementing the `EstimateRepository` port on top of
//! [`EstimateRecordRepository`].
//!
//! # Overview
//!
//! The `PostgresEstimateAdapter` is the bridge between the submission gate and
//! the database. It:
//!
//! - Loads an estimate header and reassembles its zones and line items
//! - Converts profile and rule rows back into domain values
//! - Translates `DatabaseError` into `PortError`
//!
//! # Example
//!
//! ```rust,ignore
//! use infra_db::adapters::PostgresEstimateAdapter;
//! use domain_validation::{EstimateRepository, SubmissionGate, ValidatorConfig};
//! use std::sync::Arc;
//!
//! let repository: Arc<dyn EstimateRepository> = Arc::new(PostgresEstimateAdapter::new(pool));
//! let gate = SubmissionGate::new(repository, ValidatorConfig::default());
//! let outcome = gate.submit(estimate_id).await?;
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::PgPool;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use core_kernel::{CarrierId, Currency, DomainPort, EstimateId, JurisdictionId, PortError, Rate};
use domain_estimate::{
    CarrierProfile, Catalog, DeductibleSchedule, Estimate, EstimateStatus, JurisdictionProfile,
};
use domain_rules::{AuditEntry, CarrierCap, CarrierExclusion, CarrierRuleRecord, RuleSource, RuleSources};
use domain_validation::EstimateRepository;

use crate::error::DatabaseError;
use crate::repositories::estimate::{
    CarrierCapRow, CarrierExclusionRow, CarrierProfileRow, CarrierRuleRow, EstimateRecordRepository,
    EstimateRow, JurisdictionProfileRow, RuleOwner, RuleRows,
};

/// PostgreSQL-backed implementation of the `EstimateRepository` port
///
/// # Error Handling
///
/// - missing rows -> `PortError::NotFound` naming the entity
/// - a lost submission race -> `PortError::Conflict`
/// - stored documents that no longer deserialize -> `PortError::Transformation`
/// - connection faults -> `PortError::Connection`
#[derive(Debug, Clone)]
pub struct PostgresEstimateAdapter {
    repository: EstimateRecordRepository,
}

impl PostgresEstimateAdapter {
    pub fn new(pool: PgPool) -> Self {
        Self {
            repository: EstimateRecordRepository::new(pool),
        }
    }

    /// Returns the underlying repository
    ///
    /// Seeding reference data goes through the repository; the port only
    /// reads and locks.
    pub fn repository(&self) -> &EstimateRecordRepository {
        &self.repository
    }
}

impl DomainPort for PostgresEstimateAdapter {}

#[async_trait]
impl EstimateRepository for PostgresEstimateAdapter {
    #[instrument(skip(self), fields(estimate_id = %id))]
    async fn load_estimate(&self, id: EstimateId) -> Result<Estimate, PortError> {
        debug!("Loading estimate");
        let uuid = Uuid::from(id);

        let row = self
            .repository
            .get_estimate(uuid)
            .await
            .map_err(|e| not_found_as("Estimate", id, e))?;
        let zones = self.repository.get_zones(uuid).await.map_err(db_to_port_error)?;
        let line_items = self.repository.get_line_items(uuid).await.map_err(db_to_port_error)?;

        let mut estimate = row_to_estimate(row).map_err(db_to_port_error)?;
        estimate.zones = zones;
        estimate.line_items = line_items;
        Ok(estimate)
    }

    #[instrument(skip(self))]
    async fn load_catalog(&self) -> Result<Catalog, PortError> {
        let definitions = self.repository.get_catalog().await.map_err(db_to_port_error)?;
        debug!(definitions = definitions.len(), "Loaded catalog");
        Ok(definitions.into())
    }

    #[instrument(skip(self), fields(carrier_id = %carrier_id, jurisdiction_id = %jurisdiction_id))]
    async fn load_rule_sources(
        &self,
        carrier_id: CarrierId,
        jurisdiction_id: JurisdictionId,
    ) -> Result<RuleSources, PortError> {
        let carrier = self
            .repository
            .get_rule_rows(RuleOwner::Carrier(carrier_id.into()))
            .await
            .map_err(db_to_port_error)?;
        let jurisdiction = self
            .repository
            .get_rule_rows(RuleOwner::Jurisdiction(jurisdiction_id.into()))
            .await
            .map_err(db_to_port_error)?;

        let mut sources = rows_to_sources(carrier).map_err(db_to_port_error)?;
        let jurisdiction = rows_to_sources(jurisdiction).map_err(db_to_port_error)?;
        sources.rules.extend(jurisdiction.rules);
        sources.caps.extend(jurisdiction.caps);
        sources.exclusions.extend(jurisdiction.exclusions);
        Ok(sources)
    }

    #[instrument(skip(self), fields(carrier_id = %carrier_id))]
    async fn load_carrier_profile(&self, carrier_id: CarrierId) -> Result<CarrierProfile, PortError> {
        let row = self
            .repository
            .get_carrier_profile(carrier_id.into())
            .await
            .map_err(|e| not_found_as("CarrierProfile", carrier_id, e))?;
        row_to_carrier_profile(row).map_err(db_to_port_error)
    }

    #[instrument(skip(self), fields(jurisdiction_id = %jurisdiction_id))]
    async fn load_jurisdiction_profile(&self, jurisdiction_id: JurisdictionId) -> Result<JurisdictionProfile, PortError> {
        let row = self
            .repository
            .get_jurisdiction_profile(jurisdiction_id.into())
            .await
            .map_err(|e| not_found_as("JurisdictionProfile", jurisdiction_id, e))?;
        Ok(row_to_jurisdiction_profile(row))
    }

    #[instrument(skip(self), fields(estimate_id = %id))]
    async fn lock_for_submission(&self, id: EstimateId, submitted_at: DateTime<Utc>) -> Result<(), PortError> {
        self.repository
            .lock_for_submission(id.into(), submitted_at)
            .await
            .map_err(|e| {
                if matches!(e, DatabaseError::Locked(_)) {
                    warn!("Submission lock already held");
                }
                not_found_as("Estimate", id, e)
            })
    }

    #[instrument(skip(self, entries), fields(count = entries.len()))]
    async fn append_audit_entries(&self, entries: &[AuditEntry]) -> Result<(), PortError> {
        if entries.is_empty() {
            return Ok(());
        }
        self.repository
            .append_audit_entries(entries)
            .await
            .map_err(db_to_port_error)
    }
}

// ============================================================================
// Error Conversion
// ============================================================================

fn db_to_port_error(e: DatabaseError) -> PortError {
    e.into()
}

/// Reports a missing row as the domain entity the caller asked for
fn not_found_as(entity: &str, id: impl std::fmt::Display, e: DatabaseError) -> PortError {
    if e.is_not_found() {
        PortError::not_found(entity, id)
    } else {
        e.into()
    }
}

// ============================================================================
// Row Conversion
// ============================================================================

fn row_to_estimate(row: EstimateRow) -> Result<Estimate, DatabaseError> {
    let status = EstimateStatus::parse(&row.status)
        .ok_or_else(|| DatabaseError::serialization("estimate status", &row.status))?;
    let currency: Currency = serde_json::from_value(Value::String(row.currency.trim().to_string()))
        .map_err(|e| DatabaseError::serialization("currency", e))?;
    let deductibles: DeductibleSchedule = if row.deductibles.is_null() {
        DeductibleSchedule::default()
    } else {
        serde_json::from_value(row.deductibles).map_err(|e| DatabaseError::serialization("deductibles", e))?
    };

    Ok(Estimate {
        id: EstimateId::from(row.estimate_id),
        claim_number: row.claim_number,
        carrier_id: CarrierId::from(row.carrier_id),
        jurisdiction_id: JurisdictionId::from(row.jurisdiction_id),
        status,
        is_locked: row.is_locked,
        currency,
        zones: Vec::new(),
        line_items: Vec::new(),
        deductibles,
        created_at: row.created_at,
        updated_at: row.updated_at,
        submitted_at: row.submitted_at,
    })
}

fn row_to_carrier_profile(row: CarrierProfileRow) -> Result<CarrierProfile, DatabaseError> {
    let op_trade_minimum = usize::try_from(row.op_trade_minimum)
        .map_err(|e| DatabaseError::serialization("op_trade_minimum", e))?;

    Ok(CarrierProfile {
        id: CarrierId::from(row.carrier_id),
        name: row.name,
        overhead_pct: Rate::new(row.overhead_pct),
        profit_pct: Rate::new(row.profit_pct),
        op_trade_minimum,
        op_threshold: row.op_threshold,
        tax_materials_only: row.tax_materials_only,
    })
}

fn row_to_jurisdiction_profile(row: JurisdictionProfileRow) -> JurisdictionProfile {
    JurisdictionProfile {
        id: JurisdictionId::from(row.jurisdiction_id),
        name: row.name,
        tax_rate: Rate::new(row.tax_rate),
        labor_taxable: row.labor_taxable,
        op_threshold_override: row.op_threshold_override,
    }
}

fn parse_source(value: &str) -> Result<RuleSource, DatabaseError> {
    RuleSource::parse(value).ok_or_else(|| DatabaseError::serialization("rule source", value))
}

fn rows_to_sources(rows: RuleRows) -> Result<RuleSources, DatabaseError> {
    let rules = rows.rules.into_iter().map(row_to_rule_record).collect();
    let caps = rows
        .caps
        .into_iter()
        .map(row_to_cap)
        .collect::<Result<Vec<_>, _>>()?;
    let exclusions = rows
        .exclusions
        .into_iter()
        .map(row_to_exclusion)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(RuleSources { rules, caps, exclusions })
}

/// Rule rows stay loosely typed; the rules engine reports rows it cannot interpret
fn row_to_rule_record(row: CarrierRuleRow) -> CarrierRuleRecord {
    CarrierRuleRecord {
        id: row.rule_id.into(),
        name: row.name,
        source: row.source,
        priority: row.priority,
        target_code: row.target_code,
        category_prefix: row.category_prefix,
        conditions: row.conditions,
        effect: row.effect,
        is_active: row.is_active,
    }
}

fn row_to_cap(row: CarrierCapRow) -> Result<CarrierCap, DatabaseError> {
    Ok(CarrierCap {
        id: row.cap_id.into(),
        name: row.name,
        source: parse_source(&row.source)?,
        priority: row.priority,
        target_code: row.target_code,
        category_prefix: row.category_prefix,
        max_quantity: row.max_quantity,
        max_quantity_per_zone: row.max_quantity_per_zone,
        max_unit_price: row.max_unit_price,
    })
}

fn row_to_exclusion(row: CarrierExclusionRow) -> Result<CarrierExclusion, DatabaseError> {
    Ok(CarrierExclusion {
        id: row.exclusion_id.into(),
        code: row.code,
        reason: row.reason,
        source: parse_source(&row.source)?,
    })
}
