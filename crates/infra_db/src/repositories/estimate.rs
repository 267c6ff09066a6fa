//! Estimate repository implementation
//!
//! Row-level access to the estimating schema: estimates with their zone and
//! line item documents, the catalog, carrier and jurisdiction profiles, rule
//! tables and the append-only rules audit trail.
//!
//! Queries are checked at runtime (`sqlx::query_as::<_, Row>`) so the crate
//! builds without a live database.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde_json::Value;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::debug;
use uuid::Uuid;

use domain_estimate::{CarrierProfile, Estimate, EstimateLineItem, JurisdictionProfile, LineItemDefinition, Zone};
use domain_rules::{AuditEntry, CarrierCap, CarrierExclusion, CarrierRuleRecord, RuleSources};

use crate::error::DatabaseError;

/// Which profile a set of rule rows belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleOwner {
    Carrier(Uuid),
    Jurisdiction(Uuid),
}

impl RuleOwner {
    fn columns(&self) -> (Option<Uuid>, Option<Uuid>) {
        match *self {
            RuleOwner::Carrier(id) => (Some(id), None),
            RuleOwner::Jurisdiction(id) => (None, Some(id)),
        }
    }

    fn owner_column(&self) -> &'static str {
        match self {
            RuleOwner::Carrier(_) => "carrier_id",
            RuleOwner::Jurisdiction(_) => "jurisdiction_id",
        }
    }

    fn id(&self) -> Uuid {
        match *self {
            RuleOwner::Carrier(id) | RuleOwner::Jurisdiction(id) => id,
        }
    }
}

/// Repository for estimates and the reference data they are evaluated against
#[derive(Debug, Clone)]
pub struct EstimateRecordRepository {
    pool: PgPool,
}

impl EstimateRecordRepository {
    /// Creates a new repository with the given connection pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Retrieves an estimate row by its identifier
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::NotFound` when no row exists
    pub async fn get_estimate(&self, estimate_id: Uuid) -> Result<EstimateRow, DatabaseError> {
        sqlx::query_as::<_, EstimateRow>(
            r#"
            SELECT
                estimate_id,
                claim_number,
                carrier_id,
                jurisdiction_id,
                status,
                is_locked,
                currency,
                deductibles,
                created_at,
                updated_at,
                submitted_at
            FROM estimates
            WHERE estimate_id = $1
            "#,
        )
        .bind(estimate_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DatabaseError::not_found("Estimate", estimate_id))
    }

    /// Zones of an estimate in entry order
    pub async fn get_zones(&self, estimate_id: Uuid) -> Result<Vec<Zone>, DatabaseError> {
        let zones = sqlx::query_scalar::<_, Json<Zone>>(
            "SELECT zone FROM estimate_zones WHERE estimate_id = $1 ORDER BY sort_order",
        )
        .bind(estimate_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(zones.into_iter().map(|Json(zone)| zone).collect())
    }

    /// Line items of an estimate in entry order
    pub async fn get_line_items(&self, estimate_id: Uuid) -> Result<Vec<EstimateLineItem>, DatabaseError> {
        let items = sqlx::query_scalar::<_, Json<EstimateLineItem>>(
            "SELECT line_item FROM estimate_line_items WHERE estimate_id = $1 ORDER BY sort_order",
        )
        .bind(estimate_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items.into_iter().map(|Json(item)| item).collect())
    }

    /// Writes an estimate with its zones and line items in one transaction
    ///
    /// Existing zone and line item rows are replaced.
    pub async fn save_estimate(&self, estimate: &Estimate) -> Result<(), DatabaseError> {
        let estimate_id = Uuid::from(estimate.id);
        let deductibles = serde_json::to_value(&estimate.deductibles)
            .map_err(|e| DatabaseError::serialization("deductibles", e))?;

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO estimates (
                estimate_id, claim_number, carrier_id, jurisdiction_id, status,
                is_locked, currency, deductibles, created_at, updated_at, submitted_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ON CONFLICT (estimate_id) DO UPDATE SET
                claim_number = EXCLUDED.claim_number,
                carrier_id = EXCLUDED.carrier_id,
                jurisdiction_id = EXCLUDED.jurisdiction_id,
                status = EXCLUDED.status,
                is_locked = EXCLUDED.is_locked,
                currency = EXCLUDED.currency,
                deductibles = EXCLUDED.deductibles,
                updated_at = EXCLUDED.updated_at,
                submitted_at = EXCLUDED.submitted_at
            "#,
        )
        .bind(estimate_id)
        .bind(&estimate.claim_number)
        .bind(Uuid::from(estimate.carrier_id))
        .bind(Uuid::from(estimate.jurisdiction_id))
        .bind(estimate.status.as_str())
        .bind(estimate.is_locked)
        .bind(estimate.currency.code())
        .bind(deductibles)
        .bind(estimate.created_at)
        .bind(estimate.updated_at)
        .bind(estimate.submitted_at)
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM estimate_zones WHERE estimate_id = $1")
            .bind(estimate_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM estimate_line_items WHERE estimate_id = $1")
            .bind(estimate_id)
            .execute(&mut *tx)
            .await?;

        for (order, zone) in estimate.zones.iter().enumerate() {
            sqlx::query(
                "INSERT INTO estimate_zones (zone_id, estimate_id, sort_order, zone) VALUES ($1, $2, $3, $4)",
            )
            .bind(Uuid::from(zone.id))
            .bind(estimate_id)
            .bind(sort_order(order)?)
            .bind(Json(zone))
            .execute(&mut *tx)
            .await?;
        }

        for (order, item) in estimate.line_items.iter().enumerate() {
            sqlx::query(
                "INSERT INTO estimate_line_items (line_item_id, estimate_id, sort_order, line_item) VALUES ($1, $2, $3, $4)",
            )
            .bind(Uuid::from(item.id))
            .bind(estimate_id)
            .bind(sort_order(order)?)
            .bind(Json(item))
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        debug!(estimate_id = %estimate.id, zones = estimate.zones.len(), items = estimate.line_items.len(), "Saved estimate");
        Ok(())
    }

    /// Locks an estimate and moves it to pending review
    ///
    /// The update only matches unlocked rows in a submittable status, so two
    /// concurrent callers cannot both succeed.
    ///
    /// # Errors
    ///
    /// - `DatabaseError::NotFound` if the estimate does not exist
    /// - `DatabaseError::Locked` if it is locked or not submittable
    pub async fn lock_for_submission(
        &self,
        estimate_id: Uuid,
        submitted_at: DateTime<Utc>,
    ) -> Result<(), DatabaseError> {
        let result = sqlx::query(
            r#"
            UPDATE estimates
            SET status = 'pending_review',
                is_locked = TRUE,
                submitted_at = $2,
                updated_at = $2
            WHERE estimate_id = $1
              AND is_locked = FALSE
              AND status IN ('draft', 'in_progress', 'rejected')
            "#,
        )
        .bind(estimate_id)
        .bind(submitted_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 1 {
            return Ok(());
        }

        let exists = sqlx::query_scalar::<_, bool>("SELECT is_locked FROM estimates WHERE estimate_id = $1")
            .bind(estimate_id)
            .fetch_optional(&self.pool)
            .await?;

        match exists {
            None => Err(DatabaseError::not_found("Estimate", estimate_id)),
            Some(_) => Err(DatabaseError::Locked(format!(
                "estimate '{}' is already submitted or not in a submittable status",
                estimate_id
            ))),
        }
    }

    /// Active catalog definitions ordered by code
    pub async fn get_catalog(&self) -> Result<Vec<LineItemDefinition>, DatabaseError> {
        let definitions = sqlx::query_scalar::<_, Json<LineItemDefinition>>(
            "SELECT definition FROM catalog_items WHERE is_active = TRUE ORDER BY code",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(definitions.into_iter().map(|Json(definition)| definition).collect())
    }

    pub async fn upsert_catalog_item(&self, definition: &LineItemDefinition) -> Result<(), DatabaseError> {
        sqlx::query(
            r#"
            INSERT INTO catalog_items (code, definition, is_active, updated_at)
            VALUES ($1, $2, TRUE, NOW())
            ON CONFLICT (code) DO UPDATE SET
                definition = EXCLUDED.definition,
                is_active = TRUE,
                updated_at = NOW()
            "#,
        )
        .bind(&definition.code)
        .bind(Json(definition))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn get_carrier_profile(&self, carrier_id: Uuid) -> Result<CarrierProfileRow, DatabaseError> {
        sqlx::query_as::<_, CarrierProfileRow>(
            r#"
            SELECT carrier_id, name, overhead_pct, profit_pct, op_trade_minimum, op_threshold, tax_materials_only
            FROM carrier_profiles
            WHERE carrier_id = $1
            "#,
        )
        .bind(carrier_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DatabaseError::not_found("CarrierProfile", carrier_id))
    }

    pub async fn insert_carrier_profile(&self, profile: &CarrierProfile) -> Result<(), DatabaseError> {
        let op_trade_minimum = i32::try_from(profile.op_trade_minimum)
            .map_err(|e| DatabaseError::serialization("op_trade_minimum", e))?;

        sqlx::query(
            r#"
            INSERT INTO carrier_profiles (
                carrier_id, name, overhead_pct, profit_pct, op_trade_minimum, op_threshold, tax_materials_only
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(Uuid::from(profile.id))
        .bind(&profile.name)
        .bind(profile.overhead_pct.as_decimal())
        .bind(profile.profit_pct.as_decimal())
        .bind(op_trade_minimum)
        .bind(profile.op_threshold)
        .bind(profile.tax_materials_only)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn get_jurisdiction_profile(
        &self,
        jurisdiction_id: Uuid,
    ) -> Result<JurisdictionProfileRow, DatabaseError> {
        sqlx::query_as::<_, JurisdictionProfileRow>(
            r#"
            SELECT jurisdiction_id, name, tax_rate, labor_taxable, op_threshold_override
            FROM jurisdiction_profiles
            WHERE jurisdiction_id = $1
            "#,
        )
        .bind(jurisdiction_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DatabaseError::not_found("JurisdictionProfile", jurisdiction_id))
    }

    pub async fn insert_jurisdiction_profile(&self, profile: &JurisdictionProfile) -> Result<(), DatabaseError> {
        sqlx::query(
            r#"
            INSERT INTO jurisdiction_profiles (jurisdiction_id, name, tax_rate, labor_taxable, op_threshold_override)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(Uuid::from(profile.id))
        .bind(&profile.name)
        .bind(profile.tax_rate.as_decimal())
        .bind(profile.labor_taxable)
        .bind(profile.op_threshold_override)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Rule, cap and exclusion rows of one owner in declaration order
    pub async fn get_rule_rows(&self, owner: RuleOwner) -> Result<RuleRows, DatabaseError> {
        let column = owner.owner_column();

        let rules = sqlx::query_as::<_, CarrierRuleRow>(&format!(
            r#"
            SELECT rule_id, name, source, priority, target_code, category_prefix, conditions, effect, is_active
            FROM carrier_rules
            WHERE {} = $1
            ORDER BY declared_order
            "#,
            column
        ))
        .bind(owner.id())
        .fetch_all(&self.pool)
        .await?;

        let caps = sqlx::query_as::<_, CarrierCapRow>(&format!(
            r#"
            SELECT cap_id, name, source, priority, target_code, category_prefix,
                   max_quantity, max_quantity_per_zone, max_unit_price
            FROM carrier_caps
            WHERE {} = $1
            ORDER BY declared_order
            "#,
            column
        ))
        .bind(owner.id())
        .fetch_all(&self.pool)
        .await?;

        let exclusions = sqlx::query_as::<_, CarrierExclusionRow>(&format!(
            r#"
            SELECT exclusion_id, code, reason, source
            FROM carrier_exclusions
            WHERE {} = $1
            ORDER BY declared_order
            "#,
            column
        ))
        .bind(owner.id())
        .fetch_all(&self.pool)
        .await?;

        debug!(
            owner = column,
            rules = rules.len(),
            caps = caps.len(),
            exclusions = exclusions.len(),
            "Loaded rule rows"
        );

        Ok(RuleRows { rules, caps, exclusions })
    }

    /// Inserts rule rows for an owner, preserving the order they are given in
    pub async fn insert_rule_sources(&self, owner: RuleOwner, sources: &RuleSources) -> Result<(), DatabaseError> {
        let (carrier_id, jurisdiction_id) = owner.columns();
        let mut tx = self.pool.begin().await?;

        for rule in &sources.rules {
            insert_rule(&mut tx, carrier_id, jurisdiction_id, rule).await?;
        }
        for cap in &sources.caps {
            insert_cap(&mut tx, carrier_id, jurisdiction_id, cap).await?;
        }
        for exclusion in &sources.exclusions {
            insert_exclusion(&mut tx, carrier_id, jurisdiction_id, exclusion).await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Appends audit entries in one transaction
    pub async fn append_audit_entries(&self, entries: &[AuditEntry]) -> Result<(), DatabaseError> {
        let mut tx = self.pool.begin().await?;

        for entry in entries {
            let sequence = i64::try_from(entry.sequence)
                .map_err(|e| DatabaseError::serialization("audit sequence", e))?;

            sqlx::query(
                r#"
                INSERT INTO rule_audit_entries (
                    audit_entry_id, estimate_id, sequence, line_item_id, line_item_code, rule_id,
                    rule_source, effect_type, original_value, modified_value, explanation, recorded_at
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
                "#,
            )
            .bind(Uuid::from(entry.id))
            .bind(Uuid::from(entry.estimate_id))
            .bind(sequence)
            .bind(Uuid::from(entry.line_item_id))
            .bind(&entry.line_item_code)
            .bind(Uuid::from(entry.rule_id))
            .bind(entry.rule_source.label().to_ascii_lowercase())
            .bind(entry.effect_type.as_str())
            .bind(&entry.original_value)
            .bind(&entry.modified_value)
            .bind(&entry.explanation)
            .bind(entry.recorded_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Audit rows recorded for an estimate, oldest pass first
    pub async fn get_audit_entries(&self, estimate_id: Uuid) -> Result<Vec<AuditEntryRow>, DatabaseError> {
        let rows = sqlx::query_as::<_, AuditEntryRow>(
            r#"
            SELECT audit_entry_id, estimate_id, sequence, line_item_code, rule_id,
                   rule_source, effect_type, explanation, recorded_at
            FROM rule_audit_entries
            WHERE estimate_id = $1
            ORDER BY recorded_at, sequence
            "#,
        )
        .bind(estimate_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}

fn sort_order(index: usize) -> Result<i32, DatabaseError> {
    i32::try_from(index).map_err(|e| DatabaseError::serialization("sort order", e))
}

async fn insert_rule(
    tx: &mut Transaction<'_, Postgres>,
    carrier_id: Option<Uuid>,
    jurisdiction_id: Option<Uuid>,
    rule: &CarrierRuleRecord,
) -> Result<(), DatabaseError> {
    sqlx::query(
        r#"
        INSERT INTO carrier_rules (
            rule_id, carrier_id, jurisdiction_id, name, source, priority,
            target_code, category_prefix, conditions, effect, is_active
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        "#,
    )
    .bind(Uuid::from(rule.id))
    .bind(carrier_id)
    .bind(jurisdiction_id)
    .bind(&rule.name)
    .bind(&rule.source)
    .bind(rule.priority)
    .bind(&rule.target_code)
    .bind(&rule.category_prefix)
    .bind(&rule.conditions)
    .bind(&rule.effect)
    .bind(rule.is_active)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

async fn insert_cap(
    tx: &mut Transaction<'_, Postgres>,
    carrier_id: Option<Uuid>,
    jurisdiction_id: Option<Uuid>,
    cap: &CarrierCap,
) -> Result<(), DatabaseError> {
    sqlx::query(
        r#"
        INSERT INTO carrier_caps (
            cap_id, carrier_id, jurisdiction_id, name, source, priority, target_code,
            category_prefix, max_quantity, max_quantity_per_zone, max_unit_price
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        "#,
    )
    .bind(Uuid::from(cap.id))
    .bind(carrier_id)
    .bind(jurisdiction_id)
    .bind(&cap.name)
    .bind(cap.source.label().to_ascii_lowercase())
    .bind(cap.priority)
    .bind(&cap.target_code)
    .bind(&cap.category_prefix)
    .bind(cap.max_quantity)
    .bind(cap.max_quantity_per_zone)
    .bind(cap.max_unit_price)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

async fn insert_exclusion(
    tx: &mut Transaction<'_, Postgres>,
    carrier_id: Option<Uuid>,
    jurisdiction_id: Option<Uuid>,
    exclusion: &CarrierExclusion,
) -> Result<(), DatabaseError> {
    sqlx::query(
        r#"
        INSERT INTO carrier_exclusions (exclusion_id, carrier_id, jurisdiction_id, code, reason, source)
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(Uuid::from(exclusion.id))
    .bind(carrier_id)
    .bind(jurisdiction_id)
    .bind(&exclusion.code)
    .bind(&exclusion.reason)
    .bind(exclusion.source.label().to_ascii_lowercase())
    .execute(&mut **tx)
    .await?;
    Ok(())
}

// ============================================================================
// Row Types
// ============================================================================

/// Estimate header row
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct EstimateRow {
    pub estimate_id: Uuid,
    pub claim_number: String,
    pub carrier_id: Uuid,
    pub jurisdiction_id: Uuid,
    pub status: String,
    pub is_locked: bool,
    pub currency: String,
    pub deductibles: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub submitted_at: Option<DateTime<Utc>>,
}

/// Carrier profile row
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CarrierProfileRow {
    pub carrier_id: Uuid,
    pub name: String,
    pub overhead_pct: Decimal,
    pub profit_pct: Decimal,
    pub op_trade_minimum: i32,
    pub op_threshold: Decimal,
    pub tax_materials_only: bool,
}

/// Jurisdiction profile row
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct JurisdictionProfileRow {
    pub jurisdiction_id: Uuid,
    pub name: String,
    pub tax_rate: Decimal,
    pub labor_taxable: bool,
    pub op_threshold_override: Option<Decimal>,
}

/// Rule row with its free-form condition and effect payloads
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CarrierRuleRow {
    pub rule_id: Uuid,
    pub name: String,
    pub source: Option<String>,
    pub priority: i32,
    pub target_code: Option<String>,
    pub category_prefix: Option<String>,
    pub conditions: Value,
    pub effect: Value,
    pub is_active: bool,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CarrierCapRow {
    pub cap_id: Uuid,
    pub name: Option<String>,
    pub source: String,
    pub priority: i32,
    pub target_code: Option<String>,
    pub category_prefix: Option<String>,
    pub max_quantity: Option<Decimal>,
    pub max_quantity_per_zone: Option<Decimal>,
    pub max_unit_price: Option<Decimal>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CarrierExclusionRow {
    pub exclusion_id: Uuid,
    pub code: String,
    pub reason: Option<String>,
    pub source: String,
}

/// Summary view of an audit row
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AuditEntryRow {
    pub audit_entry_id: Uuid,
    pub estimate_id: Uuid,
    pub sequence: i64,
    pub line_item_code: String,
    pub rule_id: Uuid,
    pub rule_source: String,
    pub effect_type: String,
    pub explanation: String,
    pub recorded_at: DateTime<Utc>,
}

/// All rule rows of one owner
#[derive(Debug, Clone, Default)]
pub struct RuleRows {
    pub rules: Vec<CarrierRuleRow>,
    pub caps: Vec<CarrierCapRow>,
    pub exclusions: Vec<CarrierExclusionRow>,
}
