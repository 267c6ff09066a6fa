//! The estimate pipeline
//!
//! One strictly sequential pass over a single estimate:
//!
//! ```text
//! zone metrics -> quantities -> pricing/depreciation -> rules -> settlement
//!                                        \                 \
//!                                         +--- validation <-+
//! ```
//!
//! Structural validation sees the items as the estimator entered them; the
//! settlement is computed from the items after rules were applied.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

use core_kernel::{EstimateId, ZoneId};
use domain_estimate::{
    calculate_settlement, CalculatedLineItem, CarrierProfile, Catalog, Estimate, EstimateCalculator, EstimateError,
    JurisdictionProfile, SettlementSummary, ZoneMetrics,
};
use domain_rules::{evaluate_rules, EvaluationContext, RuleSources, RulesOutcome};

use crate::config::ValidatorConfig;
use crate::issue::ValidationResult;
use crate::validator::EstimateValidator;

/// Everything one pipeline pass produced
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineReport {
    pub estimate_id: EstimateId,
    pub evaluated_at: DateTime<Utc>,
    pub zone_metrics: BTreeMap<ZoneId, ZoneMetrics>,
    /// Recalculated items before rules were applied
    pub line_items: Vec<CalculatedLineItem>,
    pub rules: RulesOutcome,
    /// Items the settlement was computed from
    pub settled_items: Vec<CalculatedLineItem>,
    pub settlement: SettlementSummary,
    pub validation: ValidationResult,
}

/// Runs recalculation, rules, settlement and extended validation
pub struct EstimatePipeline<'a> {
    catalog: &'a Catalog,
    config: &'a ValidatorConfig,
}

impl<'a> EstimatePipeline<'a> {
    pub fn new(catalog: &'a Catalog, config: &'a ValidatorConfig) -> Self {
        Self { catalog, config }
    }

    /// Runs one full pass
    ///
    /// # Errors
    ///
    /// Only workflow errors fail the pass: a line item code missing from the
    /// catalog, a reference to an unknown zone, or a settlement overflow. A
    /// broken rule configuration degrades to "no rules applied" instead.
    pub fn run(
        &self,
        estimate: &Estimate,
        sources: &RuleSources,
        carrier: &CarrierProfile,
        jurisdiction: &JurisdictionProfile,
        evaluated_at: DateTime<Utc>,
    ) -> Result<PipelineReport, EstimateError> {
        let recalculation = EstimateCalculator::new(self.catalog).recalculate(estimate)?;

        let context = EvaluationContext::from_estimate(estimate, evaluated_at);
        let rules = evaluate_rules(sources, &context, &recalculation.line_items);
        let settled_items = rules.apply_to(&recalculation.line_items);

        let settlement = calculate_settlement(
            &settled_items,
            carrier,
            jurisdiction,
            &estimate.deductibles,
            estimate.currency,
        )?;

        let validation = EstimateValidator::new(self.catalog, self.config).validate_extended(
            &recalculation.line_items,
            &recalculation.zone_metrics,
            &rules,
        );

        debug!(
            estimate_id = %estimate.id,
            errors = validation.error_count,
            warnings = validation.warning_count,
            rules_evaluated = rules.rules_evaluated,
            "Pipeline pass complete"
        );

        Ok(PipelineReport {
            estimate_id: estimate.id,
            evaluated_at,
            zone_metrics: recalculation.zone_metrics,
            line_items: recalculation.line_items,
            rules,
            settled_items,
            settlement,
            validation,
        })
    }
}
