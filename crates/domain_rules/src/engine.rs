//! Carrier and jurisdiction rules engine
//!
//! Each line item moves through three stages against the rules that target
//! it and whose peril conditions match:
//!
//! ```text
//! exclusion --(denied, terminal)
//!     |
//!    cap  --(quantity / price clamped: modified)
//!     |
//! documentation --(documents required: at least warning)
//! ```
//!
//! Rules are applied in ascending priority; rules sharing a priority keep
//! their declaration order. Every change is recorded as an [`AppliedRule`]
//! and mirrored into the [`AuditLog`].

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use tracing::{debug, error, warn};

use core_kernel::{EstimateId, LineItemId, ZoneId};
use domain_estimate::{CalculatedLineItem, DamageType, Estimate, WaterCategory};

use crate::audit::{AppliedRule, AuditLog};
use crate::error::RuleError;
use crate::model::{CarrierRule, EffectType, RuleEffect};
use crate::records::RuleSources;

/// Outcome state of a line item after rule evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleStatus {
    Allowed,
    Warning,
    Modified,
    Denied,
}

impl RuleStatus {
    fn rank(&self) -> u8 {
        match self {
            RuleStatus::Allowed => 0,
            RuleStatus::Warning => 1,
            RuleStatus::Modified => 2,
            RuleStatus::Denied => 3,
        }
    }

    /// Moves to `other` only if it is more severe
    fn raise(self, other: RuleStatus) -> RuleStatus {
        if other.rank() > self.rank() {
            other
        } else {
            self
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RuleStatus::Allowed => "allowed",
            RuleStatus::Warning => "warning",
            RuleStatus::Modified => "modified",
            RuleStatus::Denied => "denied",
        }
    }
}

impl fmt::Display for RuleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Peril recorded on a zone, used when an item has none of its own
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneConditions {
    pub damage_type: Option<DamageType>,
    pub water_category: Option<WaterCategory>,
}

/// Inputs shared by every item in one evaluation pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvaluationContext {
    pub estimate_id: EstimateId,
    /// Stamped on every audit entry; supplied by the caller so passes are reproducible
    pub evaluated_at: DateTime<Utc>,
    pub zones: BTreeMap<ZoneId, ZoneConditions>,
}

impl EvaluationContext {
    pub fn new(estimate_id: EstimateId, evaluated_at: DateTime<Utc>) -> Self {
        Self {
            estimate_id,
            evaluated_at,
            zones: BTreeMap::new(),
        }
    }

    pub fn from_estimate(estimate: &Estimate, evaluated_at: DateTime<Utc>) -> Self {
        let zones = estimate
            .zones
            .iter()
            .map(|z| {
                (
                    z.id,
                    ZoneConditions {
                        damage_type: z.damage_type,
                        water_category: z.water_category,
                    },
                )
            })
            .collect();
        Self {
            estimate_id: estimate.id,
            evaluated_at,
            zones,
        }
    }

    /// Item peril, falling back to the item's zone for each missing value
    fn conditions_for(&self, item: &CalculatedLineItem) -> (Option<DamageType>, Option<WaterCategory>) {
        let zone = item.zone_id.and_then(|id| self.zones.get(&id)).copied().unwrap_or_default();
        (
            item.damage_type.or(zone.damage_type),
            item.water_category.or(zone.water_category),
        )
    }
}

/// Rule evaluation result for one line item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItemRuleResult {
    pub line_item_id: LineItemId,
    pub code: String,
    pub zone_id: Option<ZoneId>,
    pub status: RuleStatus,
    pub original_quantity: Decimal,
    pub adjusted_quantity: Decimal,
    pub original_unit_price: Decimal,
    pub adjusted_unit_price: Decimal,
    pub applied_rules: Vec<AppliedRule>,
    pub required_documents: Vec<String>,
}

impl LineItemRuleResult {
    fn unchanged(item: &CalculatedLineItem) -> Self {
        Self {
            line_item_id: item.id,
            code: item.code.clone(),
            zone_id: item.zone_id,
            status: RuleStatus::Allowed,
            original_quantity: item.quantity,
            adjusted_quantity: item.quantity,
            original_unit_price: item.unit_price(),
            adjusted_unit_price: item.unit_price(),
            applied_rules: Vec::new(),
            required_documents: Vec::new(),
        }
    }

    pub fn is_denied(&self) -> bool {
        self.status == RuleStatus::Denied
    }

    fn apply(&mut self, rule: &CarrierRule, original: Value, modified: Value, explanation: String) {
        self.applied_rules.push(AppliedRule {
            rule_id: rule.id,
            rule_name: rule.name.clone(),
            rule_source: rule.source,
            effect_type: rule.effect.effect_type(),
            original_value: original,
            modified_value: modified,
            explanation,
        });
    }
}

/// Result of one rules pass over an estimate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RulesOutcome {
    pub estimate_id: EstimateId,
    pub evaluated_at: DateTime<Utc>,
    pub results: Vec<LineItemRuleResult>,
    pub audit_log: AuditLog,
    /// Active rules considered in the pass
    pub rules_evaluated: usize,
    /// Set when the pass fell back to "no rules applied"
    pub degraded: Option<String>,
}

impl RulesOutcome {
    /// An outcome in which every item is allowed unchanged
    pub fn unapplied(context: &EvaluationContext, items: &[CalculatedLineItem], degraded: Option<String>) -> Self {
        Self {
            estimate_id: context.estimate_id,
            evaluated_at: context.evaluated_at,
            results: items.iter().map(LineItemRuleResult::unchanged).collect(),
            audit_log: AuditLog::new(context.estimate_id, context.evaluated_at),
            rules_evaluated: 0,
            degraded,
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.degraded.is_some()
    }

    pub fn result_for(&self, line_item_id: LineItemId) -> Option<&LineItemRuleResult> {
        self.results.iter().find(|r| r.line_item_id == line_item_id)
    }

    pub fn with_status(&self, status: RuleStatus) -> impl Iterator<Item = &LineItemRuleResult> {
        self.results.iter().filter(move |r| r.status == status)
    }

    pub fn requiring_documentation(&self) -> impl Iterator<Item = &LineItemRuleResult> {
        self.results.iter().filter(|r| !r.required_documents.is_empty())
    }

    /// Applies the outcome to the priced items
    ///
    /// Denied items are dropped; clamped or adjusted items are repriced.
    pub fn apply_to(&self, items: &[CalculatedLineItem]) -> Vec<CalculatedLineItem> {
        let by_id: HashMap<LineItemId, &LineItemRuleResult> =
            self.results.iter().map(|r| (r.line_item_id, r)).collect();

        items
            .iter()
            .filter_map(|item| match by_id.get(&item.id) {
                Some(result) if result.is_denied() => None,
                Some(result)
                    if result.adjusted_quantity != item.quantity
                        || result.adjusted_unit_price != item.unit_price() =>
                {
                    Some(item.adjusted(result.adjusted_quantity, result.adjusted_unit_price))
                }
                _ => Some(item.clone()),
            })
            .collect()
    }
}

/// Priority-ordered set of active rules
#[derive(Debug, Clone, Default)]
pub struct RulesEngine {
    rules: Vec<CarrierRule>,
}

impl RulesEngine {
    /// Keeps active rules, stably sorted by ascending priority
    pub fn new(rules: Vec<CarrierRule>) -> Self {
        let mut rules: Vec<CarrierRule> = rules.into_iter().filter(|r| r.is_active).collect();
        rules.sort_by_key(|r| r.priority);
        Self { rules }
    }

    /// Normalises raw rule rows into an engine
    pub fn from_sources(sources: &RuleSources) -> Result<Self, RuleError> {
        Ok(Self::new(sources.normalize()?))
    }

    pub fn rules(&self) -> &[CarrierRule] {
        &self.rules
    }

    /// Runs every item through the exclusion, cap and documentation stages
    pub fn evaluate(
        &self,
        context: &EvaluationContext,
        items: &[CalculatedLineItem],
    ) -> Result<RulesOutcome, RuleError> {
        let mut audit_log = AuditLog::new(context.estimate_id, context.evaluated_at);
        let mut zone_usage: HashMap<(ZoneId, String), Decimal> = HashMap::new();
        let mut results = Vec::with_capacity(items.len());

        for item in items {
            let (damage_type, water_category) = context.conditions_for(item);
            let applicable: Vec<&CarrierRule> = self
                .rules
                .iter()
                .filter(|r| r.target.matches(item) && r.conditions.matches(damage_type, water_category))
                .collect();

            let mut result = LineItemRuleResult::unchanged(item);

            if let Some(rule) = applicable.iter().find(|r| r.effect == RuleEffect::Exclude) {
                result.apply(
                    rule,
                    Value::String(RuleStatus::Allowed.to_string()),
                    Value::String(RuleStatus::Denied.to_string()),
                    format!("{} excluded by {}", item.code, rule.name),
                );
                result.status = RuleStatus::Denied;
            } else {
                cap_stage(&applicable, item, &mut result, &zone_usage)?;
                if let Some(zone_id) = item.zone_id {
                    *zone_usage.entry((zone_id, item.code.clone())).or_default() += result.adjusted_quantity;
                }
                documentation_stage(&applicable, &mut result);
            }

            for applied in &result.applied_rules {
                audit_log.record(item.id, &item.code, applied);
            }
            results.push(result);
        }

        debug!(
            estimate_id = %context.estimate_id,
            rules = self.rules.len(),
            items = items.len(),
            audit_entries = audit_log.len(),
            "Rules pass complete"
        );

        Ok(RulesOutcome {
            estimate_id: context.estimate_id,
            evaluated_at: context.evaluated_at,
            results,
            audit_log,
            rules_evaluated: self.rules.len(),
            degraded: None,
        })
    }
}

/// Rules of one effect kind, preferring exact-code targets over category prefixes
fn select<'r>(applicable: &[&'r CarrierRule], kind: EffectType) -> Vec<&'r CarrierRule> {
    let of_kind: Vec<&CarrierRule> = applicable
        .iter()
        .copied()
        .filter(|r| r.effect.effect_type() == kind)
        .collect();
    if of_kind.iter().any(|r| r.target.is_exact()) {
        of_kind.into_iter().filter(|r| r.target.is_exact()).collect()
    } else {
        of_kind
    }
}

fn cap_stage(
    applicable: &[&CarrierRule],
    item: &CalculatedLineItem,
    result: &mut LineItemRuleResult,
    zone_usage: &HashMap<(ZoneId, String), Decimal>,
) -> Result<(), RuleError> {
    for rule in select(applicable, EffectType::CapQuantity) {
        let RuleEffect::CapQuantity {
            max_quantity,
            max_quantity_per_zone,
        } = &rule.effect
        else {
            continue;
        };
        let mut limit = *max_quantity;
        if let (Some(per_zone), Some(zone_id)) = (max_quantity_per_zone, item.zone_id) {
            let used = zone_usage
                .get(&(zone_id, item.code.clone()))
                .copied()
                .unwrap_or_default();
            let remaining = (*per_zone - used).max(Decimal::ZERO);
            limit = Some(limit.map_or(remaining, |l| l.min(remaining)));
        }
        let Some(limit) = limit else { continue };
        if result.adjusted_quantity > limit {
            let original = result.adjusted_quantity;
            result.apply(
                rule,
                decimal_value(original),
                decimal_value(limit),
                format!(
                    "Quantity capped from {} to {} {} by {}",
                    original.normalize(),
                    limit.normalize(),
                    item.unit,
                    rule.name
                ),
            );
            result.adjusted_quantity = limit;
            result.status = result.status.raise(RuleStatus::Modified);
        }
    }

    for rule in select(applicable, EffectType::ModifyPct) {
        let RuleEffect::ModifyPct { percent } = &rule.effect else {
            continue;
        };
        if percent.is_zero() {
            continue;
        }
        let original = result.adjusted_unit_price;
        let adjusted = (Decimal::ONE + *percent / dec!(100))
            .checked_mul(original)
            .map(|p| p.round_dp(4))
            .ok_or_else(|| RuleError::Evaluation(format!("unit price overflow applying {}", rule.name)))?;
        result.apply(
            rule,
            decimal_value(original),
            decimal_value(adjusted),
            format!(
                "Unit price adjusted {}% from {:.2} to {:.2} by {}",
                percent.normalize(),
                original,
                adjusted,
                rule.name
            ),
        );
        result.adjusted_unit_price = adjusted;
        result.status = result.status.raise(RuleStatus::Modified);
    }

    for rule in select(applicable, EffectType::CapCost) {
        let RuleEffect::CapCost { max_unit_price } = &rule.effect else {
            continue;
        };
        if result.adjusted_unit_price > *max_unit_price {
            let original = result.adjusted_unit_price;
            result.apply(
                rule,
                decimal_value(original),
                decimal_value(*max_unit_price),
                format!(
                    "Unit price capped from {:.2} to {:.2} by {}",
                    original, max_unit_price, rule.name
                ),
            );
            result.adjusted_unit_price = *max_unit_price;
            result.status = result.status.raise(RuleStatus::Modified);
        }
    }

    Ok(())
}

fn documentation_stage(applicable: &[&CarrierRule], result: &mut LineItemRuleResult) {
    for rule in applicable {
        let RuleEffect::RequireDoc { document_codes } = &rule.effect else {
            continue;
        };
        let before = result.required_documents.clone();
        for code in document_codes.iter().map(|c| c.trim()).filter(|c| !c.is_empty()) {
            if !result.required_documents.iter().any(|d| d == code) {
                result.required_documents.push(code.to_string());
            }
        }
        if result.required_documents.len() == before.len() {
            continue;
        }
        let added: Vec<&str> = result.required_documents[before.len()..]
            .iter()
            .map(String::as_str)
            .collect();
        let explanation = format!("Documentation required: {} ({})", added.join(", "), rule.name);
        let modified = Value::from(result.required_documents.clone());
        result.apply(rule, Value::from(before), modified, explanation);
        result.status = result.status.raise(RuleStatus::Warning);
    }
}

fn decimal_value(value: Decimal) -> Value {
    Value::String(value.normalize().to_string())
}

/// Evaluates carrier and jurisdiction rules without ever failing the pass
///
/// A malformed rule row or an evaluation failure is logged and the estimate
/// proceeds as if no rules applied; the outcome is flagged as degraded.
pub fn evaluate_rules(
    sources: &RuleSources,
    context: &EvaluationContext,
    items: &[CalculatedLineItem],
) -> RulesOutcome {
    let evaluated = RulesEngine::from_sources(sources).and_then(|engine| engine.evaluate(context, items));
    match evaluated {
        Ok(outcome) => outcome,
        Err(err) => {
            error!(
                estimate_id = %context.estimate_id,
                rule_id = ?err.rule_id(),
                error = %err,
                "Rule evaluation failed"
            );
            warn!(
                estimate_id = %context.estimate_id,
                "Rules pass degraded; continuing with no rules applied"
            );
            RulesOutcome::unapplied(context, items, Some(err.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{RuleConditions, RuleSource, RuleTarget};
    use core_kernel::Currency;
    use domain_estimate::{Catalog, CostComponents, EstimateCalculator, EstimateLineItem, LineItemDefinition, Unit};

    fn priced(code: &str, category: &str, quantity: Decimal, unit_price: Decimal) -> CalculatedLineItem {
        let def = LineItemDefinition::new(
            code,
            "test",
            category,
            Unit::SF,
            CostComponents::new(Decimal::ZERO, unit_price, Decimal::ZERO),
            category,
        );
        let catalog: Catalog = vec![def].into();
        EstimateCalculator::new(&catalog)
            .calculate_item(&EstimateLineItem::new(code).with_quantity(quantity), None, Currency::USD)
            .unwrap()
    }

    fn context() -> EvaluationContext {
        EvaluationContext::new(EstimateId::new(), Utc::now())
    }

    #[test]
    fn test_exclusion_is_terminal() {
        let item = priced("CLN-MOLD", "CLN", dec!(100), dec!(2));
        let engine = RulesEngine::new(vec![
            CarrierRule::new(
                "Mold cap",
                RuleTarget::Code("CLN-MOLD".into()),
                RuleEffect::CapQuantity {
                    max_quantity: Some(dec!(10)),
                    max_quantity_per_zone: None,
                },
            ),
            CarrierRule::new("No mold", RuleTarget::Code("CLN-MOLD".into()), RuleEffect::Exclude).with_priority(50),
        ]);

        let outcome = engine.evaluate(&context(), &[item]).unwrap();
        let result = &outcome.results[0];
        assert_eq!(result.status, RuleStatus::Denied);
        assert_eq!(result.applied_rules.len(), 1);
        assert_eq!(result.adjusted_quantity, dec!(100));
        assert_eq!(outcome.audit_log.len(), 1);
    }

    #[test]
    fn test_quantity_and_price_caps_both_apply() {
        let item = priced("RFG-240", "RFG", dec!(40), dec!(300));
        let engine = RulesEngine::new(vec![
            CarrierRule::new(
                "Roof quantity",
                RuleTarget::Code("RFG-240".into()),
                RuleEffect::CapQuantity {
                    max_quantity: Some(dec!(30)),
                    max_quantity_per_zone: None,
                },
            ),
            CarrierRule::new(
                "Roof price",
                RuleTarget::CategoryPrefix("RF".into()),
                RuleEffect::CapCost {
                    max_unit_price: dec!(250),
                },
            ),
        ]);

        let outcome = engine.evaluate(&context(), &[item.clone()]).unwrap();
        let result = &outcome.results[0];
        assert_eq!(result.status, RuleStatus::Modified);
        assert_eq!(result.applied_rules.len(), 2);
        assert_eq!(result.adjusted_quantity, dec!(30));
        assert_eq!(result.adjusted_unit_price, dec!(250));

        let adjusted = outcome.apply_to(&[item]);
        assert_eq!(adjusted[0].rcv.amount(), dec!(7500));
    }

    #[test]
    fn test_exact_code_cap_beats_category_cap() {
        let item = priced("DRY-1/2", "DRY", dec!(500), dec!(1));
        let engine = RulesEngine::new(vec![
            CarrierRule::new(
                "Drywall category",
                RuleTarget::CategoryPrefix("DRY".into()),
                RuleEffect::CapQuantity {
                    max_quantity: Some(dec!(100)),
                    max_quantity_per_zone: None,
                },
            ),
            CarrierRule::new(
                "Half inch drywall",
                RuleTarget::Code("DRY-1/2".into()),
                RuleEffect::CapQuantity {
                    max_quantity: Some(dec!(400)),
                    max_quantity_per_zone: None,
                },
            ),
        ]);

        let outcome = engine.evaluate(&context(), &[item]).unwrap();
        assert_eq!(outcome.results[0].adjusted_quantity, dec!(400));
    }

    #[test]
    fn test_per_zone_cap_accumulates() {
        let zone = ZoneId::new();
        let mut first = priced("WTR-DEHU", "WTR", dec!(3), dec!(75));
        first.zone_id = Some(zone);
        let mut second = priced("WTR-DEHU", "WTR", dec!(3), dec!(75));
        second.zone_id = Some(zone);

        let engine = RulesEngine::new(vec![CarrierRule::new(
            "Dehumidifier days",
            RuleTarget::Code("WTR-DEHU".into()),
            RuleEffect::CapQuantity {
                max_quantity: None,
                max_quantity_per_zone: Some(dec!(4)),
            },
        )]);

        let outcome = engine.evaluate(&context(), &[first, second]).unwrap();
        assert_eq!(outcome.results[0].status, RuleStatus::Allowed);
        assert_eq!(outcome.results[1].adjusted_quantity, dec!(1));
    }

    #[test]
    fn test_documentation_uses_zone_peril_and_keeps_modified() {
        let zone = ZoneId::new();
        let mut item = priced("WTR-EXT", "WTR", dec!(200), dec!(1));
        item.zone_id = Some(zone);

        let mut context = context();
        context.zones.insert(
            zone,
            ZoneConditions {
                damage_type: Some(DamageType::Water),
                water_category: Some(WaterCategory::Category3),
            },
        );

        let engine = RulesEngine::new(vec![
            CarrierRule::new(
                "Cat 3 documentation",
                RuleTarget::CategoryPrefix("WTR".into()),
                RuleEffect::RequireDoc {
                    document_codes: vec!["moisture_map".into(), "photos".into()],
                },
            )
            .with_source(RuleSource::Jurisdiction)
            .with_conditions(RuleConditions {
                damage_types: vec![DamageType::Water],
                water_categories: vec![WaterCategory::Category3],
            }),
            CarrierRule::new(
                "Extraction cap",
                RuleTarget::Code("WTR-EXT".into()),
                RuleEffect::CapQuantity {
                    max_quantity: Some(dec!(150)),
                    max_quantity_per_zone: None,
                },
            ),
        ]);

        let outcome = engine.evaluate(&context, &[item]).unwrap();
        let result = &outcome.results[0];
        assert_eq!(result.status, RuleStatus::Modified);
        assert_eq!(result.required_documents, vec!["moisture_map", "photos"]);
        assert_eq!(outcome.audit_log.len(), 2);
    }

    #[test]
    fn test_documentation_raises_allowed_to_warning() {
        let item = priced("PNT-W", "PNT", dec!(10), dec!(1));
        let engine = RulesEngine::new(vec![CarrierRule::new(
            "Paint photos",
            RuleTarget::CategoryPrefix("PNT".into()),
            RuleEffect::RequireDoc {
                document_codes: vec!["photos".into()],
            },
        )]);
        let outcome = engine.evaluate(&context(), &[item]).unwrap();
        assert_eq!(outcome.results[0].status, RuleStatus::Warning);
    }

    #[test]
    fn test_modify_pct_then_cost_cap() {
        let item = priced("FNC-WD", "FNC", dec!(10), dec!(40));
        let engine = RulesEngine::new(vec![
            CarrierRule::new(
                "Fence cap",
                RuleTarget::Code("FNC-WD".into()),
                RuleEffect::CapCost {
                    max_unit_price: dec!(30),
                },
            ),
            CarrierRule::new(
                "Regional discount",
                RuleTarget::CategoryPrefix("FNC".into()),
                RuleEffect::ModifyPct { percent: dec!(-10) },
            ),
        ]);
        let outcome = engine.evaluate(&context(), &[item]).unwrap();
        let result = &outcome.results[0];
        assert_eq!(result.applied_rules.len(), 2);
        assert_eq!(result.applied_rules[0].effect_type, EffectType::ModifyPct);
        assert_eq!(result.adjusted_unit_price, dec!(30));
    }

    #[test]
    fn test_inactive_rules_skipped() {
        let mut rule = CarrierRule::new("Off", RuleTarget::Code("X".into()), RuleEffect::Exclude);
        rule.is_active = false;
        assert!(RulesEngine::new(vec![rule]).rules().is_empty());
    }
}
