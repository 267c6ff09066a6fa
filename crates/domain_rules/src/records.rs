//! Raw rule rows and their normalisation
//!
//! Rule data is authored outside this core and arrives loosely typed: the
//! effect payload is free-form JSON. Rows are converted into [`CarrierRule`]s
//! with `TryFrom`, and any row that cannot be interpreted is reported as a
//! [`RuleError`] naming the offending rule.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use core_kernel::RuleId;

use crate::error::RuleError;
use crate::model::{CarrierRule, RuleConditions, RuleEffect, RuleSource, RuleTarget};

fn default_active() -> bool {
    true
}

/// A carrier or jurisdiction rule row as stored by the rule administration tool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CarrierRuleRecord {
    pub id: RuleId,
    pub name: String,
    /// `carrier` or `jurisdiction`; carrier when absent
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub priority: i32,
    #[serde(default)]
    pub target_code: Option<String>,
    #[serde(default)]
    pub category_prefix: Option<String>,
    /// `{"damage_types": [...], "water_categories": [...]}` or null
    #[serde(default)]
    pub conditions: Value,
    /// `{"type": "...", ...}`
    pub effect: Value,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

/// Per-code or per-category limits configured for a carrier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CarrierCap {
    pub id: RuleId,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub source: RuleSource,
    #[serde(default)]
    pub priority: i32,
    #[serde(default)]
    pub target_code: Option<String>,
    #[serde(default)]
    pub category_prefix: Option<String>,
    #[serde(default)]
    pub max_quantity: Option<Decimal>,
    #[serde(default)]
    pub max_quantity_per_zone: Option<Decimal>,
    #[serde(default)]
    pub max_unit_price: Option<Decimal>,
}

/// A catalog code the carrier does not pay for
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CarrierExclusion {
    pub id: RuleId,
    pub code: String,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub source: RuleSource,
}

/// Everything the rules engine is configured from for one carrier and jurisdiction
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuleSources {
    #[serde(default)]
    pub rules: Vec<CarrierRuleRecord>,
    #[serde(default)]
    pub caps: Vec<CarrierCap>,
    #[serde(default)]
    pub exclusions: Vec<CarrierExclusion>,
}

impl RuleSources {
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty() && self.caps.is_empty() && self.exclusions.is_empty()
    }

    /// Normalises every row, in declaration order: rules, then caps, then exclusions
    pub fn normalize(&self) -> Result<Vec<CarrierRule>, RuleError> {
        let mut normalized = Vec::with_capacity(self.rules.len() + self.caps.len() * 2 + self.exclusions.len());
        for record in &self.rules {
            normalized.push(CarrierRule::try_from(record)?);
        }
        for cap in &self.caps {
            normalized.extend(cap.to_rules()?);
        }
        for exclusion in &self.exclusions {
            normalized.push(exclusion.to_rule()?);
        }
        Ok(normalized)
    }
}

fn resolve_target(
    rule_id: RuleId,
    target_code: Option<&str>,
    category_prefix: Option<&str>,
) -> Result<RuleTarget, RuleError> {
    let non_empty = |value: Option<&str>| value.map(str::trim).filter(|v| !v.is_empty()).map(str::to_string);
    match (non_empty(target_code), non_empty(category_prefix)) {
        (Some(code), _) => Ok(RuleTarget::Code(code)),
        (None, Some(prefix)) => Ok(RuleTarget::CategoryPrefix(prefix)),
        (None, None) => Err(RuleError::MissingTarget(rule_id)),
    }
}

fn parse_effect(rule_id: RuleId, effect: &Value) -> Result<RuleEffect, RuleError> {
    let type_name = effect
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| RuleError::malformed(rule_id, "effect payload has no 'type'"))?;
    if !RuleEffect::TYPE_NAMES.contains(&type_name) {
        return Err(RuleError::UnknownEffect {
            rule_id,
            effect: type_name.to_string(),
        });
    }
    let parsed: RuleEffect = serde_json::from_value(effect.clone())
        .map_err(|e| RuleError::malformed(rule_id, format!("invalid {} payload: {}", type_name, e)))?;
    parsed.validate(rule_id)?;
    Ok(parsed)
}

impl TryFrom<&CarrierRuleRecord> for CarrierRule {
    type Error = RuleError;

    fn try_from(record: &CarrierRuleRecord) -> Result<Self, Self::Error> {
        let source = match record.source.as_deref() {
            None => RuleSource::Carrier,
            Some(value) => RuleSource::parse(value)
                .ok_or_else(|| RuleError::malformed(record.id, format!("unknown rule source '{}'", value)))?,
        };
        let conditions = match &record.conditions {
            Value::Null => RuleConditions::any(),
            value => serde_json::from_value(value.clone())
                .map_err(|e| RuleError::malformed(record.id, format!("invalid conditions: {}", e)))?,
        };

        Ok(CarrierRule {
            id: record.id,
            name: record.name.clone(),
            source,
            priority: record.priority,
            conditions,
            target: resolve_target(record.id, record.target_code.as_deref(), record.category_prefix.as_deref())?,
            effect: parse_effect(record.id, &record.effect)?,
            is_active: record.is_active,
        })
    }
}

impl TryFrom<CarrierRuleRecord> for CarrierRule {
    type Error = RuleError;

    fn try_from(record: CarrierRuleRecord) -> Result<Self, Self::Error> {
        CarrierRule::try_from(&record)
    }
}

impl CarrierCap {
    /// Splits the cap into a quantity rule and a unit price rule
    pub fn to_rules(&self) -> Result<Vec<CarrierRule>, RuleError> {
        let target = resolve_target(self.id, self.target_code.as_deref(), self.category_prefix.as_deref())?;
        let name = self.name.clone().unwrap_or_else(|| format!("Cap on {}", target));

        let mut effects = Vec::new();
        if self.max_quantity.is_some() || self.max_quantity_per_zone.is_some() {
            effects.push(RuleEffect::CapQuantity {
                max_quantity: self.max_quantity,
                max_quantity_per_zone: self.max_quantity_per_zone,
            });
        }
        if let Some(max_unit_price) = self.max_unit_price {
            effects.push(RuleEffect::CapCost { max_unit_price });
        }
        if effects.is_empty() {
            return Err(RuleError::invalid_limit(self.id, "cap row sets no limit"));
        }

        effects
            .into_iter()
            .map(|effect| {
                effect.validate(self.id)?;
                Ok(CarrierRule {
                    id: self.id,
                    name: name.clone(),
                    source: self.source,
                    priority: self.priority,
                    conditions: RuleConditions::any(),
                    target: target.clone(),
                    effect,
                    is_active: true,
                })
            })
            .collect()
    }
}

impl CarrierExclusion {
    pub fn to_rule(&self) -> Result<CarrierRule, RuleError> {
        let target = resolve_target(self.id, Some(&self.code), None)?;
        let name = match &self.reason {
            Some(reason) => format!("Excluded: {}", reason),
            None => format!("Excluded {}", target),
        };
        Ok(CarrierRule {
            id: self.id,
            name,
            source: self.source,
            priority: 0,
            conditions: RuleConditions::any(),
            target,
            effect: RuleEffect::Exclude,
            is_active: true,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain_estimate::{DamageType, WaterCategory};
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn record(effect: Value) -> CarrierRuleRecord {
        CarrierRuleRecord {
            id: RuleId::new(),
            name: "Test rule".to_string(),
            source: None,
            priority: 10,
            target_code: None,
            category_prefix: Some("WTR".to_string()),
            conditions: Value::Null,
            effect,
            is_active: true,
        }
    }

    #[test]
    fn test_normalise_documentation_rule() {
        let mut raw = record(json!({"type": "require_doc", "document_codes": ["moisture_map", "photos"]}));
        raw.source = Some("jurisdiction".to_string());
        raw.conditions = json!({"damage_types": ["water"], "water_categories": [3]});

        let rule = CarrierRule::try_from(&raw).unwrap();
        assert_eq!(rule.source, RuleSource::Jurisdiction);
        assert_eq!(rule.target, RuleTarget::CategoryPrefix("WTR".to_string()));
        assert_eq!(rule.conditions.damage_types, vec![DamageType::Water]);
        assert_eq!(rule.conditions.water_categories, vec![WaterCategory::Category3]);
    }

    #[test]
    fn test_unknown_effect_type() {
        let raw = record(json!({"type": "teleport"}));
        assert!(matches!(
            CarrierRule::try_from(&raw),
            Err(RuleError::UnknownEffect { effect, .. }) if effect == "teleport"
        ));
    }

    #[test]
    fn test_malformed_payload() {
        let raw = record(json!({"type": "cap_cost", "max_unit_price": "a lot"}));
        assert!(matches!(CarrierRule::try_from(&raw), Err(RuleError::MalformedRecord { .. })));

        let raw = record(json!("exclude"));
        assert!(matches!(CarrierRule::try_from(&raw), Err(RuleError::MalformedRecord { .. })));
    }

    #[test]
    fn test_missing_target() {
        let mut raw = record(json!({"type": "exclude"}));
        raw.category_prefix = Some("   ".to_string());
        assert!(matches!(CarrierRule::try_from(&raw), Err(RuleError::MissingTarget(_))));
    }

    #[test]
    fn test_cap_splits_into_two_rules() {
        let cap = CarrierCap {
            id: RuleId::new(),
            name: None,
            source: RuleSource::Carrier,
            priority: 5,
            target_code: Some("RFG-240".to_string()),
            category_prefix: None,
            max_quantity: Some(dec!(30)),
            max_quantity_per_zone: None,
            max_unit_price: Some(dec!(225)),
        };
        let rules = cap.to_rules().unwrap();
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[0].name, "Cap on code RFG-240");
        assert!(matches!(rules[1].effect, RuleEffect::CapCost { .. }));
    }

    #[test]
    fn test_normalize_keeps_declaration_order() {
        let sources = RuleSources {
            rules: vec![record(json!({"type": "exclude"}))],
            caps: Vec::new(),
            exclusions: vec![CarrierExclusion {
                id: RuleId::new(),
                code: "CLN-MOLD".to_string(),
                reason: Some("mold sublimit".to_string()),
                source: RuleSource::Carrier,
            }],
        };
        let rules = sources.normalize().unwrap();
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[1].name, "Excluded: mold sublimit");
    }
}
