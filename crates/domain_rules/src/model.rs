//! Normalised rule model
//!
//! Every carrier rule, cap and exclusion is reduced to a [`CarrierRule`]: a
//! predicate over the item's peril, a target, and exactly one typed effect.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;

use core_kernel::RuleId;
use domain_estimate::{CalculatedLineItem, DamageType, WaterCategory};

use crate::error::RuleError;

/// Who imposed a rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleSource {
    #[default]
    Carrier,
    Jurisdiction,
}

impl RuleSource {
    pub fn label(&self) -> &'static str {
        match self {
            RuleSource::Carrier => "Carrier",
            RuleSource::Jurisdiction => "Jurisdiction",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "carrier" => Some(RuleSource::Carrier),
            "jurisdiction" => Some(RuleSource::Jurisdiction),
            _ => None,
        }
    }
}

impl fmt::Display for RuleSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Peril predicates, ANDed across the keys that are present
///
/// An empty key list places no constraint; a rule with no keys matches every
/// item.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleConditions {
    #[serde(default, alias = "damage_type")]
    pub damage_types: Vec<DamageType>,
    #[serde(default, alias = "water_category")]
    pub water_categories: Vec<WaterCategory>,
}

impl RuleConditions {
    pub fn any() -> Self {
        Self::default()
    }

    pub fn is_unconditional(&self) -> bool {
        self.damage_types.is_empty() && self.water_categories.is_empty()
    }

    pub fn matches(&self, damage_type: Option<DamageType>, water_category: Option<WaterCategory>) -> bool {
        let damage_ok = self.damage_types.is_empty()
            || damage_type.map(|d| self.damage_types.contains(&d)).unwrap_or(false);
        let water_ok = self.water_categories.is_empty()
            || water_category
                .map(|w| self.water_categories.contains(&w))
                .unwrap_or(false);
        damage_ok && water_ok
    }
}

/// What a rule applies to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum RuleTarget {
    /// Exact catalog code
    Code(String),
    /// Every item whose category code starts with the prefix
    CategoryPrefix(String),
}

impl RuleTarget {
    pub fn matches(&self, item: &CalculatedLineItem) -> bool {
        match self {
            RuleTarget::Code(code) => item.code == *code,
            RuleTarget::CategoryPrefix(prefix) => item.category_code.starts_with(prefix.as_str()),
        }
    }

    pub fn is_exact(&self) -> bool {
        matches!(self, RuleTarget::Code(_))
    }
}

impl fmt::Display for RuleTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleTarget::Code(code) => write!(f, "code {}", code),
            RuleTarget::CategoryPrefix(prefix) => write!(f, "category {}*", prefix),
        }
    }
}

/// The change a rule makes, one variant per effect kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RuleEffect {
    /// Remove the item from the settlement
    Exclude,
    /// Limit the quantity per line and/or per zone
    CapQuantity {
        #[serde(default)]
        max_quantity: Option<Decimal>,
        #[serde(default)]
        max_quantity_per_zone: Option<Decimal>,
    },
    /// Limit the unit price
    CapCost { max_unit_price: Decimal },
    /// Require supporting documents
    RequireDoc { document_codes: Vec<String> },
    /// Adjust the unit price by a percentage (negative reduces)
    ModifyPct { percent: Decimal },
}

impl RuleEffect {
    pub const TYPE_NAMES: [&'static str; 5] = ["exclude", "cap_quantity", "cap_cost", "require_doc", "modify_pct"];

    pub fn effect_type(&self) -> EffectType {
        match self {
            RuleEffect::Exclude => EffectType::Exclude,
            RuleEffect::CapQuantity { .. } => EffectType::CapQuantity,
            RuleEffect::CapCost { .. } => EffectType::CapCost,
            RuleEffect::RequireDoc { .. } => EffectType::RequireDoc,
            RuleEffect::ModifyPct { .. } => EffectType::ModifyPct,
        }
    }

    /// Rejects limits that cannot be applied
    pub fn validate(&self, rule_id: RuleId) -> Result<(), RuleError> {
        match self {
            RuleEffect::Exclude => Ok(()),
            RuleEffect::CapQuantity {
                max_quantity,
                max_quantity_per_zone,
            } => {
                if max_quantity.is_none() && max_quantity_per_zone.is_none() {
                    return Err(RuleError::invalid_limit(rule_id, "quantity cap without any limit"));
                }
                if [max_quantity, max_quantity_per_zone]
                    .into_iter()
                    .flatten()
                    .any(|limit| limit.is_sign_negative())
                {
                    return Err(RuleError::invalid_limit(rule_id, "quantity limits must not be negative"));
                }
                Ok(())
            }
            RuleEffect::CapCost { max_unit_price } if max_unit_price.is_sign_negative() => {
                Err(RuleError::invalid_limit(rule_id, "maximum unit price must not be negative"))
            }
            RuleEffect::CapCost { .. } => Ok(()),
            RuleEffect::RequireDoc { document_codes } if document_codes.iter().all(|c| c.trim().is_empty()) => {
                Err(RuleError::invalid_limit(rule_id, "documentation rule lists no documents"))
            }
            RuleEffect::RequireDoc { .. } => Ok(()),
            RuleEffect::ModifyPct { percent } if *percent <= dec!(-100) => {
                Err(RuleError::invalid_limit(rule_id, "percentage adjustment must be greater than -100"))
            }
            RuleEffect::ModifyPct { .. } => Ok(()),
        }
    }
}

/// Flat effect discriminant carried on applied rules and audit entries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectType {
    Exclude,
    CapQuantity,
    CapCost,
    RequireDoc,
    ModifyPct,
}

impl EffectType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EffectType::Exclude => "exclude",
            EffectType::CapQuantity => "cap_quantity",
            EffectType::CapCost => "cap_cost",
            EffectType::RequireDoc => "require_doc",
            EffectType::ModifyPct => "modify_pct",
        }
    }
}

impl fmt::Display for EffectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A normalised, typed rule ready for evaluation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CarrierRule {
    pub id: RuleId,
    pub name: String,
    pub source: RuleSource,
    /// Lower runs first
    pub priority: i32,
    pub conditions: RuleConditions,
    pub target: RuleTarget,
    pub effect: RuleEffect,
    pub is_active: bool,
}

impl CarrierRule {
    pub fn new(name: impl Into<String>, target: RuleTarget, effect: RuleEffect) -> Self {
        Self {
            id: RuleId::new(),
            name: name.into(),
            source: RuleSource::Carrier,
            priority: 0,
            conditions: RuleConditions::any(),
            target,
            effect,
            is_active: true,
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_source(mut self, source: RuleSource) -> Self {
        self.source = source;
        self
    }

    pub fn with_conditions(mut self, conditions: RuleConditions) -> Self {
        self.conditions = conditions;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_conditions_and_across_keys() {
        let conditions = RuleConditions {
            damage_types: vec![DamageType::Water],
            water_categories: vec![WaterCategory::Category3],
        };
        assert!(conditions.matches(Some(DamageType::Water), Some(WaterCategory::Category3)));
        assert!(!conditions.matches(Some(DamageType::Water), Some(WaterCategory::Category1)));
        assert!(!conditions.matches(None, Some(WaterCategory::Category3)));
        assert!(RuleConditions::any().matches(None, None));
    }

    #[test]
    fn test_effect_wire_format() {
        let effect: RuleEffect = serde_json::from_value(json!({
            "type": "cap_quantity",
            "max_quantity": "300"
        }))
        .unwrap();
        assert_eq!(
            effect,
            RuleEffect::CapQuantity {
                max_quantity: Some(dec!(300)),
                max_quantity_per_zone: None
            }
        );
        assert_eq!(effect.effect_type(), EffectType::CapQuantity);
    }

    #[test]
    fn test_effect_validation() {
        let id = RuleId::new();
        let empty_cap = RuleEffect::CapQuantity {
            max_quantity: None,
            max_quantity_per_zone: None,
        };
        assert!(matches!(empty_cap.validate(id), Err(RuleError::InvalidLimit { .. })));
        assert!(RuleEffect::ModifyPct { percent: dec!(-100) }.validate(id).is_err());
        assert!(RuleEffect::ModifyPct { percent: dec!(-10) }.validate(id).is_ok());
        assert!(RuleEffect::RequireDoc { document_codes: vec![] }.validate(id).is_err());
    }
}
