//! Estimate line items
//!
//! [`EstimateLineItem`] is what the adjuster enters; [`CalculatedLineItem`]
//! is the priced, depreciated record produced by recalculation and handed to
//! persistence.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use core_kernel::{LineItemId, Money, ZoneId};

use crate::catalog::Unit;
use crate::coverage::CoverageCode;
use crate::depreciation::{DepreciationResult, DepreciationType, ItemCondition};
use crate::pricing::LineItemPricing;
use crate::zone::{DamageType, WaterCategory};

/// A catalog item placed on an estimate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EstimateLineItem {
    pub id: LineItemId,
    /// Catalog code
    pub code: String,
    #[serde(default)]
    pub zone_id: Option<ZoneId>,
    /// Entered quantity; when absent the catalog formula is used
    #[serde(default)]
    pub quantity: Option<Decimal>,
    #[serde(default)]
    pub age_years: Option<Decimal>,
    #[serde(default)]
    pub condition: Option<ItemCondition>,
    #[serde(default)]
    pub coverage_code: Option<CoverageCode>,
    /// Manually entered depreciation percentage
    #[serde(default)]
    pub depreciation_pct: Option<Decimal>,
    /// Justification for a manual depreciation percentage
    #[serde(default)]
    pub depreciation_reason: Option<String>,
    #[serde(default)]
    pub damage_type: Option<DamageType>,
    #[serde(default)]
    pub water_category: Option<WaterCategory>,
    #[serde(default)]
    pub notes: Option<String>,
    /// Added by catalog auto-add expansion rather than by the adjuster
    #[serde(default)]
    pub auto_added: bool,
}

impl EstimateLineItem {
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            id: LineItemId::new(),
            code: code.into(),
            zone_id: None,
            quantity: None,
            age_years: None,
            condition: None,
            coverage_code: None,
            depreciation_pct: None,
            depreciation_reason: None,
            damage_type: None,
            water_category: None,
            notes: None,
            auto_added: false,
        }
    }

    pub fn in_zone(mut self, zone_id: ZoneId) -> Self {
        self.zone_id = Some(zone_id);
        self
    }

    pub fn with_quantity(mut self, quantity: Decimal) -> Self {
        self.quantity = Some(quantity);
        self
    }

    pub fn with_age(mut self, age_years: Decimal, condition: Option<ItemCondition>) -> Self {
        self.age_years = Some(age_years);
        self.condition = condition;
        self
    }

    pub fn with_coverage(mut self, coverage_code: CoverageCode) -> Self {
        self.coverage_code = Some(coverage_code);
        self
    }

    pub fn with_depreciation(mut self, pct: Decimal, reason: Option<String>) -> Self {
        self.depreciation_pct = Some(pct);
        self.depreciation_reason = reason;
        self
    }

    pub fn with_damage(mut self, damage_type: DamageType, water_category: Option<WaterCategory>) -> Self {
        self.damage_type = Some(damage_type);
        self.water_category = water_category;
        self
    }
}

/// Where a calculated quantity came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuantitySource {
    /// Entered on the line item
    Explicit,
    /// Resolved from the catalog quantity formula
    Formula,
    /// Auto-added item without a formula (one unit)
    Default,
    /// No quantity could be determined
    Missing,
}

/// A priced and depreciated line item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalculatedLineItem {
    pub id: LineItemId,
    pub code: String,
    pub description: String,
    pub category_code: String,
    pub trade_code: String,
    pub unit: Unit,
    pub zone_id: Option<ZoneId>,
    pub quantity: Decimal,
    pub quantity_source: QuantitySource,
    /// Explanation from the formula engine when the quantity was derived
    pub quantity_explanation: Option<String>,
    pub formula_warnings: Vec<String>,
    /// Structural formula failure; the quantity is zero when set
    pub formula_error: Option<String>,
    pub pricing: LineItemPricing,
    pub rcv: Money,
    pub depreciation: DepreciationResult,
    pub acv: Money,
    pub depreciation_type: DepreciationType,
    pub age_years: Option<Decimal>,
    pub condition: Option<ItemCondition>,
    /// Manual percentage carried over from the entered item
    pub manual_depreciation_pct: Option<Decimal>,
    pub depreciation_reason: Option<String>,
    /// Coverage after falling back to the catalog default
    pub coverage_code: Option<CoverageCode>,
    pub damage_type: Option<DamageType>,
    pub water_category: Option<WaterCategory>,
    pub auto_added: bool,
}

impl CalculatedLineItem {
    /// Coverage the item is settled under
    pub fn settlement_coverage(&self) -> CoverageCode {
        self.coverage_code.unwrap_or_default()
    }

    /// Unit price including waste, before any minimum charge
    pub fn unit_price(&self) -> Decimal {
        self.pricing.unit_price
    }

    /// Returns a copy repriced at a new quantity and/or unit price
    ///
    /// Used when a carrier rule clamps or adjusts the item. The depreciation
    /// percentage is preserved and re-applied to the new replacement cost.
    pub fn adjusted(&self, quantity: Decimal, unit_price: Decimal) -> Self {
        let pricing = self.pricing.reprice(quantity, unit_price);
        let rcv = pricing.subtotal;
        let depreciation = self.depreciation.rebase(rcv);
        Self {
            quantity,
            acv: depreciation.acv,
            rcv,
            pricing,
            depreciation,
            ..self.clone()
        }
    }
}
