//! Estimate recalculation
//!
//! Runs the first half of the pipeline for an estimate: zone metrics, auto-add
//! expansion, quantity resolution, pricing and depreciation. The output is the
//! list of [`CalculatedLineItem`]s that the rules engine and the validator
//! work from.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, warn};

use core_kernel::{Currency, LineItemId, ZoneId};

use crate::catalog::{Catalog, LineItemDefinition};
use crate::depreciation::{calculate_depreciation, DepreciationInput};
use crate::error::EstimateError;
use crate::estimate::Estimate;
use crate::formula::calculate_quantity_from_metrics;
use crate::line_item::{CalculatedLineItem, EstimateLineItem, QuantitySource};
use crate::metrics::ZoneMetrics;
use crate::pricing::price_line_item;

/// How an item's quantity was determined
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuantityResolution {
    pub quantity: Decimal,
    pub source: QuantitySource,
    pub explanation: Option<String>,
    pub warnings: Vec<String>,
    pub error: Option<String>,
}

impl QuantityResolution {
    fn fixed(quantity: Decimal, source: QuantitySource) -> Self {
        Self {
            quantity,
            source,
            explanation: None,
            warnings: Vec::new(),
            error: None,
        }
    }
}

/// Resolves the quantity for an item
///
/// An entered quantity always wins. Otherwise the catalog formula is
/// evaluated against the item's zone. Auto-added items without a formula
/// default to one unit.
pub fn resolve_quantity(
    item: &EstimateLineItem,
    definition: &LineItemDefinition,
    zone_metrics: Option<&ZoneMetrics>,
) -> QuantityResolution {
    if let Some(quantity) = item.quantity {
        return QuantityResolution::fixed(quantity, QuantitySource::Explicit);
    }

    match (definition.quantity_formula.as_deref(), zone_metrics) {
        (Some(formula), Some(metrics)) => match calculate_quantity_from_metrics(formula, metrics) {
            Ok(calculation) => QuantityResolution {
                quantity: calculation.quantity,
                source: QuantitySource::Formula,
                explanation: Some(calculation.explanation),
                warnings: calculation.warnings,
                error: None,
            },
            Err(err) => QuantityResolution {
                error: Some(format!("Formula '{}' failed: {}", formula, err)),
                ..QuantityResolution::fixed(Decimal::ZERO, QuantitySource::Missing)
            },
        },
        _ if item.auto_added => QuantityResolution::fixed(Decimal::ONE, QuantitySource::Default),
        _ => QuantityResolution::fixed(Decimal::ZERO, QuantitySource::Missing),
    }
}

/// Output of a recalculation pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recalculation {
    pub zone_metrics: BTreeMap<ZoneId, ZoneMetrics>,
    pub line_items: Vec<CalculatedLineItem>,
}

impl Recalculation {
    pub fn metrics_for(&self, zone_id: Option<ZoneId>) -> Option<&ZoneMetrics> {
        zone_id.and_then(|id| self.zone_metrics.get(&id))
    }
}

/// Prices and depreciates an estimate's line items against a catalog
pub struct EstimateCalculator<'a> {
    catalog: &'a Catalog,
}

impl<'a> EstimateCalculator<'a> {
    pub fn new(catalog: &'a Catalog) -> Self {
        Self { catalog }
    }

    /// Recalculates every line item
    ///
    /// Fails only for workflow errors: a code missing from the catalog or a
    /// reference to a zone the estimate does not have.
    pub fn recalculate(&self, estimate: &Estimate) -> Result<Recalculation, EstimateError> {
        let zone_metrics: BTreeMap<ZoneId, ZoneMetrics> =
            estimate.zones.iter().map(|z| (z.id, z.metrics())).collect();

        let items = self.expand_auto_adds(&estimate.line_items);
        let mut line_items = Vec::with_capacity(items.len());
        for item in &items {
            let metrics = match item.zone_id {
                Some(zone_id) => Some(
                    zone_metrics
                        .get(&zone_id)
                        .ok_or_else(|| EstimateError::ZoneNotFound(zone_id.to_string()))?,
                ),
                None => None,
            };
            line_items.push(self.calculate_item(item, metrics, estimate.currency)?);
        }

        debug!(
            estimate_id = %estimate.id,
            zones = zone_metrics.len(),
            line_items = line_items.len(),
            "Recalculated estimate"
        );

        Ok(Recalculation { zone_metrics, line_items })
    }

    /// Prices and depreciates a single item
    pub fn calculate_item(
        &self,
        item: &EstimateLineItem,
        zone_metrics: Option<&ZoneMetrics>,
        currency: Currency,
    ) -> Result<CalculatedLineItem, EstimateError> {
        let definition = self
            .catalog
            .get(&item.code)
            .ok_or_else(|| EstimateError::UnknownLineItemCode(item.code.clone()))?;

        let resolution = resolve_quantity(item, definition, zone_metrics);
        let pricing = price_line_item(definition, resolution.quantity, currency);
        let rcv = pricing.subtotal;
        let depreciation = calculate_depreciation(&DepreciationInput {
            category_code: &definition.category_code,
            depreciation_type: definition.depreciation_type,
            age_years: item.age_years,
            condition: item.condition,
            rcv,
            manual_pct: item.depreciation_pct,
        });

        Ok(CalculatedLineItem {
            id: item.id,
            code: item.code.clone(),
            description: definition.description.clone(),
            category_code: definition.category_code.clone(),
            trade_code: definition.trade_code.clone(),
            unit: definition.unit,
            zone_id: item.zone_id,
            quantity: resolution.quantity,
            quantity_source: resolution.source,
            quantity_explanation: resolution.explanation,
            formula_warnings: resolution.warnings,
            formula_error: resolution.error,
            pricing,
            rcv,
            acv: depreciation.acv,
            depreciation,
            depreciation_type: definition.depreciation_type,
            age_years: item.age_years,
            condition: item.condition,
            manual_depreciation_pct: item.depreciation_pct,
            depreciation_reason: item.depreciation_reason.clone(),
            coverage_code: item.coverage_code.or(definition.default_coverage_code),
            damage_type: item.damage_type,
            water_category: item.water_category,
            auto_added: item.auto_added,
        })
    }

    /// Appends catalog auto-add items that are not already in the same zone
    ///
    /// Expansion is one level deep; auto-added items do not trigger further
    /// additions.
    fn expand_auto_adds(&self, items: &[EstimateLineItem]) -> Vec<EstimateLineItem> {
        let mut present: HashSet<(Option<ZoneId>, String)> =
            items.iter().map(|i| (i.zone_id, i.code.clone())).collect();
        let mut expanded = items.to_vec();

        for item in items {
            let Some(definition) = self.catalog.get(&item.code) else {
                continue;
            };
            for code in &definition.auto_add_items {
                if !self.catalog.contains(code) {
                    warn!(parent = %item.code, code = %code, "Auto-add item missing from catalog, skipping");
                    continue;
                }
                if !present.insert((item.zone_id, code.clone())) {
                    continue;
                }
                let mut added = EstimateLineItem::new(code.clone());
                added.id = LineItemId::derived(item.id.as_uuid(), code);
                added.zone_id = item.zone_id;
                added.damage_type = item.damage_type;
                added.water_category = item.water_category;
                added.auto_added = true;
                expanded.push(added);
            }
        }

        expanded
    }
}
