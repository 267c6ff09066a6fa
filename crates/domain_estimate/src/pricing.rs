//! Line item pricing
//!
//! Material is extended with the catalog waste factor; labor and equipment
//! are extended by quantity. A subtotal below the minimum charge is raised to
//! it, with the difference carried as labor.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use core_kernel::{Currency, Money};

use crate::catalog::LineItemDefinition;

/// Cost breakdown for one line item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItemPricing {
    pub quantity: Decimal,
    /// Per-unit material cost including waste
    pub unit_material: Decimal,
    pub unit_labor: Decimal,
    pub unit_equipment: Decimal,
    /// Sum of the per-unit components
    pub unit_price: Decimal,
    pub material: Money,
    pub labor: Money,
    pub equipment: Money,
    /// Quantity × unit price
    pub extended: Money,
    pub minimum_charge: Option<Money>,
    pub minimum_applied: bool,
    pub subtotal: Money,
}

impl LineItemPricing {
    fn build(
        quantity: Decimal,
        unit_material: Decimal,
        unit_labor: Decimal,
        unit_equipment: Decimal,
        minimum_charge: Option<Decimal>,
        currency: Currency,
    ) -> Self {
        let material = Money::new(quantity * unit_material, currency).round_to_currency();
        let mut labor = Money::new(quantity * unit_labor, currency).round_to_currency();
        let equipment = Money::new(quantity * unit_equipment, currency).round_to_currency();
        let extended = Money::new(material.amount() + labor.amount() + equipment.amount(), currency);

        let minimum_charge = minimum_charge.map(|m| Money::new(m, currency).round_to_currency());
        let shortfall = minimum_charge
            .map(|m| m.amount() - extended.amount())
            .filter(|gap| *gap > Decimal::ZERO && quantity > Decimal::ZERO);

        let (subtotal, minimum_applied) = match shortfall {
            Some(gap) => {
                labor = Money::new(labor.amount() + gap, currency);
                (Money::new(extended.amount() + gap, currency), true)
            }
            None => (extended, false),
        };

        Self {
            quantity,
            unit_material,
            unit_labor,
            unit_equipment,
            unit_price: unit_material + unit_labor + unit_equipment,
            material,
            labor,
            equipment,
            extended,
            minimum_charge,
            minimum_applied,
            subtotal,
        }
    }

    /// Reprices at a new quantity and unit price, keeping the component mix
    ///
    /// When the unit price changes, each component is scaled proportionally.
    pub fn reprice(&self, quantity: Decimal, unit_price: Decimal) -> Self {
        let scale = if self.unit_price.is_zero() || unit_price == self.unit_price {
            Decimal::ONE
        } else {
            unit_price / self.unit_price
        };
        Self::build(
            quantity,
            self.unit_material * scale,
            self.unit_labor * scale,
            self.unit_equipment * scale,
            self.minimum_charge.map(|m| m.amount()),
            self.subtotal.currency(),
        )
    }
}

/// Prices a quantity of a catalog item
///
/// A zero quantity prices to zero; the minimum charge only applies to work
/// that is actually performed.
pub fn price_line_item(definition: &LineItemDefinition, quantity: Decimal, currency: Currency) -> LineItemPricing {
    let costs = &definition.costs;
    LineItemPricing::build(
        quantity,
        costs.material * (Decimal::ONE + definition.waste_factor),
        costs.labor,
        costs.equipment,
        definition.minimum_charge,
        currency,
    )
}
