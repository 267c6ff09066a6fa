//! Pre-built Test Fixtures
//!
//! Provides ready-to-use catalog rows, carrier configuration and zones. These
//! fixtures are consistent and predictable so that expected quantities and
//! totals can be worked out by hand.

use chrono::{DateTime, TimeZone, Utc};
use once_cell::sync::Lazy;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::json;

use core_kernel::{Rate, RuleId};
use domain_estimate::{
    CarrierProfile, Catalog, CostComponents, CoverageCode, DamageType, JurisdictionProfile, LineItemDefinition,
    Pitch, Unit, WaterCategory, Zone,
};
use domain_rules::{CarrierCap, CarrierExclusion, CarrierRuleRecord, RuleSource};

static STANDARD_CATALOG: Lazy<Catalog> = Lazy::new(|| {
    vec![
        CatalogFixtures::definition("DRY-1/2", "Drywall 1/2\" hung, ready for tape", "DRY", Unit::SF, dec!(0.55), dec!(1.20))
            .formula("WALL_SF(zone)")
            .requires(&["DRY-TAPE"])
            .excludes(&["DRY-PATCH"])
            .waste(dec!(0.10)),
        CatalogFixtures::definition("DRY-TAPE", "Tape, float and finish drywall", "DRY", Unit::SF, dec!(0.10), dec!(0.65))
            .formula("WALL_SF(zone)"),
        CatalogFixtures::definition("DRY-PATCH", "Drywall patch, small", "DRY", Unit::EA, dec!(5), dec!(45))
            .excludes(&["DRY-1/2"])
            .minimum(dec!(150)),
        CatalogFixtures::definition("PNT-W", "Paint walls, two coats", "PNT", Unit::SF, dec!(0.15), dec!(0.55))
            .formula("WALL_SF(zone)"),
        CatalogFixtures::definition("RFG-240", "Laminated comp shingle roofing", "RFG", Unit::SQ, dec!(150), dec!(100))
            .formula("ROOF_SF(zone) / 100")
            .waste(dec!(0.10)),
        CatalogFixtures::definition("RFG-FELT", "Roofing felt, 15 lb", "RFG", Unit::SQ, dec!(10), dec!(8))
            .formula("ROOF_SF(zone) / 100"),
        CatalogFixtures::definition("WTR-EXT", "Water extraction from floor", "WTR", Unit::SF, Decimal::ZERO, dec!(0.50))
            .equipment(dec!(0.25))
            .formula("FLOOR_SF(zone)")
            .auto_adds(&["WTR-DEHU"]),
        CatalogFixtures::definition("WTR-DEHU", "Dehumidifier, per day", "WTR", Unit::DAY, Decimal::ZERO, Decimal::ZERO)
            .equipment(dec!(85)),
        CatalogFixtures::definition("CLN-MOLD", "Mold remediation", "CLN", Unit::SF, dec!(0.50), dec!(3.00))
            .equipment(dec!(0.25)),
        CatalogFixtures::definition("CLN-FINAL", "Final cleaning", "CLN", Unit::HR, Decimal::ZERO, dec!(45)),
        CatalogFixtures::definition("FCC-CARPET", "Carpet, mid grade", "FCC", Unit::SF, dec!(2.50), dec!(0.75))
            .formula("FLOOR_SF(zone)")
            .requires(&["FCC-PAD"])
            .waste(dec!(0.10)),
        CatalogFixtures::definition("FCC-PAD", "Carpet pad", "FCC", Unit::SF, dec!(0.60), dec!(0.30))
            .formula("FLOOR_SF(zone)"),
        CatalogFixtures::definition("FCV-LAM", "Laminate flooring", "FCV", Unit::SF, dec!(2.10), dec!(1.40))
            .replaces(&["FCV-VINYL"]),
        CatalogFixtures::definition("FCV-VINYL", "Sheet vinyl flooring", "FCV", Unit::SF, dec!(1.60), dec!(1.10)),
        CatalogFixtures::definition("CON-TV", "Television, 55 inch", "CON", Unit::EA, dec!(800), Decimal::ZERO)
            .coverage(CoverageCode::C),
    ]
    .into_iter()
    .map(|draft| draft.0)
    .collect::<Vec<_>>()
    .into()
});

/// A catalog row under construction
pub struct DefinitionDraft(pub LineItemDefinition);

impl DefinitionDraft {
    pub fn formula(mut self, formula: &str) -> Self {
        self.0.quantity_formula = Some(formula.to_string());
        self
    }

    pub fn requires(mut self, codes: &[&str]) -> Self {
        self.0.requires_items = codes.iter().map(|c| c.to_string()).collect();
        self
    }

    pub fn excludes(mut self, codes: &[&str]) -> Self {
        self.0.excludes_items = codes.iter().map(|c| c.to_string()).collect();
        self
    }

    pub fn replaces(mut self, codes: &[&str]) -> Self {
        self.0.replaces_items = codes.iter().map(|c| c.to_string()).collect();
        self
    }

    pub fn auto_adds(mut self, codes: &[&str]) -> Self {
        self.0.auto_add_items = codes.iter().map(|c| c.to_string()).collect();
        self
    }

    pub fn waste(mut self, factor: Decimal) -> Self {
        self.0.waste_factor = factor;
        self
    }

    pub fn minimum(mut self, amount: Decimal) -> Self {
        self.0.minimum_charge = Some(amount);
        self
    }

    pub fn equipment(mut self, cost: Decimal) -> Self {
        self.0.costs.equipment = cost;
        self
    }

    pub fn coverage(mut self, coverage: CoverageCode) -> Self {
        self.0.default_coverage_code = Some(coverage);
        self
    }

    pub fn build(self) -> LineItemDefinition {
        self.0
    }
}

/// Fixture for catalog data
pub struct CatalogFixtures;

impl CatalogFixtures {
    /// The standard residential catalog used across the suite
    ///
    /// Every row defaults to Coverage A except `CON-TV` (Coverage C).
    pub fn standard() -> Catalog {
        STANDARD_CATALOG.clone()
    }

    /// Starts a catalog row with material and labor costs
    pub fn definition(
        code: &str,
        description: &str,
        category: &str,
        unit: Unit,
        material: Decimal,
        labor: Decimal,
    ) -> DefinitionDraft {
        let mut definition = LineItemDefinition::new(
            code,
            description,
            category,
            unit,
            CostComponents::new(material, labor, Decimal::ZERO),
            category,
        );
        definition.default_coverage_code = Some(CoverageCode::A);
        DefinitionDraft(definition)
    }
}

/// Fixture for carrier and jurisdiction configuration
pub struct CarrierFixtures;

impl CarrierFixtures {
    /// 10/10 O&P on three trades, no threshold
    pub fn standard_carrier() -> CarrierProfile {
        CarrierProfile::standard("Acme Mutual")
    }

    /// 8% tax on materials
    pub fn jurisdiction() -> JurisdictionProfile {
        JurisdictionProfile::new("Travis County, TX", Rate::from_percentage(dec!(8)))
    }

    pub fn exclusion(code: &str, reason: &str) -> CarrierExclusion {
        CarrierExclusion {
            id: RuleId::new(),
            code: code.to_string(),
            reason: Some(reason.to_string()),
            source: RuleSource::Carrier,
        }
    }

    pub fn mold_exclusion() -> CarrierExclusion {
        Self::exclusion("CLN-MOLD", "mold is covered under a separate sublimit")
    }

    pub fn quantity_cap(code: &str, max_quantity: Decimal) -> CarrierCap {
        CarrierCap {
            id: RuleId::new(),
            name: None,
            source: RuleSource::Carrier,
            priority: 10,
            target_code: Some(code.to_string()),
            category_prefix: None,
            max_quantity: Some(max_quantity),
            max_quantity_per_zone: None,
            max_unit_price: None,
        }
    }

    /// Documentation rule for a category prefix, optionally limited to Category 3 water
    pub fn documentation_rule(prefix: &str, documents: &[&str], category_3_only: bool) -> CarrierRuleRecord {
        let conditions = if category_3_only {
            json!({"damage_types": ["water"], "water_categories": [3]})
        } else {
            json!(null)
        };
        CarrierRuleRecord {
            id: RuleId::new(),
            name: format!("Documentation for {}", prefix),
            source: Some("jurisdiction".to_string()),
            priority: 50,
            target_code: None,
            category_prefix: Some(prefix.to_string()),
            conditions,
            effect: json!({"type": "require_doc", "document_codes": documents}),
            is_active: true,
        }
    }

    /// A row whose effect payload cannot be interpreted
    pub fn malformed_rule() -> CarrierRuleRecord {
        CarrierRuleRecord {
            id: RuleId::new(),
            name: "Broken cap".to_string(),
            source: None,
            priority: 1,
            target_code: Some("RFG-240".to_string()),
            category_prefix: None,
            conditions: json!(null),
            effect: json!({"type": "cap_quantity", "max_quantity": "plenty"}),
            is_active: true,
        }
    }
}

/// Fixture for zones and measurements
pub struct ZoneFixtures;

impl ZoneFixtures {
    /// 12 × 10 × 8 room: floor 120, walls 352, perimeter 44
    pub fn bedroom() -> Zone {
        Zone::room("Bedroom", dec!(12), dec!(10), dec!(8))
    }

    /// 40 × 30 roof at 6/12
    pub fn gable_roof() -> Zone {
        Zone::roof("Main roof", dec!(40), dec!(30), Pitch::new(dec!(6), dec!(12)))
    }

    /// Category 3 water loss in a 20 × 15 × 8 basement
    pub fn flooded_basement() -> Zone {
        Zone::room("Basement", dec!(20), dec!(15), dec!(8)).with_damage(DamageType::Water, Some(WaterCategory::Category3))
    }

    /// 10 × 10 × 8 room: floor and ceiling 100 SF, walls 320 SF
    pub fn small_room() -> Zone {
        Zone::room("Small bedroom", dec!(10), dec!(10), dec!(8))
    }
}

/// Fixture for timestamps
pub struct TimeFixtures;

impl TimeFixtures {
    /// Fixed evaluation timestamp for reproducible rule passes
    pub fn evaluation_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 14, 9, 30, 0).unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_catalog_is_consistent() {
        let catalog = CatalogFixtures::standard();
        for definition in catalog.iter() {
            for code in definition
                .requires_items
                .iter()
                .chain(&definition.excludes_items)
                .chain(&definition.replaces_items)
                .chain(&definition.auto_add_items)
            {
                assert!(catalog.contains(code), "{} references unknown {}", definition.code, code);
            }
        }
    }

    #[test]
    fn test_bedroom_metrics() {
        let metrics = ZoneFixtures::bedroom().metrics();
        assert_eq!(metrics.floor_square_feet, dec!(120));
        assert_eq!(metrics.wall_square_feet, dec!(352));
    }

    #[test]
    fn test_small_room_metrics() {
        let metrics = ZoneFixtures::small_room().metrics();
        assert_eq!(metrics.floor_square_feet, dec!(100));
        assert_eq!(metrics.ceiling_square_feet, dec!(100));
        assert_eq!(metrics.wall_square_feet, dec!(320));
    }
}
