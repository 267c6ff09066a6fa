//! Test Data Builders
//!
//! Builder patterns for zones, line items and estimates with sensible
//! defaults, so that tests only spell out the fields they care about.

use rust_decimal::Decimal;

use core_kernel::{CarrierId, Currency, JurisdictionId, ZoneId};
use domain_estimate::{
    CarrierProfile, Catalog, CoverageCode, DamageType, DeductibleSchedule, Estimate, EstimateLineItem,
    ItemCondition, JurisdictionProfile, MissingWall, Pitch, Subroom, WaterCategory, Zone, ZoneType,
};
use domain_rules::RuleSources;
use domain_validation::EstimateBundle;

use crate::fixtures::{CarrierFixtures, CatalogFixtures};

/// Builder for zones
pub struct ZoneBuilder {
    zone: Zone,
}

impl Default for ZoneBuilder {
    fn default() -> Self {
        Self::room("Room")
    }
}

impl ZoneBuilder {
    /// A room with no dimensions yet
    pub fn room(name: &str) -> Self {
        Self {
            zone: Zone::new(name, ZoneType::Room),
        }
    }

    pub fn roof(name: &str, pitch: Pitch) -> Self {
        let mut zone = Zone::new(name, ZoneType::Roof);
        zone.pitch = Some(pitch);
        Self { zone }
    }

    pub fn with_id(mut self, id: ZoneId) -> Self {
        self.zone.id = id;
        self
    }

    pub fn dimensions(mut self, length_ft: Decimal, width_ft: Decimal, height_ft: Decimal) -> Self {
        self.zone = self.zone.with_dimensions(length_ft, width_ft, Some(height_ft));
        self
    }

    pub fn footprint(mut self, length_ft: Decimal, width_ft: Decimal) -> Self {
        self.zone = self.zone.with_dimensions(length_ft, width_ft, None);
        self
    }

    pub fn missing_wall(mut self, wall: MissingWall) -> Self {
        self.zone = self.zone.with_missing_wall(wall);
        self
    }

    pub fn subroom(mut self, subroom: Subroom) -> Self {
        self.zone = self.zone.with_subroom(subroom);
        self
    }

    pub fn damage(mut self, damage_type: DamageType, water_category: Option<WaterCategory>) -> Self {
        self.zone = self.zone.with_damage(damage_type, water_category);
        self
    }

    pub fn build(self) -> Zone {
        self.zone
    }
}

/// Builder for estimate line items
pub struct LineItemBuilder {
    item: EstimateLineItem,
}

impl LineItemBuilder {
    pub fn new(code: &str) -> Self {
        Self {
            item: EstimateLineItem::new(code),
        }
    }

    pub fn in_zone(mut self, zone_id: ZoneId) -> Self {
        self.item = self.item.in_zone(zone_id);
        self
    }

    pub fn quantity(mut self, quantity: Decimal) -> Self {
        self.item = self.item.with_quantity(quantity);
        self
    }

    pub fn age(mut self, years: Decimal, condition: Option<ItemCondition>) -> Self {
        self.item = self.item.with_age(years, condition);
        self
    }

    pub fn coverage(mut self, coverage: CoverageCode) -> Self {
        self.item = self.item.with_coverage(coverage);
        self
    }

    pub fn manual_depreciation(mut self, pct: Decimal, reason: Option<&str>) -> Self {
        self.item = self.item.with_depreciation(pct, reason.map(str::to_string));
        self
    }

    pub fn damage(mut self, damage_type: DamageType, water_category: Option<WaterCategory>) -> Self {
        self.item = self.item.with_damage(damage_type, water_category);
        self
    }

    pub fn build(self) -> EstimateLineItem {
        self.item
    }
}

/// Builder for whole estimates and pipeline bundles
pub struct EstimateBuilder {
    claim_number: String,
    carrier_id: CarrierId,
    jurisdiction_id: JurisdictionId,
    currency: Currency,
    zones: Vec<Zone>,
    items: Vec<EstimateLineItem>,
    deductibles: DeductibleSchedule,
}

impl Default for EstimateBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl EstimateBuilder {
    pub fn new() -> Self {
        Self {
            claim_number: "CLM-2026-0001".to_string(),
            carrier_id: CarrierId::new(),
            jurisdiction_id: JurisdictionId::new(),
            currency: Currency::USD,
            zones: Vec::new(),
            items: Vec::new(),
            deductibles: DeductibleSchedule::new(),
        }
    }

    pub fn claim_number(mut self, claim_number: &str) -> Self {
        self.claim_number = claim_number.to_string();
        self
    }

    pub fn carrier(mut self, carrier_id: CarrierId) -> Self {
        self.carrier_id = carrier_id;
        self
    }

    pub fn jurisdiction(mut self, jurisdiction_id: JurisdictionId) -> Self {
        self.jurisdiction_id = jurisdiction_id;
        self
    }

    pub fn zone(mut self, zone: Zone) -> Self {
        self.zones.push(zone);
        self
    }

    pub fn item(mut self, item: EstimateLineItem) -> Self {
        self.items.push(item);
        self
    }

    pub fn deductible(mut self, coverage: CoverageCode, amount: Decimal) -> Self {
        self.deductibles = self.deductibles.with(coverage, amount);
        self
    }

    /// Builds the estimate
    ///
    /// # Panics
    ///
    /// Panics if a zone has invalid geometry or an item references a zone
    /// that was not added
    pub fn build(self) -> Estimate {
        let mut estimate = Estimate::new(self.claim_number, self.carrier_id, self.jurisdiction_id);
        estimate.currency = self.currency;
        estimate.deductibles = self.deductibles;
        for zone in self.zones {
            estimate.add_zone(zone).expect("valid zone geometry");
        }
        for item in self.items {
            estimate.add_line_item(item).expect("line item zone exists");
        }
        estimate
    }

    /// Builds a bundle with the standard catalog, carrier and jurisdiction
    pub fn bundle(self) -> EstimateBundle {
        self.bundle_with(
            CatalogFixtures::standard(),
            CarrierFixtures::standard_carrier(),
            CarrierFixtures::jurisdiction(),
            RuleSources::default(),
        )
    }

    /// Builds a bundle; the estimate is pointed at the given profiles
    pub fn bundle_with(
        self,
        catalog: Catalog,
        carrier: CarrierProfile,
        jurisdiction: JurisdictionProfile,
        carrier_rules: RuleSources,
    ) -> EstimateBundle {
        let estimate = self.carrier(carrier.id).jurisdiction(jurisdiction.id).build();
        EstimateBundle {
            estimate,
            catalog,
            carrier,
            jurisdiction,
            carrier_rules,
            jurisdiction_rules: RuleSources::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain_estimate::EstimateStatus;
    use rust_decimal_macros::dec;

    #[test]
    fn test_estimate_builder_links_items_to_zones() {
        let zone = ZoneBuilder::room("Kitchen").dimensions(dec!(12), dec!(10), dec!(8)).build();
        let zone_id = zone.id;
        let estimate = EstimateBuilder::new()
            .zone(zone)
            .item(LineItemBuilder::new("PNT-W").in_zone(zone_id).build())
            .build();

        assert_eq!(estimate.zones.len(), 1);
        assert_eq!(estimate.line_items[0].zone_id, Some(zone_id));
        assert_eq!(estimate.status, EstimateStatus::InProgress);
    }

    #[test]
    fn test_bundle_points_estimate_at_profiles() {
        let bundle = EstimateBuilder::new().bundle();
        assert_eq!(bundle.estimate.carrier_id, bundle.carrier.id);
        assert_eq!(bundle.estimate.jurisdiction_id, bundle.jurisdiction.id);
    }
}
