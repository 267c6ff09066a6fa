//! Integration tests for domain_estimate - geometry, formulas, pricing and settlement

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use domain_estimate::{
    calculate_quantity_from_metrics, calculate_zone_metrics, validate_formula, MissingWall, Pitch, Zone,
    ZoneMetrics,
};

// ============= ZONE METRICS TESTS =============
mod metrics_tests {
    use super::*;

    #[test]
    fn test_bedroom_measurements() {
        let metrics = calculate_zone_metrics(&Zone::room("Bedroom", dec!(12), dec!(10), dec!(8)));

        assert_eq!(metrics.floor_square_feet, dec!(120));
        assert_eq!(metrics.wall_square_feet, dec!(352));
        assert_eq!(metrics.perimeter_linear_feet, dec!(44));
    }

    #[test]
    fn test_full_height_opening_uses_zone_height() {
        let zone = Zone::room("Hall", dec!(10), dec!(4), dec!(9))
            .with_missing_wall(MissingWall::full_height(dec!(4)));
        let metrics = zone.metrics();

        assert_eq!(metrics.gross_wall_square_feet, dec!(252));
        assert_eq!(metrics.missing_wall_square_feet, dec!(36));
        assert_eq!(metrics.wall_square_feet, dec!(216));
    }

    #[test]
    fn test_roof_area_uses_pitch() {
        let zone = Zone::roof("Main roof", dec!(40), dec!(30), Pitch::new(dec!(12), dec!(12)));
        let metrics = zone.metrics();

        assert_eq!(metrics.floor_square_feet, dec!(1200));
        // 1200 × √2
        assert_eq!(metrics.roof_square_feet, Some(dec!(1697.06)));
        assert_eq!(metrics.roof_squares, Some(dec!(16.97)));
    }

    #[test]
    fn test_dimensionless_zone_is_all_zero() {
        let metrics = Zone::new("Exterior", domain_estimate::ZoneType::Exterior).metrics();
        assert_eq!(metrics, ZoneMetrics::default());
    }
}

// ============= FORMULA ENGINE TESTS =============
mod formula_tests {
    use super::*;

    #[test]
    fn test_minimum_quantity_formula() {
        let metrics = Zone::room("Bedroom", dec!(12), dec!(10), dec!(8)).metrics();
        let result = calculate_quantity_from_metrics("MAX(3, CEIL(FLOOR_SF(zone)/500))", &metrics).unwrap();

        assert_eq!(result.quantity, dec!(3));
        assert_eq!(result.breakdown.get("FLOOR_SF"), Some(&dec!(120)));
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_static_analysis_reports_references() {
        let validation = validate_formula("CEIL((WALL_SF(zone) + CEILING_SF(zone)) * 1.1 / 32)");

        assert!(validation.valid);
        assert_eq!(validation.referenced_metrics, vec!["WALL_SF", "CEILING_SF"]);
        assert_eq!(validation.referenced_functions, vec!["CEIL"]);
    }

    #[test]
    fn test_unknown_identifier_never_executes() {
        let validation = validate_formula("FLOOR_SF(zone) + exec(zone)");
        assert!(!validation.valid);
        assert!(validation.errors.iter().any(|e| e.contains("Unknown metric/function")));

        let metrics = ZoneMetrics::default();
        assert!(calculate_quantity_from_metrics("FLOOR_SF(zone) + exec(zone)", &metrics).is_err());
    }

    #[test]
    fn test_division_by_zero_is_a_warning() {
        let metrics = ZoneMetrics::default();
        let result = calculate_quantity_from_metrics("PERIMETER_LF(zone) / FLOOR_SF(zone)", &metrics).unwrap();

        assert_eq!(result.quantity, Decimal::ZERO);
        assert_eq!(result.warnings.len(), 1);
        assert!(result.warnings[0].contains("Division by zero"));
    }

    #[test]
    fn test_empty_formula_is_structural_error() {
        assert!(!validate_formula("   ").valid);
        assert!(calculate_quantity_from_metrics("", &ZoneMetrics::default()).is_err());
    }
}

// ============= PRICING AND SETTLEMENT TESTS =============
mod settlement_tests {
    use super::*;
    use core_kernel::{CarrierId, Currency, JurisdictionId, Rate};
    use domain_estimate::{
        calculate_settlement, Catalog, CostComponents, CoverageCode, DeductibleSchedule, DepreciationType,
        Estimate, EstimateCalculator, EstimateLineItem, ItemCondition, JurisdictionProfile, LineItemDefinition,
        CarrierProfile, Unit,
    };

    fn catalog() -> Catalog {
        let mut shingles = LineItemDefinition::new(
            "RFG-240",
            "Laminated comp shingle roofing",
            "RFG",
            Unit::SQ,
            CostComponents::new(dec!(150), dec!(100), Decimal::ZERO),
            "RFG",
        );
        shingles.quantity_formula = Some("ROOF_SF(zone) / 100".to_string());

        let mut paint = LineItemDefinition::new(
            "PNT-W",
            "Paint walls - two coats",
            "PNT",
            Unit::SF,
            CostComponents::new(dec!(0.25), dec!(0.75), Decimal::ZERO),
            "PNT",
        );
        paint.quantity_formula = Some("WALL_SF(zone)".to_string());

        let mut extraction = LineItemDefinition::new(
            "WTR-EXT",
            "Water extraction",
            "WTR",
            Unit::SF,
            CostComponents::new(Decimal::ZERO, dec!(0.50), dec!(0.25)),
            "WTR",
        );
        extraction.quantity_formula = Some("FLOOR_SF(zone)".to_string());
        extraction.depreciation_type = DepreciationType::None;

        vec![shingles, paint, extraction].into()
    }

    #[test]
    fn test_recalculate_and_settle() {
        let catalog = catalog();
        let mut estimate = Estimate::new("CLM-2001", CarrierId::new(), JurisdictionId::new());
        let roof = estimate
            .add_zone(Zone::roof("Roof", dec!(50), dec!(20), Pitch::new(dec!(0), dec!(12))))
            .unwrap();
        let room = estimate.add_zone(Zone::room("Bedroom", dec!(12), dec!(10), dec!(8))).unwrap();

        estimate
            .add_line_item(
                EstimateLineItem::new("RFG-240")
                    .in_zone(roof)
                    .with_age(dec!(10), Some(ItemCondition::Average))
                    .with_coverage(CoverageCode::A),
            )
            .unwrap();
        estimate
            .add_line_item(EstimateLineItem::new("PNT-W").in_zone(room).with_coverage(CoverageCode::A))
            .unwrap();
        estimate
            .add_line_item(EstimateLineItem::new("WTR-EXT").in_zone(room).with_coverage(CoverageCode::A))
            .unwrap();

        let recalculation = EstimateCalculator::new(&catalog).recalculate(&estimate).unwrap();
        let items = &recalculation.line_items;

        // 10 squares × $250
        assert_eq!(items[0].quantity, dec!(10));
        assert_eq!(items[0].rcv.amount(), dec!(2500));
        assert_eq!(items[0].depreciation.depreciation_pct, dec!(50));
        // 352 SF × $1.00
        assert_eq!(items[1].rcv.amount(), dec!(352));
        // 120 SF × $0.75, never depreciates
        assert_eq!(items[2].rcv.amount(), dec!(90));
        assert!(!items[2].depreciation.is_depreciable);

        let carrier = CarrierProfile::standard("Test Mutual");
        let jurisdiction = JurisdictionProfile::new("Test County", Rate::from_percentage(dec!(10)));
        let deductibles = DeductibleSchedule::new().with(CoverageCode::A, dec!(1000));
        let summary = calculate_settlement(items, &carrier, &jurisdiction, &deductibles, Currency::USD).unwrap();

        let a = summary.coverage(CoverageCode::A).unwrap();
        assert!(summary.op_qualified);
        assert_eq!(a.subtotal.amount(), dec!(2942));
        // materials: 1500 + 88
        assert_eq!(a.tax.amount(), dec!(158.8));
        assert_eq!(a.overhead.amount(), dec!(294.2));
        assert_eq!(a.total_rcv.amount(), dec!(3689.2));
        assert_eq!(a.recoverable_depreciation.amount(), dec!(1250));
        assert_eq!(a.total_acv.amount(), dec!(2439.2));
        assert_eq!(a.net_claim.amount(), dec!(2689.2));
    }

    #[test]
    fn test_catalog_round_trips_as_list() {
        let json = serde_json::to_value(catalog()).unwrap();
        assert!(json.is_array());
        let parsed: Catalog = serde_json::from_value(json).unwrap();
        assert_eq!(parsed.len(), 3);
        assert_eq!(parsed.get("WTR-EXT").unwrap().depreciation_type, DepreciationType::None);
    }
}

// ============= PROPERTY TESTS =============
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn dimension() -> impl Strategy<Value = Decimal> {
        (1u32..600).prop_map(|tenths| Decimal::from(tenths) / dec!(10))
    }

    fn opening() -> impl Strategy<Value = MissingWall> {
        (dimension(), dimension(), 1u32..4, any::<bool>(), any::<bool>()).prop_map(
            |(width, height, quantity, to_floor, to_ceiling)| {
                let mut wall = MissingWall::new(width, height).times(quantity);
                wall.goes_to_floor = to_floor;
                wall.goes_to_ceiling = to_ceiling;
                wall
            },
        )
    }

    fn formula_atom() -> impl Strategy<Value = String> {
        prop_oneof![
            Just("FLOOR_SF(zone)".to_string()),
            Just("WALL_SF(zone)".to_string()),
            Just("PERIMETER_LF".to_string()),
            Just("ROOF_SF(zone)".to_string()),
            Just("SYSTEM(zone)".to_string()),
            Just("0".to_string()),
            Just("12.5".to_string()),
            Just("CEIL(".to_string()),
            Just(")".to_string()),
        ]
    }

    fn formula() -> impl Strategy<Value = String> {
        let op = prop_oneof![Just(" + "), Just(" - "), Just(" * "), Just(" / "), Just(", ")];
        (formula_atom(), prop::collection::vec((op, formula_atom()), 0..5)).prop_map(|(head, tail)| {
            let mut text = head;
            for (op, atom) in tail {
                text.push_str(op);
                text.push_str(&atom);
            }
            text
        })
    }

    proptest! {
        #[test]
        fn wall_area_is_gross_minus_openings_clamped(
            length in dimension(),
            width in dimension(),
            height in dimension(),
            openings in prop::collection::vec(opening(), 0..6),
        ) {
            let mut zone = Zone::room("Room", length, width, height);
            for wall in openings {
                zone = zone.with_missing_wall(wall);
            }
            let metrics = zone.metrics();
            let removed: Decimal = zone.missing_walls.iter().map(|w| w.effective_area(zone.height_ft)).sum();
            let expected = (dec!(2) * (length + width) * height - removed).max(Decimal::ZERO).round_dp(2);

            prop_assert!(metrics.wall_square_feet >= Decimal::ZERO);
            prop_assert_eq!(metrics.wall_square_feet, expected);
        }

        #[test]
        fn validity_matches_evaluation_success(
            text in formula(),
            floor in 0u32..5000,
            wall in 0u32..5000,
        ) {
            let metrics = ZoneMetrics {
                floor_square_feet: Decimal::from(floor),
                wall_square_feet: Decimal::from(wall),
                ..ZoneMetrics::default()
            };
            let valid = validate_formula(&text).valid;
            let evaluated = calculate_quantity_from_metrics(&text, &metrics).is_ok();
            prop_assert_eq!(valid, evaluated);
        }
    }
}
