//! Property-Based Test Generators
//!
//! Proptest strategies for zones, metrics, formulas and validation issues
//! that respect the domain invariants.

use proptest::prelude::*;
use rust_decimal::Decimal;

use domain_estimate::{MissingWall, Zone, ZoneMetrics};
use domain_validation::{codes, IssueCategory, Severity, ValidationIssue};

/// Dimensions from 1.0 to 60.0 feet in tenths
pub fn dimension_strategy() -> impl Strategy<Value = Decimal> {
    (10i64..=600i64).prop_map(|tenths| Decimal::new(tenths, 1))
}

/// Non-negative square footage with two decimals
pub fn area_strategy() -> impl Strategy<Value = Decimal> {
    (0i64..500_000i64).prop_map(|hundredths| Decimal::new(hundredths, 2))
}

/// Openings that may be larger than the wall they sit in
pub fn missing_wall_strategy() -> impl Strategy<Value = MissingWall> {
    (dimension_strategy(), dimension_strategy(), 1u32..4, any::<bool>(), any::<bool>()).prop_map(
        |(width, height, quantity, to_floor, to_ceiling)| {
            let mut wall = MissingWall::new(width, height).times(quantity);
            if to_floor {
                wall = wall.to_floor();
            }
            if to_ceiling {
                wall = wall.to_ceiling();
            }
            wall
        },
    )
}

/// Rectangular rooms with up to five openings
pub fn room_zone_strategy() -> impl Strategy<Value = Zone> {
    (
        dimension_strategy(),
        dimension_strategy(),
        dimension_strategy(),
        prop::collection::vec(missing_wall_strategy(), 0..5),
    )
        .prop_map(|(length, width, height, walls)| {
            walls
                .into_iter()
                .fold(Zone::room("Generated", length, width, height), Zone::with_missing_wall)
        })
}

/// Arbitrary measurements, roof area present about half of the time
pub fn metrics_strategy() -> impl Strategy<Value = ZoneMetrics> {
    (
        area_strategy(),
        area_strategy(),
        area_strategy(),
        area_strategy(),
        prop::option::of(area_strategy()),
    )
        .prop_map(|(floor, ceiling, wall, perimeter, roof)| ZoneMetrics {
            floor_square_feet: floor,
            ceiling_square_feet: ceiling,
            wall_square_feet: wall,
            gross_wall_square_feet: wall,
            perimeter_linear_feet: perimeter,
            roof_square_feet: roof,
            ..ZoneMetrics::default()
        })
}

fn metric_call() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("FLOOR_SF(zone)".to_string()),
        Just("WALL_SF(zone)".to_string()),
        Just("CEILING_SF(zone)".to_string()),
        Just("PERIMETER_LF(zone)".to_string()),
        Just("ROOF_SF(zone)".to_string()),
    ]
}

fn number_literal() -> impl Strategy<Value = String> {
    (0u32..1000, 0u32..100).prop_map(|(whole, fraction)| {
        if fraction % 3 == 0 {
            whole.to_string()
        } else {
            format!("{}.{:02}", whole, fraction)
        }
    })
}

/// Well-formed formulas over the whitelisted metrics and functions
pub fn valid_formula_strategy() -> impl Strategy<Value = String> {
    let leaf = prop_oneof![number_literal(), metric_call()];
    leaf.prop_recursive(3, 16, 2, |inner| {
        prop_oneof![
            (inner.clone(), prop_oneof![Just("+"), Just("-"), Just("*"), Just("/")], inner.clone())
                .prop_map(|(l, op, r)| format!("{} {} {}", l, op, r)),
            inner.clone().prop_map(|e| format!("({})", e)),
            inner.clone().prop_map(|e| format!("CEIL({})", e)),
            (inner.clone(), inner.clone()).prop_map(|(a, b)| format!("MAX({}, {})", a, b)),
            (inner.clone(), inner).prop_map(|(a, b)| format!("MIN({}, {})", a, b)),
        ]
    })
}

/// Formula text that may or may not be well formed
pub fn formula_text_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        3 => valid_formula_strategy(),
        1 => "[A-Z_]{1,10}\\(zone\\)",
        1 => "[0-9+*/() .a-z]{0,20}",
        1 => Just(String::new()),
    ]
}

pub fn severity_strategy() -> impl Strategy<Value = Severity> {
    prop_oneof![Just(Severity::Error), Just(Severity::Warning), Just(Severity::Info)]
}

/// Issues with arbitrary severity
pub fn validation_issue_strategy() -> impl Strategy<Value = ValidationIssue> {
    (
        severity_strategy(),
        prop_oneof![
            Just((codes::QTY001, IssueCategory::Quantity)),
            Just((codes::DEP001, IssueCategory::Dependency)),
            Just((codes::EXC001, IssueCategory::Exclusion)),
            Just((codes::COV001, IssueCategory::Coverage)),
            Just((codes::DOC001, IssueCategory::Documentation)),
        ],
        any::<bool>(),
    )
        .prop_map(|(severity, (code, category), carrier_sensitive)| {
            let issue = ValidationIssue::new(code, severity, category, format!("{} generated", code));
            if carrier_sensitive {
                issue.carrier_sensitive()
            } else {
                issue
            }
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain_estimate::{calculate_quantity_from_metrics, validate_formula};

    proptest! {
        #[test]
        fn generated_formulas_validate_and_evaluate(
            text in valid_formula_strategy(),
            metrics in metrics_strategy(),
        ) {
            let validation = validate_formula(&text);
            prop_assert!(validation.valid, "{} -> {:?}", text, validation.errors);
            prop_assert!(calculate_quantity_from_metrics(&text, &metrics).is_ok());
        }

        #[test]
        fn generated_rooms_have_non_negative_walls(zone in room_zone_strategy()) {
            prop_assert!(zone.validate().is_ok());
            prop_assert!(zone.metrics().wall_square_feet >= Decimal::ZERO);
        }
    }
}
