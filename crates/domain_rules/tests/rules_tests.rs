//! Integration tests for domain_rules - rule normalisation, staged evaluation and audit trail

use chrono::{TimeZone, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::json;

use core_kernel::{Currency, EstimateId, RuleId};
use domain_estimate::{
    CalculatedLineItem, Catalog, CostComponents, EstimateCalculator, EstimateLineItem, LineItemDefinition, Unit,
};
use domain_rules::{
    evaluate_rules, generate_explanation, CarrierCap, CarrierExclusion, CarrierRuleRecord, EvaluationContext,
    RuleSource, RuleSources, RuleStatus, NO_RULES_APPLIED,
};

fn catalog() -> Catalog {
    vec![
        LineItemDefinition::new(
            "CLN-MOLD",
            "Mold remediation",
            "CLN",
            Unit::SF,
            CostComponents::new(dec!(0.50), dec!(3.00), dec!(0.25)),
            "CLN",
        ),
        LineItemDefinition::new(
            "RFG-240",
            "Laminated comp shingle roofing",
            "RFG",
            Unit::SQ,
            CostComponents::new(dec!(150), dec!(100), Decimal::ZERO),
            "RFG",
        ),
        LineItemDefinition::new(
            "WTR-EXT",
            "Water extraction",
            "WTR",
            Unit::SF,
            CostComponents::new(Decimal::ZERO, dec!(0.50), dec!(0.25)),
            "WTR",
        ),
    ]
    .into()
}

fn items(entries: &[(&str, Decimal)]) -> Vec<CalculatedLineItem> {
    let catalog = catalog();
    let calculator = EstimateCalculator::new(&catalog);
    entries
        .iter()
        .map(|(code, quantity)| {
            calculator
                .calculate_item(&EstimateLineItem::new(*code).with_quantity(*quantity), None, Currency::USD)
                .unwrap()
        })
        .collect()
}

fn context() -> EvaluationContext {
    EvaluationContext::new(EstimateId::new(), Utc.with_ymd_and_hms(2026, 3, 14, 9, 30, 0).unwrap())
}

fn cap(code: &str, max_quantity: Decimal) -> CarrierCap {
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

fn exclusion(code: &str) -> CarrierExclusion {
    CarrierExclusion {
        id: RuleId::new(),
        code: code.to_string(),
        reason: Some("mold is a separate sublimit".to_string()),
        source: RuleSource::Carrier,
    }
}

// ============= STAGE TESTS =============
mod stage_tests {
    use super::*;

    #[test]
    fn test_excluded_code_with_cap_is_denied_and_never_capped() {
        let sources = RuleSources {
            rules: Vec::new(),
            caps: vec![cap("CLN-MOLD", dec!(50))],
            exclusions: vec![exclusion("CLN-MOLD")],
        };
        let items = items(&[("CLN-MOLD", dec!(400))]);

        let outcome = evaluate_rules(&sources, &context(), &items);
        let result = &outcome.results[0];

        assert_eq!(result.status, RuleStatus::Denied);
        assert_eq!(result.adjusted_quantity, dec!(400));
        assert_eq!(result.applied_rules.len(), 1);
        assert!(outcome.audit_log.iter().all(|e| e.effect_type == domain_rules::EffectType::Exclude));
        assert!(outcome.apply_to(&items).is_empty());
    }

    #[test]
    fn test_unaffected_item_explains_no_rules() {
        let sources = RuleSources {
            caps: vec![cap("RFG-240", dec!(30))],
            ..RuleSources::default()
        };
        let items = items(&[("WTR-EXT", dec!(100))]);

        let outcome = evaluate_rules(&sources, &context(), &items);
        assert_eq!(outcome.results[0].status, RuleStatus::Allowed);
        assert_eq!(generate_explanation(&outcome.results[0]), NO_RULES_APPLIED);
        assert!(outcome.audit_log.is_empty());
    }

    #[test]
    fn test_audit_entries_reconstruct_changes() {
        let sources = RuleSources {
            caps: vec![cap("RFG-240", dec!(30))],
            ..RuleSources::default()
        };
        let items = items(&[("RFG-240", dec!(42))]);
        let context = context();

        let outcome = evaluate_rules(&sources, &context, &items);
        let entry = &outcome.audit_log.entries()[0];

        assert_eq!(entry.sequence, 1);
        assert_eq!(entry.line_item_id, items[0].id);
        assert_eq!(entry.line_item_code, "RFG-240");
        assert_eq!(entry.original_value, json!("42"));
        assert_eq!(entry.modified_value, json!("30"));
        assert_eq!(entry.recorded_at, context.evaluated_at);
        assert!(generate_explanation(&outcome.results[0]).contains("- [Carrier] Quantity capped from 42 to 30 SQ"));
    }
}

// ============= DEGRADATION TESTS =============
mod degradation_tests {
    use super::*;

    #[test]
    fn test_malformed_record_degrades_to_no_rules() {
        let broken = CarrierRuleRecord {
            id: RuleId::new(),
            name: "Broken".to_string(),
            source: None,
            priority: 1,
            target_code: Some("RFG-240".to_string()),
            category_prefix: None,
            conditions: json!(null),
            effect: json!({"type": "cap_quantity", "max_quantity": "lots"}),
            is_active: true,
        };
        let sources = RuleSources {
            rules: vec![broken],
            caps: Vec::new(),
            exclusions: vec![exclusion("CLN-MOLD")],
        };
        let items = items(&[("CLN-MOLD", dec!(100)), ("RFG-240", dec!(20))]);

        let outcome = evaluate_rules(&sources, &context(), &items);

        assert!(outcome.is_degraded());
        assert!(outcome.degraded.as_deref().unwrap().contains("Malformed rule"));
        assert!(outcome.results.iter().all(|r| r.status == RuleStatus::Allowed));
        assert!(outcome.audit_log.is_empty());
        assert_eq!(outcome.apply_to(&items).len(), 2);
    }

    #[test]
    fn test_unknown_source_is_malformed() {
        let record = CarrierRuleRecord {
            id: RuleId::new(),
            name: "Who".to_string(),
            source: Some("regulator".to_string()),
            priority: 1,
            target_code: Some("RFG-240".to_string()),
            category_prefix: None,
            conditions: json!(null),
            effect: json!({"type": "exclude"}),
            is_active: true,
        };
        let sources = RuleSources {
            rules: vec![record],
            ..RuleSources::default()
        };
        let outcome = evaluate_rules(&sources, &context(), &items(&[("RFG-240", dec!(10))]));
        assert!(outcome.is_degraded());
    }
}

// ============= PROPERTY TESTS =============
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn arbitrary_cap() -> impl Strategy<Value = CarrierCap> {
        (
            prop_oneof![Just("CLN-MOLD"), Just("RFG-240"), Just("WTR-EXT")],
            -5i32..5,
            1u32..100,
            prop::option::of(1u32..400),
        )
            .prop_map(|(code, priority, max_quantity, max_price)| CarrierCap {
                id: RuleId::new(),
                name: None,
                source: RuleSource::Carrier,
                priority,
                target_code: Some(code.to_string()),
                category_prefix: None,
                max_quantity: Some(Decimal::from(max_quantity)),
                max_quantity_per_zone: None,
                max_unit_price: max_price.map(Decimal::from),
            })
    }

    proptest! {
        #[test]
        fn identical_input_gives_identical_outcome(
            caps in prop::collection::vec(arbitrary_cap(), 0..6),
            quantities in prop::collection::vec(1u32..200, 3),
            exclude_mold in any::<bool>(),
        ) {
            let sources = RuleSources {
                rules: Vec::new(),
                caps,
                exclusions: if exclude_mold { vec![exclusion("CLN-MOLD")] } else { Vec::new() },
            };
            let items = items(&[
                ("CLN-MOLD", Decimal::from(quantities[0])),
                ("RFG-240", Decimal::from(quantities[1])),
                ("WTR-EXT", Decimal::from(quantities[2])),
            ]);
            let context = context();

            let first = evaluate_rules(&sources, &context, &items);
            let second = evaluate_rules(&sources, &context, &items);

            prop_assert_eq!(&first, &second);
            prop_assert_eq!(first.audit_log.entries(), second.audit_log.entries());
        }
    }
}
