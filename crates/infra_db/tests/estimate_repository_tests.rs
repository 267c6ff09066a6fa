//! PostgreSQL adapter tests
//!
//! These start a PostgreSQL container and are ignored by default. Run with
//! `cargo test -p infra_db -- --ignored` on a machine with Docker.

use std::sync::Arc;

use chrono::Utc;
use rust_decimal_macros::dec;

use domain_estimate::EstimateStatus;
use domain_rules::RuleSources;
use domain_validation::{codes, EstimateRepository, SubmissionError, SubmissionGate, ValidatorConfig};
use test_utils::{
    assert_has_issue, create_isolated_test_database, CarrierFixtures, CatalogFixtures, EstimateBuilder,
    LineItemBuilder, ZoneFixtures,
};

// ============= ROUND TRIP TESTS =============

mod round_trip_tests {
    use super::*;

    #[tokio::test]
    #[ignore = "requires docker"]
    async fn test_estimate_documents_round_trip() {
        let db = create_isolated_test_database().await.expect("database");
        let zone = ZoneFixtures::bedroom();
        let zone_id = zone.id;
        let bundle = EstimateBuilder::new()
            .zone(zone)
            .item(LineItemBuilder::new("PNT-W").in_zone(zone_id).build())
            .item(LineItemBuilder::new("CLN-FINAL").quantity(dec!(4)).build())
            .bundle();
        let adapter = db.seed_bundle(&bundle).await.expect("seed");

        let loaded = adapter.load_estimate(bundle.estimate.id).await.unwrap();

        assert_eq!(loaded.zones, bundle.estimate.zones);
        assert_eq!(loaded.line_items, bundle.estimate.line_items);
        assert_eq!(loaded.status, EstimateStatus::InProgress);
        assert_eq!(adapter.load_catalog().await.unwrap().len(), CatalogFixtures::standard().len());
        assert_eq!(
            adapter.load_carrier_profile(bundle.carrier.id).await.unwrap(),
            bundle.carrier
        );
    }

    #[tokio::test]
    #[ignore = "requires docker"]
    async fn test_rule_sources_keep_carrier_rows_first() {
        let db = create_isolated_test_database().await.expect("database");
        let carrier_rules = RuleSources {
            caps: vec![
                CarrierFixtures::quantity_cap("RFG-240", dec!(30)),
                CarrierFixtures::quantity_cap("RFG-FELT", dec!(30)),
            ],
            exclusions: vec![CarrierFixtures::mold_exclusion()],
            ..RuleSources::default()
        };
        let mut bundle = EstimateBuilder::new().bundle_with(
            CatalogFixtures::standard(),
            CarrierFixtures::standard_carrier(),
            CarrierFixtures::jurisdiction(),
            carrier_rules.clone(),
        );
        bundle.jurisdiction_rules = RuleSources {
            rules: vec![CarrierFixtures::documentation_rule("WTR", &["photos"], false)],
            ..RuleSources::default()
        };
        let adapter = db.seed_bundle(&bundle).await.expect("seed");

        let sources = adapter
            .load_rule_sources(bundle.carrier.id, bundle.jurisdiction.id)
            .await
            .unwrap();

        assert_eq!(sources.caps, carrier_rules.caps);
        assert_eq!(sources.exclusions, carrier_rules.exclusions);
        assert_eq!(sources.rules.len(), 1);
    }
}

// ============= SUBMISSION TESTS =============

mod submission_tests {
    use super::*;

    #[tokio::test]
    #[ignore = "requires docker"]
    async fn test_lock_is_taken_once() {
        let db = create_isolated_test_database().await.expect("database");
        let bundle = EstimateBuilder::new()
            .item(LineItemBuilder::new("CLN-FINAL").quantity(dec!(4)).build())
            .bundle();
        let adapter = db.seed_bundle(&bundle).await.expect("seed");
        let estimate_id = bundle.estimate.id;

        adapter.lock_for_submission(estimate_id, Utc::now()).await.unwrap();
        let second = adapter.lock_for_submission(estimate_id, Utc::now()).await.unwrap_err();

        assert!(second.is_conflict());
        let stored = adapter.load_estimate(estimate_id).await.unwrap();
        assert!(stored.is_locked);
        assert_eq!(stored.status, EstimateStatus::PendingReview);
    }

    #[tokio::test]
    #[ignore = "requires docker"]
    async fn test_gate_persists_audit_and_locks() {
        let db = create_isolated_test_database().await.expect("database");
        let zone = ZoneFixtures::bedroom();
        let zone_id = zone.id;
        let rules = RuleSources {
            exclusions: vec![CarrierFixtures::mold_exclusion()],
            ..RuleSources::default()
        };
        let bundle = EstimateBuilder::new()
            .zone(zone)
            .item(LineItemBuilder::new("CLN-MOLD").in_zone(zone_id).quantity(dec!(40)).build())
            .bundle_with(
                CatalogFixtures::standard(),
                CarrierFixtures::standard_carrier(),
                CarrierFixtures::jurisdiction(),
                rules,
            );
        let adapter = db.seed_bundle(&bundle).await.expect("seed");
        let estimate_id = bundle.estimate.id;
        let gate = SubmissionGate::new(Arc::new(adapter.clone()), ValidatorConfig::default());

        let outcome = gate.submit(estimate_id).await.unwrap();
        assert_has_issue(outcome.validation(), codes::CAR001);
        assert!(outcome.is_submitted());

        let audit = adapter.repository().get_audit_entries(estimate_id.into()).await.unwrap();
        assert_eq!(audit.len(), 1);
        assert_eq!(audit[0].line_item_code, "CLN-MOLD");
        assert_eq!(audit[0].rule_source, "carrier");

        let again = gate.submit(estimate_id).await.unwrap_err();
        assert!(matches!(again, SubmissionError::AlreadySubmitted(_)));
    }

    #[tokio::test]
    #[ignore = "requires docker"]
    async fn test_revalidation_appends_new_audit_rows() {
        let db = create_isolated_test_database().await.expect("database");
        let zone = ZoneFixtures::bedroom();
        let zone_id = zone.id;
        let rules = RuleSources {
            exclusions: vec![CarrierFixtures::mold_exclusion()],
            ..RuleSources::default()
        };
        let bundle = EstimateBuilder::new()
            .zone(zone)
            .item(LineItemBuilder::new("CLN-MOLD").in_zone(zone_id).quantity(dec!(40)).build())
            .bundle_with(
                CatalogFixtures::standard(),
                CarrierFixtures::standard_carrier(),
                CarrierFixtures::jurisdiction(),
                rules,
            );
        let adapter = db.seed_bundle(&bundle).await.expect("seed");
        let estimate_id = bundle.estimate.id;
        let gate = SubmissionGate::new(Arc::new(adapter.clone()), ValidatorConfig::default());

        gate.validate_for_submission(estimate_id).await.unwrap();
        gate.validate_for_submission(estimate_id).await.unwrap();

        let audit = adapter.repository().get_audit_entries(estimate_id.into()).await.unwrap();
        assert_eq!(audit.len(), 2);
        assert_ne!(audit[0].audit_entry_id, audit[1].audit_entry_id);
    }

    #[tokio::test]
    #[ignore = "requires docker"]
    async fn test_missing_estimate_is_not_found() {
        let db = create_isolated_test_database().await.expect("database");
        let adapter = db.adapter();

        let err = adapter
            .lock_for_submission(core_kernel::EstimateId::new(), Utc::now())
            .await
            .unwrap_err();

        assert!(err.is_not_found());
    }
}
