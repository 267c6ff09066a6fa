//! Command line tests against bundle files

use clap::Parser;
use rust_decimal_macros::dec;
use std::path::PathBuf;

use domain_validation::{codes, EstimateBundle};
use interface_cli::{execute, Cli, CliConfig, CliError, Command};
use test_utils::{EstimateBuilder, LineItemBuilder, ZoneFixtures};

fn write_bundle(bundle: &EstimateBundle) -> PathBuf {
    let path = std::env::temp_dir().join(format!("bundle-{}.json", bundle.estimate.id));
    std::fs::write(&path, serde_json::to_string(bundle).unwrap()).unwrap();
    path
}

fn run(args: &[&str]) -> Cli {
    let mut argv = vec!["estimate-check"];
    argv.extend_from_slice(args);
    Cli::try_parse_from(argv).unwrap()
}

fn warning_only_bundle() -> EstimateBundle {
    let zone = ZoneFixtures::bedroom();
    let zone_id = zone.id;
    EstimateBuilder::new()
        .zone(zone)
        .item(LineItemBuilder::new("DRY-1/2").in_zone(zone_id).quantity(dec!(100)).build())
        .item(LineItemBuilder::new("CLN-FINAL").in_zone(zone_id).quantity(dec!(150)).build())
        .bundle()
}

// ============= ARGUMENT TESTS =============

mod argument_tests {
    use super::*;

    #[test]
    fn test_source_is_required() {
        assert!(Cli::try_parse_from(["estimate-check", "validate"]).is_err());
    }

    #[test]
    fn test_bundle_and_estimate_are_exclusive() {
        let parsed = Cli::try_parse_from([
            "estimate-check",
            "validate",
            "--bundle",
            "a.json",
            "--estimate",
            "EST-1",
        ]);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_global_options_follow_subcommand() {
        let cli = run(&["submit", "--bundle", "a.json", "--config", "validator.toml"]);

        assert_eq!(cli.config, Some(PathBuf::from("validator.toml")));
        match cli.command {
            Command::Submit { source } => assert_eq!(source.bundle, Some(PathBuf::from("a.json"))),
            other => panic!("unexpected command {other:?}"),
        }
    }
}

// ============= BUNDLE TESTS =============

mod bundle_tests {
    use super::*;

    #[tokio::test]
    async fn test_validate_prints_issues() {
        let path = write_bundle(&warning_only_bundle());
        let path_arg = path.to_string_lossy().into_owned();

        let output = execute(&run(&["validate", "--bundle", &path_arg]), &CliConfig::default())
            .await
            .unwrap();

        assert!(output.success);
        assert_eq!(output.body["is_valid"], true);
        assert_eq!(output.body["error_count"], 0);
        let codes_seen: Vec<&str> = output.body["issues"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|issue| issue["code"].as_str())
            .collect();
        assert!(codes_seen.contains(&codes::DEP001));
        std::fs::remove_file(path).ok();
    }

    #[tokio::test]
    async fn test_full_report_includes_settlement() {
        let path = write_bundle(&warning_only_bundle());
        let path_arg = path.to_string_lossy().into_owned();

        let output = execute(
            &run(&["validate", "--bundle", &path_arg, "--full"]),
            &CliConfig::default(),
        )
        .await
        .unwrap();

        assert!(output.body.get("settlement").is_some());
        assert!(output.body.get("zone_metrics").is_some());
        assert_eq!(output.body["validation"]["is_valid"], true);
        std::fs::remove_file(path).ok();
    }

    #[tokio::test]
    async fn test_submit_blocked_on_errors() {
        let zone = ZoneFixtures::bedroom();
        let zone_id = zone.id;
        let bundle = EstimateBuilder::new()
            .zone(zone)
            .item(LineItemBuilder::new("PNT-W").in_zone(zone_id).quantity(dec!(0)).build())
            .bundle();
        let path = write_bundle(&bundle);
        let path_arg = path.to_string_lossy().into_owned();

        let output = execute(&run(&["submit", "--bundle", &path_arg]), &CliConfig::default())
            .await
            .unwrap();

        assert!(!output.success);
        assert_eq!(output.body["outcome"], "blocked");
        std::fs::remove_file(path).ok();
    }

    #[tokio::test]
    async fn test_submit_locks_clean_estimate() {
        let path = write_bundle(&warning_only_bundle());
        let path_arg = path.to_string_lossy().into_owned();

        let output = execute(&run(&["submit", "--bundle", &path_arg]), &CliConfig::default())
            .await
            .unwrap();

        assert!(output.success);
        assert_eq!(output.body["outcome"], "submitted");
        assert!(output.body["submitted_at"].is_string());
        std::fs::remove_file(path).ok();
    }

    #[tokio::test]
    async fn test_malformed_bundle_is_a_parse_error() {
        let path = std::env::temp_dir().join(format!("bundle-bad-{}.json", core_kernel::EstimateId::new()));
        std::fs::write(&path, "{\"estimate\": 42}").unwrap();
        let path_arg = path.to_string_lossy().into_owned();

        let err = execute(&run(&["validate", "--bundle", &path_arg]), &CliConfig::default())
            .await
            .unwrap_err();

        assert!(matches!(err, CliError::BundleParse { .. }));
        std::fs::remove_file(path).ok();
    }
}
