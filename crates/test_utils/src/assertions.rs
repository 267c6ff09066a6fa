//! Custom Test Assertions
//!
//! Assertion helpers for domain types that give more meaningful failure
//! messages than `assert_eq!` on whole structs.

use rust_decimal::Decimal;

use core_kernel::Money;
use domain_validation::{Severity, ValidationIssue, ValidationResult};

/// Asserts that two decimals are numerically equal, ignoring scale
///
/// # Panics
///
/// Panics if the values differ
pub fn assert_decimal_eq(actual: Decimal, expected: Decimal) {
    assert!(
        actual.normalize() == expected.normalize(),
        "Decimal mismatch: actual={}, expected={}",
        actual,
        expected
    );
}

/// Asserts that two decimals are within `tolerance` of each other
pub fn assert_decimal_approx_eq(actual: Decimal, expected: Decimal, tolerance: Decimal) {
    let diff = (actual - expected).abs();
    assert!(
        diff <= tolerance,
        "Decimal values differ by more than tolerance: actual={}, expected={}, diff={}, tolerance={}",
        actual,
        expected,
        diff,
        tolerance
    );
}

/// Asserts that a Money value has the expected amount
pub fn assert_money_eq(actual: &Money, expected: Decimal) {
    assert!(
        actual.amount().normalize() == expected.normalize(),
        "Money mismatch: actual={} {}, expected={}",
        actual.currency(),
        actual.amount(),
        expected
    );
}

/// Asserts that the result carries an issue with `code` and returns the first one
///
/// # Panics
///
/// Panics listing the codes that were reported instead
pub fn assert_has_issue<'a>(result: &'a ValidationResult, code: &str) -> &'a ValidationIssue {
    match result.issues.iter().find(|i| i.code == code) {
        Some(issue) => issue,
        None => panic!("Expected issue {} but found [{}]", code, issue_codes(result).join(", ")),
    }
}

/// Asserts that no issue with `code` was reported
pub fn assert_no_issue(result: &ValidationResult, code: &str) {
    assert!(
        !result.has_code(code),
        "Unexpected issue {}: {:?}",
        code,
        result.with_code(code).map(|i| &i.message).collect::<Vec<_>>()
    );
}

/// Asserts the number of issues reported with `code`
pub fn assert_issue_count(result: &ValidationResult, code: &str, expected: usize) {
    let count = result.with_code(code).count();
    assert_eq!(
        count,
        expected,
        "Expected {} issue(s) {} but found {} in [{}]",
        expected,
        code,
        count,
        issue_codes(result).join(", ")
    );
}

/// Asserts the error / warning / info counts
pub fn assert_severity_counts(result: &ValidationResult, errors: usize, warnings: usize, infos: usize) {
    assert_eq!(
        (result.error_count, result.warning_count, result.info_count),
        (errors, warnings, infos),
        "Severity counts (errors, warnings, infos) differ; issues: [{}]",
        issue_codes(result).join(", ")
    );
}

/// Asserts that the counters agree with the issue list
pub fn assert_counts_consistent(result: &ValidationResult) {
    let count = |severity: Severity| result.issues.iter().filter(|i| i.severity == severity).count();
    assert_eq!(result.error_count, count(Severity::Error));
    assert_eq!(result.warning_count, count(Severity::Warning));
    assert_eq!(result.info_count, count(Severity::Info));
    assert_eq!(result.is_valid, result.error_count == 0);
}

fn issue_codes(result: &ValidationResult) -> Vec<String> {
    result
        .issues
        .iter()
        .map(|i| format!("{}({})", i.code, i.severity))
        .collect()
}
