//! Validation issues and the aggregated result

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use core_kernel::ZoneId;

/// Issue codes reported by the validator
pub mod codes {
    pub const DEP001: &str = "DEP001";
    pub const QTY001: &str = "QTY001";
    pub const QTY002: &str = "QTY002";
    pub const QTY003: &str = "QTY003";
    pub const EXC001: &str = "EXC001";
    pub const REP001: &str = "REP001";
    pub const CMP001: &str = "CMP001";
    pub const CMP002: &str = "CMP002";
    pub const DPR001: &str = "DPR001";
    pub const DPR002: &str = "DPR002";
    pub const DPR003: &str = "DPR003";
    pub const COV001: &str = "COV001";
    pub const CAR001: &str = "CAR001";
    pub const CAR002: &str = "CAR002";
    pub const JUR001: &str = "JUR001";
    pub const JUR002: &str = "JUR002";
    pub const DOC001: &str = "DOC001";
    pub const RUL001: &str = "RUL001";
}

/// Issue severity; only errors block submission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Info => "info",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueCategory {
    Dependency,
    Quantity,
    Exclusion,
    Replacement,
    Completeness,
    Depreciation,
    Coverage,
    Carrier,
    Jurisdiction,
    Documentation,
    Rules,
}

/// A single finding from a validation pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub code: String,
    pub severity: Severity,
    pub category: IssueCategory,
    pub message: String,
    /// Line item codes the issue concerns
    pub related_items: Vec<String>,
    pub zone_id: Option<ZoneId>,
    /// The finding depends on carrier guidelines and may be waived by them
    pub carrier_sensitive: bool,
    pub suggestion: Option<String>,
}

impl ValidationIssue {
    pub fn new(code: &str, severity: Severity, category: IssueCategory, message: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            severity,
            category,
            message: message.into(),
            related_items: Vec::new(),
            zone_id: None,
            carrier_sensitive: false,
            suggestion: None,
        }
    }

    pub fn error(code: &str, category: IssueCategory, message: impl Into<String>) -> Self {
        Self::new(code, Severity::Error, category, message)
    }

    pub fn warning(code: &str, category: IssueCategory, message: impl Into<String>) -> Self {
        Self::new(code, Severity::Warning, category, message)
    }

    pub fn info(code: &str, category: IssueCategory, message: impl Into<String>) -> Self {
        Self::new(code, Severity::Info, category, message)
    }

    pub fn with_items<I, S>(mut self, items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.related_items.extend(items.into_iter().map(Into::into));
        self
    }

    pub fn in_zone(mut self, zone_id: Option<ZoneId>) -> Self {
        self.zone_id = zone_id;
        self
    }

    pub fn carrier_sensitive(mut self) -> Self {
        self.carrier_sensitive = true;
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }
}

/// Aggregated outcome of a validation pass
///
/// `is_valid` is true exactly when there are no errors; warnings and
/// informational issues never block submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub error_count: usize,
    pub warning_count: usize,
    pub info_count: usize,
    pub issues: Vec<ValidationIssue>,
    pub by_category: BTreeMap<IssueCategory, usize>,
    pub by_zone: BTreeMap<ZoneId, usize>,
}

impl ValidationResult {
    pub fn from_issues(issues: Vec<ValidationIssue>) -> Self {
        let count = |severity: Severity| issues.iter().filter(|i| i.severity == severity).count();
        let error_count = count(Severity::Error);
        let warning_count = count(Severity::Warning);
        let info_count = count(Severity::Info);

        let mut by_category = BTreeMap::new();
        let mut by_zone = BTreeMap::new();
        for issue in &issues {
            *by_category.entry(issue.category).or_insert(0) += 1;
            if let Some(zone_id) = issue.zone_id {
                *by_zone.entry(zone_id).or_insert(0) += 1;
            }
        }

        Self {
            is_valid: error_count == 0,
            error_count,
            warning_count,
            info_count,
            issues,
            by_category,
            by_zone,
        }
    }

    pub fn errors(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.with_severity(Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.with_severity(Severity::Warning)
    }

    pub fn with_severity(&self, severity: Severity) -> impl Iterator<Item = &ValidationIssue> {
        self.issues.iter().filter(move |i| i.severity == severity)
    }

    pub fn with_code<'a>(&'a self, code: &'a str) -> impl Iterator<Item = &'a ValidationIssue> {
        self.issues.iter().filter(move |i| i.code == code)
    }

    pub fn has_code(&self, code: &str) -> bool {
        self.issues.iter().any(|i| i.code == code)
    }
}
