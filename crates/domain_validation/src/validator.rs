//! Estimate validator
//!
//! A lint pass over the recalculated line items. Each check contributes zero
//! or more [`ValidationIssue`]s; the result is valid exactly when no check
//! reported an error. Only a missing, zero, or unresolvable quantity is an
//! error. Everything else is advisory.
//!
//! Extended validation folds a rules pass into the same result: denied and
//! adjusted items become carrier or jurisdiction issues, required documents
//! become documentation issues, and a degraded pass is reported once.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::{BTreeMap, BTreeSet};

use core_kernel::ZoneId;
use domain_estimate::{
    useful_life_years, CalculatedLineItem, Catalog, DepreciationType, LineItemDefinition, Unit, ZoneMetrics,
};
use domain_rules::{AppliedRule, EffectType, RuleSource, RuleStatus, RulesOutcome};

use crate::config::ValidatorConfig;
use crate::issue::{codes, IssueCategory, ValidationIssue, ValidationResult};

/// Runs the structural checks against a catalog and configuration
pub struct EstimateValidator<'a> {
    catalog: &'a Catalog,
    config: &'a ValidatorConfig,
}

impl<'a> EstimateValidator<'a> {
    pub fn new(catalog: &'a Catalog, config: &'a ValidatorConfig) -> Self {
        Self { catalog, config }
    }

    /// Structural validation of priced items
    pub fn validate(
        &self,
        items: &[CalculatedLineItem],
        zone_metrics: &BTreeMap<ZoneId, ZoneMetrics>,
    ) -> ValidationResult {
        ValidationResult::from_issues(self.structural_issues(items, zone_metrics))
    }

    /// Structural validation merged with the outcome of a rules pass
    pub fn validate_extended(
        &self,
        items: &[CalculatedLineItem],
        zone_metrics: &BTreeMap<ZoneId, ZoneMetrics>,
        rules: &RulesOutcome,
    ) -> ValidationResult {
        let mut issues = self.structural_issues(items, zone_metrics);
        issues.extend(rule_issues(rules));
        ValidationResult::from_issues(issues)
    }

    fn structural_issues(
        &self,
        items: &[CalculatedLineItem],
        zone_metrics: &BTreeMap<ZoneId, ZoneMetrics>,
    ) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();
        issues.extend(self.check_dependencies(items));
        issues.extend(self.check_quantities(items, zone_metrics));
        issues.extend(self.check_exclusions(items));
        issues.extend(self.check_replacements(items));
        issues.extend(self.check_completeness(items));
        issues.extend(self.check_depreciation(items));
        issues.extend(self.check_coverage(items));
        issues
    }

    /// Items whose required companions are not in the estimate
    ///
    /// Reported once per requiring code, against the first zone it appears in.
    pub fn check_dependencies(&self, items: &[CalculatedLineItem]) -> Vec<ValidationIssue> {
        let present = present_codes(items);
        let mut reported: BTreeSet<&str> = BTreeSet::new();
        definitions(self.catalog, items)
            .filter_map(|(item, def)| {
                if reported.contains(item.code.as_str()) {
                    return None;
                }
                let missing: Vec<&str> = def
                    .requires_items
                    .iter()
                    .map(String::as_str)
                    .filter(|code| !present.contains(code))
                    .collect();
                if missing.is_empty() {
                    return None;
                }
                reported.insert(item.code.as_str());
                Some(
                    ValidationIssue::warning(
                        codes::DEP001,
                        IssueCategory::Dependency,
                        format!("{} requires {} which is not in the estimate", item.code, missing.join(", ")),
                    )
                    .with_items(std::iter::once(item.code.as_str()).chain(missing.iter().copied()))
                    .in_zone(item.zone_id)
                    .carrier_sensitive()
                    .with_suggestion(format!("Add {} or document why it is not needed", missing.join(", "))),
                )
            })
            .collect()
    }

    /// Missing, zero or implausibly large quantities
    pub fn check_quantities(
        &self,
        items: &[CalculatedLineItem],
        zone_metrics: &BTreeMap<ZoneId, ZoneMetrics>,
    ) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();
        for item in items {
            if let Some(error) = &item.formula_error {
                issues.push(
                    ValidationIssue::error(
                        codes::QTY003,
                        IssueCategory::Quantity,
                        format!("{}: {}", item.code, error),
                    )
                    .with_items([item.code.as_str()])
                    .in_zone(item.zone_id)
                    .with_suggestion("Correct the catalog formula or enter the quantity manually"),
                );
                continue;
            }

            if item.quantity <= Decimal::ZERO {
                issues.push(
                    ValidationIssue::error(
                        codes::QTY002,
                        IssueCategory::Quantity,
                        format!("{} has quantity {}; quantities must be greater than zero", item.code, item.quantity),
                    )
                    .with_items([item.code.as_str()])
                    .in_zone(item.zone_id)
                    .with_suggestion("Enter a quantity or remove the line item"),
                );
                continue;
            }

            let metrics = item.zone_id.and_then(|zone_id| zone_metrics.get(&zone_id));
            if let Some(maximum) = self.plausible_maximum(item.unit, metrics) {
                if item.quantity > maximum {
                    issues.push(
                        ValidationIssue::warning(
                            codes::QTY001,
                            IssueCategory::Quantity,
                            format!(
                                "{} quantity {} {} exceeds the plausible maximum of {} {}",
                                item.code, item.quantity, item.unit, maximum, item.unit
                            ),
                        )
                        .with_items([item.code.as_str()])
                        .in_zone(item.zone_id)
                        .with_suggestion("Verify the measurement against the zone dimensions"),
                    );
                }
            }
        }
        issues
    }

    /// Largest quantity that is plausible for the unit in the zone
    ///
    /// Area and length units scale with the zone geometry and are not checked
    /// without it; count and time units are bounded by the multiplier alone.
    pub fn plausible_maximum(&self, unit: Unit, metrics: Option<&ZoneMetrics>) -> Option<Decimal> {
        let basis = match unit {
            Unit::SF => metrics.map(|m| m.floor_square_feet + m.ceiling_square_feet + m.wall_square_feet)?,
            Unit::LF => metrics.map(|m| m.perimeter_linear_feet)?,
            Unit::SY => metrics.map(|m| m.floor_square_feet / dec!(9))?,
            Unit::SQ => metrics.map(|m| m.roof_or_floor_square_feet() / dec!(100))?,
            Unit::EA | Unit::HR | Unit::DAY | Unit::WK => Decimal::ONE,
        };
        if basis <= Decimal::ZERO {
            return None;
        }
        Some((basis * self.config.multiplier_for(unit)).round_dp(2))
    }

    /// Mutually exclusive codes present together, once per unordered pair
    pub fn check_exclusions(&self, items: &[CalculatedLineItem]) -> Vec<ValidationIssue> {
        let present = present_codes(items);
        let mut conflicts: BTreeSet<(&str, &str)> = BTreeSet::new();
        for (item, def) in definitions(self.catalog, items) {
            for excluded in &def.excludes_items {
                if excluded != &item.code && present.contains(excluded.as_str()) {
                    conflicts.insert(pair_key(&item.code, excluded));
                }
            }
        }

        conflicts
            .into_iter()
            .map(|(first, second)| {
                ValidationIssue::warning(
                    codes::EXC001,
                    IssueCategory::Exclusion,
                    format!("{} and {} should not be billed together", first, second),
                )
                .with_items([first, second])
                .with_suggestion(format!("Remove either {} or {}", first, second))
            })
            .collect()
    }

    /// A replacing code present alongside the code it replaces
    pub fn check_replacements(&self, items: &[CalculatedLineItem]) -> Vec<ValidationIssue> {
        let present = present_codes(items);
        let mut pairs: BTreeSet<(&str, &str)> = BTreeSet::new();
        for (item, def) in definitions(self.catalog, items) {
            for replaced in &def.replaces_items {
                if replaced != &item.code && present.contains(replaced.as_str()) {
                    pairs.insert((item.code.as_str(), replaced.as_str()));
                }
            }
        }

        pairs
            .into_iter()
            .map(|(replacer, replaced)| {
                ValidationIssue::warning(
                    codes::REP001,
                    IssueCategory::Replacement,
                    format!("{} replaces {}; both are in the estimate", replacer, replaced),
                )
                .with_items([replacer, replaced])
                .with_suggestion(format!("Remove {}", replaced))
            })
            .collect()
    }

    /// Known pairings with every companion missing, and standalone items
    /// without any predecessor
    pub fn check_completeness(&self, items: &[CalculatedLineItem]) -> Vec<ValidationIssue> {
        let present = present_codes(items);
        let mut issues = Vec::new();

        for pairing in &self.config.companions {
            if present.contains(pairing.code.as_str())
                && !pairing.companions.is_empty()
                && pairing.companions.iter().all(|c| !present.contains(c.as_str()))
            {
                issues.push(
                    ValidationIssue::info(
                        codes::CMP001,
                        IssueCategory::Completeness,
                        format!(
                            "{} is usually accompanied by {}",
                            pairing.code,
                            pairing.companions.join(", ")
                        ),
                    )
                    .with_items([pairing.code.as_str()]),
                );
            }
        }

        for standalone in &self.config.standalone_items {
            if present.contains(standalone.code.as_str())
                && standalone.companions.iter().all(|c| !present.contains(c.as_str()))
            {
                issues.push(
                    ValidationIssue::info(
                        codes::CMP002,
                        IssueCategory::Completeness,
                        format!(
                            "{} normally follows {}, none of which is in the estimate",
                            standalone.code,
                            standalone.companions.join(" or ")
                        ),
                    )
                    .with_items([standalone.code.as_str()]),
                );
            }
        }
        issues
    }

    /// Undocumented manual depreciation, items past their useful life, and
    /// heavy depreciation without a recorded age
    pub fn check_depreciation(&self, items: &[CalculatedLineItem]) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();
        for item in items {
            let reason_missing = item
                .depreciation_reason
                .as_deref()
                .map(|r| r.trim().is_empty())
                .unwrap_or(true);
            if item.manual_depreciation_pct.is_some() && reason_missing {
                issues.push(
                    ValidationIssue::info(
                        codes::DPR001,
                        IssueCategory::Depreciation,
                        format!("{} has a manual depreciation percentage without a reason", item.code),
                    )
                    .with_items([item.code.as_str()])
                    .in_zone(item.zone_id)
                    .with_suggestion("Record why the depreciation was overridden"),
                );
            }

            if item.depreciation_type != DepreciationType::None {
                if let (Some(age), Some(life)) = (item.age_years, useful_life_years(&item.category_code)) {
                    if age > life {
                        issues.push(
                            ValidationIssue::warning(
                                codes::DPR002,
                                IssueCategory::Depreciation,
                                format!(
                                    "{} is {} years old, beyond its {}-year useful life",
                                    item.code, age, life
                                ),
                            )
                            .with_items([item.code.as_str()])
                            .in_zone(item.zone_id),
                        );
                    }
                }
            }

            if item.depreciation.depreciation_pct > self.config.high_depreciation_threshold && item.age_years.is_none() {
                issues.push(
                    ValidationIssue::warning(
                        codes::DPR003,
                        IssueCategory::Depreciation,
                        format!(
                            "{} is depreciated {}% without a documented age",
                            item.code, item.depreciation.depreciation_pct
                        ),
                    )
                    .with_items([item.code.as_str()])
                    .in_zone(item.zone_id)
                    .carrier_sensitive()
                    .with_suggestion("Record the item's age to support the depreciation"),
                );
            }
        }
        issues
    }

    /// Items without a coverage code, reported once with a few examples
    pub fn check_coverage(&self, items: &[CalculatedLineItem]) -> Vec<ValidationIssue> {
        let uncovered: Vec<&CalculatedLineItem> = items.iter().filter(|i| i.coverage_code.is_none()).collect();
        if uncovered.is_empty() {
            return Vec::new();
        }
        let examples: Vec<&str> = uncovered
            .iter()
            .take(self.config.max_coverage_examples)
            .map(|i| i.code.as_str())
            .collect();
        vec![ValidationIssue::info(
            codes::COV001,
            IssueCategory::Coverage,
            format!(
                "{} line item(s) have no coverage code and settle under Coverage A (e.g. {})",
                uncovered.len(),
                examples.join(", ")
            ),
        )
        .with_items(examples)
        .with_suggestion("Assign a coverage code to each line item")]
    }
}

/// Converts a rules pass into validation issues
pub fn rule_issues(rules: &RulesOutcome) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();

    if let Some(reason) = &rules.degraded {
        issues.push(
            ValidationIssue::info(
                codes::RUL001,
                IssueCategory::Rules,
                format!("Carrier rules could not be applied: {}", reason),
            )
            .carrier_sensitive()
            .with_suggestion("Review the carrier rule configuration"),
        );
    }

    for result in &rules.results {
        if result.status == RuleStatus::Denied {
            if let Some(rule) = result.applied_rules.iter().find(|r| r.effect_type == EffectType::Exclude) {
                let (code, category) = by_source(rule.rule_source, codes::CAR001, codes::JUR001);
                issues.push(
                    ValidationIssue::warning(
                        code,
                        category,
                        format!("{} is denied: {}", result.code, rule.explanation),
                    )
                    .with_items([result.code.as_str()])
                    .in_zone(result.zone_id)
                    .carrier_sensitive(),
                );
            }
            continue;
        }

        for source in [RuleSource::Carrier, RuleSource::Jurisdiction] {
            let adjustments: Vec<&AppliedRule> = result
                .applied_rules
                .iter()
                .filter(|r| r.rule_source == source && is_adjustment(r.effect_type))
                .collect();
            if adjustments.is_empty() {
                continue;
            }
            let (code, category) = by_source(source, codes::CAR002, codes::JUR002);
            let explanations: Vec<&str> = adjustments.iter().map(|r| r.explanation.as_str()).collect();
            issues.push(
                ValidationIssue::info(
                    code,
                    category,
                    format!("{} was adjusted: {}", result.code, explanations.join("; ")),
                )
                .with_items([result.code.as_str()])
                .in_zone(result.zone_id)
                .carrier_sensitive(),
            );
        }

        if !result.required_documents.is_empty() {
            issues.push(
                ValidationIssue::warning(
                    codes::DOC001,
                    IssueCategory::Documentation,
                    format!(
                        "{} requires documentation: {}",
                        result.code,
                        result.required_documents.join(", ")
                    ),
                )
                .with_items([result.code.as_str()])
                .in_zone(result.zone_id)
                .carrier_sensitive()
                .with_suggestion("Attach the listed documents before submission"),
            );
        }
    }
    issues
}

fn is_adjustment(effect_type: EffectType) -> bool {
    matches!(
        effect_type,
        EffectType::CapQuantity | EffectType::CapCost | EffectType::ModifyPct
    )
}

fn by_source(source: RuleSource, carrier: &'static str, jurisdiction: &'static str) -> (&'static str, IssueCategory) {
    match source {
        RuleSource::Carrier => (carrier, IssueCategory::Carrier),
        RuleSource::Jurisdiction => (jurisdiction, IssueCategory::Jurisdiction),
    }
}

fn definitions<'i>(
    catalog: &'i Catalog,
    items: &'i [CalculatedLineItem],
) -> impl Iterator<Item = (&'i CalculatedLineItem, &'i LineItemDefinition)> + 'i {
    items
        .iter()
        .filter_map(move |item| catalog.get(&item.code).map(|def| (item, def)))
}

fn present_codes(items: &[CalculatedLineItem]) -> BTreeSet<&str> {
    items.iter().map(|i| i.code.as_str()).collect()
}

/// Order-independent key for a pair of codes
fn pair_key<'c>(a: &'c str, b: &'c str) -> (&'c str, &'c str) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_kernel::Currency;
    use domain_estimate::{CostComponents, EstimateCalculator, EstimateLineItem, Zone};

    fn definition(code: &str, category: &str, unit: Unit) -> LineItemDefinition {
        LineItemDefinition::new(
            code,
            code,
            category,
            unit,
            CostComponents::new(dec!(1), dec!(1), Decimal::ZERO),
            category,
        )
    }

    fn catalog() -> Catalog {
        let mut drywall = definition("DRY-1/2", "DRY", Unit::SF);
        drywall.requires_items = vec!["DRY-TAPE".to_string()];
        drywall.excludes_items = vec!["DRY-PATCH".to_string()];
        let mut patch = definition("DRY-PATCH", "DRY", Unit::EA);
        patch.excludes_items = vec!["DRY-1/2".to_string()];
        let mut laminate = definition("FCV-LAM", "FCV", Unit::SF);
        laminate.replaces_items = vec!["FCV-VINYL".to_string()];

        vec![
            drywall,
            patch,
            laminate,
            definition("FCV-VINYL", "FCV", Unit::SF),
            definition("DRY-TAPE", "DRY", Unit::SF),
            definition("CLN-FINAL", "CLN", Unit::HR),
        ]
        .into()
    }

    fn priced(catalog: &Catalog, item: EstimateLineItem) -> CalculatedLineItem {
        EstimateCalculator::new(catalog)
            .calculate_item(&item, None, Currency::USD)
            .unwrap()
    }

    #[test]
    fn test_missing_dependency_is_carrier_sensitive_warning() {
        let catalog = catalog();
        let config = ValidatorConfig::default();
        let items = vec![priced(&catalog, EstimateLineItem::new("DRY-1/2").with_quantity(dec!(100)))];

        let issues = EstimateValidator::new(&catalog, &config).check_dependencies(&items);
        assert_eq!(issues.len(), 1);
        assert!(issues[0].carrier_sensitive);
        assert_eq!(issues[0].related_items, vec!["DRY-1/2", "DRY-TAPE"]);
    }

    #[test]
    fn test_missing_dependency_reported_once_across_zones() {
        let catalog = catalog();
        let config = ValidatorConfig::default();
        let zones: Vec<ZoneId> = (0..3).map(|_| ZoneId::new()).collect();
        let items: Vec<CalculatedLineItem> = zones
            .iter()
            .map(|zone_id| {
                priced(
                    &catalog,
                    EstimateLineItem::new("DRY-1/2").in_zone(*zone_id).with_quantity(dec!(100)),
                )
            })
            .collect();

        let issues = EstimateValidator::new(&catalog, &config).check_dependencies(&items);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].code, codes::DEP001);
        assert_eq!(issues[0].zone_id, Some(zones[0]));
    }

    #[test]
    fn test_exclusion_pair_reported_once_when_both_sides_declare_it() {
        let catalog = catalog();
        let config = ValidatorConfig::default();
        let items = vec![
            priced(&catalog, EstimateLineItem::new("DRY-PATCH").with_quantity(dec!(2))),
            priced(&catalog, EstimateLineItem::new("DRY-1/2").with_quantity(dec!(100))),
        ];

        let issues = EstimateValidator::new(&catalog, &config).check_exclusions(&items);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].related_items, vec!["DRY-1/2", "DRY-PATCH"]);
    }

    #[test]
    fn test_replacement_conflict() {
        let catalog = catalog();
        let config = ValidatorConfig::default();
        let items = vec![
            priced(&catalog, EstimateLineItem::new("FCV-LAM").with_quantity(dec!(100))),
            priced(&catalog, EstimateLineItem::new("FCV-VINYL").with_quantity(dec!(100))),
        ];

        let issues = EstimateValidator::new(&catalog, &config).check_replacements(&items);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].code, codes::REP001);
    }

    #[test]
    fn test_plausible_maximum_by_unit() {
        let catalog = catalog();
        let config = ValidatorConfig::default();
        let validator = EstimateValidator::new(&catalog, &config);
        let metrics = Zone::room("Bedroom", dec!(12), dec!(10), dec!(8)).metrics();

        assert_eq!(validator.plausible_maximum(Unit::SF, Some(&metrics)), Some(dec!(888)));
        assert_eq!(validator.plausible_maximum(Unit::LF, Some(&metrics)), Some(dec!(88)));
        assert_eq!(validator.plausible_maximum(Unit::HR, None), Some(dec!(100)));
        assert_eq!(validator.plausible_maximum(Unit::SF, None), None);
    }

    #[test]
    fn test_time_units_checked_without_zone() {
        let catalog = catalog();
        let config = ValidatorConfig::default();
        let items = vec![priced(&catalog, EstimateLineItem::new("CLN-FINAL").with_quantity(dec!(150)))];

        let issues = EstimateValidator::new(&catalog, &config).check_quantities(&items, &BTreeMap::new());
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].code, codes::QTY001);
    }

    #[test]
    fn test_depreciation_checks() {
        let catalog = catalog();
        let config = ValidatorConfig::default();
        let manual = priced(
            &catalog,
            EstimateLineItem::new("DRY-1/2")
                .with_quantity(dec!(10))
                .with_depreciation(dec!(60), None),
        );
        let old = priced(
            &catalog,
            EstimateLineItem::new("FCV-VINYL")
                .with_quantity(dec!(10))
                .with_age(dec!(40), None),
        );

        let issues = EstimateValidator::new(&catalog, &config).check_depreciation(&[manual, old]);
        let found: Vec<&str> = issues.iter().map(|i| i.code.as_str()).collect();
        assert_eq!(found, vec![codes::DPR001, codes::DPR003, codes::DPR002]);
    }

    #[test]
    fn test_coverage_examples_are_capped() {
        let catalog = catalog();
        let mut config = ValidatorConfig::default();
        config.max_coverage_examples = 2;
        let items: Vec<CalculatedLineItem> = (0..4)
            .map(|_| priced(&catalog, EstimateLineItem::new("DRY-TAPE").with_quantity(dec!(10))))
            .collect();

        let issues = EstimateValidator::new(&catalog, &config).check_coverage(&items);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].related_items.len(), 2);
        assert!(issues[0].message.starts_with("4 line item(s)"));
    }
}
