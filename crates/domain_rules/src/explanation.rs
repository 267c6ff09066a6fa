//! Human-readable explanations of rule outcomes

use crate::engine::{LineItemRuleResult, RuleStatus};

/// Returned when no rule changed the item
pub const NO_RULES_APPLIED: &str = "No rules applied; the line item is allowed as entered.";

/// Renders a status sentence, one bullet per applied rule, and a documentation summary
///
/// ```text
/// Modified: RFG-240 was adjusted by 2 rules.
/// - [Carrier] Quantity capped from 40 to 30 SQ by Roof quantity
/// - [Jurisdiction] Documentation required: photos (Roof photos)
/// Documentation required: photos
/// ```
pub fn generate_explanation(result: &LineItemRuleResult) -> String {
    if result.applied_rules.is_empty() {
        return NO_RULES_APPLIED.to_string();
    }

    let count = result.applied_rules.len();
    let plural = if count == 1 { "rule" } else { "rules" };
    let headline = match result.status {
        RuleStatus::Denied => format!("Denied: {} is excluded and will not be paid.", result.code),
        RuleStatus::Modified => format!("Modified: {} was adjusted by {} {}.", result.code, count, plural),
        RuleStatus::Warning => format!("Warning: {} is allowed but needs supporting documentation.", result.code),
        RuleStatus::Allowed => format!("Allowed: {} passed {} {}.", result.code, count, plural),
    };

    let mut lines = vec![headline];
    lines.extend(
        result
            .applied_rules
            .iter()
            .map(|rule| format!("- [{}] {}", rule.rule_source.label(), rule.explanation)),
    );
    if !result.required_documents.is_empty() {
        lines.push(format!("Documentation required: {}", result.required_documents.join(", ")));
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::AppliedRule;
    use crate::model::{EffectType, RuleSource};
    use core_kernel::{LineItemId, RuleId};
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn result(status: RuleStatus, applied_rules: Vec<AppliedRule>, documents: Vec<String>) -> LineItemRuleResult {
        LineItemRuleResult {
            line_item_id: LineItemId::new(),
            code: "RFG-240".to_string(),
            zone_id: None,
            status,
            original_quantity: dec!(40),
            adjusted_quantity: dec!(30),
            original_unit_price: dec!(250),
            adjusted_unit_price: dec!(250),
            applied_rules,
            required_documents: documents,
        }
    }

    fn applied(source: RuleSource, effect_type: EffectType, explanation: &str) -> AppliedRule {
        AppliedRule {
            rule_id: RuleId::new(),
            rule_name: "rule".to_string(),
            rule_source: source,
            effect_type,
            original_value: json!(null),
            modified_value: json!(null),
            explanation: explanation.to_string(),
        }
    }

    #[test]
    fn test_no_rules() {
        let text = generate_explanation(&result(RuleStatus::Allowed, vec![], vec![]));
        assert_eq!(text, NO_RULES_APPLIED);
    }

    #[test]
    fn test_modified_with_documentation() {
        let text = generate_explanation(&result(
            RuleStatus::Modified,
            vec![
                applied(RuleSource::Carrier, EffectType::CapQuantity, "Quantity capped from 40 to 30 SQ by Roof quantity"),
                applied(RuleSource::Jurisdiction, EffectType::RequireDoc, "Documentation required: photos (Roof photos)"),
            ],
            vec!["photos".to_string()],
        ));

        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Modified: RFG-240 was adjusted by 2 rules.");
        assert_eq!(lines[1], "- [Carrier] Quantity capped from 40 to 30 SQ by Roof quantity");
        assert!(lines[2].starts_with("- [Jurisdiction]"));
        assert_eq!(lines[3], "Documentation required: photos");
    }

    #[test]
    fn test_denied_headline() {
        let text = generate_explanation(&result(
            RuleStatus::Denied,
            vec![applied(RuleSource::Carrier, EffectType::Exclude, "RFG-240 excluded by No roofs")],
            vec![],
        ));
        assert!(text.starts_with("Denied: RFG-240"));
    }
}
