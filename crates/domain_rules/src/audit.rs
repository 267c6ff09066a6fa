//! Applied rules and the append-only audit trail
//!
//! Each automated change is recorded twice: as an [`AppliedRule`] on the line
//! item's result and as an [`AuditEntry`] in the estimate's [`AuditLog`]. An
//! entry carries both the original and the modified value, so the trail can
//! be read back without re-running the engine.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use core_kernel::{AuditEntryId, EstimateId, LineItemId, RuleId};

use crate::model::{EffectType, RuleSource};

/// A rule that changed a line item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedRule {
    pub rule_id: RuleId,
    pub rule_name: String,
    pub rule_source: RuleSource,
    pub effect_type: EffectType,
    pub original_value: Value,
    pub modified_value: Value,
    pub explanation: String,
}

/// One immutable row of the compliance trail
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: AuditEntryId,
    /// Position within the evaluation pass, starting at 1
    pub sequence: u64,
    pub estimate_id: EstimateId,
    pub line_item_id: LineItemId,
    pub line_item_code: String,
    pub rule_id: RuleId,
    pub rule_source: RuleSource,
    pub effect_type: EffectType,
    pub original_value: Value,
    pub modified_value: Value,
    pub explanation: String,
    pub recorded_at: DateTime<Utc>,
}

/// Append-only log of audit entries for one evaluation pass
///
/// Entries can be appended and read, never edited or removed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditLog {
    estimate_id: EstimateId,
    recorded_at: DateTime<Utc>,
    entries: Vec<AuditEntry>,
}

impl AuditLog {
    pub fn new(estimate_id: EstimateId, recorded_at: DateTime<Utc>) -> Self {
        Self {
            estimate_id,
            recorded_at,
            entries: Vec::new(),
        }
    }

    /// Records an applied rule against a line item
    ///
    /// Entry ids are derived from the estimate, pass timestamp, sequence,
    /// item and rule. Replaying a pass yields the same log; a later pass over
    /// the same estimate yields new ids.
    pub fn record(&mut self, line_item_id: LineItemId, line_item_code: &str, applied: &AppliedRule) -> &AuditEntry {
        let sequence = self.entries.len() as u64 + 1;
        let name = format!(
            "{}:{}:{}:{}",
            self.recorded_at.to_rfc3339_opts(SecondsFormat::Nanos, true),
            sequence,
            line_item_id.as_uuid(),
            applied.rule_id.as_uuid()
        );
        let id = AuditEntryId::derived(self.estimate_id.as_uuid(), &name);

        self.entries.push(AuditEntry {
            id,
            sequence,
            estimate_id: self.estimate_id,
            line_item_id,
            line_item_code: line_item_code.to_string(),
            rule_id: applied.rule_id,
            rule_source: applied.rule_source,
            effect_type: applied.effect_type,
            original_value: applied.original_value.clone(),
            modified_value: applied.modified_value.clone(),
            explanation: applied.explanation.clone(),
            recorded_at: self.recorded_at,
        });
        &self.entries[self.entries.len() - 1]
    }

    pub fn estimate_id(&self) -> EstimateId {
        self.estimate_id
    }

    pub fn entries(&self) -> &[AuditEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &AuditEntry> {
        self.entries.iter()
    }

    pub fn for_line_item(&self, line_item_id: LineItemId) -> impl Iterator<Item = &AuditEntry> {
        self.entries.iter().filter(move |e| e.line_item_id == line_item_id)
    }

    pub fn into_entries(self) -> Vec<AuditEntry> {
        self.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn applied() -> AppliedRule {
        AppliedRule {
            rule_id: RuleId::new(),
            rule_name: "Roof cap".to_string(),
            rule_source: RuleSource::Carrier,
            effect_type: EffectType::CapQuantity,
            original_value: json!("40"),
            modified_value: json!("30"),
            explanation: "Quantity capped from 40 to 30".to_string(),
        }
    }

    #[test]
    fn test_sequence_and_deterministic_ids() {
        let estimate_id = EstimateId::new();
        let at = Utc::now();
        let item = LineItemId::new();
        let rule = applied();

        let mut first = AuditLog::new(estimate_id, at);
        first.record(item, "RFG-240", &rule);
        first.record(item, "RFG-240", &rule);

        let mut second = AuditLog::new(estimate_id, at);
        second.record(item, "RFG-240", &rule);
        second.record(item, "RFG-240", &rule);

        assert_eq!(first, second);
        assert_eq!(first.entries()[1].sequence, 2);
        assert_ne!(first.entries()[0].id, first.entries()[1].id);
        assert_eq!(first.for_line_item(item).count(), 2);
    }

    #[test]
    fn test_later_pass_gets_new_ids() {
        let estimate_id = EstimateId::new();
        let at = Utc::now();
        let item = LineItemId::new();
        let rule = applied();

        let mut first = AuditLog::new(estimate_id, at);
        first.record(item, "RFG-240", &rule);

        let mut later = AuditLog::new(estimate_id, at + chrono::Duration::microseconds(1));
        later.record(item, "RFG-240", &rule);

        assert_eq!(first.entries()[0].sequence, later.entries()[0].sequence);
        assert_ne!(first.entries()[0].id, later.entries()[0].id);
    }
}
