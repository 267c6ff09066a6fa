//! Estimate aggregate
//!
//! An estimate is created as a draft, edited and recalculated freely, and
//! locked on submission. Once locked it is immutable to this core.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use core_kernel::{CarrierId, Currency, EstimateId, JurisdictionId, LineItemId, ZoneId};

use crate::error::EstimateError;
use crate::line_item::EstimateLineItem;
use crate::settlement::DeductibleSchedule;
use crate::zone::Zone;

/// Estimate lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EstimateStatus {
    Draft,
    InProgress,
    PendingReview,
    Approved,
    Rejected,
}

impl EstimateStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EstimateStatus::Draft => "draft",
            EstimateStatus::InProgress => "in_progress",
            EstimateStatus::PendingReview => "pending_review",
            EstimateStatus::Approved => "approved",
            EstimateStatus::Rejected => "rejected",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "draft" => Some(EstimateStatus::Draft),
            "in_progress" => Some(EstimateStatus::InProgress),
            "pending_review" => Some(EstimateStatus::PendingReview),
            "approved" => Some(EstimateStatus::Approved),
            "rejected" => Some(EstimateStatus::Rejected),
            _ => None,
        }
    }

    /// Statuses from which an estimate may be submitted
    pub fn can_submit(&self) -> bool {
        matches!(self, EstimateStatus::Draft | EstimateStatus::InProgress | EstimateStatus::Rejected)
    }
}

impl fmt::Display for EstimateStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A repair estimate for one claim
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Estimate {
    pub id: EstimateId,
    pub claim_number: String,
    pub carrier_id: CarrierId,
    pub jurisdiction_id: JurisdictionId,
    pub status: EstimateStatus,
    #[serde(default)]
    pub is_locked: bool,
    #[serde(default)]
    pub currency: Currency,
    #[serde(default)]
    pub zones: Vec<Zone>,
    #[serde(default)]
    pub line_items: Vec<EstimateLineItem>,
    #[serde(default)]
    pub deductibles: DeductibleSchedule,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub submitted_at: Option<DateTime<Utc>>,
}

impl Estimate {
    /// Creates a new draft estimate
    pub fn new(claim_number: impl Into<String>, carrier_id: CarrierId, jurisdiction_id: JurisdictionId) -> Self {
        let now = Utc::now();
        Self {
            id: EstimateId::new_v7(),
            claim_number: claim_number.into(),
            carrier_id,
            jurisdiction_id,
            status: EstimateStatus::Draft,
            is_locked: false,
            currency: Currency::default(),
            zones: Vec::new(),
            line_items: Vec::new(),
            deductibles: DeductibleSchedule::default(),
            created_at: now,
            updated_at: now,
            submitted_at: None,
        }
    }

    /// Fails if the estimate has been locked by submission
    pub fn ensure_mutable(&self) -> Result<(), EstimateError> {
        if self.is_locked {
            return Err(EstimateError::Locked(self.id.to_string()));
        }
        Ok(())
    }

    pub fn zone(&self, zone_id: ZoneId) -> Option<&Zone> {
        self.zones.iter().find(|z| z.id == zone_id)
    }

    pub fn line_item(&self, id: LineItemId) -> Option<&EstimateLineItem> {
        self.line_items.iter().find(|i| i.id == id)
    }

    /// Adds a zone after checking its geometry
    pub fn add_zone(&mut self, zone: Zone) -> Result<ZoneId, EstimateError> {
        self.ensure_mutable()?;
        zone.validate()?;
        let id = zone.id;
        self.zones.push(zone);
        self.touch();
        Ok(id)
    }

    /// Adds a line item; a referenced zone must already exist
    pub fn add_line_item(&mut self, item: EstimateLineItem) -> Result<LineItemId, EstimateError> {
        self.ensure_mutable()?;
        if let Some(zone_id) = item.zone_id {
            if self.zone(zone_id).is_none() {
                return Err(EstimateError::ZoneNotFound(zone_id.to_string()));
            }
        }
        let id = item.id;
        self.line_items.push(item);
        self.touch();
        Ok(id)
    }

    pub fn remove_line_item(&mut self, id: LineItemId) -> Result<EstimateLineItem, EstimateError> {
        self.ensure_mutable()?;
        let position = self
            .line_items
            .iter()
            .position(|i| i.id == id)
            .ok_or_else(|| EstimateError::LineItemNotFound(id.to_string()))?;
        self.touch();
        Ok(self.line_items.remove(position))
    }

    /// Locks the estimate and moves it to pending review
    pub fn mark_submitted(&mut self, at: DateTime<Utc>) -> Result<(), EstimateError> {
        self.ensure_mutable()?;
        if !self.status.can_submit() {
            return Err(EstimateError::InvalidStatusTransition {
                from: self.status.to_string(),
                to: EstimateStatus::PendingReview.to_string(),
            });
        }
        self.status = EstimateStatus::PendingReview;
        self.is_locked = true;
        self.submitted_at = Some(at);
        self.updated_at = at;
        Ok(())
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
        if self.status == EstimateStatus::Draft && !self.line_items.is_empty() {
            self.status = EstimateStatus::InProgress;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn estimate() -> Estimate {
        Estimate::new("CLM-1001", CarrierId::new(), JurisdictionId::new())
    }

    #[test]
    fn test_lifecycle() {
        let mut estimate = estimate();
        assert_eq!(estimate.status, EstimateStatus::Draft);

        let zone_id = estimate.add_zone(Zone::room("Kitchen", dec!(12), dec!(10), dec!(8))).unwrap();
        estimate
            .add_line_item(EstimateLineItem::new("DRY-1/2").in_zone(zone_id))
            .unwrap();
        assert_eq!(estimate.status, EstimateStatus::InProgress);

        estimate.mark_submitted(Utc::now()).unwrap();
        assert_eq!(estimate.status, EstimateStatus::PendingReview);
        assert!(estimate.is_locked);
        assert!(estimate.submitted_at.is_some());
    }

    #[test]
    fn test_locked_estimate_rejects_changes() {
        let mut estimate = estimate();
        estimate.mark_submitted(Utc::now()).unwrap();

        assert!(matches!(
            estimate.add_line_item(EstimateLineItem::new("DRY-1/2")),
            Err(EstimateError::Locked(_))
        ));
        assert!(matches!(estimate.mark_submitted(Utc::now()), Err(EstimateError::Locked(_))));
    }

    #[test]
    fn test_line_item_requires_known_zone() {
        let mut estimate = estimate();
        let result = estimate.add_line_item(EstimateLineItem::new("DRY-1/2").in_zone(ZoneId::new()));
        assert!(matches!(result, Err(EstimateError::ZoneNotFound(_))));
    }

    #[test]
    fn test_invalid_zone_rejected() {
        let mut estimate = estimate();
        let result = estimate.add_zone(Zone::room("Bad", dec!(0), dec!(10), dec!(8)));
        assert!(matches!(result, Err(EstimateError::InvalidGeometry { .. })));
    }

    #[test]
    fn test_approved_cannot_resubmit() {
        let mut estimate = estimate();
        estimate.status = EstimateStatus::Approved;
        assert!(matches!(
            estimate.mark_submitted(Utc::now()),
            Err(EstimateError::InvalidStatusTransition { .. })
        ));
    }
}
