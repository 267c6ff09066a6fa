//! Estimate Domain
//!
//! This crate turns room geometry and catalog line items into a priced,
//! depreciated settlement:
//!
//! ```text
//! zones -> metrics -> formula quantities -> pricing -> depreciation -> settlement
//! ```
//!
//! Everything here is synchronous and pure; persistence and rule data are
//! supplied by the caller.

pub mod zone;
pub mod metrics;
pub mod formula;
pub mod coverage;
pub mod catalog;
pub mod depreciation;
pub mod line_item;
pub mod pricing;
pub mod settlement;
pub mod estimate;
pub mod recalculation;
pub mod error;

pub use zone::{Zone, ZoneType, DamageType, DamageSeverity, WaterCategory, Pitch, MissingWall, Subroom};
pub use metrics::{Metric, ZoneMetrics, calculate_zone_metrics};
pub use formula::{
    FormulaError, FormulaValidation, QuantityCalculation, calculate_quantity_from_metrics, validate_formula,
};
pub use coverage::CoverageCode;
pub use catalog::{Catalog, CostComponents, LineItemDefinition, Unit};
pub use depreciation::{
    DepreciationInput, DepreciationResult, DepreciationType, ItemCondition, calculate_depreciation,
    is_depreciable_category, useful_life_years,
};
pub use line_item::{CalculatedLineItem, EstimateLineItem, QuantitySource};
pub use pricing::{LineItemPricing, price_line_item};
pub use settlement::{
    CarrierProfile, CoverageSummary, DeductibleSchedule, JurisdictionProfile, SettlementSummary,
    calculate_settlement,
};
pub use estimate::{Estimate, EstimateStatus};
pub use recalculation::{EstimateCalculator, QuantityResolution, Recalculation, resolve_quantity};
pub use error::EstimateError;
