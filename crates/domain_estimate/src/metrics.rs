//! Zone metrics calculation
//!
//! Turns a zone's dimensions, openings and subrooms into the measurements
//! that catalog quantity formulas are written against. The calculation is
//! pure and total: missing dimensions count as zero and no input makes it
//! fail.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::zone::Zone;

/// Metric names exposed to the formula language
///
/// These names are part of the catalog contract: authored formulas refer to
/// them verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Metric {
    #[serde(rename = "FLOOR_SF")]
    FloorSf,
    #[serde(rename = "WALL_SF")]
    WallSf,
    #[serde(rename = "CEILING_SF")]
    CeilingSf,
    #[serde(rename = "PERIMETER_LF")]
    PerimeterLf,
    #[serde(rename = "ROOF_SF")]
    RoofSf,
}

impl Metric {
    pub const ALL: [Metric; 5] = [
        Metric::FloorSf,
        Metric::WallSf,
        Metric::CeilingSf,
        Metric::PerimeterLf,
        Metric::RoofSf,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Metric::FloorSf => "FLOOR_SF",
            Metric::WallSf => "WALL_SF",
            Metric::CeilingSf => "CEILING_SF",
            Metric::PerimeterLf => "PERIMETER_LF",
            Metric::RoofSf => "ROOF_SF",
        }
    }

    pub fn from_name(name: &str) -> Option<Metric> {
        Metric::ALL.into_iter().find(|m| m.name() == name)
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Metric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Metric::from_name(s).ok_or_else(|| format!("Unknown metric: {}", s))
    }
}

/// Measurements derived from a zone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ZoneMetrics {
    pub floor_square_feet: Decimal,
    pub ceiling_square_feet: Decimal,
    /// Net wall area after openings, never negative
    pub wall_square_feet: Decimal,
    /// Wall area before openings
    pub gross_wall_square_feet: Decimal,
    /// Area removed by openings
    pub missing_wall_square_feet: Decimal,
    pub perimeter_linear_feet: Decimal,
    pub height_feet: Decimal,
    pub volume_cubic_feet: Decimal,
    /// Sloped roof area, present for roof zones only
    pub roof_square_feet: Option<Decimal>,
    /// Roof area in roofing squares (100 SF)
    pub roof_squares: Option<Decimal>,
}

impl ZoneMetrics {
    /// Looks up a formula metric; `None` when the zone has no such measurement
    pub fn get(&self, metric: Metric) -> Option<Decimal> {
        match metric {
            Metric::FloorSf => Some(self.floor_square_feet),
            Metric::WallSf => Some(self.wall_square_feet),
            Metric::CeilingSf => Some(self.ceiling_square_feet),
            Metric::PerimeterLf => Some(self.perimeter_linear_feet),
            Metric::RoofSf => self.roof_square_feet,
        }
    }

    /// Roof area if present, otherwise the floor footprint
    pub fn roof_or_floor_square_feet(&self) -> Decimal {
        self.roof_square_feet.unwrap_or(self.floor_square_feet)
    }
}

/// Calculates floor, ceiling, wall, perimeter and roof measurements
///
/// - floor = length × width, plus addition subrooms, minus cutouts (never negative)
/// - ceiling = floor
/// - perimeter = 2 × (length + width)
/// - wall = max(0, perimeter × height − opening area)
/// - roof = floor × pitch multiplier, for roof zones
pub fn calculate_zone_metrics(zone: &Zone) -> ZoneMetrics {
    let length = zone.length_ft.unwrap_or_default();
    let width = zone.width_ft.unwrap_or_default();
    let height = zone.height_ft.unwrap_or_default();

    let subroom_adjustment: Decimal = zone.subrooms.iter().map(|s| s.signed_footprint()).sum();
    let floor = (length * width + subroom_adjustment).max(Decimal::ZERO);

    let perimeter = dec!(2) * (length + width);
    let gross_wall = perimeter * height;
    let missing: Decimal = zone
        .missing_walls
        .iter()
        .map(|w| w.effective_area(zone.height_ft))
        .sum();
    let wall = (gross_wall - missing).max(Decimal::ZERO);

    let roof = zone.is_roof().then(|| {
        let multiplier = zone.pitch.map(|p| p.multiplier()).unwrap_or(Decimal::ONE);
        round(floor * multiplier)
    });

    ZoneMetrics {
        floor_square_feet: round(floor),
        ceiling_square_feet: round(floor),
        wall_square_feet: round(wall),
        gross_wall_square_feet: round(gross_wall),
        missing_wall_square_feet: round(missing),
        perimeter_linear_feet: round(perimeter),
        height_feet: round(height),
        volume_cubic_feet: round(floor * height),
        roof_square_feet: roof,
        roof_squares: roof.map(|r| round(r / dec!(100))),
    }
}

fn round(value: Decimal) -> Decimal {
    value.round_dp(2)
}
