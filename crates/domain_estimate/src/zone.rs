//! Zones and the geometry modifiers attached to them
//!
//! A zone is a room, roof facet or exterior area being estimated. Openings
//! (missing walls) and subrooms belong to exactly one zone and are owned by
//! it, so they travel with the zone through recalculation.

use rust_decimal::{Decimal, MathematicalOps};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use core_kernel::ZoneId;
use crate::error::EstimateError;
use crate::metrics::{calculate_zone_metrics, ZoneMetrics};

/// Kind of area being estimated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZoneType {
    Room,
    Roof,
    Exterior,
    Subroom,
}

/// Cause of loss
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DamageType {
    Water,
    Fire,
    Smoke,
    Wind,
    Hail,
    Mold,
    Impact,
    Theft,
    Other,
}

impl DamageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DamageType::Water => "water",
            DamageType::Fire => "fire",
            DamageType::Smoke => "smoke",
            DamageType::Wind => "wind",
            DamageType::Hail => "hail",
            DamageType::Mold => "mold",
            DamageType::Impact => "impact",
            DamageType::Theft => "theft",
            DamageType::Other => "other",
        }
    }
}

impl fmt::Display for DamageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// IICRC water contamination class
///
/// Serialized as the bare category number (1, 2 or 3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum WaterCategory {
    /// Clean water
    Category1,
    /// Grey water
    Category2,
    /// Black water
    Category3,
}

impl TryFrom<u8> for WaterCategory {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(WaterCategory::Category1),
            2 => Ok(WaterCategory::Category2),
            3 => Ok(WaterCategory::Category3),
            other => Err(format!("water category must be 1, 2 or 3, got {}", other)),
        }
    }
}

impl From<WaterCategory> for u8 {
    fn from(category: WaterCategory) -> u8 {
        match category {
            WaterCategory::Category1 => 1,
            WaterCategory::Category2 => 2,
            WaterCategory::Category3 => 3,
        }
    }
}

impl fmt::Display for WaterCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Category {}", u8::from(*self))
    }
}

/// Damage severity recorded during inspection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DamageSeverity {
    Minor,
    Moderate,
    Severe,
}

/// Roof pitch expressed as rise over run (e.g. 6/12)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pitch {
    pub rise: Decimal,
    pub run: Decimal,
}

impl Pitch {
    pub fn new(rise: Decimal, run: Decimal) -> Self {
        Self { rise, run }
    }

    /// A flat roof
    pub fn flat() -> Self {
        Self::new(dec!(0), dec!(12))
    }

    /// Slope factor `sqrt(1 + (rise/run)^2)` applied to the footprint
    ///
    /// A non-positive run is treated as flat.
    pub fn multiplier(&self) -> Decimal {
        if self.run <= Decimal::ZERO {
            return Decimal::ONE;
        }
        let slope = self.rise / self.run;
        (Decimal::ONE + slope * slope).sqrt().unwrap_or(Decimal::ONE)
    }
}

impl FromStr for Pitch {
    type Err = EstimateError;

    /// Accepts `6/12`, `6:12`, or a bare rise such as `6` (over 12)
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let parse = |part: &str| {
            Decimal::from_str(part.trim())
                .map_err(|_| EstimateError::InvalidPitch(trimmed.to_string()))
        };

        let (rise, run) = match trimmed.split_once(['/', ':']) {
            Some((rise, run)) => (parse(rise)?, parse(run)?),
            None => (parse(trimmed)?, dec!(12)),
        };

        if rise.is_sign_negative() || run <= Decimal::ZERO {
            return Err(EstimateError::InvalidPitch(trimmed.to_string()));
        }
        Ok(Pitch::new(rise, run))
    }
}

impl fmt::Display for Pitch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.rise.normalize(), self.run.normalize())
    }
}

/// An opening that removes wall area from its zone
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissingWall {
    #[serde(default)]
    pub name: Option<String>,
    pub width_ft: Decimal,
    pub height_ft: Decimal,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
    #[serde(default)]
    pub goes_to_floor: bool,
    #[serde(default)]
    pub goes_to_ceiling: bool,
}

fn default_quantity() -> u32 {
    1
}

impl MissingWall {
    pub fn new(width_ft: Decimal, height_ft: Decimal) -> Self {
        Self {
            name: None,
            width_ft,
            height_ft,
            quantity: 1,
            goes_to_floor: false,
            goes_to_ceiling: false,
        }
    }

    /// A floor-to-ceiling opening, such as a removed partition wall
    pub fn full_height(width_ft: Decimal) -> Self {
        Self {
            goes_to_floor: true,
            goes_to_ceiling: true,
            ..Self::new(width_ft, Decimal::ZERO)
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn times(mut self, quantity: u32) -> Self {
        self.quantity = quantity;
        self
    }

    pub fn to_floor(mut self) -> Self {
        self.goes_to_floor = true;
        self
    }

    pub fn to_ceiling(mut self) -> Self {
        self.goes_to_ceiling = true;
        self
    }

    /// Wall area removed by this opening in a zone of the given height
    ///
    /// An opening running from floor to ceiling spans the full zone height;
    /// any other opening removes its own height, never more than the zone's.
    pub fn effective_area(&self, zone_height: Option<Decimal>) -> Decimal {
        let height = match zone_height {
            Some(zone_height) if self.goes_to_floor && self.goes_to_ceiling => zone_height,
            Some(zone_height) => self.height_ft.min(zone_height),
            None => self.height_ft,
        };
        self.width_ft * height * Decimal::from(self.quantity)
    }
}

/// A secondary area (closet, bay, alcove) attached to a zone
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subroom {
    #[serde(default)]
    pub name: Option<String>,
    pub length_ft: Decimal,
    pub width_ft: Decimal,
    #[serde(default)]
    pub height_ft: Option<Decimal>,
    /// Adds to the parent footprint when true, subtracts otherwise
    pub is_addition: bool,
}

impl Subroom {
    pub fn addition(length_ft: Decimal, width_ft: Decimal) -> Self {
        Self {
            name: None,
            length_ft,
            width_ft,
            height_ft: None,
            is_addition: true,
        }
    }

    pub fn cutout(length_ft: Decimal, width_ft: Decimal) -> Self {
        Self {
            is_addition: false,
            ..Self::addition(length_ft, width_ft)
        }
    }

    pub fn footprint(&self) -> Decimal {
        self.length_ft * self.width_ft
    }

    /// Footprint with its sign: positive for additions, negative for cutouts
    pub fn signed_footprint(&self) -> Decimal {
        if self.is_addition {
            self.footprint()
        } else {
            -self.footprint()
        }
    }
}

/// A room or geometric area being estimated
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Zone {
    pub id: ZoneId,
    pub name: String,
    pub zone_type: ZoneType,
    #[serde(default)]
    pub length_ft: Option<Decimal>,
    #[serde(default)]
    pub width_ft: Option<Decimal>,
    #[serde(default)]
    pub height_ft: Option<Decimal>,
    #[serde(default)]
    pub pitch: Option<Pitch>,
    #[serde(default)]
    pub damage_type: Option<DamageType>,
    #[serde(default)]
    pub damage_severity: Option<DamageSeverity>,
    #[serde(default)]
    pub water_category: Option<WaterCategory>,
    #[serde(default)]
    pub missing_walls: Vec<MissingWall>,
    #[serde(default)]
    pub subrooms: Vec<Subroom>,
}

impl Zone {
    /// Creates a zone with no dimensions
    pub fn new(name: impl Into<String>, zone_type: ZoneType) -> Self {
        Self {
            id: ZoneId::new_v7(),
            name: name.into(),
            zone_type,
            length_ft: None,
            width_ft: None,
            height_ft: None,
            pitch: None,
            damage_type: None,
            damage_severity: None,
            water_category: None,
            missing_walls: Vec::new(),
            subrooms: Vec::new(),
        }
    }

    /// Creates a rectangular room
    pub fn room(name: impl Into<String>, length_ft: Decimal, width_ft: Decimal, height_ft: Decimal) -> Self {
        Self::new(name, ZoneType::Room).with_dimensions(length_ft, width_ft, Some(height_ft))
    }

    /// Creates a roof facet from its footprint and pitch
    pub fn roof(name: impl Into<String>, length_ft: Decimal, width_ft: Decimal, pitch: Pitch) -> Self {
        let mut zone = Self::new(name, ZoneType::Roof).with_dimensions(length_ft, width_ft, None);
        zone.pitch = Some(pitch);
        zone
    }

    pub fn with_dimensions(mut self, length_ft: Decimal, width_ft: Decimal, height_ft: Option<Decimal>) -> Self {
        self.length_ft = Some(length_ft);
        self.width_ft = Some(width_ft);
        self.height_ft = height_ft;
        self
    }

    pub fn with_damage(mut self, damage_type: DamageType, water_category: Option<WaterCategory>) -> Self {
        self.damage_type = Some(damage_type);
        self.water_category = water_category;
        self
    }

    pub fn with_missing_wall(mut self, wall: MissingWall) -> Self {
        self.missing_walls.push(wall);
        self
    }

    pub fn with_subroom(mut self, subroom: Subroom) -> Self {
        self.subrooms.push(subroom);
        self
    }

    /// Checks that every dimension present is strictly positive
    pub fn validate(&self) -> Result<(), EstimateError> {
        let dimensions = [
            ("length", self.length_ft),
            ("width", self.width_ft),
            ("height", self.height_ft),
        ];
        for (label, value) in dimensions {
            if let Some(value) = value {
                if value <= Decimal::ZERO {
                    return Err(EstimateError::geometry(
                        &self.name,
                        format!("{} must be greater than zero, got {}", label, value),
                    ));
                }
            }
        }

        if let Some(pitch) = &self.pitch {
            if pitch.rise.is_sign_negative() || pitch.run <= Decimal::ZERO {
                return Err(EstimateError::InvalidPitch(pitch.to_string()));
            }
        }

        for wall in &self.missing_walls {
            let full_height = wall.goes_to_floor && wall.goes_to_ceiling;
            if wall.width_ft <= Decimal::ZERO || (!full_height && wall.height_ft <= Decimal::ZERO) {
                return Err(EstimateError::geometry(
                    &self.name,
                    "missing wall dimensions must be greater than zero",
                ));
            }
            if wall.quantity == 0 {
                return Err(EstimateError::geometry(&self.name, "missing wall quantity must be at least 1"));
            }
        }

        for subroom in &self.subrooms {
            if subroom.length_ft <= Decimal::ZERO || subroom.width_ft <= Decimal::ZERO {
                return Err(EstimateError::geometry(
                    &self.name,
                    "subroom dimensions must be greater than zero",
                ));
            }
        }

        Ok(())
    }

    /// Derived measurements for this zone
    pub fn metrics(&self) -> ZoneMetrics {
        calculate_zone_metrics(self)
    }

    pub fn is_roof(&self) -> bool {
        self.zone_type == ZoneType::Roof
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pitch_parsing() {
        let pitch: Pitch = "6/12".parse().unwrap();
        assert_eq!(pitch, Pitch::new(dec!(6), dec!(12)));

        let bare: Pitch = "8".parse().unwrap();
        assert_eq!(bare.run, dec!(12));

        assert!("abc".parse::<Pitch>().is_err());
        assert!("6/0".parse::<Pitch>().is_err());
    }

    #[test]
    fn test_pitch_multiplier() {
        assert_eq!(Pitch::flat().multiplier(), Decimal::ONE);
        // 12/12 -> sqrt(2)
        let steep = Pitch::new(dec!(12), dec!(12)).multiplier();
        assert_eq!(steep.round_dp(4), dec!(1.4142));
    }

    #[test]
    fn test_water_category_serde() {
        let json = serde_json::to_string(&WaterCategory::Category3).unwrap();
        assert_eq!(json, "3");
        let parsed: WaterCategory = serde_json::from_str("2").unwrap();
        assert_eq!(parsed, WaterCategory::Category2);
        assert!(serde_json::from_str::<WaterCategory>("4").is_err());
    }

    #[test]
    fn test_validate_rejects_zero_dimension() {
        let zone = Zone::room("Kitchen", dec!(12), dec!(0), dec!(8));
        assert!(matches!(zone.validate(), Err(EstimateError::InvalidGeometry { .. })));
    }

    #[test]
    fn test_validate_accepts_missing_dimensions() {
        let zone = Zone::new("Contents", ZoneType::Exterior);
        assert!(zone.validate().is_ok());
    }

    #[test]
    fn test_missing_wall_effective_area() {
        let door = MissingWall::new(dec!(3), dec!(7)).to_floor();
        assert_eq!(door.effective_area(Some(dec!(8))), dec!(21));

        let opening = MissingWall::full_height(dec!(4));
        assert_eq!(opening.effective_area(Some(dec!(8))), dec!(32));

        let tall = MissingWall::new(dec!(2), dec!(10)).times(2);
        assert_eq!(tall.effective_area(Some(dec!(8))), dec!(32));
    }
}
