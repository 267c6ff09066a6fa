//! Catalog line item definitions
//!
//! The catalog is owned by an external collaborator; this module only models
//! the rows the computation core consumes.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::coverage::CoverageCode;
use crate::depreciation::DepreciationType;

/// Unit of measure for a catalog item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Unit {
    /// Square feet
    SF,
    /// Linear feet
    LF,
    /// Square yards
    SY,
    /// Roofing squares (100 SF)
    SQ,
    /// Each
    EA,
    /// Hours
    HR,
    /// Days
    DAY,
    /// Weeks
    WK,
}

impl Unit {
    pub fn code(&self) -> &'static str {
        match self {
            Unit::SF => "SF",
            Unit::LF => "LF",
            Unit::SY => "SY",
            Unit::SQ => "SQ",
            Unit::EA => "EA",
            Unit::HR => "HR",
            Unit::DAY => "DAY",
            Unit::WK => "WK",
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Unit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "SF" => Ok(Unit::SF),
            "LF" => Ok(Unit::LF),
            "SY" => Ok(Unit::SY),
            "SQ" => Ok(Unit::SQ),
            "EA" => Ok(Unit::EA),
            "HR" => Ok(Unit::HR),
            "DAY" => Ok(Unit::DAY),
            "WK" => Ok(Unit::WK),
            other => Err(format!("Unknown unit: {}", other)),
        }
    }
}

/// Per-unit cost split
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CostComponents {
    #[serde(default)]
    pub material: Decimal,
    #[serde(default)]
    pub labor: Decimal,
    #[serde(default)]
    pub equipment: Decimal,
}

impl CostComponents {
    pub fn new(material: Decimal, labor: Decimal, equipment: Decimal) -> Self {
        Self { material, labor, equipment }
    }

    pub fn total(&self) -> Decimal {
        self.material + self.labor + self.equipment
    }
}

/// A reusable, priced task definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItemDefinition {
    /// Unique catalog key, e.g. `DRY-1/2`
    pub code: String,
    pub description: String,
    /// Category id used for cap matching and useful-life lookup, e.g. `DRY`
    pub category_code: String,
    pub unit: Unit,
    pub costs: CostComponents,
    /// Extra material ordered for cuts and breakage (0.10 = 10%)
    #[serde(default)]
    pub waste_factor: Decimal,
    #[serde(default)]
    pub minimum_charge: Option<Decimal>,
    #[serde(default)]
    pub quantity_formula: Option<String>,
    #[serde(default)]
    pub requires_items: Vec<String>,
    #[serde(default)]
    pub excludes_items: Vec<String>,
    #[serde(default)]
    pub replaces_items: Vec<String>,
    #[serde(default)]
    pub auto_add_items: Vec<String>,
    #[serde(default)]
    pub default_coverage_code: Option<CoverageCode>,
    #[serde(default)]
    pub depreciation_type: DepreciationType,
    pub trade_code: String,
}

impl LineItemDefinition {
    pub fn new(
        code: impl Into<String>,
        description: impl Into<String>,
        category_code: impl Into<String>,
        unit: Unit,
        costs: CostComponents,
        trade_code: impl Into<String>,
    ) -> Self {
        Self {
            code: code.into(),
            description: description.into(),
            category_code: category_code.into(),
            unit,
            costs,
            waste_factor: Decimal::ZERO,
            minimum_charge: None,
            quantity_formula: None,
            requires_items: Vec::new(),
            excludes_items: Vec::new(),
            replaces_items: Vec::new(),
            auto_add_items: Vec::new(),
            default_coverage_code: None,
            depreciation_type: DepreciationType::default(),
            trade_code: trade_code.into(),
        }
    }
}

/// Catalog rows keyed by code
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<LineItemDefinition>", into = "Vec<LineItemDefinition>")]
pub struct Catalog {
    definitions: BTreeMap<String, LineItemDefinition>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a definition
    pub fn insert(&mut self, definition: LineItemDefinition) {
        self.definitions.insert(definition.code.clone(), definition);
    }

    pub fn get(&self, code: &str) -> Option<&LineItemDefinition> {
        self.definitions.get(code)
    }

    pub fn contains(&self, code: &str) -> bool {
        self.definitions.contains_key(code)
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &LineItemDefinition> {
        self.definitions.values()
    }
}

impl From<Vec<LineItemDefinition>> for Catalog {
    fn from(definitions: Vec<LineItemDefinition>) -> Self {
        definitions.into_iter().collect()
    }
}

impl From<Catalog> for Vec<LineItemDefinition> {
    fn from(catalog: Catalog) -> Self {
        catalog.definitions.into_values().collect()
    }
}

impl FromIterator<LineItemDefinition> for Catalog {
    fn from_iter<T: IntoIterator<Item = LineItemDefinition>>(iter: T) -> Self {
        let mut catalog = Catalog::new();
        for definition in iter {
            catalog.insert(definition);
        }
        catalog
    }
}
