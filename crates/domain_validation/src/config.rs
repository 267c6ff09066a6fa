//! Validator configuration
//!
//! The plausibility multipliers and the companion and standalone item tables
//! vary by catalog and carrier, so they are injected rather than compiled in.
//! [`ValidatorConfig::default`] carries the standard tables; a deployment can
//! override any part of them from a TOML or JSON file.
//!
//! ```toml
//! version = 3
//! high_depreciation_threshold = 40
//!
//! [unit_multipliers]
//! SF = 1.25
//!
//! [[companions]]
//! code = "FCC-CARPET"
//! companions = ["FCC-PAD"]
//! ```

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use domain_estimate::Unit;

/// A code and the codes it is normally paired with
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemPairing {
    pub code: String,
    /// Companions (for completeness) or predecessors (for standalone items)
    pub companions: Vec<String>,
}

impl ItemPairing {
    pub fn new(code: &str, companions: &[&str]) -> Self {
        Self {
            code: code.to_string(),
            companions: companions.iter().map(|c| c.to_string()).collect(),
        }
    }
}

/// Injected, versioned validator configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidatorConfig {
    pub version: u32,
    /// Plausible-maximum multiplier per unit code
    pub unit_multipliers: BTreeMap<String, Decimal>,
    /// Multiplier for units missing from the table
    pub default_multiplier: Decimal,
    /// Items whose usual companions should be present alongside them
    pub companions: Vec<ItemPairing>,
    /// Items that normally follow one of the listed predecessors
    pub standalone_items: Vec<ItemPairing>,
    /// Depreciation percentage above which an undocumented age is flagged
    pub high_depreciation_threshold: Decimal,
    pub max_coverage_examples: usize,
    /// Persist the rules audit log during extended validation
    pub persist_audit_log: bool,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        let unit_multipliers = [
            (Unit::SF, dec!(1.5)),
            (Unit::LF, dec!(2.0)),
            (Unit::SY, dec!(1.5)),
            (Unit::SQ, dec!(1.5)),
            (Unit::EA, dec!(50)),
            (Unit::HR, dec!(100)),
            (Unit::DAY, dec!(30)),
            (Unit::WK, dec!(8)),
        ]
        .into_iter()
        .map(|(unit, multiplier)| (unit.code().to_string(), multiplier))
        .collect();

        Self {
            version: 1,
            unit_multipliers,
            default_multiplier: dec!(10),
            companions: vec![
                ItemPairing::new("DRY-1/2", &["DRY-TAPE", "PNT-W"]),
                ItemPairing::new("RFG-240", &["RFG-FELT", "RFG-DRIP"]),
                ItemPairing::new("WTR-EXT", &["WTR-DEHU", "WTR-AIRM"]),
                ItemPairing::new("FCC-CARPET", &["FCC-PAD"]),
                ItemPairing::new("CAB-LOWER", &["CTR-LAM"]),
            ],
            standalone_items: vec![
                ItemPairing::new("DRY-TAPE", &["DRY-1/2", "DRY-5/8", "DRY-PATCH"]),
                ItemPairing::new("FCC-PAD", &["FCC-CARPET"]),
                ItemPairing::new("RFG-RIDGE", &["RFG-240", "RFG-300"]),
                ItemPairing::new("WTR-DEHU", &["WTR-EXT", "WTR-EXTC"]),
            ],
            high_depreciation_threshold: dec!(50),
            max_coverage_examples: 5,
            persist_audit_log: true,
        }
    }
}

impl ValidatorConfig {
    /// Loads a configuration file; the format follows the file extension
    ///
    /// Keys absent from the file keep their default values.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .build()?
            .try_deserialize()
    }

    /// Multiplier bounding the plausible quantity for a unit
    pub fn multiplier_for(&self, unit: Unit) -> Decimal {
        self.unit_multipliers
            .iter()
            .find(|(code, _)| code.eq_ignore_ascii_case(unit.code()))
            .map(|(_, multiplier)| *multiplier)
            .unwrap_or(self.default_multiplier)
    }

    pub fn companions_of(&self, code: &str) -> Option<&[String]> {
        self.companions
            .iter()
            .find(|p| p.code == code)
            .map(|p| p.companions.as_slice())
    }

    pub fn predecessors_of(&self, code: &str) -> Option<&[String]> {
        self.standalone_items
            .iter()
            .find(|p| p.code == code)
            .map(|p| p.companions.as_slice())
    }

    pub fn with_persist_audit_log(mut self, persist: bool) -> Self {
        self.persist_audit_log = persist;
        self
    }
}
