//! Policy coverage buckets

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Policy coverage a line item is settled under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CoverageCode {
    /// Dwelling
    A,
    /// Other structures
    B,
    /// Contents
    C,
    /// Loss of use / optional
    D,
}

impl CoverageCode {
    pub const ALL: [CoverageCode; 4] = [CoverageCode::A, CoverageCode::B, CoverageCode::C, CoverageCode::D];

    pub fn description(&self) -> &'static str {
        match self {
            CoverageCode::A => "Dwelling",
            CoverageCode::B => "Other Structures",
            CoverageCode::C => "Contents",
            CoverageCode::D => "Loss of Use",
        }
    }
}

impl Default for CoverageCode {
    fn default() -> Self {
        CoverageCode::A
    }
}

impl fmt::Display for CoverageCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let code = match self {
            CoverageCode::A => "A",
            CoverageCode::B => "B",
            CoverageCode::C => "C",
            CoverageCode::D => "D",
        };
        f.write_str(code)
    }
}

impl FromStr for CoverageCode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "A" => Ok(CoverageCode::A),
            "B" => Ok(CoverageCode::B),
            "C" => Ok(CoverageCode::C),
            "D" => Ok(CoverageCode::D),
            other => Err(format!("Unknown coverage code: {}", other)),
        }
    }
}
