//! Per-item depreciation
//!
//! Depreciation is straight-line over a useful life looked up by category
//! code, scaled by the depreciation type and the item's condition, and
//! clamped to 0-100%. `acv = rcv × (1 − pct/100)`.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use core_kernel::Money;

/// How a catalog item depreciates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DepreciationType {
    /// Straight line over the useful life, recoverable on completion
    #[default]
    Standard,
    /// Straight line at 1.5× the standard rate (contents, soft goods)
    Accelerated,
    /// Straight line, but the withheld amount is never paid back
    NonRecoverable,
    /// Labor-only and service items that do not lose value
    None,
}

impl DepreciationType {
    fn rate_factor(&self) -> Decimal {
        match self {
            DepreciationType::Accelerated => dec!(1.5),
            DepreciationType::None => Decimal::ZERO,
            DepreciationType::Standard | DepreciationType::NonRecoverable => Decimal::ONE,
        }
    }
}

/// Observed condition of the damaged item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemCondition {
    Good,
    Average,
    Poor,
}

impl ItemCondition {
    pub fn multiplier(&self) -> Decimal {
        match self {
            ItemCondition::Good => dec!(0.75),
            ItemCondition::Average => Decimal::ONE,
            ItemCondition::Poor => dec!(1.25),
        }
    }
}

/// Useful life in years by category code
const USEFUL_LIFE_TABLE: &[(&str, u32)] = &[
    ("RFG", 20),
    ("FCC", 10),
    ("FCV", 15),
    ("FCW", 25),
    ("FCT", 30),
    ("PNT", 10),
    ("DRY", 40),
    ("CAB", 25),
    ("APP", 12),
    ("PLM", 20),
    ("ELE", 25),
    ("HVC", 15),
    ("SDG", 30),
    ("WDW", 25),
    ("DOR", 30),
    ("FNC", 15),
    ("INS", 40),
    ("CON", 8),
];

/// Categories whose items never depreciate (mitigation, demolition, cleaning, fees)
const NON_DEPRECIABLE_CATEGORIES: &[&str] = &["WTR", "DMO", "CLN", "FEE", "TMP"];

const DEFAULT_USEFUL_LIFE_YEARS: u32 = 20;

fn category_key(category_code: &str) -> String {
    category_code
        .trim()
        .chars()
        .take(3)
        .collect::<String>()
        .to_ascii_uppercase()
}

/// Returns true if items of this category can depreciate at all
pub fn is_depreciable_category(category_code: &str) -> bool {
    !NON_DEPRECIABLE_CATEGORIES.contains(&category_key(category_code).as_str())
}

/// Useful life for a category; `None` for non-depreciable categories
pub fn useful_life_years(category_code: &str) -> Option<Decimal> {
    if !is_depreciable_category(category_code) {
        return None;
    }
    let key = category_key(category_code);
    let years = USEFUL_LIFE_TABLE
        .iter()
        .find(|(code, _)| *code == key)
        .map(|(_, years)| *years)
        .unwrap_or(DEFAULT_USEFUL_LIFE_YEARS);
    Some(Decimal::from(years))
}

/// Inputs to the depreciation calculation
#[derive(Debug, Clone)]
pub struct DepreciationInput<'a> {
    pub category_code: &'a str,
    pub depreciation_type: DepreciationType,
    pub age_years: Option<Decimal>,
    pub condition: Option<ItemCondition>,
    pub rcv: Money,
    /// Adjuster-entered percentage that replaces the computed one
    pub manual_pct: Option<Decimal>,
}

/// Depreciation outcome for one line item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepreciationResult {
    pub depreciation_pct: Decimal,
    pub depreciation_amount: Money,
    pub acv: Money,
    pub useful_life_years: Option<Decimal>,
    pub is_depreciable: bool,
    pub is_recoverable: bool,
}

impl DepreciationResult {
    /// No depreciation: ACV equals RCV
    pub fn none(rcv: Money) -> Self {
        Self {
            depreciation_pct: Decimal::ZERO,
            depreciation_amount: Money::zero(rcv.currency()),
            acv: rcv,
            useful_life_years: None,
            is_depreciable: false,
            is_recoverable: false,
        }
    }

    /// Re-applies the same percentage to a new replacement cost
    pub fn rebase(&self, rcv: Money) -> Self {
        let (amount, acv) = split(rcv, self.depreciation_pct);
        Self {
            depreciation_amount: amount,
            acv,
            ..self.clone()
        }
    }
}

/// Computes depreciation percentage, amount and ACV for one item
pub fn calculate_depreciation(input: &DepreciationInput<'_>) -> DepreciationResult {
    let life = useful_life_years(input.category_code);
    let is_recoverable = input.depreciation_type != DepreciationType::NonRecoverable;

    if let Some(manual) = input.manual_pct {
        let pct = clamp_pct(manual);
        let (amount, acv) = split(input.rcv, pct);
        return DepreciationResult {
            depreciation_pct: pct,
            depreciation_amount: amount,
            acv,
            useful_life_years: life,
            is_depreciable: pct > Decimal::ZERO,
            is_recoverable,
        };
    }

    let depreciable = input.depreciation_type != DepreciationType::None && life.is_some();
    let (Some(life), Some(age), true) = (life, input.age_years, depreciable) else {
        return DepreciationResult {
            useful_life_years: life,
            is_depreciable: depreciable,
            is_recoverable: depreciable && is_recoverable,
            ..DepreciationResult::none(input.rcv)
        };
    };

    let condition = input.condition.map(|c| c.multiplier()).unwrap_or(Decimal::ONE);
    let raw = if life.is_zero() {
        dec!(100)
    } else {
        age / life * dec!(100) * input.depreciation_type.rate_factor() * condition
    };
    let pct = clamp_pct(raw);
    let (amount, acv) = split(input.rcv, pct);

    DepreciationResult {
        depreciation_pct: pct,
        depreciation_amount: amount,
        acv,
        useful_life_years: Some(life),
        is_depreciable: true,
        is_recoverable,
    }
}

fn clamp_pct(pct: Decimal) -> Decimal {
    pct.max(Decimal::ZERO).min(dec!(100)).round_dp(2)
}

fn split(rcv: Money, pct: Decimal) -> (Money, Money) {
    let acv = rcv.multiply(Decimal::ONE - pct / dec!(100)).round_to_currency();
    let rcv = rcv.round_to_currency();
    let amount = Money::new(rcv.amount() - acv.amount(), rcv.currency());
    (amount, acv)
}
