//! Money and rates
//!
//! Repair estimates are priced per unit and extended by fractional
//! quantities, so every amount is carried as a `rust_decimal::Decimal` with
//! four places of internal precision and only rounded to the currency's
//! minor unit when reported. Arithmetic between amounts is checked: mixing
//! currencies is an error, never a silent conversion.

use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Places kept on every stored amount
const INTERNAL_SCALE: u32 = 4;

/// ISO 4217 currencies an estimate can be written in
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    #[default]
    USD,
    CAD,
    GBP,
    AUD,
}

impl Currency {
    /// Places of the minor unit (cents)
    pub fn minor_units(&self) -> u32 {
        2
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Currency::USD => "$",
            Currency::CAD => "C$",
            Currency::GBP => "£",
            Currency::AUD => "A$",
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Currency::USD => "USD",
            Currency::CAD => "CAD",
            Currency::GBP => "GBP",
            Currency::AUD => "AUD",
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MoneyError {
    #[error("Currency mismatch: cannot combine {0} with {1}")]
    CurrencyMismatch(Currency, Currency),

    #[error("Amount overflowed while combining {0} values")]
    Overflow(Currency),
}

/// An amount in a single currency
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Money {
    amount: Decimal,
    currency: Currency,
}

impl Money {
    pub fn new(amount: Decimal, currency: Currency) -> Self {
        Self {
            amount: amount.round_dp(INTERNAL_SCALE),
            currency,
        }
    }

    /// USD is the default estimating currency
    pub fn usd(amount: Decimal) -> Self {
        Self::new(amount, Currency::USD)
    }

    pub fn zero(currency: Currency) -> Self {
        Self {
            amount: Decimal::ZERO,
            currency,
        }
    }

    pub fn amount(&self) -> Decimal {
        self.amount
    }

    pub fn currency(&self) -> Currency {
        self.currency
    }

    pub fn is_zero(&self) -> bool {
        self.amount.is_zero()
    }

    /// Strictly greater than zero
    pub fn is_positive(&self) -> bool {
        self.amount > Decimal::ZERO
    }

    pub fn is_negative(&self) -> bool {
        self.amount < Decimal::ZERO
    }

    /// Rounds half away from zero to the minor unit
    pub fn round_to_currency(&self) -> Self {
        Self {
            amount: self
                .amount
                .round_dp_with_strategy(self.currency.minor_units(), RoundingStrategy::MidpointAwayFromZero),
            currency: self.currency,
        }
    }

    /// Clamps negative amounts to zero
    pub fn non_negative(self) -> Self {
        if self.is_negative() {
            Money::zero(self.currency)
        } else {
            self
        }
    }

    pub fn checked_add(&self, other: &Money) -> Result<Money, MoneyError> {
        self.combine(other, Decimal::checked_add)
    }

    pub fn checked_sub(&self, other: &Money) -> Result<Money, MoneyError> {
        self.combine(other, Decimal::checked_sub)
    }

    /// Scales by a quantity, a rate or a remaining-value fraction
    pub fn multiply(&self, factor: Decimal) -> Self {
        Self::new(self.amount * factor, self.currency)
    }

    /// Sums amounts that must all be in `currency`; empty input is zero
    pub fn try_sum<'a, I>(items: I, currency: Currency) -> Result<Money, MoneyError>
    where
        I: IntoIterator<Item = &'a Money>,
    {
        items
            .into_iter()
            .try_fold(Money::zero(currency), |total, m| total.checked_add(m))
    }

    fn combine(&self, other: &Money, op: fn(Decimal, Decimal) -> Option<Decimal>) -> Result<Money, MoneyError> {
        if self.currency != other.currency {
            return Err(MoneyError::CurrencyMismatch(self.currency, other.currency));
        }
        let amount = op(self.amount, other.amount).ok_or(MoneyError::Overflow(self.currency))?;
        Ok(Self::new(amount, self.currency))
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rounded = self.round_to_currency().amount;
        let places = self.currency.minor_units() as usize;
        if rounded.is_sign_negative() && !rounded.is_zero() {
            write!(f, "-{}{:.places$}", self.currency.symbol(), rounded.abs())
        } else {
            write!(f, "{}{:.places$}", self.currency.symbol(), rounded)
        }
    }
}

/// A fraction applied to money: tax, overhead, profit
///
/// Stored as a fraction (`0.10`), usually written as a percentage (`10`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Rate(Decimal);

impl Rate {
    pub fn new(fraction: Decimal) -> Self {
        Self(fraction)
    }

    pub fn from_percentage(percentage: Decimal) -> Self {
        Self(percentage / dec!(100))
    }

    pub fn as_decimal(&self) -> Decimal {
        self.0
    }

    pub fn as_percentage(&self) -> Decimal {
        self.0 * dec!(100)
    }

    pub fn apply(&self, money: &Money) -> Money {
        money.multiply(self.0)
    }
}

impl fmt::Display for Rate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.as_percentage().round_dp(INTERNAL_SCALE).normalize())
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn addition_is_associative(
            a in -1_000_000i64..1_000_000i64,
            b in -1_000_000i64..1_000_000i64,
            c in -1_000_000i64..1_000_000i64
        ) {
            let (ma, mb, mc) = (Money::usd(Decimal::new(a, 2)), Money::usd(Decimal::new(b, 2)), Money::usd(Decimal::new(c, 2)));

            let left = ma.checked_add(&mb).unwrap().checked_add(&mc).unwrap();
            let right = ma.checked_add(&mb.checked_add(&mc).unwrap()).unwrap();
            prop_assert_eq!(left, right);
        }

        #[test]
        fn non_negative_never_below_zero(a in -1_000_000i64..1_000_000i64) {
            prop_assert!(!Money::usd(Decimal::new(a, 2)).non_negative().is_negative());
        }
    }
}
