//! Coverage settlement
//!
//! Groups priced items by coverage and rolls them up into RCV, ACV, tax,
//! overhead and profit, deductible and net claim. O&P qualification is decided
//! once for the whole estimate: the number of distinct trades must reach the
//! carrier minimum and the estimate subtotal must reach the effective
//! threshold (jurisdiction override first, carrier default otherwise).

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

use core_kernel::{CarrierId, Currency, JurisdictionId, Money, MoneyError, Rate};

use crate::coverage::CoverageCode;
use crate::error::EstimateError;
use crate::line_item::CalculatedLineItem;

/// Carrier-specific settlement configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CarrierProfile {
    pub id: CarrierId,
    pub name: String,
    pub overhead_pct: Rate,
    pub profit_pct: Rate,
    /// Distinct trades required before O&P is paid
    pub op_trade_minimum: usize,
    /// Estimate subtotal required before O&P is paid
    pub op_threshold: Decimal,
    /// Tax materials only instead of the full subtotal
    pub tax_materials_only: bool,
}

impl CarrierProfile {
    /// Carrier with the customary 10/10 O&P on three trades and no threshold
    pub fn standard(name: impl Into<String>) -> Self {
        Self {
            id: CarrierId::new(),
            name: name.into(),
            overhead_pct: Rate::from_percentage(Decimal::TEN),
            profit_pct: Rate::from_percentage(Decimal::TEN),
            op_trade_minimum: 3,
            op_threshold: Decimal::ZERO,
            tax_materials_only: true,
        }
    }
}

/// Geographic tax and threshold configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JurisdictionProfile {
    pub id: JurisdictionId,
    pub name: String,
    pub tax_rate: Rate,
    #[serde(default)]
    pub labor_taxable: bool,
    /// Replaces the carrier's O&P threshold when present
    #[serde(default)]
    pub op_threshold_override: Option<Decimal>,
}

impl JurisdictionProfile {
    pub fn new(name: impl Into<String>, tax_rate: Rate) -> Self {
        Self {
            id: JurisdictionId::new(),
            name: name.into(),
            tax_rate,
            labor_taxable: false,
            op_threshold_override: None,
        }
    }
}

/// Deductible amounts by coverage
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeductibleSchedule(BTreeMap<CoverageCode, Decimal>);

impl DeductibleSchedule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, coverage: CoverageCode, amount: Decimal) -> Self {
        self.0.insert(coverage, amount);
        self
    }

    pub fn get(&self, coverage: CoverageCode) -> Decimal {
        self.0.get(&coverage).copied().unwrap_or_default()
    }
}

/// Totals for one coverage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoverageSummary {
    pub coverage_code: CoverageCode,
    pub line_item_count: usize,
    pub subtotal: Money,
    pub material_subtotal: Money,
    pub tax: Money,
    pub overhead: Money,
    pub profit: Money,
    pub total_rcv: Money,
    pub total_depreciation: Money,
    /// Withheld until repairs are completed, not deducted
    pub recoverable_depreciation: Money,
    pub non_recoverable_depreciation: Money,
    pub total_acv: Money,
    pub deductible: Money,
    pub net_claim: Money,
}

impl CoverageSummary {
    fn empty(coverage_code: CoverageCode, currency: Currency) -> Self {
        let zero = Money::zero(currency);
        Self {
            coverage_code,
            line_item_count: 0,
            subtotal: zero,
            material_subtotal: zero,
            tax: zero,
            overhead: zero,
            profit: zero,
            total_rcv: zero,
            total_depreciation: zero,
            recoverable_depreciation: zero,
            non_recoverable_depreciation: zero,
            total_acv: zero,
            deductible: zero,
            net_claim: zero,
        }
    }

    fn accumulate(&mut self, other: &CoverageSummary) -> Result<(), MoneyError> {
        self.line_item_count += other.line_item_count;
        self.subtotal = self.subtotal.checked_add(&other.subtotal)?;
        self.material_subtotal = self.material_subtotal.checked_add(&other.material_subtotal)?;
        self.tax = self.tax.checked_add(&other.tax)?;
        self.overhead = self.overhead.checked_add(&other.overhead)?;
        self.profit = self.profit.checked_add(&other.profit)?;
        self.total_rcv = self.total_rcv.checked_add(&other.total_rcv)?;
        self.total_depreciation = self.total_depreciation.checked_add(&other.total_depreciation)?;
        self.recoverable_depreciation = self
            .recoverable_depreciation
            .checked_add(&other.recoverable_depreciation)?;
        self.non_recoverable_depreciation = self
            .non_recoverable_depreciation
            .checked_add(&other.non_recoverable_depreciation)?;
        self.total_acv = self.total_acv.checked_add(&other.total_acv)?;
        self.deductible = self.deductible.checked_add(&other.deductible)?;
        self.net_claim = self.net_claim.checked_add(&other.net_claim)?;
        Ok(())
    }
}

/// Per-coverage summaries plus grand totals
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementSummary {
    pub coverages: Vec<CoverageSummary>,
    pub totals: CoverageSummary,
    pub op_qualified: bool,
    pub trades_involved: usize,
    pub effective_op_threshold: Decimal,
}

impl SettlementSummary {
    pub fn coverage(&self, code: CoverageCode) -> Option<&CoverageSummary> {
        self.coverages.iter().find(|c| c.coverage_code == code)
    }
}

/// Aggregates priced items into coverage summaries
pub fn calculate_settlement(
    items: &[CalculatedLineItem],
    carrier: &CarrierProfile,
    jurisdiction: &JurisdictionProfile,
    deductibles: &DeductibleSchedule,
    currency: Currency,
) -> Result<SettlementSummary, EstimateError> {
    let trades: BTreeSet<&str> = items
        .iter()
        .filter(|i| !i.rcv.is_zero())
        .map(|i| i.trade_code.as_str())
        .collect();
    let estimate_subtotal = Money::try_sum(items.iter().map(|i| &i.rcv), currency)?;
    let effective_op_threshold = jurisdiction
        .op_threshold_override
        .unwrap_or(carrier.op_threshold);
    let op_qualified = trades.len() >= carrier.op_trade_minimum
        && estimate_subtotal.amount() >= effective_op_threshold;

    debug!(
        trades = trades.len(),
        subtotal = %estimate_subtotal,
        threshold = %effective_op_threshold,
        op_qualified,
        "O&P qualification"
    );

    let mut grouped: BTreeMap<CoverageCode, Vec<&CalculatedLineItem>> = BTreeMap::new();
    for item in items {
        grouped.entry(item.settlement_coverage()).or_default().push(item);
    }

    let mut coverages = Vec::with_capacity(grouped.len());
    for (code, members) in grouped {
        coverages.push(summarize_coverage(
            code,
            &members,
            carrier,
            jurisdiction,
            Money::new(deductibles.get(code), currency),
            op_qualified,
            currency,
        )?);
    }

    let mut totals = CoverageSummary::empty(CoverageCode::default(), currency);
    for summary in &coverages {
        totals.accumulate(summary)?;
    }

    Ok(SettlementSummary {
        coverages,
        totals,
        op_qualified,
        trades_involved: trades.len(),
        effective_op_threshold,
    })
}

fn summarize_coverage(
    code: CoverageCode,
    items: &[&CalculatedLineItem],
    carrier: &CarrierProfile,
    jurisdiction: &JurisdictionProfile,
    deductible: Money,
    op_qualified: bool,
    currency: Currency,
) -> Result<CoverageSummary, EstimateError> {
    let mut summary = CoverageSummary::empty(code, currency);
    summary.line_item_count = items.len();

    let mut labor = Money::zero(currency);
    for item in items {
        summary.subtotal = summary.subtotal.checked_add(&item.rcv)?;
        summary.material_subtotal = summary.material_subtotal.checked_add(&item.pricing.material)?;
        labor = labor.checked_add(&item.pricing.labor)?;

        let depreciation = item.depreciation.depreciation_amount;
        summary.total_depreciation = summary.total_depreciation.checked_add(&depreciation)?;
        if item.depreciation.is_recoverable {
            summary.recoverable_depreciation = summary.recoverable_depreciation.checked_add(&depreciation)?;
        } else {
            summary.non_recoverable_depreciation =
                summary.non_recoverable_depreciation.checked_add(&depreciation)?;
        }
    }

    let taxable = if carrier.tax_materials_only {
        if jurisdiction.labor_taxable {
            summary.material_subtotal.checked_add(&labor)?
        } else {
            summary.material_subtotal
        }
    } else {
        summary.subtotal
    };
    summary.tax = jurisdiction.tax_rate.apply(&taxable).round_to_currency();

    if op_qualified {
        summary.overhead = carrier.overhead_pct.apply(&summary.subtotal).round_to_currency();
        summary.profit = carrier.profit_pct.apply(&summary.subtotal).round_to_currency();
    }

    summary.total_rcv = summary
        .subtotal
        .checked_add(&summary.tax)?
        .checked_add(&summary.overhead)?
        .checked_add(&summary.profit)?;
    summary.total_acv = summary.total_rcv.checked_sub(&summary.total_depreciation)?;
    summary.deductible = deductible.round_to_currency();
    summary.net_claim = summary
        .total_rcv
        .checked_sub(&summary.deductible)?
        .checked_sub(&summary.non_recoverable_depreciation)?
        .non_negative();

    Ok(summary)
}
