use crate::aggregator::{period_totals, Ledger, PeriodTotals};
use crate::schema::AccountType;
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

/// Share of the threshold above which a head turns Amber.
pub const AMBER_FRACTION: f64 = 0.75;

/// Rounding slack at the Amber and High boundaries, in units of the compared
/// magnitude. `0.3 * 0.75` is one ulp below `0.225`, so a share of exactly 0.225
/// must still read as Good.
const BOUNDARY_ULPS: f64 = 4.0;

/// A ratio, or an explicit marker that its denominator was zero.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Ratio {
    Value(f64),
    NotApplicable,
}

impl Ratio {
    pub fn guarded(numerator: f64, denominator: f64) -> Self {
        if denominator == 0.0 {
            Ratio::NotApplicable
        } else {
            Ratio::Value(numerator / denominator)
        }
    }

    pub fn value(&self) -> Option<f64> {
        match self {
            Ratio::Value(v) => Some(*v),
            Ratio::NotApplicable => None,
        }
    }

    pub fn is_applicable(&self) -> bool {
        matches!(self, Ratio::Value(_))
    }
}

impl fmt::Display for Ratio {
    /// Renders as a percentage with two decimals, or `N/A`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ratio::Value(v) => write!(f, "{:.2}%", v * 100.0),
            Ratio::NotApplicable => f.write_str("N/A"),
        }
    }
}

impl Serialize for Ratio {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Ratio::Value(v) => serializer.serialize_f64(*v),
            Ratio::NotApplicable => serializer.serialize_str("not_applicable"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FinancialRatios {
    pub period: String,
    pub totals: PeriodTotals,
    /// Income minus expense; negative for a loss.
    pub profit: f64,
    pub profit_margin: Ratio,
    pub expense_to_income_ratio: Ratio,
    pub debt_to_asset_ratio: Ratio,
}

pub fn profit(totals: &PeriodTotals) -> f64 {
    totals.income - totals.expense
}

pub fn profit_margin(totals: &PeriodTotals) -> Ratio {
    Ratio::guarded(profit(totals), totals.income)
}

pub fn expense_to_income_ratio(totals: &PeriodTotals) -> Ratio {
    Ratio::guarded(totals.expense, totals.income)
}

pub fn debt_to_asset_ratio(totals: &PeriodTotals) -> Ratio {
    Ratio::guarded(totals.liability, totals.asset)
}

pub fn compute_ratios(period: &str, totals: PeriodTotals) -> FinancialRatios {
    FinancialRatios {
        period: period.to_string(),
        totals,
        profit: profit(&totals),
        profit_margin: profit_margin(&totals),
        expense_to_income_ratio: expense_to_income_ratio(&totals),
        debt_to_asset_ratio: debt_to_asset_ratio(&totals),
    }
}

pub fn ratios_for_period(ledger: &Ledger, period: &str) -> FinancialRatios {
    compute_ratios(period, period_totals(ledger, period))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RagStatus {
    Good,
    Amber,
    High,
}

impl fmt::Display for RagStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RagStatus::Good => "Good",
            RagStatus::Amber => "Amber",
            RagStatus::High => "High",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RagRecord {
    pub account_head: String,
    pub amount: f64,
    /// Fraction of total expense, 0 when total expense is 0.
    pub percent_of_total_expense: f64,
    pub threshold: f64,
    pub status: RagStatus,
}

/// High above the threshold, Amber above three quarters of it, Good otherwise.
pub fn classify(percent: f64, threshold: f64) -> RagStatus {
    let tolerance = BOUNDARY_ULPS * f64::EPSILON * threshold.abs().max(percent.abs());
    if percent > threshold + tolerance {
        RagStatus::High
    } else if percent > threshold * AMBER_FRACTION + tolerance {
        RagStatus::Amber
    } else {
        RagStatus::Good
    }
}

pub fn rag_status(
    account_head: &str,
    expense_amount: f64,
    total_expense: f64,
    threshold: f64,
) -> RagRecord {
    let percent = if total_expense == 0.0 {
        0.0
    } else {
        expense_amount / total_expense
    };

    RagRecord {
        account_head: account_head.to_string(),
        amount: expense_amount,
        percent_of_total_expense: percent,
        threshold,
        status: classify(percent, threshold),
    }
}

/// One record per configured head, in name order. Heads with no expense rows in
/// `period` are reported with amount 0.
pub fn rag_report(
    ledger: &Ledger,
    period: &str,
    thresholds: &BTreeMap<String, f64>,
) -> Vec<RagRecord> {
    let total_expense = period_totals(ledger, period).expense;

    let mut by_head: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
    for row in ledger
        .rows()
        .filter(|r| r.period == period && r.account_type == AccountType::Expense)
    {
        by_head
            .entry(row.account_head.as_str())
            .or_default()
            .push(row.amount);
    }

    thresholds
        .iter()
        .map(|(head, &threshold)| {
            let amount = by_head
                .get(head.as_str())
                .map(|values| {
                    let mut values = values.clone();
                    values.sort_by(f64::total_cmp);
                    values.into_iter().sum()
                })
                .unwrap_or(0.0);
            rag_status(head, amount, total_expense, threshold)
        })
        .collect()
}
