use crate::error::Result;
use crate::schema::{AccountType, LedgerRow, LedgerTable};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Every table ingested in one analysis session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Ledger {
    pub tables: Vec<LedgerTable>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryRecord {
    pub period: String,
    pub account_type: AccountType,
    pub total_amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeadSummaryRecord {
    pub period: String,
    pub account_type: AccountType,
    pub account_head: String,
    pub total_amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopExpenseRecord {
    pub period: String,
    pub account_head: String,
    pub amount: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct IncomeExpense {
    pub income: f64,
    pub expense: f64,
}

/// One account type's slice of a period's combined total.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeShare {
    pub account_type: AccountType,
    pub total_amount: f64,
    /// Fraction of the period's combined total; 0 when that total is 0.
    pub share: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PeriodTotals {
    pub income: f64,
    pub expense: f64,
    pub asset: f64,
    pub liability: f64,
}

impl PeriodTotals {
    pub fn get(&self, account_type: AccountType) -> f64 {
        match account_type {
            AccountType::Asset => self.asset,
            AccountType::Liability => self.liability,
            AccountType::Income => self.income,
            AccountType::Expense => self.expense,
        }
    }

    fn set(&mut self, account_type: AccountType, value: f64) {
        match account_type {
            AccountType::Asset => self.asset = value,
            AccountType::Liability => self.liability = value,
            AccountType::Income => self.income = value,
            AccountType::Expense => self.expense = value,
        }
    }
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_tables(tables: Vec<LedgerTable>) -> Self {
        Self { tables }
    }

    pub fn push(&mut self, table: LedgerTable) {
        self.tables.push(table);
    }

    pub fn rows(&self) -> impl Iterator<Item = &LedgerRow> {
        self.tables.iter().flat_map(|t| t.rows.iter())
    }

    pub fn row_count(&self) -> usize {
        self.tables.iter().map(|t| t.rows.len()).sum()
    }

    /// Distinct period labels, sorted. Tables without rows still contribute
    /// their period.
    pub fn periods(&self) -> Vec<String> {
        self.tables
            .iter()
            .map(|t| t.period.clone())
            .chain(self.rows().map(|r| r.period.clone()))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Account-level listing ordered by type, then period, then account head.
    pub fn rows_by_type(&self) -> Vec<&LedgerRow> {
        let mut rows: Vec<&LedgerRow> = self.rows().collect();
        rows.sort_by(|a, b| {
            a.account_type
                .cmp(&b.account_type)
                .then_with(|| a.period.cmp(&b.period))
                .then_with(|| a.account_head.cmp(&b.account_head))
                .then_with(|| a.amount.total_cmp(&b.amount))
        });
        rows
    }

    pub fn to_csv(&self) -> Result<String> {
        let mut buffer = Vec::new();
        {
            let mut writer = csv::Writer::from_writer(&mut buffer);
            writer.write_record(["Period", "Account Head", "Type", "Amount"])?;

            for row in self.rows_by_type() {
                let amount = format!("{:.2}", row.amount);
                writer.write_record([
                    row.period.as_str(),
                    row.account_head.as_str(),
                    row.account_type.as_str(),
                    amount.as_str(),
                ])?;
            }
            writer.flush()?;
        }

        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}

/// Adds values in a fixed order so totals do not depend on row order.
fn stable_sum(mut values: Vec<f64>) -> f64 {
    values.sort_by(f64::total_cmp);
    values.into_iter().sum()
}

/// Totals per (period, type). Every known period reports all four types, with
/// 0 where the period has no rows of that type.
pub fn summarize_by_type(ledger: &Ledger) -> Vec<SummaryRecord> {
    let mut groups: BTreeMap<(String, AccountType), Vec<f64>> = BTreeMap::new();

    for period in ledger.periods() {
        for account_type in AccountType::ALL {
            groups.insert((period.clone(), account_type), Vec::new());
        }
    }

    for row in ledger.rows() {
        groups
            .entry((row.period.clone(), row.account_type))
            .or_default()
            .push(row.amount);
    }

    groups
        .into_iter()
        .map(|((period, account_type), values)| SummaryRecord {
            period,
            account_type,
            total_amount: stable_sum(values),
        })
        .collect()
}

pub fn summarize_by_head(ledger: &Ledger) -> Vec<HeadSummaryRecord> {
    let mut groups: BTreeMap<(String, AccountType, String), Vec<f64>> = BTreeMap::new();

    for row in ledger.rows() {
        groups
            .entry((row.period.clone(), row.account_type, row.account_head.clone()))
            .or_default()
            .push(row.amount);
    }

    groups
        .into_iter()
        .map(|((period, account_type, account_head), values)| HeadSummaryRecord {
            period,
            account_type,
            account_head,
            total_amount: stable_sum(values),
        })
        .collect()
}

/// Expense totals per account head within `period`, largest first, ties broken
/// by account head ascending, truncated to `n`.
pub fn top_expenses(ledger: &Ledger, period: &str, n: usize) -> Vec<TopExpenseRecord> {
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

    let mut records: Vec<TopExpenseRecord> = by_head
        .into_iter()
        .map(|(head, values)| TopExpenseRecord {
            period: period.to_string(),
            account_head: head.to_string(),
            amount: stable_sum(values),
        })
        .collect();

    records.sort_by(|a, b| {
        b.amount
            .total_cmp(&a.amount)
            .then_with(|| a.account_head.cmp(&b.account_head))
    });
    records.truncate(n);
    records
}

/// Income and expense totals per period; a period without rows of a type reports 0.
pub fn year_over_year(ledger: &Ledger) -> BTreeMap<String, IncomeExpense> {
    let mut comparison: BTreeMap<String, IncomeExpense> = ledger
        .periods()
        .into_iter()
        .map(|period| (period, IncomeExpense::default()))
        .collect();

    for record in summarize_by_type(ledger)
        .into_iter()
        .filter(|r| r.account_type.is_profit_and_loss())
    {
        let entry = comparison.entry(record.period).or_default();
        if record.account_type == AccountType::Income {
            entry.income = record.total_amount;
        } else {
            entry.expense = record.total_amount;
        }
    }

    comparison
}

pub fn period_totals(ledger: &Ledger, period: &str) -> PeriodTotals {
    let mut totals = PeriodTotals::default();
    for record in summarize_by_type(ledger)
        .into_iter()
        .filter(|r| r.period == period)
    {
        totals.set(record.account_type, record.total_amount);
    }
    totals
}

/// Each type's share of the period's combined total, in type order.
pub fn type_distribution(ledger: &Ledger, period: &str) -> Vec<TypeShare> {
    let totals = period_totals(ledger, period);
    let grand_total = stable_sum(AccountType::ALL.iter().map(|t| totals.get(*t)).collect());

    AccountType::ALL
        .into_iter()
        .map(|account_type| {
            let total_amount = totals.get(account_type);
            let share = if grand_total == 0.0 {
                0.0
            } else {
                total_amount / grand_total
            };
            TypeShare {
                account_type,
                total_amount,
                share,
            }
        })
        .collect()
}
