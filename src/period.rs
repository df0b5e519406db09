//! Period tagging.
//!
//! The tagger treats period labels as opaque strings. The helpers below only
//! build the labels a caller typically offers (financial year ranges such as
//! `"2023-2024"`, optionally followed by a month name); nothing in the pipeline
//! parses them back.

use crate::schema::{LedgerRow, LedgerTable, NormalizedTable};
use chrono::{Datelike, Month, NaiveDate};

/// Stamps every row of a normalized table with `period`.
pub fn tag_period(table: NormalizedTable, period: &str) -> LedgerTable {
    let rows = table
        .rows
        .into_iter()
        .map(|row| LedgerRow {
            period: period.to_string(),
            account_head: row.account_head,
            account_type: row.account_type,
            amount: row.amount,
        })
        .collect();

    LedgerTable {
        source_name: table.source_name,
        period: period.to_string(),
        rows,
    }
}

/// `2023` becomes `"2023-2024"`.
pub fn financial_year_label(start_year: i32) -> String {
    format!("{}-{}", start_year, start_year + 1)
}

/// Label of the financial year containing `date`, for a year that starts on the
/// first day of `fy_start_month` (4 for an April-March year).
pub fn financial_year_for(date: NaiveDate, fy_start_month: u32) -> String {
    let start_year = if date.month() >= fy_start_month {
        date.year()
    } else {
        date.year() - 1
    };
    financial_year_label(start_year)
}

/// Year ranges from `first_start_year` to `last_start_year`, inclusive.
pub fn financial_year_options(first_start_year: i32, last_start_year: i32) -> Vec<String> {
    (first_start_year..=last_start_year)
        .map(financial_year_label)
        .collect()
}

pub fn month_names() -> Vec<&'static str> {
    (1..=12u8)
        .filter_map(|m| Month::try_from(m).ok())
        .map(|m| m.name())
        .collect()
}

pub fn compose_period_label(year_label: &str, month: Option<Month>) -> String {
    match month {
        Some(month) => format!("{} {}", year_label, month.name()),
        None => year_label.to_string(),
    }
}
