use serde::{Deserialize, Serialize};
use std::fmt;

/// Column headers every uploaded trial balance must expose.
pub const ACCOUNT_HEAD_COLUMN: &str = "Account Head";
pub const TYPE_COLUMN: &str = "Type";
pub const AMOUNT_COLUMN: &str = "Amount";

pub const REQUIRED_COLUMNS: [&str; 3] = [ACCOUNT_HEAD_COLUMN, TYPE_COLUMN, AMOUNT_COLUMN];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum AccountType {
    /// Resources owned by the business: cash, receivables, stock, equipment (Balance Sheet)
    Asset,
    /// Obligations owed to others: payables, loans (Balance Sheet)
    Liability,
    /// Sales and other revenue (Profit & Loss)
    Income,
    /// Rent, salaries, purchases and other costs (Profit & Loss)
    Expense,
}

impl AccountType {
    pub const ALL: [AccountType; 4] = [
        AccountType::Asset,
        AccountType::Liability,
        AccountType::Income,
        AccountType::Expense,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AccountType::Asset => "Asset",
            AccountType::Liability => "Liability",
            AccountType::Income => "Income",
            AccountType::Expense => "Expense",
        }
    }

    /// Parses a raw type cell. Surrounding whitespace is ignored and the label is
    /// title-cased before matching, so `" expense "` and `"EXPENSE"` both map to
    /// [`AccountType::Expense`].
    pub fn from_label(raw: &str) -> Option<Self> {
        let canonical = title_case(raw.trim());
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == canonical)
    }

    pub fn is_profit_and_loss(&self) -> bool {
        matches!(self, AccountType::Income | AccountType::Expense)
    }
}

impl fmt::Display for AccountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

/// A single cell as read from an uploaded file, before any coercion.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Text(String),
    Number(f64),
    Empty,
}

impl CellValue {
    pub fn is_blank(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.trim().is_empty(),
            CellValue::Number(_) => false,
        }
    }

    pub fn as_text(&self) -> String {
        match self {
            CellValue::Text(s) => s.clone(),
            CellValue::Number(n) => n.to_string(),
            CellValue::Empty => String::new(),
        }
    }
}

static EMPTY_CELL: CellValue = CellValue::Empty;

#[derive(Debug, Clone)]
pub struct RawRecord {
    /// 1-based row number in the source file, header row included.
    pub line: usize,
    pub cells: Vec<CellValue>,
}

impl RawRecord {
    pub fn cell(&self, index: usize) -> &CellValue {
        self.cells.get(index).unwrap_or(&EMPTY_CELL)
    }
}

/// A parsed but unvalidated upload: header names plus raw records.
#[derive(Debug, Clone)]
pub struct RawTable {
    pub source_name: String,
    pub headers: Vec<String>,
    pub records: Vec<RawRecord>,
}

/// A row after type and amount normalization, not yet assigned to a period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedRow {
    pub account_head: String,
    pub account_type: AccountType,
    /// Non-negative magnitude.
    pub amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedTable {
    pub source_name: String,
    pub rows: Vec<NormalizedRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerRow {
    pub period: String,
    pub account_head: String,
    pub account_type: AccountType,
    pub amount: f64,
}

/// All rows from one upload, stamped with that upload's period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerTable {
    pub source_name: String,
    pub period: String,
    pub rows: Vec<LedgerRow>,
}
