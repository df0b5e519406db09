use crate::error::{Result, TrialBalanceError};
use crate::schema::{RawTable, ACCOUNT_HEAD_COLUMN, AMOUNT_COLUMN, REQUIRED_COLUMNS, TYPE_COLUMN};

/// Positions of the required columns within a validated table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnLayout {
    pub account_head: usize,
    pub account_type: usize,
    pub amount: usize,
}

/// Header names are compared case-sensitively after trimming surrounding
/// whitespace (and a leading byte-order mark). When a header repeats, the first
/// occurrence wins.
pub fn validate_columns(source_name: &str, headers: &[String]) -> Result<ColumnLayout> {
    let position = |wanted: &str| {
        headers
            .iter()
            .position(|h| clean_header(h) == wanted)
    };

    let missing: Vec<String> = REQUIRED_COLUMNS
        .iter()
        .filter(|c| position(**c).is_none())
        .map(|c| c.to_string())
        .collect();

    match (
        position(ACCOUNT_HEAD_COLUMN),
        position(TYPE_COLUMN),
        position(AMOUNT_COLUMN),
    ) {
        (Some(account_head), Some(account_type), Some(amount)) => Ok(ColumnLayout {
            account_head,
            account_type,
            amount,
        }),
        _ => Err(TrialBalanceError::MissingColumns {
            source_name: source_name.to_string(),
            missing,
        }),
    }
}

pub fn validate_table(table: &RawTable) -> Result<ColumnLayout> {
    validate_columns(&table.source_name, &table.headers)
}

pub(crate) fn clean_header(header: &str) -> &str {
    header.trim_start_matches('\u{feff}').trim()
}
