use crate::config::{AnalysisConfig, CoercionPolicy, InvalidTypePolicy, SignConvention};
use crate::error::{Result, TrialBalanceError};
use crate::schema::{AccountType, CellValue, NormalizedRow, NormalizedTable, RawTable};
use crate::validation::ColumnLayout;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

const CURRENCY_SYMBOLS: [char; 5] = ['₹', '$', '€', '£', '¥'];
const CURRENCY_PREFIXES: [&str; 3] = ["inr", "rs.", "rs"];
const BALANCE_SUFFIXES: [&str; 2] = ["dr", "cr"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowIssueReason {
    NonNumericAmount,
    UnrecognizedType,
    EmptyAccountHead,
}

/// A row that was coerced or excluded during normalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowIssue {
    pub line: usize,
    pub account_head: String,
    /// The offending raw cell value.
    pub value: String,
    pub reason: RowIssueReason,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NormalizationReport {
    pub source_name: String,
    pub rows_read: usize,
    pub rows_accepted: usize,
    /// Amounts that could not be read as numbers, whatever the policy did with them.
    pub coercion_failures: Vec<RowIssue>,
    /// Rows excluded for an unrecognized type or an empty account head.
    pub rejected_rows: Vec<RowIssue>,
    /// Rows still negative after the sign convention was applied.
    pub sign_anomalies: usize,
}

impl NormalizationReport {
    pub fn is_clean(&self) -> bool {
        self.coercion_failures.is_empty() && self.rejected_rows.is_empty() && self.sign_anomalies == 0
    }
}

pub struct AmountNormalizer {
    convention: SignConvention,
    coercion_policy: CoercionPolicy,
    invalid_type_policy: InvalidTypePolicy,
}

impl AmountNormalizer {
    pub fn new(convention: SignConvention) -> Self {
        Self {
            convention,
            coercion_policy: CoercionPolicy::default(),
            invalid_type_policy: InvalidTypePolicy::default(),
        }
    }

    pub fn from_config(config: &AnalysisConfig) -> Self {
        Self {
            convention: config.sign_convention(),
            coercion_policy: config.coercion_policy,
            invalid_type_policy: config.invalid_type_policy,
        }
    }

    pub fn with_coercion_policy(mut self, policy: CoercionPolicy) -> Self {
        self.coercion_policy = policy;
        self
    }

    pub fn with_invalid_type_policy(mut self, policy: InvalidTypePolicy) -> Self {
        self.invalid_type_policy = policy;
        self
    }

    pub fn convention(&self) -> SignConvention {
        self.convention
    }

    /// Maps a raw amount to its canonical magnitude. The second value is true when
    /// the source contradicted its declared convention (a negative value survived
    /// the Income flip).
    pub fn canonical_amount(&self, account_type: AccountType, raw: f64) -> (f64, bool) {
        let signed = raw * self.convention.factor_for(account_type);
        let anomaly = self.convention.income_is_negative() && signed < 0.0;
        (signed.abs(), anomaly)
    }

    pub fn normalize(
        &self,
        raw: &RawTable,
        layout: ColumnLayout,
    ) -> Result<(NormalizedTable, NormalizationReport)> {
        let mut report = NormalizationReport {
            source_name: raw.source_name.clone(),
            rows_read: raw.records.len(),
            ..Default::default()
        };
        let mut rows = Vec::with_capacity(raw.records.len());
        let mut invalid_type_lines = Vec::new();

        for record in &raw.records {
            let account_head = record.cell(layout.account_head).as_text().trim().to_string();
            let type_cell = record.cell(layout.account_type).as_text();

            let Some(account_type) = AccountType::from_label(&type_cell) else {
                invalid_type_lines.push(record.line);
                report.rejected_rows.push(RowIssue {
                    line: record.line,
                    account_head,
                    value: type_cell,
                    reason: RowIssueReason::UnrecognizedType,
                });
                continue;
            };

            if account_head.is_empty() {
                report.rejected_rows.push(RowIssue {
                    line: record.line,
                    account_head,
                    value: String::new(),
                    reason: RowIssueReason::EmptyAccountHead,
                });
                continue;
            }

            let amount_cell = record.cell(layout.amount);
            let raw_amount = match coerce_amount(amount_cell) {
                Some(value) => value,
                None => {
                    let issue = RowIssue {
                        line: record.line,
                        account_head: account_head.clone(),
                        value: amount_cell.as_text(),
                        reason: RowIssueReason::NonNumericAmount,
                    };
                    match self.coercion_policy {
                        CoercionPolicy::Reject => {
                            return Err(TrialBalanceError::InvalidAmount {
                                source_name: raw.source_name.clone(),
                                row: issue.line,
                                value: issue.value,
                            });
                        }
                        CoercionPolicy::SkipRow => {
                            report.coercion_failures.push(issue);
                            continue;
                        }
                        CoercionPolicy::ZeroWithReport => {
                            report.coercion_failures.push(issue);
                            0.0
                        }
                    }
                }
            };

            let (amount, anomaly) = self.canonical_amount(account_type, raw_amount);
            if anomaly {
                report.sign_anomalies += 1;
            }

            rows.push(NormalizedRow {
                account_head,
                account_type,
                amount,
            });
        }

        if self.invalid_type_policy == InvalidTypePolicy::RejectFile && !invalid_type_lines.is_empty()
        {
            return Err(TrialBalanceError::InvalidAccountType {
                source_name: raw.source_name.clone(),
                count: invalid_type_lines.len(),
                rows: invalid_type_lines,
            });
        }

        report.rows_accepted = rows.len();
        log_report(&report);

        Ok((
            NormalizedTable {
                source_name: raw.source_name.clone(),
                rows,
            },
            report,
        ))
    }
}

fn log_report(report: &NormalizationReport) {
    debug!(
        "{}: {} of {} rows accepted",
        report.source_name, report.rows_accepted, report.rows_read
    );
    if !report.coercion_failures.is_empty() {
        warn!(
            "{}: {} amount(s) could not be read as numbers",
            report.source_name,
            report.coercion_failures.len()
        );
    }
    if !report.rejected_rows.is_empty() {
        warn!(
            "{}: {} row(s) rejected for an unrecognized type or empty account head",
            report.source_name,
            report.rejected_rows.len()
        );
    }
    if report.sign_anomalies > 0 {
        warn!(
            "{}: {} row(s) contradict the declared sign convention; magnitudes used",
            report.source_name, report.sign_anomalies
        );
    }
}

pub fn normalize_table(
    raw: &RawTable,
    layout: ColumnLayout,
    config: &AnalysisConfig,
) -> Result<(NormalizedTable, NormalizationReport)> {
    AmountNormalizer::from_config(config).normalize(raw, layout)
}

pub fn coerce_amount(cell: &CellValue) -> Option<f64> {
    match cell {
        CellValue::Number(n) if n.is_finite() => Some(*n),
        CellValue::Number(_) | CellValue::Empty => None,
        CellValue::Text(text) => parse_amount(text),
    }
}

/// Reads a possibly locale-formatted amount.
///
/// Accepts thousands separators (including lakh grouping such as `1,00,000`),
/// currency symbols and `INR`/`Rs` prefixes, accounting parentheses and trailing
/// minus signs for negatives, `Dr`/`Cr` suffixes, and `1.234,56` style decimal
/// commas when both separators are present.
pub fn parse_amount(raw: &str) -> Option<f64> {
    let compact: String = raw
        .chars()
        .filter(|c| !c.is_whitespace() && !CURRENCY_SYMBOLS.contains(c) && !matches!(c, '_' | '\''))
        .collect();

    let decimal_comma = match (compact.rfind(','), compact.rfind('.')) {
        (Some(comma), Some(dot)) => comma > dot,
        _ => false,
    };
    let mut text: String = if decimal_comma {
        compact
            .chars()
            .filter(|c| *c != '.')
            .map(|c| if c == ',' { '.' } else { c })
            .collect()
    } else {
        compact.chars().filter(|c| *c != ',').collect()
    };

    text = strip_suffix_ignore_case(&text, &BALANCE_SUFFIXES).to_string();
    text = strip_prefix_ignore_case(&text, &CURRENCY_PREFIXES).to_string();

    let mut negative = false;
    if let Some(inner) = text.strip_prefix('(').and_then(|t| t.strip_suffix(')')) {
        negative = true;
        text = strip_prefix_ignore_case(inner, &CURRENCY_PREFIXES).to_string();
    }
    if let Some(inner) = text.strip_suffix('-') {
        negative = !negative;
        text = inner.to_string();
    }

    if text.is_empty() {
        return None;
    }

    let value: f64 = text.parse().ok()?;
    if !value.is_finite() {
        return None;
    }

    Some(if negative { -value } else { value })
}

fn strip_prefix_ignore_case<'a>(text: &'a str, prefixes: &[&str]) -> &'a str {
    for prefix in prefixes {
        if text.is_char_boundary(prefix.len())
            && text.len() >= prefix.len()
            && text[..prefix.len()].eq_ignore_ascii_case(prefix)
        {
            return &text[prefix.len()..];
        }
    }
    text
}

fn strip_suffix_ignore_case<'a>(text: &'a str, suffixes: &[&str]) -> &'a str {
    for suffix in suffixes {
        if text.len() >= suffix.len() {
            let cut = text.len() - suffix.len();
            if text.is_char_boundary(cut) && text[cut..].eq_ignore_ascii_case(suffix) {
                return &text[..cut];
            }
        }
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::RawRecord;

    fn layout() -> ColumnLayout {
        ColumnLayout {
            account_head: 0,
            account_type: 1,
            amount: 2,
        }
    }

    fn raw_table(rows: &[(&str, &str, CellValue)]) -> RawTable {
        RawTable {
            source_name: "tb.csv".to_string(),
            headers: vec!["Account Head".into(), "Type".into(), "Amount".into()],
            records: rows
                .iter()
                .enumerate()
                .map(|(i, (head, ty, amount))| RawRecord {
                    line: i + 2,
                    cells: vec![
                        CellValue::Text(head.to_string()),
                        CellValue::Text(ty.to_string()),
                        amount.clone(),
                    ],
                })
                .collect(),
        }
    }

    fn num(value: f64) -> CellValue {
        CellValue::Number(value)
    }

    fn text(value: &str) -> CellValue {
        CellValue::Text(value.to_string())
    }

    #[test]
    fn test_parse_amount_plain_and_signed() {
        assert_eq!(parse_amount("1234.5"), Some(1234.5));
        assert_eq!(parse_amount("-400"), Some(-400.0));
        assert_eq!(parse_amount("  +12 "), Some(12.0));
    }

    #[test]
    fn test_parse_amount_locale_formatting() {
        assert_eq!(parse_amount("1,234.56"), Some(1234.56));
        assert_eq!(parse_amount("₹ 1,00,000"), Some(100000.0));
        assert_eq!(parse_amount("$2,500"), Some(2500.0));
        assert_eq!(parse_amount("Rs. 750"), Some(750.0));
        assert_eq!(parse_amount("INR 90"), Some(90.0));
        assert_eq!(parse_amount("1.234,50"), Some(1234.5));
        assert_eq!(parse_amount("1 000"), Some(1000.0));
    }

    #[test]
    fn test_parse_amount_accounting_negatives() {
        assert_eq!(parse_amount("(500)"), Some(-500.0));
        assert_eq!(parse_amount("(₹ 1,200.00)"), Some(-1200.0));
        assert_eq!(parse_amount("300-"), Some(-300.0));
        assert_eq!(parse_amount("450 Dr"), Some(450.0));
        assert_eq!(parse_amount("450 cr"), Some(450.0));
    }

    #[test]
    fn test_parse_amount_rejects_garbage() {
        assert_eq!(parse_amount(""), None);
        assert_eq!(parse_amount("   "), None);
        assert_eq!(parse_amount("n/a"), None);
        assert_eq!(parse_amount("NaN"), None);
        assert_eq!(parse_amount("inf"), None);
        assert_eq!(parse_amount("12abc"), None);
        assert_eq!(parse_amount("₹"), None);
    }

    #[test]
    fn test_income_negative_convention_flips_income_only() {
        let raw = raw_table(&[
            ("Sales", "Income", num(-1000.0)),
            ("Rent", "Expense", num(400.0)),
            ("Cash", "Asset", num(2000.0)),
        ]);
        let normalizer = AmountNormalizer::new(SignConvention::IncomeNegative);
        let (table, report) = normalizer.normalize(&raw, layout()).unwrap();

        let amounts: Vec<f64> = table.rows.iter().map(|r| r.amount).collect();
        assert_eq!(amounts, vec![1000.0, 400.0, 2000.0]);
        assert!(report.is_clean());
        assert_eq!(report.rows_accepted, 3);
    }

    #[test]
    fn test_income_positive_convention_takes_magnitudes() {
        let raw = raw_table(&[
            ("Sales", "Income", num(1000.0)),
            ("Rent", "Expense", num(-400.0)),
            ("Loan", "Liability", text("(500)")),
        ]);
        let normalizer = AmountNormalizer::new(SignConvention::IncomePositive);
        let (table, report) = normalizer.normalize(&raw, layout()).unwrap();

        let amounts: Vec<f64> = table.rows.iter().map(|r| r.amount).collect();
        assert_eq!(amounts, vec![1000.0, 400.0, 500.0]);
        assert_eq!(report.sign_anomalies, 0);
    }

    #[test]
    fn test_sign_anomalies_are_counted_and_magnitude_kept() {
        let raw = raw_table(&[
            ("Sales", "Income", num(1000.0)),
            ("Refunds", "Expense", num(-50.0)),
        ]);
        let normalizer = AmountNormalizer::new(SignConvention::IncomeNegative);
        let (table, report) = normalizer.normalize(&raw, layout()).unwrap();

        assert_eq!(report.sign_anomalies, 2);
        assert!(table.rows.iter().all(|r| r.amount >= 0.0));
        assert_eq!(table.rows[0].amount, 1000.0);
    }

    #[test]
    fn test_polarity_invertibility() {
        let original = raw_table(&[
            ("Sales", "Income", num(-1000.0)),
            ("Interest", "income", num(-25.5)),
            ("Rent", "Expense", num(400.0)),
            ("Loan", "Liability", num(500.0)),
        ]);
        let flipped = raw_table(&[
            ("Sales", "Income", num(1000.0)),
            ("Interest", "income", num(25.5)),
            ("Rent", "Expense", num(400.0)),
            ("Loan", "Liability", num(500.0)),
        ]);

        let convention = SignConvention::IncomeNegative;
        let (a, _) = AmountNormalizer::new(convention)
            .normalize(&original, layout())
            .unwrap();
        let (b, _) = AmountNormalizer::new(convention.flipped())
            .normalize(&flipped, layout())
            .unwrap();

        assert_eq!(a, b);
    }

    #[test]
    fn test_normalizing_canonical_rows_is_a_no_op() {
        let raw = raw_table(&[
            ("Sales", "Income", num(1000.0)),
            ("Rent", "Expense", num(400.0)),
            ("Cash", "Asset", num(2000.0)),
            ("Loan", "Liability", num(500.0)),
        ]);
        let normalizer = AmountNormalizer::new(SignConvention::IncomePositive);
        let (first, _) = normalizer.normalize(&raw, layout()).unwrap();

        let again = raw_table(
            &first
                .rows
                .iter()
                .map(|r| (r.account_head.as_str(), r.account_type.as_str(), num(r.amount)))
                .collect::<Vec<_>>(),
        );
        let (second, report) = normalizer.normalize(&again, layout()).unwrap();

        assert_eq!(first, second);
        assert!(report.is_clean());
        assert_eq!(second.rows[0].account_type, AccountType::Income);
        assert_eq!(second.rows[0].amount, 1000.0);
    }

    #[test]
    fn test_type_labels_are_canonicalized() {
        let raw = raw_table(&[("Rent", "  EXPENSE ", num(10.0))]);
        let (table, _) = AmountNormalizer::new(SignConvention::IncomePositive)
            .normalize(&raw, layout())
            .unwrap();
        assert_eq!(table.rows[0].account_type, AccountType::Expense);
    }

    #[test]
    fn test_unparseable_amount_zeroed_and_reported() {
        let raw = raw_table(&[
            ("Rent", "Expense", text("four hundred")),
            ("Power", "Expense", num(60.0)),
        ]);
        let (table, report) = AmountNormalizer::new(SignConvention::IncomePositive)
            .normalize(&raw, layout())
            .unwrap();

        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0].amount, 0.0);
        assert_eq!(report.coercion_failures.len(), 1);
        assert_eq!(report.coercion_failures[0].line, 2);
        assert_eq!(report.coercion_failures[0].value, "four hundred");
        assert_eq!(
            report.coercion_failures[0].reason,
            RowIssueReason::NonNumericAmount
        );
    }

    #[test]
    fn test_unparseable_amount_skip_and_reject_policies() {
        let raw = raw_table(&[
            ("Rent", "Expense", CellValue::Empty),
            ("Power", "Expense", num(60.0)),
        ]);

        let (table, report) = AmountNormalizer::new(SignConvention::IncomePositive)
            .with_coercion_policy(CoercionPolicy::SkipRow)
            .normalize(&raw, layout())
            .unwrap();
        assert_eq!(table.rows.len(), 1);
        assert_eq!(report.rows_accepted, 1);
        assert_eq!(report.coercion_failures.len(), 1);

        let err = AmountNormalizer::new(SignConvention::IncomePositive)
            .with_coercion_policy(CoercionPolicy::Reject)
            .normalize(&raw, layout())
            .unwrap_err();
        assert!(matches!(err, TrialBalanceError::InvalidAmount { row: 2, .. }));
    }

    #[test]
    fn test_unrecognized_types_skipped_with_report() {
        let raw = raw_table(&[
            ("Capital", "Equity", num(100.0)),
            ("Rent", "Expense", num(40.0)),
            ("", "Expense", num(5.0)),
        ]);
        let (table, report) = AmountNormalizer::new(SignConvention::IncomePositive)
            .normalize(&raw, layout())
            .unwrap();

        assert_eq!(table.rows.len(), 1);
        assert_eq!(report.rows_read, 3);
        assert_eq!(report.rejected_rows.len(), 2);
        assert_eq!(report.rejected_rows[0].reason, RowIssueReason::UnrecognizedType);
        assert_eq!(report.rejected_rows[0].value, "Equity");
        assert_eq!(report.rejected_rows[1].reason, RowIssueReason::EmptyAccountHead);
    }

    #[test]
    fn test_unrecognized_types_reject_file_policy() {
        let raw = raw_table(&[
            ("Capital", "Equity", num(100.0)),
            ("Rent", "Expense", num(40.0)),
            ("Drawings", "Misc", num(3.0)),
        ]);
        let err = AmountNormalizer::new(SignConvention::IncomePositive)
            .with_invalid_type_policy(InvalidTypePolicy::RejectFile)
            .normalize(&raw, layout())
            .unwrap_err();

        match err {
            TrialBalanceError::InvalidAccountType { count, rows, .. } => {
                assert_eq!(count, 2);
                assert_eq!(rows, vec![2, 4]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
