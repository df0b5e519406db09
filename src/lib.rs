//! # Trial Balance Analyzer
//!
//! A library for turning uploaded trial balance exports (CSV or XLSX) into a
//! canonical ledger, with period summaries, year-over-year comparison, top
//! expense heads, financial ratios and threshold (RAG) checks.
//!
//! ## Core Concepts
//!
//! - **Trial Balance**: rows of `Account Head`, `Type` (Asset, Liability, Income,
//!   Expense) and `Amount`
//! - **Sign Convention**: whether the source exports Income as negative numbers;
//!   every amount is normalized to a non-negative magnitude
//! - **Period**: an opaque label (e.g. `"2023-2024"`) stamped on every row of a
//!   file, so several files can be compared side by side
//! - **Ratios**: reported as a value or an explicit "not applicable" marker,
//!   never a silent zero
//!
//! ## Example
//!
//! ```rust,ignore
//! use trial_balance_analyzer::*;
//!
//! let csv = "Account Head,Type,Amount\nSales,Income,-1000\nRent,Expense,400\n";
//! let config = AnalysisConfig {
//!     income_is_negative: true,
//!     ..Default::default()
//! }
//! .with_threshold("Rent", 0.3);
//!
//! let report = TrialBalanceAnalyzer::new(&config)
//!     .analyze(&[UploadedFile::new("fy24.csv", "2023-2024", csv)])
//!     .unwrap();
//!
//! assert_eq!(report.ratios["2023-2024"].profit, 600.0);
//! ```

pub mod aggregator;
pub mod config;
pub mod error;
pub mod ingestion;
pub mod metrics;
pub mod normalizer;
pub mod period;
pub mod report;
pub mod schema;
pub mod validation;

pub use aggregator::{
    period_totals, summarize_by_head, summarize_by_type, top_expenses, type_distribution,
    year_over_year, HeadSummaryRecord, IncomeExpense, Ledger, PeriodTotals, SummaryRecord,
    TopExpenseRecord, TypeShare,
};
pub use config::{
    AnalysisConfig, CoercionPolicy, InvalidTypePolicy, SignConvention, DEFAULT_CURRENCY_SYMBOL,
    DEFAULT_TOP_N,
};
pub use error::{FailureKind, Result, TrialBalanceError};
pub use ingestion::{
    ingest_file, read_csv, read_spreadsheet, read_table, IngestedFile, SourceFormat, UploadedFile,
};
pub use metrics::{
    classify, compute_ratios, debt_to_asset_ratio, expense_to_income_ratio, profit,
    profit_margin, rag_report, rag_status, ratios_for_period, FinancialRatios, RagRecord,
    RagStatus, Ratio, AMBER_FRACTION,
};
pub use normalizer::{
    coerce_amount, normalize_table, parse_amount, AmountNormalizer, NormalizationReport, RowIssue,
    RowIssueReason,
};
pub use period::{
    compose_period_label, financial_year_for, financial_year_label, financial_year_options,
    month_names, tag_period,
};
pub use report::{format_amount, AnalysisReport, IngestFailure};
pub use schema::{
    AccountType, CellValue, LedgerRow, LedgerTable, NormalizedRow, NormalizedTable, RawRecord,
    RawTable, ACCOUNT_HEAD_COLUMN, AMOUNT_COLUMN, REQUIRED_COLUMNS, TYPE_COLUMN,
};
pub use validation::{validate_columns, validate_table, ColumnLayout};

use log::{debug, info, warn};

pub struct TrialBalanceAnalyzer<'a> {
    config: &'a AnalysisConfig,
}

impl<'a> TrialBalanceAnalyzer<'a> {
    pub fn new(config: &'a AnalysisConfig) -> Self {
        Self { config }
    }

    /// Ingests every file and derives all summaries and metrics.
    ///
    /// A file that cannot be read, lacks a required column, or is rejected by a
    /// row policy is listed in `failures` and left out; the others still make
    /// up the ledger. Only an invalid configuration fails the whole call.
    pub fn analyze(&self, files: &[UploadedFile]) -> Result<AnalysisReport> {
        self.config.validate()?;

        info!("Analyzing {} uploaded trial balance file(s)", files.len());
        debug!(
            "Sign convention {:?}, top_n {}, {} threshold(s) configured",
            self.config.sign_convention(),
            self.config.top_n,
            self.config.rag_thresholds.len()
        );

        let mut ledger = Ledger::new();
        let mut ingestion = Vec::new();
        let mut failures = Vec::new();

        for file in files {
            match ingest_file(file, self.config) {
                Ok(ingested) => {
                    info!(
                        "{}: {} row(s) added for period {}",
                        file.name,
                        ingested.table.rows.len(),
                        file.period
                    );
                    ledger.push(ingested.table);
                    ingestion.push(ingested.report);
                }
                Err(err) => {
                    warn!("{}: excluded from analysis: {}", file.name, err);
                    failures.push(IngestFailure::new(&file.name, &file.period, &err));
                }
            }
        }

        info!(
            "Ledger holds {} row(s) across {} period(s); {} file(s) excluded",
            ledger.row_count(),
            ledger.periods().len(),
            failures.len()
        );

        Ok(AnalysisReport::build(ledger, ingestion, failures, self.config))
    }
}

pub fn analyze_files(files: &[UploadedFile], config: &AnalysisConfig) -> Result<AnalysisReport> {
    TrialBalanceAnalyzer::new(config).analyze(files)
}
