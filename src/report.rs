use crate::aggregator::{
    summarize_by_head, summarize_by_type, top_expenses, type_distribution, year_over_year,
    HeadSummaryRecord, IncomeExpense, Ledger, SummaryRecord, TopExpenseRecord, TypeShare,
};
use crate::config::AnalysisConfig;
use crate::error::{FailureKind, Result, TrialBalanceError};
use crate::metrics::{rag_report, ratios_for_period, FinancialRatios, RagRecord};
use crate::normalizer::NormalizationReport;
use num_format::{Locale, ToFormattedString};
use serde::Serialize;
use std::collections::BTreeMap;

/// A file that was excluded from the session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IngestFailure {
    pub file: String,
    pub period: String,
    pub kind: FailureKind,
    pub message: String,
}

impl IngestFailure {
    pub fn new(file: &str, period: &str, error: &TrialBalanceError) -> Self {
        Self {
            file: file.to_string(),
            period: period.to_string(),
            kind: error.kind(),
            message: error.to_string(),
        }
    }
}

/// Everything a renderer needs from one analysis session.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub currency_symbol: String,
    pub periods: Vec<String>,
    pub ledger: Ledger,
    pub ingestion: Vec<NormalizationReport>,
    pub failures: Vec<IngestFailure>,
    pub summary: Vec<SummaryRecord>,
    pub head_summary: Vec<HeadSummaryRecord>,
    pub top_expenses: BTreeMap<String, Vec<TopExpenseRecord>>,
    pub year_over_year: BTreeMap<String, IncomeExpense>,
    pub ratios: BTreeMap<String, FinancialRatios>,
    pub rag: BTreeMap<String, Vec<RagRecord>>,
    pub distribution: BTreeMap<String, Vec<TypeShare>>,
}

impl AnalysisReport {
    pub fn build(
        ledger: Ledger,
        ingestion: Vec<NormalizationReport>,
        failures: Vec<IngestFailure>,
        config: &AnalysisConfig,
    ) -> Self {
        let periods = ledger.periods();

        let mut top = BTreeMap::new();
        let mut ratios = BTreeMap::new();
        let mut rag = BTreeMap::new();
        let mut distribution = BTreeMap::new();

        for period in &periods {
            top.insert(period.clone(), top_expenses(&ledger, period, config.top_n));
            ratios.insert(period.clone(), ratios_for_period(&ledger, period));
            rag.insert(
                period.clone(),
                rag_report(&ledger, period, &config.rag_thresholds),
            );
            distribution.insert(period.clone(), type_distribution(&ledger, period));
        }

        Self {
            currency_symbol: config.currency_symbol.clone(),
            summary: summarize_by_type(&ledger),
            head_summary: summarize_by_head(&ledger),
            year_over_year: year_over_year(&ledger),
            periods,
            ledger,
            ingestion,
            failures,
            top_expenses: top,
            ratios,
            rag,
            distribution,
        }
    }

    pub fn total_coercion_failures(&self) -> usize {
        self.ingestion.iter().map(|r| r.coercion_failures.len()).sum()
    }

    pub fn total_rejected_rows(&self) -> usize {
        self.ingestion.iter().map(|r| r.rejected_rows.len()).sum()
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn to_markdown(&self) -> String {
        let symbol = self.currency_symbol.as_str();
        let mut output = String::new();

        output.push_str("# Trial Balance Analysis\n\n");

        for period in &self.periods {
            output.push_str(&format!("## {}\n\n", period));

            output.push_str("### Summary by Type\n\n");
            output.push_str("| Type | Amount | Share |\n|---|---:|---:|\n");
            if let Some(shares) = self.distribution.get(period) {
                for share in shares {
                    output.push_str(&format!(
                        "| {} | {} | {:.1}% |\n",
                        share.account_type,
                        format_amount(share.total_amount, symbol),
                        share.share * 100.0
                    ));
                }
            }
            output.push('\n');

            if let Some(ratios) = self.ratios.get(period) {
                output.push_str("### Key Financial Metrics\n\n");
                output.push_str(&format!(
                    "- **Total Income:** {}\n",
                    format_amount(ratios.totals.income, symbol)
                ));
                output.push_str(&format!(
                    "- **Total Expense:** {}\n",
                    format_amount(ratios.totals.expense, symbol)
                ));
                output.push_str(&format!(
                    "- **Profit / Surplus:** {}\n",
                    format_amount(ratios.profit, symbol)
                ));
                output.push_str(&format!("- **Profit Margin:** {}\n", ratios.profit_margin));
                output.push_str(&format!(
                    "- **Expense to Income:** {}\n",
                    ratios.expense_to_income_ratio
                ));
                output.push_str(&format!(
                    "- **Debt to Asset:** {}\n",
                    ratios.debt_to_asset_ratio
                ));
                output.push('\n');
            }

            if let Some(top) = self.top_expenses.get(period).filter(|t| !t.is_empty()) {
                output.push_str("### Top Expenses\n\n");
                for (rank, record) in top.iter().enumerate() {
                    output.push_str(&format!(
                        "{}. {}: {}\n",
                        rank + 1,
                        record.account_head,
                        format_amount(record.amount, symbol)
                    ));
                }
                output.push('\n');
            }

            if let Some(rag) = self.rag.get(period).filter(|r| !r.is_empty()) {
                output.push_str("### Expense Thresholds\n\n");
                output.push_str(
                    "| Account Head | Amount | Share of Expense | Threshold | Status |\n|---|---:|---:|---:|---|\n",
                );
                for record in rag {
                    output.push_str(&format!(
                        "| {} | {} | {:.1}% | {:.1}% | {} |\n",
                        escape_cell(&record.account_head),
                        format_amount(record.amount, symbol),
                        record.percent_of_total_expense * 100.0,
                        record.threshold * 100.0,
                        record.status
                    ));
                }
                output.push('\n');
            }
        }

        if self.year_over_year.len() > 1 {
            output.push_str("## Year over Year\n\n");
            output.push_str("| Period | Income | Expense |\n|---|---:|---:|\n");
            for (period, totals) in &self.year_over_year {
                output.push_str(&format!(
                    "| {} | {} | {} |\n",
                    escape_cell(period),
                    format_amount(totals.income, symbol),
                    format_amount(totals.expense, symbol)
                ));
            }
            output.push('\n');
        }

        let has_row_issues = self.ingestion.iter().any(|r| !r.is_clean());
        if has_row_issues || !self.failures.is_empty() {
            output.push_str("## Ingestion Issues\n\n");
            for report in self.ingestion.iter().filter(|r| !r.is_clean()) {
                output.push_str(&format!(
                    "- {}: {} unreadable amount(s), {} rejected row(s), {} sign anomaly(ies)\n",
                    report.source_name,
                    report.coercion_failures.len(),
                    report.rejected_rows.len(),
                    report.sign_anomalies
                ));
            }
            for failure in &self.failures {
                output.push_str(&format!("- {} (excluded): {}\n", failure.file, failure.message));
            }
            output.push('\n');
        }

        output
    }
}

/// `1234567.5` with `"₹"` becomes `"₹ 1,234,567.50"`; a negative amount keeps
/// the symbol first, as in `"₹ -300.00"`.
pub fn format_amount(amount: f64, symbol: &str) -> String {
    let cents = (amount.abs() * 100.0).round() as i64;
    let sign = if amount < 0.0 && cents != 0 { "-" } else { "" };
    format!(
        "{} {}{}.{:02}",
        symbol,
        sign,
        (cents / 100).to_formatted_string(&Locale::en),
        cents % 100
    )
}

/// Keeps a free-text value inside one Markdown table cell.
fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|").replace(['\r', '\n'], " ")
}
