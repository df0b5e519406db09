use crate::error::{Result, TrialBalanceError};
use crate::schema::AccountType;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

pub const DEFAULT_TOP_N: usize = 5;
pub const DEFAULT_CURRENCY_SYMBOL: &str = "₹";

/// Sign convention used by a source file for its Income rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum SignConvention {
    #[schemars(
        description = "Income is exported as positive numbers. Every amount is reduced to its magnitude."
    )]
    IncomePositive,

    #[schemars(
        description = "Income is exported as negative numbers (credit balances). Income rows are negated, other rows kept."
    )]
    IncomeNegative,
}

impl SignConvention {
    pub fn from_income_is_negative(income_is_negative: bool) -> Self {
        if income_is_negative {
            Self::IncomeNegative
        } else {
            Self::IncomePositive
        }
    }

    pub fn income_is_negative(&self) -> bool {
        matches!(self, Self::IncomeNegative)
    }

    pub fn flipped(&self) -> Self {
        match self {
            Self::IncomePositive => Self::IncomeNegative,
            Self::IncomeNegative => Self::IncomePositive,
        }
    }

    /// Factor applied to a raw amount of the given type before taking its magnitude.
    pub fn factor_for(&self, account_type: AccountType) -> f64 {
        match (self, account_type) {
            (Self::IncomeNegative, AccountType::Income) => -1.0,
            _ => 1.0,
        }
    }
}

impl Default for SignConvention {
    fn default() -> Self {
        Self::IncomePositive
    }
}

/// What to do with an amount cell that cannot be read as a number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum CoercionPolicy {
    #[schemars(description = "Keep the row with amount 0 and list it in the ingestion report.")]
    ZeroWithReport,

    #[schemars(description = "Drop the row and list it in the ingestion report.")]
    SkipRow,

    #[schemars(description = "Fail the whole file.")]
    Reject,
}

impl Default for CoercionPolicy {
    fn default() -> Self {
        Self::ZeroWithReport
    }
}

/// What to do with a row whose type is not Asset, Liability, Income or Expense.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum InvalidTypePolicy {
    #[schemars(description = "Drop the row and list it in the ingestion report.")]
    SkipRow,

    #[schemars(description = "Fail the whole file, reporting every offending row.")]
    RejectFile,
}

impl Default for InvalidTypePolicy {
    fn default() -> Self {
        Self::SkipRow
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AnalysisConfig {
    #[serde(default)]
    #[schemars(
        description = "True when the uploaded files export Income as negative numbers."
    )]
    pub income_is_negative: bool,

    #[serde(default)]
    #[schemars(
        description = "Expense heads to monitor, mapped to the share of total expense (0 < x <= 1) above which the head is flagged High."
    )]
    pub rag_thresholds: BTreeMap<String, f64>,

    #[serde(default = "default_top_n")]
    #[schemars(description = "How many expense heads to list per period. Defaults to 5.")]
    pub top_n: usize,

    #[serde(default)]
    pub coercion_policy: CoercionPolicy,

    #[serde(default)]
    pub invalid_type_policy: InvalidTypePolicy,

    #[serde(default = "default_currency_symbol")]
    #[schemars(description = "Symbol prefixed to amounts in rendered reports.")]
    pub currency_symbol: String,
}

fn default_top_n() -> usize {
    DEFAULT_TOP_N
}

fn default_currency_symbol() -> String {
    DEFAULT_CURRENCY_SYMBOL.to_string()
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            income_is_negative: false,
            rag_thresholds: BTreeMap::new(),
            top_n: DEFAULT_TOP_N,
            coercion_policy: CoercionPolicy::default(),
            invalid_type_policy: InvalidTypePolicy::default(),
            currency_symbol: default_currency_symbol(),
        }
    }
}

impl AnalysisConfig {
    pub fn sign_convention(&self) -> SignConvention {
        SignConvention::from_income_is_negative(self.income_is_negative)
    }

    pub fn with_threshold(mut self, account_head: impl Into<String>, fraction: f64) -> Self {
        self.rag_thresholds.insert(account_head.into(), fraction);
        self
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    pub fn validate(&self) -> Result<()> {
        if self.top_n == 0 {
            return Err(TrialBalanceError::InvalidConfig(
                "top_n must be at least 1".to_string(),
            ));
        }

        for (head, &fraction) in &self.rag_thresholds {
            if !(fraction > 0.0 && fraction <= 1.0) {
                return Err(TrialBalanceError::InvalidConfig(format!(
                    "Threshold for '{}' must be in (0, 1], got {}",
                    head, fraction
                )));
            }
        }

        Ok(())
    }

    pub fn generate_json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(AnalysisConfig)
    }

    pub fn schema_as_json() -> std::result::Result<String, serde_json::Error> {
        let schema = Self::generate_json_schema();
        serde_json::to_string_pretty(&schema)
    }
}
