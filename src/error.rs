use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TrialBalanceError {
    #[error("{source_name}: missing required column(s): {}", .missing.join(", "))]
    MissingColumns {
        source_name: String,
        missing: Vec<String>,
    },

    #[error("{source_name}: could not be read as a table: {reason}")]
    UnparseableFile { source_name: String, reason: String },

    #[error("{source_name}: {count} row(s) have an unrecognized account type (rows {rows:?})")]
    InvalidAccountType {
        source_name: String,
        count: usize,
        rows: Vec<usize>,
    },

    #[error("{source_name}: row {row} has a non-numeric amount '{value}'")]
    InvalidAmount {
        source_name: String,
        row: usize,
        value: String,
    },

    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Coarse classification of an error, used when listing per-file failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    MissingColumns,
    UnparseableFile,
    InvalidAccountType,
    InvalidAmount,
    UnsupportedFormat,
    InvalidConfig,
    Internal,
}

impl TrialBalanceError {
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::MissingColumns { .. } => FailureKind::MissingColumns,
            Self::UnparseableFile { .. } | Self::CsvError(_) => FailureKind::UnparseableFile,
            Self::InvalidAccountType { .. } => FailureKind::InvalidAccountType,
            Self::InvalidAmount { .. } => FailureKind::InvalidAmount,
            Self::UnsupportedFormat(_) => FailureKind::UnsupportedFormat,
            Self::InvalidConfig(_) => FailureKind::InvalidConfig,
            Self::SerializationError(_) | Self::IoError(_) => FailureKind::Internal,
        }
    }

    pub(crate) fn unparseable(source_name: &str, reason: impl ToString) -> Self {
        Self::UnparseableFile {
            source_name: source_name.to_string(),
            reason: reason.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, TrialBalanceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_columns_message_names_columns() {
        let err = TrialBalanceError::MissingColumns {
            source_name: "tb.csv".to_string(),
            missing: vec!["Type".to_string(), "Amount".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "tb.csv: missing required column(s): Type, Amount"
        );
        assert_eq!(err.kind(), FailureKind::MissingColumns);
    }

    #[test]
    fn test_unparseable_helper_keeps_reason() {
        let err = TrialBalanceError::unparseable("x.csv", "bad quoting");
        assert_eq!(err.kind(), FailureKind::UnparseableFile);
        assert!(err.to_string().contains("bad quoting"));
    }

    #[test]
    fn test_csv_errors_count_as_unparseable() {
        let bytes: &[u8] = b"Account Head\n\xff\xfe\n";
        let mut reader = csv::Reader::from_reader(bytes);
        let csv_error = reader
            .records()
            .next()
            .expect("one data row")
            .expect_err("invalid UTF-8 must fail");

        let err = TrialBalanceError::from(csv_error);
        assert!(matches!(err, TrialBalanceError::CsvError(_)));
        assert_eq!(err.kind(), FailureKind::UnparseableFile);
        assert!(err.to_string().starts_with("CSV error:"));
    }
}
