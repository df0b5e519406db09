use crate::config::AnalysisConfig;
use crate::error::{Result, TrialBalanceError};
use crate::normalizer::{AmountNormalizer, NormalizationReport};
use crate::period::tag_period;
use crate::schema::{CellValue, LedgerTable, RawRecord, RawTable};
use crate::validation::{clean_header, validate_table};
use log::debug;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceFormat {
    /// Comma-delimited text with a header row.
    Csv,
    /// Office Open XML workbook; the first worksheet is read.
    Spreadsheet,
}

impl SourceFormat {
    pub fn detect(file_name: &str) -> Result<Self> {
        let extension = Path::new(file_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());

        match extension.as_deref() {
            Some("csv") => Ok(Self::Csv),
            Some("xlsx") | Some("xlsm") => Ok(Self::Spreadsheet),
            _ => Err(TrialBalanceError::UnsupportedFormat(file_name.to_string())),
        }
    }
}

/// One upload in an analysis session.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub name: String,
    pub period: String,
    pub bytes: Vec<u8>,
    /// Overrides extension-based detection.
    pub format: Option<SourceFormat>,
}

impl UploadedFile {
    pub fn new(name: impl Into<String>, period: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            period: period.into(),
            bytes: bytes.into(),
            format: None,
        }
    }

    pub fn with_format(mut self, format: SourceFormat) -> Self {
        self.format = Some(format);
        self
    }

    pub fn resolved_format(&self) -> Result<SourceFormat> {
        match self.format {
            Some(format) => Ok(format),
            None => SourceFormat::detect(&self.name),
        }
    }
}

#[derive(Debug, Clone)]
pub struct IngestedFile {
    pub table: LedgerTable,
    pub report: NormalizationReport,
}

/// Runs one upload through parsing, column validation, normalization and
/// period tagging.
pub fn ingest_file(file: &UploadedFile, config: &AnalysisConfig) -> Result<IngestedFile> {
    let format = file.resolved_format()?;
    let raw = read_table(&file.name, &file.bytes, format)?;
    let layout = validate_table(&raw)?;

    debug!(
        "{}: read {} data rows as {:?}",
        file.name,
        raw.records.len(),
        format
    );

    let (normalized, report) = AmountNormalizer::from_config(config).normalize(&raw, layout)?;
    let table = tag_period(normalized, &file.period);

    Ok(IngestedFile { table, report })
}

pub fn read_table(source_name: &str, bytes: &[u8], format: SourceFormat) -> Result<RawTable> {
    match format {
        SourceFormat::Csv => read_csv(source_name, bytes),
        SourceFormat::Spreadsheet => read_spreadsheet(source_name, bytes),
    }
}

pub fn read_csv(source_name: &str, bytes: &[u8]) -> Result<RawTable> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(bytes);

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| TrialBalanceError::unparseable(source_name, e))?
        .iter()
        .map(|h| clean_header(h).to_string())
        .collect();

    if headers.iter().all(|h| h.is_empty()) {
        return Err(TrialBalanceError::unparseable(source_name, "no header row"));
    }

    let mut records = Vec::new();
    for (index, result) in reader.records().enumerate() {
        let record = result.map_err(|e| TrialBalanceError::unparseable(source_name, e))?;
        let line = record
            .position()
            .map(|p| p.line() as usize)
            .unwrap_or(index + 2);

        let cells: Vec<CellValue> = record
            .iter()
            .map(|field| {
                if field.trim().is_empty() {
                    CellValue::Empty
                } else {
                    CellValue::Text(field.to_string())
                }
            })
            .collect();

        push_unless_blank(&mut records, line, cells);
    }

    Ok(RawTable {
        source_name: source_name.to_string(),
        headers,
        records,
    })
}

#[cfg(feature = "xlsx")]
pub fn read_spreadsheet(source_name: &str, bytes: &[u8]) -> Result<RawTable> {
    use calamine::{Data, Reader, Xlsx};
    use std::io::Cursor;

    fn to_cell(data: &Data) -> CellValue {
        match data {
            Data::Int(i) => CellValue::Number(*i as f64),
            Data::Float(f) => CellValue::Number(*f),
            Data::String(s) if s.trim().is_empty() => CellValue::Empty,
            Data::String(s) => CellValue::Text(s.clone()),
            Data::Empty => CellValue::Empty,
            other => CellValue::Text(other.to_string()),
        }
    }

    let mut workbook: Xlsx<_> = Xlsx::new(Cursor::new(bytes))
        .map_err(|e| TrialBalanceError::unparseable(source_name, e))?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| TrialBalanceError::unparseable(source_name, "workbook has no worksheets"))?
        .map_err(|e| TrialBalanceError::unparseable(source_name, e))?;

    let first_row = range.start().map(|(row, _)| row as usize).unwrap_or(0);
    let mut rows = range.rows();

    let headers: Vec<String> = match rows.next() {
        Some(header_row) => header_row
            .iter()
            .map(|cell| clean_header(&to_cell(cell).as_text()).to_string())
            .collect(),
        None => return Err(TrialBalanceError::unparseable(source_name, "no header row")),
    };

    let mut records = Vec::new();
    for (offset, row) in rows.enumerate() {
        // Header sits on first_row; data starts one below, reported 1-based.
        let line = first_row + offset + 2;
        push_unless_blank(&mut records, line, row.iter().map(to_cell).collect());
    }

    Ok(RawTable {
        source_name: source_name.to_string(),
        headers,
        records,
    })
}

#[cfg(not(feature = "xlsx"))]
pub fn read_spreadsheet(source_name: &str, _bytes: &[u8]) -> Result<RawTable> {
    Err(TrialBalanceError::UnsupportedFormat(format!(
        "{} (built without spreadsheet support)",
        source_name
    )))
}

fn push_unless_blank(records: &mut Vec<RawRecord>, line: usize, cells: Vec<CellValue>) {
    if cells.iter().all(CellValue::is_blank) {
        return;
    }
    records.push(RawRecord { line, cells });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FailureKind;
    use crate::schema::AccountType;

    #[test]
    fn test_format_detection() {
        assert_eq!(SourceFormat::detect("tb.csv").unwrap(), SourceFormat::Csv);
        assert_eq!(SourceFormat::detect("TB.CSV").unwrap(), SourceFormat::Csv);
        assert_eq!(
            SourceFormat::detect("fy24.xlsx").unwrap(),
            SourceFormat::Spreadsheet
        );
        assert!(matches!(
            SourceFormat::detect("notes.txt"),
            Err(TrialBalanceError::UnsupportedFormat(_))
        ));
        assert!(SourceFormat::detect("no_extension").is_err());
    }

    #[test]
    fn test_read_csv_keeps_line_numbers_and_skips_blank_rows() {
        let data = "Account Head,Type,Amount\nSales,Income,1000\n,,\nRent,Expense,400\n";
        let table = read_csv("tb.csv", data.as_bytes()).unwrap();

        assert_eq!(table.headers, vec!["Account Head", "Type", "Amount"]);
        assert_eq!(table.records.len(), 2);
        assert_eq!(table.records[0].line, 2);
        assert_eq!(table.records[1].line, 4);
        assert_eq!(
            table.records[1].cell(0),
            &CellValue::Text("Rent".to_string())
        );
    }

    #[test]
    fn test_read_csv_trims_headers_and_handles_quoted_amounts() {
        let data = " Account Head , Type ,Amount \n\"Salaries\",Expense,\"1,20,000\"\n";
        let table = read_csv("tb.csv", data.as_bytes()).unwrap();
        assert_eq!(table.headers, vec!["Account Head", "Type", "Amount"]);
        assert_eq!(
            table.records[0].cell(2),
            &CellValue::Text("1,20,000".to_string())
        );
    }

    #[test]
    fn test_read_csv_short_rows_are_padded_with_empty_cells() {
        let data = "Account Head,Type,Amount\nRent,Expense\n";
        let table = read_csv("tb.csv", data.as_bytes()).unwrap();
        assert!(table.records[0].cell(2).is_blank());
    }

    #[test]
    fn test_empty_csv_is_unparseable() {
        let err = read_csv("empty.csv", b"").unwrap_err();
        assert_eq!(err.kind(), FailureKind::UnparseableFile);
    }

    #[test]
    fn test_header_only_csv_is_valid_and_empty() {
        let file = UploadedFile::new("tb.csv", "2023-2024", "Account Head,Type,Amount\n");
        let ingested = ingest_file(&file, &AnalysisConfig::default()).unwrap();
        assert!(ingested.table.rows.is_empty());
        assert_eq!(ingested.table.period, "2023-2024");
        assert_eq!(ingested.report.rows_read, 0);
    }

    #[cfg(feature = "xlsx")]
    const WORKBOOK: &[u8] = include_bytes!("../tests/fixtures/trial_balance.xlsx");

    #[cfg(feature = "xlsx")]
    #[test]
    fn test_garbage_spreadsheet_is_unparseable() {
        let err = read_table("tb.xlsx", b"definitely not a zip archive", SourceFormat::Spreadsheet)
            .unwrap_err();
        assert_eq!(err.kind(), FailureKind::UnparseableFile);
    }

    #[cfg(not(feature = "xlsx"))]
    #[test]
    fn test_spreadsheet_needs_xlsx_feature() {
        let err = read_table("tb.xlsx", b"PK", SourceFormat::Spreadsheet).unwrap_err();
        assert_eq!(err.kind(), FailureKind::UnsupportedFormat);
    }

    #[cfg(feature = "xlsx")]
    #[test]
    fn test_read_spreadsheet_cells_and_line_numbers() {
        // Sheet starts on row 2, with an empty row 4 between data rows.
        let table = read_spreadsheet("tb.xlsx", WORKBOOK).unwrap();

        assert_eq!(table.headers, vec!["Account Head", "Type", "Amount"]);
        assert_eq!(table.records.len(), 3);

        let lines: Vec<usize> = table.records.iter().map(|r| r.line).collect();
        assert_eq!(lines, vec![3, 5, 6]);

        assert_eq!(table.records[0].cell(0), &CellValue::Text("Sales".to_string()));
        assert_eq!(table.records[0].cell(2), &CellValue::Number(-1000.0));
        assert_eq!(table.records[1].cell(2), &CellValue::Number(400.5));
        assert_eq!(
            table.records[2].cell(2),
            &CellValue::Text("1,20,000".to_string())
        );
    }

    #[cfg(feature = "xlsx")]
    #[test]
    fn test_ingest_spreadsheet_end_to_end() {
        let config = AnalysisConfig {
            income_is_negative: true,
            ..Default::default()
        };
        let file = UploadedFile::new("fy24.xlsx", "2023-2024", WORKBOOK);
        let ingested = ingest_file(&file, &config).unwrap();

        let rows: Vec<(&str, AccountType, f64)> = ingested
            .table
            .rows
            .iter()
            .map(|r| (r.account_head.as_str(), r.account_type, r.amount))
            .collect();
        assert_eq!(
            rows,
            vec![
                ("Sales", AccountType::Income, 1000.0),
                ("Rent", AccountType::Expense, 400.5),
                ("Salaries", AccountType::Expense, 120000.0),
            ]
        );
        assert!(ingested.table.rows.iter().all(|r| r.period == "2023-2024"));
        assert_eq!(ingested.report.rows_read, 3);
        assert!(ingested.report.is_clean());
    }

    #[test]
    fn test_ingest_file_end_to_end() {
        let data = "Account Head,Type,Amount\nSales,income,-1000\nRent,Expense,400\n";
        let config = AnalysisConfig {
            income_is_negative: true,
            ..Default::default()
        };
        let file = UploadedFile::new("upload", "2023-2024", data).with_format(SourceFormat::Csv);
        let ingested = ingest_file(&file, &config).unwrap();

        assert_eq!(ingested.table.rows.len(), 2);
        assert_eq!(ingested.table.rows[0].account_type, AccountType::Income);
        assert_eq!(ingested.table.rows[0].amount, 1000.0);
        assert_eq!(ingested.table.rows[0].period, "2023-2024");
        assert!(ingested.report.is_clean());
    }

    #[test]
    fn test_ingest_file_missing_columns() {
        let data = "Account,Type,Value\nSales,Income,1\n";
        let file = UploadedFile::new("tb.csv", "2023-2024", data);
        let err = ingest_file(&file, &AnalysisConfig::default()).unwrap_err();
        match err {
            TrialBalanceError::MissingColumns { missing, .. } => {
                assert_eq!(missing, vec!["Account Head", "Amount"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
