//! Delimited text files → `RawRow`s → normalized records.

use std::path::Path;

use serde::Serialize;

use crate::config::InputConfig;
use crate::error::{ParseWarning, ReconError};
use crate::model::{RawRow, Side, TransactionRecord};
use crate::normalize::{check_required_columns, normalize_numbered};

/// Result of loading one side's file.
#[derive(Debug, Clone, Serialize)]
pub struct LoadedDataset {
    pub side: Side,
    /// Where the data came from (file path or a caller-supplied label).
    pub source: String,
    /// Data rows parsed from the file, before blank-reference filtering.
    pub raw_row_count: usize,
    pub records: Vec<TransactionRecord>,
    pub warnings: Vec<ParseWarning>,
}

/// Load and normalize a delimited text file for one side.
pub fn load_csv_file(
    path: &Path,
    side: Side,
    input: &InputConfig,
) -> Result<LoadedDataset, ReconError> {
    check_file_type(path, input)?;

    let bytes = std::fs::read(path).map_err(|e| ReconError::Io {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;

    let mut warnings = Vec::new();
    let text = decode_text(bytes, side, &mut warnings);
    let mut dataset = parse_csv(&text, side, input)?;
    dataset.source = path.display().to_string();
    warnings.append(&mut dataset.warnings);
    dataset.warnings = warnings;

    log::debug!(
        "loaded {side} file {}: {} row(s), {} record(s), {} warning(s)",
        dataset.source,
        dataset.raw_row_count,
        dataset.records.len(),
        dataset.warnings.len()
    );

    Ok(dataset)
}

/// Reject anything whose extension isn't an accepted delimited-text type.
pub fn check_file_type(path: &Path, input: &InputConfig) -> Result<(), ReconError> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_string();
    if !extension.is_empty() && input.accepts_extension(&extension) {
        return Ok(());
    }
    Err(ReconError::InvalidFileType {
        path: path.display().to_string(),
        extension,
    })
}

/// Decode file bytes as UTF-8 (BOM stripped), falling back to Windows-1252.
fn decode_text(bytes: Vec<u8>, side: Side, warnings: &mut Vec<ParseWarning>) -> String {
    let text = match String::from_utf8(bytes) {
        Ok(s) => s,
        Err(e) => {
            let bytes = e.into_bytes();
            // Excel on Windows still writes CP-1252 CSVs
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(&bytes);
            let warning = ParseWarning::new(
                side,
                None,
                "file is not valid UTF-8; decoded as Windows-1252",
            );
            log::warn!("{warning}");
            warnings.push(warning);
            decoded.into_owned()
        }
    };
    match text.strip_prefix('\u{feff}') {
        Some(stripped) => stripped.to_string(),
        None => text,
    }
}

/// Parse delimited text (first line = header) and normalize it.
///
/// The header is checked for the reference column even when the file holds
/// no data rows. Row-level problems become warnings.
pub fn parse_csv(text: &str, side: Side, input: &InputConfig) -> Result<LoadedDataset, ReconError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(input.delimiter_byte())
        .has_headers(true)
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = match reader.headers() {
        Ok(h) => h.iter().map(|s| s.to_string()).collect(),
        Err(e) => {
            return Err(ReconError::Io {
                path: side.to_string(),
                message: format!("cannot read header: {e}"),
            })
        }
    };

    check_required_columns(headers.iter().map(String::as_str), side)?;

    let mut warnings = Vec::new();
    let mut rows: Vec<(u64, RawRow)> = Vec::new();

    for result in reader.records() {
        let record = match result {
            Ok(r) => r,
            Err(e) => {
                let line = e.position().map(|p| p.line());
                let warning = ParseWarning::new(side, line, format!("skipped malformed row: {e}"));
                log::warn!("{warning}");
                warnings.push(warning);
                continue;
            }
        };

        // Trailing blank lines
        if record.iter().all(|f| f.trim().is_empty()) {
            continue;
        }

        let line = record.position().map(|p| p.line()).unwrap_or(0);
        if record.len() != headers.len() {
            let warning = ParseWarning::new(
                side,
                Some(line),
                format!("expected {} fields, found {}", headers.len(), record.len()),
            );
            log::warn!("{warning}");
            warnings.push(warning);
        }

        let mut row = RawRow::new();
        for (header, value) in headers.iter().zip(record.iter()) {
            row.push(header.as_str(), value);
        }
        rows.push((line, row));
    }

    let mut cell_warnings = Vec::new();
    let records = normalize_numbered(rows.iter().map(|(line, row)| (*line, row)), side, &mut cell_warnings);
    for w in &cell_warnings {
        log::warn!("{w}");
    }
    warnings.append(&mut cell_warnings);

    Ok(LoadedDataset {
        side,
        source: side.to_string(),
        raw_row_count: rows.len(),
        records,
        warnings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input() -> InputConfig {
        InputConfig::default()
    }

    #[test]
    fn parse_basic() {
        let csv = "\
Transaction Reference,Amount,Status,Date,Description,Currency,Channel
TX1,100.00,Paid,2024-03-01,Widget,USD,web
TX2,(25.50),PENDING,2024-03-02,Refund,USD,pos
";
        let ds = parse_csv(csv, Side::Internal, &input()).unwrap();
        assert_eq!(ds.raw_row_count, 2);
        assert_eq!(ds.records.len(), 2);
        assert_eq!(ds.records[0].reference, "TX1");
        assert_eq!(ds.records[0].status, "paid");
        assert_eq!(ds.records[1].amount, -25.5);
        assert_eq!(ds.records[1].extra.get("channel"), Some("pos"));
        assert!(ds.warnings.is_empty());
    }

    #[test]
    fn missing_reference_header() {
        let csv = "id,amount\nA,1\n";
        let err = parse_csv(csv, Side::Provider, &input()).unwrap_err();
        assert!(matches!(err, ReconError::Schema { side: Side::Provider, .. }));
    }

    #[test]
    fn header_only_file_is_empty_dataset() {
        let ds = parse_csv("transaction_reference,amount\n", Side::Internal, &input()).unwrap();
        assert!(ds.records.is_empty());
        assert_eq!(ds.raw_row_count, 0);
    }

    #[test]
    fn header_only_without_reference_is_rejected() {
        let err = parse_csv("amount,status\n", Side::Internal, &input()).unwrap_err();
        assert!(matches!(err, ReconError::Schema { .. }));
    }

    #[test]
    fn ragged_rows_warn_but_normalize() {
        let csv = "\
transaction_reference,amount,status
A,10,paid
B,20
C,30,paid,surplus
";
        let ds = parse_csv(csv, Side::Internal, &input()).unwrap();
        assert_eq!(ds.records.len(), 3);
        assert_eq!(ds.records[1].amount, 20.0);
        assert_eq!(ds.records[1].status, "");
        assert_eq!(ds.warnings.len(), 2);
        assert_eq!(ds.warnings[0].line, Some(3));
    }

    #[test]
    fn trailing_header_comma_round_trips() {
        let csv = "transaction_reference,amount,\nA,1,\nB,2,late\n";
        let ds = parse_csv(csv, Side::Internal, &input()).unwrap();
        assert!(ds.warnings.is_empty());
        assert_eq!(ds.records[0].extra.get("column_3"), Some(""));
        assert_eq!(ds.records[1].extra.get("column_3"), Some("late"));

        let exported = crate::export::export_records(&ds.records).to_csv_string().unwrap();
        assert!(exported.starts_with("transaction_reference,amount,status,date,description,currency,column_3\n"));
        let again = parse_csv(&exported, Side::Internal, &input()).unwrap();
        assert_eq!(again.records, ds.records);
    }

    #[test]
    fn unparsable_amount_warns() {
        let csv = "transaction_reference,amount\nA,ten\n";
        let ds = parse_csv(csv, Side::Internal, &input()).unwrap();
        assert_eq!(ds.records[0].amount, 0.0);
        assert_eq!(ds.warnings.len(), 1);
        assert!(ds.warnings[0].message.contains("ten"));
    }

    #[test]
    fn blank_lines_and_blank_references() {
        let csv = "transaction_reference,amount\nA,1\n,2\n  ,3\n\n";
        let ds = parse_csv(csv, Side::Internal, &input()).unwrap();
        assert_eq!(ds.records.len(), 1);
        assert!(ds.records.len() <= ds.raw_row_count);
    }

    #[test]
    fn custom_delimiter() {
        let cfg = InputConfig {
            delimiter: ';',
            ..InputConfig::default()
        };
        let ds = parse_csv("transaction_reference;amount\nA;1,5\n", Side::Internal, &cfg).unwrap();
        // "1,5" strips the comma as a thousands separator
        assert_eq!(ds.records[0].amount, 15.0);
    }

    #[test]
    fn file_type_check() {
        let cfg = input();
        assert!(check_file_type(Path::new("data/ledger.CSV"), &cfg).is_ok());
        let err = check_file_type(Path::new("ledger.xlsx"), &cfg).unwrap_err();
        assert!(matches!(err, ReconError::InvalidFileType { ref extension, .. } if extension == "xlsx"));
        assert!(check_file_type(Path::new("ledger"), &cfg).is_err());
    }

    #[test]
    fn load_file_with_bom() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("internal.csv");
        std::fs::write(&path, "\u{feff}transaction_reference,amount\nA,1\n").unwrap();
        let ds = load_csv_file(&path, Side::Internal, &input()).unwrap();
        assert_eq!(ds.records.len(), 1);
        assert_eq!(ds.source, path.display().to_string());
    }

    #[test]
    fn load_file_windows_1252() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("provider.csv");
        // "Café" with 0xE9
        let mut bytes = b"transaction_reference,description\nA,Caf".to_vec();
        bytes.push(0xE9);
        bytes.push(b'\n');
        std::fs::write(&path, bytes).unwrap();
        let ds = load_csv_file(&path, Side::Provider, &input()).unwrap();
        assert_eq!(ds.records[0].description, "Café");
        assert_eq!(ds.warnings.len(), 1);
        assert!(ds.warnings[0].message.contains("Windows-1252"));
    }

    #[test]
    fn load_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_csv_file(&dir.path().join("nope.csv"), Side::Internal, &input()).unwrap_err();
        assert!(matches!(err, ReconError::Io { .. }));
    }

    #[test]
    fn wrong_extension_rejected_before_read() {
        // file doesn't exist; the extension check must fire first
        let err = load_csv_file(Path::new("missing.json"), Side::Internal, &input()).unwrap_err();
        assert!(matches!(err, ReconError::InvalidFileType { .. }));
    }
}
