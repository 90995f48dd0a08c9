//! Raw rows → canonical `TransactionRecord`s.
//!
//! Header names are normalized (trim, lower-case, whitespace runs → `_`) so
//! `"Transaction Reference"` and `" transaction_reference "` land on the same
//! key. Row-level problems never fail a row: bad amounts become `0`, missing
//! text fields become empty, rows without a reference are dropped. Columns
//! with a blank header pass through as `column_<n>`.

use crate::error::{ParseWarning, ReconError};
use crate::model::{ExtraFields, RawRow, RawValue, Side, TransactionRecord};

pub const COL_REFERENCE: &str = "transaction_reference";
pub const COL_AMOUNT: &str = "amount";
pub const COL_STATUS: &str = "status";
pub const COL_DATE: &str = "date";
pub const COL_DESCRIPTION: &str = "description";
pub const COL_CURRENCY: &str = "currency";

/// Passthrough key for a column whose header is blank: `column_<n>`,
/// 1-based position in the source header.
pub fn unnamed_column_key(position: usize) -> String {
    format!("column_{}", position + 1)
}

/// Canonical columns in export order.
pub const CANONICAL_COLUMNS: [&str; 6] = [
    COL_REFERENCE,
    COL_AMOUNT,
    COL_STATUS,
    COL_DATE,
    COL_DESCRIPTION,
    COL_CURRENCY,
];

pub fn normalize_header(raw: &str) -> String {
    raw.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("_")
}

/// Fail with a schema error unless the normalized headers contain the
/// reference column.
pub fn check_required_columns<'a>(
    headers: impl IntoIterator<Item = &'a str>,
    side: Side,
) -> Result<(), ReconError> {
    if headers.into_iter().any(|h| normalize_header(h) == COL_REFERENCE) {
        Ok(())
    } else {
        Err(ReconError::Schema {
            side,
            column: COL_REFERENCE.into(),
        })
    }
}

/// Parse a financial number string:
/// - Strip `$`, commas, whitespace
/// - Handle `(123.45)` → `-123.45`
/// - Returns None if non-numeric characters remain after stripping
pub fn parse_amount(s: &str) -> Option<f64> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return None;
    }

    let (is_negative, inner) = if trimmed.starts_with('(') && trimmed.ends_with(')') {
        (true, &trimmed[1..trimmed.len() - 1])
    } else {
        (false, trimmed)
    };

    let cleaned: String = inner
        .chars()
        .filter(|c| *c != '$' && *c != ',' && !c.is_whitespace())
        .collect();

    if cleaned.is_empty() {
        return None;
    }

    for (i, c) in cleaned.chars().enumerate() {
        match c {
            '0'..='9' | '.' => {}
            '-' | '+' if i == 0 && !is_negative => {}
            _ => return None,
        }
    }

    let value: f64 = cleaned.parse().ok()?;
    if !value.is_finite() {
        return None;
    }
    Some(if is_negative { -value } else { value })
}

/// Normalize a whole dataset. Warnings are discarded; see
/// [`normalize_rows_with_warnings`].
pub fn normalize_rows(rows: &[RawRow], side: Side) -> Result<Vec<TransactionRecord>, ReconError> {
    normalize_rows_with_warnings(rows, side).map(|(records, _)| records)
}

/// Normalize a whole dataset, collecting per-cell diagnostics.
///
/// The first row stands in for the schema; an empty dataset is valid.
pub fn normalize_rows_with_warnings(
    rows: &[RawRow],
    side: Side,
) -> Result<(Vec<TransactionRecord>, Vec<ParseWarning>), ReconError> {
    if let Some(first) = rows.first() {
        check_required_columns(first.columns(), side)?;
    }

    let mut warnings = Vec::new();
    // +2: 1-based, after the header line
    let numbered = rows.iter().enumerate().map(|(i, row)| (i as u64 + 2, row));
    let records = normalize_numbered(numbered, side, &mut warnings);
    Ok((records, warnings))
}

/// Normalize rows tagged with their source line. The schema must already
/// have been checked.
pub(crate) fn normalize_numbered<'a>(
    rows: impl Iterator<Item = (u64, &'a RawRow)>,
    side: Side,
    warnings: &mut Vec<ParseWarning>,
) -> Vec<TransactionRecord> {
    let mut records = Vec::new();
    let mut dropped = 0usize;
    for (line, row) in rows {
        match normalize_row(row, side, line, warnings) {
            Some(record) => records.push(record),
            None => dropped += 1,
        }
    }

    if dropped > 0 {
        log::debug!("{side}: dropped {dropped} row(s) without a reference");
    }

    records
}

/// Normalize one row. `None` when the reference is blank.
fn normalize_row(
    row: &RawRow,
    side: Side,
    line: u64,
    warnings: &mut Vec<ParseWarning>,
) -> Option<TransactionRecord> {
    let mut reference = String::new();
    let mut amount_cell: Option<&RawValue> = None;
    let mut status = String::new();
    let mut date = String::new();
    let mut description = String::new();
    let mut currency = String::new();
    let mut extra = ExtraFields::new();

    for (position, (column, value)) in row.iter().enumerate() {
        let key = normalize_header(column);
        match key.as_str() {
            COL_REFERENCE => reference = value.to_text().trim().to_string(),
            COL_AMOUNT => amount_cell = Some(value),
            COL_STATUS => status = value.to_text().trim().to_lowercase(),
            COL_DATE => date = value.to_text(),
            COL_DESCRIPTION => description = value.to_text(),
            COL_CURRENCY => currency = value.to_text(),
            "" => extra.insert(unnamed_column_key(position), value.to_text()),
            _ => extra.insert(key, value.to_text()),
        }
    }

    if reference.is_empty() {
        return None;
    }

    let amount = match amount_cell {
        None => 0.0,
        Some(RawValue::Number(n)) if n.is_finite() => *n,
        Some(RawValue::Number(n)) => {
            warnings.push(ParseWarning::new(
                side,
                Some(line),
                format!("reference '{reference}': non-finite amount {n}, using 0"),
            ));
            0.0
        }
        Some(RawValue::Text(text)) => match parse_amount(text) {
            Some(n) => n,
            None if text.trim().is_empty() => 0.0,
            None => {
                warnings.push(ParseWarning::new(
                    side,
                    Some(line),
                    format!("reference '{reference}': cannot parse amount '{text}', using 0"),
                ));
                0.0
            }
        },
    };

    Some(TransactionRecord {
        reference,
        amount,
        status,
        date,
        description,
        currency,
        extra,
    })
}
