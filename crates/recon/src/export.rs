//! Flatten report buckets into rows for re-serialization.

use std::io::Write;

use crate::model::{Bucket, MatchResult, ReconciliationReport, TransactionRecord};
use crate::normalize::{CANONICAL_COLUMNS, COL_REFERENCE};

/// Column order of a matched-shaped export.
pub const MATCHED_COLUMNS: [&str; 9] = [
    COL_REFERENCE,
    "internal_amount",
    "provider_amount",
    "internal_status",
    "provider_status",
    "amount_match",
    "status_match",
    "internal_date",
    "provider_date",
];

/// Header + rows, all cells as text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl ExportTable {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn write_csv<W: Write>(&self, writer: W, delimiter: u8) -> Result<(), csv::Error> {
        let mut wtr = csv::WriterBuilder::new()
            .delimiter(delimiter)
            .from_writer(writer);
        wtr.write_record(&self.headers)?;
        for row in &self.rows {
            wtr.write_record(row)?;
        }
        wtr.flush()?;
        Ok(())
    }

    pub fn to_csv_string(&self) -> Result<String, csv::Error> {
        let mut buf = Vec::new();
        self.write_csv(&mut buf, b',')?;
        // csv only ever writes the UTF-8 it was handed
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }
}

fn yes_no(flag: bool) -> String {
    let text = if flag { "Yes" } else { "No" };
    text.to_string()
}

fn format_amount(amount: f64) -> String {
    amount.to_string()
}

/// One row per pair: both amounts, both statuses, match flags, both dates.
pub fn export_matched(pairs: &[MatchResult]) -> ExportTable {
    let rows = pairs
        .iter()
        .map(|m| {
            vec![
                m.reference().to_string(),
                format_amount(m.internal.amount),
                format_amount(m.provider.amount),
                m.internal.status.clone(),
                m.provider.status.clone(),
                yes_no(m.amount_match),
                yes_no(m.status_match),
                m.internal.date.clone(),
                m.provider.date.clone(),
            ]
        })
        .collect();

    ExportTable {
        headers: MATCHED_COLUMNS.iter().map(|c| c.to_string()).collect(),
        rows,
    }
}

/// Records field-for-field: canonical columns first, then passthrough
/// columns in first-seen order.
pub fn export_records(records: &[TransactionRecord]) -> ExportTable {
    let mut extra_columns: Vec<&str> = Vec::new();
    for record in records {
        for key in record.extra.keys() {
            if !extra_columns.contains(&key) {
                extra_columns.push(key);
            }
        }
    }

    let rows = records
        .iter()
        .map(|r| {
            let mut row = vec![
                r.reference.clone(),
                format_amount(r.amount),
                r.status.clone(),
                r.date.clone(),
                r.description.clone(),
                r.currency.clone(),
            ];
            row.extend(
                extra_columns
                    .iter()
                    .map(|col| r.extra.get(col).unwrap_or("").to_string()),
            );
            row
        })
        .collect();

    let headers = CANONICAL_COLUMNS
        .iter()
        .chain(extra_columns.iter())
        .map(|c| c.to_string())
        .collect();

    ExportTable { headers, rows }
}

/// Export one named bucket of a report in its natural shape.
pub fn export_bucket(report: &ReconciliationReport, bucket: Bucket) -> ExportTable {
    match bucket {
        Bucket::Matched => export_matched(&report.matched),
        Bucket::AmountMismatches => export_matched(&report.amount_mismatches),
        Bucket::StatusMismatches => export_matched(&report.status_mismatches),
        Bucket::InternalOnly => export_records(&report.internal_only),
        Bucket::ProviderOnly => export_records(&report.provider_only),
    }
}
