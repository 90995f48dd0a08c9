use std::fmt;
use std::str::FromStr;

use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

// ---------------------------------------------------------------------------
// Sides
// ---------------------------------------------------------------------------

/// Logical source label of a dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Internal,
    Provider,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Internal => "internal",
            Side::Provider => "provider",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Side {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "internal" | "ledger" => Ok(Side::Internal),
            "provider" | "external" => Ok(Side::Provider),
            other => Err(format!("unknown side '{other}' (expected internal or provider)")),
        }
    }
}

// ---------------------------------------------------------------------------
// Raw input
// ---------------------------------------------------------------------------

/// A single untyped cell value.
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    Text(String),
    Number(f64),
}

impl RawValue {
    /// Cell rendered as text. Numbers use the shortest round-tripping form.
    pub fn to_text(&self) -> String {
        match self {
            RawValue::Text(s) => s.clone(),
            RawValue::Number(n) => n.to_string(),
        }
    }
}

impl From<&str> for RawValue {
    fn from(s: &str) -> Self {
        RawValue::Text(s.to_string())
    }
}

impl From<String> for RawValue {
    fn from(s: String) -> Self {
        RawValue::Text(s)
    }
}

impl From<f64> for RawValue {
    fn from(n: f64) -> Self {
        RawValue::Number(n)
    }
}

/// One parsed input line: column name → value, in source column order.
///
/// Column names are kept as written in the source; the normalizer maps them
/// to canonical keys.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRow {
    cells: Vec<(String, RawValue)>,
}

impl RawRow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, column: impl Into<String>, value: impl Into<RawValue>) -> Self {
        self.push(column, value);
        self
    }

    pub fn push(&mut self, column: impl Into<String>, value: impl Into<RawValue>) {
        self.cells.push((column.into(), value.into()));
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.cells.iter().map(|(c, _)| c.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &RawValue)> {
        self.cells.iter().map(|(c, v)| (c.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Canonical records
// ---------------------------------------------------------------------------

/// Source columns without a canonical meaning, kept in source order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtraFields(Vec<(String, String)>);

impl ExtraFields {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite. Overwriting keeps the original position.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.0.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.0.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for ExtraFields {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (k, v) in &self.0 {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

/// Canonical transaction produced by the normalizer.
///
/// `reference` is never empty in a working set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransactionRecord {
    pub reference: String,
    pub amount: f64,
    pub status: String,
    pub date: String,
    pub description: String,
    pub currency: String,
    #[serde(skip_serializing_if = "ExtraFields::is_empty")]
    pub extra: ExtraFields,
}

impl TransactionRecord {
    /// Record with the given reference and amount, every other field empty.
    pub fn new(reference: impl Into<String>, amount: f64) -> Self {
        Self {
            reference: reference.into(),
            amount,
            status: String::new(),
            date: String::new(),
            description: String::new(),
            currency: String::new(),
            extra: ExtraFields::new(),
        }
    }

    /// Builder-style status; the value is normalized like the normalizer does.
    pub fn with_status(mut self, status: &str) -> Self {
        self.status = status.trim().to_lowercase();
        self
    }
}

// ---------------------------------------------------------------------------
// Matching
// ---------------------------------------------------------------------------

/// Internal and provider records sharing one reference.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchResult {
    pub internal: TransactionRecord,
    pub provider: TransactionRecord,
    pub amount_match: bool,
    pub status_match: bool,
}

impl MatchResult {
    pub fn reference(&self) -> &str {
        &self.internal.reference
    }

    pub fn is_clean(&self) -> bool {
        self.amount_match && self.status_match
    }
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

/// The five named result collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Bucket {
    Matched,
    InternalOnly,
    ProviderOnly,
    AmountMismatches,
    StatusMismatches,
}

impl Bucket {
    pub const ALL: [Bucket; 5] = [
        Bucket::Matched,
        Bucket::InternalOnly,
        Bucket::ProviderOnly,
        Bucket::AmountMismatches,
        Bucket::StatusMismatches,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Bucket::Matched => "matched",
            Bucket::InternalOnly => "internal_only",
            Bucket::ProviderOnly => "provider_only",
            Bucket::AmountMismatches => "amount_mismatches",
            Bucket::StatusMismatches => "status_mismatches",
        }
    }

    /// Buckets holding `MatchResult` pairs rather than single records.
    pub fn holds_pairs(&self) -> bool {
        matches!(
            self,
            Bucket::Matched | Bucket::AmountMismatches | Bucket::StatusMismatches
        )
    }
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Bucket {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_ascii_lowercase().replace('-', "_");
        Bucket::ALL
            .iter()
            .copied()
            .find(|b| b.as_str() == key)
            .ok_or_else(|| {
                format!(
                    "unknown bucket '{s}' (expected one of: {})",
                    Bucket::ALL.map(|b| b.as_str()).join(", ")
                )
            })
    }
}

/// Classified output of one reconciliation. Derived purely from the two
/// input sets; holds no state of its own.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReconciliationReport {
    pub matched: Vec<MatchResult>,
    pub internal_only: Vec<TransactionRecord>,
    pub provider_only: Vec<TransactionRecord>,
    pub amount_mismatches: Vec<MatchResult>,
    pub status_mismatches: Vec<MatchResult>,
}

impl ReconciliationReport {
    pub fn is_empty(&self) -> bool {
        Bucket::ALL.iter().all(|b| self.bucket_len(*b) == 0)
    }

    pub fn bucket_len(&self, bucket: Bucket) -> usize {
        match bucket {
            Bucket::Matched => self.matched.len(),
            Bucket::InternalOnly => self.internal_only.len(),
            Bucket::ProviderOnly => self.provider_only.len(),
            Bucket::AmountMismatches => self.amount_mismatches.len(),
            Bucket::StatusMismatches => self.status_mismatches.len(),
        }
    }

    /// True when every record found its counterpart and every pair agrees.
    pub fn is_clean(&self) -> bool {
        self.internal_only.is_empty()
            && self.provider_only.is_empty()
            && self.amount_mismatches.is_empty()
            && self.status_mismatches.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Summary + Output
// ---------------------------------------------------------------------------

/// Bucket counts plus the distinct references each side held going in.
/// Input counts stay non-zero when the other side is empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReconSummary {
    pub internal_records: usize,
    pub provider_records: usize,
    pub matched: usize,
    pub internal_only: usize,
    pub provider_only: usize,
    pub amount_mismatches: usize,
    pub status_mismatches: usize,
}

impl ReconSummary {
    pub fn new(report: &ReconciliationReport, internal_records: usize, provider_records: usize) -> Self {
        Self {
            internal_records,
            provider_records,
            matched: report.matched.len(),
            internal_only: report.internal_only.len(),
            provider_only: report.provider_only.len(),
            amount_mismatches: report.amount_mismatches.len(),
            status_mismatches: report.status_mismatches.len(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconMeta {
    pub engine_version: String,
    pub run_at: String,
    pub amount_tolerance: f64,
}

/// Serializable envelope: metadata, counts, and the buckets themselves.
#[derive(Debug, Clone, Serialize)]
pub struct ReconOutput<'a> {
    pub meta: ReconMeta,
    pub summary: ReconSummary,
    pub report: &'a ReconciliationReport,
}

impl<'a> ReconOutput<'a> {
    pub fn new(report: &'a ReconciliationReport, summary: ReconSummary, amount_tolerance: f64) -> Self {
        Self {
            meta: ReconMeta {
                engine_version: env!("CARGO_PKG_VERSION").to_string(),
                run_at: chrono::Utc::now().to_rfc3339(),
                amount_tolerance,
            },
            summary,
            report,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bucket_parse_accepts_dashes_and_case() {
        assert_eq!("internal-only".parse::<Bucket>().unwrap(), Bucket::InternalOnly);
        assert_eq!("Status_Mismatches".parse::<Bucket>().unwrap(), Bucket::StatusMismatches);
        assert!("everything".parse::<Bucket>().is_err());
    }

    #[test]
    fn side_parse() {
        assert_eq!("Provider".parse::<Side>().unwrap(), Side::Provider);
        assert_eq!("ledger".parse::<Side>().unwrap(), Side::Internal);
        assert!("bank".parse::<Side>().is_err());
    }

    #[test]
    fn extra_fields_keep_order_on_overwrite() {
        let mut extra = ExtraFields::new();
        extra.insert("batch", "1");
        extra.insert("channel", "web");
        extra.insert("batch", "2");
        let keys: Vec<_> = extra.keys().collect();
        assert_eq!(keys, vec!["batch", "channel"]);
        assert_eq!(extra.get("batch"), Some("2"));
    }

    #[test]
    fn extra_fields_serialize_as_object() {
        let mut extra = ExtraFields::new();
        extra.insert("zeta", "1");
        extra.insert("alpha", "2");
        let json = serde_json::to_string(&extra).unwrap();
        assert_eq!(json, r#"{"zeta":"1","alpha":"2"}"#);
    }

    #[test]
    fn empty_report_summary_keeps_input_counts() {
        let report = ReconciliationReport::default();
        assert!(report.is_empty());
        assert!(report.is_clean());
        let s = ReconSummary::new(&report, 5, 0);
        assert_eq!(s.internal_records, 5);
        assert_eq!(s.provider_records, 0);
        assert_eq!(s.matched, 0);
        assert_eq!(s.internal_only, 0);
    }
}
