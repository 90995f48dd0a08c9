use std::collections::{HashMap, HashSet};

use crate::config::ToleranceConfig;
use crate::model::{MatchResult, ReconciliationReport, Side, TransactionRecord};

/// Reconcile with the default amount tolerance.
pub fn reconcile(
    internal: &[TransactionRecord],
    provider: &[TransactionRecord],
) -> ReconciliationReport {
    reconcile_with(internal, provider, &ToleranceConfig::default())
}

/// Classify two normalized record sets into a report.
///
/// Both sides are indexed by reference; a repeated reference keeps the last
/// record seen (last-write-wins) at the position of its first occurrence.
/// `matched` and `internal_only` follow internal input order,
/// `provider_only` follows provider input order, and the mismatch buckets
/// follow `matched`.
///
/// Either side empty → empty report. Never fails.
pub fn reconcile_with(
    internal: &[TransactionRecord],
    provider: &[TransactionRecord],
    tolerance: &ToleranceConfig,
) -> ReconciliationReport {
    if internal.is_empty() || provider.is_empty() {
        log::debug!(
            "reconcile skipped: {} internal, {} provider record(s)",
            internal.len(),
            provider.len()
        );
        return ReconciliationReport::default();
    }

    let internal_index = RecordIndex::build(internal, Side::Internal);
    let provider_index = RecordIndex::build(provider, Side::Provider);

    let mut report = ReconciliationReport::default();

    for record in internal_index.records() {
        match provider_index.get(&record.reference) {
            Some(counterpart) => {
                let result = MatchResult {
                    internal: record.clone(),
                    provider: counterpart.clone(),
                    amount_match: tolerance.amounts_equal(record.amount, counterpart.amount),
                    status_match: record.status == counterpart.status,
                };
                if !result.amount_match {
                    report.amount_mismatches.push(result.clone());
                }
                if !result.status_match {
                    report.status_mismatches.push(result.clone());
                }
                report.matched.push(result);
            }
            None => report.internal_only.push(record.clone()),
        }
    }

    for record in provider_index.records() {
        if !internal_index.contains(&record.reference) {
            report.provider_only.push(record.clone());
        }
    }

    log::debug!(
        "reconciled: {} matched, {} internal-only, {} provider-only, {} amount / {} status mismatch(es)",
        report.matched.len(),
        report.internal_only.len(),
        report.provider_only.len(),
        report.amount_mismatches.len(),
        report.status_mismatches.len()
    );

    report
}

/// Number of distinct references in a record set: what one side
/// contributes to a report after duplicates collapse.
pub fn distinct_references(records: &[TransactionRecord]) -> usize {
    records
        .iter()
        .map(|r| r.reference.as_str())
        .collect::<HashSet<_>>()
        .len()
}

/// Reference → record, last write wins, iterated in first-seen order.
struct RecordIndex<'a> {
    by_reference: HashMap<&'a str, &'a TransactionRecord>,
    order: Vec<&'a str>,
}

impl<'a> RecordIndex<'a> {
    fn build(records: &'a [TransactionRecord], side: Side) -> Self {
        let mut by_reference: HashMap<&'a str, &'a TransactionRecord> =
            HashMap::with_capacity(records.len());
        let mut order = Vec::with_capacity(records.len());

        for record in records {
            let key = record.reference.as_str();
            if by_reference.insert(key, record).is_none() {
                order.push(key);
            }
        }

        let collapsed = records.len() - order.len();
        if collapsed > 0 {
            log::warn!(
                "{side}: {collapsed} row(s) repeat an earlier reference; the last occurrence wins"
            );
        }

        Self { by_reference, order }
    }

    fn get(&self, reference: &str) -> Option<&'a TransactionRecord> {
        self.by_reference.get(reference).copied()
    }

    fn contains(&self, reference: &str) -> bool {
        self.by_reference.contains_key(reference)
    }

    fn records(&self) -> impl Iterator<Item = &'a TransactionRecord> + '_ {
        self.order.iter().map(|key| self.by_reference[key])
    }
}
