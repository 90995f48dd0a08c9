use std::collections::HashSet;
use std::path::PathBuf;

use tally_recon::config::{InputConfig, ReconConfig};
use tally_recon::export::export_bucket;
use tally_recon::loader::{load_csv_file, parse_csv};
use tally_recon::model::{Bucket, ReconOutput, Side};
use tally_recon::session::ReconSession;
use tally_recon::{reconcile, ReconError};

fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn load_fixture_session(config: ReconConfig) -> ReconSession {
    let dir = fixtures_dir();
    let mut session = ReconSession::new(config);
    session
        .load_pair(&dir.join("ledger.csv"), &dir.join("provider.csv"))
        .into_result()
        .unwrap();
    session
}

// -------------------------------------------------------------------------
// Fixture runs
// -------------------------------------------------------------------------

#[test]
fn fixtures_default_tolerance() {
    let mut session = load_fixture_session(ReconConfig::default());

    let ledger = session.dataset(Side::Internal).unwrap();
    // totals row has no reference
    assert_eq!(ledger.raw_row_count, 6);
    assert_eq!(ledger.records.len(), 5);

    let report = session.report().clone();
    let matched: Vec<_> = report.matched.iter().map(|m| m.reference()).collect();
    assert_eq!(matched, vec!["TX-1001", "TX-1002", "TX-1003", "TX-1004"]);
    assert_eq!(report.internal_only[0].reference, "TX-1005");
    assert_eq!(report.provider_only[0].reference, "TX-2001");

    assert_eq!(report.amount_mismatches.len(), 1);
    assert_eq!(report.amount_mismatches[0].reference(), "TX-1004");
    assert_eq!(report.status_mismatches.len(), 1);
    assert_eq!(report.status_mismatches[0].reference(), "TX-1002");

    // parenthesized negative on one side, signed on the other
    let refund = &report.matched[2];
    assert_eq!(refund.internal.amount, -15.0);
    assert!(refund.is_clean());
}

#[test]
fn fixtures_with_config_tolerance() {
    let toml = std::fs::read_to_string(fixtures_dir().join("recon.toml")).unwrap();
    let config = ReconConfig::from_toml(&toml).unwrap();
    let mut session = load_fixture_session(config);

    let report = session.report();
    assert!(report.amount_mismatches.is_empty());
    assert_eq!(report.status_mismatches.len(), 1);
}

#[test]
fn summary_counts_are_consistent() {
    let mut session = load_fixture_session(ReconConfig::default());
    let summary = session.summary();
    assert_eq!(summary.internal_records, 5);
    assert_eq!(summary.provider_records, 5);
    assert_eq!(summary.matched + summary.internal_only, summary.internal_records);
    assert_eq!(summary.matched + summary.provider_only, summary.provider_records);
}

#[test]
fn json_output_shape() {
    let mut session = load_fixture_session(ReconConfig::default());
    let summary = session.summary();
    let report = session.report();
    let output = ReconOutput::new(report, summary, 0.01);
    let value = serde_json::to_value(&output).unwrap();

    assert_eq!(value["summary"]["matched"], 4);
    assert_eq!(value["meta"]["amount_tolerance"], 0.01);
    assert_eq!(value["report"]["provider_only"][0]["reference"], "TX-2001");
    assert_eq!(value["report"]["internal_only"][0]["extra"]["cost_center"], "ops");
}

// -------------------------------------------------------------------------
// Rejections
// -------------------------------------------------------------------------

#[test]
fn missing_reference_column_rejected_and_prior_set_kept() {
    let dir = fixtures_dir();
    let mut session = ReconSession::default();
    session.load(Side::Provider, &dir.join("provider.csv")).unwrap();

    let err = session.load(Side::Provider, &dir.join("no_reference.csv")).unwrap_err();
    match err {
        ReconError::Schema { side, ref column } => {
            assert_eq!(side, Side::Provider);
            assert_eq!(column, "transaction_reference");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(session.records(Side::Provider).len(), 5);
}

#[test]
fn partly_failed_pair_withholds_report() {
    let dir = fixtures_dir();
    let mut session = load_fixture_session(ReconConfig::default());
    assert_eq!(session.report().matched.len(), 4);

    let outcome = session.load_pair(&dir.join("provider.csv"), &dir.join("no_reference.csv"));
    assert!(outcome.internal.is_ok());
    assert!(outcome.provider.is_err());
    assert!(!session.is_ready());
    assert!(session.report().is_empty());
    assert_eq!(session.summary().provider_records, 0);
}

#[test]
fn non_csv_extension_rejected() {
    let err = load_csv_file(
        &fixtures_dir().join("recon.toml"),
        Side::Internal,
        &InputConfig::default(),
    )
    .unwrap_err();
    assert!(matches!(err, ReconError::InvalidFileType { .. }));
}

// -------------------------------------------------------------------------
// Export round trip
// -------------------------------------------------------------------------

#[test]
fn internal_only_export_round_trip() {
    let mut session = load_fixture_session(ReconConfig::default());
    let report = session.report().clone();

    let csv = export_bucket(&report, Bucket::InternalOnly).to_csv_string().unwrap();
    let reparsed = parse_csv(&csv, Side::Internal, &InputConfig::default()).unwrap();

    let before: HashSet<_> = report.internal_only.iter().map(|r| r.reference.clone()).collect();
    let after: HashSet<_> = reparsed.records.iter().map(|r| r.reference.clone()).collect();
    assert_eq!(before, after);
    assert_eq!(reparsed.records, report.internal_only);
}

#[test]
fn every_bucket_exports() {
    let mut session = load_fixture_session(ReconConfig::default());
    let report = session.report().clone();
    for bucket in Bucket::ALL {
        let table = export_bucket(&report, bucket);
        assert_eq!(table.rows.len(), report.bucket_len(bucket), "{bucket}");
        if bucket.holds_pairs() {
            assert_eq!(table.headers.len(), 9);
        }
    }
}

#[test]
fn direct_reconcile_matches_session() {
    let dir = fixtures_dir();
    let input = InputConfig::default();
    let ledger = load_csv_file(&dir.join("ledger.csv"), Side::Internal, &input).unwrap();
    let provider = load_csv_file(&dir.join("provider.csv"), Side::Provider, &input).unwrap();

    let direct = reconcile(&ledger.records, &provider.records);
    let mut session = load_fixture_session(ReconConfig::default());
    assert_eq!(&direct, session.report());
}
