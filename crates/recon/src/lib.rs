//! `tally-recon`: internal ledger vs. payment-provider reconciliation.
//!
//! Pure engine crate: normalizes raw tabular rows into canonical transaction
//! records, classifies two record sets into a report, and flattens any
//! bucket back into rows. File loading lives in [`loader`]; the caller-owned
//! [`session::ReconSession`] keeps the current pair of sets and the report
//! in sync.

pub mod config;
pub mod engine;
pub mod error;
pub mod export;
pub mod loader;
pub mod model;
pub mod normalize;
pub mod session;

pub use config::ReconConfig;
pub use engine::{distinct_references, reconcile, reconcile_with};
pub use error::{ParseWarning, ReconError};
pub use export::{export_bucket, ExportTable};
pub use loader::{load_csv_file, LoadedDataset};
pub use model::{Bucket, MatchResult, RawRow, ReconSummary, ReconciliationReport, Side, TransactionRecord};
pub use normalize::normalize_rows;
pub use session::ReconSession;
