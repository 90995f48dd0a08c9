//! Caller-owned reconciliation session.
//!
//! Holds the current record set for each side and a report memoized on the
//! pair of per-side generations. A side is only ever replaced as a whole.
//! Rejected loads (wrong file type, missing required column) leave the
//! previous set in place; any other load failure clears that side.
//!
//! A side that fails inside [`ReconSession::load_pair`] is held back: its
//! old set is kept but never reconciled against the other side's new one.
//! The session stays not-ready until that side is replaced.

use std::path::Path;

use crate::config::ReconConfig;
use crate::engine::{distinct_references, reconcile_with};
use crate::error::{ParseWarning, ReconError};
use crate::loader::{load_csv_file, LoadedDataset};
use crate::model::{ReconSummary, ReconciliationReport, Side, TransactionRecord};

pub struct ReconSession {
    config: ReconConfig,
    internal: SideSlot,
    provider: SideSlot,
    cached: Option<CachedReport>,
}

#[derive(Default)]
struct SideSlot {
    dataset: Option<LoadedDataset>,
    generation: u64,
    /// Failed in the last pair load; the set (if any) predates the other side.
    held_back: bool,
}

impl SideSlot {
    fn replace(&mut self, dataset: Option<LoadedDataset>) {
        self.dataset = dataset;
        self.generation += 1;
        self.held_back = false;
    }

    /// Records that may take part in a report.
    fn reconcilable(&self) -> &[TransactionRecord] {
        match &self.dataset {
            Some(dataset) if !self.held_back => &dataset.records,
            _ => &[],
        }
    }

    fn cache_key(&self) -> (u64, bool) {
        (self.generation, self.held_back)
    }
}

struct CachedReport {
    key: ((u64, bool), (u64, bool)),
    report: ReconciliationReport,
}

/// Per-side outcome of [`ReconSession::load_pair`].
#[derive(Debug)]
pub struct PairLoadOutcome {
    pub internal: Result<(), ReconError>,
    pub provider: Result<(), ReconError>,
}

impl PairLoadOutcome {
    pub fn is_ok(&self) -> bool {
        self.internal.is_ok() && self.provider.is_ok()
    }

    /// First failure, internal side first.
    pub fn into_result(self) -> Result<(), ReconError> {
        self.internal?;
        self.provider
    }
}

impl Default for ReconSession {
    fn default() -> Self {
        Self::new(ReconConfig::default())
    }
}

impl ReconSession {
    pub fn new(config: ReconConfig) -> Self {
        Self {
            config,
            internal: SideSlot::default(),
            provider: SideSlot::default(),
            cached: None,
        }
    }

    pub fn config(&self) -> &ReconConfig {
        &self.config
    }

    fn slot(&self, side: Side) -> &SideSlot {
        match side {
            Side::Internal => &self.internal,
            Side::Provider => &self.provider,
        }
    }

    fn slot_mut(&mut self, side: Side) -> &mut SideSlot {
        match side {
            Side::Internal => &mut self.internal,
            Side::Provider => &mut self.provider,
        }
    }

    pub fn dataset(&self, side: Side) -> Option<&LoadedDataset> {
        self.slot(side).dataset.as_ref()
    }

    /// Current records for a side; empty when nothing is loaded. A held-back
    /// side still reports its kept set here.
    pub fn records(&self, side: Side) -> &[TransactionRecord] {
        self.dataset(side).map(|d| d.records.as_slice()).unwrap_or(&[])
    }

    /// Both sides hold a record set and neither is held back from a partly
    /// failed pair load.
    pub fn is_ready(&self) -> bool {
        [&self.internal, &self.provider]
            .iter()
            .all(|slot| slot.dataset.is_some() && !slot.held_back)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &ParseWarning> {
        self.internal
            .dataset
            .iter()
            .chain(self.provider.dataset.iter())
            .flat_map(|d| d.warnings.iter())
    }

    /// Load one side from a file.
    pub fn load(&mut self, side: Side, path: &Path) -> Result<&LoadedDataset, ReconError> {
        let outcome = load_csv_file(path, side, &self.config.input);
        self.apply(side, outcome)
    }

    /// Load both sides concurrently and apply both outcomes once both have
    /// settled. A side that fails is held back until it is replaced.
    pub fn load_pair(&mut self, internal_path: &Path, provider_path: &Path) -> PairLoadOutcome {
        let input = &self.config.input;
        let (internal, provider) = std::thread::scope(|s| {
            let handle = s.spawn(|| load_csv_file(internal_path, Side::Internal, input));
            let provider = load_csv_file(provider_path, Side::Provider, input);
            let internal = handle.join().unwrap_or_else(|_| {
                Err(ReconError::Io {
                    path: internal_path.display().to_string(),
                    message: "loader thread panicked".into(),
                })
            });
            (internal, provider)
        });

        let outcome = PairLoadOutcome {
            internal: self.apply(Side::Internal, internal).map(|_| ()),
            provider: self.apply(Side::Provider, provider).map(|_| ()),
        };

        self.internal.held_back = outcome.internal.is_err();
        self.provider.held_back = outcome.provider.is_err();
        if !outcome.is_ok() {
            log::warn!("pair load incomplete; report withheld until the failed side is reloaded");
        }
        outcome
    }

    /// Replace a side with records produced elsewhere.
    pub fn set_records(&mut self, side: Side, records: Vec<TransactionRecord>) {
        let dataset = LoadedDataset {
            side,
            source: "memory".into(),
            raw_row_count: records.len(),
            records,
            warnings: Vec::new(),
        };
        self.slot_mut(side).replace(Some(dataset));
    }

    pub fn clear(&mut self, side: Side) {
        if self.slot(side).dataset.is_some() {
            self.slot_mut(side).replace(None);
        }
    }

    fn apply(
        &mut self,
        side: Side,
        outcome: Result<LoadedDataset, ReconError>,
    ) -> Result<&LoadedDataset, ReconError> {
        match outcome {
            Ok(dataset) => {
                let slot = self.slot_mut(side);
                slot.generation += 1;
                slot.held_back = false;
                Ok(slot.dataset.insert(dataset))
            }
            Err(err) => {
                if err.rejected_before_replace() {
                    log::warn!("{side} load rejected, keeping previous data: {err}");
                } else {
                    log::warn!("{side} load failed, clearing previous data: {err}");
                    self.clear(side);
                }
                Err(err)
            }
        }
    }

    /// Report for the current pair of sets, recomputed only when a side
    /// changed since the last call.
    pub fn report(&mut self) -> &ReconciliationReport {
        let key = (self.internal.cache_key(), self.provider.cache_key());
        let cached = match self.cached.take() {
            Some(cached) if cached.key == key => cached,
            _ => CachedReport {
                key,
                report: reconcile_with(
                    self.internal.reconcilable(),
                    self.provider.reconcilable(),
                    &self.config.tolerance,
                ),
            },
        };
        &self.cached.insert(cached).report
    }

    /// Counts for the current report. Input counts are distinct references
    /// of the sets that took part; a held-back side counts as empty.
    pub fn summary(&mut self) -> ReconSummary {
        let internal = distinct_references(self.internal.reconcilable());
        let provider = distinct_references(self.provider.reconcilable());
        ReconSummary::new(self.report(), internal, provider)
    }
}
