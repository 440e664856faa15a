//! Calculator workflow: lookup, compute, persist.
//!
//! One pass per user action, strictly in sequence:
//!
//! ```text
//! resolve baseline → calculate → reconcile record → append history
//! ```

use sandgrains_baseline::{resolve_baseline, Baseline, BaselineSource};
use sandgrains_core::{calculate, CountryCode, Estimate, FormInput, HistoryEntry, LifespanRecord};
use sandgrains_storage::Storage;
use tracing::{debug, info, warn};

use crate::{ReconcileError, Reconciled, Reconciler, Session};

/// Result of one calculate-and-save pass.
#[derive(Debug, Clone, PartialEq)]
pub struct CalculationOutcome {
    /// Baseline used, and whether it was the fallback
    pub baseline: Baseline,

    /// Calculator output
    pub estimate: Estimate,

    /// What was written
    pub reconciled: Reconciled,

    /// Whether a history snapshot was stored
    pub history_saved: bool,
}

/// What a purge removes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PurgeScope {
    /// History entries only
    History,
    /// History entries and the record itself
    Everything,
}

/// What a purge removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PurgeReport {
    /// History entries deleted
    pub history_removed: usize,
    /// Whether the record was deleted
    pub record_removed: bool,
}

/// The calculator workflow over a storage backend and a baseline source.
pub struct Calculator<S: Storage, B: BaselineSource> {
    reconciler: Reconciler<S>,
    baseline: B,
    keep_history: bool,
}

impl<S: Storage, B: BaselineSource> Calculator<S, B> {
    /// Create a calculator. History is kept by default.
    pub fn new(storage: S, baseline: B) -> Self {
        Self {
            reconciler: Reconciler::new(storage),
            baseline,
            keep_history: true,
        }
    }

    /// Enable or disable history snapshots.
    pub fn with_history(mut self, keep_history: bool) -> Self {
        self.keep_history = keep_history;
        self
    }

    /// The storage backend.
    pub fn storage(&self) -> &S {
        self.reconciler.storage()
    }

    /// Baseline for a country, falling back to the default.
    pub async fn baseline(&self, country: &CountryCode) -> Baseline {
        resolve_baseline(&self.baseline, country).await
    }

    /// Resolve the baseline and compute the estimate without saving.
    pub async fn estimate(&self, form: &FormInput) -> (Baseline, Estimate) {
        let baseline = self.baseline(&form.country_code).await;
        let estimate = calculate(baseline.years(), form.age, form.lifestyle);
        debug!(
            "Estimate for {}: adjustment {:+}, {} years left",
            form.country_code, estimate.adjustment, estimate.remaining_years
        );
        (baseline, estimate)
    }

    /// Compute and persist a calculation for the session's user.
    ///
    /// Only the record write can fail the call. The history snapshot is
    /// best-effort and reported through [`CalculationOutcome::history_saved`].
    pub async fn calculate_and_save(
        &mut self,
        session: &Session,
        form: &FormInput,
    ) -> Result<CalculationOutcome, ReconcileError> {
        let (baseline, estimate) = self.estimate(form).await;

        let reconciled = self
            .reconciler
            .reconcile(session.identity(), session.email(), form, &estimate)
            .await?;

        // Record is saved at this point; snapshot failures only warn.
        let history_saved = self.keep_history && self.snapshot(session, form, &estimate, &reconciled).await;

        Ok(CalculationOutcome {
            baseline,
            estimate,
            reconciled,
            history_saved,
        })
    }

    async fn snapshot(
        &mut self,
        session: &Session,
        form: &FormInput,
        estimate: &Estimate,
        reconciled: &Reconciled,
    ) -> bool {
        let entry = HistoryEntry::snapshot(session.identity(), form, estimate, reconciled.record().updated_at);
        match self.reconciler.storage_mut().append_history(&entry).await {
            Ok(()) => true,
            Err(e) => {
                warn!("Failed to record history for {}: {}", session.identity(), e);
                false
            }
        }
    }

    /// The last saved record for the session's user.
    pub async fn last_record(&self, session: &Session) -> Result<Option<LifespanRecord>, ReconcileError> {
        Ok(self.reconciler.storage().load_record(session.identity()).await?)
    }

    /// Up to `limit` past calculations, newest first.
    pub async fn history(&self, session: &Session, limit: usize) -> Result<Vec<HistoryEntry>, ReconcileError> {
        Ok(self.reconciler.storage().list_history(session.identity(), limit).await?)
    }

    /// Delete the user's history, and optionally the record.
    pub async fn purge(&mut self, session: &Session, scope: PurgeScope) -> Result<PurgeReport, ReconcileError> {
        let storage = self.reconciler.storage_mut();
        let history_removed = storage.purge_history(session.identity()).await?;
        let record_removed = match scope {
            PurgeScope::History => false,
            PurgeScope::Everything => storage.delete_record(session.identity()).await?,
        };

        info!(
            "Purged {} history entries for {} (record removed: {})",
            history_removed,
            session.identity(),
            record_removed
        );
        Ok(PurgeReport {
            history_removed,
            record_removed,
        })
    }
}
