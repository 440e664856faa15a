//! Record reconciler - insert-or-update keyed by identity.
//!
//! The reconciler is the only place that decides between inserting and
//! updating, which is what keeps storage at one record per identity:
//!
//! ```text
//! load_record(identity) ─┬─ found ─────► apply form + estimate, update_record
//!                        └─ not found ─► new RecordId, insert_record
//! ```
//!
//! Each call performs exactly one write. Failures are returned as-is; there
//! is no retry and no concurrency check (last write wins).

use sandgrains_core::{Estimate, FormInput, IdentityKey, LifespanRecord, RecordId, Time};
use sandgrains_storage::{Storage, StorageError};
use tracing::{debug, info};

/// Errors from reconciling a record.
#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    /// The storage backend failed
    #[error("storage operation failed: {0}")]
    Storage(#[from] StorageError),
}

/// What the reconciler did.
#[derive(Debug, Clone, PartialEq)]
pub enum Reconciled {
    /// No record existed; one was created
    Inserted(LifespanRecord),
    /// The existing record was replaced in place
    Updated(LifespanRecord),
}

impl Reconciled {
    /// The record as written.
    pub fn record(&self) -> &LifespanRecord {
        match self {
            Reconciled::Inserted(record) | Reconciled::Updated(record) => record,
        }
    }

    /// Consume into the written record.
    pub fn into_record(self) -> LifespanRecord {
        match self {
            Reconciled::Inserted(record) | Reconciled::Updated(record) => record,
        }
    }

    /// Whether a new record was created.
    pub fn was_inserted(&self) -> bool {
        matches!(self, Reconciled::Inserted(_))
    }
}

/// Persists calculations, one record per identity.
pub struct Reconciler<S: Storage> {
    storage: S,
}

impl<S: Storage> Reconciler<S> {
    /// Create a reconciler over a storage backend.
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    /// The storage backend.
    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// The storage backend, mutably.
    pub fn storage_mut(&mut self) -> &mut S {
        &mut self.storage
    }

    /// Give back the storage backend.
    pub fn into_inner(self) -> S {
        self.storage
    }

    /// Insert or update the record for `identity` with a new calculation.
    pub async fn reconcile(
        &mut self,
        identity: IdentityKey,
        email: &str,
        form: &FormInput,
        estimate: &Estimate,
    ) -> Result<Reconciled, ReconcileError> {
        let now = chrono::Utc::now();

        match self.storage.load_record(identity).await? {
            Some(mut record) => {
                let updated_at = advance(record.updated_at, now);
                record.apply(email, form, estimate, updated_at);
                self.storage.update_record(&record).await?;
                info!("Updated record {} for {}", record.id, identity);
                Ok(Reconciled::Updated(record))
            }
            None => {
                let record = LifespanRecord::new(RecordId::new(), identity, email, form, estimate, now);
                self.storage.insert_record(&record).await?;
                info!("Inserted record {} for {}", record.id, identity);
                Ok(Reconciled::Inserted(record))
            }
        }
    }
}

/// Next write stamp: now, or just past the previous stamp if the clock has
/// not moved beyond it.
fn advance(previous: Time, now: Time) -> Time {
    if now > previous {
        now
    } else {
        debug!("Clock at or before last write, nudging updated_at forward");
        previous + chrono::Duration::microseconds(1)
    }
}
