//! Storage trait abstraction.

use async_trait::async_trait;
use sandgrains_core::{HistoryEntry, IdentityKey, LifespanRecord};

/// Error type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP transport error
    #[cfg(feature = "rest")]
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The hosted table API rejected a request
    #[error("remote storage returned {status}: {body}")]
    Remote {
        /// HTTP status code
        status: u16,
        /// Response body
        body: String,
    },

    /// No record for the identity
    #[error("Not found: {0}")]
    NotFound(String),

    /// A record for the identity already exists
    #[error("Duplicate record: {0}")]
    Duplicate(String),

    /// Other error
    #[error("{0}")]
    Other(String),
}

/// Storage abstraction for lifespan records and their history.
///
/// Records are keyed by [`IdentityKey`]; every backend keeps at most one
/// record per key. History entries are append-only until purged.
#[async_trait]
pub trait Storage: Send + Sync {
    // === Record operations ===

    /// Select the record for an identity.
    async fn load_record(&self, user: IdentityKey) -> Result<Option<LifespanRecord>>;

    /// Insert a new record. Fails with [`StorageError::Duplicate`] if the
    /// identity already has one.
    async fn insert_record(&mut self, record: &LifespanRecord) -> Result<()>;

    /// Replace the record stored under `record.user_id`. Fails with
    /// [`StorageError::NotFound`] if there is none.
    async fn update_record(&mut self, record: &LifespanRecord) -> Result<()>;

    /// Insert or replace the record stored under `record.user_id`.
    async fn upsert_record(&mut self, record: &LifespanRecord) -> Result<()>;

    /// Delete the record for an identity. Returns whether one existed.
    async fn delete_record(&mut self, user: IdentityKey) -> Result<bool>;

    // === History operations ===

    /// Append a history entry.
    async fn append_history(&mut self, entry: &HistoryEntry) -> Result<()>;

    /// Up to `limit` history entries for an identity, newest first.
    async fn list_history(&self, user: IdentityKey, limit: usize) -> Result<Vec<HistoryEntry>>;

    /// Delete every history entry for an identity. Returns how many went.
    async fn purge_history(&mut self, user: IdentityKey) -> Result<usize>;
}
