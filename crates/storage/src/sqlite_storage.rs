//! SQLite storage backend for SandGrains.
//!
//! Records live in `user_life_expectancy`, keyed by `user_id`; history
//! entries in `life_expectancy_history`. Both keep the full entity as JSON in
//! a `data` column next to the columns used for lookups and ordering.

use async_trait::async_trait;
use chrono::SecondsFormat;
use sandgrains_core::{HistoryEntry, IdentityKey, LifespanRecord};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::Row;
use tracing::debug;

use super::trait_::{Result, Storage, StorageError};

/// SQLite storage implementation.
#[derive(Clone)]
pub struct SqliteStorage {
    /// Database connection pool
    pool: sqlx::SqlitePool,
}

impl SqliteStorage {
    /// Open (and create if missing) the database at a sqlx URL, e.g.
    /// `sqlite://.sandgrains/sandgrains.db?mode=rwc`.
    pub async fn new(db_url: &str) -> Result<Self> {
        let pool = sqlx::SqlitePool::connect(db_url)
            .await
            .map_err(|e| StorageError::Other(e.to_string()))?;

        let storage = Self { pool };
        storage.init_schema().await?;

        Ok(storage)
    }

    /// Create an in-memory SQLite storage for testing.
    pub async fn in_memory() -> Result<Self> {
        // One connection: every new in-memory connection is a separate database.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .map_err(|e| StorageError::Other(e.to_string()))?;

        let storage = Self { pool };
        storage.init_schema().await?;

        Ok(storage)
    }

    /// Initialize the database schema.
    async fn init_schema(&self) -> Result<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS user_life_expectancy (
                user_id TEXT PRIMARY KEY,
                id TEXT NOT NULL UNIQUE,
                data TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Other(e.to_string()))?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS life_expectancy_history (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                data TEXT NOT NULL,
                recorded_at TEXT NOT NULL
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Other(e.to_string()))?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_history_user_time
                ON life_expectancy_history(user_id, recorded_at)",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Other(e.to_string()))?;

        Ok(())
    }

    /// Check if the database is healthy.
    pub async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1").fetch_one(&self.pool).await.is_ok()
    }

    fn decode<T: serde::de::DeserializeOwned>(row: &sqlx::sqlite::SqliteRow) -> Result<T> {
        let data: String = row
            .try_get("data")
            .map_err(|e| StorageError::Other(e.to_string()))?;
        Ok(serde_json::from_str(&data)?)
    }
}

/// Fixed-width UTC timestamps so that text ordering is time ordering.
fn sortable(time: &sandgrains_core::Time) -> String {
    time.to_rfc3339_opts(SecondsFormat::Micros, true)
}

#[async_trait]
impl Storage for SqliteStorage {
    async fn load_record(&self, user: IdentityKey) -> Result<Option<LifespanRecord>> {
        let row = sqlx::query("SELECT data FROM user_life_expectancy WHERE user_id = ?")
            .bind(user.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StorageError::Other(e.to_string()))?;

        row.as_ref().map(Self::decode).transpose()
    }

    async fn insert_record(&mut self, record: &LifespanRecord) -> Result<()> {
        let data = serde_json::to_string(record)?;

        let result = sqlx::query(
            "INSERT INTO user_life_expectancy (user_id, id, data, updated_at) VALUES (?, ?, ?, ?)",
        )
        .bind(record.user_id.to_string())
        .bind(record.id.to_string())
        .bind(data)
        .bind(sortable(&record.updated_at))
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => {
                debug!("Inserted record row for {}", record.user_id);
                Ok(())
            }
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                Err(StorageError::Duplicate(record.user_id.to_string()))
            }
            Err(e) => Err(StorageError::Other(e.to_string())),
        }
    }

    async fn update_record(&mut self, record: &LifespanRecord) -> Result<()> {
        let data = serde_json::to_string(record)?;

        let result = sqlx::query(
            "UPDATE user_life_expectancy SET id = ?, data = ?, updated_at = ? WHERE user_id = ?",
        )
        .bind(record.id.to_string())
        .bind(data)
        .bind(sortable(&record.updated_at))
        .bind(record.user_id.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Other(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound(record.user_id.to_string()));
        }

        debug!("Updated record row for {}", record.user_id);
        Ok(())
    }

    async fn upsert_record(&mut self, record: &LifespanRecord) -> Result<()> {
        let data = serde_json::to_string(record)?;

        sqlx::query(
            "INSERT INTO user_life_expectancy (user_id, id, data, updated_at) VALUES (?, ?, ?, ?)
            ON CONFLICT(user_id) DO UPDATE SET
                id = excluded.id,
                data = excluded.data,
                updated_at = excluded.updated_at",
        )
        .bind(record.user_id.to_string())
        .bind(record.id.to_string())
        .bind(data)
        .bind(sortable(&record.updated_at))
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Other(e.to_string()))?;

        Ok(())
    }

    async fn delete_record(&mut self, user: IdentityKey) -> Result<bool> {
        let result = sqlx::query("DELETE FROM user_life_expectancy WHERE user_id = ?")
            .bind(user.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::Other(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }

    async fn append_history(&mut self, entry: &HistoryEntry) -> Result<()> {
        let data = serde_json::to_string(entry)?;

        sqlx::query(
            "INSERT INTO life_expectancy_history (id, user_id, data, recorded_at) VALUES (?, ?, ?, ?)",
        )
        .bind(entry.id.to_string())
        .bind(entry.user_id.to_string())
        .bind(data)
        .bind(sortable(&entry.recorded_at))
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Other(e.to_string()))?;

        Ok(())
    }

    async fn list_history(&self, user: IdentityKey, limit: usize) -> Result<Vec<HistoryEntry>> {
        let rows = sqlx::query(
            "SELECT data FROM life_expectancy_history WHERE user_id = ?
            ORDER BY recorded_at DESC, id DESC LIMIT ?",
        )
        .bind(user.to_string())
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Other(e.to_string()))?;

        rows.iter().map(Self::decode).collect()
    }

    async fn purge_history(&mut self, user: IdentityKey) -> Result<usize> {
        let result = sqlx::query("DELETE FROM life_expectancy_history WHERE user_id = ?")
            .bind(user.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::Other(e.to_string()))?;

        Ok(result.rows_affected() as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests_support::{history_entry, record};

    #[tokio::test]
    async fn test_in_memory_storage() {
        let mut storage = SqliteStorage::in_memory().await.unwrap();

        let rec = record("ada@example.com", 30);
        storage.insert_record(&rec).await.unwrap();
        let loaded = storage.load_record(rec.user_id).await.unwrap().unwrap();

        assert_eq!(loaded, rec);
    }

    #[tokio::test]
    async fn test_duplicate_insert_rejected() {
        let mut storage = SqliteStorage::in_memory().await.unwrap();

        let rec = record("ada@example.com", 30);
        storage.insert_record(&rec).await.unwrap();

        let again = record("ada@example.com", 31);
        let err = storage.insert_record(&again).await.unwrap_err();
        assert!(matches!(err, StorageError::Duplicate(_)));
    }

    #[tokio::test]
    async fn test_update_and_upsert() {
        let mut storage = SqliteStorage::in_memory().await.unwrap();

        let mut rec = record("ada@example.com", 30);
        assert!(matches!(
            storage.update_record(&rec).await.unwrap_err(),
            StorageError::NotFound(_)
        ));

        storage.upsert_record(&rec).await.unwrap();
        rec.age = 50;
        storage.update_record(&rec).await.unwrap();
        assert_eq!(storage.load_record(rec.user_id).await.unwrap().unwrap().age, 50);

        rec.age = 51;
        storage.upsert_record(&rec).await.unwrap();
        assert_eq!(storage.load_record(rec.user_id).await.unwrap().unwrap().age, 51);

        assert!(storage.delete_record(rec.user_id).await.unwrap());
        assert!(storage.load_record(rec.user_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_history_order_limit_and_purge() {
        let mut storage = SqliteStorage::in_memory().await.unwrap();
        let user = IdentityKey::from_email("ada@example.com").unwrap();

        for offset in [-30, -90, 0, -60] {
            storage.append_history(&history_entry(user, offset)).await.unwrap();
        }

        let entries = storage.list_history(user, 3).await.unwrap();
        assert_eq!(entries.len(), 3);
        assert!(entries.windows(2).all(|w| w[0].recorded_at >= w[1].recorded_at));

        assert_eq!(storage.purge_history(user).await.unwrap(), 4);
        assert!(storage.list_history(user, 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_health_check() {
        let storage = SqliteStorage::in_memory().await.unwrap();
        assert!(storage.health_check().await);
    }
}
