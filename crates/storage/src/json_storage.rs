//! JSON file storage implementation.
//!
//! Stores one JSON file per record under `records/` and one file per history
//! entry under `history/<user_id>/`. The identity key is the file name, so a
//! second record for the same identity cannot exist.

use std::path::{Path, PathBuf};

use sandgrains_core::{sort_newest_first, HistoryEntry, IdentityKey, LifespanRecord};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use super::{Result, Storage, StorageError};

/// File-based JSON storage backend.
pub struct JsonStorage {
    root: PathBuf,
}

impl JsonStorage {
    /// Create storage rooted at `root`, creating the directories it needs.
    pub async fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();

        fs::create_dir_all(root.join("records")).await?;
        fs::create_dir_all(root.join("history")).await?;

        Ok(Self { root })
    }

    /// Directory this storage writes to.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn record_path(&self, user: IdentityKey) -> PathBuf {
        self.root.join("records").join(format!("{}.json", user))
    }

    fn history_dir(&self, user: IdentityKey) -> PathBuf {
        self.root.join("history").join(user.to_string())
    }
}

#[async_trait::async_trait]
impl Storage for JsonStorage {
    async fn load_record(&self, user: IdentityKey) -> Result<Option<LifespanRecord>> {
        read_json(&self.record_path(user)).await
    }

    async fn insert_record(&mut self, record: &LifespanRecord) -> Result<()> {
        let path = self.record_path(record.user_id);
        let json = serde_json::to_string_pretty(record)?;

        let mut file = match fs::OpenOptions::new().write(true).create_new(true).open(&path).await {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                return Err(StorageError::Duplicate(record.user_id.to_string()));
            }
            Err(e) => return Err(e.into()),
        };
        file.write_all(json.as_bytes()).await?;
        file.flush().await?;

        debug!("Inserted record file {}", path.display());
        Ok(())
    }

    async fn update_record(&mut self, record: &LifespanRecord) -> Result<()> {
        let path = self.record_path(record.user_id);
        if !fs::try_exists(&path).await? {
            return Err(StorageError::NotFound(record.user_id.to_string()));
        }

        let json = serde_json::to_string_pretty(record)?;
        fs::write(&path, json.as_bytes()).await?;

        debug!("Updated record file {}", path.display());
        Ok(())
    }

    async fn upsert_record(&mut self, record: &LifespanRecord) -> Result<()> {
        let json = serde_json::to_string_pretty(record)?;
        fs::write(self.record_path(record.user_id), json.as_bytes()).await?;
        Ok(())
    }

    async fn delete_record(&mut self, user: IdentityKey) -> Result<bool> {
        match fs::remove_file(self.record_path(user)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn append_history(&mut self, entry: &HistoryEntry) -> Result<()> {
        let dir = self.history_dir(entry.user_id);
        fs::create_dir_all(&dir).await?;

        let json = serde_json::to_string_pretty(entry)?;
        fs::write(dir.join(format!("{}.json", entry.id)), json.as_bytes()).await?;
        Ok(())
    }

    async fn list_history(&self, user: IdentityKey, limit: usize) -> Result<Vec<HistoryEntry>> {
        let mut entries: Vec<HistoryEntry> = list_dir(&self.history_dir(user)).await?;
        sort_newest_first(&mut entries);
        entries.truncate(limit);
        Ok(entries)
    }

    async fn purge_history(&mut self, user: IdentityKey) -> Result<usize> {
        let dir = self.history_dir(user);
        let removed = count_json_files(&dir).await?;

        match fs::remove_dir_all(&dir).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        debug!("Purged {} history files from {}", removed, dir.display());
        Ok(removed)
    }
}

async fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    match fs::read_to_string(path).await {
        Ok(json) => {
            let value = serde_json::from_str(&json)?;
            Ok(Some(value))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn is_json(path: &Path) -> bool {
    path.extension().and_then(|s| s.to_str()) == Some("json")
}

/// Entry files in `dir`, readable or not.
async fn count_json_files(dir: &Path) -> Result<usize> {
    let mut rd = match fs::read_dir(dir).await {
        Ok(rd) => rd,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(e.into()),
    };
    let mut count = 0;
    while let Some(entry) = rd.next_entry().await? {
        if is_json(&entry.path()) {
            count += 1;
        }
    }
    Ok(count)
}

async fn list_dir<T: serde::de::DeserializeOwned>(dir: &Path) -> Result<Vec<T>> {
    let mut items = Vec::new();
    let mut rd = match fs::read_dir(dir).await {
        Ok(rd) => rd,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(items),
        Err(e) => return Err(e.into()),
    };
    while let Some(entry) = rd.next_entry().await? {
        if !is_json(&entry.path()) {
            continue;
        }
        if let Ok(Some(item)) = read_json(&entry.path()).await {
            items.push(item);
        }
    }
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests_support::{history_entry, record};

    #[tokio::test]
    async fn test_insert_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let mut storage = JsonStorage::new(dir.path()).await.unwrap();

        let rec = record("ada@example.com", 30);
        storage.insert_record(&rec).await.unwrap();

        let loaded = storage.load_record(rec.user_id).await.unwrap().unwrap();
        assert_eq!(loaded, rec);
    }

    #[tokio::test]
    async fn test_load_missing_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let storage = JsonStorage::new(dir.path()).await.unwrap();
        let user = IdentityKey::from_email("nobody@example.com").unwrap();
        assert!(storage.load_record(user).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_second_insert_is_duplicate() {
        let dir = tempfile::tempdir().unwrap();
        let mut storage = JsonStorage::new(dir.path()).await.unwrap();

        let rec = record("ada@example.com", 30);
        storage.insert_record(&rec).await.unwrap();
        let err = storage.insert_record(&rec).await.unwrap_err();
        assert!(matches!(err, StorageError::Duplicate(_)));
    }

    #[tokio::test]
    async fn test_update_requires_existing_record() {
        let dir = tempfile::tempdir().unwrap();
        let mut storage = JsonStorage::new(dir.path()).await.unwrap();

        let mut rec = record("ada@example.com", 30);
        let err = storage.update_record(&rec).await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound(_)));

        storage.insert_record(&rec).await.unwrap();
        rec.age = 31;
        storage.update_record(&rec).await.unwrap();
        assert_eq!(storage.load_record(rec.user_id).await.unwrap().unwrap().age, 31);
    }

    #[tokio::test]
    async fn test_upsert_and_delete() {
        let dir = tempfile::tempdir().unwrap();
        let mut storage = JsonStorage::new(dir.path()).await.unwrap();

        let mut rec = record("ada@example.com", 30);
        storage.upsert_record(&rec).await.unwrap();
        rec.age = 45;
        storage.upsert_record(&rec).await.unwrap();
        assert_eq!(storage.load_record(rec.user_id).await.unwrap().unwrap().age, 45);

        assert!(storage.delete_record(rec.user_id).await.unwrap());
        assert!(!storage.delete_record(rec.user_id).await.unwrap());
        assert!(storage.load_record(rec.user_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_history_newest_first_and_purge() {
        let dir = tempfile::tempdir().unwrap();
        let mut storage = JsonStorage::new(dir.path()).await.unwrap();

        let user = IdentityKey::from_email("ada@example.com").unwrap();
        let other = IdentityKey::from_email("grace@example.com").unwrap();
        for offset in [-120, 0, -60] {
            storage.append_history(&history_entry(user, offset)).await.unwrap();
        }
        storage.append_history(&history_entry(other, 0)).await.unwrap();

        let entries = storage.list_history(user, 10).await.unwrap();
        assert_eq!(entries.len(), 3);
        assert!(entries[0].recorded_at > entries[1].recorded_at);
        assert!(entries[1].recorded_at > entries[2].recorded_at);

        assert_eq!(storage.list_history(user, 2).await.unwrap().len(), 2);

        assert_eq!(storage.purge_history(user).await.unwrap(), 3);
        assert!(storage.list_history(user, 10).await.unwrap().is_empty());
        assert_eq!(storage.list_history(other, 10).await.unwrap().len(), 1);
        assert_eq!(storage.purge_history(user).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_purge_counts_unreadable_entries() {
        let dir = tempfile::tempdir().unwrap();
        let mut storage = JsonStorage::new(dir.path()).await.unwrap();

        let user = IdentityKey::from_email("ada@example.com").unwrap();
        storage.append_history(&history_entry(user, 0)).await.unwrap();
        storage.append_history(&history_entry(user, -60)).await.unwrap();
        std::fs::write(storage.history_dir(user).join("corrupt.json"), "{ not json").unwrap();

        assert_eq!(storage.list_history(user, 10).await.unwrap().len(), 2);
        assert_eq!(storage.purge_history(user).await.unwrap(), 3);
        assert!(!storage.history_dir(user).exists());
    }
}
