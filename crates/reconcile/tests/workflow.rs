use async_trait::async_trait;
use sandgrains_baseline::{Baseline, StaticBaseline};
use sandgrains_core::{CountryCode, Exercise, FormInput, HistoryEntry, IdentityKey, LifespanRecord, Lifestyle, Smoking};
use sandgrains_reconcile::{Calculator, PurgeScope, Session};
use sandgrains_storage::{JsonStorage, Result as StorageResult, Storage, StorageError};
use tempfile::tempdir;

/// JsonStorage whose history table rejects every write.
struct NoHistory(JsonStorage);

#[async_trait]
impl Storage for NoHistory {
    async fn load_record(&self, user: IdentityKey) -> StorageResult<Option<LifespanRecord>> {
        self.0.load_record(user).await
    }
    async fn insert_record(&mut self, record: &LifespanRecord) -> StorageResult<()> {
        self.0.insert_record(record).await
    }
    async fn update_record(&mut self, record: &LifespanRecord) -> StorageResult<()> {
        self.0.update_record(record).await
    }
    async fn upsert_record(&mut self, record: &LifespanRecord) -> StorageResult<()> {
        self.0.upsert_record(record).await
    }
    async fn delete_record(&mut self, user: IdentityKey) -> StorageResult<bool> {
        self.0.delete_record(user).await
    }
    async fn append_history(&mut self, _entry: &HistoryEntry) -> StorageResult<()> {
        Err(StorageError::Other("history table unavailable".to_string()))
    }
    async fn list_history(&self, user: IdentityKey, limit: usize) -> StorageResult<Vec<HistoryEntry>> {
        self.0.list_history(user, limit).await
    }
    async fn purge_history(&mut self, user: IdentityKey) -> StorageResult<usize> {
        self.0.purge_history(user).await
    }
}

fn form(age: u8, smoking: Smoking, exercise: Exercise) -> FormInput {
    FormInput {
        age,
        country_code: CountryCode::parse("us").unwrap(),
        lifestyle: Lifestyle::new(smoking, exercise),
    }
}

#[tokio::test]
async fn test_first_calculation_inserts() {
    let dir = tempdir().unwrap();
    let storage = JsonStorage::new(dir.path()).await.unwrap();
    let mut calculator = Calculator::new(storage, StaticBaseline(Some(75.0)));
    let session = Session::authenticated("ada@example.com").unwrap();

    let outcome = calculator
        .calculate_and_save(&session, &form(30, Smoking::Never, Exercise::Regular))
        .await
        .unwrap();

    assert!(outcome.reconciled.was_inserted());
    assert!(outcome.history_saved);
    assert_eq!(outcome.baseline, Baseline::Resolved(75.0));
    assert_eq!(outcome.estimate.adjustment, 5);
    assert_eq!(outcome.estimate.expectancy_years, 80.0);
    assert_eq!(outcome.estimate.remaining_years, 50.0);
    assert_eq!(outcome.estimate.remaining_seconds, 1_576_800_000);

    let stored = calculator.last_record(&session).await.unwrap().unwrap();
    assert_eq!(stored.remaining_seconds, 1_576_800_000);
    assert_eq!(stored.email, "ada@example.com");
}

#[tokio::test]
async fn test_repeat_calculation_updates_single_record() {
    let dir = tempdir().unwrap();
    let storage = JsonStorage::new(dir.path()).await.unwrap();
    let mut calculator = Calculator::new(storage, StaticBaseline(Some(75.0)));
    let session = Session::authenticated("ada@example.com").unwrap();
    let input = form(30, Smoking::Never, Exercise::Regular);

    let first = calculator.calculate_and_save(&session, &input).await.unwrap();
    let second = calculator.calculate_and_save(&session, &input).await.unwrap();

    assert!(first.reconciled.was_inserted());
    assert!(!second.reconciled.was_inserted());
    assert_eq!(first.reconciled.record().id, second.reconciled.record().id);
    assert!(second.reconciled.record().updated_at > first.reconciled.record().updated_at);

    let records = std::fs::read_dir(dir.path().join("records")).unwrap().count();
    assert_eq!(records, 1);
}

#[tokio::test]
async fn test_failed_lookup_uses_default_baseline() {
    let dir = tempdir().unwrap();
    let storage = JsonStorage::new(dir.path()).await.unwrap();
    let mut calculator = Calculator::new(storage, StaticBaseline(None));
    let session = Session::authenticated("ada@example.com").unwrap();

    let outcome = calculator
        .calculate_and_save(&session, &form(40, Smoking::Former, Exercise::Occasional))
        .await
        .unwrap();

    assert_eq!(outcome.baseline, Baseline::Fallback(75.0));
    assert_eq!(outcome.estimate.base_expectancy, 75.0);
    assert_eq!(outcome.reconciled.record().base_expectancy, 75.0);
}

#[tokio::test]
async fn test_negative_remaining_time_is_stored_unclamped() {
    let dir = tempdir().unwrap();
    let storage = JsonStorage::new(dir.path()).await.unwrap();
    let mut calculator = Calculator::new(storage, StaticBaseline(Some(67.0)));
    let session = Session::authenticated("old@example.com").unwrap();

    let outcome = calculator
        .calculate_and_save(&session, &form(65, Smoking::Current, Exercise::None))
        .await
        .unwrap();

    assert_eq!(outcome.estimate.expectancy_years, 59.0);
    assert_eq!(outcome.estimate.remaining_years, -6.0);
    assert_eq!(outcome.reconciled.record().remaining_seconds, -189_216_000);
}

#[tokio::test]
async fn test_history_and_purge() {
    let dir = tempdir().unwrap();
    let storage = JsonStorage::new(dir.path()).await.unwrap();
    let mut calculator = Calculator::new(storage, StaticBaseline(Some(75.0)));
    let session = Session::authenticated("ada@example.com").unwrap();

    for age in [30, 31, 32] {
        calculator
            .calculate_and_save(&session, &form(age, Smoking::Never, Exercise::Regular))
            .await
            .unwrap();
    }

    let history = calculator.history(&session, 10).await.unwrap();
    assert_eq!(history.len(), 3);
    assert_eq!(history[0].age, 32);
    assert_eq!(history[2].age, 30);

    let report = calculator.purge(&session, PurgeScope::History).await.unwrap();
    assert_eq!(report.history_removed, 3);
    assert!(!report.record_removed);
    assert!(calculator.history(&session, 10).await.unwrap().is_empty());
    assert!(calculator.last_record(&session).await.unwrap().is_some());

    let report = calculator.purge(&session, PurgeScope::Everything).await.unwrap();
    assert_eq!(report.history_removed, 0);
    assert!(report.record_removed);
    assert!(calculator.storage().load_record(session.identity()).await.unwrap().is_none());
}

#[tokio::test]
async fn test_history_can_be_disabled() {
    let dir = tempdir().unwrap();
    let storage = JsonStorage::new(dir.path()).await.unwrap();
    let mut calculator = Calculator::new(storage, StaticBaseline(Some(75.0))).with_history(false);
    let session = Session::authenticated("ada@example.com").unwrap();

    calculator
        .calculate_and_save(&session, &form(30, Smoking::Never, Exercise::Regular))
        .await
        .unwrap();

    assert!(calculator.history(&session, 10).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_failed_history_write_keeps_saved_record() {
    let dir = tempdir().unwrap();
    let storage = NoHistory(JsonStorage::new(dir.path()).await.unwrap());
    let mut calculator = Calculator::new(storage, StaticBaseline(Some(75.0)));
    let session = Session::authenticated("ada@example.com").unwrap();

    let outcome = calculator
        .calculate_and_save(&session, &form(30, Smoking::Never, Exercise::Regular))
        .await
        .unwrap();

    assert!(outcome.reconciled.was_inserted());
    assert!(!outcome.history_saved);

    let stored = calculator.last_record(&session).await.unwrap().unwrap();
    assert_eq!(stored.remaining_seconds, 1_576_800_000);

    let outcome = calculator
        .calculate_and_save(&session, &form(31, Smoking::Never, Exercise::Regular))
        .await
        .unwrap();
    assert!(!outcome.reconciled.was_inserted());
    assert_eq!(calculator.last_record(&session).await.unwrap().unwrap().age, 31);
}
