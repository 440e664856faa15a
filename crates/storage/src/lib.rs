//! Storage abstraction and implementations for SandGrains.
//!
//! This crate provides a trait-based storage interface with a JSON file
//! backend (`json` feature, on by default), plus optional SQLite (`sqlite`
//! feature) and hosted PostgREST (`rest` feature) backends.

#![warn(missing_docs)]

pub mod trait_;
#[cfg(feature = "json")]
pub mod json_storage;
#[cfg(feature = "sqlite")]
pub mod sqlite_storage;
#[cfg(feature = "rest")]
pub mod rest_storage;

pub use trait_::{Storage, StorageError, Result};
#[cfg(feature = "json")]
pub use json_storage::JsonStorage;
#[cfg(feature = "sqlite")]
pub use sqlite_storage::SqliteStorage;
#[cfg(feature = "rest")]
pub use rest_storage::{RestConfig, RestStorage};

#[cfg(test)]
pub(crate) mod tests_support {
    use sandgrains_core::{
        calculate, CountryCode, Exercise, FormInput, HistoryEntry, IdentityKey, LifespanRecord, Lifestyle,
        RecordId, Smoking,
    };

    pub fn form(age: u8) -> FormInput {
        FormInput {
            age,
            country_code: CountryCode::parse("US").unwrap(),
            lifestyle: Lifestyle::new(Smoking::Never, Exercise::Regular),
        }
    }

    pub fn record(email: &str, age: u8) -> LifespanRecord {
        let form = form(age);
        let estimate = calculate(75.0, form.age, form.lifestyle);
        LifespanRecord::new(
            RecordId::new(),
            IdentityKey::from_email(email).unwrap(),
            email,
            &form,
            &estimate,
            chrono::Utc::now(),
        )
    }

    pub fn history_entry(user: IdentityKey, offset_secs: i64) -> HistoryEntry {
        let form = form(30);
        let estimate = calculate(75.0, form.age, form.lifestyle);
        let at = chrono::Utc::now() + chrono::Duration::seconds(offset_secs);
        HistoryEntry::snapshot(user, &form, &estimate, at)
    }
}
