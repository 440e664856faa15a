//! Hosted table storage over a PostgREST-style HTTP API.
//!
//! Talks to a Supabase project (or any PostgREST server). Records live in
//! `user_life_expectancy`, which keeps the column set the hosted table was
//! created with:
//!
//! ```text
//! id uuid, user_id uuid unique, age int, country_code text, locations jsonb,
//! lifestyle jsonb, genetic_factors jsonb, expectancy_years float8,
//! remaining_seconds int8, updated_at timestamp
//! ```
//!
//! Fields a record carries beyond these (email, baseline, adjustment) are
//! not sent; on load the baseline and adjustment are recovered from the
//! stored habits and expectancy. History goes to `life_expectancy_history`:
//!
//! ```sql
//! create table life_expectancy_history (
//!     id text primary key,
//!     user_id uuid not null,
//!     age int not null,
//!     country_code text not null,
//!     lifestyle jsonb not null,
//!     base_expectancy float8 not null,
//!     adjustment int not null,
//!     expectancy_years float8 not null,
//!     remaining_years float8 not null,
//!     remaining_seconds int8 not null,
//!     recorded_at timestamptz not null
//! );
//! create index on life_expectancy_history (user_id, recorded_at desc);
//! ```

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use reqwest::{Client, ClientBuilder, RequestBuilder, Response, StatusCode};
use sandgrains_core::{CountryCode, HistoryEntry, IdentityKey, LifespanRecord, Lifestyle, RecordId, Time};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use tracing::debug;
use uuid::Uuid;

use super::trait_::{Result, Storage, StorageError};

/// Table holding one record per identity.
pub const RECORDS_TABLE: &str = "user_life_expectancy";

/// Table holding calculation history.
pub const HISTORY_TABLE: &str = "life_expectancy_history";

/// Connection settings for the hosted tables.
#[derive(Debug, Clone)]
pub struct RestConfig {
    /// Project URL, e.g. `https://xyz.supabase.co`
    pub url: String,

    /// API key, sent as `apikey` and bearer token
    pub api_key: String,

    /// Per-request timeout
    pub timeout: Duration,
}

/// PostgREST-backed storage.
#[derive(Clone)]
pub struct RestStorage {
    client: Client,
    config: RestConfig,
}

impl RestStorage {
    /// Create a client for the configured project.
    pub fn new(config: RestConfig) -> Result<Self> {
        let client = ClientBuilder::new().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }

    fn table_url(&self, table: &str) -> String {
        table_url(&self.config.url, table)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", &self.config.api_key)
            .bearer_auth(&self.config.api_key)
    }

    async fn rows<T: DeserializeOwned>(response: Response) -> Result<Vec<T>> {
        let response = check(response).await?;
        Ok(response.json().await?)
    }
}

fn table_url(base: &str, table: &str) -> String {
    format!("{}/rest/v1/{}", base.trim_end_matches('/'), table)
}

fn eq(user: IdentityKey) -> String {
    format!("eq.{}", user)
}

async fn check(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    if status == StatusCode::CONFLICT {
        return Err(StorageError::Duplicate(body));
    }
    Err(StorageError::Remote {
        status: status.as_u16(),
        body,
    })
}

/// One `user_life_expectancy` row.
#[derive(Debug, Serialize, Deserialize)]
struct RecordRow {
    /// Sent on insert only; updates never touch the key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<Uuid>,
    user_id: IdentityKey,
    age: u8,
    country_code: CountryCode,
    #[serde(default)]
    locations: Vec<String>,
    lifestyle: Lifestyle,
    #[serde(default)]
    genetic_factors: Map<String, Value>,
    expectancy_years: f64,
    remaining_seconds: i64,
    #[serde(deserialize_with = "timestamp")]
    updated_at: Time,
}

impl RecordRow {
    fn insert(record: &LifespanRecord) -> Self {
        Self {
            id: Some(record.id.to_uuid()),
            ..Self::update(record)
        }
    }

    fn update(record: &LifespanRecord) -> Self {
        Self {
            id: None,
            user_id: record.user_id,
            age: record.age,
            country_code: record.country_code.clone(),
            locations: record.locations.clone(),
            lifestyle: record.lifestyle,
            genetic_factors: record.genetic_factors.clone(),
            expectancy_years: record.expectancy_years,
            remaining_seconds: record.remaining_seconds,
            updated_at: record.updated_at,
        }
    }

    fn into_record(self) -> Result<LifespanRecord> {
        let id = self
            .id
            .ok_or_else(|| StorageError::Other(format!("row for {} has no id", self.user_id)))?;
        let adjustment = self.lifestyle.adjustment();

        Ok(LifespanRecord {
            id: RecordId::from_uuid(id),
            user_id: self.user_id,
            email: String::new(),
            age: self.age,
            country_code: self.country_code,
            lifestyle: self.lifestyle,
            locations: self.locations,
            genetic_factors: self.genetic_factors,
            base_expectancy: self.expectancy_years - f64::from(adjustment),
            adjustment,
            expectancy_years: self.expectancy_years,
            remaining_seconds: self.remaining_seconds,
            updated_at: self.updated_at,
        })
    }
}

/// RFC 3339, or a naive ISO timestamp taken as UTC.
fn timestamp<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Time, D::Error> {
    let raw = String::deserialize(deserializer)?;
    if let Ok(at) = DateTime::parse_from_rfc3339(&raw) {
        return Ok(at.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(serde::de::Error::custom)
}

#[async_trait]
impl Storage for RestStorage {
    async fn load_record(&self, user: IdentityKey) -> Result<Option<LifespanRecord>> {
        let response = self
            .authorize(self.client.get(self.table_url(RECORDS_TABLE)))
            .query(&[("select", "*".to_string()), ("user_id", eq(user)), ("limit", "1".to_string())])
            .send()
            .await?;

        let rows: Vec<RecordRow> = Self::rows(response).await?;
        rows.into_iter().next().map(RecordRow::into_record).transpose()
    }

    async fn insert_record(&mut self, record: &LifespanRecord) -> Result<()> {
        let response = self
            .authorize(self.client.post(self.table_url(RECORDS_TABLE)))
            .header("Prefer", "return=minimal")
            .json(&RecordRow::insert(record))
            .send()
            .await?;

        check(response).await?;
        debug!("Inserted remote record for {}", record.user_id);
        Ok(())
    }

    async fn update_record(&mut self, record: &LifespanRecord) -> Result<()> {
        let response = self
            .authorize(self.client.patch(self.table_url(RECORDS_TABLE)))
            .query(&[("user_id", eq(record.user_id))])
            .header("Prefer", "return=representation")
            .json(&RecordRow::update(record))
            .send()
            .await?;

        let updated: Vec<Value> = Self::rows(response).await?;
        if updated.is_empty() {
            return Err(StorageError::NotFound(record.user_id.to_string()));
        }

        debug!("Updated remote record for {}", record.user_id);
        Ok(())
    }

    async fn upsert_record(&mut self, record: &LifespanRecord) -> Result<()> {
        let response = self
            .authorize(self.client.post(self.table_url(RECORDS_TABLE)))
            .query(&[("on_conflict", "user_id")])
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .json(&RecordRow::insert(record))
            .send()
            .await?;

        check(response).await?;
        Ok(())
    }

    async fn delete_record(&mut self, user: IdentityKey) -> Result<bool> {
        let response = self
            .authorize(self.client.delete(self.table_url(RECORDS_TABLE)))
            .query(&[("user_id", eq(user))])
            .header("Prefer", "return=representation")
            .send()
            .await?;

        let deleted: Vec<Value> = Self::rows(response).await?;
        Ok(!deleted.is_empty())
    }

    async fn append_history(&mut self, entry: &HistoryEntry) -> Result<()> {
        let response = self
            .authorize(self.client.post(self.table_url(HISTORY_TABLE)))
            .header("Prefer", "return=minimal")
            .json(entry)
            .send()
            .await?;

        check(response).await?;
        Ok(())
    }

    async fn list_history(&self, user: IdentityKey, limit: usize) -> Result<Vec<HistoryEntry>> {
        let response = self
            .authorize(self.client.get(self.table_url(HISTORY_TABLE)))
            .query(&[
                ("select", "*".to_string()),
                ("user_id", eq(user)),
                ("order", "recorded_at.desc,id.desc".to_string()),
                ("limit", limit.to_string()),
            ])
            .send()
            .await?;

        Self::rows(response).await
    }

    async fn purge_history(&mut self, user: IdentityKey) -> Result<usize> {
        let response = self
            .authorize(self.client.delete(self.table_url(HISTORY_TABLE)))
            .query(&[("user_id", eq(user))])
            .header("Prefer", "return=representation")
            .send()
            .await?;

        let deleted: Vec<Value> = Self::rows(response).await?;
        Ok(deleted.len())
    }
}
