//! Runtime configuration from the environment (and an optional `.env`).

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use sandgrains_baseline::DEFAULT_BASE_URL;
use sandgrains_storage::RestConfig;

const DEFAULT_DATA_DIR: &str = ".sandgrains";
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 10;

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// `SANDGRAINS_STORAGE` names no backend
    #[error("unknown storage backend '{0}' (expected json, sqlite or rest)")]
    UnknownStorage(String),

    /// A variable required by the chosen backend is unset
    #[error("{0} must be set")]
    Missing(&'static str),
}

/// Which storage backend to open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageKind {
    Json,
    Sqlite,
    Rest,
}

impl FromStr for StorageKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "json" => Ok(StorageKind::Json),
            "sqlite" => Ok(StorageKind::Sqlite),
            "rest" | "supabase" => Ok(StorageKind::Rest),
            _ => Err(ConfigError::UnknownStorage(s.to_string())),
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Storage backend
    pub storage: StorageKind,
    /// Root for JSON files and the default SQLite file
    pub data_dir: PathBuf,
    /// Explicit sqlx URL, overriding the one derived from `data_dir`
    pub sqlite_url: Option<String>,
    /// Hosted project URL
    pub supabase_url: Option<String>,
    /// Hosted project API key
    pub supabase_key: Option<String>,
    /// World Bank API root
    pub baseline_url: String,
    /// Timeout for every HTTP request
    pub http_timeout: Duration,
    /// Skip the baseline lookup and use the default
    pub offline: bool,
    /// Already-authenticated user
    pub email: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            storage: StorageKind::Json,
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            sqlite_url: None,
            supabase_url: None,
            supabase_key: None,
            baseline_url: DEFAULT_BASE_URL.to_string(),
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
            offline: false,
            email: None,
        }
    }
}

impl AppConfig {
    /// Load from the process environment, reading `.env` first if present.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary variable lookup.
    ///
    /// Unparseable numbers and flags fall back to their defaults.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let non_empty = |key: &str| get(key).filter(|v| !v.trim().is_empty());

        let storage = match non_empty("SANDGRAINS_STORAGE") {
            Some(kind) => kind.parse()?,
            None => defaults.storage,
        };

        Ok(Self {
            storage,
            data_dir: non_empty("SANDGRAINS_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            sqlite_url: non_empty("SANDGRAINS_SQLITE_URL"),
            supabase_url: non_empty("SUPABASE_URL"),
            supabase_key: non_empty("SUPABASE_KEY"),
            baseline_url: non_empty("SANDGRAINS_BASELINE_URL").unwrap_or(defaults.baseline_url),
            http_timeout: non_empty("SANDGRAINS_HTTP_TIMEOUT_SECS")
                .and_then(|s| s.trim().parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.http_timeout),
            offline: non_empty("SANDGRAINS_OFFLINE")
                .and_then(|s| parse_flag(&s))
                .unwrap_or(defaults.offline),
            email: non_empty("SANDGRAINS_EMAIL"),
        })
    }

    /// sqlx URL for the SQLite backend.
    pub fn sqlite_url(&self) -> String {
        match &self.sqlite_url {
            Some(url) => url.clone(),
            None => format!("sqlite://{}?mode=rwc", self.data_dir.join("sandgrains.db").display()),
        }
    }

    /// Settings for the hosted backend.
    pub fn rest_config(&self) -> Result<RestConfig, ConfigError> {
        Ok(RestConfig {
            url: self.supabase_url.clone().ok_or(ConfigError::Missing("SUPABASE_URL"))?,
            api_key: self.supabase_key.clone().ok_or(ConfigError::Missing("SUPABASE_KEY"))?,
            timeout: self.http_timeout,
        })
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
