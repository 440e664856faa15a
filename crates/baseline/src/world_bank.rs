//! World Bank indicator API client.
//!
//! Reads indicator `SP.DYN.LE00.IN` (life expectancy at birth, total years).
//! The API answers with `[paging, [observation, ...]]`, newest observation
//! first; the first observation's `value` is the baseline.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, ClientBuilder};
use sandgrains_core::CountryCode;
use serde_json::Value;
use tracing::debug;

use crate::{BaselineSource, LookupError};

/// Public API root.
pub const DEFAULT_BASE_URL: &str = "http://api.worldbank.org";

/// Life expectancy at birth, total (years).
pub const LIFE_EXPECTANCY_INDICATOR: &str = "SP.DYN.LE00.IN";

/// World Bank API client.
#[derive(Clone)]
pub struct WorldBankClient {
    /// HTTP client
    client: Client,

    /// API root, without trailing slash
    base_url: String,
}

impl WorldBankClient {
    /// Create a client for an API root with a request timeout.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            client: ClientBuilder::new().timeout(timeout).build().unwrap_or_default(),
            base_url,
        }
    }

    /// Indicator URL for a country.
    pub fn indicator_url(&self, country: &CountryCode) -> String {
        format!(
            "{}/v2/country/{}/indicator/{}?format=json",
            self.base_url, country, LIFE_EXPECTANCY_INDICATOR
        )
    }
}

impl Default for WorldBankClient {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL, Duration::from_secs(10))
    }
}

#[async_trait]
impl BaselineSource for WorldBankClient {
    async fn lookup(&self, country: &CountryCode) -> Result<f64, LookupError> {
        let url = self.indicator_url(country);
        debug!("Fetching baseline from {}", url);

        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(LookupError::Status(response.status().as_u16()));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| LookupError::Malformed(e.to_string()))?;

        parse_indicator(&body, country)
    }
}

/// Extract the first observation's value from an indicator response.
pub fn parse_indicator(body: &Value, country: &CountryCode) -> Result<f64, LookupError> {
    let observations = body
        .get(1)
        .and_then(Value::as_array)
        .ok_or_else(|| match body.get(0).and_then(|p| p.get("message")) {
            Some(message) => LookupError::Malformed(message.to_string()),
            None => LookupError::Malformed("missing observation list".to_string()),
        })?;

    let first = observations
        .first()
        .ok_or_else(|| LookupError::Missing(country.clone()))?;

    match first.get("value") {
        Some(Value::Number(n)) => n
            .as_f64()
            .ok_or_else(|| LookupError::Malformed(format!("value {} out of range", n))),
        Some(Value::Null) | None => Err(LookupError::Missing(country.clone())),
        Some(other) => Err(LookupError::Malformed(format!("value is not a number: {}", other))),
    }
}
