//! Baseline source trait and the best-effort resolution around it.

use async_trait::async_trait;
use sandgrains_core::{CountryCode, DEFAULT_BASE_EXPECTANCY};
use tracing::{debug, warn};

/// Why a baseline lookup produced no usable figure.
#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    /// Transport failure or timeout
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success HTTP status
    #[error("unexpected status {0}")]
    Status(u16),

    /// Body was not the expected JSON shape
    #[error("malformed response: {0}")]
    Malformed(String),

    /// The source has no figure for the country
    #[error("no value for {0}")]
    Missing(CountryCode),

    /// No source configured
    #[error("baseline source unavailable")]
    Unavailable,
}

/// Anything that can report a country's life expectancy in years.
#[async_trait]
pub trait BaselineSource: Send + Sync {
    /// Look up the baseline for a country.
    async fn lookup(&self, country: &CountryCode) -> Result<f64, LookupError>;
}

#[async_trait]
impl<T: BaselineSource + ?Sized> BaselineSource for Box<T> {
    async fn lookup(&self, country: &CountryCode) -> Result<f64, LookupError> {
        (**self).lookup(country).await
    }
}

/// A resolved baseline, remembering whether it came from the source.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Baseline {
    /// Figure reported by the source
    Resolved(f64),
    /// Source failed; the default was substituted
    Fallback(f64),
}

impl Baseline {
    /// Years, whichever way they were obtained.
    pub fn years(self) -> f64 {
        match self {
            Baseline::Resolved(years) | Baseline::Fallback(years) => years,
        }
    }

    /// Whether the default was substituted.
    pub fn is_fallback(self) -> bool {
        matches!(self, Baseline::Fallback(_))
    }
}

/// Look up the baseline, substituting [`DEFAULT_BASE_EXPECTANCY`] on any
/// failure. Never returns an error.
pub async fn resolve_baseline<B: BaselineSource + ?Sized>(source: &B, country: &CountryCode) -> Baseline {
    match source.lookup(country).await {
        Ok(years) if years.is_finite() => {
            debug!("Baseline for {}: {} years", country, years);
            Baseline::Resolved(years)
        }
        Ok(years) => {
            warn!("Baseline for {} was not a number ({}), using {}", country, years, DEFAULT_BASE_EXPECTANCY);
            Baseline::Fallback(DEFAULT_BASE_EXPECTANCY)
        }
        Err(e) => {
            warn!("Baseline lookup for {} failed: {}, using {}", country, e, DEFAULT_BASE_EXPECTANCY);
            Baseline::Fallback(DEFAULT_BASE_EXPECTANCY)
        }
    }
}

/// Fixed baseline, for offline use. `None` behaves like an unreachable source.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticBaseline(pub Option<f64>);

#[async_trait]
impl BaselineSource for StaticBaseline {
    async fn lookup(&self, _country: &CountryCode) -> Result<f64, LookupError> {
        self.0.ok_or(LookupError::Unavailable)
    }
}
