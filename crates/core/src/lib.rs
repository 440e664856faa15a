//! SandGrains core data models.
//!
//! This crate defines the lifespan record, the lifestyle habits collected
//! by the calculator form, and the pure expectancy calculation.

#![warn(missing_docs)]

// Core identities
mod id;
mod identity;

// Form input
mod country;
mod error;
mod lifestyle;

// Calculation and persistence models
mod expectancy;
mod history;
mod record;

// Re-exports
pub use id::*;
pub use identity::IdentityKey;

pub use country::CountryCode;
pub use error::ParseError;
pub use lifestyle::{Exercise, Lifestyle, Smoking};

pub use expectancy::{calculate, calculate_or_default, Estimate, DEFAULT_BASE_EXPECTANCY, SECONDS_PER_YEAR};
pub use history::{sort_newest_first, HistoryEntry};
pub use record::{FormInput, LifespanRecord};

/// Timestamp type
pub type Time = chrono::DateTime<chrono::Utc>;
