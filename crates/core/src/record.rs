//! Lifespan record model - one stored estimate per user.

use serde::{Deserialize, Serialize};

use crate::id::RecordId;
use crate::{CountryCode, Estimate, IdentityKey, Lifestyle, Time};

/// The values a user submits with the calculator form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormInput {
    /// Current age, 1-120
    pub age: u8,

    /// Country the baseline is looked up for
    pub country_code: CountryCode,

    /// Smoking and exercise habits
    pub lifestyle: Lifestyle,
}

/// The persisted estimate for one user.
///
/// At most one record exists per [`IdentityKey`]; later calculations
/// overwrite the mutable fields in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LifespanRecord {
    /// Local identifier, assigned on insert
    pub id: RecordId,

    /// Owning identity
    pub user_id: IdentityKey,

    /// Email the identity was derived from
    pub email: String,

    /// Age at the last calculation
    pub age: u8,

    /// Country used for the baseline
    pub country_code: CountryCode,

    /// Habits at the last calculation
    pub lifestyle: Lifestyle,

    /// Reserved: places lived
    #[serde(default)]
    pub locations: Vec<String>,

    /// Reserved: inherited risk factors
    #[serde(default)]
    pub genetic_factors: serde_json::Map<String, serde_json::Value>,

    /// Baseline life expectancy
    pub base_expectancy: f64,

    /// Lifestyle delta
    pub adjustment: i32,

    /// Adjusted life expectancy
    pub expectancy_years: f64,

    /// Seconds left (may be negative)
    pub remaining_seconds: i64,

    /// Last write
    pub updated_at: Time,
}

impl LifespanRecord {
    /// Build a fresh record from a calculation.
    pub fn new(
        id: RecordId,
        user_id: IdentityKey,
        email: impl Into<String>,
        form: &FormInput,
        estimate: &Estimate,
        updated_at: Time,
    ) -> Self {
        Self {
            id,
            user_id,
            email: email.into(),
            age: form.age,
            country_code: form.country_code.clone(),
            lifestyle: form.lifestyle,
            locations: Vec::new(),
            genetic_factors: serde_json::Map::new(),
            base_expectancy: estimate.base_expectancy,
            adjustment: estimate.adjustment,
            expectancy_years: estimate.expectancy_years,
            remaining_seconds: estimate.remaining_seconds,
            updated_at,
        }
    }

    /// Replace every mutable field with a new calculation.
    ///
    /// `id`, `user_id` and the reserved fields are kept.
    pub fn apply(&mut self, email: &str, form: &FormInput, estimate: &Estimate, updated_at: Time) {
        self.email = email.to_string();
        self.age = form.age;
        self.country_code = form.country_code.clone();
        self.lifestyle = form.lifestyle;
        self.base_expectancy = estimate.base_expectancy;
        self.adjustment = estimate.adjustment;
        self.expectancy_years = estimate.expectancy_years;
        self.remaining_seconds = estimate.remaining_seconds;
        self.updated_at = updated_at;
    }

    /// Years left, recovered from the stored expectancy and age.
    pub fn remaining_years(&self) -> f64 {
        self.expectancy_years - f64::from(self.age)
    }
}
