//! Calculation history - append-only snapshots of past estimates.

use serde::{Deserialize, Serialize};

use crate::id::HistoryId;
use crate::{CountryCode, Estimate, FormInput, IdentityKey, Lifestyle, Time};

/// One past calculation, kept for the history view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Unique identifier
    pub id: HistoryId,

    /// Owning identity
    pub user_id: IdentityKey,

    /// Age at the time
    pub age: u8,

    /// Country used for the baseline
    pub country_code: CountryCode,

    /// Habits at the time
    pub lifestyle: Lifestyle,

    /// Baseline life expectancy
    pub base_expectancy: f64,

    /// Lifestyle delta
    pub adjustment: i32,

    /// Adjusted life expectancy
    pub expectancy_years: f64,

    /// Years left
    pub remaining_years: f64,

    /// Seconds left
    pub remaining_seconds: i64,

    /// When the calculation was saved
    pub recorded_at: Time,
}

impl HistoryEntry {
    /// Snapshot a calculation.
    pub fn snapshot(user_id: IdentityKey, form: &FormInput, estimate: &Estimate, recorded_at: Time) -> Self {
        Self {
            id: HistoryId::new(),
            user_id,
            age: form.age,
            country_code: form.country_code.clone(),
            lifestyle: form.lifestyle,
            base_expectancy: estimate.base_expectancy,
            adjustment: estimate.adjustment,
            expectancy_years: estimate.expectancy_years,
            remaining_years: estimate.remaining_years,
            remaining_seconds: estimate.remaining_seconds,
            recorded_at,
        }
    }
}

/// Newest first; ties broken by id so the order is total.
pub fn sort_newest_first(entries: &mut [HistoryEntry]) {
    entries.sort_by(|a, b| b.recorded_at.cmp(&a.recorded_at).then_with(|| b.id.cmp(&a.id)));
}
