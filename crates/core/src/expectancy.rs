//! Expectancy calculator.
//!
//! Maps a baseline life expectancy plus lifestyle habits to the adjusted
//! expectancy and the time left. Pure: identical inputs give identical
//! output, and nothing here touches the network or storage.
//!
//! ```text
//! adjustment        = smoking score + exercise score
//! expectancy_years  = base + adjustment
//! remaining_years   = expectancy_years - age        (not clamped)
//! remaining_seconds = floor(remaining_years * 31_536_000)
//! ```

use serde::{Deserialize, Serialize};

use crate::Lifestyle;

/// Baseline used when no country figure is available.
pub const DEFAULT_BASE_EXPECTANCY: f64 = 75.0;

/// Seconds in a 365-day year. Leap years are ignored.
pub const SECONDS_PER_YEAR: i64 = 31_536_000;

/// Output of the calculator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Estimate {
    /// Baseline the estimate was computed from
    pub base_expectancy: f64,

    /// Lifestyle delta, in years
    pub adjustment: i32,

    /// Adjusted life expectancy, in years
    pub expectancy_years: f64,

    /// Years left; negative once age exceeds the expectancy
    pub remaining_years: f64,

    /// Seconds left, floored
    pub remaining_seconds: i64,
}

/// Compute the estimate for an already resolved baseline.
pub fn calculate(base_expectancy: f64, age: u8, lifestyle: Lifestyle) -> Estimate {
    let adjustment = lifestyle.adjustment();
    let expectancy_years = base_expectancy + f64::from(adjustment);
    let remaining_years = expectancy_years - f64::from(age);
    let remaining_seconds = (remaining_years * SECONDS_PER_YEAR as f64).floor() as i64;

    Estimate {
        base_expectancy,
        adjustment,
        expectancy_years,
        remaining_years,
        remaining_seconds,
    }
}

/// Like [`calculate`], substituting [`DEFAULT_BASE_EXPECTANCY`] when the
/// baseline is missing.
pub fn calculate_or_default(base_expectancy: Option<f64>, age: u8, lifestyle: Lifestyle) -> Estimate {
    calculate(base_expectancy.unwrap_or(DEFAULT_BASE_EXPECTANCY), age, lifestyle)
}
