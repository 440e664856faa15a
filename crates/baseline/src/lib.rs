//! Baseline life expectancy lookup for SandGrains.
//!
//! Lookups are best-effort: [`resolve_baseline`] turns every failure into
//! the default baseline instead of an error.

#![warn(missing_docs)]

pub mod source;
pub mod world_bank;

pub use source::{resolve_baseline, Baseline, BaselineSource, LookupError, StaticBaseline};
pub use world_bank::{parse_indicator, WorldBankClient, DEFAULT_BASE_URL};
