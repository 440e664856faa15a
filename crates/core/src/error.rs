//! Parse errors for user-supplied form values.

/// Errors raised while turning raw form input into core types.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    /// Smoking habit outside `never`, `former`, `current`
    #[error("unknown smoking habit '{0}' (expected never, former or current)")]
    UnknownSmoking(String),

    /// Exercise frequency outside `regular`, `occasional`, `none`
    #[error("unknown exercise frequency '{0}' (expected regular, occasional or none)")]
    UnknownExercise(String),

    /// Not a two-letter country code
    #[error("invalid country code '{0}' (expected two letters, e.g. US)")]
    InvalidCountryCode(String),

    /// Identity string was blank
    #[error("identity must not be empty")]
    EmptyIdentity,
}
