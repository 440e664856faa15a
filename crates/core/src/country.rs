//! ISO 3166-1 alpha-2 country codes.

use serde::{Deserialize, Serialize};

use crate::ParseError;

/// Upper-case two-letter country code, e.g. `US`, `TR`, `DE`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CountryCode(String);

impl CountryCode {
    /// Normalize user input: trim, upper-case, require two ASCII letters.
    pub fn parse(input: &str) -> Result<Self, ParseError> {
        let code = input.trim().to_ascii_uppercase();
        if code.len() == 2 && code.chars().all(|c| c.is_ascii_alphabetic()) {
            Ok(Self(code))
        } else {
            Err(ParseError::InvalidCountryCode(input.to_string()))
        }
    }

    /// The code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CountryCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for CountryCode {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for CountryCode {
    type Error = ParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<CountryCode> for String {
    fn from(code: CountryCode) -> Self {
        code.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_uppercases() {
        assert_eq!(CountryCode::parse(" tr ").unwrap().as_str(), "TR");
    }

    #[test]
    fn test_parse_rejects_bad_codes() {
        assert!(CountryCode::parse("USA").is_err());
        assert!(CountryCode::parse("U1").is_err());
        assert!(CountryCode::parse("").is_err());
    }

    #[test]
    fn test_deserialize_validates() {
        let ok: CountryCode = serde_json::from_str("\"de\"").unwrap();
        assert_eq!(ok.as_str(), "DE");
        assert!(serde_json::from_str::<CountryCode>("\"germany\"").is_err());
    }
}
