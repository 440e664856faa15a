//! User identity keys.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::ParseError;

/// Stable key locating at most one lifespan record per user.
///
/// Derived from the authenticated email as a name-based UUID (v5, DNS
/// namespace), so the same email always maps to the same key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdentityKey(Uuid);

impl IdentityKey {
    /// Derive the key for an authenticated email or username.
    ///
    /// The identifier is hashed exactly as given; a blank one is rejected.
    pub fn from_email(email: &str) -> Result<Self, ParseError> {
        if email.trim().is_empty() {
            return Err(ParseError::EmptyIdentity);
        }
        Ok(Self(Uuid::new_v5(&Uuid::NAMESPACE_DNS, email.as_bytes())))
    }

    /// The underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl std::fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl std::str::FromStr for IdentityKey {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_email_same_key() {
        let a = IdentityKey::from_email("ada@example.com").unwrap();
        let b = IdentityKey::from_email("ada@example.com").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_identifier_hashed_as_given() {
        let key = IdentityKey::from_email("python.org").unwrap();
        assert_eq!(key.to_string(), "886313e1-3b8a-5372-9b90-0c9aee199e5d");

        let padded = IdentityKey::from_email(" python.org ").unwrap();
        assert_ne!(padded, key);
    }

    #[test]
    fn test_different_emails_differ() {
        let a = IdentityKey::from_email("ada@example.com").unwrap();
        let b = IdentityKey::from_email("grace@example.com").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_key_is_name_based_uuid() {
        let key = IdentityKey::from_email("ada@example.com").unwrap();
        assert_eq!(key.as_uuid().get_version_num(), 5);
    }

    #[test]
    fn test_blank_identity_rejected() {
        assert_eq!(IdentityKey::from_email("   "), Err(ParseError::EmptyIdentity));
    }
}
