//! Unique identifiers for SandGrains entities.

use serde::{Deserialize, Serialize};
use ulid::Ulid;
use uuid::Uuid;

/// Local identifier of a stored lifespan record.
///
/// Generated once, on insert, and kept across every later update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordId(Ulid);

impl RecordId {
    /// Generate a new RecordId
    pub fn new() -> Self {
        Self(Ulid::new())
    }

    /// The same 128 bits as a UUID, for stores with uuid-typed keys.
    pub fn to_uuid(&self) -> Uuid {
        Uuid::from_u128(u128::from(self.0))
    }

    /// Adopt an id from a uuid-keyed store.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(Ulid::from(uuid.as_u128()))
    }
}

impl Default for RecordId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl std::str::FromStr for RecordId {
    type Err = ulid::DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

/// Identifier of a history entry.
///
/// ULIDs sort by creation time, so entries recorded within one
/// timestamp tick still have a stable order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct HistoryId(Ulid);

impl HistoryId {
    /// Generate a new HistoryId
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for HistoryId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for HistoryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl std::str::FromStr for HistoryId {
    type Err = ulid::DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}
