//! Identifier types used for stream partitioning.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::StorageError;

/// Identifies the owner of an event stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(Uuid);

impl UserId {
    /// Creates a fresh user identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for UserId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Identifies one aggregate instance within an owner's stream.
///
/// For positions and alerts this is the ticker symbol; for accounts it is the
/// user id rendered as a string. An aggregate id never changes once the first
/// event for it has been stored.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AggregateId(String);

impl AggregateId {
    /// Creates an aggregate id from any string-like value.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for AggregateId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

impl From<String> for AggregateId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<UserId> for AggregateId {
    fn from(id: UserId) -> Self {
        Self(id.to_string())
    }
}

impl fmt::Display for AggregateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// The entity types whose streams the aggregate store partitions by.
///
/// The string tags are part of the persisted representation and must stay
/// stable across releases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityType {
    /// A stock position owned by a user.
    OwnedStock,
    /// An option position owned by a user.
    OwnedOption,
    /// A crypto holding owned by a user.
    OwnedCrypto,
    /// A user account.
    Account,
    /// A price alert.
    Alert,
}

impl EntityType {
    /// Returns the stable storage tag for this entity type.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OwnedStock => "owned_stock",
            Self::OwnedOption => "owned_option",
            Self::OwnedCrypto => "owned_crypto",
            Self::Account => "account",
            Self::Alert => "alert",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityType {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "owned_stock" => Ok(Self::OwnedStock),
            "owned_option" => Ok(Self::OwnedOption),
            "owned_crypto" => Ok(Self::OwnedCrypto),
            "account" => Ok(Self::Account),
            "alert" => Ok(Self::Alert),
            other => Err(StorageError::Serialization(format!(
                "unknown entity type tag: {other}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_type_tags_round_trip() {
        for entity_type in [
            EntityType::OwnedStock,
            EntityType::OwnedOption,
            EntityType::OwnedCrypto,
            EntityType::Account,
            EntityType::Alert,
        ] {
            let parsed: EntityType = entity_type.as_str().parse().unwrap();
            assert_eq!(parsed, entity_type);
        }
    }

    #[test]
    fn unknown_entity_type_tag_is_a_serialization_error() {
        let result = "OwnedStock".parse::<EntityType>();
        assert!(matches!(result, Err(StorageError::Serialization(_))));
    }

    #[test]
    fn account_aggregate_id_derives_from_user_id() {
        let user_id = UserId::new();
        let aggregate_id = AggregateId::from(user_id);
        assert_eq!(aggregate_id.as_str(), user_id.to_string());
    }
}
