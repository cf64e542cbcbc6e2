//! Identifier types for entity types and entity instances.
//!
//! Both are string-backed: type names come from schema registration and
//! entity ids come from whatever key the store uses (numeric keys are
//! rendered in decimal).

use std::borrow::Borrow;
use std::fmt;
use serde::{Serialize, Deserialize};

/// Name of a registered entity type (e.g. `"Post"`, `"User"`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityType(String);

impl EntityType {
    /// Create a type name
    pub fn new(name: impl Into<String>) -> Self {
        EntityType(name.into())
    }

    /// Get the type name as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntityType {
    fn from(name: &str) -> Self {
        EntityType(name.to_string())
    }
}

impl From<String> for EntityType {
    fn from(name: String) -> Self {
        EntityType(name)
    }
}

impl From<&EntityType> for EntityType {
    fn from(name: &EntityType) -> Self {
        name.clone()
    }
}

impl Borrow<str> for EntityType {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Primary key of a stored entity.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    /// Create an entity id
    pub fn new(id: impl Into<String>) -> Self {
        EntityId(id.into())
    }

    /// Get the id as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntityId {
    fn from(id: &str) -> Self {
        EntityId(id.to_string())
    }
}

impl From<String> for EntityId {
    fn from(id: String) -> Self {
        EntityId(id)
    }
}

impl From<i64> for EntityId {
    fn from(id: i64) -> Self {
        EntityId(id.to_string())
    }
}

impl From<i32> for EntityId {
    fn from(id: i32) -> Self {
        EntityId(id.to_string())
    }
}

impl From<u64> for EntityId {
    fn from(id: u64) -> Self {
        EntityId(id.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_ids_render_in_decimal() {
        assert_eq!(EntityId::from(42).as_str(), "42");
        assert_eq!(EntityId::from(7_u64), EntityId::from("7"));
    }

    #[test]
    fn type_names_serialize_transparently() {
        let json = serde_json::to_string(&EntityType::from("User")).unwrap();
        assert_eq!(json, "\"User\"");
        let back: EntityType = serde_json::from_str(&json).unwrap();
        assert_eq!(back.as_str(), "User");
    }
}
