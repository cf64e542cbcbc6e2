//! Document type definitions
//!
//! A [`Document`] is one stored entity instance: its type, primary key and
//! field map. Root documents handed to the populator and entities attached
//! during population share this representation.

use std::collections::BTreeMap;
use serde::{Serialize, Deserialize};
use super::ids::{EntityId, EntityType};
use super::value::Value;

/// Key used for the primary id when an entity is flattened into a plain object
pub const ID_FIELD: &str = "_id";

/// Stored entity instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Entity type this document belongs to
    #[serde(rename = "type")]
    pub entity_type: EntityType,
    /// Primary key
    pub id: EntityId,
    /// Field values
    pub fields: BTreeMap<String, Value>,
}

impl Document {
    /// Create an empty document
    pub fn new(entity_type: impl Into<EntityType>, id: impl Into<EntityId>) -> Self {
        Self {
            entity_type: entity_type.into(),
            id: id.into(),
            fields: BTreeMap::new(),
        }
    }

    /// Builder-style field assignment
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Get a field value
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Get a mutable field value
    pub fn get_mut(&mut self, name: &str) -> Option<&mut Value> {
        self.fields.get_mut(name)
    }

    /// Walk a dotted path from this document; numeric segments index arrays.
    pub fn lookup(&self, path: &str) -> Option<&Value> {
        let (head, rest) = match path.split_once('.') {
            Some((head, rest)) => (head, Some(rest)),
            None => (path, None),
        };
        let value = self.get(head)?;
        match rest {
            Some(rest) => value.lookup(rest),
            None => Some(value),
        }
    }

    /// Flatten into a plain object carrying the id under `_id` (lean form).
    pub fn into_lean(self) -> Value {
        let mut map = self.fields;
        map.insert(ID_FIELD.to_string(), Value::String(self.id.to_string()));
        Value::Object(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_descends_into_populated_entities() {
        let manager = Document::new("User", 2).with("loaded", true);
        let user = Document::new("User", 1).with("manager", manager);
        let post = Document::new("Post", 1)
            .with("comments", Value::Array(vec![
                Document::new("Comment", 1).with("user", user).into(),
            ]));

        let loaded = post.lookup("comments.0.user.manager.loaded");
        assert_eq!(loaded.and_then(Value::as_bool), Some(true));
        assert!(post.lookup("comments.0.missing").is_none());
        assert!(post.lookup("nothing").is_none());
    }

    #[test]
    fn lean_form_keeps_id() {
        let lean = Document::new("User", 9).with("name", "ada").into_lean();
        assert_eq!(lean.field(ID_FIELD).and_then(Value::as_str), Some("9"));
        assert_eq!(lean.field("name").and_then(Value::as_str), Some("ada"));
    }

    #[test]
    fn serialized_documents_keep_unresolved_references() {
        let doc = Document::new("Post", 1)
            .with("user", Value::reference(7))
            .with("likes", Value::Array(vec![Value::object([("user", Value::reference(8))])]))
            .with("author", Document::new("User", 2).with("loaded", true));

        let json = serde_json::to_string(&doc).unwrap();
        let back: Document = serde_json::from_str(&json).unwrap();
        assert_eq!(back, doc);
        assert!(back.get("user").and_then(Value::as_ref_id).is_some());
        assert!(back.get("author").and_then(Value::as_entity).is_some());
    }
}
