//! Field values stored in documents.
//!
//! A reference starts life as [`Value::Ref`] holding the linked entity's id and
//! is replaced in place by the fetched entity once populated: either a full
//! [`Value::Entity`] or, in lean mode, a plain [`Value::Object`].
//!
//! Plain values serialize as their natural JSON/TOML form. References and
//! entities are wrapped as `{"$ref": id}` and `{"$entity": document}` so
//! they read back as the same variant.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use serde::{Serialize, Deserialize};
use super::document::Document;
use super::ids::EntityId;

/// Dynamically typed field value
///
/// Variant order matters for deserialization: the wrapped forms are tried
/// before [`Value::Object`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Absent or explicitly nulled value
    Null,
    /// Boolean
    Bool(bool),
    /// Signed integer
    Int(i64),
    /// Floating point number
    Float(f64),
    /// UTF-8 string
    String(String),
    /// Ordered list of values
    Array(Vec<Value>),
    /// Unresolved reference to another entity
    Ref(#[serde(with = "ref_form")] EntityId),
    /// Populated entity instance
    Entity(#[serde(with = "entity_form")] Box<Document>),
    /// Plain nested structure, also used for lean-populated entities
    Object(BTreeMap<String, Value>),
}

/// `{"$ref": id}`
mod ref_form {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use super::EntityId;

    #[derive(Serialize, Deserialize)]
    #[serde(deny_unknown_fields)]
    struct Wire<T> {
        #[serde(rename = "$ref")]
        id: T,
    }

    pub fn serialize<S: Serializer>(id: &EntityId, serializer: S) -> Result<S::Ok, S::Error> {
        Wire { id }.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<EntityId, D::Error> {
        Wire::<EntityId>::deserialize(deserializer).map(|wire| wire.id)
    }
}

/// `{"$entity": document}`
mod entity_form {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use super::Document;

    #[derive(Serialize, Deserialize)]
    #[serde(deny_unknown_fields)]
    struct Wire<T> {
        #[serde(rename = "$entity")]
        document: T,
    }

    pub fn serialize<S: Serializer>(document: &Document, serializer: S) -> Result<S::Ok, S::Error> {
        Wire { document }.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Box<Document>, D::Error> {
        Wire::<Box<Document>>::deserialize(deserializer).map(|wire| wire.document)
    }
}

impl Value {
    /// Unresolved reference to the entity with the given id
    pub fn reference(id: impl Into<EntityId>) -> Self {
        Value::Ref(id.into())
    }

    /// Array of unresolved references
    pub fn references<I, T>(ids: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<EntityId>,
    {
        Value::Array(ids.into_iter().map(|id| Value::Ref(id.into())).collect())
    }

    /// Build a plain object from key/value pairs
    pub fn object<I, K>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        Value::Object(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Look up a named field on an object or populated entity
    pub fn field(&self, name: &str) -> Option<&Value> {
        match self {
            Value::Object(map) => map.get(name),
            Value::Entity(doc) => doc.get(name),
            _ => None,
        }
    }

    /// Mutable variant of [`Value::field`]
    pub fn field_mut(&mut self, name: &str) -> Option<&mut Value> {
        match self {
            Value::Object(map) => map.get_mut(name),
            Value::Entity(doc) => doc.get_mut(name),
            _ => None,
        }
    }

    /// Walk a dotted path; numeric segments index into arrays.
    pub fn lookup(&self, path: &str) -> Option<&Value> {
        path.split('.').try_fold(self, |current, segment| match current {
            Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            other => other.field(segment),
        })
    }

    /// Populated entity, if this value holds one
    pub fn as_entity(&self) -> Option<&Document> {
        match self {
            Value::Entity(doc) => Some(doc),
            _ => None,
        }
    }

    /// Array items, if this value is an array
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Object entries, if this value is a plain object
    pub fn as_object(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Object(map) => Some(map),
            _ => None,
        }
    }

    /// Id of an unresolved reference
    pub fn as_ref_id(&self) -> Option<&EntityId> {
        match self {
            Value::Ref(id) => Some(id),
            _ => None,
        }
    }

    /// String contents
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Integer contents
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Boolean contents
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Whether the value is null
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Ordering used by sort modifiers. Numbers compare numerically across
    /// int/float, null sorts first, mismatched kinds compare equal.
    pub fn sort_cmp(&self, other: &Value) -> Ordering {
        match (self, other) {
            (Value::Null, Value::Null) => Ordering::Equal,
            (Value::Null, _) => Ordering::Less,
            (_, Value::Null) => Ordering::Greater,
            (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
            (Value::Int(a), Value::Int(b)) => a.cmp(b),
            (Value::Int(a), Value::Float(b)) => (*a as f64).partial_cmp(b).unwrap_or(Ordering::Equal),
            (Value::Float(a), Value::Int(b)) => a.partial_cmp(&(*b as f64)).unwrap_or(Ordering::Equal),
            (Value::Float(a), Value::Float(b)) => a.partial_cmp(b).unwrap_or(Ordering::Equal),
            (Value::String(a), Value::String(b)) => a.cmp(b),
            (Value::Ref(a), Value::Ref(b)) => a.cmp(b),
            _ => Ordering::Equal,
        }
    }
}

impl Default for Value {
    fn default() -> Self {
        Value::Null
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Array(items)
    }
}

impl From<Document> for Value {
    fn from(doc: Document) -> Self {
        Value::Entity(Box::new(doc))
    }
}
