//! Per-type schema metadata consulted when walking population paths.
//!
//! Each entity type exposes a [`SchemaGraph`]: a lookup from field name to
//! [`FieldMeta`]. Schemas are composed into a [`SchemaRegistry`] keyed by type
//! name, which also records which types have deep population enabled and with
//! which default options.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use dashmap::DashMap;
use super::error::{Error, Result};
use super::ids::EntityType;
use super::options::PopulateOptions;

/// Field lookup capability implemented per entity type
pub trait SchemaGraph: Send + Sync + fmt::Debug {
    /// Metadata for the named field. Nested structures that are flattened
    /// into the parent schema are looked up by their dotted key
    /// (e.g. `"approved.user"`).
    fn lookup_field(&self, name: &str) -> Option<&FieldMeta>;
}

/// What a field holds
#[derive(Debug, Clone)]
pub enum FieldKind {
    /// Plain data, nothing to walk into
    Scalar,
    /// Reference to an entity of another (or the same) type
    Reference(EntityType),
    /// Embedded structure with its own schema and no identity of its own
    Nested(Arc<dyn SchemaGraph>),
}

/// Field metadata
#[derive(Debug, Clone)]
pub struct FieldMeta {
    /// Field kind, after unwrapping any collection wrapper
    pub kind: FieldKind,
    /// Whether the field is an array of `kind`
    pub collection: bool,
}

impl FieldMeta {
    /// Scalar field
    pub fn scalar() -> Self {
        Self { kind: FieldKind::Scalar, collection: false }
    }

    /// Single reference to `target`
    pub fn reference(target: impl Into<EntityType>) -> Self {
        Self { kind: FieldKind::Reference(target.into()), collection: false }
    }

    /// Embedded structure described by `schema`
    pub fn nested(schema: impl SchemaGraph + 'static) -> Self {
        Self { kind: FieldKind::Nested(Arc::new(schema)), collection: false }
    }

    /// Turn this field into an array of itself
    pub fn many(mut self) -> Self {
        self.collection = true;
        self
    }

    /// Whether the field references another entity
    pub fn is_reference(&self) -> bool {
        matches!(self.kind, FieldKind::Reference(_))
    }

    /// Referenced type, if any
    pub fn referenced_type(&self) -> Option<&EntityType> {
        match &self.kind {
            FieldKind::Reference(target) => Some(target),
            _ => None,
        }
    }

    /// Schema of an embedded structure, if any
    pub fn nested_schema(&self) -> Option<&Arc<dyn SchemaGraph>> {
        match &self.kind {
            FieldKind::Nested(schema) => Some(schema),
            _ => None,
        }
    }
}

/// Map-backed schema for one entity type or embedded structure
#[derive(Debug, Clone, Default)]
pub struct TypeSchema {
    fields: BTreeMap<String, FieldMeta>,
}

impl TypeSchema {
    /// Empty schema
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style field declaration
    pub fn field(mut self, name: impl Into<String>, meta: FieldMeta) -> Self {
        self.fields.insert(name.into(), meta);
        self
    }

    /// Declare a field
    pub fn insert(&mut self, name: impl Into<String>, meta: FieldMeta) {
        self.fields.insert(name.into(), meta);
    }

    /// Number of declared fields
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether no fields are declared
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl SchemaGraph for TypeSchema {
    fn lookup_field(&self, name: &str) -> Option<&FieldMeta> {
        self.fields.get(name)
    }
}

/// Registry of entity type schemas
#[derive(Default)]
pub struct SchemaRegistry {
    /// Schema per registered type
    schemas: DashMap<EntityType, Arc<dyn SchemaGraph>>,
    /// Default options per type with deep population enabled
    populate_defaults: DashMap<EntityType, PopulateOptions>,
}

impl SchemaRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style registration
    pub fn with(self, entity_type: impl Into<EntityType>, schema: impl SchemaGraph + 'static) -> Self {
        self.register(entity_type, schema);
        self
    }

    /// Register (or replace) the schema for a type
    pub fn register(&self, entity_type: impl Into<EntityType>, schema: impl SchemaGraph + 'static) {
        self.schemas.insert(entity_type.into(), Arc::new(schema));
    }

    /// Schema for a type
    pub fn get(&self, entity_type: &str) -> Option<Arc<dyn SchemaGraph>> {
        self.schemas.get(entity_type).map(|entry| Arc::clone(entry.value()))
    }

    /// Whether a type is registered
    pub fn contains(&self, entity_type: &str) -> bool {
        self.schemas.contains_key(entity_type)
    }

    /// Registered type names, sorted
    pub fn types(&self) -> Vec<EntityType> {
        let mut types: Vec<EntityType> = self.schemas.iter().map(|entry| entry.key().clone()).collect();
        types.sort();
        types
    }

    /// Enable deep population on a registered type with its default options.
    /// Enabling again replaces the defaults.
    pub fn enable_deep_populate(&self, entity_type: impl Into<EntityType>, defaults: PopulateOptions) -> Result<()> {
        let entity_type = entity_type.into();
        if !self.contains(entity_type.as_str()) {
            return Err(Error::config(format!(
                "cannot enable deep populate on unregistered type {}",
                entity_type
            )));
        }
        tracing::debug!(entity_type = %entity_type, "deep populate enabled");
        self.populate_defaults.insert(entity_type, defaults);
        Ok(())
    }

    /// Whether deep population is enabled on a type
    pub fn is_populate_enabled(&self, entity_type: &str) -> bool {
        self.populate_defaults.contains_key(entity_type)
    }

    /// Default options of a type with deep population enabled
    pub fn populate_defaults(&self, entity_type: &str) -> Option<PopulateOptions> {
        self.populate_defaults.get(entity_type).map(|entry| entry.value().clone())
    }
}

impl fmt::Debug for SchemaRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaRegistry")
            .field("types", &self.types())
            .field("populate_enabled", &self.populate_defaults.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_meta_accessors() {
        let refs = FieldMeta::reference("Comment").many();
        assert!(refs.is_reference());
        assert!(refs.collection);
        assert_eq!(refs.referenced_type().map(EntityType::as_str), Some("Comment"));
        assert!(refs.nested_schema().is_none());

        let nested = FieldMeta::nested(TypeSchema::new().field("user", FieldMeta::reference("User")));
        assert!(!nested.is_reference());
        let inner = nested.nested_schema().unwrap();
        assert!(inner.lookup_field("user").unwrap().is_reference());
    }

    #[test]
    fn enabling_requires_registration() {
        let registry = SchemaRegistry::new().with("Post", TypeSchema::new());
        assert!(!registry.is_populate_enabled("Post"));

        registry.enable_deep_populate("Post", PopulateOptions::default()).unwrap();
        assert!(registry.is_populate_enabled("Post"));
        assert!(registry.populate_defaults("Post").is_some());

        let err = registry.enable_deep_populate("Ghost", PopulateOptions::default()).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn types_are_sorted() {
        let registry = SchemaRegistry::new()
            .with("User", TypeSchema::new())
            .with("Comment", TypeSchema::new());
        let names: Vec<_> = registry.types().iter().map(|t| t.as_str().to_string()).collect();
        assert_eq!(names, ["Comment", "User"]);
    }
}
