//! In-memory document store.
//!
//! Collections are kept per entity type in a `DashMap`, each an ordered map
//! from id to document. Fetches read the references found along a path,
//! load them from the target collection and hand back an owned batch;
//! attaching the batch swaps each reference for its entity in place.
//!
//! Behaviour on attach:
//! - a single reference whose entity is missing (or filtered out) becomes null
//! - missing entities are dropped from reference arrays
//! - sort, skip and limit apply per array, after missing entries are dropped
//! - values that are already populated are never touched, so re-running a
//!   population is a no-op

use std::collections::{BTreeMap, HashMap, HashSet};
use async_trait::async_trait;
use dashmap::DashMap;
use tracing::{debug, trace};
use crate::storage::modifiers::{apply_modifiers, matches, Projection};
use crate::storage::PopulateStore;
use crate::types::{Document, EntityId, EntityType, FetchError, FetchOptions, QueryModifiers, SchemaRegistry, Value};

/// Entities loaded for one path
#[derive(Debug, Clone)]
pub struct MemBatch {
    /// Path the batch attaches at
    pub path: String,
    segments: Vec<String>,
    entities: HashMap<EntityId, Value>,
    modifiers: QueryModifiers,
}

impl MemBatch {
    /// Number of distinct entities loaded
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Whether nothing was loaded
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

/// In-memory store holding one collection per registered type
#[derive(Debug)]
pub struct MemStore {
    schemas: SchemaRegistry,
    collections: DashMap<EntityType, BTreeMap<EntityId, Document>>,
}

impl MemStore {
    /// Create a store with an empty collection for every registered type
    pub fn new(schemas: SchemaRegistry) -> Self {
        let collections = DashMap::new();
        for entity_type in schemas.types() {
            collections.insert(entity_type, BTreeMap::new());
        }
        Self { schemas, collections }
    }

    /// Insert or replace a document in its type's collection
    pub fn insert(&self, document: Document) {
        self.collections
            .entry(document.entity_type.clone())
            .or_default()
            .insert(document.id.clone(), document);
    }

    /// Insert many documents
    pub fn insert_all(&self, documents: impl IntoIterator<Item = Document>) {
        for document in documents {
            self.insert(document);
        }
    }

    /// Copy of a stored document
    pub fn find(&self, entity_type: &str, id: impl Into<EntityId>) -> Option<Document> {
        let id = id.into();
        self.collections.get(entity_type).and_then(|collection| collection.get(&id).cloned())
    }

    /// Copies of every stored document of a type, ordered by id
    pub fn find_all(&self, entity_type: &str) -> Vec<Document> {
        self.collections
            .get(entity_type)
            .map(|collection| collection.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Total number of stored documents
    pub fn document_count(&self) -> usize {
        self.collections.iter().map(|collection| collection.len()).sum()
    }
}

/// Collect unresolved reference ids found at `rest` below `value`.
/// Arrays are transparent at every position.
fn collect_refs(value: &Value, rest: &[String], out: &mut Vec<EntityId>, seen: &mut HashSet<EntityId>) {
    match value {
        Value::Array(items) => {
            for item in items {
                collect_refs(item, rest, out, seen);
            }
        }
        Value::Ref(id) if rest.is_empty() => {
            if seen.insert(id.clone()) {
                out.push(id.clone());
            }
        }
        _ if rest.is_empty() => {}
        Value::Object(_) | Value::Entity(_) => {
            if let Some(child) = value.field(&rest[0]) {
                collect_refs(child, &rest[1..], out, seen);
            }
        }
        _ => {}
    }
}

/// Replace unresolved references at `rest` below `value` with batch entities.
fn attach_value(value: &mut Value, rest: &[String], batch: &MemBatch) {
    if !rest.is_empty() {
        match value {
            Value::Array(items) => {
                for item in items.iter_mut() {
                    attach_value(item, rest, batch);
                }
            }
            Value::Object(_) | Value::Entity(_) => {
                if let Some(child) = value.field_mut(&rest[0]) {
                    attach_value(child, &rest[1..], batch);
                }
            }
            _ => {}
        }
        return;
    }

    match value {
        Value::Ref(id) => {
            let entity = batch.entities.get(id).cloned().unwrap_or(Value::Null);
            *value = entity;
        }
        Value::Array(items) => {
            let had_refs = items.iter().any(|item| matches!(item, Value::Ref(_)));
            let mut populated = Vec::with_capacity(items.len());
            for item in std::mem::take(items) {
                match item {
                    Value::Ref(id) => {
                        if let Some(entity) = batch.entities.get(&id) {
                            populated.push(entity.clone());
                        }
                    }
                    mut nested @ Value::Array(_) => {
                        attach_value(&mut nested, rest, batch);
                        populated.push(nested);
                    }
                    other => populated.push(other),
                }
            }
            if had_refs {
                apply_modifiers(&mut populated, &batch.modifiers);
            }
            *items = populated;
        }
        _ => {}
    }
}

#[async_trait]
impl PopulateStore for MemStore {
    type Document = Document;
    type Batch = MemBatch;

    fn schemas(&self) -> &SchemaRegistry {
        &self.schemas
    }

    async fn fetch(&self, documents: &[Document], options: &FetchOptions) -> Result<MemBatch, FetchError> {
        let segments: Vec<String> = options.segments().map(str::to_string).collect();
        let projection = Projection::parse(options.select.as_deref(), &options.path)?;

        let collection = self.collections.get(&options.model).ok_or_else(|| FetchError::UnknownType {
            path: options.path.clone(),
            entity_type: options.model.clone(),
        })?;

        let mut ids = Vec::new();
        let mut seen = HashSet::new();
        if let Some((head, rest)) = segments.split_first() {
            for document in documents {
                if let Some(value) = document.get(head) {
                    collect_refs(value, rest, &mut ids, &mut seen);
                }
            }
        }

        let mut entities = HashMap::with_capacity(ids.len());
        for id in ids {
            let Some(found) = collection.get(&id) else {
                trace!(path = %options.path, id = %id, "referenced entity not found");
                continue;
            };
            if !matches(found, options.filter.as_ref()) {
                continue;
            }
            let value = if options.lean {
                projection.apply_lean(found.clone())
            } else {
                Value::from(projection.apply(found.clone()))
            };
            entities.insert(id, value);
        }

        debug!(
            path = %options.path,
            model = %options.model,
            loaded = entities.len(),
            lean = options.lean,
            "fetched linked entities"
        );

        Ok(MemBatch {
            path: options.path.clone(),
            segments,
            entities,
            modifiers: options.options.clone(),
        })
    }

    fn attach(&self, documents: &mut [Document], batch: MemBatch) -> Result<(), FetchError> {
        let Some((head, rest)) = batch.segments.split_first() else {
            return Ok(());
        };
        for document in documents.iter_mut() {
            if let Some(value) = document.get_mut(head) {
                attach_value(value, rest, &batch);
            }
        }
        Ok(())
    }
}
