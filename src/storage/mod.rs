//! Storage layer seen by the populator
//!
//! The populator never queries a store directly. It hands each fetchable path
//! to a [`PopulateStore`], which loads the linked entities and writes them
//! into the caller's documents.

use async_trait::async_trait;
use crate::types::{FetchError, FetchOptions, SchemaRegistry};

/// In-memory reference store
pub mod mem_store;

/// Query modifiers (projection, match, sort/limit) used by the in-memory store
pub mod modifiers;

pub use mem_store::{MemBatch, MemStore};

/// Document store collaborator.
///
/// Population of one path is split in two: [`fetch`](PopulateStore::fetch)
/// reads the documents through a shared borrow and may suspend, while
/// [`attach`](PopulateStore::attach) writes the result into the documents
/// after every fetch of the level has settled. Sibling fetches of one level
/// therefore run concurrently without locking the caller's documents.
#[async_trait]
pub trait PopulateStore: Send + Sync {
    /// Root and attached document representation
    type Document: Send + Sync;

    /// Entities loaded for one path, owned until attached
    type Batch: Send;

    /// Schemas of every type this store can load
    fn schemas(&self) -> &SchemaRegistry;

    /// Load the entities referenced at `options.path` from `documents`.
    async fn fetch(&self, documents: &[Self::Document], options: &FetchOptions) -> Result<Self::Batch, FetchError>;

    /// Replace the references at the batch's path with the loaded entities.
    fn attach(&self, documents: &mut [Self::Document], batch: Self::Batch) -> Result<(), FetchError>;
}
