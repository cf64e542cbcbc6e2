/// Type definitions for the deep population engine
///
/// This module contains all type definitions organized by category.

/// Identifier types
pub mod ids;
/// Value-related types
pub mod value;
/// Document-related types
pub mod document;
/// System-wide error types
pub mod error;
/// Schema types
pub mod schemas;
/// Population and fetch option types
pub mod options;

// Re-export commonly used types for convenience
pub use ids::{EntityId, EntityType};
pub use value::Value;
pub use document::Document;
pub use error::{Error, FetchError, Result};
pub use schemas::{FieldKind, FieldMeta, SchemaGraph, SchemaRegistry, TypeSchema};
pub use options::{FetchOptions, PathInput, PathOptions, PopulateOptions, QueryModifiers};
