//! Deep Populate - level-scheduled population of reference paths
//!
//! Given root documents of one entity type and dotted paths such as
//! `"comments.user.manager"`, the populator replaces every reference along
//! each path with the entity it points to. Paths are expanded into their
//! prefixes, grouped by depth and fetched level by level through a
//! [`PopulateStore`]: all fetches of a level run concurrently, and a level
//! only starts once the previous one has been attached.
#![warn(missing_docs)]

// Foundational modules
pub mod core;
pub mod types;

// Main functional modules
pub mod populate;
pub mod storage;
pub mod system;

// Re-export commonly used items for convenience
pub use crate::core::{Config, LoggingConfig, PopulateSettings};
pub use populate::{DeepPopulator, PopulatePlan, PopulateQuery};
pub use storage::{MemStore, PopulateStore};
pub use types::{
    Document, EntityId, EntityType, Error, FetchError, FetchOptions, FieldMeta, PathInput, PathOptions,
    PopulateOptions, Result, SchemaGraph, SchemaRegistry, TypeSchema, Value,
};

/// Crate version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Load configuration, install tracing and register metrics.
pub fn init() -> Result<Config> {
    let config = Config::load()?;
    crate::core::init_logging(&config.logging)?;

    tracing::info!("Initializing {} v{}", NAME, VERSION);

    system::metrics::init_registry();

    Ok(config)
}
