//! Configuration and logging foundations
//!
//! This module holds the settings that shape a population run and the
//! tracing setup used by [`crate::init`].

pub mod config;
pub mod logging;

// Re-export commonly used items
pub use config::{Config, LoggingConfig, PopulateSettings};
pub use logging::init_logging;
