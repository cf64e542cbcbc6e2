//! Error types and handling for deep population
//!
//! This module defines all error types used throughout the crate. Fetch
//! failures raised by a store keep their own enum so they reach the caller
//! unchanged, wrapped in [`Error::Fetch`].

use std::time::Duration;
use thiserror::Error;
use super::ids::EntityType;

/// Main result type used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Boxed error produced by a store backend
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Main error type for deep population
#[derive(Error, Debug)]
pub enum Error {
    /// The calling context cannot supply a store binding, or configuration is invalid
    #[error("Configuration error: {0}")]
    Config(String),

    /// Entry point misuse or missing capability on the root type
    #[error("Usage error: {0}")]
    Usage(String),

    /// A store fetch or attach call failed
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// Configuration file could not be parsed
    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// Prometheus metrics errors
    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),
}

/// Errors raised while fetching or attaching linked entities
#[derive(Error, Debug)]
pub enum FetchError {
    /// The store backend failed
    #[error("store failed on `{path}`: {source}")]
    Backend {
        /// Path being populated
        path: String,
        /// Underlying backend error
        #[source]
        source: BoxError,
    },

    /// The target type has no collection in the store
    #[error("no collection for type {entity_type} (path `{path}`)")]
    UnknownType {
        /// Path being populated
        path: String,
        /// Type the path resolved to
        entity_type: EntityType,
    },

    /// Fetch options could not be applied
    #[error("invalid options for `{path}`: {message}")]
    InvalidOptions {
        /// Path being populated
        path: String,
        /// What was wrong
        message: String,
    },

    /// The fetch did not settle within the configured timeout
    #[error("fetch for `{path}` timed out after {after:?}")]
    TimedOut {
        /// Path being populated
        path: String,
        /// Configured timeout
        after: Duration,
    },

    /// Fetched entities could not be written into the documents
    #[error("attach failed on `{path}`: {message}")]
    Attach {
        /// Path being populated
        path: String,
        /// What was wrong
        message: String,
    },
}

impl FetchError {
    /// Wrap a backend error for the given path
    pub fn backend(path: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::Backend { path: path.into(), source: source.into() }
    }

    /// Path the failing fetch was populating
    pub fn path(&self) -> &str {
        match self {
            FetchError::Backend { path, .. }
            | FetchError::UnknownType { path, .. }
            | FetchError::InvalidOptions { path, .. }
            | FetchError::TimedOut { path, .. }
            | FetchError::Attach { path, .. } => path,
        }
    }
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a usage error
    pub fn usage(msg: impl Into<String>) -> Self {
        Self::Usage(msg.into())
    }

    /// Check if this is a retryable error
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::Fetch(FetchError::TimedOut { .. }) | Error::Fetch(FetchError::Backend { .. })
        )
    }

    /// Check if this is a client error (4xx equivalent)
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Error::Usage(_) | Error::Fetch(FetchError::InvalidOptions { .. })
        )
    }
}
