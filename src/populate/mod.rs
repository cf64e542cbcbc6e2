//! Deep population of reference paths.
//!
//! A [`DeepPopulator`] is bound to a store and a root entity type. Each call
//! normalizes the requested paths, merges call-site options over the type's
//! defaults, plans the levels and runs them through the store:
//!
//! ```text
//! paths ──normalize──▶ resolve options ──decompose/whitelist──▶ plan ──execute──▶ documents
//! ```

use std::sync::Arc;
use tracing::{info, warn};
use crate::core::config::PopulateSettings;
use crate::storage::PopulateStore;
use crate::system::metrics::{self, Timer};
use crate::types::{EntityType, Error, PathInput, PopulateOptions, Result};

/// Path normalization, decomposition and levelling
pub mod paths;
/// Option merging and rewriting
pub mod resolver;
/// Schema walk
pub mod walker;
/// Level planning and execution
pub mod scheduler;
/// Query-chain entry point
pub mod query;

pub use query::PopulateQuery;
pub use resolver::ResolvedOptions;
pub use scheduler::{PlanLevel, PlannedFetch, PopulatePlan};

/// Populator for documents of one root type
pub struct DeepPopulator<S: PopulateStore> {
    store: Arc<S>,
    root: EntityType,
    defaults: PopulateOptions,
    settings: PopulateSettings,
}

impl<S: PopulateStore> Clone for DeepPopulator<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            root: self.root.clone(),
            defaults: self.defaults.clone(),
            settings: self.settings.clone(),
        }
    }
}

impl<S: PopulateStore> std::fmt::Debug for DeepPopulator<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeepPopulator")
            .field("root", &self.root)
            .field("defaults", &self.defaults)
            .field("settings", &self.settings)
            .finish()
    }
}

impl<S: PopulateStore> DeepPopulator<S> {
    /// Bind a populator to `root`.
    ///
    /// Fails with a configuration error when the store has no schema for the
    /// type, and with a usage error when deep population is not enabled on it.
    pub fn new(store: Arc<S>, root: impl Into<EntityType>) -> Result<Self> {
        let root = root.into();
        let schemas = store.schemas();
        if !schemas.contains(root.as_str()) {
            return Err(Error::config(format!("no store binding for type {}", root)));
        }
        let defaults = schemas
            .populate_defaults(root.as_str())
            .ok_or_else(|| Error::usage(format!("deep populate is not enabled on type {}", root)))?;

        Ok(Self {
            store,
            root,
            defaults,
            settings: PopulateSettings::default(),
        })
    }

    /// Replace the execution settings
    pub fn with_settings(mut self, settings: PopulateSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Root type this populator is bound to
    pub fn root_type(&self) -> &EntityType {
        &self.root
    }

    /// Type-level default options
    pub fn defaults(&self) -> &PopulateOptions {
        &self.defaults
    }

    /// Execution settings
    pub fn settings(&self) -> &PopulateSettings {
        &self.settings
    }

    /// Underlying store
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Plan a resolution without touching the store.
    pub fn plan(&self, paths: impl Into<PathInput>, options: Option<&PopulateOptions>) -> PopulatePlan {
        self.plan_with(paths.into(), options, false)
    }

    fn plan_with(&self, paths: PathInput, options: Option<&PopulateOptions>, lean: bool) -> PopulatePlan {
        let raw = paths.into_raw();
        let resolved = resolver::resolve(&raw, &self.defaults, options);
        // An explicit `lean` in the options beats the configured default
        let lean = lean || resolved.lean.unwrap_or(self.settings.lean);
        PopulatePlan::build(self.store.schemas(), &self.root, &resolved, lean)
    }

    /// Populate `paths` on every document and hand the same slice back.
    pub async fn populate<'d>(
        &self,
        documents: &'d mut [S::Document],
        paths: impl Into<PathInput>,
        options: Option<&PopulateOptions>,
    ) -> Result<&'d mut [S::Document]> {
        self.run(documents, paths.into(), options, false).await
    }

    /// Populate a single document
    pub async fn populate_one<'d>(
        &self,
        document: &'d mut S::Document,
        paths: impl Into<PathInput>,
        options: Option<&PopulateOptions>,
    ) -> Result<&'d mut S::Document> {
        self.run(std::slice::from_mut(document), paths.into(), options, false).await?;
        Ok(document)
    }

    /// Populate when documents were found; `None` passes through untouched.
    pub async fn populate_opt<'d>(
        &self,
        documents: Option<&'d mut [S::Document]>,
        paths: impl Into<PathInput>,
        options: Option<&PopulateOptions>,
    ) -> Result<Option<&'d mut [S::Document]>> {
        match documents {
            Some(documents) => Ok(Some(self.run(documents, paths.into(), options, false).await?)),
            None => Ok(None),
        }
    }

    /// Start a query-chain resolution
    pub fn query(&self) -> PopulateQuery<'_, S> {
        PopulateQuery::new(self)
    }

    pub(crate) async fn run<'d>(
        &self,
        documents: &'d mut [S::Document],
        paths: PathInput,
        options: Option<&PopulateOptions>,
        lean: bool,
    ) -> Result<&'d mut [S::Document]> {
        if documents.is_empty() {
            return Ok(documents);
        }
        let plan = self.plan_with(paths, options, lean);
        if plan.is_empty() {
            return Ok(documents);
        }

        metrics::record(|m| m.resolutions.inc());
        let timer = metrics::PopulateMetrics::global().map(|m| Timer::start(&m.resolution_duration));

        let outcome = scheduler::execute(self.store.as_ref(), &plan, documents, &self.settings).await;

        if let Some(timer) = timer {
            timer.finish();
        }
        match outcome {
            Ok(()) => {
                info!(
                    root = %self.root,
                    documents = documents.len(),
                    levels = plan.levels.len(),
                    fetches = plan.fetch_count(),
                    lean = plan.lean,
                    "deep populate complete"
                );
                Ok(documents)
            }
            Err(e) => {
                metrics::record(|m| m.resolutions_failed.inc());
                warn!(root = %self.root, error = %e, "deep populate failed");
                Err(e)
            }
        }
    }
}
