//! Query-chain form: configure once, execute against whatever a query returned.

use crate::storage::PopulateStore;
use crate::types::{Error, PathInput, PopulateOptions, Result};
use super::DeepPopulator;

/// Deferred resolution built up before the documents are available
#[derive(Debug)]
pub struct PopulateQuery<'p, S: PopulateStore> {
    populator: &'p DeepPopulator<S>,
    paths: Option<PathInput>,
    options: Option<PopulateOptions>,
    lean: bool,
}

impl<'p, S: PopulateStore> PopulateQuery<'p, S> {
    pub(crate) fn new(populator: &'p DeepPopulator<S>) -> Self {
        Self {
            populator,
            paths: None,
            options: None,
            lean: false,
        }
    }

    /// Set the paths and options. Configuring a query twice is a usage error.
    pub fn deep_populate(mut self, paths: impl Into<PathInput>, options: Option<PopulateOptions>) -> Result<Self> {
        if self.paths.is_some() {
            return Err(Error::usage("deep_populate can only be called once per query"));
        }
        self.paths = Some(paths.into());
        self.options = options;
        Ok(self)
    }

    /// Attach plain objects instead of entities
    pub fn lean(mut self) -> Self {
        self.lean = true;
        self
    }

    /// Whether `deep_populate` has been called
    pub fn is_configured(&self) -> bool {
        self.paths.is_some()
    }

    /// Run against the query result. `None` (nothing found) passes through,
    /// and an unconfigured query returns the documents unchanged.
    pub async fn exec<'d>(self, documents: Option<&'d mut [S::Document]>) -> Result<Option<&'d mut [S::Document]>> {
        let Some(documents) = documents else {
            return Ok(None);
        };
        let Some(paths) = self.paths else {
            return Ok(Some(documents));
        };
        let populated = self.populator.run(documents, paths, self.options.as_ref(), self.lean).await?;
        Ok(Some(populated))
    }
}
