//! Options accepted by the populator and handed to the store.

use std::collections::BTreeMap;
use serde::{Serialize, Deserialize};
use super::ids::EntityType;
use super::value::Value;

/// Raw path input: a delimited string, an explicit list, or nothing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum PathInput {
    /// No paths requested
    #[default]
    None,
    /// Paths separated by commas and/or whitespace
    Delimited(String),
    /// One path per entry
    List(Vec<String>),
}

impl PathInput {
    /// Split into raw (untrimmed, possibly duplicated) path strings
    pub fn into_raw(self) -> Vec<String> {
        match self {
            PathInput::None => Vec::new(),
            PathInput::Delimited(s) => s
                .split(|c: char| c == ',' || c.is_whitespace())
                .filter(|p| !p.is_empty())
                .map(str::to_string)
                .collect(),
            PathInput::List(paths) => paths,
        }
    }
}

impl From<&str> for PathInput {
    fn from(s: &str) -> Self {
        PathInput::Delimited(s.to_string())
    }
}

impl From<String> for PathInput {
    fn from(s: String) -> Self {
        PathInput::Delimited(s)
    }
}

impl From<Vec<String>> for PathInput {
    fn from(paths: Vec<String>) -> Self {
        PathInput::List(paths)
    }
}

impl From<Vec<&str>> for PathInput {
    fn from(paths: Vec<&str>) -> Self {
        PathInput::List(paths.into_iter().map(str::to_string).collect())
    }
}

impl From<&[&str]> for PathInput {
    fn from(paths: &[&str]) -> Self {
        PathInput::List(paths.iter().map(|p| p.to_string()).collect())
    }
}

impl<const N: usize> From<[&str; N]> for PathInput {
    fn from(paths: [&str; N]) -> Self {
        PathInput::List(paths.iter().map(|p| p.to_string()).collect())
    }
}

impl<T: Into<PathInput>> From<Option<T>> for PathInput {
    fn from(paths: Option<T>) -> Self {
        paths.map(Into::into).unwrap_or_default()
    }
}

/// Store-native query modifiers applied to each populated array
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryModifiers {
    /// Sort key, `"field"` ascending or `"-field"` descending
    pub sort: Option<String>,
    /// Maximum number of entities kept
    pub limit: Option<usize>,
    /// Number of entities skipped before the limit applies
    pub skip: Option<usize>,
}

/// Per-path fetch configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathOptions {
    /// Field projection, e.g. `"name manager"` or `"-manager -_id"`
    pub select: Option<String>,
    /// Field equality filter; entities not matching are treated as missing
    #[serde(rename = "match")]
    pub filter: Option<BTreeMap<String, Value>>,
    /// Target type override, takes precedence over the schema's hint
    pub model: Option<EntityType>,
    /// Sort/limit/skip
    pub options: QueryModifiers,
}

impl PathOptions {
    /// Empty options
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the field projection
    pub fn select(mut self, select: impl Into<String>) -> Self {
        self.select = Some(select.into());
        self
    }

    /// Add a field equality condition
    pub fn matching(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filter.get_or_insert_with(BTreeMap::new).insert(field.into(), value.into());
        self
    }

    /// Override the target type
    pub fn model(mut self, model: impl Into<EntityType>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Set the sort key
    pub fn sort(mut self, sort: impl Into<String>) -> Self {
        self.options.sort = Some(sort.into());
        self
    }

    /// Set the limit
    pub fn limit(mut self, limit: usize) -> Self {
        self.options.limit = Some(limit);
        self
    }

    /// Set the skip count
    pub fn skip(mut self, skip: usize) -> Self {
        self.options.skip = Some(skip);
        self
    }
}

/// Options for one resolution: type-level defaults or call-site overrides.
///
/// Every field is optional so overrides can be merged over defaults key by key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PopulateOptions {
    /// Alias path to canonical path
    pub rewrite: Option<BTreeMap<String, String>>,
    /// Allowed canonical paths; `None` means unrestricted
    pub whitelist: Option<Vec<String>>,
    /// Per-path fetch options
    pub populate: Option<BTreeMap<String, PathOptions>>,
    /// Request lean (plain object) materialization
    pub lean: Option<bool>,
}

impl PopulateOptions {
    /// Empty options
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a rewrite rule
    pub fn rewrite(mut self, alias: impl Into<String>, canonical: impl Into<String>) -> Self {
        self.rewrite.get_or_insert_with(BTreeMap::new).insert(alias.into(), canonical.into());
        self
    }

    /// Set the whitelist
    pub fn whitelist<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.whitelist = Some(paths.into_iter().map(Into::into).collect());
        self
    }

    /// Add per-path options
    pub fn populate(mut self, path: impl Into<String>, options: PathOptions) -> Self {
        self.populate.get_or_insert_with(BTreeMap::new).insert(path.into(), options);
        self
    }

    /// Set lean mode
    pub fn lean(mut self, lean: bool) -> Self {
        self.lean = Some(lean);
        self
    }
}

/// Options for a single fetch-and-attach call
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FetchOptions {
    /// Full dotted path being populated
    pub path: String,
    /// Entity type to load
    pub model: EntityType,
    /// Field projection
    pub select: Option<String>,
    /// Field equality filter
    #[serde(rename = "match")]
    pub filter: Option<BTreeMap<String, Value>>,
    /// Sort/limit/skip
    pub options: QueryModifiers,
    /// Attach plain objects instead of entities
    pub lean: bool,
}

impl FetchOptions {
    /// Merge per-path options with the path and the schema's target type.
    /// An explicit `model` in `path_options` wins over `target`.
    pub fn for_path(path: &str, target: EntityType, path_options: Option<&PathOptions>, lean: bool) -> Self {
        let path_options = path_options.cloned().unwrap_or_default();
        Self {
            path: path.to_string(),
            model: path_options.model.unwrap_or(target),
            select: path_options.select,
            filter: path_options.filter,
            options: path_options.options,
            lean,
        }
    }

    /// Path split into segments
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.path.split('.')
    }
}
