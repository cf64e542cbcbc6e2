//! Level scheduling.
//!
//! A [`PopulatePlan`] groups the decomposed paths by level and resolves,
//! ahead of time, which of them are fetchable and with which options.
//! [`execute`] then runs the levels in order: every fetch of a level is in
//! flight at once, the level joins, the successful batches are attached and
//! only then does the next level start.

use futures::stream::{self, StreamExt};
use serde::Serialize;
use tracing::{debug, warn};
use crate::core::config::PopulateSettings;
use crate::storage::PopulateStore;
use crate::system::metrics;
use crate::types::{EntityType, FetchError, FetchOptions, Result, SchemaRegistry};
use super::paths::{decompose, level, max_level, restrict};
use super::resolver::ResolvedOptions;
use super::walker::resolve_target;

/// A fetchable path with its resolved options
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlannedFetch {
    /// Type the schema walk resolved for this path
    pub target: EntityType,
    /// Options handed to the store
    pub options: FetchOptions,
}

impl PlannedFetch {
    /// Path this fetch populates
    pub fn path(&self) -> &str {
        &self.options.path
    }
}

/// All paths of one level
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanLevel {
    /// Level number (segment count minus one)
    pub level: usize,
    /// Every path at this level, structural ones included
    pub paths: Vec<String>,
    /// Fetches issued for this level
    pub fetches: Vec<PlannedFetch>,
}

/// Precomputed schedule of one resolution
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PopulatePlan {
    /// Decomposed, whitelisted paths
    pub paths: Vec<String>,
    /// Levels `0..=max_level`, in order
    pub levels: Vec<PlanLevel>,
    /// Whether fetches attach lean objects
    pub lean: bool,
}

impl PopulatePlan {
    /// Decompose, filter and level the resolved paths, then walk the schemas
    /// to find each path's target type.
    pub fn build(registry: &SchemaRegistry, root: &EntityType, resolved: &ResolvedOptions, lean: bool) -> Self {
        let paths = restrict(decompose(&resolved.paths), resolved.whitelist.as_deref());
        let Some(deepest) = max_level(&paths) else {
            return PopulatePlan { paths, levels: Vec::new(), lean };
        };

        let levels = (0..=deepest)
            .map(|current| {
                let at_level: Vec<String> = paths.iter().filter(|p| level(p) == current).cloned().collect();
                let fetches = at_level
                    .iter()
                    .filter_map(|path| {
                        let target = resolve_target(registry, root, path)?;
                        let options = FetchOptions::for_path(path, target.clone(), resolved.populate.get(path), lean);
                        Some(PlannedFetch { target, options })
                    })
                    .collect();
                PlanLevel { level: current, paths: at_level, fetches }
            })
            .collect();

        PopulatePlan { paths, levels, lean }
    }

    /// Whether no path survived normalization and filtering
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Deepest level, `None` for an empty plan
    pub fn max_level(&self) -> Option<usize> {
        self.levels.last().map(|l| l.level)
    }

    /// Total number of fetches across all levels
    pub fn fetch_count(&self) -> usize {
        self.levels.iter().map(|l| l.fetches.len()).sum()
    }

    /// Every fetchable path, in level order
    pub fn fetch_paths(&self) -> Vec<&str> {
        self.levels.iter().flat_map(|l| l.fetches.iter().map(PlannedFetch::path)).collect()
    }
}

/// Run every fetch of one level concurrently, returning results in
/// completion order.
async fn fetch_level<'p, S>(
    store: &S,
    level: &'p PlanLevel,
    documents: &[S::Document],
    settings: &PopulateSettings,
) -> Vec<(&'p PlannedFetch, std::result::Result<S::Batch, FetchError>)>
where
    S: PopulateStore + ?Sized,
{
    let limit = settings.concurrency_limit(level.fetches.len());
    let timeout = settings.fetch_timeout;

    stream::iter(level.fetches.iter())
        .map(|planned| async move {
            metrics::record(|m| m.fetches.inc());
            debug!(level = level.level, path = planned.path(), model = %planned.options.model, "fetch issued");
            let fetch = store.fetch(documents, &planned.options);
            let result = match timeout {
                Some(after) => match tokio::time::timeout(after, fetch).await {
                    Ok(result) => result,
                    Err(_) => Err(FetchError::TimedOut { path: planned.options.path.clone(), after }),
                },
                None => fetch.await,
            };
            (planned, result)
        })
        .buffer_unordered(limit)
        .collect()
        .await
}

/// Execute a plan against `documents`.
///
/// Levels run strictly in order. When any fetch of a level fails, the
/// successful siblings are still attached and the first error observed is
/// returned before the next level is scheduled.
pub async fn execute<S>(
    store: &S,
    plan: &PopulatePlan,
    documents: &mut [S::Document],
    settings: &PopulateSettings,
) -> Result<()>
where
    S: PopulateStore + ?Sized,
{
    for level in &plan.levels {
        if level.fetches.is_empty() {
            debug!(level = level.level, paths = level.paths.len(), "level has only structural paths");
            continue;
        }

        let results = fetch_level(store, level, documents, settings).await;
        metrics::record(|m| m.levels_joined.inc());

        let mut first_error: Option<FetchError> = None;
        for (planned, result) in results {
            let attached = result.and_then(|batch| store.attach(documents, batch));
            if let Err(e) = attached {
                metrics::record(|m| m.fetches_failed.inc());
                warn!(level = level.level, path = planned.path(), error = %e, "fetch failed");
                first_error.get_or_insert(e);
            }
        }

        if let Some(e) = first_error {
            return Err(e.into());
        }
        debug!(level = level.level, fetches = level.fetches.len(), "level joined");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::populate::resolver::resolve;
    use crate::populate::walker::tests::blog_registry;
    use crate::types::{PathOptions, PopulateOptions};

    fn plan(paths: &[&str], options: &PopulateOptions) -> PopulatePlan {
        let paths: Vec<String> = paths.iter().map(|p| p.to_string()).collect();
        let resolved = resolve(&paths, options, None);
        PopulatePlan::build(&blog_registry(), &EntityType::from("Post"), &resolved, resolved.lean.unwrap_or(false))
    }

    #[test]
    fn test_levels_follow_prefix_chains() {
        let plan = plan(&["comments.user.manager"], &PopulateOptions::default());
        assert_eq!(plan.max_level(), Some(2));
        assert_eq!(plan.fetch_paths(), ["comments", "comments.user", "comments.user.manager"]);
        let targets: Vec<&str> = plan.levels.iter().map(|l| l.fetches[0].target.as_str()).collect();
        assert_eq!(targets, ["Comment", "User", "User"]);
    }

    #[test]
    fn test_structural_paths_are_kept_but_not_fetched() {
        let plan = plan(&["likes.user", "approved.user", "invalid1.invalid2"], &PopulateOptions::default());
        assert_eq!(plan.levels[0].paths, ["likes", "approved", "invalid1"]);
        assert!(plan.levels[0].fetches.is_empty());
        assert_eq!(plan.fetch_paths(), ["likes.user", "approved.user"]);
        assert_eq!(plan.fetch_count(), 2);
    }

    #[test]
    fn test_whitelist_limits_the_plan() {
        let options = PopulateOptions::new().whitelist(["comments"]);
        let plan = plan(&["comments.user"], &options);
        assert_eq!(plan.paths, ["comments"]);
        assert_eq!(plan.fetch_paths(), ["comments"]);
    }

    #[test]
    fn test_path_options_and_lean_reach_fetches() {
        let options = PopulateOptions::new()
            .populate("comments", PathOptions::new().select("user").limit(1))
            .lean(true);
        let plan = plan(&["comments"], &options);
        let fetch = &plan.levels[0].fetches[0].options;
        assert!(plan.lean);
        assert!(fetch.lean);
        assert_eq!(fetch.select.as_deref(), Some("user"));
        assert_eq!(fetch.options.limit, Some(1));
    }

    #[test]
    fn test_empty_plan() {
        let plan = plan(&[], &PopulateOptions::default());
        assert!(plan.is_empty());
        assert_eq!(plan.max_level(), None);
        assert_eq!(plan.fetch_count(), 0);
    }

    #[test]
    fn test_plan_serializes_for_inspection() {
        let plan = plan(&["user"], &PopulateOptions::default());
        let json = serde_json::to_value(&plan).unwrap();
        assert_eq!(json["levels"][0]["fetches"][0]["options"]["model"], "User");
    }
}
