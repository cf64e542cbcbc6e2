//! Merging of type-level defaults with call-site options, and the rewrite pre-pass.

use std::collections::BTreeMap;
use crate::types::{PathOptions, PopulateOptions};
use super::paths::normalize;

/// Options after merging and rewriting, ready for decomposition
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedOptions {
    /// Requested paths, rewritten and normalized (not yet decomposed)
    pub paths: Vec<String>,
    /// Rewritten whitelist, `None` when unrestricted
    pub whitelist: Option<Vec<String>>,
    /// Per-path options keyed by rewritten path
    pub populate: BTreeMap<String, PathOptions>,
    /// Lean materialization set by the options, `None` when neither layer sets it
    pub lean: Option<bool>,
}

/// Shallow merge: each key of `overrides` that is present replaces the
/// default wholesale. Nested maps are never merged.
pub fn merge(defaults: &PopulateOptions, overrides: Option<&PopulateOptions>) -> PopulateOptions {
    let Some(overrides) = overrides else {
        return defaults.clone();
    };
    PopulateOptions {
        rewrite: overrides.rewrite.clone().or_else(|| defaults.rewrite.clone()),
        whitelist: overrides.whitelist.clone().or_else(|| defaults.whitelist.clone()),
        populate: overrides.populate.clone().or_else(|| defaults.populate.clone()),
        lean: overrides.lean.or(defaults.lean),
    }
}

/// Replace each path found in `rewrite` by its canonical form, then normalize.
pub fn rewrite_paths(paths: &[String], rewrite: &BTreeMap<String, String>) -> Vec<String> {
    normalize(paths.iter().map(|path| rewrite.get(path).unwrap_or(path)))
}

/// Re-key per-path options through `rewrite`. A rewritten entry overwrites
/// an existing entry under the same canonical key.
fn rewrite_keys(
    populate: BTreeMap<String, PathOptions>,
    rewrite: &BTreeMap<String, String>,
) -> BTreeMap<String, PathOptions> {
    let (rewritten, kept): (Vec<_>, Vec<_>) = populate
        .into_iter()
        .partition(|(key, _)| rewrite.get(key).is_some_and(|canonical| canonical != key));

    let mut out: BTreeMap<String, PathOptions> = kept.into_iter().collect();
    for (alias, options) in rewritten {
        if let Some(canonical) = rewrite.get(&alias) {
            out.insert(canonical.clone(), options);
        }
    }
    out
}

/// Merge options and run the rewrite pre-pass exactly once.
pub fn resolve(
    paths: &[String],
    defaults: &PopulateOptions,
    overrides: Option<&PopulateOptions>,
) -> ResolvedOptions {
    let merged = merge(defaults, overrides);
    let populate = merged.populate.unwrap_or_default();
    let lean = merged.lean;

    match merged.rewrite {
        Some(rewrite) => ResolvedOptions {
            paths: rewrite_paths(paths, &rewrite),
            whitelist: merged.whitelist.map(|w| rewrite_paths(&w, &rewrite)),
            populate: rewrite_keys(populate, &rewrite),
            lean,
        },
        None => ResolvedOptions {
            paths: normalize(paths),
            whitelist: merged.whitelist,
            populate,
            lean,
        },
    }
}
