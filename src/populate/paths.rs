//! Path normalization, prefix decomposition and levelling.
//!
//! A request for `"a.b.c"` implicitly needs `"a"` and `"a.b"` populated
//! first, because the fetch for `b` runs on what was attached at `a`.
//! Decomposition makes each of those prefixes its own schedulable path.

use std::collections::HashSet;

/// Trim, drop empties and dedup, keeping first occurrences in order.
pub fn normalize<I, S>(paths: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    paths
        .into_iter()
        .filter_map(|path| {
            let path = path.as_ref().trim();
            (!path.is_empty() && seen.insert(path.to_string())).then(|| path.to_string())
        })
        .collect()
}

/// Expand every path into its prefix chain and normalize the result.
///
/// Segments are trimmed and empty segments are skipped, so `"a. b"` and
/// `"a..b"` both decompose to `["a", "a.b"]`.
pub fn decompose<I, S>(paths: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut prefixes = Vec::new();
    for path in paths {
        let mut current = String::new();
        for segment in path.as_ref().split('.').map(str::trim).filter(|s| !s.is_empty()) {
            if !current.is_empty() {
                current.push('.');
            }
            current.push_str(segment);
            prefixes.push(current.clone());
        }
    }
    normalize(prefixes)
}

/// Keep only paths present in the decomposed whitelist. `None` is unrestricted.
pub fn restrict(paths: Vec<String>, whitelist: Option<&[String]>) -> Vec<String> {
    match whitelist {
        None => paths,
        Some(whitelist) => {
            let allowed: HashSet<String> = decompose(whitelist).into_iter().collect();
            paths.into_iter().filter(|path| allowed.contains(path)).collect()
        }
    }
}

/// Level of a path: segment count minus one.
pub fn level(path: &str) -> usize {
    path.split('.').count() - 1
}

/// Deepest level in the set, `None` when there is nothing to fetch.
pub fn max_level<S: AsRef<str>>(paths: &[S]) -> Option<usize> {
    paths.iter().map(|path| level(path.as_ref())).max()
}
