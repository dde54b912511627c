//! Segment-based path matching for route table lookups.
//!
//! The host router owns real path resolution; this matcher only exists so the
//! orchestrator can find the metadata for a path and reason about which routes
//! are neighbours of each other when choosing prefetch candidates.
//!
//! # Pattern syntax
//!
//! - `literal` — must match the path segment exactly
//! - `:name` — captures one segment into [`RouteParams`]
//! - `*` or `*name` — catch-all, captures the rest of the path (possibly empty)
//!
//! Trailing and duplicate slashes are ignored on both sides.

use crate::params::RouteParams;

/// Match `path` against `pattern`, requiring the whole path to be consumed.
///
/// # Examples
///
/// ```
/// use navigation_orchestrator::matching::match_pattern;
///
/// let params = match_pattern("/tasks/:id", "/tasks/42").unwrap();
/// assert_eq!(params.get("id"), Some("42"));
///
/// assert!(match_pattern("/tasks/:id", "/tasks/42/edit").is_none());
/// assert!(match_pattern("/*rest", "/anything/at/all").is_some());
/// ```
pub fn match_pattern(pattern: &str, path: &str) -> Option<RouteParams> {
    let pattern_segments = split_path(pattern);
    let path_segments = split_path(path);

    let mut params = RouteParams::new();

    for (index, segment) in pattern_segments.iter().enumerate() {
        if is_wildcard_segment(segment) {
            let rest = path_segments.get(index..).unwrap_or_default().join("/");
            let name = segment.trim_start_matches('*');
            if !name.is_empty() {
                params.insert(name, rest);
            }
            return Some(params);
        }

        let path_segment = path_segments.get(index)?;
        if let Some(name) = extract_param_name(segment) {
            params.insert(name, *path_segment);
        } else if segment != path_segment {
            return None;
        }
    }

    if pattern_segments.len() == path_segments.len() {
        Some(params)
    } else {
        None
    }
}

/// Split a path into its non-empty segments.
///
/// ```
/// use navigation_orchestrator::matching::split_path;
///
/// assert_eq!(split_path("/admin/users/"), vec!["admin", "users"]);
/// assert!(split_path("/").is_empty());
/// ```
pub fn split_path(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

/// First segment of a path, used to group sibling routes (`/admin/...`).
pub fn first_segment(path: &str) -> Option<&str> {
    path.split('/').find(|s| !s.is_empty())
}

/// Extract the parameter name from a `:name` segment.
pub fn extract_param_name(segment: &str) -> Option<&str> {
    segment.strip_prefix(':')
}

/// Check if a pattern segment is a parameter.
pub fn is_param_segment(segment: &str) -> bool {
    segment.starts_with(':')
}

/// Check if a pattern segment is a catch-all.
pub fn is_wildcard_segment(segment: &str) -> bool {
    segment.starts_with('*')
}

/// `true` if the pattern has no parameter or catch-all segments.
///
/// Only static patterns can be navigated to (and therefore prefetched)
/// without knowing concrete parameter values.
pub fn is_static_pattern(pattern: &str) -> bool {
    split_path(pattern)
        .iter()
        .all(|s| !is_param_segment(s) && !is_wildcard_segment(s))
}
