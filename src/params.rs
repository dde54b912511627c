//! Path parameters and query strings.
//!
//! - [`RouteParams`] — values captured from dynamic segments (`:id` in
//!   `/tasks/:id`) when a path is resolved against the route table.
//! - [`QueryParams`] — the ordered `?key=value&...` portion of a location.
//!   Redirect decisions carry one (e.g. `redirect=/dashboard` on the way to
//!   the login page), so ordering is preserved and rendering is stable.
//!
//! # Example
//!
//! ```
//! use navigation_orchestrator::QueryParams;
//!
//! let mut query = QueryParams::new();
//! query.insert("redirect", "/admin/users?page=2");
//! assert_eq!(query.to_query_string(), "redirect=/admin/users%3Fpage%3D2");
//!
//! let parsed = QueryParams::from_query_string("redirect=%2Fdashboard&tab=keys");
//! assert_eq!(parsed.get("redirect"), Some("/dashboard"));
//! ```

use std::collections::HashMap;

/// Parameters captured from dynamic path segments.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RouteParams {
    params: HashMap<String, String>,
}

impl RouteParams {
    /// Create empty route parameters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a parameter value by key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// Get a parameter and parse it as `T`.
    ///
    /// Returns `None` if the parameter is missing or fails to parse.
    pub fn get_as<T>(&self, key: &str) -> Option<T>
    where
        T: std::str::FromStr,
    {
        self.params.get(key)?.parse().ok()
    }

    /// Insert or overwrite a parameter.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.params.insert(key.into(), value.into());
    }

    /// Iterate over all `(key, value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.params.iter()
    }

    /// Return `true` if there are no parameters.
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Return the number of parameters.
    pub fn len(&self) -> usize {
        self.params.len()
    }
}

/// Ordered query string parameters.
///
/// Keys may repeat (`?tag=a&tag=b`); insertion order is kept so that a
/// rendered location is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    pairs: Vec<(String, String)>,
}

impl QueryParams {
    /// Create an empty query.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a query string (without the leading `?`).
    ///
    /// Pairs without `=` are kept with an empty value. Percent escapes and
    /// `+` are decoded.
    pub fn from_query_string(query: &str) -> Self {
        let pairs = query
            .trim_start_matches('?')
            .split('&')
            .filter(|pair| !pair.is_empty())
            .map(|pair| match pair.split_once('=') {
                Some((key, value)) => (decode_component(key), decode_component(value)),
                None => (decode_component(pair), String::new()),
            })
            .collect();

        Self { pairs }
    }

    /// First value for `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// All values for `key`, in insertion order.
    pub fn get_all(&self, key: &str) -> Vec<&str> {
        self.pairs
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
            .collect()
    }

    /// Append a pair. Existing values for the same key are kept.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.pairs.push((key.into(), value.into()));
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    /// Return `true` if `key` is present.
    pub fn contains(&self, key: &str) -> bool {
        self.pairs.iter().any(|(k, _)| k == key)
    }

    /// Render as `key=value&...` without a leading `?`.
    pub fn to_query_string(&self) -> String {
        self.pairs
            .iter()
            .map(|(key, value)| format!("{}={}", encode_component(key), encode_component(value)))
            .collect::<Vec<_>>()
            .join("&")
    }

    /// Return `true` if there are no pairs.
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Number of pairs (repeated keys count once per value).
    pub fn len(&self) -> usize {
        self.pairs.len()
    }
}

/// Split `full_path` into its path and query parts.
///
/// A `#fragment` is dropped.
///
/// ```
/// use navigation_orchestrator::params::split_location;
///
/// assert_eq!(split_location("/login?redirect=/x#top"), ("/login", "redirect=/x"));
/// assert_eq!(split_location("/home"), ("/home", ""));
/// ```
pub fn split_location(full_path: &str) -> (&str, &str) {
    let without_fragment = full_path.split('#').next().unwrap_or(full_path);
    without_fragment
        .split_once('?')
        .unwrap_or((without_fragment, ""))
}

/// Percent-encode a query key or value.
///
/// Path-like characters (`/`, `:`, `@`, `,`) stay readable, matching what
/// browsers show for a `redirect=` parameter. Everything that would change
/// the query structure is escaped, byte by byte over the UTF-8 encoding.
fn encode_component(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for byte in s.bytes() {
        match byte {
            b'A'..=b'Z'
            | b'a'..=b'z'
            | b'0'..=b'9'
            | b'-'
            | b'_'
            | b'.'
            | b'~'
            | b'/'
            | b':'
            | b'@'
            | b','
            | b'!'
            | b'*'
            | b'('
            | b')'
            | b'\'' => out.push(char::from(byte)),
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    out
}

/// Decode percent escapes and `+` in a query component.
///
/// Malformed escapes are kept verbatim; invalid UTF-8 is replaced lossily.
fn decode_component(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'%' if i + 2 < bytes.len() => {
                let hex = std::str::from_utf8(&bytes[i + 1..i + 3]).ok();
                match hex.and_then(|h| u8::from_str_radix(h, 16).ok()) {
                    Some(byte) => {
                        out.push(byte);
                        i += 3;
                    }
                    None => {
                        out.push(b'%');
                        i += 1;
                    }
                }
            }
            b'+' => {
                out.push(b' ');
                i += 1;
            }
            other => {
                out.push(other);
                i += 1;
            }
        }
    }

    String::from_utf8_lossy(&out).into_owned()
}

// ============================================================================
// Tests
// ============================================================================
