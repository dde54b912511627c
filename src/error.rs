//! Error types for the navigation orchestrator.
//!
//! None of these errors ever escape a navigation hook. They exist so the
//! collaborators the orchestrator talks to can describe what went wrong:
//!
//! - [`NavigationError`] — a failure the host router reports while resolving a
//!   route (typically a lazily-loaded view module that failed to fetch).
//! - [`SettingsError`] — the public settings fetch failed. Guards treat this as
//!   "settings unknown" and fail closed.
//! - [`LoadError`] — a speculative view-module load failed during prefetch.
//! - [`ConfigError`] — configuration could not be parsed or is invalid.
//!
//! # Examples
//!
//! ```
//! use navigation_orchestrator::error::NavigationError;
//!
//! let err = NavigationError::new("Loading chunk 42 failed.").with_kind("ChunkLoadError");
//! assert_eq!(err.kind(), Some("ChunkLoadError"));
//! assert_eq!(err.to_string(), "ChunkLoadError: Loading chunk 42 failed.");
//! ```

use std::fmt;

// ============================================================================
// NavigationError
// ============================================================================

/// Error reported by the host router while resolving a navigation.
///
/// Mirrors what a script runtime hands to a router error hook: a free-form
/// message plus an optional error kind (the runtime's error class name).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationError {
    message: String,
    kind: Option<String>,
}

impl NavigationError {
    /// Create an error from its message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind: None,
        }
    }

    /// Attach the runtime error kind (e.g. `ChunkLoadError`).
    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }

    /// The error message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The error kind, if the host reported one.
    pub fn kind(&self) -> Option<&str> {
        self.kind.as_deref()
    }
}

impl fmt::Display for NavigationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            Some(kind) => write!(f, "{}: {}", kind, self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for NavigationError {}

// ============================================================================
// SettingsError
// ============================================================================

/// Failure to obtain the public settings.
///
/// `Clone` because one fetch result is shared by every concurrent waiter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingsError {
    /// The request did not complete (network failure, non-2xx status).
    Fetch { message: String },

    /// The response body could not be decoded.
    Decode { message: String },
}

impl SettingsError {
    /// Build a [`SettingsError::Fetch`].
    pub fn fetch(message: impl Into<String>) -> Self {
        Self::Fetch {
            message: message.into(),
        }
    }
}

impl fmt::Display for SettingsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingsError::Fetch { message } => {
                write!(f, "Failed to fetch public settings: {}", message)
            }
            SettingsError::Decode { message } => {
                write!(f, "Invalid public settings payload: {}", message)
            }
        }
    }
}

impl std::error::Error for SettingsError {}

impl From<serde_json::Error> for SettingsError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode {
            message: err.to_string(),
        }
    }
}

// ============================================================================
// LoadError
// ============================================================================

/// A view module could not be loaded ahead of time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadError {
    /// Name of the route whose module failed to load.
    pub route: String,
    /// Loader-provided reason.
    pub message: String,
}

impl LoadError {
    /// Create a load error for `route`.
    pub fn new(route: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            route: route.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Failed to load module for '{}': {}", self.route, self.message)
    }
}

impl std::error::Error for LoadError {}

// ============================================================================
// ConfigError
// ============================================================================

/// Configuration could not be loaded.
#[derive(Debug)]
pub enum ConfigError {
    /// The JSON document was malformed or had the wrong shape.
    Parse(serde_json::Error),

    /// A value was syntactically valid but not usable.
    Invalid { field: &'static str, message: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Parse(err) => write!(f, "Failed to parse configuration: {}", err),
            ConfigError::Invalid { field, message } => {
                write!(f, "Invalid configuration for '{}': {}", field, message)
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Parse(err) => Some(err),
            ConfigError::Invalid { .. } => None,
        }
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        Self::Parse(err)
    }
}

// ============================================================================
// Tests
// ============================================================================
