//! Orchestrator configuration.
//!
//! Every field has a default matching the stock application, so an empty JSON
//! object is a valid configuration:
//!
//! ```
//! use navigation_orchestrator::OrchestratorConfig;
//!
//! let config = OrchestratorConfig::from_json(r#"{ "reload": { "debounce_window_ms": 30000 } }"#).unwrap();
//! assert_eq!(config.paths.login, "/login");
//! assert_eq!(config.reload.debounce_window().as_secs(), 30);
//! ```

use crate::error::ConfigError;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

/// Site name used for page titles when the backend does not provide one.
pub const DEFAULT_SITE_NAME: &str = "DreamStudio";

/// Session storage key holding the last stale-bundle reload time.
pub const DEFAULT_RELOAD_STORAGE_KEY: &str = "chunk_reload_attempted";

/// Minimum interval between two forced reloads.
pub const DEFAULT_RELOAD_DEBOUNCE: Duration = Duration::from_secs(10);

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Fallback site name for page titles.
    pub site_name: String,
    /// Well-known locations the gate redirects to.
    pub paths: GatePaths,
    /// Stale-bundle reload policy.
    pub reload: ReloadConfig,
    /// Idle-time prefetch tuning.
    pub prefetch: PrefetchConfig,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            site_name: DEFAULT_SITE_NAME.to_string(),
            paths: GatePaths::default(),
            reload: ReloadConfig::default(),
            prefetch: PrefetchConfig::default(),
        }
    }
}

impl OrchestratorConfig {
    /// Parse and validate a JSON document.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that would make a component unusable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, path) in [
            ("paths.login", &self.paths.login),
            ("paths.register", &self.paths.register),
            ("paths.user_dashboard", &self.paths.user_dashboard),
            ("paths.admin_dashboard", &self.paths.admin_dashboard),
        ] {
            if !path.starts_with('/') {
                return Err(ConfigError::Invalid {
                    field,
                    message: format!("'{}' must be an absolute path", path),
                });
            }
        }

        if self.reload.storage_key.is_empty() {
            return Err(ConfigError::Invalid {
                field: "reload.storage_key",
                message: "must not be empty".into(),
            });
        }
        if self.prefetch.max_targets == 0 {
            return Err(ConfigError::Invalid {
                field: "prefetch.max_targets",
                message: "must be non-zero".into(),
            });
        }
        if self.prefetch.ledger_capacity == 0 {
            return Err(ConfigError::Invalid {
                field: "prefetch.ledger_capacity",
                message: "must be non-zero".into(),
            });
        }
        Ok(())
    }
}

/// Redirect targets used by the auth gate.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct GatePaths {
    pub login: String,
    pub register: String,
    pub user_dashboard: String,
    pub admin_dashboard: String,
}

impl Default for GatePaths {
    fn default() -> Self {
        Self {
            login: "/login".to_string(),
            register: "/register".to_string(),
            user_dashboard: "/dashboard".to_string(),
            admin_dashboard: "/admin/dashboard".to_string(),
        }
    }
}

impl GatePaths {
    /// Dashboard for a signed-in user.
    pub fn dashboard_for(&self, is_admin: bool) -> &str {
        if is_admin {
            &self.admin_dashboard
        } else {
            &self.user_dashboard
        }
    }

    /// `true` for the login and registration pages.
    pub fn is_auth_page(&self, path: &str) -> bool {
        path == self.login || path == self.register
    }
}

/// Stale-bundle reload settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ReloadConfig {
    /// Session storage key for the last reload timestamp.
    pub storage_key: String,
    /// Reloads closer together than this are suppressed.
    pub debounce_window_ms: u64,
}

impl Default for ReloadConfig {
    fn default() -> Self {
        Self {
            storage_key: DEFAULT_RELOAD_STORAGE_KEY.to_string(),
            debounce_window_ms: u64::try_from(DEFAULT_RELOAD_DEBOUNCE.as_millis())
                .unwrap_or(10_000),
        }
    }
}

impl ReloadConfig {
    /// The debounce window as a [`Duration`].
    pub fn debounce_window(&self) -> Duration {
        Duration::from_millis(self.debounce_window_ms)
    }
}

/// Prefetch settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PrefetchConfig {
    /// Upper bound on routes loaded after one navigation.
    pub max_targets: usize,
    /// How many already-prefetched routes are remembered.
    pub ledger_capacity: usize,
    /// Explicit "likely next" routes, keyed by route name.
    ///
    /// When the current route has an entry, it replaces sibling discovery.
    pub adjacency: HashMap<String, Vec<String>>,
}

impl Default for PrefetchConfig {
    fn default() -> Self {
        Self {
            max_targets: 3,
            ledger_capacity: 64,
            adjacency: HashMap::new(),
        }
    }
}
