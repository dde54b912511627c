//! Recovery from stale-deployment asset failures.
//!
//! After a new build is deployed, a page loaded from the previous build asks
//! for code-split chunks that no longer exist. The only fix is a full reload.
//! [`ReloadRecoveryPolicy`] recognizes those failures and reloads, but at most
//! once per debounce window: if the failure comes back right after a reload,
//! reloading again would loop forever, so the error is reported as persistent
//! instead.
//!
//! The last reload time lives in session-scoped storage, so it survives the
//! reload itself and is gone when the tab closes.

use crate::clock::Clock;
use crate::config::ReloadConfig;
use crate::error::NavigationError;
use crate::{debug_log, error_log, warn_log};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

/// Message fragments that identify a failed dynamic module or stylesheet load.
pub const STALE_ASSET_PATTERNS: [&str; 3] = [
    "Failed to fetch dynamically imported module",
    "Loading chunk",
    "Loading CSS chunk",
];

/// Error kind reported by bundlers for failed chunk loads.
pub const CHUNK_LOAD_ERROR_KIND: &str = "ChunkLoadError";

/// Shown when reloading did not help.
pub const PERSISTENT_ASSET_MESSAGE: &str =
    "Chunk load error persists after reload. Please clear your browser cache and try again.";

// ============================================================================
// Host collaborators
// ============================================================================

/// Session-scoped string storage (one browser tab).
pub trait SessionStorage: Send + Sync + 'static {
    /// Read a value.
    fn get_item(&self, key: &str) -> Option<String>;

    /// Write a value.
    fn set_item(&self, key: &str, value: &str);
}

/// Performs a full page reload, bypassing the client-side router.
pub trait PageReloader: Send + Sync + 'static {
    /// Reload the page from the server.
    fn reload(&self);
}

/// In-memory [`SessionStorage`] for hosts without a browser.
#[derive(Debug, Default)]
pub struct MemorySessionStorage {
    items: Mutex<HashMap<String, String>>,
}

impl MemorySessionStorage {
    /// Create empty storage.
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStorage for MemorySessionStorage {
    fn get_item(&self, key: &str) -> Option<String> {
        self.items
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn set_item(&self, key: &str, value: &str) {
        self.items
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value.to_string());
    }
}

// ============================================================================
// Classification
// ============================================================================

/// `true` if `error` comes from loading an asset of a stale build.
pub fn is_stale_asset_error(error: &NavigationError) -> bool {
    error.kind() == Some(CHUNK_LOAD_ERROR_KIND)
        || STALE_ASSET_PATTERNS
            .iter()
            .any(|pattern| error.message().contains(pattern))
}

/// What the policy did with an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecoveryOutcome {
    /// A full page reload was requested.
    Reloaded,
    /// A reload already happened within the debounce window; the user must
    /// clear their cache.
    Persistent {
        /// Message suitable for display.
        message: String,
    },
    /// Not a stale-asset error; logged only.
    Ignored,
}

impl RecoveryOutcome {
    /// `true` if a reload was requested.
    pub fn is_reloaded(&self) -> bool {
        matches!(self, Self::Reloaded)
    }

    /// The user-facing message for a persistent failure.
    pub fn user_message(&self) -> Option<&str> {
        match self {
            Self::Persistent { message } => Some(message),
            _ => None,
        }
    }
}

// ============================================================================
// ReloadRecoveryPolicy
// ============================================================================

/// Debounced full-reload policy for stale-asset errors.
pub struct ReloadRecoveryPolicy {
    storage: Arc<dyn SessionStorage>,
    reloader: Arc<dyn PageReloader>,
    clock: Arc<dyn Clock>,
    storage_key: String,
    debounce_window: Duration,
}

impl ReloadRecoveryPolicy {
    /// Create a policy.
    pub fn new(
        config: &ReloadConfig,
        storage: Arc<dyn SessionStorage>,
        reloader: Arc<dyn PageReloader>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            storage,
            reloader,
            clock,
            storage_key: config.storage_key.clone(),
            debounce_window: config.debounce_window(),
        }
    }

    /// The configured debounce window.
    pub fn debounce_window(&self) -> Duration {
        self.debounce_window
    }

    /// Classify `error` and reload if it is a stale-asset error outside the
    /// debounce window.
    pub fn handle_navigation_error(&self, error: &NavigationError) -> RecoveryOutcome {
        if !is_stale_asset_error(error) {
            debug_log!("Navigation error is not a stale asset: {}", error);
            return RecoveryOutcome::Ignored;
        }

        let now = self.clock.now_millis();
        if self.within_window(now) {
            error_log!("{} ({})", PERSISTENT_ASSET_MESSAGE, error);
            return RecoveryOutcome::Persistent {
                message: PERSISTENT_ASSET_MESSAGE.to_string(),
            };
        }

        self.storage.set_item(&self.storage_key, &now.to_string());
        warn_log!(
            "Chunk load error detected, reloading page to fetch latest version: {}",
            error
        );
        self.reloader.reload();
        RecoveryOutcome::Reloaded
    }

    /// `true` if the stored last attempt is no older than the window.
    ///
    /// A missing or unreadable record never suppresses a reload.
    fn within_window(&self, now: i64) -> bool {
        let Some(raw) = self.storage.get_item(&self.storage_key) else {
            return false;
        };
        let Ok(last) = raw.trim().parse::<i64>() else {
            debug_log!("Ignoring unreadable reload record '{}'", raw);
            return false;
        };

        let window = i64::try_from(self.debounce_window.as_millis()).unwrap_or(i64::MAX);
        now.saturating_sub(last) <= window
    }
}

impl std::fmt::Debug for ReloadRecoveryPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReloadRecoveryPolicy")
            .field("storage_key", &self.storage_key)
            .field("debounce_window", &self.debounce_window)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Tests
// ============================================================================
