//! Process-wide memoized fetch of the public site settings.
//!
//! [`SettingsCache`] holds a single slot that moves through three states:
//!
//! ```text
//! Empty ──first get──▶ InFlight(shared future) ──ok──▶ Ready(entry)
//!   ▲                        │
//!   └───────────err──────────┘
//! ```
//!
//! Every caller that arrives while the slot is `InFlight` awaits the same
//! [`Shared`] future, so N concurrent guard evaluations cost exactly one
//! request. A failed fetch is handed to every waiter and the slot is emptied
//! so a later navigation can try again. A successful value is kept for the
//! life of the process; there is no invalidation path.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use navigation_orchestrator::{PublicSettings, SettingsCache, StaticSettings};
//!
//! let provider = StaticSettings::new(PublicSettings {
//!     user_custom_key_enabled: true,
//!     ..PublicSettings::default()
//! });
//! let cache = SettingsCache::new(Arc::new(provider));
//!
//! let settings = pollster::block_on(cache.get_public_settings()).unwrap();
//! assert!(settings.user_custom_key_enabled);
//! assert!(cache.cached().is_some());
//! ```

use crate::clock::{Clock, SystemClock};
use crate::error::SettingsError;
use crate::{debug_log, trace_log};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::future::{BoxFuture, FutureExt, Shared};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

// ============================================================================
// PublicSettings
// ============================================================================

/// Site configuration exposed to anonymous clients.
///
/// Field names follow the backend's JSON contract. Unknown fields are
/// ignored and missing fields take their default.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PublicSettings {
    pub registration_enabled: bool,
    pub email_verify_enabled: bool,
    pub promo_code_enabled: bool,
    pub turnstile_enabled: bool,
    pub turnstile_site_key: String,
    pub site_name: String,
    pub site_logo: String,
    pub site_subtitle: String,
    pub api_base_url: String,
    pub contact_info: String,
    pub doc_url: String,
    pub home_content: String,
    pub hide_ccs_import_button: bool,
    /// Users may bring their own API key (gates the user API settings page).
    pub user_custom_key_enabled: bool,
    #[serde(rename = "linuxdo_oauth_enabled")]
    pub linux_do_oauth_enabled: bool,
    pub version: String,
}

impl PublicSettings {
    /// Decode the backend's JSON payload.
    pub fn from_json(body: &str) -> Result<Self, SettingsError> {
        Ok(serde_json::from_str(body)?)
    }

    /// The configured site name, if the backend set one.
    pub fn site_name(&self) -> Option<&str> {
        let name = self.site_name.trim();
        (!name.is_empty()).then_some(name)
    }
}

// ============================================================================
// SettingsProvider
// ============================================================================

/// Source of truth for [`PublicSettings`] (normally an HTTP endpoint).
#[async_trait]
pub trait SettingsProvider: Send + Sync + 'static {
    /// Fetch the current public settings.
    async fn fetch_public_settings(&self) -> Result<PublicSettings, SettingsError>;
}

/// Provider that always returns the same value.
///
/// Useful for hosts that embed the settings in the initial page payload.
#[derive(Debug, Clone)]
pub struct StaticSettings {
    settings: PublicSettings,
}

impl StaticSettings {
    /// Serve `settings` on every fetch.
    pub fn new(settings: PublicSettings) -> Self {
        Self { settings }
    }
}

#[async_trait]
impl SettingsProvider for StaticSettings {
    async fn fetch_public_settings(&self) -> Result<PublicSettings, SettingsError> {
        Ok(self.settings.clone())
    }
}

// ============================================================================
// SettingsCache
// ============================================================================

type SettingsFuture = Shared<BoxFuture<'static, Result<PublicSettings, SettingsError>>>;

/// A resolved settings value and when it was fetched.
#[derive(Debug, Clone, PartialEq)]
pub struct PublicSettingsCacheEntry {
    pub value: PublicSettings,
    pub fetched_at: DateTime<Utc>,
}

enum CacheSlot {
    Empty,
    InFlight(SettingsFuture),
    Ready(PublicSettingsCacheEntry),
}

/// Single-slot, fetch-once cache of [`PublicSettings`].
///
/// Create one per process and share it behind an `Arc`.
pub struct SettingsCache {
    provider: Arc<dyn SettingsProvider>,
    clock: Arc<dyn Clock>,
    slot: Mutex<CacheSlot>,
}

impl SettingsCache {
    /// Create an empty cache in front of `provider`.
    pub fn new(provider: Arc<dyn SettingsProvider>) -> Self {
        Self::with_clock(provider, Arc::new(SystemClock))
    }

    /// Create an empty cache that timestamps entries with `clock`.
    pub fn with_clock(provider: Arc<dyn SettingsProvider>, clock: Arc<dyn Clock>) -> Self {
        Self {
            provider,
            clock,
            slot: Mutex::new(CacheSlot::Empty),
        }
    }

    /// Return the settings, fetching them on first use.
    ///
    /// Callers that arrive while a fetch is running share its result. On
    /// error the caller should fall back to its own default.
    pub async fn get_public_settings(&self) -> Result<PublicSettings, SettingsError> {
        let pending = {
            let mut slot = self.lock_slot();
            match &*slot {
                CacheSlot::Ready(entry) => {
                    trace_log!("Public settings served from cache");
                    return Ok(entry.value.clone());
                }
                CacheSlot::InFlight(pending) => {
                    trace_log!("Joining in-flight public settings fetch");
                    pending.clone()
                }
                CacheSlot::Empty => {
                    debug_log!("Fetching public settings");
                    let provider = Arc::clone(&self.provider);
                    let pending = async move { provider.fetch_public_settings().await }
                        .boxed()
                        .shared();
                    *slot = CacheSlot::InFlight(pending.clone());
                    pending
                }
            }
        };

        let result = pending.clone().await;
        self.settle(&pending, &result);
        result
    }

    /// The resolved value, without waiting or fetching.
    pub fn cached(&self) -> Option<PublicSettings> {
        self.entry().map(|entry| entry.value)
    }

    /// The resolved entry including its fetch time.
    pub fn entry(&self) -> Option<PublicSettingsCacheEntry> {
        match &*self.lock_slot() {
            CacheSlot::Ready(entry) => Some(entry.clone()),
            _ => None,
        }
    }

    /// Pre-warm the cache with a value obtained elsewhere.
    ///
    /// Ignored once a value is already cached. An in-flight fetch is
    /// superseded; its waiters still receive their own result.
    pub fn prime(&self, value: PublicSettings) {
        let mut slot = self.lock_slot();
        if matches!(*slot, CacheSlot::Ready(_)) {
            return;
        }
        *slot = CacheSlot::Ready(PublicSettingsCacheEntry {
            value,
            fetched_at: self.clock.now(),
        });
    }

    /// Whether a fetch is currently running.
    pub fn is_fetching(&self) -> bool {
        matches!(*self.lock_slot(), CacheSlot::InFlight(_))
    }

    /// Move the slot out of `InFlight` once `pending` has resolved.
    ///
    /// Only the future that is still installed may change the slot; a stale
    /// waiter must not overwrite a newer fetch or a primed value.
    fn settle(
        &self,
        pending: &SettingsFuture,
        result: &Result<PublicSettings, SettingsError>,
    ) {
        let mut slot = self.lock_slot();
        let installed = matches!(&*slot, CacheSlot::InFlight(current) if current.ptr_eq(pending));
        if !installed {
            return;
        }

        *slot = match result {
            Ok(value) => CacheSlot::Ready(PublicSettingsCacheEntry {
                value: value.clone(),
                fetched_at: self.clock.now(),
            }),
            Err(err) => {
                debug_log!("Public settings fetch failed; slot cleared: {}", err);
                CacheSlot::Empty
            }
        };
    }

    fn lock_slot(&self) -> MutexGuard<'_, CacheSlot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for SettingsCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = match &*self.lock_slot() {
            CacheSlot::Empty => "empty",
            CacheSlot::InFlight(_) => "in-flight",
            CacheSlot::Ready(_) => "ready",
        };
        f.debug_struct("SettingsCache")
            .field("state", &state)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingProvider {
        calls: AtomicUsize,
        fail_first: bool,
    }

    impl CountingProvider {
        fn new(fail_first: bool) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail_first,
            }
        }
    }

    #[async_trait]
    impl SettingsProvider for CountingProvider {
        async fn fetch_public_settings(&self) -> Result<PublicSettings, SettingsError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::task::yield_now().await;
            if self.fail_first && call == 0 {
                return Err(SettingsError::fetch("connection reset"));
            }
            Ok(PublicSettings {
                site_name: "Studio".into(),
                user_custom_key_enabled: true,
                ..PublicSettings::default()
            })
        }
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_one_fetch() {
        let provider = Arc::new(CountingProvider::new(false));
        let cache = SettingsCache::new(provider.clone());

        let results = futures::future::join_all((0..8).map(|_| cache.get_public_settings())).await;

        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
        assert!(results.iter().all(|r| r.as_ref().unwrap().user_custom_key_enabled));
        assert!(!cache.is_fetching());
    }

    #[tokio::test]
    async fn test_resolved_value_is_reused() {
        let provider = Arc::new(CountingProvider::new(false));
        let cache = SettingsCache::new(provider.clone());

        cache.get_public_settings().await.unwrap();
        cache.get_public_settings().await.unwrap();

        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.cached().unwrap().site_name(), Some("Studio"));
        assert!(cache.entry().is_some());
    }

    #[tokio::test]
    async fn test_error_reaches_all_waiters_then_retries() {
        let provider = Arc::new(CountingProvider::new(true));
        let cache = SettingsCache::new(provider.clone());

        let (a, b) = futures::join!(cache.get_public_settings(), cache.get_public_settings());
        assert!(a.is_err());
        assert!(b.is_err());
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
        assert!(cache.cached().is_none());

        let retried = cache.get_public_settings().await;
        assert!(retried.is_ok());
        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
    }

    #[cfg(feature = "log")]
    #[tokio::test]
    async fn test_failed_fetch_is_not_logged_as_error_by_cache() {
        use std::sync::OnceLock;

        struct Capture(Mutex<Vec<(log::Level, String)>>);

        impl log::Log for Capture {
            fn enabled(&self, _: &log::Metadata<'_>) -> bool {
                true
            }
            fn log(&self, record: &log::Record<'_>) {
                if record.target() == module_path!() {
                    self.0
                        .lock()
                        .unwrap()
                        .push((record.level(), record.args().to_string()));
                }
            }
            fn flush(&self) {}
        }

        static CAPTURE: OnceLock<Capture> = OnceLock::new();
        let capture = CAPTURE.get_or_init(|| Capture(Mutex::new(Vec::new())));
        if log::set_logger(capture).is_err() {
            // Another logger owns this process; nothing to observe.
            return;
        }
        log::set_max_level(log::LevelFilter::Trace);

        let cache = SettingsCache::new(Arc::new(CountingProvider::new(true)));
        assert!(cache.get_public_settings().await.is_err());

        let records = capture.0.lock().unwrap().clone();
        assert!(records.iter().all(|(level, _)| *level > log::Level::Warn));
        assert!(records
            .iter()
            .any(|(level, message)| *level == log::Level::Debug && message.contains("connection reset")));
    }

    #[test]
    fn test_prime_skips_the_network() {
        let provider = Arc::new(CountingProvider::new(false));
        let cache = SettingsCache::new(provider.clone());

        cache.prime(PublicSettings {
            user_custom_key_enabled: false,
            ..PublicSettings::default()
        });

        let value = pollster::block_on(cache.get_public_settings()).unwrap();
        assert!(!value.user_custom_key_enabled);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_prime_does_not_replace_ready_value() {
        let cache = SettingsCache::new(Arc::new(StaticSettings::new(PublicSettings::default())));
        cache.prime(PublicSettings {
            site_name: "First".into(),
            ..PublicSettings::default()
        });
        cache.prime(PublicSettings {
            site_name: "Second".into(),
            ..PublicSettings::default()
        });
        assert_eq!(cache.cached().unwrap().site_name, "First");
    }

    #[test]
    fn test_public_settings_from_json() {
        let body = r#"{
            "site_name": "DreamStudio",
            "user_custom_key_enabled": true,
            "linuxdo_oauth_enabled": true,
            "unknown_field": 1
        }"#;
        let settings = PublicSettings::from_json(body).unwrap();
        assert_eq!(settings.site_name(), Some("DreamStudio"));
        assert!(settings.user_custom_key_enabled);
        assert!(settings.linux_do_oauth_enabled);
        assert!(!settings.registration_enabled);
    }

    #[test]
    fn test_blank_site_name_is_none() {
        let settings = PublicSettings {
            site_name: "   ".into(),
            ..PublicSettings::default()
        };
        assert_eq!(settings.site_name(), None);
    }
}
