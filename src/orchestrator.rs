//! The composed navigation hooks.
//!
//! [`NavigationOrchestrator`] wires the gate, the loading tracker, the reload
//! policy and (with the `prefetch` feature) the prefetch scheduler into the
//! [`NavigationHooks`] a host router calls. It is the only object the host
//! needs to hold.
//!
//! Every attempt that reaches [`on_before`](NavigationHooks::on_before) bumps
//! the loading counter exactly once, and is settled (counter released)
//! exactly once, by whichever of these happens first:
//!
//! - the gate redirects,
//! - the host calls `on_after` or `on_error`,
//! - the host drops the `on_before` future before it completes.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use navigation_orchestrator::{
//!     AuthProvider, Decision, NavigationHooks, NavigationOrchestrator, PageReloader,
//!     PublicSettings, SettingsCache, StaticSettings,
//! };
//!
//! struct Anonymous;
//!
//! impl AuthProvider for Anonymous {
//!     fn is_authenticated(&self) -> bool { false }
//!     fn is_admin(&self) -> bool { false }
//!     fn check_auth(&self) {}
//! }
//!
//! struct NoReload;
//!
//! impl PageReloader for NoReload {
//!     fn reload(&self) {}
//! }
//!
//! let settings = Arc::new(SettingsCache::new(Arc::new(StaticSettings::new(
//!     PublicSettings::default(),
//! ))));
//! let orchestrator = NavigationOrchestrator::builder()
//!     .auth(Arc::new(Anonymous))
//!     .settings(settings)
//!     .reloader(Arc::new(NoReload))
//!     .build()
//!     .unwrap();
//!
//! let intent = orchestrator.intent("/dashboard", None).unwrap();
//! let decision = pollster::block_on(orchestrator.on_before(&intent));
//!
//! assert_eq!(decision.location().as_deref(), Some("/login?redirect=/dashboard"));
//! assert!(!orchestrator.loading().is_loading());
//! ```

use crate::auth::{AuthProvider, AuthSnapshot};
use crate::clock::{Clock, SystemClock};
use crate::config::OrchestratorConfig;
use crate::error::{ConfigError, NavigationError};
use crate::guards::{AuthGate, NoopTitle, PageTitle};
use crate::intent::{NavigationId, RouteIntent};
use crate::lifecycle::{Decision, NavigationHooks, NavigationPhase};
use crate::loading::NavigationLoadingTracker;
use crate::recovery::{
    MemorySessionStorage, PageReloader, RecoveryOutcome, ReloadRecoveryPolicy, SessionStorage,
};
use crate::routes::{app_routes, RouteTable};
use crate::settings::SettingsCache;
use crate::{debug_log, error_log, info_log, trace_log, warn_log};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, Once, PoisonError};

#[cfg(feature = "prefetch")]
use crate::prefetch::{IdleScheduler, ModuleLoader, PrefetchScheduler, PrefetchStats};
#[cfg(feature = "prefetch")]
use std::sync::OnceLock;

// ============================================================================
// Open navigations
// ============================================================================

/// Phases of the attempts that have started but not settled, paired with the
/// loading tracker they hold a count in.
struct OpenNavigations {
    phases: Mutex<HashMap<NavigationId, NavigationPhase>>,
    loading: Arc<NavigationLoadingTracker>,
}

impl OpenNavigations {
    fn new(loading: Arc<NavigationLoadingTracker>) -> Self {
        Self {
            phases: Mutex::new(HashMap::new()),
            loading,
        }
    }

    /// Register `id` and take a loading count. Returns `false` if it was
    /// already open.
    fn begin(&self, id: NavigationId) -> bool {
        {
            let mut phases = self.lock();
            if phases.contains_key(&id) {
                return false;
            }
            phases.insert(id, NavigationPhase::Pending);
        }
        self.loading.start_navigation();
        true
    }

    fn mark(&self, id: NavigationId, phase: NavigationPhase) {
        if let Some(current) = self.lock().get_mut(&id) {
            *current = phase;
        }
    }

    /// Release `id`. Returns `true` only for the call that actually settled it.
    fn settle(&self, id: NavigationId) -> bool {
        let removed = self.lock().remove(&id);
        if removed.is_some() {
            trace_log!("Navigation {} settled", id);
            self.loading.end_navigation();
            true
        } else {
            false
        }
    }

    fn phase(&self, id: NavigationId) -> Option<NavigationPhase> {
        self.lock().get(&id).copied()
    }

    fn len(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<NavigationId, NavigationPhase>> {
        self.phases.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Settles an attempt when dropped, unless disarmed.
struct SettleOnDrop<'a> {
    open: &'a OpenNavigations,
    id: NavigationId,
    armed: bool,
}

impl<'a> SettleOnDrop<'a> {
    fn new(open: &'a OpenNavigations, id: NavigationId) -> Self {
        Self {
            open,
            id,
            armed: true,
        }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for SettleOnDrop<'_> {
    fn drop(&mut self) {
        if self.armed && self.open.settle(self.id) {
            debug_log!("Navigation {} abandoned before a decision", self.id);
        }
    }
}

// ============================================================================
// NavigationOrchestrator
// ============================================================================

#[cfg(feature = "prefetch")]
struct PrefetchHost {
    loader: Arc<dyn ModuleLoader>,
    idle: Arc<dyn IdleScheduler>,
}

/// Navigation hooks for a single-page application router.
///
/// Build with [`NavigationOrchestrator::builder`].
pub struct NavigationOrchestrator {
    config: OrchestratorConfig,
    auth: Arc<dyn AuthProvider>,
    settings: Arc<SettingsCache>,
    table: Arc<RouteTable>,
    gate: AuthGate,
    recovery: ReloadRecoveryPolicy,
    open: OpenNavigations,
    rehydrate: Once,
    #[cfg(feature = "prefetch")]
    prefetch_host: Option<PrefetchHost>,
    #[cfg(feature = "prefetch")]
    prefetcher: OnceLock<PrefetchScheduler>,
}

impl NavigationOrchestrator {
    /// Start configuring an orchestrator.
    pub fn builder() -> OrchestratorBuilder {
        OrchestratorBuilder::new()
    }

    /// Build the intent for `location` from the route table.
    ///
    /// Returns `None` when no route matches.
    pub fn intent(&self, location: &str, from: Option<&str>) -> Option<RouteIntent> {
        self.table.intent(location, from)
    }

    /// The active configuration.
    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// The route table.
    pub fn routes(&self) -> &Arc<RouteTable> {
        &self.table
    }

    /// The shared public settings cache.
    pub fn settings(&self) -> &Arc<SettingsCache> {
        &self.settings
    }

    /// The loading tracker the indicator should subscribe to.
    pub fn loading(&self) -> &Arc<NavigationLoadingTracker> {
        &self.open.loading
    }

    /// The access gate.
    pub fn gate(&self) -> &AuthGate {
        &self.gate
    }

    /// Lifecycle position of attempt `id`.
    ///
    /// Attempts that were never started, or have already settled, report
    /// [`NavigationPhase::Settled`].
    pub fn phase(&self, id: NavigationId) -> NavigationPhase {
        self.open.phase(id).unwrap_or(NavigationPhase::Settled)
    }

    /// Number of attempts holding a loading count.
    pub fn open_navigations(&self) -> usize {
        self.open.len()
    }

    /// Prefetch counters, once the scheduler exists.
    #[cfg(feature = "prefetch")]
    pub fn prefetch_stats(&self) -> Option<PrefetchStats> {
        self.prefetcher.get().map(PrefetchScheduler::stats)
    }

    fn rehydrate_auth(&self) {
        self.rehydrate.call_once(|| {
            debug_log!("Restoring auth state before the first navigation");
            self.auth.check_auth();
        });
    }

    #[cfg(feature = "prefetch")]
    fn prefetch_after(&self, intent: &RouteIntent) {
        let Some(host) = &self.prefetch_host else {
            return;
        };
        let scheduler = self.prefetcher.get_or_init(|| {
            debug_log!("Initializing route prefetcher");
            PrefetchScheduler::new(
                Arc::clone(&self.table),
                Arc::clone(&host.loader),
                Arc::clone(&host.idle),
                &self.config.prefetch,
            )
        });
        scheduler.trigger_prefetch(intent);
    }

    #[cfg(not(feature = "prefetch"))]
    fn prefetch_after(&self, _intent: &RouteIntent) {}
}

#[async_trait]
impl NavigationHooks for NavigationOrchestrator {
    async fn on_before(&self, intent: &RouteIntent) -> Decision {
        if !self.open.begin(intent.id) {
            warn_log!("Navigation {} evaluated twice", intent.id);
        }
        let mut guard = SettleOnDrop::new(&self.open, intent.id);

        self.rehydrate_auth();
        let auth = AuthSnapshot::capture(self.auth.as_ref());
        trace_log!(
            "Navigation {} to '{}' (authenticated: {}, admin: {})",
            intent.id,
            intent.full_path,
            auth.is_authenticated,
            auth.is_admin
        );

        let decision = self.gate.check(intent, auth).await;

        match &decision {
            Decision::Proceed => {
                self.open.mark(intent.id, NavigationPhase::Proceeding);
                guard.disarm();
            }
            Decision::Redirect { reason, .. } => {
                self.open.mark(intent.id, NavigationPhase::Redirecting);
                info_log!(
                    "Navigation {} to '{}' redirected to '{}'{}",
                    intent.id,
                    intent.full_path,
                    decision.location().unwrap_or_default(),
                    reason
                        .as_ref()
                        .map(|r| format!(" ({})", r))
                        .unwrap_or_default()
                );
                self.open.settle(intent.id);
                guard.disarm();
            }
        }

        decision
    }

    fn on_after(&self, intent: &RouteIntent) {
        self.open.settle(intent.id);
        self.prefetch_after(intent);
    }

    fn on_error(&self, intent: &RouteIntent, error: &NavigationError) -> RecoveryOutcome {
        error_log!("Router error on '{}': {}", intent.full_path, error);
        self.open.settle(intent.id);
        self.recovery.handle_navigation_error(error)
    }
}

impl std::fmt::Debug for NavigationOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NavigationOrchestrator")
            .field("routes", &self.table.records().len())
            .field("open_navigations", &self.open.len())
            .field("recovery", &self.recovery)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// OrchestratorBuilder
// ============================================================================

/// Builder for [`NavigationOrchestrator`].
///
/// `auth`, `settings` and `reloader` are required. Everything else has a
/// default: the application route table, default configuration, no title
/// updates, in-memory session storage, the system clock and a fresh loading
/// tracker. Prefetching is enabled only when both a loader and an idle
/// scheduler are supplied.
#[must_use]
#[derive(Default)]
pub struct OrchestratorBuilder {
    config: Option<OrchestratorConfig>,
    auth: Option<Arc<dyn AuthProvider>>,
    settings: Option<Arc<SettingsCache>>,
    routes: Option<RouteTable>,
    title: Option<Arc<dyn PageTitle>>,
    storage: Option<Arc<dyn SessionStorage>>,
    reloader: Option<Arc<dyn PageReloader>>,
    clock: Option<Arc<dyn Clock>>,
    loading: Option<Arc<NavigationLoadingTracker>>,
    #[cfg(feature = "prefetch")]
    loader: Option<Arc<dyn ModuleLoader>>,
    #[cfg(feature = "prefetch")]
    idle: Option<Arc<dyn IdleScheduler>>,
}

impl OrchestratorBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `config` instead of the defaults.
    pub fn config(mut self, config: OrchestratorConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Authentication store.
    pub fn auth(mut self, auth: Arc<dyn AuthProvider>) -> Self {
        self.auth = Some(auth);
        self
    }

    /// Shared public settings cache.
    pub fn settings(mut self, settings: Arc<SettingsCache>) -> Self {
        self.settings = Some(settings);
        self
    }

    /// Route table used to build intents and find prefetch candidates.
    pub fn routes(mut self, routes: RouteTable) -> Self {
        self.routes = Some(routes);
        self
    }

    /// Document title sink.
    pub fn title(mut self, title: Arc<dyn PageTitle>) -> Self {
        self.title = Some(title);
        self
    }

    /// Tab-scoped storage for the reload record.
    pub fn storage(mut self, storage: Arc<dyn SessionStorage>) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Full-page reload trigger.
    pub fn reloader(mut self, reloader: Arc<dyn PageReloader>) -> Self {
        self.reloader = Some(reloader);
        self
    }

    /// Time source for the reload debounce.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Share an existing loading tracker.
    pub fn loading(mut self, loading: Arc<NavigationLoadingTracker>) -> Self {
        self.loading = Some(loading);
        self
    }

    /// Module loader for prefetching.
    #[cfg(feature = "prefetch")]
    pub fn module_loader(mut self, loader: Arc<dyn ModuleLoader>) -> Self {
        self.loader = Some(loader);
        self
    }

    /// Idle-time scheduler for prefetching.
    #[cfg(feature = "prefetch")]
    pub fn idle_scheduler(mut self, idle: Arc<dyn IdleScheduler>) -> Self {
        self.idle = Some(idle);
        self
    }

    /// Validate and assemble the orchestrator.
    pub fn build(self) -> Result<NavigationOrchestrator, ConfigError> {
        let config = self.config.unwrap_or_default();
        config.validate()?;

        let auth = self.auth.ok_or_else(|| missing("auth", "an AuthProvider"))?;
        let settings = self
            .settings
            .ok_or_else(|| missing("settings", "a SettingsCache"))?;
        let reloader = self
            .reloader
            .ok_or_else(|| missing("reloader", "a PageReloader"))?;

        let table = Arc::new(
            self.routes
                .unwrap_or_else(|| app_routes(Arc::clone(&settings))),
        );
        let title = self.title.unwrap_or_else(|| Arc::new(NoopTitle));
        let storage = self
            .storage
            .unwrap_or_else(|| Arc::new(MemorySessionStorage::new()));
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let loading = self.loading.unwrap_or_default();

        let gate = AuthGate::new(
            config.paths.clone(),
            config.site_name.clone(),
            Arc::clone(&settings),
            title,
        );
        let recovery = ReloadRecoveryPolicy::new(&config.reload, storage, reloader, clock);

        #[cfg(feature = "prefetch")]
        let prefetch_host = match (self.loader, self.idle) {
            (Some(loader), Some(idle)) => Some(PrefetchHost { loader, idle }),
            (None, None) => None,
            _ => {
                warn_log!("Prefetching needs both a module loader and an idle scheduler; disabled");
                None
            }
        };

        debug_log!(
            "Navigation orchestrator ready with {} routes",
            table.records().len()
        );

        Ok(NavigationOrchestrator {
            config,
            auth,
            settings,
            table,
            gate,
            recovery,
            open: OpenNavigations::new(loading),
            rehydrate: Once::new(),
            #[cfg(feature = "prefetch")]
            prefetch_host,
            #[cfg(feature = "prefetch")]
            prefetcher: OnceLock::new(),
        })
    }
}

fn missing(field: &'static str, what: &str) -> ConfigError {
    ConfigError::Invalid {
        field,
        message: format!("{} is required", what),
    }
}

// ============================================================================
// Tests
// ============================================================================
