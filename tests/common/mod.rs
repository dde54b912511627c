//! Test utilities for navigation orchestrator tests
//!
//! Fakes for every host collaborator plus a small host-router driver that
//! follows redirects the way a browser router would.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use futures::future::{self, BoxFuture, FutureExt};
use navigation_orchestrator::*;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;

/// Redirect hops a host follows before giving up.
pub const MAX_REDIRECT_DEPTH: usize = 5;

/// Epoch milliseconds the manual clock starts at.
pub const START_MILLIS: i64 = 1_700_000_000_000;

static LOGGER: Once = Once::new();

/// Route crate logs to the test output (`RUST_LOG=debug cargo test`).
pub fn init_logging() {
    LOGGER.call_once(|| {
        let _ = env_logger::builder().is_test(true).try_init();
    });
}

// ============================================================================
// Auth
// ============================================================================

/// Auth store with switchable flags.
#[derive(Default)]
pub struct FakeAuth {
    authenticated: AtomicBool,
    admin: AtomicBool,
    rehydrations: AtomicUsize,
}

impl FakeAuth {
    pub fn anonymous() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn user() -> Arc<Self> {
        let auth = Self::default();
        auth.authenticated.store(true, Ordering::SeqCst);
        Arc::new(auth)
    }

    pub fn admin() -> Arc<Self> {
        let auth = Self::default();
        auth.authenticated.store(true, Ordering::SeqCst);
        auth.admin.store(true, Ordering::SeqCst);
        Arc::new(auth)
    }

    pub fn sign_out(&self) {
        self.authenticated.store(false, Ordering::SeqCst);
        self.admin.store(false, Ordering::SeqCst);
    }

    pub fn rehydrations(&self) -> usize {
        self.rehydrations.load(Ordering::SeqCst)
    }
}

impl AuthProvider for FakeAuth {
    fn is_authenticated(&self) -> bool {
        self.authenticated.load(Ordering::SeqCst)
    }

    fn is_admin(&self) -> bool {
        self.admin.load(Ordering::SeqCst)
    }

    fn check_auth(&self) {
        self.rehydrations.fetch_add(1, Ordering::SeqCst);
    }
}

// ============================================================================
// Settings
// ============================================================================

/// Settings endpoint that counts requests and can be made slow or failing.
pub struct FakeSettingsApi {
    settings: Mutex<PublicSettings>,
    fetches: AtomicUsize,
    failing: AtomicBool,
    latency: Duration,
}

impl FakeSettingsApi {
    pub fn new(settings: PublicSettings) -> Arc<Self> {
        Self::with_latency(settings, Duration::ZERO)
    }

    pub fn with_latency(settings: PublicSettings, latency: Duration) -> Arc<Self> {
        Arc::new(Self {
            settings: Mutex::new(settings),
            fetches: AtomicUsize::new(0),
            failing: AtomicBool::new(false),
            latency,
        })
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl SettingsProvider for FakeSettingsApi {
    async fn fetch_public_settings(&self) -> Result<PublicSettings, SettingsError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(SettingsError::fetch("503 Service Unavailable"));
        }
        Ok(self.settings.lock().unwrap().clone())
    }
}

/// Public settings with the user custom key flag set to `enabled`.
pub fn settings_with_custom_key(enabled: bool) -> PublicSettings {
    PublicSettings {
        site_name: "Studio".into(),
        user_custom_key_enabled: enabled,
        ..Default::default()
    }
}

// ============================================================================
// Recovery collaborators
// ============================================================================

/// Clock that only moves when told to.
pub struct ManualClock(AtomicI64);

impl ManualClock {
    pub fn new() -> Arc<Self> {
        Arc::new(Self(AtomicI64::new(START_MILLIS)))
    }

    pub fn advance(&self, by: Duration) {
        self.0
            .fetch_add(i64::try_from(by.as_millis()).unwrap(), Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(self.0.load(Ordering::SeqCst))
            .unwrap()
    }
}

/// Counts reload requests.
#[derive(Default)]
pub struct RecordingReloader(AtomicUsize);

impl RecordingReloader {
    pub fn reloads(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

impl PageReloader for RecordingReloader {
    fn reload(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

// ============================================================================
// Prefetch collaborators
// ============================================================================

/// Module loader that records requests and fails for selected routes.
#[derive(Default)]
pub struct FakeLoader {
    failing: Mutex<HashSet<String>>,
    requested: Mutex<Vec<String>>,
}

impl FakeLoader {
    pub fn fail(&self, name: &str) {
        self.failing.lock().unwrap().insert(name.to_string());
    }

    pub fn requested(&self) -> Vec<String> {
        self.requested.lock().unwrap().clone()
    }
}

impl ModuleLoader for FakeLoader {
    fn load(&self, route: &RouteRecord) -> BoxFuture<'static, Result<(), LoadError>> {
        let name = route.name.clone().unwrap_or_default();
        self.requested.lock().unwrap().push(name.clone());
        let result = if self.failing.lock().unwrap().contains(&name) {
            Err(LoadError::new(&route.path, "Failed to fetch dynamically imported module"))
        } else {
            Ok(())
        };
        future::ready(result).boxed()
    }
}

// ============================================================================
// Harness
// ============================================================================

/// An orchestrator over the application route table with every collaborator
/// faked and reachable.
pub struct Harness {
    pub orchestrator: Arc<NavigationOrchestrator>,
    pub auth: Arc<FakeAuth>,
    pub api: Arc<FakeSettingsApi>,
    pub settings: Arc<SettingsCache>,
    pub title: Arc<RecordedTitle>,
    pub storage: Arc<MemorySessionStorage>,
    pub reloader: Arc<RecordingReloader>,
    pub clock: Arc<ManualClock>,
    pub loader: Arc<FakeLoader>,
    pub idle: Arc<IdleQueue>,
}

impl Harness {
    pub fn new(auth: Arc<FakeAuth>) -> Self {
        Self::with_settings(auth, settings_with_custom_key(false))
    }

    pub fn with_settings(auth: Arc<FakeAuth>, public: PublicSettings) -> Self {
        Self::build(auth, FakeSettingsApi::new(public), OrchestratorConfig::default())
    }

    pub fn build(auth: Arc<FakeAuth>, api: Arc<FakeSettingsApi>, config: OrchestratorConfig) -> Self {
        init_logging();

        let clock = ManualClock::new();
        let settings = Arc::new(SettingsCache::with_clock(api.clone(), clock.clone()));
        let title = Arc::new(RecordedTitle::new());
        let storage = Arc::new(MemorySessionStorage::new());
        let reloader = Arc::new(RecordingReloader::default());
        let loader = Arc::new(FakeLoader::default());
        let idle = Arc::new(IdleQueue::new());

        let orchestrator = NavigationOrchestrator::builder()
            .config(config)
            .auth(auth.clone())
            .settings(settings.clone())
            .title(title.clone())
            .storage(storage.clone())
            .reloader(reloader.clone())
            .clock(clock.clone())
            .module_loader(loader.clone())
            .idle_scheduler(idle.clone())
            .build()
            .unwrap();

        Self {
            orchestrator: Arc::new(orchestrator),
            auth,
            api,
            settings,
            title,
            storage,
            reloader,
            clock,
            loader,
            idle,
        }
    }

    pub fn host(&self) -> TestHost {
        TestHost::new(self.orchestrator.clone())
    }
}

// ============================================================================
// Host router driver
// ============================================================================

/// Result of driving one user navigation to completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Landing {
    /// Location the host ended up rendering.
    pub location: String,
    /// Redirect locations followed on the way, in order.
    pub redirects: Vec<String>,
}

/// Minimal host router: resolves locations, calls the hooks, follows
/// redirects.
pub struct TestHost {
    orchestrator: Arc<NavigationOrchestrator>,
    current: Mutex<Option<String>>,
}

impl TestHost {
    pub fn new(orchestrator: Arc<NavigationOrchestrator>) -> Self {
        Self {
            orchestrator,
            current: Mutex::new(None),
        }
    }

    pub fn current(&self) -> Option<String> {
        self.current.lock().unwrap().clone()
    }

    /// Navigate to `location`, following redirects like a router would.
    pub async fn navigate(&self, location: &str) -> Landing {
        let mut target = location.to_string();
        let mut redirects = Vec::new();

        for _ in 0..=MAX_REDIRECT_DEPTH {
            let from = self.current();
            let intent = self
                .orchestrator
                .intent(&target, from.as_deref())
                .unwrap_or_else(|| panic!("no route for {}", target));

            match self.orchestrator.on_before(&intent).await {
                Decision::Proceed => {
                    self.orchestrator.on_after(&intent);
                    *self.current.lock().unwrap() = Some(intent.full_path.clone());
                    return Landing {
                        location: intent.full_path,
                        redirects,
                    };
                }
                redirect => {
                    target = redirect.location().unwrap();
                    redirects.push(target.clone());
                }
            }
        }

        panic!("redirect loop starting at {}: {:?}", location, redirects);
    }

    /// Navigate to `location` and report a view resolution failure instead
    /// of completing.
    pub async fn navigate_and_fail(&self, location: &str, error: &NavigationError) -> RecoveryOutcome {
        let intent = self
            .orchestrator
            .intent(location, self.current().as_deref())
            .unwrap();
        let decision = self.orchestrator.on_before(&intent).await;
        assert!(decision.is_proceed(), "expected {} to proceed", location);
        self.orchestrator.on_error(&intent, error)
    }
}

/// Edges observed on a tracker.
pub fn record_edges(tracker: &NavigationLoadingTracker) -> Arc<Mutex<Vec<LoadingEdge>>> {
    let edges = Arc::new(Mutex::new(Vec::new()));
    let sink = edges.clone();
    tracker.subscribe(move |edge| sink.lock().unwrap().push(edge));
    edges
}
