//! # navigation-orchestrator
//!
//! The decision layer that sits between a single-page application's router
//! and its views. For every navigation it:
//!
//! - gates access by authentication state and admin role, redirecting guests
//!   to the login page (with a `redirect` query) and signed-in users away
//!   from the auth pages,
//! - runs async per-route preconditions backed by a deduplicated public
//!   settings cache,
//! - drives a global loading indicator that shows once per burst of
//!   overlapping navigations,
//! - prefetches likely next routes when the host is idle,
//! - recovers from stale-deployment chunk failures with a debounced full
//!   page reload.
//!
//! The crate owns no history stack and renders nothing. The host router
//! builds a [`RouteIntent`] per attempt and calls the three
//! [`NavigationHooks`] that [`NavigationOrchestrator`] implements.
//!
//! # Quick start
//!
//! ```
//! use std::sync::Arc;
//! use navigation_orchestrator::{
//!     AuthProvider, NavigationHooks, NavigationOrchestrator, PageReloader, PublicSettings,
//!     SettingsCache, StaticSettings,
//! };
//!
//! struct Session;
//!
//! impl AuthProvider for Session {
//!     fn is_authenticated(&self) -> bool { true }
//!     fn is_admin(&self) -> bool { false }
//!     fn check_auth(&self) {}
//! }
//!
//! struct Browser;
//!
//! impl PageReloader for Browser {
//!     fn reload(&self) {}
//! }
//!
//! let settings = Arc::new(SettingsCache::new(Arc::new(StaticSettings::new(
//!     PublicSettings::default(),
//! ))));
//! let router = NavigationOrchestrator::builder()
//!     .auth(Arc::new(Session))
//!     .settings(settings)
//!     .reloader(Arc::new(Browser))
//!     .build()
//!     .unwrap();
//!
//! // A signed-in user is sent away from the login page...
//! let login = router.intent("/login", None).unwrap();
//! let decision = pollster::block_on(router.on_before(&login));
//! assert_eq!(decision.redirect_path(), Some("/dashboard"));
//!
//! // ...but may open their dashboard.
//! let dashboard = router.intent("/dashboard", Some("/login")).unwrap();
//! assert!(pollster::block_on(router.on_before(&dashboard)).is_proceed());
//! router.on_after(&dashboard);
//! assert!(!router.loading().is_loading());
//! ```
//!
//! # Feature flags
//!
//! | Feature    | Default | Effect                                           |
//! |------------|---------|--------------------------------------------------|
//! | `log`      | yes     | Log through the [`log`] facade                   |
//! | `tracing`  | no      | Log through [`tracing`] instead of `log`         |
//! | `prefetch` | yes     | Idle-time route prefetching (LRU ledger)         |
//!
//! [`log`]: https://docs.rs/log
//! [`tracing`]: https://docs.rs/tracing

#![cfg_attr(docsrs, feature(doc_cfg))]

#[cfg(all(feature = "log", feature = "tracing"))]
compile_error!("Features 'log' and 'tracing' are mutually exclusive. Enable only one.");

#[doc(hidden)]
pub mod logging;

pub mod auth;
pub mod clock;
pub mod config;
pub mod error;
pub mod guards;
pub mod intent;
pub mod lifecycle;
pub mod loading;
pub mod matching;
pub mod orchestrator;
pub mod params;
#[cfg(feature = "prefetch")]
#[cfg_attr(docsrs, doc(cfg(feature = "prefetch")))]
pub mod prefetch;
pub mod recovery;
pub mod routes;
pub mod settings;

pub use auth::{AuthProvider, AuthSnapshot};
pub use clock::{Clock, SystemClock};
pub use config::{GatePaths, OrchestratorConfig, PrefetchConfig, ReloadConfig};
pub use error::{ConfigError, LoadError, NavigationError, SettingsError};
pub use guards::{
    precondition_fn, AuthGate, FnPrecondition, NoopTitle, PageTitle, RecordedTitle,
    RoutePrecondition, SettingsFlag,
};
pub use intent::{NavigationId, RouteIntent};
pub use lifecycle::{Decision, NavigationHooks, NavigationPhase};
pub use loading::{LoadingEdge, NavigationLoadingTracker};
pub use orchestrator::{NavigationOrchestrator, OrchestratorBuilder};
pub use params::{QueryParams, RouteParams};
#[cfg(feature = "prefetch")]
pub use prefetch::{IdleQueue, IdleScheduler, ModuleLoader, PrefetchScheduler, PrefetchStats};
pub use recovery::{
    is_stale_asset_error, MemorySessionStorage, PageReloader, RecoveryOutcome,
    ReloadRecoveryPolicy, SessionStorage,
};
pub use routes::{app_routes, ResolvedRoute, RouteMeta, RouteRecord, RouteTable};
pub use settings::{
    PublicSettings, PublicSettingsCacheEntry, SettingsCache, SettingsProvider, StaticSettings,
};
