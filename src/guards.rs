//! The auth gate and per-route preconditions.
//!
//! Every navigation passes through [`AuthGate`] before the host resolves its
//! view. The gate has two stages:
//!
//! 1. **Access rules** ([`AuthGate::evaluate`]) — synchronous, driven only by
//!    route metadata and an [`AuthSnapshot`]. First matching rule wins:
//!
//! | # | Route | Auth state | Decision |
//! |---|-------|------------|----------|
//! | 1 | `requires_auth = false` | signed in, target is login/register | redirect to own dashboard |
//! | 1 | `requires_auth = false` | anything else | proceed |
//! | 2 | `requires_auth = true` | anonymous | redirect to login with `redirect=<full path>` |
//! | 3 | `requires_admin = true` | not admin | redirect to user dashboard |
//! | 4 | otherwise | | proceed |
//!
//! 2. **Preconditions** ([`RoutePrecondition`]) — asynchronous checks attached
//!    to individual routes, run only when stage 1 proceeds. A failing
//!    precondition redirects to the user dashboard. Preconditions fail
//!    closed: if they cannot decide, they answer `false`.
//!
//! On a final proceed the gate writes the page title through [`PageTitle`].
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use navigation_orchestrator::{
//!     AuthGate, AuthSnapshot, GatePaths, NoopTitle, PublicSettings, RouteIntent, RouteMeta,
//!     SettingsCache, StaticSettings,
//! };
//!
//! let settings = Arc::new(SettingsCache::new(Arc::new(StaticSettings::new(PublicSettings::default()))));
//! let gate = AuthGate::new(GatePaths::default(), "DreamStudio", settings, Arc::new(NoopTitle));
//!
//! let intent = RouteIntent::new("/admin/users").with_meta(RouteMeta::admin());
//! let decision = gate.evaluate(&intent, AuthSnapshot::user());
//! assert_eq!(decision.redirect_path(), Some("/dashboard"));
//! ```

use crate::auth::AuthSnapshot;
use crate::config::GatePaths;
use crate::intent::RouteIntent;
use crate::lifecycle::Decision;
use crate::params::QueryParams;
use crate::settings::{PublicSettings, SettingsCache};
use crate::{debug_log, error_log, trace_log};
use async_trait::async_trait;
use std::sync::{Arc, Mutex, PoisonError};

// ============================================================================
// RoutePrecondition trait
// ============================================================================

/// Asynchronous condition a route needs before it can be shown.
///
/// # Example
///
/// ```
/// use async_trait::async_trait;
/// use navigation_orchestrator::{RouteIntent, RoutePrecondition};
///
/// struct BetaOnly;
///
/// #[async_trait]
/// impl RoutePrecondition for BetaOnly {
///     async fn check(&self, intent: &RouteIntent) -> bool {
///         intent.query.get("beta") == Some("1")
///     }
///
///     fn name(&self) -> &'static str {
///         "BetaOnly"
///     }
/// }
/// ```
#[async_trait]
pub trait RoutePrecondition: Send + Sync + 'static {
    /// `true` if the navigation may continue. Must not fail; answer `false`
    /// when the condition cannot be determined.
    async fn check(&self, intent: &RouteIntent) -> bool;

    /// Name for logs.
    fn name(&self) -> &'static str {
        "RoutePrecondition"
    }
}

// ============================================================================
// SettingsFlag
// ============================================================================

/// Reads one boolean flag out of [`PublicSettings`].
pub type FlagReader = fn(&PublicSettings) -> bool;

/// Precondition backed by a public settings flag.
///
/// Uses the cached settings when available and otherwise waits for the
/// shared fetch. A failed fetch counts as "flag off".
pub struct SettingsFlag {
    settings: Arc<SettingsCache>,
    name: &'static str,
    read: FlagReader,
}

impl SettingsFlag {
    /// Gate on an arbitrary flag.
    pub fn new(settings: Arc<SettingsCache>, name: &'static str, read: FlagReader) -> Self {
        Self {
            settings,
            name,
            read,
        }
    }

    /// Gate on `user_custom_key_enabled` (the user API settings page).
    pub fn user_custom_key(settings: Arc<SettingsCache>) -> Self {
        Self::new(settings, "UserCustomKeyEnabled", |s| s.user_custom_key_enabled)
    }
}

#[async_trait]
impl RoutePrecondition for SettingsFlag {
    async fn check(&self, intent: &RouteIntent) -> bool {
        if let Some(cached) = self.settings.cached() {
            return (self.read)(&cached);
        }

        match self.settings.get_public_settings().await {
            Ok(settings) => (self.read)(&settings),
            Err(err) => {
                error_log!(
                    "Failed to load public settings for '{}': {}",
                    intent.path,
                    err
                );
                false
            }
        }
    }

    fn name(&self) -> &'static str {
        self.name
    }
}

// ============================================================================
// precondition_fn helper
// ============================================================================

/// Create a synchronous precondition from a closure.
///
/// ```
/// use navigation_orchestrator::precondition_fn;
///
/// let only_with_ref = precondition_fn(|intent| intent.query.contains("ref"));
/// ```
pub const fn precondition_fn<F>(f: F) -> FnPrecondition<F>
where
    F: Fn(&RouteIntent) -> bool + Send + Sync + 'static,
{
    FnPrecondition { f }
}

/// Precondition created by [`precondition_fn`].
pub struct FnPrecondition<F> {
    f: F,
}

#[async_trait]
impl<F> RoutePrecondition for FnPrecondition<F>
where
    F: Fn(&RouteIntent) -> bool + Send + Sync + 'static,
{
    async fn check(&self, intent: &RouteIntent) -> bool {
        (self.f)(intent)
    }
}

// ============================================================================
// PageTitle
// ============================================================================

/// Sink for the document title.
pub trait PageTitle: Send + Sync + 'static {
    /// Replace the current title.
    fn set_title(&self, title: &str);
}

/// Discards titles. For hosts without a document.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTitle;

impl PageTitle for NoopTitle {
    fn set_title(&self, _title: &str) {}
}

/// Remembers the last title. For headless hosts and tests.
#[derive(Debug, Default)]
pub struct RecordedTitle {
    current: Mutex<Option<String>>,
}

impl RecordedTitle {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// The last title written.
    pub fn current(&self) -> Option<String> {
        self.current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl PageTitle for RecordedTitle {
    fn set_title(&self, title: &str) {
        *self.current.lock().unwrap_or_else(PoisonError::into_inner) = Some(title.to_string());
    }
}

// ============================================================================
// AuthGate
// ============================================================================

/// Decides whether a navigation may proceed.
pub struct AuthGate {
    paths: GatePaths,
    site_name: String,
    settings: Arc<SettingsCache>,
    title: Arc<dyn PageTitle>,
}

impl AuthGate {
    /// Create a gate.
    ///
    /// `site_name` is the title fallback when the cached public settings do
    /// not name the site.
    pub fn new(
        paths: GatePaths,
        site_name: impl Into<String>,
        settings: Arc<SettingsCache>,
        title: Arc<dyn PageTitle>,
    ) -> Self {
        Self {
            paths,
            site_name: site_name.into(),
            settings,
            title,
        }
    }

    /// The redirect targets this gate uses.
    pub fn paths(&self) -> &GatePaths {
        &self.paths
    }

    /// Apply the access rules. Pure: no title change, no preconditions.
    pub fn evaluate(&self, intent: &RouteIntent, auth: AuthSnapshot) -> Decision {
        let meta = &intent.meta;

        if !meta.requires_auth {
            if auth.is_authenticated && self.paths.is_auth_page(&intent.path) {
                return Decision::redirect(self.paths.dashboard_for(auth.is_admin))
                    .because("already signed in");
            }
            return Decision::Proceed;
        }

        if !auth.is_authenticated {
            return Decision::redirect_with_query(
                &self.paths.login,
                QueryParams::new().with("redirect", &intent.full_path),
            )
            .because("authentication required");
        }

        if meta.requires_admin && !auth.is_admin {
            return Decision::redirect(&self.paths.user_dashboard).because("admin role required");
        }

        Decision::Proceed
    }

    /// Full gate: access rules, then preconditions, then the title.
    ///
    /// Suspends while a precondition waits on the network.
    pub async fn check(&self, intent: &RouteIntent, auth: AuthSnapshot) -> Decision {
        let mut decision = self.evaluate(intent, auth);
        debug_log!("Access rules for '{}' → {:?}", intent.full_path, decision);

        if decision.is_proceed() {
            for precondition in &intent.preconditions {
                let passed = precondition.check(intent).await;
                trace_log!(
                    "Precondition '{}' for '{}' → {}",
                    precondition.name(),
                    intent.path,
                    passed
                );
                if !passed {
                    debug_log!(
                        "Precondition '{}' rejected '{}'",
                        precondition.name(),
                        intent.path
                    );
                    decision = Decision::redirect(&self.paths.user_dashboard)
                        .because(format!("precondition '{}' not met", precondition.name()));
                    break;
                }
            }
        }

        if decision.is_proceed() {
            self.apply_title(intent);
        }
        decision
    }

    /// `"{title} - {site}"`, or just the site name for untitled routes.
    pub fn page_title(&self, intent: &RouteIntent) -> String {
        let site = self
            .settings
            .cached()
            .and_then(|s| s.site_name().map(str::to_string))
            .unwrap_or_else(|| self.site_name.clone());

        match &intent.meta.title {
            Some(title) => format!("{} - {}", title, site),
            None => site,
        }
    }

    fn apply_title(&self, intent: &RouteIntent) {
        self.title.set_title(&self.page_title(intent));
    }
}

impl std::fmt::Debug for AuthGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthGate")
            .field("paths", &self.paths)
            .field("site_name", &self.site_name)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Tests
// ============================================================================
