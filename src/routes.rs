//! Route table: ordered `{path, name, meta}` records.
//!
//! The host router owns history and view resolution. The orchestrator keeps
//! its own copy of the table for two reasons: to turn a location into a
//! [`RouteIntent`] with the right metadata, and to know which routes sit next
//! to each other when choosing what to prefetch.
//!
//! Records are tried in insertion order; the first match wins, so a catch-all
//! belongs at the end.
//!
//! # Example
//!
//! ```
//! use navigation_orchestrator::{RouteMeta, RouteRecord, RouteTable};
//!
//! let mut table = RouteTable::new();
//! table.add(RouteRecord::new("/login").name("Login").meta(RouteMeta::public().title("Login")));
//! table.add(RouteRecord::new("/dashboard").name("Dashboard"));
//! table.add(RouteRecord::redirect("/home", "/dashboard"));
//!
//! let intent = table.intent("/home", Some("/login")).unwrap();
//! assert_eq!(intent.path, "/dashboard");
//! assert_eq!(intent.name.as_deref(), Some("Dashboard"));
//! assert!(intent.meta.requires_auth);
//! ```

use crate::guards::{RoutePrecondition, SettingsFlag};
use crate::intent::RouteIntent;
use crate::matching::{first_segment, is_static_pattern, match_pattern};
use crate::params::{split_location, RouteParams};
use crate::settings::SettingsCache;
use crate::{debug_log, trace_log};
use std::sync::Arc;

// ============================================================================
// RouteMeta
// ============================================================================

/// Access and presentation metadata of a route.
///
/// [`Default`] is the common case for application pages: authentication
/// required, no admin requirement, no title.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMeta {
    /// Anonymous visitors are sent to the login page.
    pub requires_auth: bool,
    /// Non-admin users are sent to their dashboard.
    pub requires_admin: bool,
    /// Page title shown before the site name.
    pub title: Option<String>,
}

impl Default for RouteMeta {
    fn default() -> Self {
        Self {
            requires_auth: true,
            requires_admin: false,
            title: None,
        }
    }
}

impl RouteMeta {
    /// Authenticated page (same as [`Default`]).
    pub fn protected() -> Self {
        Self::default()
    }

    /// Page reachable without signing in.
    pub fn public() -> Self {
        Self {
            requires_auth: false,
            ..Self::default()
        }
    }

    /// Administrator-only page.
    pub fn admin() -> Self {
        Self {
            requires_admin: true,
            ..Self::default()
        }
    }

    /// Set the page title.
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}

// ============================================================================
// RouteRecord
// ============================================================================

/// One entry of the route table.
#[derive(Clone)]
pub struct RouteRecord {
    /// Path pattern (`/tasks/:id`, `/*pathMatch`).
    pub path: String,
    /// Route name, used for prefetch rules and module loading.
    pub name: Option<String>,
    /// Access and title metadata.
    pub meta: RouteMeta,
    /// Async checks run after the auth gate lets the navigation through.
    pub preconditions: Vec<Arc<dyn RoutePrecondition>>,
    /// When set, this record only forwards to another location.
    pub redirect_to: Option<String>,
}

impl RouteRecord {
    /// A route with default metadata.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            name: None,
            meta: RouteMeta::default(),
            preconditions: Vec::new(),
            redirect_to: None,
        }
    }

    /// A record that forwards `path` to `to`.
    pub fn redirect(path: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            redirect_to: Some(to.into()),
            ..Self::new(path)
        }
    }

    /// Set the route name.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the metadata.
    pub fn meta(mut self, meta: RouteMeta) -> Self {
        self.meta = meta;
        self
    }

    /// Attach an async precondition.
    pub fn precondition<P: RoutePrecondition>(mut self, precondition: P) -> Self {
        self.preconditions.push(Arc::new(precondition));
        self
    }

    /// `true` if this record only forwards elsewhere.
    pub fn is_redirect(&self) -> bool {
        self.redirect_to.is_some()
    }

    /// `true` if the record can be prefetched: named, static, and not a redirect.
    pub fn is_prefetchable(&self) -> bool {
        self.name.is_some() && !self.is_redirect() && is_static_pattern(&self.path)
    }
}

impl std::fmt::Debug for RouteRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteRecord")
            .field("path", &self.path)
            .field("name", &self.name)
            .field("meta", &self.meta)
            .field("redirect_to", &self.redirect_to)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// RouteTable
// ============================================================================

/// A route record matched against a concrete path.
#[derive(Debug, Clone)]
pub struct ResolvedRoute {
    /// The matched record (never a redirect record).
    pub record: Arc<RouteRecord>,
    /// Concrete path after following any redirect record.
    pub path: String,
    /// Parameters captured from `path`.
    pub params: RouteParams,
}

/// Ordered collection of [`RouteRecord`]s.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    records: Vec<Arc<RouteRecord>>,
}

impl RouteTable {
    /// Empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record.
    pub fn add(&mut self, record: RouteRecord) -> &mut Self {
        trace_log!("Registering route '{}' ({:?})", record.path, record.name);
        self.records.push(Arc::new(record));
        self
    }

    /// All records in match order.
    pub fn records(&self) -> &[Arc<RouteRecord>] {
        &self.records
    }

    /// Find a record by name.
    pub fn by_name(&self, name: &str) -> Option<&Arc<RouteRecord>> {
        self.records
            .iter()
            .find(|record| record.name.as_deref() == Some(name))
    }

    /// Match `path` (no query) against the table.
    ///
    /// A redirect record is followed once; a redirect that points at another
    /// redirect resolves to nothing.
    pub fn resolve(&self, path: &str) -> Option<ResolvedRoute> {
        let (record, params) = self.match_first(path)?;
        match &record.redirect_to {
            None => Some(ResolvedRoute {
                record: Arc::clone(record),
                path: path.to_string(),
                params,
            }),
            Some(target) => {
                debug_log!("Route '{}' forwards to '{}'", path, target);
                let (target_path, _) = split_location(target);
                let (next, params) = self.match_first(target_path)?;
                if next.is_redirect() {
                    return None;
                }
                Some(ResolvedRoute {
                    record: Arc::clone(next),
                    path: target_path.to_string(),
                    params,
                })
            }
        }
    }

    /// Build a [`RouteIntent`] for `location` (path plus optional query).
    ///
    /// Returns `None` when nothing in the table matches.
    pub fn intent(&self, location: &str, from: Option<&str>) -> Option<RouteIntent> {
        let (path, query) = split_location(location);
        let resolved = self.resolve(path)?;

        let target = if query.is_empty() {
            resolved.path.clone()
        } else {
            format!("{}?{}", resolved.path, query)
        };

        let mut intent = RouteIntent::new(target)
            .with_meta(resolved.record.meta.clone())
            .with_params(resolved.params);
        intent.name = resolved.record.name.clone();
        intent.preconditions = resolved.record.preconditions.clone();
        intent.from = from.map(str::to_string);
        Some(intent)
    }

    /// Prefetchable routes that share the first path segment and the access
    /// level of `record`.
    ///
    /// Top-level pages (`/dashboard`, `/assets`) are siblings of each other;
    /// `/admin/*` pages are siblings of each other. A public page is never a
    /// sibling of a protected one. `record` itself is excluded, and so is any
    /// route with preconditions, since it may redirect away once opened.
    pub fn siblings_of(&self, record: &RouteRecord) -> Vec<Arc<RouteRecord>> {
        let segments = crate::matching::split_path(&record.path);
        let group = if segments.len() > 1 {
            first_segment(&record.path)
        } else {
            None
        };

        self.records
            .iter()
            .filter(|candidate| candidate.path != record.path && candidate.is_prefetchable())
            .filter(|candidate| candidate.preconditions.is_empty())
            .filter(|candidate| {
                candidate.meta.requires_auth == record.meta.requires_auth
                    && candidate.meta.requires_admin == record.meta.requires_admin
            })
            .filter(|candidate| {
                let candidate_segments = crate::matching::split_path(&candidate.path);
                match group {
                    Some(group) => {
                        candidate_segments.len() > 1 && candidate_segments.first() == Some(&group)
                    }
                    None => candidate_segments.len() == 1,
                }
            })
            .cloned()
            .collect()
    }

    fn match_first(&self, path: &str) -> Option<(&Arc<RouteRecord>, RouteParams)> {
        self.records
            .iter()
            .find_map(|record| match_pattern(&record.path, path).map(|params| (record, params)))
    }
}

// ============================================================================
// Application routes
// ============================================================================

/// The application's route table.
///
/// `settings` backs the precondition on the user API settings page, which is
/// only reachable when the site lets users bring their own key.
pub fn app_routes(settings: Arc<SettingsCache>) -> RouteTable {
    let mut table = RouteTable::new();

    // Setup and public pages
    table
        .add(
            RouteRecord::new("/setup")
                .name("Setup")
                .meta(RouteMeta::public().title("Setup")),
        )
        .add(RouteRecord::new("/").name("Landing").meta(RouteMeta::public()))
        .add(
            RouteRecord::new("/home")
                .name("Home")
                .meta(RouteMeta::public().title("Home")),
        )
        .add(
            RouteRecord::new("/inspiration")
                .name("Inspiration")
                .meta(RouteMeta::public().title("Inspiration Square")),
        )
        .add(RouteRecord::redirect("/gallery", "/inspiration"))
        .add(
            RouteRecord::new("/login")
                .name("Login")
                .meta(RouteMeta::public().title("Login")),
        )
        .add(
            RouteRecord::new("/register")
                .name("Register")
                .meta(RouteMeta::public().title("Register")),
        )
        .add(
            RouteRecord::new("/email-verify")
                .name("EmailVerify")
                .meta(RouteMeta::public().title("Verify Email")),
        )
        .add(
            RouteRecord::new("/auth/callback")
                .name("OAuthCallback")
                .meta(RouteMeta::public().title("OAuth Callback")),
        )
        .add(
            RouteRecord::new("/auth/linuxdo/callback")
                .name("LinuxDoOAuthCallback")
                .meta(RouteMeta::public().title("LinuxDo OAuth Callback")),
        );

    // User pages
    table
        .add(
            RouteRecord::new("/assets")
                .name("Assets")
                .meta(RouteMeta::protected().title("My Assets")),
        )
        .add(
            RouteRecord::new("/ai-image")
                .name("AiImage")
                .meta(RouteMeta::protected().title("AI Image")),
        )
        .add(
            RouteRecord::new("/ai-video")
                .name("AiVideo")
                .meta(RouteMeta::protected().title("AI Video")),
        )
        .add(
            RouteRecord::new("/dashboard")
                .name("Dashboard")
                .meta(RouteMeta::protected().title("Dashboard")),
        )
        .add(
            RouteRecord::new("/redink")
                .name("RedInk")
                .meta(RouteMeta::protected().title("Xiaohongshu Posts")),
        )
        .add(
            RouteRecord::new("/profile")
                .name("Profile")
                .meta(RouteMeta::protected().title("Profile")),
        )
        .add(
            RouteRecord::new("/model-settings")
                .name("ModelSettings")
                .meta(RouteMeta::admin().title("Model Settings")),
        )
        .add(
            RouteRecord::new("/api-settings")
                .name("ApiSettings")
                .meta(RouteMeta::protected())
                .precondition(SettingsFlag::user_custom_key(settings)),
        );

    // Admin pages
    table
        .add(RouteRecord::redirect("/admin", "/admin/dashboard"))
        .add(
            RouteRecord::new("/admin/dashboard")
                .name("AdminDashboard")
                .meta(RouteMeta::admin().title("Admin Dashboard")),
        )
        .add(
            RouteRecord::new("/admin/ops")
                .name("AdminOps")
                .meta(RouteMeta::admin().title("Ops Monitoring")),
        )
        .add(
            RouteRecord::new("/admin/users")
                .name("AdminUsers")
                .meta(RouteMeta::admin().title("User Management")),
        )
        .add(
            RouteRecord::new("/admin/settings")
                .name("AdminSettings")
                .meta(RouteMeta::admin().title("System Settings")),
        )
        .add(
            RouteRecord::new("/admin/api-settings")
                .name("AdminApiSettings")
                .meta(RouteMeta::admin().title("API Settings")),
        )
        .add(
            RouteRecord::new("/admin/inspiration")
                .name("AdminInspiration")
                .meta(RouteMeta::admin().title("Inspiration Review")),
        );

    // Catch-all; metadata left at its default, so it requires authentication.
    table.add(
        RouteRecord::new("/*pathMatch")
            .name("NotFound")
            .meta(RouteMeta::protected().title("404 Not Found")),
    );

    table
}

// ============================================================================
// Tests
// ============================================================================
