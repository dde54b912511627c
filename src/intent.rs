//! The navigation request handed to the hooks.
//!
//! A [`RouteIntent`] describes one navigation attempt: where it goes, the
//! metadata of the route it resolved to, and where it came from. It is built
//! by the host (usually through [`RouteTable::intent`](crate::RouteTable::intent))
//! and never changes afterwards.
//!
//! # Example
//!
//! ```
//! use navigation_orchestrator::{RouteIntent, RouteMeta};
//!
//! let intent = RouteIntent::new("/admin/users?page=2")
//!     .with_meta(RouteMeta::admin().title("User Management"))
//!     .with_from("/dashboard");
//!
//! assert_eq!(intent.path, "/admin/users");
//! assert_eq!(intent.full_path, "/admin/users?page=2");
//! assert_eq!(intent.query.get("page"), Some("2"));
//! assert!(intent.meta.requires_admin);
//! ```

use crate::guards::RoutePrecondition;
use crate::params::{split_location, QueryParams, RouteParams};
use crate::routes::RouteMeta;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

static NEXT_NAVIGATION_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identifier of a navigation attempt.
///
/// The orchestrator keys per-attempt state by this id so that settling the
/// loading counter happens once per attempt, no matter how many hooks fire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NavigationId(u64);

impl NavigationId {
    /// Allocate a fresh id.
    pub fn next() -> Self {
        Self(NEXT_NAVIGATION_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Numeric value, for logs.
    pub fn get(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for NavigationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One navigation attempt.
#[derive(Clone)]
pub struct RouteIntent {
    /// Identity of this attempt.
    pub id: NavigationId,

    /// Target path without query or fragment.
    pub path: String,

    /// Target path including the query string.
    pub full_path: String,

    /// Parsed query of the target.
    pub query: QueryParams,

    /// Name of the resolved route, if it has one.
    pub name: Option<String>,

    /// Metadata of the resolved route.
    pub meta: RouteMeta,

    /// Parameters captured by the resolved route pattern.
    pub params: RouteParams,

    /// Extra async checks attached to the resolved route.
    pub preconditions: Vec<Arc<dyn RoutePrecondition>>,

    /// The path being navigated away from (if any).
    pub from: Option<String>,
}

impl RouteIntent {
    /// Create an intent for `full_path` with default metadata
    /// (authentication required, no admin requirement, no title).
    pub fn new(full_path: impl Into<String>) -> Self {
        let full_path = full_path.into();
        let (path, query) = split_location(&full_path);
        let path = if path.is_empty() { "/" } else { path }.to_string();
        let query = QueryParams::from_query_string(query);

        Self {
            id: NavigationId::next(),
            path,
            full_path: full_path.split('#').next().unwrap_or_default().to_string(),
            query,
            name: None,
            meta: RouteMeta::default(),
            params: RouteParams::new(),
            preconditions: Vec::new(),
            from: None,
        }
    }

    /// Set the route metadata.
    pub fn with_meta(mut self, meta: RouteMeta) -> Self {
        self.meta = meta;
        self
    }

    /// Set the route name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the source path.
    pub fn with_from(mut self, from: impl Into<String>) -> Self {
        self.from = Some(from.into());
        self
    }

    /// Set the captured route parameters.
    pub fn with_params(mut self, params: RouteParams) -> Self {
        self.params = params;
        self
    }

    /// Attach an async precondition.
    pub fn with_precondition(mut self, precondition: Arc<dyn RoutePrecondition>) -> Self {
        self.preconditions.push(precondition);
        self
    }
}

impl std::fmt::Debug for RouteIntent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteIntent")
            .field("id", &self.id)
            .field("full_path", &self.full_path)
            .field("name", &self.name)
            .field("meta", &self.meta)
            .field("from", &self.from)
            .field(
                "preconditions",
                &self.preconditions.iter().map(|p| p.name()).collect::<Vec<_>>(),
            )
            .finish_non_exhaustive()
    }
}
