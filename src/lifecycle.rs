//! Navigation decisions and the hook interface the host router drives.
//!
//! - [`Decision`] — what the gate answers for a navigation attempt.
//! - [`NavigationPhase`] — where an attempt is in its lifecycle.
//! - [`NavigationHooks`] — the three callbacks a host router invokes. The
//!   orchestrator implements this trait and exposes nothing else to views.
//!
//! # Navigation pipeline
//!
//! ```text
//! host router ──on_before──▶ Pending ──▶ Proceeding ──on_after──▶ Settled
//!                                 │            │
//!                                 │            └──on_error──▶ Settled
//!                                 └──▶ Redirecting ──▶ Settled
//! ```
//!
//! A redirect settles the attempt immediately; the host then starts a new
//! navigation to the redirect location, which runs `on_before` again.

use crate::error::NavigationError;
use crate::intent::RouteIntent;
use crate::params::QueryParams;
use crate::recovery::RecoveryOutcome;
use async_trait::async_trait;

// ============================================================================
// Decision
// ============================================================================

/// Gate verdict for one navigation attempt.
///
/// # Example
///
/// ```
/// use navigation_orchestrator::{Decision, QueryParams};
///
/// let decision = Decision::redirect_with_query(
///     "/login",
///     QueryParams::new().with("redirect", "/dashboard"),
/// );
/// assert!(decision.is_redirect());
/// assert_eq!(decision.location().as_deref(), Some("/login?redirect=/dashboard"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Let the navigation continue to its target.
    Proceed,

    /// Abandon the target and navigate to `to` instead.
    Redirect {
        /// Redirect path.
        to: String,
        /// Query to append to the redirect path.
        query: QueryParams,
        /// Why the gate redirected, for logs.
        reason: Option<String>,
    },
}

impl Decision {
    /// Allow the navigation.
    pub fn proceed() -> Self {
        Self::Proceed
    }

    /// Redirect to `to` without a query.
    pub fn redirect(to: impl Into<String>) -> Self {
        Self::Redirect {
            to: to.into(),
            query: QueryParams::new(),
            reason: None,
        }
    }

    /// Redirect to `to` with a query.
    pub fn redirect_with_query(to: impl Into<String>, query: QueryParams) -> Self {
        Self::Redirect {
            to: to.into(),
            query,
            reason: None,
        }
    }

    /// Attach a reason to a redirect. No effect on [`Decision::Proceed`].
    pub fn because(self, why: impl Into<String>) -> Self {
        match self {
            Self::Redirect { to, query, .. } => Self::Redirect {
                to,
                query,
                reason: Some(why.into()),
            },
            proceed @ Self::Proceed => proceed,
        }
    }

    /// `true` for [`Decision::Proceed`].
    pub fn is_proceed(&self) -> bool {
        matches!(self, Self::Proceed)
    }

    /// `true` for [`Decision::Redirect`].
    pub fn is_redirect(&self) -> bool {
        matches!(self, Self::Redirect { .. })
    }

    /// The redirect path (without query), if redirecting.
    pub fn redirect_path(&self) -> Option<&str> {
        match self {
            Self::Redirect { to, .. } => Some(to.as_str()),
            Self::Proceed => None,
        }
    }

    /// The full redirect location (`path?query`), if redirecting.
    pub fn location(&self) -> Option<String> {
        match self {
            Self::Redirect { to, query, .. } if query.is_empty() => Some(to.clone()),
            Self::Redirect { to, query, .. } => Some(format!("{}?{}", to, query.to_query_string())),
            Self::Proceed => None,
        }
    }
}

// ============================================================================
// NavigationPhase
// ============================================================================

/// Lifecycle position of a single navigation attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationPhase {
    /// Guards are running.
    Pending,
    /// Guards passed; the host is resolving the view.
    Proceeding,
    /// Guards redirected elsewhere.
    Redirecting,
    /// Finished; the loading counter has been released.
    Settled,
}

// ============================================================================
// NavigationHooks
// ============================================================================

/// Callbacks a host router invokes around every navigation.
///
/// Contract for hosts:
///
/// - call [`on_before`](Self::on_before) once per attempt and honour its
///   [`Decision`]; dropping the returned future early counts as abandoning
///   the attempt.
/// - after a [`Decision::Proceed`], call exactly one of
///   [`on_after`](Self::on_after) (view resolved, or the attempt was
///   superseded) or [`on_error`](Self::on_error) (view failed to resolve).
/// - never call `on_after`/`on_error` for a redirected attempt. Doing so is
///   harmless; the attempt is already settled.
#[async_trait]
pub trait NavigationHooks: Send + Sync {
    /// Decide whether `intent` may proceed. May suspend on async guards.
    async fn on_before(&self, intent: &RouteIntent) -> Decision;

    /// The navigation finished (successfully or superseded).
    fn on_after(&self, intent: &RouteIntent);

    /// Resolving the navigation's view failed.
    fn on_error(&self, intent: &RouteIntent, error: &NavigationError) -> RecoveryOutcome;
}

// ============================================================================
// Tests
// ============================================================================
