//! Idle-time prefetching of likely next routes.
//!
//! After a navigation completes, [`PrefetchScheduler`] guesses which routes
//! the user will open next and asks the host to load their modules when the
//! main thread is idle. The guess is either an explicit adjacency list from
//! [`PrefetchConfig`] or, when the current route has none, its siblings in the
//! [`RouteTable`] (see [`RouteTable::siblings_of`]).
//!
//! Loads are issued from the idle task, not when the navigation completes.
//! Scheduled routes are remembered in a bounded LRU ledger (the [`lru`] crate)
//! so repeated navigations do not reload them. A failed load, or one whose
//! idle task was dropped before it finished, leaves the ledger, so a later
//! navigation retries it.
//!
//! Gated behind the `prefetch` feature.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use futures::future::{self, BoxFuture, FutureExt};
//! use navigation_orchestrator::config::PrefetchConfig;
//! use navigation_orchestrator::error::LoadError;
//! use navigation_orchestrator::prefetch::{IdleQueue, ModuleLoader, PrefetchScheduler};
//! use navigation_orchestrator::{RouteMeta, RouteRecord, RouteTable};
//!
//! struct NoopLoader;
//!
//! impl ModuleLoader for NoopLoader {
//!     fn load(&self, _route: &RouteRecord) -> BoxFuture<'static, Result<(), LoadError>> {
//!         future::ready(Ok(())).boxed()
//!     }
//! }
//!
//! let mut table = RouteTable::new();
//! table
//!     .add(RouteRecord::new("/dashboard").name("Dashboard"))
//!     .add(RouteRecord::new("/assets").name("Assets"))
//!     .add(RouteRecord::new("/profile").name("Profile"));
//! let table = Arc::new(table);
//!
//! let idle = Arc::new(IdleQueue::new());
//! let scheduler = PrefetchScheduler::new(
//!     table.clone(),
//!     Arc::new(NoopLoader),
//!     idle.clone(),
//!     &PrefetchConfig::default(),
//! );
//!
//! let current = table.intent("/dashboard", None).unwrap();
//! assert_eq!(scheduler.trigger_prefetch(&current), 2);
//!
//! pollster::block_on(idle.run_pending());
//! assert_eq!(scheduler.stats().loaded, 2);
//! ```

use crate::config::PrefetchConfig;
use crate::error::LoadError;
use crate::intent::RouteIntent;
use crate::routes::{RouteRecord, RouteTable};
use crate::{debug_log, trace_log};
use futures::future::{join_all, BoxFuture, FutureExt};
use lru::LruCache;
use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

// ============================================================================
// Host collaborators
// ============================================================================

/// Loads the code module behind a route (a code-split chunk in a browser).
///
/// Called from inside the idle task, never from the navigation itself.
pub trait ModuleLoader: Send + Sync + 'static {
    /// Start loading the module for `route`.
    fn load(&self, route: &RouteRecord) -> BoxFuture<'static, Result<(), LoadError>>;
}

/// Runs low-priority work when the host is idle.
pub trait IdleScheduler: Send + Sync + 'static {
    /// Queue `task`. The scheduler owns it from here on.
    fn request_idle(&self, task: BoxFuture<'static, ()>);
}

/// An [`IdleScheduler`] that queues tasks until the host drains them.
///
/// Useful for hosts with their own idle loop and for tests.
#[derive(Default)]
pub struct IdleQueue {
    tasks: Mutex<Vec<BoxFuture<'static, ()>>>,
}

impl IdleQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of queued tasks.
    pub fn pending(&self) -> usize {
        self.lock().len()
    }

    /// Take every queued task.
    pub fn drain(&self) -> Vec<BoxFuture<'static, ()>> {
        std::mem::take(&mut *self.lock())
    }

    /// Run every queued task to completion.
    pub async fn run_pending(&self) {
        let tasks = self.drain();
        join_all(tasks).await;
    }

    fn lock(&self) -> MutexGuard<'_, Vec<BoxFuture<'static, ()>>> {
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl IdleScheduler for IdleQueue {
    fn request_idle(&self, task: BoxFuture<'static, ()>) {
        self.lock().push(task);
    }
}

impl std::fmt::Debug for IdleQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdleQueue")
            .field("pending", &self.pending())
            .finish()
    }
}

// ============================================================================
// Stats
// ============================================================================

/// Counters describing prefetch activity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PrefetchStats {
    /// Routes handed to the loader.
    pub scheduled: usize,
    /// Loads that completed.
    pub loaded: usize,
    /// Loads that failed.
    pub failed: usize,
    /// Routes whose idle task was dropped before their load finished.
    pub cancelled: usize,
}

impl PrefetchStats {
    /// Fraction of finished loads that succeeded, in `0.0..=1.0`.
    ///
    /// Returns `0.0` if nothing has finished yet.
    #[allow(clippy::cast_precision_loss)]
    pub fn success_rate(&self) -> f64 {
        let finished = self.loaded + self.failed;
        if finished == 0 {
            0.0
        } else {
            self.loaded as f64 / finished as f64
        }
    }

    /// Loads scheduled but not yet finished or cancelled.
    pub fn outstanding(&self) -> usize {
        self.scheduled
            .saturating_sub(self.loaded + self.failed + self.cancelled)
    }
}

struct PrefetchState {
    ledger: LruCache<String, ()>,
    stats: PrefetchStats,
}

// ============================================================================
// PrefetchScheduler
// ============================================================================

/// Schedules idle-time loads of likely next routes.
pub struct PrefetchScheduler {
    table: Arc<RouteTable>,
    loader: Arc<dyn ModuleLoader>,
    idle: Arc<dyn IdleScheduler>,
    max_targets: usize,
    adjacency: HashMap<String, Vec<String>>,
    state: Arc<Mutex<PrefetchState>>,
}

impl PrefetchScheduler {
    /// Create a scheduler over `table`.
    pub fn new(
        table: Arc<RouteTable>,
        loader: Arc<dyn ModuleLoader>,
        idle: Arc<dyn IdleScheduler>,
        config: &PrefetchConfig,
    ) -> Self {
        let capacity = NonZeroUsize::new(config.ledger_capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            table,
            loader,
            idle,
            max_targets: config.max_targets,
            adjacency: config.adjacency.clone(),
            state: Arc::new(Mutex::new(PrefetchState {
                ledger: LruCache::new(capacity),
                stats: PrefetchStats::default(),
            })),
        }
    }

    /// Queue loads for the routes likely to follow `current`.
    ///
    /// Returns how many routes were scheduled. Never waits on the loads.
    pub fn trigger_prefetch(&self, current: &RouteIntent) -> usize {
        let targets = {
            let mut state = lock(&self.state);
            let targets: Vec<Arc<RouteRecord>> = self
                .candidates(current)
                .into_iter()
                .filter_map(|record| {
                    let name = record.name.clone()?;
                    (!state.ledger.contains(&name)).then_some(record)
                })
                .take(self.max_targets)
                .collect();

            for record in &targets {
                if let Some(name) = &record.name {
                    state.ledger.put(name.clone(), ());
                }
            }
            state.stats.scheduled += targets.len();
            targets
        };

        if targets.is_empty() {
            trace_log!("Nothing to prefetch after '{}'", current.path);
            return 0;
        }

        debug_log!(
            "Prefetching {} route(s) after '{}': {:?}",
            targets.len(),
            current.path,
            targets.iter().map(|r| r.path.as_str()).collect::<Vec<_>>()
        );

        let count = targets.len();
        let loader = Arc::clone(&self.loader);
        let mut pending = PendingLoads {
            state: Arc::clone(&self.state),
            names: targets
                .iter()
                .filter_map(|record| record.name.clone())
                .collect(),
        };
        let task = async move {
            let loads = targets.iter().map(|record| {
                let name = record.name.clone().unwrap_or_default();
                loader.load(record).map(move |result| (name, result))
            });
            for (name, result) in join_all(loads).await {
                pending.finish(&name, result);
            }
        };

        self.idle.request_idle(task.boxed());
        count
    }

    /// Likely next routes for `current`, before ledger filtering.
    ///
    /// Explicit adjacency wins over sibling discovery. The current route and
    /// anything that cannot be prefetched (dynamic, catch-all, redirect,
    /// unnamed) are excluded.
    pub fn candidates(&self, current: &RouteIntent) -> Vec<Arc<RouteRecord>> {
        let record = match &current.name {
            Some(name) => self.table.by_name(name).cloned(),
            None => self.table.resolve(&current.path).map(|resolved| resolved.record),
        };
        let Some(record) = record else {
            trace_log!("No route record for '{}'; skipping prefetch", current.path);
            return Vec::new();
        };

        let adjacent = record
            .name
            .as_ref()
            .and_then(|name| self.adjacency.get(name));

        let candidates: Vec<Arc<RouteRecord>> = match adjacent {
            Some(names) => names
                .iter()
                .filter_map(|name| {
                    let found = self.table.by_name(name).cloned();
                    if found.is_none() {
                        debug_log!("Prefetch rule names unknown route '{}'", name);
                    }
                    found
                })
                .collect(),
            None => self.table.siblings_of(&record),
        };

        candidates
            .into_iter()
            .filter(|candidate| candidate.is_prefetchable() && candidate.path != record.path)
            .collect()
    }

    /// `true` if `name` is in the ledger.
    pub fn is_prefetched(&self, name: &str) -> bool {
        lock(&self.state).ledger.contains(name)
    }

    /// Snapshot of the counters.
    pub fn stats(&self) -> PrefetchStats {
        lock(&self.state).stats
    }
}

impl std::fmt::Debug for PrefetchScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = lock(&self.state);
        f.debug_struct("PrefetchScheduler")
            .field("max_targets", &self.max_targets)
            .field("ledger", &state.ledger.len())
            .field("stats", &state.stats)
            .finish_non_exhaustive()
    }
}

/// Routes of one idle task that have not finished loading.
///
/// Dropping the task before it completes (a cancelled idle callback) releases
/// the unfinished routes from the ledger so a later navigation schedules them
/// again.
struct PendingLoads {
    state: Arc<Mutex<PrefetchState>>,
    names: Vec<String>,
}

impl PendingLoads {
    fn finish(&mut self, name: &str, result: Result<(), LoadError>) {
        self.names.retain(|pending| pending != name);
        let mut state = lock(&self.state);
        match result {
            Ok(()) => {
                trace_log!("Prefetched route '{}'", name);
                state.stats.loaded += 1;
            }
            Err(error) => {
                debug_log!("Prefetch failed: {}", error);
                state.stats.failed += 1;
                state.ledger.pop(name);
            }
        }
    }
}

impl Drop for PendingLoads {
    fn drop(&mut self) {
        if self.names.is_empty() {
            return;
        }
        debug_log!("Prefetch of {:?} cancelled before completion", self.names);
        let mut state = lock(&self.state);
        for name in self.names.drain(..) {
            state.ledger.pop(&name);
            state.stats.cancelled += 1;
        }
    }
}

fn lock(state: &Mutex<PrefetchState>) -> MutexGuard<'_, PrefetchState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::RouteMeta;
    use futures::future;
    use std::collections::HashSet;

    /// Loader that fails for a fixed set of route names.
    #[derive(Default)]
    struct FakeLoader {
        failing: Mutex<HashSet<String>>,
        calls: Mutex<Vec<String>>,
    }

    impl FakeLoader {
        fn fail(&self, name: &str) {
            self.failing.lock().unwrap().insert(name.to_string());
        }

        fn heal(&self, name: &str) {
            self.failing.lock().unwrap().remove(name);
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl ModuleLoader for FakeLoader {
        fn load(&self, route: &RouteRecord) -> BoxFuture<'static, Result<(), LoadError>> {
            let name = route.name.clone().unwrap_or_default();
            self.calls.lock().unwrap().push(name.clone());
            let result = if self.failing.lock().unwrap().contains(&name) {
                Err(LoadError::new(&route.path, "network error"))
            } else {
                Ok(())
            };
            future::ready(result).boxed()
        }
    }

    fn table() -> Arc<RouteTable> {
        let mut table = RouteTable::new();
        table
            .add(RouteRecord::new("/login").name("Login").meta(RouteMeta::public()))
            .add(RouteRecord::new("/dashboard").name("Dashboard"))
            .add(RouteRecord::new("/assets").name("Assets"))
            .add(RouteRecord::new("/ai-image").name("AiImage"))
            .add(RouteRecord::new("/ai-video").name("AiVideo"))
            .add(RouteRecord::new("/profile").name("Profile"))
            .add(RouteRecord::new("/tasks/:id").name("TaskDetail"))
            .add(RouteRecord::redirect("/gallery", "/assets"))
            .add(RouteRecord::new("/admin/dashboard").name("AdminDashboard").meta(RouteMeta::admin()))
            .add(RouteRecord::new("/admin/users").name("AdminUsers").meta(RouteMeta::admin()))
            .add(RouteRecord::new("/admin/ops").name("AdminOps").meta(RouteMeta::admin()))
            .add(RouteRecord::new("/*pathMatch").name("NotFound"));
        Arc::new(table)
    }

    fn scheduler(config: &PrefetchConfig) -> (PrefetchScheduler, Arc<FakeLoader>, Arc<IdleQueue>, Arc<RouteTable>) {
        let table = table();
        let loader = Arc::new(FakeLoader::default());
        let idle = Arc::new(IdleQueue::new());
        let scheduler = PrefetchScheduler::new(table.clone(), loader.clone(), idle.clone(), config);
        (scheduler, loader, idle, table)
    }

    fn names(records: &[Arc<RouteRecord>]) -> Vec<&str> {
        records.iter().filter_map(|r| r.name.as_deref()).collect()
    }

    #[test]
    fn test_siblings_exclude_current_dynamic_and_redirects() {
        let config = PrefetchConfig {
            max_targets: 10,
            ..Default::default()
        };
        let (scheduler, _, _, table) = scheduler(&config);
        let current = table.intent("/dashboard", None).unwrap();

        let candidates = scheduler.candidates(&current);
        assert_eq!(
            names(&candidates),
            vec!["Assets", "AiImage", "AiVideo", "Profile"]
        );
    }

    #[test]
    fn test_admin_siblings_share_prefix() {
        let (scheduler, _, _, table) = scheduler(&PrefetchConfig::default());
        let current = table.intent("/admin/users", None).unwrap();
        assert_eq!(
            names(&scheduler.candidates(&current)),
            vec!["AdminDashboard", "AdminOps"]
        );
    }

    #[test]
    fn test_adjacency_overrides_siblings() {
        let mut config = PrefetchConfig::default();
        config.adjacency.insert(
            "Dashboard".into(),
            vec!["AiVideo".into(), "TaskDetail".into(), "Missing".into(), "Dashboard".into()],
        );
        let (scheduler, _, _, table) = scheduler(&config);
        let current = table.intent("/dashboard", None).unwrap();

        assert_eq!(names(&scheduler.candidates(&current)), vec!["AiVideo"]);
    }

    #[test]
    fn test_trigger_limits_and_queues_one_task() {
        let (scheduler, loader, idle, table) = scheduler(&PrefetchConfig::default());
        let current = table.intent("/dashboard", None).unwrap();

        assert_eq!(scheduler.trigger_prefetch(&current), 3);
        assert_eq!(idle.pending(), 1);
        assert_eq!(scheduler.stats().outstanding(), 3);

        pollster::block_on(idle.run_pending());
        assert_eq!(loader.calls(), vec!["Assets", "AiImage", "AiVideo"]);
        let stats = scheduler.stats();
        assert_eq!(stats.loaded, 3);
        assert_eq!(stats.outstanding(), 0);
        assert!((stats.success_rate() - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_loader_untouched_until_idle() {
        let (scheduler, loader, idle, table) = scheduler(&PrefetchConfig::default());
        let current = table.intent("/dashboard", None).unwrap();

        scheduler.trigger_prefetch(&current);
        assert!(loader.calls().is_empty());

        pollster::block_on(idle.run_pending());
        assert_eq!(loader.calls().len(), 3);
    }

    #[test]
    fn test_dropped_idle_task_releases_ledger() {
        let (scheduler, loader, idle, table) = scheduler(&PrefetchConfig::default());
        let current = table.intent("/dashboard", None).unwrap();

        assert_eq!(scheduler.trigger_prefetch(&current), 3);
        assert!(scheduler.is_prefetched("Assets"));
        drop(idle.drain());

        assert!(!scheduler.is_prefetched("Assets"));
        let stats = scheduler.stats();
        assert_eq!(stats.cancelled, 3);
        assert_eq!(stats.outstanding(), 0);

        assert_eq!(scheduler.trigger_prefetch(&current), 3);
        pollster::block_on(idle.run_pending());
        assert_eq!(loader.calls(), vec!["Assets", "AiImage", "AiVideo"]);
        assert!(scheduler.is_prefetched("Assets"));
    }

    #[test]
    fn test_ledger_skips_already_prefetched() {
        let (scheduler, _, idle, table) = scheduler(&PrefetchConfig::default());
        let current = table.intent("/dashboard", None).unwrap();

        scheduler.trigger_prefetch(&current);
        pollster::block_on(idle.run_pending());
        assert!(scheduler.is_prefetched("Assets"));

        assert_eq!(scheduler.trigger_prefetch(&current), 1);
        assert!(scheduler.is_prefetched("Profile"));

        assert_eq!(scheduler.trigger_prefetch(&current), 0);
        assert_eq!(idle.pending(), 1);
    }

    #[test]
    fn test_failed_load_is_retried_later() {
        let (scheduler, loader, idle, table) = scheduler(&PrefetchConfig {
            max_targets: 1,
            ..Default::default()
        });
        loader.fail("Assets");
        let current = table.intent("/dashboard", None).unwrap();

        assert_eq!(scheduler.trigger_prefetch(&current), 1);
        assert!(scheduler.is_prefetched("Assets"));
        pollster::block_on(idle.run_pending());

        assert!(!scheduler.is_prefetched("Assets"));
        assert_eq!(scheduler.stats().failed, 1);

        loader.heal("Assets");
        assert_eq!(scheduler.trigger_prefetch(&current), 1);
        pollster::block_on(idle.run_pending());
        assert!(scheduler.is_prefetched("Assets"));
        assert_eq!(loader.calls(), vec!["Assets", "Assets"]);
    }

    #[test]
    fn test_ledger_is_bounded() {
        let (scheduler, _, idle, table) = scheduler(&PrefetchConfig {
            max_targets: 10,
            ledger_capacity: 2,
            ..Default::default()
        });
        let current = table.intent("/dashboard", None).unwrap();

        assert_eq!(scheduler.trigger_prefetch(&current), 4);
        pollster::block_on(idle.run_pending());
        assert!(!scheduler.is_prefetched("Assets"));
        assert!(scheduler.is_prefetched("Profile"));
    }

    #[test]
    fn test_unknown_route_prefetches_nothing() {
        let mut table = RouteTable::new();
        table.add(RouteRecord::new("/only").name("Only"));
        let idle = Arc::new(IdleQueue::new());
        let scheduler = PrefetchScheduler::new(
            Arc::new(table),
            Arc::new(FakeLoader::default()),
            idle.clone(),
            &PrefetchConfig::default(),
        );

        assert_eq!(scheduler.trigger_prefetch(&RouteIntent::new("/elsewhere")), 0);
        assert_eq!(scheduler.trigger_prefetch(&RouteIntent::new("/only")), 0);
        assert_eq!(idle.pending(), 0);
    }
}
