//! Global navigation loading indicator state.
//!
//! [`NavigationLoadingTracker`] counts in-flight navigations. Observers only
//! hear about the edges: [`LoadingEdge::Began`] when the count leaves zero and
//! [`LoadingEdge::Ended`] when it returns to zero. A burst of overlapping
//! navigations therefore shows the indicator once and hides it once.
//!
//! ```
//! use std::sync::{Arc, Mutex};
//! use navigation_orchestrator::{LoadingEdge, NavigationLoadingTracker};
//!
//! let tracker = NavigationLoadingTracker::new();
//! let edges = Arc::new(Mutex::new(Vec::new()));
//! let sink = edges.clone();
//! tracker.subscribe(move |edge| sink.lock().unwrap().push(edge));
//!
//! tracker.start_navigation();
//! tracker.start_navigation();
//! tracker.end_navigation();
//! tracker.end_navigation();
//!
//! assert_eq!(*edges.lock().unwrap(), vec![LoadingEdge::Began, LoadingEdge::Ended]);
//! assert!(!tracker.is_loading());
//! ```

use crate::{debug_log, trace_log};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// A loading state transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadingEdge {
    /// The first navigation of a burst started.
    Began,
    /// The last in-flight navigation settled.
    Ended,
}

type Observer = Arc<dyn Fn(LoadingEdge) + Send + Sync>;

#[derive(Default)]
struct TrackerState {
    in_flight: usize,
    observers: Vec<Observer>,
}

/// Counter of in-flight navigations with edge notifications.
///
/// Create one per process and share it; the indicator component subscribes
/// to it, the orchestrator drives it.
#[derive(Default)]
pub struct NavigationLoadingTracker {
    state: Mutex<TrackerState>,
}

impl NavigationLoadingTracker {
    /// Create an idle tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an observer for loading edges.
    ///
    /// Observers run synchronously on the thread that caused the edge, after
    /// the counter has been updated.
    pub fn subscribe<F>(&self, observer: F)
    where
        F: Fn(LoadingEdge) + Send + Sync + 'static,
    {
        self.lock().observers.push(Arc::new(observer));
    }

    /// A navigation started.
    pub fn start_navigation(&self) {
        let notify = {
            let mut state = self.lock();
            state.in_flight += 1;
            trace_log!("Navigation started ({} in flight)", state.in_flight);
            (state.in_flight == 1).then(|| state.observers.clone())
        };

        if let Some(observers) = notify {
            debug_log!("Navigation loading began");
            for observer in observers {
                observer(LoadingEdge::Began);
            }
        }
    }

    /// A navigation settled. No-op when nothing is in flight.
    pub fn end_navigation(&self) {
        let notify = {
            let mut state = self.lock();
            if state.in_flight == 0 {
                trace_log!("end_navigation with nothing in flight; ignored");
                return;
            }
            state.in_flight -= 1;
            trace_log!("Navigation ended ({} in flight)", state.in_flight);
            (state.in_flight == 0).then(|| state.observers.clone())
        };

        if let Some(observers) = notify {
            debug_log!("Navigation loading ended");
            for observer in observers {
                observer(LoadingEdge::Ended);
            }
        }
    }

    /// `true` while at least one navigation is in flight.
    pub fn is_loading(&self) -> bool {
        self.in_flight() > 0
    }

    /// Number of in-flight navigations.
    pub fn in_flight(&self) -> usize {
        self.lock().in_flight
    }

    fn lock(&self) -> MutexGuard<'_, TrackerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for NavigationLoadingTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("NavigationLoadingTracker")
            .field("in_flight", &state.in_flight)
            .field("observers", &state.observers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorded(tracker: &NavigationLoadingTracker) -> Arc<Mutex<Vec<LoadingEdge>>> {
        let edges = Arc::new(Mutex::new(Vec::new()));
        let sink = edges.clone();
        tracker.subscribe(move |edge| sink.lock().unwrap().push(edge));
        edges
    }

    #[test]
    fn test_overlapping_navigations_produce_one_pair() {
        let tracker = NavigationLoadingTracker::new();
        let edges = recorded(&tracker);

        tracker.start_navigation();
        tracker.start_navigation();
        assert_eq!(tracker.in_flight(), 2);
        tracker.end_navigation();
        assert!(tracker.is_loading());
        tracker.end_navigation();

        assert_eq!(tracker.in_flight(), 0);
        assert_eq!(
            *edges.lock().unwrap(),
            vec![LoadingEdge::Began, LoadingEdge::Ended]
        );
    }

    #[test]
    fn test_unmatched_end_is_clamped() {
        let tracker = NavigationLoadingTracker::new();
        let edges = recorded(&tracker);

        tracker.end_navigation();
        assert_eq!(tracker.in_flight(), 0);
        assert!(edges.lock().unwrap().is_empty());

        tracker.start_navigation();
        tracker.end_navigation();
        tracker.end_navigation();
        assert_eq!(tracker.in_flight(), 0);
        assert_eq!(edges.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_each_burst_signals_again() {
        let tracker = NavigationLoadingTracker::new();
        let edges = recorded(&tracker);

        for _ in 0..3 {
            tracker.start_navigation();
            tracker.end_navigation();
        }
        assert_eq!(edges.lock().unwrap().len(), 6);
    }

    #[test]
    fn test_observer_may_query_tracker() {
        let tracker = Arc::new(NavigationLoadingTracker::new());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let (sink, inner) = (seen.clone(), Arc::downgrade(&tracker));
        tracker.subscribe(move |_| {
            if let Some(t) = inner.upgrade() {
                sink.lock().unwrap().push(t.is_loading());
            }
        });

        tracker.start_navigation();
        tracker.end_navigation();
        assert_eq!(*seen.lock().unwrap(), vec![true, false]);
    }

    #[test]
    fn test_multiple_observers() {
        let tracker = NavigationLoadingTracker::new();
        let a = recorded(&tracker);
        let b = recorded(&tracker);
        tracker.start_navigation();
        assert_eq!(a.lock().unwrap().len(), 1);
        assert_eq!(b.lock().unwrap().len(), 1);
    }
}
