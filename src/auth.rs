//! Read-only view of the authentication store.
//!
//! The orchestrator never owns session state. It asks an [`AuthProvider`] two
//! synchronous questions per navigation and, exactly once per process, asks it
//! to rehydrate from persisted session data.

/// Authentication state consumed by the navigation gate.
///
/// Implementations wrap whatever store the application uses. All methods are
/// synchronous; any async session refresh happens outside the router.
pub trait AuthProvider: Send + Sync + 'static {
    /// Whether a user session is active.
    fn is_authenticated(&self) -> bool;

    /// Whether the active user has the admin role.
    fn is_admin(&self) -> bool;

    /// Restore state from persisted session data (e.g. after a page refresh).
    ///
    /// Called once, before the first navigation is evaluated. Must be
    /// idempotent.
    fn check_auth(&self);
}

/// Auth state captured at the moment a navigation is evaluated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AuthSnapshot {
    /// A user session is active.
    pub is_authenticated: bool,
    /// The user is an administrator.
    pub is_admin: bool,
}

impl AuthSnapshot {
    /// Read both flags from `provider`.
    pub fn capture(provider: &dyn AuthProvider) -> Self {
        Self {
            is_authenticated: provider.is_authenticated(),
            is_admin: provider.is_admin(),
        }
    }

    /// No session.
    pub const fn anonymous() -> Self {
        Self {
            is_authenticated: false,
            is_admin: false,
        }
    }

    /// Signed-in regular user.
    pub const fn user() -> Self {
        Self {
            is_authenticated: true,
            is_admin: false,
        }
    }

    /// Signed-in administrator.
    pub const fn admin() -> Self {
        Self {
            is_authenticated: true,
            is_admin: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct Flags {
        authed: AtomicBool,
        admin: AtomicBool,
    }

    impl AuthProvider for Flags {
        fn is_authenticated(&self) -> bool {
            self.authed.load(Ordering::SeqCst)
        }

        fn is_admin(&self) -> bool {
            self.admin.load(Ordering::SeqCst)
        }

        fn check_auth(&self) {}
    }

    #[test]
    fn test_capture_reads_current_flags() {
        let flags = Flags {
            authed: AtomicBool::new(true),
            admin: AtomicBool::new(false),
        };
        assert_eq!(AuthSnapshot::capture(&flags), AuthSnapshot::user());

        flags.admin.store(true, Ordering::SeqCst);
        assert_eq!(AuthSnapshot::capture(&flags), AuthSnapshot::admin());
    }

    #[test]
    fn test_default_is_anonymous() {
        assert_eq!(AuthSnapshot::default(), AuthSnapshot::anonymous());
    }
}
