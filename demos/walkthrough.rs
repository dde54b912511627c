//! Navigation Walkthrough Demo
//!
//! Drives the application route table through a tiny console "router" as a
//! guest, a signed-in user and an administrator, then simulates a stale
//! deployment to show the reload policy.
//!
//! Run with `RUST_LOG=debug cargo run --example walkthrough` to see the
//! orchestrator's own logs.

use futures::future::{self, BoxFuture, FutureExt};
use navigation_orchestrator::{
    AuthProvider, Decision, IdleQueue, LoadError, ModuleLoader, NavigationError,
    NavigationHooks, NavigationOrchestrator, PageReloader, PageTitle, PublicSettings,
    RouteRecord, SettingsCache, StaticSettings,
};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

// ============================================================================
// Console collaborators
// ============================================================================

const GUEST: u8 = 0;
const USER: u8 = 1;
const ADMIN: u8 = 2;

struct Session(AtomicU8);

impl Session {
    fn set_role(&self, role: u8) {
        self.0.store(role, Ordering::SeqCst);
    }
}

impl AuthProvider for Session {
    fn is_authenticated(&self) -> bool {
        self.0.load(Ordering::SeqCst) != GUEST
    }

    fn is_admin(&self) -> bool {
        self.0.load(Ordering::SeqCst) == ADMIN
    }

    fn check_auth(&self) {
        println!("  (restoring session from storage)");
    }
}

struct ConsoleTitle;

impl PageTitle for ConsoleTitle {
    fn set_title(&self, title: &str) {
        println!("  document.title = {:?}", title);
    }
}

struct ConsoleReloader;

impl PageReloader for ConsoleReloader {
    fn reload(&self) {
        println!("  window.location.reload()");
    }
}

struct ConsoleLoader;

impl ModuleLoader for ConsoleLoader {
    fn load(&self, route: &RouteRecord) -> BoxFuture<'static, Result<(), LoadError>> {
        println!("  prefetching chunk for {}", route.path);
        future::ready(Ok(())).boxed()
    }
}

// ============================================================================
// Router loop
// ============================================================================

async fn navigate(router: &NavigationOrchestrator, location: &str) {
    let mut target = location.to_string();
    for _ in 0..5 {
        let Some(intent) = router.intent(&target, None) else {
            println!("  no route for {}", target);
            return;
        };
        match router.on_before(&intent).await {
            Decision::Proceed => {
                router.on_after(&intent);
                println!("  rendered {}", intent.full_path);
                return;
            }
            redirect => {
                let next = redirect.location().unwrap_or_default();
                println!("  {} -> {}", target, next);
                target = next;
            }
        }
    }
    println!("  gave up after too many redirects");
}

fn main() {
    env_logger::init();

    let session = Arc::new(Session(AtomicU8::new(GUEST)));
    let settings = Arc::new(SettingsCache::new(Arc::new(StaticSettings::new(
        PublicSettings {
            site_name: "DreamStudio".into(),
            user_custom_key_enabled: false,
            ..Default::default()
        },
    ))));
    let idle = Arc::new(IdleQueue::new());

    let router = match NavigationOrchestrator::builder()
        .auth(session.clone())
        .settings(settings)
        .title(Arc::new(ConsoleTitle))
        .reloader(Arc::new(ConsoleReloader))
        .module_loader(Arc::new(ConsoleLoader))
        .idle_scheduler(idle.clone())
        .build()
    {
        Ok(router) => router,
        Err(err) => {
            eprintln!("invalid setup: {}", err);
            return;
        }
    };

    router.loading().subscribe(|edge| println!("  [loading: {:?}]", edge));

    pollster::block_on(async {
        println!("Guest opens /dashboard");
        navigate(&router, "/dashboard").await;

        println!("\nUser signs in and opens /login, then /api-settings");
        session.set_role(USER);
        navigate(&router, "/login").await;
        navigate(&router, "/api-settings").await;

        println!("\nUser tries /admin/users");
        navigate(&router, "/admin/users").await;

        println!("\nAdministrator opens /admin");
        session.set_role(ADMIN);
        navigate(&router, "/admin").await;

        println!("\nBrowser goes idle");
        idle.run_pending().await;
        if let Some(stats) = router.prefetch_stats() {
            println!("  prefetch stats: {:?}", stats);
        }

        println!("\nA new build was deployed; the next chunk is gone");
        let error = NavigationError::new("Failed to fetch dynamically imported module: /assets/AdminUsers-1a2b.js");
        for attempt in 1..=2 {
            if let Some(intent) = router.intent("/admin/users", None) {
                if router.on_before(&intent).await.is_proceed() {
                    let outcome = router.on_error(&intent, &error);
                    println!("  attempt {}: {:?}", attempt, outcome);
                }
            }
        }
    });
}
