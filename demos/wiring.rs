//! Example demonstrating a composition root: three services wired through
//! the registry, with constructors resolving their collaborators.
//!
//! ```bash
//! cargo run --example wiring
//! ```

use bindery::BeanRegistry;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

static NEXT_REQUEST: AtomicU64 = AtomicU64::new(1);

struct ConnectionPool {
    url: String,
}

struct UserStore {
    pool: Arc<ConnectionPool>,
}

struct ReportService {
    store: Arc<UserStore>,
    pool: Arc<ConnectionPool>,
}

struct RequestId(u64);

struct MigrationRunner;

fn main() {
    let registry = BeanRegistry::global();

    // Singletons: constructed lazily, each constructor pulls its own
    // dependencies back out of the registry.
    registry.declare(|| ConnectionPool {
        url: "postgres://localhost/app".into(),
    });
    registry.declare(|| UserStore {
        pool: BeanRegistry::global().resolve::<ConnectionPool>().unwrap(),
    });
    registry.declare(|| ReportService {
        store: BeanRegistry::global().resolve::<UserStore>().unwrap(),
        pool: BeanRegistry::global().resolve::<ConnectionPool>().unwrap(),
    });

    // Factory: a fresh value per resolution.
    registry.declare_factory(|| RequestId(NEXT_REQUEST.fetch_add(1, Ordering::SeqCst)));

    // Stack: consumed by its first resolution.
    registry.declare_stack(|| MigrationRunner);

    let reports = registry.resolve::<ReportService>().unwrap();
    println!("report service ready, pool = {}", reports.pool.url);

    // The whole graph shares one pool instance.
    let pool = registry.resolve::<ConnectionPool>().unwrap();
    assert!(Arc::ptr_eq(&reports.pool, &pool));
    assert!(Arc::ptr_eq(&reports.store.pool, &pool));
    println!("one pool shared by every service");

    // Factory bindings hand out fresh values.
    let a = registry.resolve::<RequestId>().unwrap();
    let b = registry.resolve::<RequestId>().unwrap();
    println!("request ids: {} then {}", a.0, b.0);
    assert_ne!(a.0, b.0);

    // Stack bindings disappear after one use.
    let ran = registry.resolve::<MigrationRunner>();
    assert!(ran.is_ok());
    let again = registry.resolve::<MigrationRunner>();
    println!("migrations ran once, second resolution: {:?}", again.err().map(|e| e.to_string()));
}
