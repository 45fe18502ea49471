//! Example demonstrating the registry's trace events.
//!
//! Run with pretty logging (development):
//! ```bash
//! cargo run --example logging --features logging-pretty
//! ```
//!
//! Run with JSON logging (production):
//! ```bash
//! cargo run --example logging --features logging-json
//! ```

use bindery::{BeanRegistry, Binding, TypeKey};

struct Database {
    url: String,
}

trait Health: Send + Sync {
    fn healthy(&self) -> bool;
}

impl Health for Database {
    fn healthy(&self) -> bool {
        !self.url.is_empty()
    }
}

fn main() {
    // Default setup: JSON if logging-json is enabled, pretty otherwise.
    bindery::logging::init();

    println!("=== Bindery Logging Demo ===\n");

    let registry = BeanRegistry::new();

    // logs: "declaring binding"
    registry.declare_binding(
        Binding::singleton(|| Database {
            url: "postgres://localhost/mydb".into(),
        })
        .implements::<dyn Health>(|db| db),
    );

    let db = registry.resolve::<Database>().unwrap();
    println!("resolved database at {}", db.url);

    // logs: "using compatible binding"
    let health = registry.resolve::<dyn Health>().unwrap();
    println!("health check: {}", health.healthy());

    // logs: "no binding found"
    let missing = registry.try_resolve::<u32>();
    assert!(missing.is_none());

    // logs: "remove requested for unknown binding"
    registry.remove(&TypeKey::of::<String>());

    // logs: "binding removed"
    registry.remove(&TypeKey::of::<Database>());

    println!("\n=== Demo Complete ===");
    println!("Check the log output above to see the registry's trace events.");
}
