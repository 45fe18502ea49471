//! # Bindery - Minimal Dependency-Injection Registry for Rust
//!
//! A small runtime DI registry: bindings map a type key to a construction
//! closure and a lifecycle policy, and an instance cache enforces that
//! policy at resolution time.
//!
//! ## Features
//!
//! - 🗂️ **Explicit bindings** - a binding is a closure plus a lifecycle, nothing discovered by magic
//! - ♻️ **Three lifecycles** - cached singletons, always-fresh factories, one-shot stack bindings
//! - 🔌 **Contract tags** - resolve a `dyn Trait` from a concrete binding tagged as implementing it
//! - 🧵 **Thread-safe** - concurrent first resolutions of a singleton share one build
//! - 💉 **Property injection** - populate a field of an existing value by type-directed lookup
//! - 📊 **Observable** - optional tracing integration with JSON or pretty output
//!
//! ## Quick Start
//!
//! ```rust
//! use bindery::BeanRegistry;
//! use std::sync::Arc;
//!
//! struct Database {
//!     url: String,
//! }
//!
//! struct UserService {
//!     db: Arc<Database>,
//! }
//!
//! // One process-wide handle, so construction closures can resolve their
//! // own collaborators back out of the registry.
//! let registry = BeanRegistry::global();
//!
//! // Declare bindings; singletons are constructed lazily on first use.
//! registry.declare(|| Database {
//!     url: "postgres://localhost".into(),
//! });
//! registry.declare(|| UserService {
//!     db: BeanRegistry::global().resolve::<Database>().unwrap(),
//! });
//!
//! // Resolve - returns Arc<T> for zero-copy sharing.
//! let users = registry.resolve::<UserService>().unwrap();
//! assert_eq!(users.db.url, "postgres://localhost");
//! ```
//!
//! ## Lifecycles
//!
//! ```rust
//! use bindery::BeanRegistry;
//! use std::sync::atomic::{AtomicU64, Ordering};
//!
//! static COUNTER: AtomicU64 = AtomicU64::new(0);
//!
//! struct Config {
//!     debug: bool,
//! }
//!
//! struct RequestId(u64);
//!
//! struct StartupToken;
//!
//! let registry = BeanRegistry::new();
//!
//! // Singleton - constructed once, shared everywhere until removed.
//! registry.declare(|| Config { debug: false });
//!
//! // Factory - a fresh instance on every resolution.
//! registry.declare_factory(|| RequestId(COUNTER.fetch_add(1, Ordering::SeqCst)));
//!
//! // Stack - the first resolution consumes the binding.
//! registry.declare_stack(|| StartupToken);
//!
//! let first = registry.resolve::<StartupToken>();
//! assert!(first.is_ok());
//! let second = registry.resolve::<StartupToken>();
//! assert!(second.is_err());
//! ```
//!
//! ## Contract tags
//!
//! There is no runtime subtype metadata in Rust, so "is-a" lookups are
//! declared instead of discovered: a binding can carry tags naming the
//! contracts its instances satisfy, with the coercion written once at the
//! declaration site.
//!
//! ```rust
//! use bindery::{BeanRegistry, Binding};
//!
//! trait Notifier: Send + Sync {
//!     fn notify(&self, message: &str);
//! }
//!
//! struct EmailNotifier;
//! impl Notifier for EmailNotifier {
//!     fn notify(&self, _message: &str) {}
//! }
//!
//! let registry = BeanRegistry::new();
//! registry.declare_binding(
//!     Binding::singleton(|| EmailNotifier).implements::<dyn Notifier>(|n| n),
//! );
//!
//! // Resolved through the tag; shares the cached instance with
//! // `resolve::<EmailNotifier>()`.
//! let notifier = registry.resolve::<dyn Notifier>().unwrap();
//! notifier.notify("hello");
//! ```

mod definition;
mod error;
mod factory;
#[cfg(feature = "logging")]
pub mod logging;
mod registry;

pub use definition::*;
pub use error::*;
pub use factory::*;
pub use registry::*;

// Re-export tracing macros for convenience when logging is enabled
#[cfg(feature = "logging")]
pub use tracing::{debug, error, info, trace, warn};

// Re-export for convenience
pub use std::sync::Arc;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{
        BeanDefinition, BeanError, BeanRegistry, Binding, ContractTag, Injectable,
        InstanceFactory, Lifecycle, Result, TypeKey,
    };
    pub use std::sync::Arc;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Barrier;
    use std::thread;

    #[test]
    fn concurrent_singleton_resolution_builds_once() {
        static BUILDS: AtomicU32 = AtomicU32::new(0);

        struct Shared;

        let registry = Arc::new(BeanRegistry::new());
        registry.declare(|| {
            BUILDS.fetch_add(1, Ordering::SeqCst);
            // Widen the race window so late callers really do arrive while
            // the first build is still running.
            thread::sleep(std::time::Duration::from_millis(20));
            Shared
        });

        let threads = 8;
        let barrier = Arc::new(Barrier::new(threads));
        let handles: Vec<_> = (0..threads)
            .map(|_| {
                let registry = Arc::clone(&registry);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    registry.resolve::<Shared>().unwrap()
                })
            })
            .collect();

        let instances: Vec<Arc<Shared>> =
            handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert_eq!(BUILDS.load(Ordering::SeqCst), 1);
        for window in instances.windows(2) {
            assert!(Arc::ptr_eq(&window[0], &window[1]));
        }
    }

    #[test]
    fn concurrent_declares_keep_one_definition_per_key() {
        struct Contended(u32);

        let registry = Arc::new(BeanRegistry::new());
        let barrier = Arc::new(Barrier::new(4));

        let handles: Vec<_> = (0..4u32)
            .map(|n| {
                let registry = Arc::clone(&registry);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    registry.declare(move || Contended(n));
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(registry.len(), 1);
        assert!(registry.resolve::<Contended>().is_ok());
    }

    // The canonical wiring scenario: a singleton service whose constructor
    // resolves its collaborator back out of the registry.
    #[test]
    fn nested_singletons_share_their_collaborator() {
        struct Mailbox;

        struct Dispatcher {
            mailbox: Arc<Mailbox>,
        }

        let registry = BeanRegistry::global();
        registry.declare(|| Mailbox);
        registry.declare(|| Dispatcher {
            mailbox: BeanRegistry::global()
                .resolve::<Mailbox>()
                .expect("mailbox binding declared above"),
        });

        let first = registry.resolve::<Dispatcher>().unwrap();
        let second = registry.resolve::<Dispatcher>().unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        let mailbox = registry.resolve::<Mailbox>().unwrap();
        assert!(Arc::ptr_eq(&first.mailbox, &mailbox));
    }

    #[test]
    fn global_handle_is_stable() {
        let a = BeanRegistry::global() as *const BeanRegistry;
        let b = BeanRegistry::global() as *const BeanRegistry;
        assert_eq!(a, b);
    }

    #[test]
    fn prelude_exposes_the_core_types() {
        use crate::prelude::*;

        let registry = BeanRegistry::new();
        registry.declare_binding(BeanDefinition::of(Lifecycle::Factory, || 1u8));
        let value: Result<Arc<u8>> = registry.resolve::<u8>();
        assert_eq!(*value.unwrap(), 1);
    }
}
