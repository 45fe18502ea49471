//! The bean registry: declaration, lookup, and lifecycle-aware resolution.
//!
//! The registry gathers [`BeanDefinition`]s and collaborates with the
//! [`InstanceFactory`] to hand out instances according to each binding's
//! [`Lifecycle`]. Lifecycle branching lives here; the factory only creates
//! and caches.

use crate::definition::{
    downcast_instance, BeanDefinition, ErasedInstance, Injectable, Lifecycle, TypeKey,
};
use crate::error::{BeanError, Result};
use crate::factory::InstanceFactory;
use once_cell::sync::Lazy;
use std::any::TypeId;
use std::cell::RefCell;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

#[cfg(feature = "logging")]
use tracing::{debug, trace, warn};

static GLOBAL: Lazy<BeanRegistry> = Lazy::new(BeanRegistry::new);

thread_local! {
    /// Keys currently under construction on this thread, innermost last.
    static IN_PROGRESS: RefCell<Vec<TypeId>> = const { RefCell::new(Vec::new()) };
}

/// RAII marker for a key being constructed on the current thread.
///
/// Entering twice for the same key means a construction closure is resolving
/// itself; that is reported as [`BeanError::CircularDependency`] instead of
/// letting the underlying once-cell block forever.
struct ResolveGuard {
    id: TypeId,
}

impl ResolveGuard {
    fn enter(key: &TypeKey) -> Result<Self> {
        IN_PROGRESS.with(|stack| {
            let mut stack = stack.borrow_mut();
            if stack.contains(&key.id()) {
                return Err(BeanError::circular(key.name()));
            }
            stack.push(key.id());
            Ok(Self { id: key.id() })
        })
    }
}

impl Drop for ResolveGuard {
    fn drop(&mut self) {
        IN_PROGRESS.with(|stack| {
            let mut stack = stack.borrow_mut();
            if let Some(position) = stack.iter().rposition(|id| *id == self.id) {
                stack.remove(position);
            }
        });
    }
}

/// Process-wide registry of bindings.
///
/// Bindings are declared with a construction closure and a [`Lifecycle`];
/// resolution finds a matching binding (exact key first, then declared
/// contract tags) and produces an instance through the [`InstanceFactory`].
///
/// # Examples
///
/// ```rust
/// use bindery::BeanRegistry;
///
/// struct Database {
///     url: String,
/// }
///
/// let registry = BeanRegistry::new();
/// registry.declare(|| Database {
///     url: "postgres://localhost".into(),
/// });
///
/// let db = registry.resolve::<Database>().unwrap();
/// assert_eq!(db.url, "postgres://localhost");
/// ```
pub struct BeanRegistry {
    /// Declared bindings, in declaration order. The order is the tie-break
    /// for compatible lookup, so a plain vector behind a lock rather than a
    /// hash map.
    definitions: RwLock<Vec<BeanDefinition>>,
    /// Instance cache and construction, delegated per lifecycle.
    instances: InstanceFactory,
}

impl BeanRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        #[cfg(feature = "logging")]
        debug!(target: "bindery", "creating bean registry");

        Self::with_factory(InstanceFactory::new())
    }

    /// Create a registry around an existing instance factory.
    pub fn with_factory(instances: InstanceFactory) -> Self {
        Self {
            definitions: RwLock::new(Vec::new()),
            instances,
        }
    }

    /// The process-wide registry handle, created on first access.
    ///
    /// Composition roots that prefer explicit ownership can construct their
    /// own registry with [`BeanRegistry::new`] and pass it around instead;
    /// nothing in the crate requires the global handle.
    pub fn global() -> &'static BeanRegistry {
        &GLOBAL
    }

    /// The collaborating instance factory.
    pub fn instance_factory(&self) -> &InstanceFactory {
        &self.instances
    }

    // =========================================================================
    // Declaration
    // =========================================================================

    /// Register (or replace) a singleton binding for `T`.
    ///
    /// The instance is constructed lazily on first resolution and shared by
    /// every resolution after that.
    pub fn declare<T: Injectable>(&self, construct: impl Fn() -> T + Send + Sync + 'static) {
        self.declare_binding(BeanDefinition::of(Lifecycle::Singleton, construct));
    }

    /// Register (or replace) a factory binding for `T`: a fresh instance on
    /// every resolution.
    pub fn declare_factory<T: Injectable>(
        &self,
        construct: impl Fn() -> T + Send + Sync + 'static,
    ) {
        self.declare_binding(BeanDefinition::of(Lifecycle::Factory, construct));
    }

    /// Register (or replace) a one-shot stack binding for `T`: the first
    /// resolution consumes the binding.
    pub fn declare_stack<T: Injectable>(&self, construct: impl Fn() -> T + Send + Sync + 'static) {
        self.declare_binding(BeanDefinition::of(Lifecycle::Stack, construct));
    }

    /// Register (or replace) a fully-specified binding.
    ///
    /// Replace semantics: an existing binding for the same key is dropped,
    /// together with its cached instance, before the new one is appended.
    /// A re-declared binding therefore also moves to the end of the
    /// compatible-lookup order.
    pub fn declare_binding(&self, binding: impl Into<BeanDefinition>) {
        let definition = binding.into();
        let key = definition.key();

        #[cfg(feature = "logging")]
        debug!(
            target: "bindery",
            binding = key.name(),
            lifecycle = definition.lifecycle().as_str(),
            contracts = definition.contracts().len(),
            "declaring binding"
        );

        let mut definitions = self
            .definitions
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        definitions.retain(|existing| existing.key() != key);
        self.instances.evict(&key);
        definitions.push(definition);
    }

    // =========================================================================
    // Lookup
    // =========================================================================

    /// Exact-match lookup for the binding registered under `key`.
    pub fn search_definition(&self, key: &TypeKey) -> Option<BeanDefinition> {
        let definitions = self
            .definitions
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        definitions.iter().find(|def| def.key() == *key).cloned()
    }

    /// First binding, in declaration order, tagged as satisfying `key`.
    pub fn search_compatible(&self, key: &TypeKey) -> Option<BeanDefinition> {
        let definitions = self
            .definitions
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        definitions.iter().find(|def| def.satisfies(key)).cloned()
    }

    /// Whether an exact or compatible binding exists for `U`.
    pub fn contains<U: ?Sized + Injectable>(&self) -> bool {
        let key = TypeKey::of::<U>();
        let definitions = self
            .definitions
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        definitions
            .iter()
            .any(|def| def.key() == key || def.satisfies(&key))
    }

    /// Number of declared bindings.
    pub fn len(&self) -> usize {
        self.definitions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether no bindings are declared.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Keys of all declared bindings, in declaration order.
    pub fn bound_keys(&self) -> Vec<TypeKey> {
        self.definitions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(BeanDefinition::key)
            .collect()
    }

    // =========================================================================
    // Resolution
    // =========================================================================

    /// Resolve an instance for `U`.
    ///
    /// Tries the exact binding for `U` first, then the first declared
    /// binding tagged as satisfying `U`. The instance is produced according
    /// to the binding's lifecycle: cached for `Singleton`, fresh for
    /// `Factory`, and one-shot for `Stack` (the binding is consumed by this
    /// call).
    pub fn resolve<U: ?Sized + Injectable>(&self) -> Result<Arc<U>> {
        let key = TypeKey::of::<U>();

        #[cfg(feature = "logging")]
        trace!(target: "bindery", binding = key.name(), "resolving instance");

        let (definition, exact) = match self.search_definition(&key) {
            Some(definition) => (definition, true),
            None => match self.search_compatible(&key) {
                Some(definition) => {
                    #[cfg(feature = "logging")]
                    debug!(
                        target: "bindery",
                        requested = key.name(),
                        binding = definition.key().name(),
                        "using compatible binding"
                    );
                    (definition, false)
                }
                None => {
                    #[cfg(feature = "logging")]
                    debug!(target: "bindery", binding = key.name(), "no binding found");
                    return Err(BeanError::not_found::<U>());
                }
            },
        };

        let erased = self.instantiate(&definition)?;

        if definition.lifecycle() == Lifecycle::Stack {
            self.remove(&definition.key());
        }

        let erased = if exact {
            erased
        } else {
            definition
                .cast_for(&key)
                .and_then(|tag| tag.apply(&erased))
                .ok_or_else(|| BeanError::mismatch::<U>(definition.key().name()))?
        };

        downcast_instance::<U>(&erased)
            .ok_or_else(|| BeanError::mismatch::<U>(definition.key().name()))
    }

    /// Resolve an instance for `U`, or `None` if no binding exists.
    pub fn try_resolve<U: ?Sized + Injectable>(&self) -> Option<Arc<U>> {
        self.resolve::<U>().ok()
    }

    /// Populate one field of an already-constructed value by type-directed
    /// lookup.
    ///
    /// The setter closure names the field; the field's declared type `U`
    /// drives the lookup, so the target type does not have to be built by
    /// the registry at all:
    ///
    /// ```rust
    /// use bindery::BeanRegistry;
    /// use std::sync::Arc;
    ///
    /// struct Database;
    ///
    /// struct Handler {
    ///     db: Option<Arc<Database>>,
    /// }
    ///
    /// let registry = BeanRegistry::new();
    /// registry.declare(|| Database);
    ///
    /// let mut handler = Handler { db: None };
    /// registry
    ///     .resolve_injection(&mut handler, |handler, db| handler.db = Some(db))
    ///     .unwrap();
    /// assert!(handler.db.is_some());
    /// ```
    pub fn resolve_injection<T, U: ?Sized + Injectable>(
        &self,
        target: &mut T,
        assign: impl FnOnce(&mut T, Arc<U>),
    ) -> Result<()> {
        let instance = self.resolve::<U>()?;
        assign(target, instance);
        Ok(())
    }

    /// Create or fetch the instance for a definition per its lifecycle,
    /// guarded against same-thread self-resolution.
    fn instantiate(&self, definition: &BeanDefinition) -> Result<ErasedInstance> {
        let key = definition.key();
        let _guard = ResolveGuard::enter(&key)?;

        Ok(match definition.lifecycle() {
            Lifecycle::Factory => self.instances.create_instance(definition),
            Lifecycle::Singleton | Lifecycle::Stack => {
                self.instances.retrieve_or_create(&key, definition)
            }
        })
    }

    // =========================================================================
    // Removal
    // =========================================================================

    /// Remove the binding for `key` and evict its cached instance.
    ///
    /// Unknown keys are ignored apart from a warning event.
    pub fn remove(&self, key: &TypeKey) {
        let mut definitions = self
            .definitions
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let before = definitions.len();
        definitions.retain(|def| def.key() != *key);

        if definitions.len() == before {
            #[cfg(feature = "logging")]
            warn!(
                target: "bindery",
                binding = key.name(),
                "remove requested for unknown binding"
            );
            return;
        }

        self.instances.evict(key);

        #[cfg(feature = "logging")]
        debug!(target: "bindery", binding = key.name(), "binding removed");
    }

    /// Drop every binding and every cached instance.
    pub fn clear(&self) {
        let mut definitions = self
            .definitions
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let removed = definitions.len();
        definitions.clear();
        self.instances.clear();

        #[cfg(feature = "logging")]
        debug!(target: "bindery", bindings_removed = removed, "registry cleared");
    }
}

impl Default for BeanRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for BeanRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BeanRegistry")
            .field("bindings", &self.len())
            .field("cached", &self.instances.len())
            .finish()
    }
}
