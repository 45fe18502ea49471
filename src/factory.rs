//! Instance creation and the lifecycle cache.
//!
//! The [`InstanceFactory`] is a pure create/cache primitive: it knows how to
//! run a definition's construction closure and how to remember the result
//! for keys that reuse instances. Which lifecycles go through the cache, and
//! when entries are evicted, is decided by the registry.

use crate::definition::{BeanDefinition, ErasedInstance, TypeKey};
use ahash::RandomState;
use dashmap::DashMap;
use once_cell::sync::OnceCell;
use std::any::TypeId;
use std::sync::Arc;

#[cfg(feature = "logging")]
use tracing::trace;

/// Creates instances from definitions and caches them per type key.
///
/// The cache maps each key to a once-cell holding the constructed instance.
/// The map shard lock is only held while materializing an empty cell;
/// construction itself runs on the cell, outside any map lock, so
/// construction closures may resolve their own dependencies back through the
/// registry without deadlocking, and concurrent first resolutions of one key
/// block on the same cell and share a single build.
pub struct InstanceFactory {
    instances: DashMap<TypeId, Arc<OnceCell<ErasedInstance>>, RandomState>,
}

impl InstanceFactory {
    /// Create an empty factory.
    ///
    /// Eight shards: registries hold few cached instances, so creation cost
    /// matters more than shard-level contention.
    pub fn new() -> Self {
        Self {
            instances: DashMap::with_capacity_and_hasher_and_shard_amount(
                0,
                RandomState::new(),
                8,
            ),
        }
    }

    /// Run the definition's construction closure unconditionally.
    ///
    /// The factory-lifecycle path: no cache involvement at all.
    pub fn create_instance(&self, definition: &BeanDefinition) -> ErasedInstance {
        #[cfg(feature = "logging")]
        trace!(
            target: "bindery",
            binding = definition.key().name(),
            "constructing fresh instance"
        );

        definition.construct()
    }

    /// Return the cached instance for `key`, constructing and storing it on
    /// first use.
    ///
    /// Late concurrent callers block on the shared cell until the first
    /// build completes, then receive the same instance.
    pub fn retrieve_or_create(
        &self,
        key: &TypeKey,
        definition: &BeanDefinition,
    ) -> ErasedInstance {
        let cell = self
            .instances
            .entry(key.id())
            .or_insert_with(|| Arc::new(OnceCell::new()))
            .clone();

        cell.get_or_init(|| {
            #[cfg(feature = "logging")]
            trace!(
                target: "bindery",
                binding = key.name(),
                "cache miss, constructing instance"
            );

            definition.construct()
        })
        .clone()
    }

    /// Drop the cached instance for `key`. Returns whether an entry existed.
    ///
    /// Only the registry calls this (on remove, re-declare, and clear); the
    /// factory never evicts on its own.
    pub fn evict(&self, key: &TypeKey) -> bool {
        let evicted = self.instances.remove(&key.id()).is_some();

        #[cfg(feature = "logging")]
        if evicted {
            trace!(target: "bindery", binding = key.name(), "cached instance evicted");
        }

        evicted
    }

    /// Whether a constructed instance is currently cached for `key`.
    pub fn cached(&self, key: &TypeKey) -> bool {
        self.instances
            .get(&key.id())
            .is_some_and(|cell| cell.get().is_some())
    }

    /// Number of cache slots currently held.
    pub fn len(&self) -> usize {
        self.instances.len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// Drop every cached instance.
    pub fn clear(&self) {
        self.instances.clear();
    }
}

impl Default for InstanceFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for InstanceFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstanceFactory")
            .field("cached", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::{downcast_instance, Lifecycle};
    use std::sync::atomic::{AtomicU32, Ordering};

    struct Probe {
        id: u32,
    }

    fn probe_definition(counter: &'static AtomicU32) -> BeanDefinition {
        BeanDefinition::of(Lifecycle::Singleton, move || Probe {
            id: counter.fetch_add(1, Ordering::SeqCst),
        })
    }

    #[test]
    fn create_instance_is_always_fresh() {
        static BUILDS: AtomicU32 = AtomicU32::new(0);

        let factory = InstanceFactory::new();
        let def = probe_definition(&BUILDS);

        let a = downcast_instance::<Probe>(&factory.create_instance(&def)).unwrap();
        let b = downcast_instance::<Probe>(&factory.create_instance(&def)).unwrap();

        assert_eq!(BUILDS.load(Ordering::SeqCst), 2);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn retrieve_or_create_builds_once() {
        static BUILDS: AtomicU32 = AtomicU32::new(0);

        let factory = InstanceFactory::new();
        let def = probe_definition(&BUILDS);
        let key = def.key();

        let a = downcast_instance::<Probe>(&factory.retrieve_or_create(&key, &def)).unwrap();
        let b = downcast_instance::<Probe>(&factory.retrieve_or_create(&key, &def)).unwrap();

        assert_eq!(BUILDS.load(Ordering::SeqCst), 1);
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn evict_forces_a_rebuild() {
        static BUILDS: AtomicU32 = AtomicU32::new(0);

        let factory = InstanceFactory::new();
        let def = probe_definition(&BUILDS);
        let key = def.key();

        let first = downcast_instance::<Probe>(&factory.retrieve_or_create(&key, &def)).unwrap();
        assert!(factory.cached(&key));

        assert!(factory.evict(&key));
        assert!(!factory.cached(&key));
        assert!(!factory.evict(&key));

        let second = downcast_instance::<Probe>(&factory.retrieve_or_create(&key, &def)).unwrap();
        assert_eq!(BUILDS.load(Ordering::SeqCst), 2);
        assert!(!Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn clear_drops_all_slots() {
        static BUILDS: AtomicU32 = AtomicU32::new(0);

        let factory = InstanceFactory::new();
        let def = probe_definition(&BUILDS);
        let key = def.key();

        factory.retrieve_or_create(&key, &def);
        assert!(!factory.is_empty());

        factory.clear();
        assert!(factory.is_empty());
        assert!(!factory.cached(&key));
    }
}
