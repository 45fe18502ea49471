//! Binding definitions and the type keys they are registered under.
//!
//! A [`BeanDefinition`] is a pure value: the contract key it satisfies, a
//! [`Lifecycle`], the construction closure, and zero or more [`ContractTag`]s
//! naming further contracts its instances can stand in for. Definitions are
//! immutable once declared; re-declaring a key replaces the whole definition.

use std::any::{Any, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::sync::Arc;

/// Marker trait for types that can participate in resolution.
///
/// Blanket-implemented for every `Send + Sync + 'static` type, sized or not,
/// so trait objects can serve as contract types. You never implement this
/// manually.
pub trait Injectable: Send + Sync + 'static {}

impl<T: ?Sized + Send + Sync + 'static> Injectable for T {}

/// A type-erased constructed instance.
///
/// The erased payload is always an `Arc<T>` for the binding's value type.
/// Wrapping the `Arc` rather than the value itself is what lets unsized
/// contract types (`dyn Trait`) travel through the cache: the outer pointer
/// can be downcast to the sized `Arc<T>` regardless of whether `T` is sized.
pub(crate) type ErasedInstance = Arc<dyn Any + Send + Sync>;

type ConstructFn = Arc<dyn Fn() -> ErasedInstance + Send + Sync>;
type CastFn = Arc<dyn Fn(&ErasedInstance) -> Option<ErasedInstance> + Send + Sync>;

/// Clone the typed `Arc<U>` back out of an erased instance.
pub(crate) fn downcast_instance<U: ?Sized + Injectable>(
    erased: &ErasedInstance,
) -> Option<Arc<U>> {
    erased.downcast_ref::<Arc<U>>().cloned()
}

/// Identifier of the contract type a binding satisfies.
///
/// Pairs the `TypeId` used for lookups with the type name used for
/// diagnostics. Equality and hashing consider only the `TypeId`.
#[derive(Clone, Copy, Debug)]
pub struct TypeKey {
    id: TypeId,
    name: &'static str,
}

impl TypeKey {
    /// The key for `T`, which may be unsized (`TypeKey::of::<dyn Trait>()`).
    #[inline]
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    /// Raw `TypeId` for map keys.
    #[inline]
    pub fn id(&self) -> TypeId {
        self.id
    }

    /// Human-readable type name.
    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for TypeKey {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeKey {}

impl Hash for TypeKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Policy governing instance reuse for a binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Lifecycle {
    /// One cached instance per key, created lazily on first resolution and
    /// reused until the binding is removed.
    #[default]
    Singleton,

    /// A fresh instance on every resolution; never cached.
    Factory,

    /// Cached like a singleton for exactly one resolution, after which the
    /// binding and its instance are dropped together.
    Stack,
}

impl Lifecycle {
    /// Stable name for structured log fields.
    pub fn as_str(&self) -> &'static str {
        match self {
            Lifecycle::Singleton => "singleton",
            Lifecycle::Factory => "factory",
            Lifecycle::Stack => "stack",
        }
    }
}

impl fmt::Display for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An explicit capability tag: instances of a binding can stand in for the
/// tagged contract type.
///
/// The tag carries the coercion from the binding's concrete instance to the
/// contract type, written once at the declaration site (for trait contracts
/// it is just the unsizing coercion, `|service| service`). Compatible lookup
/// is therefore an enumerable relation over declared tags, with no runtime
/// type introspection involved.
#[derive(Clone)]
pub struct ContractTag {
    key: TypeKey,
    cast: CastFn,
}

impl ContractTag {
    /// Tag a binding with concrete type `T` as satisfying contract `U`.
    pub fn new<T, U>(cast: impl Fn(Arc<T>) -> Arc<U> + Send + Sync + 'static) -> Self
    where
        T: Injectable,
        U: ?Sized + Injectable,
    {
        Self {
            key: TypeKey::of::<U>(),
            cast: Arc::new(move |erased| {
                let concrete = erased.downcast_ref::<Arc<T>>()?.clone();
                Some(Arc::new(cast(concrete)) as ErasedInstance)
            }),
        }
    }

    /// The contract key this tag satisfies.
    #[inline]
    pub fn key(&self) -> TypeKey {
        self.key
    }

    /// Re-erase `instance` as the contract type, sharing the same underlying
    /// value. `None` if the instance is not of the concrete type this tag
    /// was built for.
    pub(crate) fn apply(&self, instance: &ErasedInstance) -> Option<ErasedInstance> {
        (self.cast)(instance)
    }
}

impl fmt::Debug for ContractTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContractTag").field("key", &self.key).finish()
    }
}

/// One binding: the contract key it satisfies, its lifecycle, and the
/// construction recipe.
///
/// Equality and hashing are keyed on the contract key alone, so a set of
/// definitions holds at most one binding per key and re-declaration replaces
/// rather than duplicates.
#[derive(Clone)]
pub struct BeanDefinition {
    key: TypeKey,
    lifecycle: Lifecycle,
    construct: ConstructFn,
    contracts: Vec<ContractTag>,
}

impl BeanDefinition {
    /// A binding keyed by the concrete constructed type `T`.
    pub fn of<T: Injectable>(
        lifecycle: Lifecycle,
        construct: impl Fn() -> T + Send + Sync + 'static,
    ) -> Self {
        Self {
            key: TypeKey::of::<T>(),
            lifecycle,
            construct: Arc::new(move || Arc::new(Arc::new(construct())) as ErasedInstance),
            contracts: Vec::new(),
        }
    }

    /// A binding keyed directly by a contract type `U`, which may be unsized.
    ///
    /// The closure hands back an `Arc<U>`, so the concrete type behind the
    /// contract never has to be named at the resolution site:
    ///
    /// ```
    /// use bindery::{BeanDefinition, BeanRegistry, Lifecycle};
    /// use std::sync::Arc;
    ///
    /// trait Clock: Send + Sync {
    ///     fn now(&self) -> u64;
    /// }
    ///
    /// struct FixedClock(u64);
    /// impl Clock for FixedClock {
    ///     fn now(&self) -> u64 {
    ///         self.0
    ///     }
    /// }
    ///
    /// let registry = BeanRegistry::new();
    /// registry.declare_binding(BeanDefinition::of_contract::<dyn Clock>(
    ///     Lifecycle::Singleton,
    ///     || Arc::new(FixedClock(42)),
    /// ));
    ///
    /// let clock = registry.resolve::<dyn Clock>().unwrap();
    /// assert_eq!(clock.now(), 42);
    /// ```
    pub fn of_contract<U: ?Sized + Injectable>(
        lifecycle: Lifecycle,
        construct: impl Fn() -> Arc<U> + Send + Sync + 'static,
    ) -> Self {
        Self {
            key: TypeKey::of::<U>(),
            lifecycle,
            construct: Arc::new(move || Arc::new(construct()) as ErasedInstance),
            contracts: Vec::new(),
        }
    }

    /// The contract key this binding is registered under.
    #[inline]
    pub fn key(&self) -> TypeKey {
        self.key
    }

    /// The binding's lifecycle policy.
    #[inline]
    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    /// Contract tags declared for this binding, in declaration order.
    #[inline]
    pub fn contracts(&self) -> &[ContractTag] {
        &self.contracts
    }

    /// Whether this binding is tagged as satisfying `key`.
    pub fn satisfies(&self, key: &TypeKey) -> bool {
        self.contracts.iter().any(|tag| tag.key() == *key)
    }

    /// Run the construction closure, producing a fresh erased instance.
    pub(crate) fn construct(&self) -> ErasedInstance {
        (self.construct)()
    }

    /// The tag coercing instances of this binding into `key`, if declared.
    pub(crate) fn cast_for(&self, key: &TypeKey) -> Option<&ContractTag> {
        self.contracts.iter().find(|tag| tag.key() == *key)
    }

    fn push_contract(&mut self, tag: ContractTag) {
        self.contracts.push(tag);
    }
}

impl PartialEq for BeanDefinition {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for BeanDefinition {}

impl Hash for BeanDefinition {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

impl fmt::Debug for BeanDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BeanDefinition")
            .field("key", &self.key)
            .field("lifecycle", &self.lifecycle)
            .field(
                "contracts",
                &self.contracts.iter().map(ContractTag::key).collect::<Vec<_>>(),
            )
            .finish()
    }
}

/// Typed builder for a [`BeanDefinition`] keyed by concrete type `T`.
///
/// Carrying `T` through the builder lets `implements` check the coercion at
/// the declaration site instead of at resolution time:
///
/// ```
/// use bindery::{BeanRegistry, Binding};
///
/// trait Mailer: Send + Sync {
///     fn send(&self, to: &str);
/// }
///
/// struct SmtpMailer;
/// impl Mailer for SmtpMailer {
///     fn send(&self, _to: &str) {}
/// }
///
/// let registry = BeanRegistry::new();
/// registry.declare_binding(
///     Binding::singleton(|| SmtpMailer).implements::<dyn Mailer>(|mailer| mailer),
/// );
///
/// assert!(registry.resolve::<dyn Mailer>().is_ok());
/// ```
pub struct Binding<T: Injectable> {
    definition: BeanDefinition,
    _concrete: PhantomData<fn() -> T>,
}

impl<T: Injectable> Binding<T> {
    /// A binding with an explicit lifecycle.
    pub fn with_lifecycle(
        lifecycle: Lifecycle,
        construct: impl Fn() -> T + Send + Sync + 'static,
    ) -> Self {
        Self {
            definition: BeanDefinition::of(lifecycle, construct),
            _concrete: PhantomData,
        }
    }

    /// A singleton binding for `T`.
    pub fn singleton(construct: impl Fn() -> T + Send + Sync + 'static) -> Self {
        Self::with_lifecycle(Lifecycle::Singleton, construct)
    }

    /// A factory binding for `T`.
    pub fn factory(construct: impl Fn() -> T + Send + Sync + 'static) -> Self {
        Self::with_lifecycle(Lifecycle::Factory, construct)
    }

    /// A one-shot stack binding for `T`.
    pub fn stack(construct: impl Fn() -> T + Send + Sync + 'static) -> Self {
        Self::with_lifecycle(Lifecycle::Stack, construct)
    }

    /// Tag the binding as satisfying contract `U`, supplying the coercion
    /// from the concrete instance. For trait contracts the coercion is the
    /// identity closure `|service| service`.
    pub fn implements<U: ?Sized + Injectable>(
        mut self,
        cast: impl Fn(Arc<T>) -> Arc<U> + Send + Sync + 'static,
    ) -> Self {
        self.definition.push_contract(ContractTag::new::<T, U>(cast));
        self
    }
}

impl<T: Injectable> From<Binding<T>> for BeanDefinition {
    fn from(binding: Binding<T>) -> Self {
        binding.definition
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Widget {
        size: u32,
    }

    trait Sized2d: Send + Sync {
        fn area(&self) -> u32;
    }

    impl Sized2d for Widget {
        fn area(&self) -> u32 {
            self.size * self.size
        }
    }

    #[test]
    fn type_key_equality_ignores_name() {
        assert_eq!(TypeKey::of::<Widget>(), TypeKey::of::<Widget>());
        assert_ne!(TypeKey::of::<Widget>(), TypeKey::of::<u32>());
        assert_eq!(TypeKey::of::<Widget>().name(), std::any::type_name::<Widget>());
    }

    #[test]
    fn definition_equality_keyed_on_type_only() {
        let a = BeanDefinition::of(Lifecycle::Singleton, || Widget { size: 1 });
        let b = BeanDefinition::of(Lifecycle::Factory, || Widget { size: 9 });
        assert_eq!(a, b);

        let other = BeanDefinition::of(Lifecycle::Singleton, || 7u32);
        assert_ne!(a, other);
    }

    #[test]
    fn construct_payload_is_arc_of_concrete() {
        let def = BeanDefinition::of(Lifecycle::Singleton, || Widget { size: 3 });
        let erased = def.construct();
        let widget = downcast_instance::<Widget>(&erased).unwrap();
        assert_eq!(widget.size, 3);
        assert!(downcast_instance::<u32>(&erased).is_none());
    }

    #[test]
    fn contract_tag_coerces_to_trait_object() {
        let def: BeanDefinition = Binding::singleton(|| Widget { size: 4 })
            .implements::<dyn Sized2d>(|widget| widget)
            .into();

        let requested = TypeKey::of::<dyn Sized2d>();
        assert!(def.satisfies(&requested));

        let erased = def.construct();
        let coerced = def.cast_for(&requested).unwrap().apply(&erased).unwrap();
        let shape = downcast_instance::<dyn Sized2d>(&coerced).unwrap();
        assert_eq!(shape.area(), 16);
    }

    #[test]
    fn contract_keyed_definition() {
        let def = BeanDefinition::of_contract::<dyn Sized2d>(Lifecycle::Singleton, || {
            Arc::new(Widget { size: 5 })
        });
        assert_eq!(def.key(), TypeKey::of::<dyn Sized2d>());

        let erased = def.construct();
        let shape = downcast_instance::<dyn Sized2d>(&erased).unwrap();
        assert_eq!(shape.area(), 25);
    }

    #[test]
    fn lifecycle_defaults_to_singleton() {
        assert_eq!(Lifecycle::default(), Lifecycle::Singleton);
        assert_eq!(Lifecycle::Stack.as_str(), "stack");
    }
}
