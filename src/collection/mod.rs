//! Service collection: the mutable registry that decoration rewrites.

use std::collections::HashSet;
use std::sync::Arc;

use crate::activator::{Activate, Implements};
use crate::config::DecorationConfig;
use crate::descriptors::{
    into_any, AnyArc, FactoryFn, Implementation, ImplementationType, ServiceDescriptor,
};
use crate::error::{DiError, DiResult};
use crate::generic::GenericService;
use crate::key::ServiceKey;
use crate::lifetime::Lifetime;
use crate::observer::{DiObserver, Observers};
use crate::provider::{ResolverContext, ServiceProvider};
use crate::registration::Registry;

/// Ordered list of service registrations.
///
/// Registrations are kept in insertion order. Resolution picks the last
/// registration made under a key; every registration stays reachable through
/// `get_all`. The decoration methods (see the `decorate*` family) rewrite
/// entries in place before [`build`](Self::build) freezes the collection
/// into a [`ServiceProvider`].
///
/// # Examples
///
/// ```rust
/// use ferrous_decor::{ServiceCollection, Resolver};
/// use std::sync::Arc;
///
/// trait Greeter: Send + Sync {
///     fn greet(&self) -> String;
/// }
///
/// struct English;
/// impl Greeter for English {
///     fn greet(&self) -> String { "hello".into() }
/// }
///
/// let mut services = ServiceCollection::new();
/// services.add_singleton_trait_factory::<dyn Greeter, _>(|_| Arc::new(English));
/// services
///     .decorate_fn::<dyn Greeter, _>(|inner| {
///         struct Loud(Arc<dyn Greeter>);
///         impl Greeter for Loud {
///             fn greet(&self) -> String { self.0.greet().to_uppercase() }
///         }
///         Arc::new(Loud(inner))
///     })
///     .unwrap();
///
/// let provider = services.build();
/// assert_eq!(provider.get_required::<dyn Greeter>().greet(), "HELLO");
/// ```
#[derive(Clone, Default)]
pub struct ServiceCollection {
    pub(crate) descriptors: Vec<ServiceDescriptor>,
    pub(crate) observers: Observers,
    pub(crate) config: DecorationConfig,
}

impl ServiceCollection {
    /// Creates a new empty service collection.
    pub fn new() -> Self {
        Self::default()
    }

    // ----- Raw descriptors -----

    /// Appends a descriptor.
    pub fn add(&mut self, descriptor: ServiceDescriptor) -> &mut Self {
        self.descriptors.push(descriptor);
        self
    }

    /// Appends a descriptor unless its key is already registered.
    pub fn try_add(&mut self, descriptor: ServiceDescriptor) -> bool {
        if self.contains_key(descriptor.key()) {
            return false;
        }
        self.descriptors.push(descriptor);
        true
    }

    fn push(&mut self, key: ServiceKey, lifetime: Lifetime, implementation: Implementation) -> &mut Self {
        self.descriptors
            .push(ServiceDescriptor::from_parts(key, lifetime, implementation));
        self
    }

    // ----- Instances -----

    /// Registers a singleton instance.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use ferrous_decor::ServiceCollection;
    /// struct Config {
    ///     database_url: String
    /// }
    ///
    /// let mut services = ServiceCollection::new();
    /// services.add_singleton(Config {
    ///     database_url: "postgres://localhost".to_string()
    /// });
    /// assert_eq!(services.len(), 1);
    /// ```
    pub fn add_singleton<T: Send + Sync + 'static>(&mut self, value: T) -> &mut Self {
        self.add_instance::<T>(Arc::new(value))
    }

    /// Registers a pre-built instance of a service, sized or trait object.
    pub fn add_instance<S: ?Sized + Send + Sync + 'static>(&mut self, value: Arc<S>) -> &mut Self {
        self.push(
            ServiceKey::of::<S>(),
            Lifetime::Singleton,
            Implementation::Instance(into_any(value)),
        )
    }

    // ----- Concrete factories -----

    pub fn add_singleton_factory<T, F>(&mut self, factory: F) -> &mut Self
    where
        T: Send + Sync + 'static,
        F: Fn(&ResolverContext<'_>) -> T + Send + Sync + 'static,
    {
        self.add_factory(Lifetime::Singleton, factory)
    }

    pub fn add_scoped_factory<T, F>(&mut self, factory: F) -> &mut Self
    where
        T: Send + Sync + 'static,
        F: Fn(&ResolverContext<'_>) -> T + Send + Sync + 'static,
    {
        self.add_factory(Lifetime::Scoped, factory)
    }

    pub fn add_transient_factory<T, F>(&mut self, factory: F) -> &mut Self
    where
        T: Send + Sync + 'static,
        F: Fn(&ResolverContext<'_>) -> T + Send + Sync + 'static,
    {
        self.add_factory(Lifetime::Transient, factory)
    }

    /// Registers a factory for a concrete type with an explicit lifetime.
    pub fn add_factory<T, F>(&mut self, lifetime: Lifetime, factory: F) -> &mut Self
    where
        T: Send + Sync + 'static,
        F: Fn(&ResolverContext<'_>) -> T + Send + Sync + 'static,
    {
        self.add_trait_factory::<T, _>(lifetime, move |ctx| Arc::new(factory(ctx)))
    }

    // ----- Trait factories -----

    pub fn add_singleton_trait_factory<S, F>(&mut self, factory: F) -> &mut Self
    where
        S: ?Sized + Send + Sync + 'static,
        F: Fn(&ResolverContext<'_>) -> Arc<S> + Send + Sync + 'static,
    {
        self.add_trait_factory(Lifetime::Singleton, factory)
    }

    pub fn add_scoped_trait_factory<S, F>(&mut self, factory: F) -> &mut Self
    where
        S: ?Sized + Send + Sync + 'static,
        F: Fn(&ResolverContext<'_>) -> Arc<S> + Send + Sync + 'static,
    {
        self.add_trait_factory(Lifetime::Scoped, factory)
    }

    pub fn add_transient_trait_factory<S, F>(&mut self, factory: F) -> &mut Self
    where
        S: ?Sized + Send + Sync + 'static,
        F: Fn(&ResolverContext<'_>) -> Arc<S> + Send + Sync + 'static,
    {
        self.add_trait_factory(Lifetime::Transient, factory)
    }

    /// Registers a factory returning `Arc<S>` with an explicit lifetime.
    pub fn add_trait_factory<S, F>(&mut self, lifetime: Lifetime, factory: F) -> &mut Self
    where
        S: ?Sized + Send + Sync + 'static,
        F: Fn(&ResolverContext<'_>) -> Arc<S> + Send + Sync + 'static,
    {
        self.push(ServiceKey::of::<S>(), lifetime, Implementation::Factory(erase(factory)))
    }

    // ----- Constructor injection -----

    /// Registers `I`, built through its [`Activate`] constructor, as `S`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use ferrous_decor::{Activate, Constructor, Resolver, ServiceCollection};
    /// use std::sync::Arc;
    ///
    /// trait Store: Send + Sync {
    ///     fn name(&self) -> String;
    /// }
    ///
    /// struct MemoryStore { prefix: Arc<String> }
    ///
    /// impl Store for MemoryStore {
    ///     fn name(&self) -> String { format!("{}-memory", self.prefix) }
    /// }
    ///
    /// impl Activate for MemoryStore {
    ///     fn constructor() -> Constructor<Self> {
    ///         Constructor::new(|args| Ok(MemoryStore { prefix: args.next()? }))
    ///             .param::<String>("prefix")
    ///     }
    /// }
    ///
    /// ferrous_decor::implements!(dyn Store => MemoryStore);
    ///
    /// let mut services = ServiceCollection::new();
    /// services.add_singleton("app".to_string());
    /// services.add_singleton_type::<dyn Store, MemoryStore>();
    ///
    /// let provider = services.build();
    /// assert_eq!(provider.get_required::<dyn Store>().name(), "app-memory");
    /// ```
    pub fn add_singleton_type<S, I>(&mut self) -> &mut Self
    where
        S: ?Sized + Send + Sync + 'static,
        I: Activate + Implements<S>,
    {
        self.add_type::<S, I>(Lifetime::Singleton)
    }

    pub fn add_scoped_type<S, I>(&mut self) -> &mut Self
    where
        S: ?Sized + Send + Sync + 'static,
        I: Activate + Implements<S>,
    {
        self.add_type::<S, I>(Lifetime::Scoped)
    }

    pub fn add_transient_type<S, I>(&mut self) -> &mut Self
    where
        S: ?Sized + Send + Sync + 'static,
        I: Activate + Implements<S>,
    {
        self.add_type::<S, I>(Lifetime::Transient)
    }

    pub fn add_type<S, I>(&mut self, lifetime: Lifetime) -> &mut Self
    where
        S: ?Sized + Send + Sync + 'static,
        I: Activate + Implements<S>,
    {
        self.push(
            ServiceKey::of::<S>(),
            lifetime,
            Implementation::Type(ImplementationType::of::<S, I>()),
        )
    }

    // ----- Generic family members -----

    /// Registers a factory for a closed member of a generic family.
    ///
    /// Only registrations made through the `add_generic_*` methods (or with a
    /// [`ServiceKey::generic`] key) can be selected by open-generic
    /// decoration.
    pub fn add_generic_factory<S, F>(&mut self, lifetime: Lifetime, factory: F) -> &mut Self
    where
        S: ?Sized + GenericService + Send + Sync,
        F: Fn(&ResolverContext<'_>) -> Arc<S> + Send + Sync + 'static,
    {
        self.push(ServiceKey::generic::<S>(), lifetime, Implementation::Factory(erase(factory)))
    }

    /// Registers a constructor-injected member of a generic family.
    pub fn add_generic_type<S, I>(&mut self, lifetime: Lifetime) -> &mut Self
    where
        S: ?Sized + GenericService + Send + Sync,
        I: Activate + Implements<S>,
    {
        self.push(
            ServiceKey::generic::<S>(),
            lifetime,
            Implementation::Type(ImplementationType::of::<S, I>()),
        )
    }

    /// Registers a pre-built member of a generic family.
    pub fn add_generic_instance<S>(&mut self, value: Arc<S>) -> &mut Self
    where
        S: ?Sized + GenericService + Send + Sync,
    {
        self.push(
            ServiceKey::generic::<S>(),
            Lifetime::Singleton,
            Implementation::Instance(into_any(value)),
        )
    }

    // ----- Introspection -----

    /// Number of registrations, shadows included.
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ServiceDescriptor> {
        self.descriptors.iter()
    }

    pub fn descriptors(&self) -> &[ServiceDescriptor] {
        &self.descriptors
    }

    pub fn contains_key(&self, key: &ServiceKey) -> bool {
        self.descriptors.iter().any(|descriptor| descriptor.key() == key)
    }

    /// True if `S` is registered.
    pub fn contains<S: ?Sized + 'static>(&self) -> bool {
        self.contains_key(&ServiceKey::of::<S>())
    }

    // ----- Observation and settings -----

    /// Adds an observer for decoration passes and for every resolution made
    /// by the provider this collection builds.
    pub fn add_observer(&mut self, observer: Arc<dyn DiObserver>) -> &mut Self {
        self.observers.add(observer);
        self
    }

    pub fn with_config(&mut self, config: DecorationConfig) -> &mut Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &DecorationConfig {
        &self.config
    }

    // ----- Build -----

    /// Freezes the collection into a provider.
    pub fn build(self) -> ServiceProvider {
        tracing::debug!(registrations = self.descriptors.len(), "building service provider");
        let registry = Registry::from_descriptors(&self.descriptors);
        ServiceProvider::new(registry, self.observers)
    }

    /// Like [`build`](Self::build), but first checks (when
    /// `validate_on_build` is set) that the shadow registration behind every
    /// decorator is still present.
    pub fn try_build(self) -> DiResult<ServiceProvider> {
        if self.config.validate_on_build {
            self.validate()?;
        }
        Ok(self.build())
    }

    fn validate(&self) -> DiResult<()> {
        let keys: HashSet<&ServiceKey> = self.descriptors.iter().map(ServiceDescriptor::key).collect();
        for descriptor in &self.descriptors {
            if let Some(shadow) = descriptor.wrapped_key() {
                if !keys.contains(shadow) {
                    return Err(DiError::InvalidRegistration(format!(
                        "decorator for {} wraps a registration that is no longer present ({:?})",
                        descriptor.key(),
                        shadow
                    )));
                }
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for ServiceCollection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceCollection")
            .field("descriptors", &self.descriptors)
            .field("observers", &self.observers)
            .field("config", &self.config)
            .finish()
    }
}

fn erase<S, F>(factory: F) -> FactoryFn
where
    S: ?Sized + Send + Sync + 'static,
    F: Fn(&ResolverContext<'_>) -> Arc<S> + Send + Sync + 'static,
{
    Arc::new(move |ctx: &ResolverContext<'_>| -> DiResult<AnyArc> { Ok(into_any(factory(ctx))) })
}
