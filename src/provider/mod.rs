//! Service provider for resolving registered services.

use std::sync::Arc;

use once_cell::sync::OnceCell;

use crate::activator::ActivatorCache;
use crate::descriptors::AnyArc;
use crate::error::{DiError, DiResult};
use crate::internal::with_circular_catch;
use crate::key::ServiceKey;
use crate::lifetime::Lifetime;
use crate::observer::Observers;
use crate::registration::{Registration, Registry};
use crate::traits::{Resolver, ResolverCore};

pub mod context;
pub mod scope;

pub use context::ResolverContext;
pub use scope::Scope;

/// Root resolver built from a [`ServiceCollection`](crate::ServiceCollection).
///
/// Singletons are cached here; scoped services can only be resolved from a
/// [`Scope`]. Cloning is cheap and every clone shares the same caches.
///
/// # Examples
///
/// ```
/// use ferrous_decor::{ServiceCollection, Resolver};
/// use std::sync::Arc;
///
/// struct Database { url: String }
/// struct UserService { db: Arc<Database> }
///
/// let mut collection = ServiceCollection::new();
/// collection.add_singleton(Database { url: "postgres://localhost".to_string() });
/// collection.add_transient_factory::<UserService, _>(|resolver| {
///     UserService { db: resolver.get_required::<Database>() }
/// });
///
/// let provider = collection.build();
/// let user_service = provider.get_required::<UserService>();
/// assert_eq!(user_service.db.url, "postgres://localhost");
/// ```
#[derive(Clone)]
pub struct ServiceProvider {
    inner: Arc<ProviderInner>,
}

pub(crate) struct ProviderInner {
    pub(crate) registry: Registry,
    pub(crate) activator: ActivatorCache,
    pub(crate) observers: Observers,
}

impl ServiceProvider {
    pub(crate) fn new(registry: Registry, observers: Observers) -> Self {
        Self {
            inner: Arc::new(ProviderInner {
                registry,
                activator: ActivatorCache::new(),
                observers,
            }),
        }
    }

    #[inline]
    pub(crate) fn inner(&self) -> &ProviderInner {
        &self.inner
    }

    /// Creates a new scope for resolving scoped services.
    ///
    /// # Examples
    ///
    /// ```
    /// use ferrous_decor::{ServiceCollection, Resolver};
    /// use std::sync::atomic::{AtomicUsize, Ordering};
    /// use std::sync::Arc;
    ///
    /// struct RequestId(usize);
    ///
    /// let counter = Arc::new(AtomicUsize::new(0));
    /// let seen = counter.clone();
    ///
    /// let mut collection = ServiceCollection::new();
    /// collection.add_scoped_factory::<RequestId, _>(move |_| {
    ///     RequestId(seen.fetch_add(1, Ordering::SeqCst))
    /// });
    ///
    /// let provider = collection.build();
    /// let scope1 = provider.create_scope();
    /// let scope2 = provider.create_scope();
    ///
    /// let req1a = scope1.get_required::<RequestId>();
    /// let req1b = scope1.get_required::<RequestId>();
    /// let req2 = scope2.get_required::<RequestId>();
    ///
    /// assert!(Arc::ptr_eq(&req1a, &req1b));
    /// assert!(!Arc::ptr_eq(&req1a, &req2));
    /// assert_eq!(counter.load(Ordering::SeqCst), 2);
    /// ```
    pub fn create_scope(&self) -> Scope {
        let scoped_cells: Box<[OnceCell<AnyArc>]> = (0..self.inner.registry.scoped_count)
            .map(|_| OnceCell::new())
            .collect();
        Scope::new(self.clone(), scoped_cells)
    }

    /// True if anything is registered under `key`.
    pub fn contains_key(&self, key: &ServiceKey) -> bool {
        self.inner.registry.contains_key(key)
    }

    /// Number of registrations, shadows included.
    pub fn len(&self) -> usize {
        self.inner.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Keys of every registration, in registration order.
    pub fn service_keys(&self) -> impl Iterator<Item = &ServiceKey> {
        self.inner.registry.iter().map(|registration| &registration.key)
    }

    /// Singleton resolution through the registration's own cell.
    ///
    /// The producer runs inside the cell: racing threads block until the
    /// first one finishes, so it runs once per successful build. A failed
    /// build leaves the cell empty for the next caller. Same-thread
    /// re-entry never reaches the cell; the circular check rejects it first.
    #[inline]
    pub(crate) fn resolve_singleton(&self, registration: &Registration) -> DiResult<AnyArc> {
        let ctx = ResolverContext::new(self);
        match &registration.singleton {
            Some(cell) => {
                if let Some(value) = cell.get() {
                    return Ok(value.clone());
                }
                cell.get_or_try_init(|| (registration.producer)(&ctx)).cloned()
            }
            None => (registration.producer)(&ctx),
        }
    }

    fn resolve_registration(&self, registration: &Registration) -> DiResult<AnyArc> {
        match registration.lifetime {
            Lifetime::Singleton => self.resolve_singleton(registration),
            Lifetime::Scoped => Err(DiError::WrongLifetime(
                "Cannot resolve scoped service from root provider",
            )),
            Lifetime::Transient => (registration.producer)(&ResolverContext::new(self)),
        }
    }
}

impl ResolverCore for ServiceProvider {
    fn resolve_any(&self, key: &ServiceKey) -> DiResult<AnyArc> {
        let inner = self.inner();
        inner.observers.observe(key, || {
            with_circular_catch(key, || match inner.registry.get(key) {
                Some(registration) => self.resolve_registration(registration),
                None => Err(DiError::NotFound(key.display_name())),
            })
        })
    }

    fn resolve_many(&self, key: &ServiceKey) -> DiResult<Vec<AnyArc>> {
        with_circular_catch(key, || {
            self.inner()
                .registry
                .get_all(key)
                .map(|registration| self.resolve_registration(registration))
                .collect()
        })
    }

    fn activator(&self) -> &ActivatorCache {
        &self.inner.activator
    }
}

impl Resolver for ServiceProvider {}

impl std::fmt::Debug for ServiceProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceProvider")
            .field("registrations", &self.len())
            .field("activator", &self.inner.activator)
            .finish()
    }
}
