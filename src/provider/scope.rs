//! Scoped service resolution.

use once_cell::sync::OnceCell;

use crate::activator::ActivatorCache;
use crate::descriptors::AnyArc;
use crate::error::{DiError, DiResult};
use crate::internal::with_circular_catch;
use crate::key::ServiceKey;
use crate::lifetime::Lifetime;
use crate::registration::Registration;
use crate::traits::{Resolver, ResolverCore};

use super::{ResolverContext, ServiceProvider};

/// Scoped service container.
///
/// - **Singleton**: resolved and cached in the root provider
/// - **Scoped**: resolved and cached in this scope
/// - **Transient**: created on every resolution, with this scope as resolver
///
/// A decorated scoped service and the shadow holding its original are both
/// scoped, so each scope builds one original and one decorator around it.
///
/// # Examples
///
/// ```
/// use ferrous_decor::{ServiceCollection, Resolver};
/// use std::sync::Arc;
///
/// struct DatabaseConnection(String);
/// struct UserService { db: Arc<DatabaseConnection> }
///
/// let mut collection = ServiceCollection::new();
/// collection.add_scoped_factory::<DatabaseConnection, _>(|_| {
///     DatabaseConnection("connection-123".to_string())
/// });
/// collection.add_transient_factory::<UserService, _>(|resolver| {
///     UserService { db: resolver.get_required::<DatabaseConnection>() }
/// });
///
/// let provider = collection.build();
/// let scope = provider.create_scope();
/// let a = scope.get_required::<UserService>();
/// let b = scope.get_required::<UserService>();
/// assert!(!Arc::ptr_eq(&a, &b));
/// assert!(Arc::ptr_eq(&a.db, &b.db));
/// ```
pub struct Scope {
    root: ServiceProvider,
    scoped_cells: Box<[OnceCell<AnyArc>]>,
}

impl Scope {
    pub(crate) fn new(root: ServiceProvider, scoped_cells: Box<[OnceCell<AnyArc>]>) -> Self {
        Self { root, scoped_cells }
    }

    /// The provider this scope was created from.
    pub fn provider(&self) -> &ServiceProvider {
        &self.root
    }

    /// Like singletons, a scoped producer runs inside its cell and at most
    /// once per scope.
    #[inline]
    fn resolve_scoped(&self, registration: &Registration) -> DiResult<AnyArc> {
        let ctx = ResolverContext::new(self);
        let Some(cell) = registration.scoped_slot.and_then(|slot| self.scoped_cells.get(slot)) else {
            return (registration.producer)(&ctx);
        };
        if let Some(value) = cell.get() {
            return Ok(value.clone());
        }
        cell.get_or_try_init(|| (registration.producer)(&ctx)).cloned()
    }

    fn resolve_registration(&self, registration: &Registration) -> DiResult<AnyArc> {
        match registration.lifetime {
            Lifetime::Singleton => self.root.resolve_singleton(registration),
            Lifetime::Scoped => self.resolve_scoped(registration),
            Lifetime::Transient => (registration.producer)(&ResolverContext::new(self)),
        }
    }
}

impl ResolverCore for Scope {
    fn resolve_any(&self, key: &ServiceKey) -> DiResult<AnyArc> {
        let inner = self.root.inner();
        inner.observers.observe(key, || {
            with_circular_catch(key, || match inner.registry.get(key) {
                Some(registration) => self.resolve_registration(registration),
                None => Err(DiError::NotFound(key.display_name())),
            })
        })
    }

    fn resolve_many(&self, key: &ServiceKey) -> DiResult<Vec<AnyArc>> {
        with_circular_catch(key, || {
            self.root
                .inner()
                .registry
                .get_all(key)
                .map(|registration| self.resolve_registration(registration))
                .collect()
        })
    }

    fn activator(&self) -> &ActivatorCache {
        self.root.activator()
    }
}

impl Resolver for Scope {}
