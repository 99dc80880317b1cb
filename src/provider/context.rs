//! Resolver context handed to factories and decorator recipes.

use crate::activator::ActivatorCache;
use crate::descriptors::AnyArc;
use crate::error::DiResult;
use crate::key::ServiceKey;
use crate::traits::{Resolver, ResolverCore};

/// Context passed to factory functions for resolving dependencies.
///
/// Wraps the provider or scope performing the resolution, so a scoped
/// factory sees scoped dependencies and a singleton factory only sees the
/// root.
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
/// let mut services = ServiceCollection::new();
/// services.add_singleton(Database {
///     url: "postgres://localhost".to_string()
/// });
/// services.add_transient_factory::<UserService, _>(|resolver| {
///     UserService {
///         db: resolver.get_required::<Database>(),
///     }
/// });
///
/// let provider = services.build();
/// assert_eq!(provider.get_required::<UserService>().db.url, "postgres://localhost");
/// ```
pub struct ResolverContext<'a> {
    resolver: &'a dyn ResolverCore,
}

impl<'a> ResolverContext<'a> {
    pub(crate) fn new(resolver: &'a dyn ResolverCore) -> Self {
        Self { resolver }
    }
}

impl<'a> ResolverCore for ResolverContext<'a> {
    fn resolve_any(&self, key: &ServiceKey) -> DiResult<AnyArc> {
        self.resolver.resolve_any(key)
    }

    fn resolve_many(&self, key: &ServiceKey) -> DiResult<Vec<AnyArc>> {
        self.resolver.resolve_many(key)
    }

    fn activator(&self) -> &ActivatorCache {
        self.resolver.activator()
    }
}

impl<'a> Resolver for ResolverContext<'a> {}
