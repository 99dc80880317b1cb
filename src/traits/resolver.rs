//! Resolver traits for service resolution.

use std::any::type_name;
use std::panic;
use std::sync::Arc;

use crate::activator::{Activate, ActivatorCache};
use crate::descriptors::{downcast_service, AnyArc};
use crate::error::{DiError, DiResult};
use crate::internal::CircularPanic;
use crate::key::ServiceKey;

/// Object-safe core of every resolver.
///
/// Implemented by `ServiceProvider`, `Scope` and the `ResolverContext`
/// handed to factories. Values are type-erased; see [`Resolver`] for the
/// typed surface.
pub trait ResolverCore: Send + Sync {
    /// Resolves the last registration of `key`.
    ///
    /// # Returns
    ///
    /// * `Ok(AnyArc)` - The instance, erased as an `Arc<S>` for the key's service type
    /// * `Err(DiError::NotFound)` - Nothing is registered under `key`
    /// * `Err(DiError)` - The registration failed to produce an instance
    fn resolve_any(&self, key: &ServiceKey) -> DiResult<AnyArc>;

    /// Resolves every registration of `key`, in registration order.
    ///
    /// An unregistered key yields an empty vector.
    fn resolve_many(&self, key: &ServiceKey) -> DiResult<Vec<AnyArc>>;

    /// Construction plans shared by everything resolved from the same root.
    fn activator(&self) -> &ActivatorCache;
}

/// Typed resolution helpers.
///
/// # Examples
///
/// ```rust
/// use ferrous_decor::{ServiceCollection, Resolver};
/// use std::sync::Arc;
///
/// trait Logger: Send + Sync {
///     fn log(&self, msg: &str) -> String;
/// }
///
/// struct ConsoleLogger;
/// impl Logger for ConsoleLogger {
///     fn log(&self, msg: &str) -> String {
///         format!("LOG: {msg}")
///     }
/// }
///
/// let mut services = ServiceCollection::new();
/// services.add_instance::<dyn Logger>(Arc::new(ConsoleLogger));
/// services.add_singleton(42usize);
///
/// let provider = services.build();
/// let logger = provider.get_required::<dyn Logger>();
/// assert_eq!(logger.log("hi"), "LOG: hi");
/// assert_eq!(*provider.get::<usize>().unwrap(), 42);
/// ```
pub trait Resolver: ResolverCore {
    /// Resolves a service, sized type or trait object.
    fn get<S: ?Sized + Send + Sync + 'static>(&self) -> DiResult<Arc<S>> {
        self.get_key::<S>(&ServiceKey::of::<S>())
    }

    /// Resolves a service registered under an explicit key.
    ///
    /// Shadow keys are accepted here, which is how decorators reach the
    /// instance they wrap.
    fn get_key<S: ?Sized + Send + Sync + 'static>(&self, key: &ServiceKey) -> DiResult<Arc<S>> {
        downcast_service::<S>(self.resolve_any(key)?)
    }

    /// Resolves every registration of `S`, in registration order.
    fn get_all<S: ?Sized + Send + Sync + 'static>(&self) -> DiResult<Vec<Arc<S>>> {
        self.resolve_many(&ServiceKey::of::<S>())?
            .into_iter()
            .map(downcast_service::<S>)
            .collect()
    }

    /// Resolves a service, panicking on failure.
    ///
    /// Meant for factories, where a missing dependency is a configuration
    /// bug. A cycle detected here is reported to the enclosing resolution as
    /// [`DiError::Circular`] rather than as a panic.
    ///
    /// # Panics
    ///
    /// Panics if the service cannot be resolved.
    fn get_required<S: ?Sized + Send + Sync + 'static>(&self) -> Arc<S> {
        match self.get::<S>() {
            Ok(service) => service,
            Err(DiError::Circular(path)) => panic::panic_any(CircularPanic::new(path)),
            Err(err) => panic!("Failed to resolve {}: {}", type_name::<S>(), err),
        }
    }

    /// Constructs a fresh, unregistered `T` through the activator.
    fn create_instance<T: Activate>(&self) -> DiResult<Arc<T>>
    where
        Self: Sized,
    {
        let plan = self.activator().plan::<T>(&[])?;
        downcast_service::<T>(plan.invoke(self, &[])?)
    }
}
