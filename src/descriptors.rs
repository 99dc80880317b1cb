//! Service descriptors: the registration records that decoration rewrites.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use once_cell::sync::OnceCell;

use crate::activator::{Activate, ActivatorCache, ConstructionPlan, Implements};
use crate::error::{DiError, DiResult};
use crate::key::{ServiceKey, TypeInfo};
use crate::lifetime::Lifetime;
use crate::provider::ResolverContext;
use crate::traits::ResolverCore;

/// Type-erased resolved instance.
///
/// Always holds an `Arc<S>` where `S` is the service type of the key it was
/// resolved for, so both sized types and trait objects round-trip through
/// [`into_any`] and [`downcast_service`].
pub type AnyArc = Arc<dyn Any + Send + Sync>;

/// Factory stored by a [`Implementation::Factory`] strategy.
pub type FactoryFn = Arc<dyn for<'a> Fn(&ResolverContext<'a>) -> DiResult<AnyArc> + Send + Sync>;

/// Runtime producer of a registration.
pub type Producer = FactoryFn;

/// Erases a service handle.
#[inline]
pub fn into_any<S: ?Sized + Send + Sync + 'static>(service: Arc<S>) -> AnyArc {
    Arc::new(service)
}

/// Recovers a service handle erased with [`into_any`].
#[inline]
pub fn downcast_service<S: ?Sized + Send + Sync + 'static>(any: AnyArc) -> DiResult<Arc<S>> {
    any.downcast::<Arc<S>>()
        .map(|service| (*service).clone())
        .map_err(|_| DiError::TypeMismatch(std::any::type_name::<S>()))
}

fn plan_of<I: Activate>(cache: &ActivatorCache) -> DiResult<Arc<ConstructionPlan>> {
    cache.plan::<I>(&[])
}

fn upcast_to<S, I>(instance: AnyArc) -> DiResult<AnyArc>
where
    S: ?Sized + Send + Sync + 'static,
    I: Activate + Implements<S>,
{
    let concrete = downcast_service::<I>(instance)?;
    Ok(into_any::<S>(<I as Implements<S>>::upcast(concrete)))
}

/// A concrete type constructed by constructor injection.
#[derive(Clone, Copy)]
pub struct ImplementationType {
    info: TypeInfo,
    plan: fn(&ActivatorCache) -> DiResult<Arc<ConstructionPlan>>,
    upcast: fn(AnyArc) -> DiResult<AnyArc>,
}

impl ImplementationType {
    /// `I` activated and exposed as the service `S`.
    pub fn of<S, I>() -> Self
    where
        S: ?Sized + Send + Sync + 'static,
        I: Activate + Implements<S>,
    {
        Self {
            info: TypeInfo::of::<I>(),
            plan: plan_of::<I>,
            upcast: upcast_to::<S, I>,
        }
    }

    pub fn info(&self) -> TypeInfo {
        self.info
    }

    /// Fetches (building on first use) the construction plan from `cache`.
    pub fn plan(&self, cache: &ActivatorCache) -> DiResult<Arc<ConstructionPlan>> {
        (self.plan)(cache)
    }

    /// Constructs an instance, erased as the service type.
    pub fn activate(&self, resolver: &dyn ResolverCore) -> DiResult<AnyArc> {
        let plan = self.plan(resolver.activator())?;
        self.activate_with(&plan, resolver)
    }

    pub(crate) fn activate_with(
        &self,
        plan: &ConstructionPlan,
        resolver: &dyn ResolverCore,
    ) -> DiResult<AnyArc> {
        let instance = plan.invoke(resolver, &[])?;
        (self.upcast)(instance)
    }
}

impl fmt::Debug for ImplementationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.info.name())
    }
}

/// How a registration produces its instance.
///
/// Exactly one strategy per registration.
#[derive(Clone)]
pub enum Implementation {
    /// Construct a concrete type through the activator
    Type(ImplementationType),
    /// Call a factory with the resolver
    Factory(FactoryFn),
    /// Hand out a pre-built instance
    Instance(AnyArc),
}

impl Implementation {
    /// Builds the runtime producer for this strategy.
    ///
    /// A `Type` producer memoizes its construction plan after the first
    /// activation, so steady-state resolution skips the shared cache.
    pub fn to_producer(&self) -> Producer {
        match self {
            Implementation::Type(ty) => {
                let ty = *ty;
                let memo: Arc<OnceCell<Arc<ConstructionPlan>>> = Arc::new(OnceCell::new());
                Arc::new(move |ctx: &ResolverContext<'_>| -> DiResult<AnyArc> {
                    let plan = match memo.get() {
                        Some(plan) => plan.clone(),
                        None => {
                            let plan = ty.plan(ctx.activator())?;
                            memo.get_or_init(|| plan).clone()
                        }
                    };
                    ty.activate_with(&plan, ctx)
                })
            }
            Implementation::Factory(factory) => factory.clone(),
            Implementation::Instance(instance) => {
                let instance = instance.clone();
                Arc::new(move |_: &ResolverContext<'_>| -> DiResult<AnyArc> { Ok(instance.clone()) })
            }
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Implementation::Type(_) => "type",
            Implementation::Factory(_) => "factory",
            Implementation::Instance(_) => "instance",
        }
    }
}

impl fmt::Debug for Implementation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Implementation::Type(ty) => write!(f, "Type({ty:?})"),
            Implementation::Factory(_) => f.write_str("Factory(..)"),
            Implementation::Instance(_) => f.write_str("Instance(..)"),
        }
    }
}

/// One registration in a service registry.
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
/// use ferrous_decor::{
///     into_any, DiError, Implementation, Lifetime, ServiceDescriptor, ServiceKey,
/// };
///
/// let key = ServiceKey::of::<String>();
/// let instance = Implementation::Instance(into_any(Arc::new("hello".to_string())));
///
/// let descriptor =
///     ServiceDescriptor::new(key.clone(), Lifetime::Singleton, instance.clone()).unwrap();
/// let moved = descriptor.rehome(key.shadow());
/// assert!(moved.key().is_shadow());
/// assert_eq!(moved.lifetime(), Lifetime::Singleton);
///
/// // Instances are always singletons.
/// assert!(matches!(
///     ServiceDescriptor::new(key, Lifetime::Scoped, instance),
///     Err(DiError::InvalidRegistration(_))
/// ));
/// ```
#[derive(Clone)]
pub struct ServiceDescriptor {
    key: ServiceKey,
    lifetime: Lifetime,
    implementation: Implementation,
    wraps: Option<ServiceKey>,
}

impl ServiceDescriptor {
    /// Creates a descriptor, rejecting an instance with a non-singleton lifetime.
    pub fn new(
        key: ServiceKey,
        lifetime: Lifetime,
        implementation: Implementation,
    ) -> DiResult<Self> {
        if key.is_open_generic() {
            return Err(DiError::InvalidRegistration(format!(
                "open generic family {} cannot be registered directly",
                key.display_name()
            )));
        }
        if matches!(implementation, Implementation::Instance(_)) && lifetime != Lifetime::Singleton {
            return Err(DiError::InvalidRegistration(format!(
                "instance registration for {} must be a singleton, not {}",
                key.display_name(),
                lifetime
            )));
        }
        Ok(Self::from_parts(key, lifetime, implementation))
    }

    pub(crate) fn from_parts(key: ServiceKey, lifetime: Lifetime, implementation: Implementation) -> Self {
        Self {
            key,
            lifetime,
            implementation,
            wraps: None,
        }
    }

    /// A decorator registration whose factory resolves `shadow`.
    pub(crate) fn decorator(key: ServiceKey, lifetime: Lifetime, shadow: ServiceKey, factory: FactoryFn) -> Self {
        Self {
            key,
            lifetime,
            implementation: Implementation::Factory(factory),
            wraps: Some(shadow),
        }
    }

    pub fn key(&self) -> &ServiceKey {
        &self.key
    }

    pub fn lifetime(&self) -> Lifetime {
        self.lifetime
    }

    pub fn implementation(&self) -> &Implementation {
        &self.implementation
    }

    /// Type name of the service key.
    pub fn type_name(&self) -> &'static str {
        self.key.display_name()
    }

    /// Name of the concrete implementation type, when the strategy knows it.
    pub fn impl_type_name(&self) -> Option<&'static str> {
        match &self.implementation {
            Implementation::Type(ty) => Some(ty.info().name()),
            _ => None,
        }
    }

    /// For a decorator registration, the shadow key holding what it wraps.
    pub fn wrapped_key(&self) -> Option<&ServiceKey> {
        self.wraps.as_ref()
    }

    /// The same strategy and lifetime registered under a different key.
    pub fn rehome(&self, key: ServiceKey) -> ServiceDescriptor {
        Self {
            key,
            lifetime: self.lifetime,
            implementation: self.implementation.clone(),
            wraps: self.wraps.clone(),
        }
    }
}

impl fmt::Debug for ServiceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceDescriptor")
            .field("key", &self.key)
            .field("lifetime", &self.lifetime)
            .field("implementation", &self.implementation)
            .field("wraps", &self.wraps)
            .finish()
    }
}
