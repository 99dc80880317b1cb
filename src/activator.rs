//! Constructor injection for implementation and decorator types.
//!
//! A type opts in by implementing [`Activate`], describing its constructor as
//! an ordered parameter list plus a build closure. The first activation of a
//! type (for a given set of explicit argument types) compiles that
//! description into a [`ConstructionPlan`] that binds every parameter either
//! to an explicit argument or to a resolver lookup. Plans are cached in the
//! provider's [`ActivatorCache`] and built exactly once, even when many
//! threads race on first use.

use std::any::TypeId;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use once_cell::sync::OnceCell;
use parking_lot::RwLock;

use crate::descriptors::{downcast_service, into_any, AnyArc};
use crate::error::{DiError, DiResult};
use crate::internal::FastMap;
use crate::key::{ServiceKey, TypeInfo};
use crate::traits::ResolverCore;

/// Exposes a concrete type as a service type.
///
/// Every type implements `Implements<Self>`. Trait-object services need an
/// explicit impl, usually a one-line unsizing coercion; the
/// [`implements!`](crate::implements) macro writes it for non-generic types.
///
/// ```rust
/// use std::sync::Arc;
/// use ferrous_decor::Implements;
///
/// trait Clock: Send + Sync {
///     fn now(&self) -> u64;
/// }
///
/// struct Fixed;
/// impl Clock for Fixed {
///     fn now(&self) -> u64 { 42 }
/// }
///
/// ferrous_decor::implements!(dyn Clock => Fixed);
///
/// let clock: Arc<dyn Clock> = <Fixed as Implements<dyn Clock>>::upcast(Arc::new(Fixed));
/// assert_eq!(clock.now(), 42);
/// ```
pub trait Implements<S: ?Sized>: Send + Sync + 'static {
    fn upcast(self: Arc<Self>) -> Arc<S>;
}

impl<T: Send + Sync + 'static> Implements<T> for T {
    #[inline]
    fn upcast(self: Arc<Self>) -> Arc<T> {
        self
    }
}

/// Implements [`Implements`] for one or more concrete types.
#[macro_export]
macro_rules! implements {
    ($service:ty => $($concrete:ty),+ $(,)?) => {
        $(
            impl $crate::Implements<$service> for $concrete {
                fn upcast(self: ::std::sync::Arc<Self>) -> ::std::sync::Arc<$service> {
                    self
                }
            }
        )+
    };
}

/// A type that can be built by constructor injection.
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
/// use ferrous_decor::{Activate, Constructor, Resolver, ServiceCollection};
///
/// struct Config { retries: u32 }
/// struct Metrics;
///
/// struct Client {
///     config: Arc<Config>,
///     metrics: Option<Arc<Metrics>>,
/// }
///
/// impl Activate for Client {
///     fn constructor() -> Constructor<Self> {
///         Constructor::new(|args| {
///             Ok(Client {
///                 config: args.next()?,
///                 metrics: args.next_optional()?,
///             })
///         })
///         .param::<Config>("config")
///         .optional::<Metrics>("metrics")
///     }
/// }
///
/// let mut services = ServiceCollection::new();
/// services.add_singleton(Config { retries: 3 });
/// let provider = services.build();
///
/// let client = provider.create_instance::<Client>().unwrap();
/// assert_eq!(client.config.retries, 3);
/// assert!(client.metrics.is_none());
/// ```
pub trait Activate: Sized + Send + Sync + 'static {
    fn constructor() -> Constructor<Self>;
}

/// One constructor parameter.
#[derive(Debug, Clone)]
pub struct Parameter {
    name: &'static str,
    key: ServiceKey,
    optional: bool,
}

impl Parameter {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn key(&self) -> &ServiceKey {
        &self.key
    }

    pub fn is_optional(&self) -> bool {
        self.optional
    }

    fn describe(&self) -> String {
        format!("{}: {}", self.name, self.key.display_name())
    }
}

type BuildFn<T> = Arc<dyn Fn(&mut Arguments<'_>) -> DiResult<T> + Send + Sync>;

/// Declared constructor of an [`Activate`] type.
pub struct Constructor<T> {
    parameters: Vec<Parameter>,
    build: BuildFn<T>,
}

impl<T: Send + Sync + 'static> Constructor<T> {
    /// Starts a constructor; parameters are declared with [`param`](Self::param)
    /// and [`optional`](Self::optional) in the order `build` reads them.
    pub fn new<F>(build: F) -> Self
    where
        F: Fn(&mut Arguments<'_>) -> DiResult<T> + Send + Sync + 'static,
    {
        Self {
            parameters: Vec::new(),
            build: Arc::new(build),
        }
    }

    /// Declares a required parameter of service type `S`.
    pub fn param<S: ?Sized + 'static>(mut self, name: &'static str) -> Self {
        self.parameters.push(Parameter {
            name,
            key: ServiceKey::of::<S>(),
            optional: false,
        });
        self
    }

    /// Declares a parameter that becomes `None` when `S` is not registered.
    pub fn optional<S: ?Sized + 'static>(mut self, name: &'static str) -> Self {
        self.parameters.push(Parameter {
            name,
            key: ServiceKey::of::<S>(),
            optional: true,
        });
        self
    }

    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }
}

/// Positional cursor over the values supplied to a constructor.
pub struct Arguments<'p> {
    ty: &'static str,
    parameters: &'p [Parameter],
    values: Vec<Option<AnyArc>>,
    position: usize,
}

impl<'p> Arguments<'p> {
    fn new(ty: &'static str, parameters: &'p [Parameter], values: Vec<Option<AnyArc>>) -> Self {
        Self {
            ty,
            parameters,
            values,
            position: 0,
        }
    }

    fn advance(&mut self) -> DiResult<(&'p Parameter, Option<AnyArc>)> {
        let parameters = self.parameters;
        let index = self.position;
        let parameter = parameters.get(index).ok_or_else(|| DiError::Activation {
            ty: self.ty,
            parameter: format!("#{index} (not declared)"),
        })?;
        self.position += 1;
        Ok((parameter, self.values[index].take()))
    }

    /// Takes the next required argument.
    pub fn next<S: ?Sized + Send + Sync + 'static>(&mut self) -> DiResult<Arc<S>> {
        let (parameter, value) = self.advance()?;
        match value {
            Some(value) => downcast_service::<S>(value),
            None => Err(DiError::Activation {
                ty: self.ty,
                parameter: parameter.describe(),
            }),
        }
    }

    /// Takes the next optional argument.
    pub fn next_optional<S: ?Sized + Send + Sync + 'static>(&mut self) -> DiResult<Option<Arc<S>>> {
        let (_, value) = self.advance()?;
        value.map(downcast_service::<S>).transpose()
    }

    /// Arguments not yet taken.
    pub fn remaining(&self) -> usize {
        self.parameters.len() - self.position
    }
}

#[derive(Debug, Clone)]
enum Binding {
    Explicit(usize),
    Resolve(ServiceKey),
    Optional(ServiceKey),
}

/// Compiled constructor of one type for one set of explicit argument types.
pub struct ConstructionPlan {
    ty: TypeInfo,
    parameters: Vec<Parameter>,
    bindings: Vec<Binding>,
    explicit: usize,
    build: Arc<dyn Fn(&mut Arguments<'_>) -> DiResult<AnyArc> + Send + Sync>,
}

impl ConstructionPlan {
    /// Binds `T`'s constructor parameters.
    ///
    /// Each explicit argument type binds to the first unused parameter of the
    /// same type; every other parameter is looked up in the resolver at
    /// invocation time. An explicit argument that no parameter accepts is an
    /// activation error.
    pub fn build<T: Activate>(explicit: &[TypeId]) -> DiResult<Self> {
        let ty = TypeInfo::of::<T>();
        let constructor = T::constructor();
        let mut used = vec![false; explicit.len()];

        let bindings = constructor
            .parameters
            .iter()
            .map(|parameter| {
                let slot = explicit
                    .iter()
                    .enumerate()
                    .position(|(i, id)| !used[i] && *id == parameter.key.service_type().type_id());
                match slot {
                    Some(i) => {
                        used[i] = true;
                        Binding::Explicit(i)
                    }
                    None if parameter.optional => Binding::Optional(parameter.key.clone()),
                    None => Binding::Resolve(parameter.key.clone()),
                }
            })
            .collect();

        if let Some(unused) = used.iter().position(|used| !used) {
            return Err(DiError::Activation {
                ty: ty.name(),
                parameter: format!("explicit argument #{unused} matches no parameter"),
            });
        }

        let build = constructor.build;
        Ok(Self {
            ty,
            parameters: constructor.parameters,
            bindings,
            explicit: explicit.len(),
            build: Arc::new(move |args: &mut Arguments<'_>| -> DiResult<AnyArc> {
                build(args).map(|value| into_any(Arc::new(value)))
            }),
        })
    }

    pub fn ty(&self) -> TypeInfo {
        self.ty
    }

    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    /// Constructs an instance, erased as the concrete type.
    ///
    /// `explicit` must hold one value per explicit argument type the plan was
    /// built for, in the same order.
    pub fn invoke(&self, resolver: &dyn ResolverCore, explicit: &[AnyArc]) -> DiResult<AnyArc> {
        if explicit.len() != self.explicit {
            return Err(DiError::Activation {
                ty: self.ty.name(),
                parameter: format!(
                    "expected {} explicit arguments, got {}",
                    self.explicit,
                    explicit.len()
                ),
            });
        }

        let mut values = Vec::with_capacity(self.bindings.len());
        for (parameter, binding) in self.parameters.iter().zip(&self.bindings) {
            let value = match binding {
                Binding::Explicit(i) => Some(explicit[*i].clone()),
                Binding::Resolve(key) => match resolver.resolve_any(key) {
                    Ok(value) => Some(value),
                    Err(DiError::NotFound(name)) if name == key.display_name() => {
                        return Err(DiError::Activation {
                            ty: self.ty.name(),
                            parameter: parameter.describe(),
                        })
                    }
                    Err(err) => return Err(err),
                },
                Binding::Optional(key) => match resolver.resolve_any(key) {
                    Ok(value) => Some(value),
                    Err(DiError::NotFound(name)) if name == key.display_name() => None,
                    Err(err) => return Err(err),
                },
            };
            values.push(value);
        }

        let mut args = Arguments::new(self.ty.name(), &self.parameters, values);
        (self.build)(&mut args)
    }
}

impl fmt::Debug for ConstructionPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConstructionPlan")
            .field("ty", &self.ty)
            .field("bindings", &self.bindings)
            .finish()
    }
}

#[derive(Clone, PartialEq, Eq, Hash)]
struct PlanKey {
    ty: TypeId,
    explicit: Box<[TypeId]>,
}

type PlanSlot = Arc<OnceCell<Arc<ConstructionPlan>>>;

/// Lazily built construction plans, keyed by type and explicit argument types.
///
/// The write lock is only taken to insert an empty slot; the plan itself is
/// built inside the slot's `OnceCell`, so concurrent first uses of the same
/// key wait for a single build and unrelated keys never contend.
#[derive(Default)]
pub struct ActivatorCache {
    slots: RwLock<FastMap<PlanKey, PlanSlot>>,
    built: AtomicUsize,
    lookups: AtomicUsize,
}

impl ActivatorCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the plan for `T` with the given explicit argument types.
    pub fn plan<T: Activate>(&self, explicit: &[TypeId]) -> DiResult<Arc<ConstructionPlan>> {
        self.lookups.fetch_add(1, Ordering::Relaxed);
        let key = PlanKey {
            ty: TypeId::of::<T>(),
            explicit: explicit.into(),
        };
        let slot = self.slot(key);
        if let Some(plan) = slot.get() {
            return Ok(plan.clone());
        }
        slot.get_or_try_init(|| {
            self.built.fetch_add(1, Ordering::Relaxed);
            tracing::trace!(ty = std::any::type_name::<T>(), explicit = explicit.len(), "building construction plan");
            ConstructionPlan::build::<T>(explicit).map(Arc::new)
        })
        .cloned()
    }

    /// Builds (or reuses the plan for) `T` and invokes it.
    pub fn activate<T: Activate>(
        &self,
        resolver: &dyn ResolverCore,
        explicit: &[(TypeId, AnyArc)],
    ) -> DiResult<Arc<T>> {
        let types: Vec<TypeId> = explicit.iter().map(|(id, _)| *id).collect();
        let values: Vec<AnyArc> = explicit.iter().map(|(_, value)| value.clone()).collect();
        let plan = self.plan::<T>(&types)?;
        downcast_service::<T>(plan.invoke(resolver, &values)?)
    }

    /// Number of plans built so far, counting failed builds.
    pub fn plans_built(&self) -> usize {
        self.built.load(Ordering::Relaxed)
    }

    /// Number of plan lookups, cache hits included.
    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::Relaxed)
    }

    /// Number of distinct (type, explicit types) keys seen.
    pub fn len(&self) -> usize {
        self.slots.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn slot(&self, key: PlanKey) -> PlanSlot {
        if let Some(slot) = self.slots.read().get(&key) {
            return slot.clone();
        }
        self.slots.write().entry(key).or_default().clone()
    }
}

impl fmt::Debug for ActivatorCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActivatorCache")
            .field("slots", &self.len())
            .field("plans_built", &self.plans_built())
            .field("lookups", &self.lookups())
            .finish()
    }
}
