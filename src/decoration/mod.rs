//! Service decoration.
//!
//! Decorating a registration rewrites the registry in place: the original
//! registration is re-homed under a fresh shadow key (appended at the end),
//! and its slot is taken over by a factory that resolves the shadow key and
//! hands the instance to a decorator. Callers keep resolving the original
//! key and transparently receive the decorator.
//!
//! Applying several decorations to the same key builds a chain whose
//! outermost layer is the last one applied.

use std::any::TypeId;
use std::fmt;
use std::sync::Arc;

use once_cell::sync::OnceCell;

use crate::activator::{Activate, ConstructionPlan, Implements};
use crate::config::DecorationConfig;
use crate::descriptors::{downcast_service, into_any, AnyArc, FactoryFn, ServiceDescriptor};
use crate::error::DiResult;
use crate::generic::{GenericArguments, GenericDefinition, OpenDecorator};
use crate::internal::FastMap;
use crate::key::ServiceKey;
use crate::observer::Observers;
use crate::provider::ResolverContext;
use crate::traits::ResolverCore;

pub mod api;
mod registry;

pub use registry::ServiceRegistry;

/// A reusable decorator object for service type `S`.
///
/// # Examples
///
/// ```
/// use ferrous_decor::{ResolverContext, ServiceCollection, ServiceDecorator, Resolver};
/// use std::sync::Arc;
///
/// trait Logger: Send + Sync {
///     fn log(&self, message: &str) -> String;
/// }
///
/// struct ConsoleLogger;
/// impl Logger for ConsoleLogger {
///     fn log(&self, message: &str) -> String {
///         format!("LOG: {message}")
///     }
/// }
///
/// struct Timestamped;
///
/// impl ServiceDecorator<dyn Logger> for Timestamped {
///     fn decorate(&self, inner: Arc<dyn Logger>, _: &ResolverContext<'_>) -> Arc<dyn Logger> {
///         struct TimestampLogger {
///             inner: Arc<dyn Logger>,
///         }
///         impl Logger for TimestampLogger {
///             fn log(&self, message: &str) -> String {
///                 self.inner.log(&format!("[00:00] {message}"))
///             }
///         }
///         Arc::new(TimestampLogger { inner })
///     }
/// }
///
/// let mut services = ServiceCollection::new();
/// services.add_instance::<dyn Logger>(Arc::new(ConsoleLogger));
/// services.decorate_using::<dyn Logger, _>(Timestamped).unwrap();
///
/// let logger = services.build().get_required::<dyn Logger>();
/// assert_eq!(logger.log("hello"), "LOG: [00:00] hello");
/// ```
pub trait ServiceDecorator<S: ?Sized + Send + Sync + 'static>: Send + Sync {
    /// Wraps (or replaces) the instance being resolved.
    fn decorate(&self, inner: Arc<S>, resolver: &ResolverContext<'_>) -> Arc<S>;
}

/// Type-erased decoration step: original instance in, decorated instance out.
pub type Recipe = Arc<dyn for<'a> Fn(AnyArc, &ResolverContext<'a>) -> DiResult<AnyArc> + Send + Sync>;

/// A named [`Recipe`].
#[derive(Clone)]
pub struct Decorator {
    name: &'static str,
    recipe: Recipe,
}

impl Decorator {
    /// Constructs `D` through the activator, passing the original instance as
    /// the explicit argument of type `S`. Every other constructor parameter
    /// is resolved from the container.
    ///
    /// The plan is fetched from the activator cache on first use and kept by
    /// the decorator afterwards.
    pub fn activated<S, D>() -> Self
    where
        S: ?Sized + Send + Sync + 'static,
        D: Activate + Implements<S>,
    {
        let memo: Arc<OnceCell<Arc<ConstructionPlan>>> = Arc::new(OnceCell::new());
        Self {
            name: std::any::type_name::<D>(),
            recipe: Arc::new(move |inner: AnyArc, ctx: &ResolverContext<'_>| -> DiResult<AnyArc> {
                let plan = match memo.get() {
                    Some(plan) => plan.clone(),
                    None => {
                        let plan = ctx.activator().plan::<D>(&[TypeId::of::<S>()])?;
                        memo.get_or_init(|| plan).clone()
                    }
                };
                let decorator = downcast_service::<D>(plan.invoke(ctx, &[inner])?)?;
                Ok(into_any::<S>(<D as Implements<S>>::upcast(decorator)))
            }),
        }
    }

    /// Decorates with a function of the original instance and the resolver.
    pub fn with<S, F>(f: F) -> Self
    where
        S: ?Sized + Send + Sync + 'static,
        F: Fn(Arc<S>, &ResolverContext<'_>) -> Arc<S> + Send + Sync + 'static,
    {
        Self {
            name: std::any::type_name::<F>(),
            recipe: Arc::new(move |inner: AnyArc, ctx: &ResolverContext<'_>| -> DiResult<AnyArc> {
                let inner = downcast_service::<S>(inner)?;
                Ok(into_any::<S>(f(inner, ctx)))
            }),
        }
    }

    /// Decorates with a [`ServiceDecorator`] object.
    pub fn using<S, D>(decorator: D) -> Self
    where
        S: ?Sized + Send + Sync + 'static,
        D: ServiceDecorator<S> + 'static,
    {
        Self {
            name: std::any::type_name::<D>(),
            recipe: Arc::new(move |inner: AnyArc, ctx: &ResolverContext<'_>| -> DiResult<AnyArc> {
                let inner = downcast_service::<S>(inner)?;
                Ok(into_any::<S>(decorator.decorate(inner, ctx)))
            }),
        }
    }

    /// Wraps an untyped recipe. The recipe must return an instance erased as
    /// the same service type it received.
    pub fn erased<F>(name: &'static str, recipe: F) -> Self
    where
        F: for<'a> Fn(AnyArc, &ResolverContext<'a>) -> DiResult<AnyArc> + Send + Sync + 'static,
    {
        Self {
            name,
            recipe: Arc::new(recipe),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn recipe(&self) -> &Recipe {
        &self.recipe
    }

    /// Runs the recipe on an original instance.
    pub fn apply(&self, inner: AnyArc, ctx: &ResolverContext<'_>) -> DiResult<AnyArc> {
        (self.recipe)(inner, ctx)
    }
}

impl fmt::Debug for Decorator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Decorator({})", self.name)
    }
}

/// Which registrations a decoration selects.
#[derive(Debug, Clone)]
pub enum DecorationTarget {
    /// Every registration under this exact key
    Key(ServiceKey),
    /// Every closed member of a generic family
    Family(GenericDefinition),
}

impl DecorationTarget {
    /// True if the registration under `candidate` is selected, judging the
    /// key alone.
    ///
    /// Shadow keys are never selected. The decoration pass also treats a
    /// family member registered without generic metadata as selected; see
    /// [`decorate_services`].
    pub fn selects(&self, candidate: &ServiceKey) -> bool {
        if candidate.is_shadow() {
            return false;
        }
        match self {
            DecorationTarget::Key(key) => key == candidate,
            DecorationTarget::Family(family) => crate::generic::matches(candidate, family),
        }
    }

    /// Name used in errors and logs.
    pub fn name(&self) -> &'static str {
        match self {
            DecorationTarget::Key(key) => key.display_name(),
            DecorationTarget::Family(family) => family.name(),
        }
    }
}

/// What a selected registration is decorated with.
#[derive(Debug, Clone)]
pub enum DecoratorRecipe {
    /// The same decorator for every selected registration
    Closed(Decorator),
    /// A decorator closed per selected registration
    Open(OpenDecorator),
}

/// A single decoration to apply to a registry.
#[derive(Debug, Clone)]
pub struct DecorationRequest {
    target: DecorationTarget,
    recipe: DecoratorRecipe,
}

impl DecorationRequest {
    pub fn new(target: DecorationTarget, recipe: DecoratorRecipe) -> Self {
        Self { target, recipe }
    }

    /// Decorates every registration of `key` with `decorator`.
    pub fn closed(key: ServiceKey, decorator: Decorator) -> Self {
        Self::new(DecorationTarget::Key(key), DecoratorRecipe::Closed(decorator))
    }

    /// Decorates every member of the decorator's family that it can close.
    pub fn open(decorator: OpenDecorator) -> Self {
        Self::new(
            DecorationTarget::Family(*decorator.definition()),
            DecoratorRecipe::Open(decorator),
        )
    }

    pub fn target(&self) -> &DecorationTarget {
        &self.target
    }

    pub fn recipe(&self) -> &DecoratorRecipe {
        &self.recipe
    }

    /// The decorator for one selected registration, or `None` to skip it.
    pub fn recipe_for(&self, candidate: &ServiceKey) -> Option<Decorator> {
        match &self.recipe {
            DecoratorRecipe::Closed(decorator) => Some(decorator.clone()),
            DecoratorRecipe::Open(open) => open.close(candidate),
        }
    }

    fn select(&self, candidate: &ServiceKey, members: &FastMap<TypeId, GenericArguments>) -> Selection {
        if candidate.is_shadow() || candidate.is_open_generic() {
            return Selection::Ignored;
        }
        let ty = candidate.service_type();
        let arguments = ty
            .generic_arguments()
            .or_else(|| members.get(&ty.type_id()));
        let selected = match &self.target {
            DecorationTarget::Key(key) => key == candidate,
            DecorationTarget::Family(family) => match arguments {
                Some(arguments) => arguments.definition() == family,
                None => matches!(&self.recipe, DecoratorRecipe::Open(open) if open.has_binding(ty.type_id())),
            },
        };
        if !selected {
            return Selection::Ignored;
        }
        let decorator = match &self.recipe {
            DecoratorRecipe::Closed(decorator) => Some(decorator.clone()),
            DecoratorRecipe::Open(open) => open.close_with(candidate, arguments),
        };
        match decorator {
            Some(decorator) => Selection::Decorate(decorator),
            None => Selection::Skipped,
        }
    }
}

enum Selection {
    Ignored,
    Skipped,
    Decorate(Decorator),
}

/// Generic arguments of every member of `family` found among the first `len`
/// registrations, by service type.
///
/// Key equality ignores generic metadata, so a type registered once with it
/// and once without is the same service; both registrations must be seen as
/// members.
fn family_members<R>(registry: &R, family: &GenericDefinition, len: usize) -> FastMap<TypeId, GenericArguments>
where
    R: ServiceRegistry + ?Sized,
{
    let mut members = FastMap::default();
    for index in 0..len {
        let Some(descriptor) = registry.get(index) else {
            continue;
        };
        let key = descriptor.key();
        if !crate::generic::matches(key, family) {
            continue;
        }
        if let Some(arguments) = key.service_type().generic_arguments() {
            members
                .entry(key.service_type().type_id())
                .or_insert_with(|| arguments.clone());
        }
    }
    members
}

fn decorated_factory(shadow: ServiceKey, decorator: Decorator) -> FactoryFn {
    Arc::new(move |ctx: &ResolverContext<'_>| -> DiResult<AnyArc> {
        let inner = ctx.resolve_any(&shadow)?;
        decorator.apply(inner, ctx)
    })
}

/// Applies one decoration request to a registry and returns how many
/// registrations were decorated.
///
/// Scans from the last registration to the first, over the registrations
/// present when the pass starts; shadows appended by the pass are never
/// revisited. Existing indices never move.
///
/// A family request selects by service type: once any registration of a
/// type carries the family's generic arguments, every registration of that
/// type is a member, however it was added. A type the open decorator has an
/// explicit binding for is a member too.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use ferrous_decor::{
///     decorate_services, into_any, DecorationConfig, DecorationRequest, Decorator,
///     Implementation, Lifetime, Observers, ServiceDescriptor, ServiceKey,
/// };
///
/// let key = ServiceKey::of::<u32>();
/// let mut registry = vec![ServiceDescriptor::new(
///     key.clone(),
///     Lifetime::Singleton,
///     Implementation::Instance(into_any(Arc::new(1u32))),
/// )
/// .unwrap()];
///
/// let request = DecorationRequest::closed(key.clone(), Decorator::erased("noop", |inner, _| Ok(inner)));
/// let count = decorate_services(&mut registry, &request, &Observers::new(), &DecorationConfig::default());
///
/// assert_eq!(count, 1);
/// assert_eq!(registry.len(), 2);
/// assert_eq!(registry[0].key(), &key);
/// assert!(registry[1].key().is_shadow());
/// ```
pub fn decorate_services<R>(
    registry: &mut R,
    request: &DecorationRequest,
    observers: &Observers,
    config: &DecorationConfig,
) -> usize
where
    R: ServiceRegistry + ?Sized,
{
    let len = registry.len();
    let target = request.target().name();
    tracing::trace!(target_type = target, registrations = len, "scanning registry for decoration");

    let members = match request.target() {
        DecorationTarget::Family(family) => family_members(&*registry, family, len),
        DecorationTarget::Key(_) => FastMap::default(),
    };

    let mut count = 0;
    for index in (0..len).rev() {
        let Some(descriptor) = registry.get(index) else {
            continue;
        };
        let decorator = match request.select(descriptor.key(), &members) {
            Selection::Ignored => continue,
            Selection::Skipped => {
                let key = descriptor.key();
                let reason = "decorator cannot be closed for this instantiation";
                if config.warn_on_skipped_candidates {
                    tracing::warn!(key = %key, reason, "skipping decoration candidate");
                } else {
                    tracing::debug!(key = %key, reason, "skipping decoration candidate");
                }
                observers.decoration_skipped(key, reason);
                continue;
            }
            Selection::Decorate(decorator) => decorator,
        };
        let descriptor = descriptor.clone();
        let key = descriptor.key();

        let shadow = key.shadow();
        registry.push(descriptor.rehome(shadow.clone()));
        registry.set(
            index,
            ServiceDescriptor::decorator(
                key.clone(),
                descriptor.lifetime(),
                shadow.clone(),
                decorated_factory(shadow.clone(), decorator.clone()),
            ),
        );

        tracing::debug!(
            key = %key,
            shadow = ?shadow,
            lifetime = %descriptor.lifetime(),
            decorator = decorator.name(),
            index,
            "decorated registration"
        );
        observers.decorated(key, &shadow);
        count += 1;
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptors::Implementation;
    use crate::lifetime::Lifetime;

    fn instance<T: Send + Sync + 'static>(value: T) -> ServiceDescriptor {
        ServiceDescriptor::new(
            ServiceKey::of::<T>(),
            Lifetime::Singleton,
            Implementation::Instance(into_any(Arc::new(value))),
        )
        .unwrap()
    }

    fn noop() -> Decorator {
        Decorator::erased("noop", |inner, _| Ok(inner))
    }

    fn run(registry: &mut Vec<ServiceDescriptor>, request: &DecorationRequest) -> usize {
        decorate_services(registry, request, &Observers::new(), &DecorationConfig::default())
    }

    #[test]
    fn decorates_every_registration_of_the_key() {
        let mut registry = vec![instance(1u32), instance("x"), instance(2u32)];
        let request = DecorationRequest::closed(ServiceKey::of::<u32>(), noop());

        assert_eq!(run(&mut registry, &request), 2);
        assert_eq!(registry.len(), 5);

        // Original indices keep their keys and now hold decorators.
        assert_eq!(registry[0].key(), &ServiceKey::of::<u32>());
        assert_eq!(registry[2].key(), &ServiceKey::of::<u32>());
        assert!(registry[0].wrapped_key().is_some());
        assert!(registry[1].wrapped_key().is_none());

        // Reverse scan: the last registration's shadow is appended first.
        assert_eq!(registry[3].key(), registry[2].wrapped_key().unwrap());
        assert_eq!(registry[4].key(), registry[0].wrapped_key().unwrap());
        assert_eq!(registry[3].implementation().kind(), "instance");
    }

    #[test]
    fn unmatched_request_leaves_registry_untouched() {
        let mut registry = vec![instance(1u32)];
        let request = DecorationRequest::closed(ServiceKey::of::<u64>(), noop());
        assert_eq!(run(&mut registry, &request), 0);
        assert_eq!(registry.len(), 1);
        assert!(registry[0].wrapped_key().is_none());
    }

    #[test]
    fn shadows_are_never_selected() {
        let mut registry = vec![instance(1u32)];
        let request = DecorationRequest::closed(ServiceKey::of::<u32>(), noop());
        run(&mut registry, &request);
        let shadow = registry[1].key().clone();

        let by_shadow = DecorationRequest::closed(shadow, noop());
        assert_eq!(run(&mut registry, &by_shadow), 0);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn family_membership_follows_the_type_not_the_key_metadata() {
        use crate::generic::{GenericService, Open};
        use crate::key::TypeInfo;

        trait Repo<T>: Send + Sync {}
        struct Memory;
        impl<T> Repo<T> for Memory {}
        impl<T: 'static> GenericService for dyn Repo<T> {
            fn definition() -> GenericDefinition {
                GenericDefinition::of::<dyn Repo<Open>>(1)
            }
            fn arguments() -> Vec<TypeInfo> {
                vec![TypeInfo::of::<T>()]
            }
        }

        let repo = |key: ServiceKey| {
            let value: Arc<dyn Repo<i32>> = Arc::new(Memory);
            ServiceDescriptor::new(key, Lifetime::Singleton, Implementation::Instance(into_any(value)))
                .unwrap()
        };
        let mut registry = vec![
            repo(ServiceKey::generic::<dyn Repo<i32>>()),
            instance(1u32),
            repo(ServiceKey::of::<dyn Repo<i32>>()),
        ];
        let family = <dyn Repo<i32>>::definition();
        let request = DecorationRequest::open(OpenDecorator::from_fn(family, |_, _| Some(noop())));

        assert_eq!(run(&mut registry, &request), 2);
        assert!(registry[0].wrapped_key().is_some());
        assert!(registry[1].wrapped_key().is_none());
        assert!(registry[2].wrapped_key().is_some());
    }

    #[test]
    fn lifetimes_are_preserved() {
        let factory: FactoryFn = Arc::new(|_: &ResolverContext<'_>| -> DiResult<AnyArc> {
            Ok(into_any(Arc::new(0u8)))
        });
        for lifetime in [Lifetime::Singleton, Lifetime::Scoped, Lifetime::Transient] {
            let mut registry = vec![ServiceDescriptor::new(
                ServiceKey::of::<u8>(),
                lifetime,
                Implementation::Factory(factory.clone()),
            )
            .unwrap()];
            run(&mut registry, &DecorationRequest::closed(ServiceKey::of::<u8>(), noop()));
            assert_eq!(registry[0].lifetime(), lifetime);
            assert_eq!(registry[1].lifetime(), lifetime);
        }
    }
}
