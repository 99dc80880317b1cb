//! Open generic families.
//!
//! Rust monomorphizes generics at compile time, so there is no runtime
//! "`Repository<>`" type to register or decorate. A family is instead modeled
//! as data: a [`GenericDefinition`] identified by a marker type instantiated
//! with the [`Open`] placeholder (for example `dyn Repository<Open>`), and
//! closed service types opt in to the family by implementing
//! [`GenericService`].
//!
//! ```rust
//! use ferrous_decor::{GenericDefinition, GenericService, Open, TypeInfo};
//!
//! pub trait Repository<T>: Send + Sync {
//!     fn find(&self, id: u32) -> Option<T>;
//! }
//!
//! impl<T: 'static> GenericService for dyn Repository<T> {
//!     fn definition() -> GenericDefinition {
//!         GenericDefinition::of::<dyn Repository<Open>>(1)
//!     }
//!
//!     fn arguments() -> Vec<TypeInfo> {
//!         vec![TypeInfo::of::<T>()]
//!     }
//! }
//!
//! let family = <dyn Repository<i32>>::definition();
//! assert_eq!(family, <dyn Repository<String>>::definition());
//! assert_eq!(family.arity(), 1);
//! ```

use std::any::TypeId;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::activator::{Activate, Implements};
use crate::decoration::Decorator;
use crate::internal::FastMap;
use crate::key::{ServiceKey, ServiceType, TypeInfo};

/// Placeholder for an unbound type parameter in a family marker.
///
/// Uninhabited; it only ever appears inside a type, never as a value.
#[derive(Debug)]
pub enum Open {}

/// Identity of an open generic family.
#[derive(Clone, Copy)]
pub struct GenericDefinition {
    marker: TypeInfo,
    arity: usize,
}

impl GenericDefinition {
    /// Defines a family by its marker type and the number of parameters.
    pub fn of<M: ?Sized + 'static>(arity: usize) -> Self {
        Self {
            marker: TypeInfo::of::<M>(),
            arity,
        }
    }

    /// Family name without the placeholder arguments.
    pub fn name(&self) -> &'static str {
        let full = self.marker.name();
        match full.find('<') {
            Some(end) => &full[..end],
            None => full,
        }
    }

    pub fn arity(&self) -> usize {
        self.arity
    }

    pub fn id(&self) -> TypeId {
        self.marker.id()
    }
}

impl PartialEq for GenericDefinition {
    fn eq(&self, other: &Self) -> bool {
        self.marker == other.marker
    }
}

impl Eq for GenericDefinition {}

impl Hash for GenericDefinition {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.marker.hash(state);
    }
}

impl fmt::Debug for GenericDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.name(), self.arity)
    }
}

/// The family and type arguments of a closed generic service type.
#[derive(Debug, Clone)]
pub struct GenericArguments {
    definition: GenericDefinition,
    arguments: Arc<[TypeInfo]>,
}

impl GenericArguments {
    pub fn new(definition: GenericDefinition, arguments: Vec<TypeInfo>) -> Self {
        Self {
            definition,
            arguments: arguments.into(),
        }
    }

    pub fn definition(&self) -> &GenericDefinition {
        &self.definition
    }

    pub fn arguments(&self) -> &[TypeInfo] {
        &self.arguments
    }

    pub fn len(&self) -> usize {
        self.arguments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arguments.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<TypeInfo> {
        self.arguments.get(index).copied()
    }
}

/// Implemented by closed service types that belong to a generic family.
pub trait GenericService: 'static {
    /// The family this type instantiates.
    fn definition() -> GenericDefinition;

    /// The type arguments, in declaration order.
    fn arguments() -> Vec<TypeInfo>;
}

/// True if the service type names a family rather than a concrete type.
pub fn is_open_generic_family(ty: &ServiceType) -> bool {
    ty.is_open()
}

/// True if `candidate` is a closed instantiation of `family`.
///
/// Shadow keys never match.
pub fn matches(candidate: &ServiceKey, family: &GenericDefinition) -> bool {
    if candidate.is_shadow() {
        return false;
    }
    match candidate.service_type() {
        ServiceType::Closed {
            generic: Some(arguments),
            ..
        } => arguments.definition() == family,
        _ => false,
    }
}

type CloseFn = Arc<dyn Fn(&ServiceKey, &GenericArguments) -> Option<Decorator> + Send + Sync>;

/// A decorator for every member of a generic family.
///
/// Closing happens per candidate: each closed service type either has a
/// binding registered with [`bind`](Self::bind), or is handed to the fallback
/// closure given to [`from_fn`](Self::from_fn). A candidate that cannot be
/// closed is skipped by the decoration pass.
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
/// use ferrous_decor::{
///     Activate, Constructor, GenericDefinition, Implements, Open, OpenDecorator,
/// };
///
/// pub trait Repository<T>: Send + Sync {
///     fn find(&self, id: u32) -> Option<T>;
/// }
///
/// struct Logged<T> {
///     inner: Arc<dyn Repository<T>>,
/// }
///
/// impl<T: Send + Sync + 'static> Repository<T> for Logged<T> {
///     fn find(&self, id: u32) -> Option<T> {
///         self.inner.find(id)
///     }
/// }
///
/// impl<T: Send + Sync + 'static> Implements<dyn Repository<T>> for Logged<T> {
///     fn upcast(self: Arc<Self>) -> Arc<dyn Repository<T>> {
///         self
///     }
/// }
///
/// impl<T: Send + Sync + 'static> Activate for Logged<T> {
///     fn constructor() -> Constructor<Self> {
///         Constructor::new(|args| Ok(Logged { inner: args.next()? }))
///             .param::<dyn Repository<T>>("inner")
///     }
/// }
///
/// let family = GenericDefinition::of::<dyn Repository<Open>>(1);
/// let decorator = OpenDecorator::new(family)
///     .bind::<dyn Repository<i32>, Logged<i32>>()
///     .bind::<dyn Repository<String>, Logged<String>>();
/// assert_eq!(decorator.bindings(), 2);
/// ```
#[derive(Clone)]
pub struct OpenDecorator {
    definition: GenericDefinition,
    bindings: FastMap<TypeId, Decorator>,
    fallback: Option<CloseFn>,
}

impl OpenDecorator {
    pub fn new(definition: GenericDefinition) -> Self {
        Self {
            definition,
            bindings: FastMap::default(),
            fallback: None,
        }
    }

    /// Closes the family for `S` with the constructor-injected decorator `D`.
    pub fn bind<S, D>(mut self) -> Self
    where
        S: ?Sized + Send + Sync + 'static,
        D: Activate + Implements<S>,
    {
        self.bindings
            .insert(TypeId::of::<S>(), Decorator::activated::<S, D>());
        self
    }

    /// Closes the family for `S` with an explicit decorator.
    pub fn bind_decorator<S: ?Sized + 'static>(mut self, decorator: Decorator) -> Self {
        self.bindings.insert(TypeId::of::<S>(), decorator);
        self
    }

    /// Closes candidates through a function; `None` skips the candidate.
    ///
    /// Explicit bindings take precedence over the function.
    pub fn from_fn<F>(definition: GenericDefinition, close: F) -> Self
    where
        F: Fn(&ServiceKey, &GenericArguments) -> Option<Decorator> + Send + Sync + 'static,
    {
        Self {
            definition,
            bindings: FastMap::default(),
            fallback: Some(Arc::new(close)),
        }
    }

    pub fn definition(&self) -> &GenericDefinition {
        &self.definition
    }

    /// Number of explicit bindings.
    pub fn bindings(&self) -> usize {
        self.bindings.len()
    }

    /// True if `S` was closed with [`bind`](Self::bind) or
    /// [`bind_decorator`](Self::bind_decorator).
    pub fn has_binding(&self, type_id: TypeId) -> bool {
        self.bindings.contains_key(&type_id)
    }

    /// Produces the decorator for a closed member of the family.
    ///
    /// Returns `None` when the candidate is not a member, has a different
    /// arity, or has no binding.
    pub fn close(&self, candidate: &ServiceKey) -> Option<Decorator> {
        if !matches(candidate, &self.definition) {
            return None;
        }
        self.close_with(candidate, candidate.service_type().generic_arguments())
    }

    /// Closes a candidate whose family arguments are known from elsewhere,
    /// such as another registration of the same service type.
    ///
    /// A key registered without generic metadata is still closed by an
    /// explicit binding for its type. The fallback closure needs
    /// `arguments`.
    pub fn close_with(
        &self,
        candidate: &ServiceKey,
        arguments: Option<&GenericArguments>,
    ) -> Option<Decorator> {
        if candidate.is_shadow() || candidate.is_open_generic() {
            return None;
        }
        if let Some(arguments) = arguments {
            if arguments.definition() != &self.definition
                || arguments.len() != self.definition.arity()
            {
                return None;
            }
        }
        if let Some(decorator) = self.bindings.get(&candidate.service_type().type_id()) {
            return Some(decorator.clone());
        }
        let arguments = arguments?;
        self.fallback
            .as_ref()
            .and_then(|close| close(candidate, arguments))
    }
}

impl fmt::Debug for OpenDecorator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenDecorator")
            .field("definition", &self.definition)
            .field("bindings", &self.bindings.len())
            .field("fallback", &self.fallback.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    trait Repo<T>: Send + Sync {}
    trait Pair<A, B>: Send + Sync {}

    impl<T: 'static> GenericService for dyn Repo<T> {
        fn definition() -> GenericDefinition {
            GenericDefinition::of::<dyn Repo<Open>>(1)
        }
        fn arguments() -> Vec<TypeInfo> {
            vec![TypeInfo::of::<T>()]
        }
    }

    // Deliberately claims the Repo family with the wrong arity.
    impl<A: 'static, B: 'static> GenericService for dyn Pair<A, B> {
        fn definition() -> GenericDefinition {
            GenericDefinition::of::<dyn Repo<Open>>(1)
        }
        fn arguments() -> Vec<TypeInfo> {
            vec![TypeInfo::of::<A>(), TypeInfo::of::<B>()]
        }
    }

    fn family() -> GenericDefinition {
        GenericDefinition::of::<dyn Repo<Open>>(1)
    }

    fn noop() -> Decorator {
        Decorator::erased("noop", |inner, _| Ok(inner))
    }

    #[test]
    fn definition_name_strips_placeholder() {
        assert!(family().name().ends_with("Repo"));
        assert!(!family().name().contains('<'));
    }

    #[test]
    fn matching() {
        let closed = ServiceKey::generic::<dyn Repo<i32>>();
        assert!(matches(&closed, &family()));
        assert!(!matches(&closed.shadow(), &family()));
        assert!(!matches(&ServiceKey::of::<dyn Repo<i32>>(), &family()));
        assert!(!matches(&ServiceKey::family(family()), &family()));
        assert!(is_open_generic_family(ServiceKey::family(family()).service_type()));
    }

    #[test]
    fn close_uses_bindings_then_fallback() {
        let bound = OpenDecorator::new(family()).bind_decorator::<dyn Repo<i32>>(noop());
        assert!(bound.close(&ServiceKey::generic::<dyn Repo<i32>>()).is_some());
        assert!(bound.close(&ServiceKey::generic::<dyn Repo<u8>>()).is_none());

        let by_fn = OpenDecorator::from_fn(family(), |_, args| {
            args.get(0).filter(|t| t.is::<u8>()).map(|_| noop())
        });
        assert!(by_fn.close(&ServiceKey::generic::<dyn Repo<u8>>()).is_some());
        assert!(by_fn.close(&ServiceKey::generic::<dyn Repo<i32>>()).is_none());
    }

    #[test]
    fn plain_key_closes_through_binding_only() {
        let plain = ServiceKey::of::<dyn Repo<i32>>();
        let bound = OpenDecorator::new(family()).bind_decorator::<dyn Repo<i32>>(noop());
        assert!(bound.has_binding(TypeId::of::<dyn Repo<i32>>()));
        assert!(bound.close(&plain).is_none());
        assert!(bound.close_with(&plain, None).is_some());
        assert!(bound.close_with(&plain.shadow(), None).is_none());

        let by_fn = OpenDecorator::from_fn(family(), |_, _| Some(noop()));
        assert!(by_fn.close_with(&plain, None).is_none());
        let arguments = GenericArguments::new(family(), vec![TypeInfo::of::<i32>()]);
        assert!(by_fn.close_with(&plain, Some(&arguments)).is_some());
    }

    #[test]
    fn arity_mismatch_is_skipped() {
        let decorator = OpenDecorator::from_fn(family(), |_, _| Some(noop()));
        assert!(decorator
            .close(&ServiceKey::generic::<dyn Pair<u8, u8>>())
            .is_none());
    }
}
