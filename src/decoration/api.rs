//! Decoration methods on [`ServiceCollection`].
//!
//! Every operation comes in two forms. The strict form returns
//! `Err(DiError::MissingRegistration)` when nothing was decorated; the
//! lenient `try_` form returns `false` instead. Both leave the collection
//! unchanged when nothing matches.

use std::sync::Arc;

use crate::activator::{Activate, Implements};
use crate::collection::ServiceCollection;
use crate::error::{DiError, DiResult};
use crate::generic::OpenDecorator;
use crate::key::ServiceKey;
use crate::provider::ResolverContext;

use super::{decorate_services, DecorationRequest, Decorator, ServiceDecorator};

impl ServiceCollection {
    /// Applies a decoration request and returns the number of registrations
    /// decorated.
    pub fn apply_decoration(&mut self, request: &DecorationRequest) -> usize {
        decorate_services(&mut self.descriptors, request, &self.observers, &self.config)
    }

    fn decorate_strict(&mut self, request: DecorationRequest) -> DiResult<&mut Self> {
        match self.apply_decoration(&request) {
            0 => Err(DiError::MissingRegistration(request.target().name())),
            _ => Ok(self),
        }
    }

    fn decorate_lenient(&mut self, request: DecorationRequest) -> bool {
        self.apply_decoration(&request) != 0
    }

    /// Decorates every registration of `S` with `D`, built by constructor
    /// injection around the original instance.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use std::sync::Arc;
    /// use ferrous_decor::{Activate, Constructor, Resolver, ServiceCollection};
    ///
    /// trait Greeter: Send + Sync {
    ///     fn greet(&self, name: &str) -> String;
    /// }
    ///
    /// struct Plain;
    /// impl Greeter for Plain {
    ///     fn greet(&self, name: &str) -> String { format!("hi {name}") }
    /// }
    ///
    /// struct Polite { inner: Arc<dyn Greeter> }
    /// impl Greeter for Polite {
    ///     fn greet(&self, name: &str) -> String {
    ///         format!("{}, pleased to meet you", self.inner.greet(name))
    ///     }
    /// }
    ///
    /// impl Activate for Polite {
    ///     fn constructor() -> Constructor<Self> {
    ///         Constructor::new(|args| Ok(Polite { inner: args.next()? }))
    ///             .param::<dyn Greeter>("inner")
    ///     }
    /// }
    ///
    /// ferrous_decor::implements!(dyn Greeter => Polite);
    ///
    /// let mut services = ServiceCollection::new();
    /// services.add_instance::<dyn Greeter>(Arc::new(Plain));
    /// services.decorate::<dyn Greeter, Polite>().unwrap();
    ///
    /// let greeter = services.build().get_required::<dyn Greeter>();
    /// assert_eq!(greeter.greet("ana"), "hi ana, pleased to meet you");
    /// ```
    pub fn decorate<S, D>(&mut self) -> DiResult<&mut Self>
    where
        S: ?Sized + Send + Sync + 'static,
        D: Activate + Implements<S>,
    {
        self.decorate_strict(DecorationRequest::closed(
            ServiceKey::of::<S>(),
            Decorator::activated::<S, D>(),
        ))
    }

    pub fn try_decorate<S, D>(&mut self) -> bool
    where
        S: ?Sized + Send + Sync + 'static,
        D: Activate + Implements<S>,
    {
        self.decorate_lenient(DecorationRequest::closed(
            ServiceKey::of::<S>(),
            Decorator::activated::<S, D>(),
        ))
    }

    /// Decorates every registration of `S` with a function of the original
    /// instance and the resolver.
    pub fn decorate_with<S, F>(&mut self, decorator: F) -> DiResult<&mut Self>
    where
        S: ?Sized + Send + Sync + 'static,
        F: Fn(Arc<S>, &ResolverContext<'_>) -> Arc<S> + Send + Sync + 'static,
    {
        self.decorate_strict(DecorationRequest::closed(
            ServiceKey::of::<S>(),
            Decorator::with::<S, F>(decorator),
        ))
    }

    pub fn try_decorate_with<S, F>(&mut self, decorator: F) -> bool
    where
        S: ?Sized + Send + Sync + 'static,
        F: Fn(Arc<S>, &ResolverContext<'_>) -> Arc<S> + Send + Sync + 'static,
    {
        self.decorate_lenient(DecorationRequest::closed(
            ServiceKey::of::<S>(),
            Decorator::with::<S, F>(decorator),
        ))
    }

    /// Decorates every registration of `S` with a function of the original
    /// instance.
    pub fn decorate_fn<S, F>(&mut self, decorator: F) -> DiResult<&mut Self>
    where
        S: ?Sized + Send + Sync + 'static,
        F: Fn(Arc<S>) -> Arc<S> + Send + Sync + 'static,
    {
        self.decorate_with::<S, _>(move |inner, _| decorator(inner))
    }

    pub fn try_decorate_fn<S, F>(&mut self, decorator: F) -> bool
    where
        S: ?Sized + Send + Sync + 'static,
        F: Fn(Arc<S>) -> Arc<S> + Send + Sync + 'static,
    {
        self.try_decorate_with::<S, _>(move |inner, _| decorator(inner))
    }

    /// Decorates every registration of `S` with a [`ServiceDecorator`].
    pub fn decorate_using<S, D>(&mut self, decorator: D) -> DiResult<&mut Self>
    where
        S: ?Sized + Send + Sync + 'static,
        D: ServiceDecorator<S> + 'static,
    {
        self.decorate_strict(DecorationRequest::closed(
            ServiceKey::of::<S>(),
            Decorator::using::<S, D>(decorator),
        ))
    }

    pub fn try_decorate_using<S, D>(&mut self, decorator: D) -> bool
    where
        S: ?Sized + Send + Sync + 'static,
        D: ServiceDecorator<S> + 'static,
    {
        self.decorate_lenient(DecorationRequest::closed(
            ServiceKey::of::<S>(),
            Decorator::using::<S, D>(decorator),
        ))
    }

    /// Decorates every registration under an explicit key.
    pub fn decorate_key(&mut self, key: ServiceKey, decorator: Decorator) -> DiResult<&mut Self> {
        self.decorate_strict(DecorationRequest::closed(key, decorator))
    }

    pub fn try_decorate_key(&mut self, key: ServiceKey, decorator: Decorator) -> bool {
        self.decorate_lenient(DecorationRequest::closed(key, decorator))
    }

    /// Decorates every closed member of a generic family that `decorator`
    /// can close. Members it cannot close are skipped and reported to
    /// observers.
    pub fn decorate_open(&mut self, decorator: OpenDecorator) -> DiResult<&mut Self> {
        self.decorate_strict(DecorationRequest::open(decorator))
    }

    pub fn try_decorate_open(&mut self, decorator: OpenDecorator) -> bool {
        self.decorate_lenient(DecorationRequest::open(decorator))
    }
}
