//! # ferrous-decor
//!
//! Service decoration for dependency-injection registries.
//!
//! Decorating a service rewrites its registration in place: the original is
//! re-homed under a private *shadow key*, and the slot it occupied now holds
//! a factory that resolves the shadow and wraps the result. Callers keep
//! asking for the original service and transparently receive the decorated
//! instance, with the original lifetime (singleton, scoped or transient)
//! preserved exactly.
//!
//! ## Features
//!
//! - **Three decorator styles**: a constructor-injected type, a function, or a
//!   [`ServiceDecorator`] object
//! - **Chains**: decorating twice wraps twice; the last decoration is outermost
//! - **Open generics**: decorate every member of a generic family at once
//! - **Strict and lenient forms**: `decorate*` errors when nothing matches,
//!   `try_decorate*` returns `false`
//! - **Cached activation**: constructor plans are built once per type, even
//!   under concurrent first resolution
//!
//! ## Quick Start
//!
//! ```rust
//! use ferrous_decor::{ServiceCollection, Resolver};
//! use std::sync::Arc;
//!
//! trait Notifier: Send + Sync {
//!     fn send(&self, message: &str) -> String;
//! }
//!
//! struct Email;
//! impl Notifier for Email {
//!     fn send(&self, message: &str) -> String {
//!         format!("email: {message}")
//!     }
//! }
//!
//! struct Audited(Arc<dyn Notifier>);
//! impl Notifier for Audited {
//!     fn send(&self, message: &str) -> String {
//!         format!("[audited] {}", self.0.send(message))
//!     }
//! }
//!
//! let mut services = ServiceCollection::new();
//! services.add_singleton_trait_factory::<dyn Notifier, _>(|_| Arc::new(Email));
//! services
//!     .decorate_fn::<dyn Notifier, _>(|inner| Arc::new(Audited(inner)))
//!     .unwrap();
//!
//! let provider = services.build();
//! let notifier = provider.get_required::<dyn Notifier>();
//! assert_eq!(notifier.send("hi"), "[audited] email: hi");
//! ```
//!
//! ## Open generic families
//!
//! ```rust
//! use ferrous_decor::{
//!     GenericDefinition, GenericService, Lifetime, Open, OpenDecorator, Decorator,
//!     Resolver, ServiceCollection, TypeInfo,
//! };
//! use std::sync::Arc;
//!
//! pub trait Repository<T>: Send + Sync {
//!     fn describe(&self) -> String;
//! }
//!
//! impl<T: 'static> GenericService for dyn Repository<T> {
//!     fn definition() -> GenericDefinition {
//!         GenericDefinition::of::<dyn Repository<Open>>(1)
//!     }
//!     fn arguments() -> Vec<TypeInfo> {
//!         vec![TypeInfo::of::<T>()]
//!     }
//! }
//!
//! struct Sql;
//! impl<T> Repository<T> for Sql {
//!     fn describe(&self) -> String { "sql".into() }
//! }
//!
//! struct Cached<T: ?Sized>(Arc<T>);
//! impl<T: 'static> Repository<T> for Cached<dyn Repository<T>> {
//!     fn describe(&self) -> String { format!("cached {}", self.0.describe()) }
//! }
//!
//! fn cached<T: 'static>() -> Decorator {
//!     Decorator::with::<dyn Repository<T>, _>(|inner, _| Arc::new(Cached(inner)))
//! }
//!
//! let mut services = ServiceCollection::new();
//! services.add_generic_factory::<dyn Repository<i32>, _>(Lifetime::Singleton, |_| Arc::new(Sql));
//! services.add_generic_factory::<dyn Repository<String>, _>(Lifetime::Singleton, |_| Arc::new(Sql));
//!
//! let family = GenericDefinition::of::<dyn Repository<Open>>(1);
//! let decorator = OpenDecorator::new(family)
//!     .bind_decorator::<dyn Repository<i32>>(cached::<i32>())
//!     .bind_decorator::<dyn Repository<String>>(cached::<String>());
//! services.decorate_open(decorator).unwrap();
//!
//! let provider = services.build();
//! assert_eq!(provider.get_required::<dyn Repository<i32>>().describe(), "cached sql");
//! assert_eq!(provider.get_required::<dyn Repository<String>>().describe(), "cached sql");
//! ```
//!
//! ## Service Lifetimes
//!
//! - **Singleton**: Created once per provider
//! - **Scoped**: Created once per scope
//! - **Transient**: Created on every resolution
//!
//! A decorated service keeps its lifetime, and so does the shadow holding its
//! original: a decorated scoped service yields one decorator per scope
//! wrapping one original per scope.

pub mod activator;
pub mod collection;
pub mod config;
pub mod decoration;
pub mod descriptors;
pub mod error;
pub mod generic;
pub mod key;
pub mod lifetime;
pub mod observer;
pub mod provider;
pub mod traits;

mod internal;
mod registration;

pub use activator::{Activate, ActivatorCache, Arguments, ConstructionPlan, Constructor, Implements, Parameter};
pub use collection::ServiceCollection;
pub use config::DecorationConfig;
pub use decoration::{
    decorate_services, DecorationRequest, DecorationTarget, Decorator, DecoratorRecipe, Recipe,
    ServiceDecorator, ServiceRegistry,
};
pub use descriptors::{
    downcast_service, into_any, AnyArc, FactoryFn, Implementation, ImplementationType, Producer,
    ServiceDescriptor,
};
pub use error::{DiError, DiResult};
pub use generic::{
    is_open_generic_family, matches, GenericArguments, GenericDefinition, GenericService, Open,
    OpenDecorator,
};
pub use internal::CircularPanic;
pub use key::{ServiceKey, ServiceType, ShadowTag, TypeInfo};
pub use lifetime::Lifetime;
pub use observer::{DiObserver, LoggingObserver, Observers};
pub use provider::{ResolverContext, Scope, ServiceProvider};
pub use traits::{Resolver, ResolverCore};
