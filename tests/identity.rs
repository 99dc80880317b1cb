//! Identity tests: a decorated key resolves to the decorator, and the
//! decorator wraps exactly what the original registration would have
//! produced, for every implementation strategy.

use ferrous_decor::{
    Activate, Constructor, Implements, ResolverContext, Resolver, ServiceCollection,
    ServiceDecorator,
};
use std::sync::Arc;

trait Greeter: Send + Sync {
    fn greet(&self) -> String;
    fn inner(&self) -> Option<Arc<dyn Greeter>> {
        None
    }
}

struct English;

impl Greeter for English {
    fn greet(&self) -> String {
        "hello".to_string()
    }
}

impl Activate for English {
    fn constructor() -> Constructor<Self> {
        Constructor::new(|_| Ok(English))
    }
}

ferrous_decor::implements!(dyn Greeter => English);

struct Shouting {
    inner: Arc<dyn Greeter>,
}

impl Greeter for Shouting {
    fn greet(&self) -> String {
        self.inner.greet().to_uppercase()
    }
    fn inner(&self) -> Option<Arc<dyn Greeter>> {
        Some(self.inner.clone())
    }
}

impl Activate for Shouting {
    fn constructor() -> Constructor<Self> {
        Constructor::new(|args| Ok(Shouting { inner: args.next()? })).param::<dyn Greeter>("inner")
    }
}

ferrous_decor::implements!(dyn Greeter => Shouting);

/// Decorator that also takes a dependency from the container.
struct Signed {
    inner: Arc<dyn Greeter>,
    signature: Arc<String>,
}

impl Greeter for Signed {
    fn greet(&self) -> String {
        format!("{} -- {}", self.inner.greet(), self.signature)
    }
    fn inner(&self) -> Option<Arc<dyn Greeter>> {
        Some(self.inner.clone())
    }
}

impl Activate for Signed {
    fn constructor() -> Constructor<Self> {
        Constructor::new(|args| {
            Ok(Signed {
                signature: args.next()?,
                inner: args.next()?,
            })
        })
        .param::<String>("signature")
        .param::<dyn Greeter>("inner")
    }
}

impl Implements<dyn Greeter> for Signed {
    fn upcast(self: Arc<Self>) -> Arc<dyn Greeter> {
        self
    }
}

#[test]
fn type_strategy_is_wrapped() {
    let mut services = ServiceCollection::new();
    services.add_singleton_type::<dyn Greeter, English>();
    services.decorate::<dyn Greeter, Shouting>().unwrap();

    let provider = services.build();
    let greeter = provider.get_required::<dyn Greeter>();
    assert_eq!(greeter.greet(), "HELLO");
    assert_eq!(greeter.inner().unwrap().greet(), "hello");
}

#[test]
fn factory_strategy_is_wrapped() {
    let mut services = ServiceCollection::new();
    services.add_transient_trait_factory::<dyn Greeter, _>(|_| Arc::new(English));
    services.decorate::<dyn Greeter, Shouting>().unwrap();

    let provider = services.build();
    assert_eq!(provider.get_required::<dyn Greeter>().greet(), "HELLO");
}

#[test]
fn instance_strategy_wraps_the_same_instance() {
    let original: Arc<dyn Greeter> = Arc::new(English);

    let mut services = ServiceCollection::new();
    services.add_instance::<dyn Greeter>(original.clone());
    services.decorate::<dyn Greeter, Shouting>().unwrap();

    let provider = services.build();
    let greeter = provider.get_required::<dyn Greeter>();
    assert!(Arc::ptr_eq(&greeter.inner().unwrap(), &original));
}

#[test]
fn decorator_dependencies_come_from_the_container() {
    let mut services = ServiceCollection::new();
    services.add_singleton("the team".to_string());
    services.add_singleton_type::<dyn Greeter, English>();
    services.decorate::<dyn Greeter, Signed>().unwrap();

    let provider = services.build();
    assert_eq!(provider.get_required::<dyn Greeter>().greet(), "hello -- the team");
}

#[test]
fn function_and_object_decorators() {
    struct Exclaim;

    impl ServiceDecorator<dyn Greeter> for Exclaim {
        fn decorate(&self, inner: Arc<dyn Greeter>, _: &ResolverContext<'_>) -> Arc<dyn Greeter> {
            struct Exclaimed(Arc<dyn Greeter>);
            impl Greeter for Exclaimed {
                fn greet(&self) -> String {
                    format!("{}!", self.0.greet())
                }
            }
            Arc::new(Exclaimed(inner))
        }
    }

    let mut services = ServiceCollection::new();
    services.add_singleton_trait_factory::<dyn Greeter, _>(|_| Arc::new(English));
    services.decorate_using::<dyn Greeter, _>(Exclaim).unwrap();
    services
        .decorate_with::<dyn Greeter, _>(|inner, _| Arc::new(Shouting { inner }))
        .unwrap();

    let provider = services.build();
    assert_eq!(provider.get_required::<dyn Greeter>().greet(), "HELLO!");
}

#[test]
fn sized_services_can_be_decorated() {
    #[derive(Debug, PartialEq)]
    struct Settings {
        retries: u32,
    }

    let mut services = ServiceCollection::new();
    services.add_singleton(Settings { retries: 1 });
    services
        .decorate_fn::<Settings, _>(|inner| Arc::new(Settings { retries: inner.retries * 10 }))
        .unwrap();

    assert_eq!(*services.build().get_required::<Settings>(), Settings { retries: 10 });
}

#[test]
fn undecorated_services_are_untouched() {
    let mut services = ServiceCollection::new();
    services.add_singleton(3u8);
    services.add_singleton_trait_factory::<dyn Greeter, _>(|_| Arc::new(English));
    services.decorate::<dyn Greeter, Shouting>().unwrap();

    let provider = services.build();
    assert_eq!(*provider.get_required::<u8>(), 3);
}
