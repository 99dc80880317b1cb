use ferrous_decor::{
    into_any, Activate, Constructor, DiError, Implementation, Lifetime, Resolver, ServiceCollection,
    ServiceDescriptor, ServiceKey,
};
use std::sync::Arc;

#[test]
fn error_messages() {
    assert_eq!(DiError::NotFound("app::Db").to_string(), "Service not found: app::Db");
    assert_eq!(DiError::TypeMismatch("u8").to_string(), "Type mismatch for: u8");
    assert_eq!(
        DiError::Circular(vec!["A".into(), "B".into(), "A".into()]).to_string(),
        "Circular dependency: A -> B -> A"
    );
    assert_eq!(
        DiError::WrongLifetime("app::Session").to_string(),
        "Lifetime error: app::Session"
    );
    assert_eq!(DiError::DepthExceeded(1024).to_string(), "Max depth 1024 exceeded");
    assert_eq!(
        DiError::Activation {
            ty: "app::Client",
            parameter: "config: app::Config".into()
        }
        .to_string(),
        "Unable to activate app::Client: cannot supply parameter 'config: app::Config'"
    );
    assert_eq!(DiError::Config("bad".into()).to_string(), "Configuration error: bad");
}

#[test]
fn missing_constructor_dependency_is_an_activation_error() {
    struct Config;
    struct Client {
        _config: Arc<Config>,
    }
    impl Activate for Client {
        fn constructor() -> Constructor<Self> {
            Constructor::new(|args| Ok(Client { _config: args.next()? })).param::<Config>("config")
        }
    }

    let mut services = ServiceCollection::new();
    services.add_transient_type::<Client, Client>();
    let provider = services.build();

    match provider.get::<Client>() {
        Err(DiError::Activation { ty, parameter }) => {
            assert!(ty.ends_with("Client"));
            assert!(parameter.starts_with("config"));
        }
        other => panic!("unexpected {:?}", other.map(|_| ())),
    }
}

#[test]
fn instance_must_be_a_singleton() {
    let result = ServiceDescriptor::new(
        ServiceKey::of::<u8>(),
        Lifetime::Transient,
        Implementation::Instance(into_any(Arc::new(1u8))),
    );
    assert!(matches!(result, Err(DiError::InvalidRegistration(_))));
}

#[test]
fn unregistered_service_is_not_found() {
    let provider = ServiceCollection::new().build();
    assert_eq!(
        provider.get::<String>().map(|_| ()),
        Err(DiError::NotFound("alloc::string::String"))
    );
    assert!(provider.get_all::<String>().unwrap().is_empty());
}

#[test]
#[should_panic(expected = "Failed to resolve")]
fn get_required_panics_on_missing_service() {
    let provider = ServiceCollection::new().build();
    let _ = provider.get_required::<u64>();
}
