use ferrous_decor::{
    Decorator, DiError, GenericDefinition, GenericService, Open, OpenDecorator, ServiceCollection,
    ServiceKey, TypeInfo,
};
use std::sync::Arc;

trait Cache: Send + Sync {
    fn get(&self) -> u32;
}

trait Store<T>: Send + Sync {}

impl<T: 'static> GenericService for dyn Store<T> {
    fn definition() -> GenericDefinition {
        GenericDefinition::of::<dyn Store<Open>>(1)
    }
    fn arguments() -> Vec<TypeInfo> {
        vec![TypeInfo::of::<T>()]
    }
}

fn populated() -> ServiceCollection {
    let mut services = ServiceCollection::new();
    services.add_singleton(1u32);
    services.add_singleton("name".to_string());
    services
}

#[test]
fn strict_forms_report_the_missing_service() {
    let mut services = populated();

    let err = services
        .decorate_fn::<dyn Cache, _>(|inner| inner)
        .err()
        .expect("nothing registered under dyn Cache");
    match err {
        DiError::MissingRegistration(name) => assert!(name.contains("Cache")),
        other => panic!("unexpected {other}"),
    }
    assert_eq!(services.len(), 2);
}

#[test]
fn every_strict_form_fails_on_a_miss() {
    let mut services = populated();

    assert!(services.decorate_with::<u64, _>(|inner, _| inner).is_err());
    assert!(services.decorate_fn::<u64, _>(|inner| inner).is_err());
    assert!(services
        .decorate_key(ServiceKey::of::<u64>(), Decorator::erased("noop", |inner, _| Ok(inner)))
        .is_err());
    let family = GenericDefinition::of::<dyn Store<Open>>(1);
    assert!(matches!(
        services.decorate_open(OpenDecorator::new(family)),
        Err(DiError::MissingRegistration(_))
    ));

    assert_eq!(services.len(), 2);
}

#[test]
fn every_lenient_form_returns_false_on_a_miss() {
    let mut services = populated();

    assert!(!services.try_decorate_with::<u64, _>(|inner, _| inner));
    assert!(!services.try_decorate_fn::<u64, _>(|inner| inner));
    assert!(!services.try_decorate_key(
        ServiceKey::of::<u64>(),
        Decorator::erased("noop", |inner, _| Ok(inner))
    ));
    let family = GenericDefinition::of::<dyn Store<Open>>(1);
    assert!(!services.try_decorate_open(OpenDecorator::new(family)));

    assert_eq!(services.len(), 2);
    assert!(services.iter().all(|d| !d.key().is_shadow()));
}

#[test]
fn lenient_form_returns_true_on_a_hit() {
    let mut services = populated();
    assert!(services.try_decorate_fn::<u32, _>(|inner| Arc::new(*inner + 1)));
    assert_eq!(services.len(), 3);
}

#[test]
fn open_family_with_registrations_but_no_bindings_is_a_miss() {
    struct Memory;
    impl<T> Store<T> for Memory {}

    let mut services = ServiceCollection::new();
    services.add_generic_instance::<dyn Store<u8>>(Arc::new(Memory));

    let family = GenericDefinition::of::<dyn Store<Open>>(1);
    assert!(services.decorate_open(OpenDecorator::new(family)).is_err());
    assert_eq!(services.len(), 1);
}
