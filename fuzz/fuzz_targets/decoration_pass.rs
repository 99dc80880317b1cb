#![no_main]

use ferrous_decor::{Lifetime, Resolver, ServiceCollection};
use libfuzzer_sys::fuzz_target;
use std::sync::Arc;

fn lifetime(byte: u8) -> Lifetime {
    match byte % 3 {
        0 => Lifetime::Singleton,
        1 => Lifetime::Scoped,
        _ => Lifetime::Transient,
    }
}

// Each byte pair is one operation: register a u32 or u64, or decorate one of them.
fuzz_target!(|data: &[u8]| {
    let mut services = ServiceCollection::new();
    let mut expected_u32: Option<u32> = None;
    let mut expected_u64: Option<u64> = None;
    let mut registrations = 0usize;

    for chunk in data.chunks_exact(2).take(64) {
        let (op, arg) = (chunk[0], chunk[1]);
        match op % 4 {
            0 => {
                services.add_factory::<u32, _>(lifetime(arg), move |_| arg as u32);
                expected_u32 = Some(arg as u32);
                registrations += 1;
            }
            1 => {
                services.add_factory::<u64, _>(lifetime(arg), move |_| arg as u64);
                expected_u64 = Some(arg as u64);
                registrations += 1;
            }
            2 => {
                let before = services.len();
                let hit = services.try_decorate_fn::<u32, _>(|inner| Arc::new(inner.wrapping_add(1)));
                assert_eq!(hit, expected_u32.is_some());
                if let Some(value) = expected_u32.as_mut() {
                    *value = value.wrapping_add(1);
                }
                assert!(services.len() >= before);
            }
            _ => {
                let hit = services.try_decorate_fn::<u64, _>(|inner| Arc::new(inner.wrapping_mul(2)));
                assert_eq!(hit, expected_u64.is_some());
                if let Some(value) = expected_u64.as_mut() {
                    *value = value.wrapping_mul(2);
                }
            }
        }
    }

    let shadows = services.iter().filter(|d| d.key().is_shadow()).count();
    assert_eq!(services.len(), registrations + shadows);

    let provider = services.build();
    let scope = provider.create_scope();
    if let Some(value) = expected_u32 {
        assert_eq!(*scope.get_required::<u32>(), value);
    }
    if let Some(value) = expected_u64 {
        assert_eq!(*scope.get_required::<u64>(), value);
    }
});
