use ferrous_decor::{
    DiError, DiObserver, LoggingObserver, Resolver, ServiceCollection, ServiceKey,
};
use parking_lot::Mutex;
use std::io;
use std::sync::Arc;
use std::time::Duration;

#[derive(Default)]
struct Journal {
    events: Mutex<Vec<String>>,
}

impl Journal {
    fn events(&self) -> Vec<String> {
        self.events.lock().clone()
    }
}

impl DiObserver for Journal {
    fn resolving(&self, key: &ServiceKey) {
        self.events.lock().push(format!("resolving {key}"));
    }

    fn resolved(&self, key: &ServiceKey, _duration: Duration) {
        self.events.lock().push(format!("resolved {key}"));
    }

    fn resolution_failed(&self, key: &ServiceKey, _error: &DiError, _duration: Duration) {
        self.events.lock().push(format!("failed {key}"));
    }

    fn decorated(&self, key: &ServiceKey, shadow: &ServiceKey) {
        assert!(shadow.is_shadow());
        self.events.lock().push(format!("decorated {key}"));
    }
}

#[test]
fn decorated_resolution_visits_the_shadow() {
    let journal = Arc::new(Journal::default());
    let mut services = ServiceCollection::new();
    services.add_observer(journal.clone());
    services.add_singleton(2u16);
    services.decorate_fn::<u16, _>(|inner| Arc::new(*inner * 2)).unwrap();

    assert_eq!(journal.events(), vec!["decorated u16"]);

    let provider = services.build();
    assert_eq!(*provider.get_required::<u16>(), 4);
    assert_eq!(
        journal.events(),
        vec![
            "decorated u16",
            "resolving u16",
            "resolving Decorated u16",
            "resolved Decorated u16",
            "resolved u16",
        ]
    );
}

#[test]
fn failures_are_reported() {
    let journal = Arc::new(Journal::default());
    let mut services = ServiceCollection::new();
    services.add_observer(journal.clone());
    let provider = services.build();

    assert!(provider.get::<u8>().is_err());
    assert_eq!(journal.events(), vec!["resolving u8", "failed u8"]);
}

#[derive(Clone, Default)]
struct Captured(Arc<Mutex<Vec<u8>>>);

impl Captured {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock()).into_owned()
    }
}

impl io::Write for Captured {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[test]
fn logging_observer_writes_through_tracing() {
    let output = Captured::default();
    let writer = output.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .with_ansi(false)
        .with_writer(move || writer.clone())
        .finish();

    tracing::subscriber::with_default(subscriber, || {
        let mut services = ServiceCollection::new();
        services.add_observer(Arc::new(LoggingObserver::with_prefix("orders")));
        services.add_singleton(7u32);
        services.decorate_fn::<u32, _>(|inner| inner).unwrap();

        let provider = services.build();
        let _ = provider.get_required::<u32>();
        let _ = provider.get::<i64>();
    });

    let logs = output.contents();
    assert!(logs.contains("decorated registration"));
    assert!(logs.contains("orders"));
    assert!(logs.contains("resolved"));
    assert!(logs.contains("resolution failed"));
    assert!(logs.contains("WARN"));
}
