//! Observation hooks for resolution and decoration.
//!
//! Observers see every resolution performed by a provider and every rewrite
//! (or skipped candidate) of a decoration pass. They are registered on the
//! [`ServiceCollection`](crate::ServiceCollection) and carried into the
//! provider it builds.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::{DiError, DiResult};
use crate::key::ServiceKey;

/// Observer for container activity.
///
/// All hooks default to no-ops. Calls are made synchronously on the
/// resolving thread, so keep implementations cheap.
///
/// # Examples
///
/// ```rust
/// use ferrous_decor::{DiObserver, ServiceCollection, ServiceKey, Resolver};
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use std::sync::Arc;
///
/// #[derive(Default)]
/// struct CountingObserver {
///     decorated: AtomicUsize,
/// }
///
/// impl DiObserver for CountingObserver {
///     fn decorated(&self, _key: &ServiceKey, _shadow: &ServiceKey) {
///         self.decorated.fetch_add(1, Ordering::Relaxed);
///     }
/// }
///
/// let observer = Arc::new(CountingObserver::default());
/// let mut services = ServiceCollection::new();
/// services.add_observer(observer.clone());
/// services.add_singleton(5u32);
/// services.decorate_fn::<u32, _>(|inner| Arc::new(*inner * 2)).unwrap();
///
/// assert_eq!(observer.decorated.load(Ordering::Relaxed), 1);
/// assert_eq!(*services.build().get_required::<u32>(), 10);
/// ```
pub trait DiObserver: Send + Sync {
    /// A resolution of `key` is starting.
    fn resolving(&self, _key: &ServiceKey) {}

    /// A resolution of `key` succeeded.
    fn resolved(&self, _key: &ServiceKey, _duration: Duration) {}

    /// A resolution of `key` failed.
    fn resolution_failed(&self, _key: &ServiceKey, _error: &DiError, _duration: Duration) {}

    /// The registration of `key` was replaced by a decorator; the original
    /// now lives under `shadow`.
    fn decorated(&self, _key: &ServiceKey, _shadow: &ServiceKey) {}

    /// A selected registration was left undecorated.
    fn decoration_skipped(&self, _key: &ServiceKey, _reason: &str) {}
}

/// The set of observers attached to a collection or provider.
#[derive(Clone, Default)]
pub struct Observers {
    observers: Vec<Arc<dyn DiObserver>>,
}

impl Observers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, observer: Arc<dyn DiObserver>) {
        self.observers.push(observer);
    }

    #[inline]
    pub fn has_observers(&self) -> bool {
        !self.observers.is_empty()
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }

    /// Runs a resolution, reporting it to every observer.
    #[inline]
    pub(crate) fn observe<T>(&self, key: &ServiceKey, resolve: impl FnOnce() -> DiResult<T>) -> DiResult<T> {
        if !self.has_observers() {
            return resolve();
        }
        let start = Instant::now();
        for observer in &self.observers {
            observer.resolving(key);
        }
        let result = resolve();
        let duration = start.elapsed();
        match &result {
            Ok(_) => {
                for observer in &self.observers {
                    observer.resolved(key, duration);
                }
            }
            Err(err) => {
                for observer in &self.observers {
                    observer.resolution_failed(key, err, duration);
                }
            }
        }
        result
    }

    pub(crate) fn decorated(&self, key: &ServiceKey, shadow: &ServiceKey) {
        for observer in &self.observers {
            observer.decorated(key, shadow);
        }
    }

    pub(crate) fn decoration_skipped(&self, key: &ServiceKey, reason: &str) {
        for observer in &self.observers {
            observer.decoration_skipped(key, reason);
        }
    }
}

impl std::fmt::Debug for Observers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Observers").field("count", &self.observers.len()).finish()
    }
}

/// Observer that forwards every hook to `tracing`.
///
/// Resolutions are logged at `trace`, failures at `warn`, decoration at
/// `debug`. Install a subscriber (for example `tracing-subscriber`) to see
/// the output.
///
/// # Examples
///
/// ```rust
/// use ferrous_decor::{LoggingObserver, ServiceCollection};
/// use std::sync::Arc;
///
/// let mut services = ServiceCollection::new();
/// services.add_observer(Arc::new(LoggingObserver::with_prefix("app")));
/// ```
#[derive(Debug, Clone)]
pub struct LoggingObserver {
    prefix: String,
}

impl LoggingObserver {
    pub fn new() -> Self {
        Self::with_prefix("ferrous-decor")
    }

    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }
}

impl Default for LoggingObserver {
    fn default() -> Self {
        Self::new()
    }
}

impl DiObserver for LoggingObserver {
    fn resolving(&self, key: &ServiceKey) {
        tracing::trace!(prefix = %self.prefix, key = %key, "resolving");
    }

    fn resolved(&self, key: &ServiceKey, duration: Duration) {
        tracing::trace!(prefix = %self.prefix, key = %key, ?duration, "resolved");
    }

    fn resolution_failed(&self, key: &ServiceKey, error: &DiError, duration: Duration) {
        tracing::warn!(prefix = %self.prefix, key = %key, %error, ?duration, "resolution failed");
    }

    fn decorated(&self, key: &ServiceKey, shadow: &ServiceKey) {
        tracing::debug!(prefix = %self.prefix, key = %key, shadow = ?shadow, "decorated");
    }

    fn decoration_skipped(&self, key: &ServiceKey, reason: &str) {
        tracing::debug!(prefix = %self.prefix, key = %key, reason, "decoration skipped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<String>>,
    }

    impl DiObserver for Recorder {
        fn resolving(&self, key: &ServiceKey) {
            self.events.lock().push(format!("resolving {key}"));
        }
        fn resolved(&self, key: &ServiceKey, _: Duration) {
            self.events.lock().push(format!("resolved {key}"));
        }
        fn resolution_failed(&self, key: &ServiceKey, error: &DiError, _: Duration) {
            self.events.lock().push(format!("failed {key}: {error}"));
        }
    }

    #[test]
    fn observe_reports_success_and_failure() {
        let recorder = Arc::new(Recorder::default());
        let mut observers = Observers::new();
        observers.add(recorder.clone());

        let key = ServiceKey::of::<u8>();
        assert_eq!(observers.observe(&key, || Ok(1)), Ok(1));
        let _ = observers.observe::<()>(&key, || Err(DiError::NotFound("u8")));

        assert_eq!(
            *recorder.events.lock(),
            vec![
                "resolving u8",
                "resolved u8",
                "resolving u8",
                "failed u8: Service not found: u8",
            ]
        );
    }

    #[test]
    fn empty_observers_skip_timing() {
        let observers = Observers::new();
        assert!(!observers.has_observers());
        assert_eq!(observers.observe(&ServiceKey::of::<u8>(), || Ok(3)), Ok(3));
    }
}
