//! Circular dependency detection infrastructure.
//!
//! The resolution stack is tracked per thread by [`ServiceKey`], not by type
//! name: a decorator and the shadow holding the original share a name, and
//! resolving one from the other is the normal decorated path, not a cycle.

use std::cell::RefCell;
use std::panic::{self, AssertUnwindSafe};

use crate::error::{DiError, DiResult};
use crate::key::ServiceKey;

const MAX_DEPTH: usize = 1024;

thread_local! {
    static RESOLUTION_STACK: RefCell<Vec<ServiceKey>> = const { RefCell::new(Vec::new()) };
}

/// Panic payload for circular dependency detection.
///
/// Raised by the panicking resolver helpers (such as `get_required`) when the
/// failure is a cycle, so that an enclosing resolution can turn it back into
/// [`DiError::Circular`] with the full path.
///
/// Example path: `["ServiceA", "ServiceB", "ServiceA"]`
#[derive(Debug)]
pub struct CircularPanic {
    /// The dependency path, first entry repeated at the end.
    pub path: Box<[String]>,
}

impl CircularPanic {
    pub(crate) fn new(path: Vec<String>) -> Self {
        CircularPanic {
            path: path.into_boxed_slice(),
        }
    }
}

/// Entry on the thread-local resolution stack, popped on drop.
pub(crate) struct StackGuard {
    _private: (),
}

impl StackGuard {
    pub(crate) fn enter(key: &ServiceKey) -> DiResult<Self> {
        RESOLUTION_STACK.with(|stack| {
            let mut stack = stack.borrow_mut();

            if let Some(start) = stack.iter().position(|k| k == key) {
                let mut path: Vec<String> = stack[start..].iter().map(ServiceKey::label).collect();
                path.push(key.label());
                return Err(DiError::Circular(path));
            }

            if stack.len() >= MAX_DEPTH {
                return Err(DiError::DepthExceeded(stack.len()));
            }

            stack.push(key.clone());
            Ok(StackGuard { _private: () })
        })
    }
}

impl Drop for StackGuard {
    fn drop(&mut self) {
        RESOLUTION_STACK.with(|stack| {
            stack.borrow_mut().pop();
        });
    }
}

/// Runs `f` with `key` pushed on the resolution stack.
///
/// A [`CircularPanic`] escaping `f` is converted to [`DiError::Circular`];
/// any other panic continues unwinding.
pub(crate) fn with_circular_catch<T, F>(key: &ServiceKey, f: F) -> DiResult<T>
where
    F: FnOnce() -> DiResult<T>,
{
    let _guard = StackGuard::enter(key)?;

    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => result,
        Err(payload) => match payload.downcast::<CircularPanic>() {
            Ok(circular) => Err(DiError::Circular(circular.path.into_vec())),
            Err(payload) => panic::resume_unwind(payload),
        },
    }
}
