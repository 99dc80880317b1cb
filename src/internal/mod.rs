//! Internal implementation details.

pub(crate) mod circular;

pub use circular::CircularPanic;
pub(crate) use circular::with_circular_catch;

#[cfg(feature = "ahash")]
pub(crate) type FastMap<K, V> = std::collections::HashMap<K, V, ahash::RandomState>;

#[cfg(not(feature = "ahash"))]
pub(crate) type FastMap<K, V> = std::collections::HashMap<K, V>;
