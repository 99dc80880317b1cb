//! Runtime registry built from service descriptors.

use once_cell::sync::OnceCell;

use crate::descriptors::{AnyArc, Producer, ServiceDescriptor};
use crate::internal::FastMap;
use crate::key::ServiceKey;
use crate::lifetime::Lifetime;

/// A descriptor compiled for resolution.
pub(crate) struct Registration {
    pub(crate) key: ServiceKey,
    pub(crate) lifetime: Lifetime,
    pub(crate) producer: Producer,
    /// Singleton cache, filled once per provider
    pub(crate) singleton: Option<OnceCell<AnyArc>>,
    /// Index into each scope's cell array
    pub(crate) scoped_slot: Option<usize>,
}

/// Immutable registry owned by a provider.
///
/// Lookup by key returns the last registration made under it; all
/// registrations of a key stay reachable, in order, for `resolve_many`.
pub(crate) struct Registry {
    entries: Vec<Registration>,
    index: FastMap<ServiceKey, Vec<usize>>,
    pub(crate) scoped_count: usize,
}

impl Registry {
    pub(crate) fn from_descriptors(descriptors: &[ServiceDescriptor]) -> Self {
        let mut entries = Vec::with_capacity(descriptors.len());
        let mut index: FastMap<ServiceKey, Vec<usize>> = FastMap::default();
        let mut scoped_count = 0;

        for (position, descriptor) in descriptors.iter().enumerate() {
            let lifetime = descriptor.lifetime();
            let scoped_slot = match lifetime {
                Lifetime::Scoped => {
                    scoped_count += 1;
                    Some(scoped_count - 1)
                }
                _ => None,
            };
            entries.push(Registration {
                key: descriptor.key().clone(),
                lifetime,
                producer: descriptor.implementation().to_producer(),
                singleton: (lifetime == Lifetime::Singleton).then(OnceCell::new),
                scoped_slot,
            });
            index
                .entry(descriptor.key().clone())
                .or_default()
                .push(position);
        }

        Self {
            entries,
            index,
            scoped_count,
        }
    }

    /// The registration that wins for `key`.
    pub(crate) fn get(&self, key: &ServiceKey) -> Option<&Registration> {
        self.index
            .get(key)
            .and_then(|positions| positions.last())
            .map(|&position| &self.entries[position])
    }

    /// Every registration of `key`, in registration order.
    pub(crate) fn get_all<'r>(&'r self, key: &ServiceKey) -> impl Iterator<Item = &'r Registration> + 'r {
        self.index
            .get(key)
            .into_iter()
            .flatten()
            .map(move |&position| &self.entries[position])
    }

    pub(crate) fn contains_key(&self, key: &ServiceKey) -> bool {
        self.index.contains_key(key)
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &Registration> {
        self.entries.iter()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}
