use crate::collection::ServiceCollection;
use crate::descriptors::ServiceDescriptor;

/// An ordered, index-addressable list of registrations that decoration can
/// rewrite.
///
/// Implementations must keep indices stable: `push` appends and `set`
/// replaces in place, neither moves an existing entry.
pub trait ServiceRegistry {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn get(&self, index: usize) -> Option<&ServiceDescriptor>;

    /// Replaces the registration at `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of bounds.
    fn set(&mut self, index: usize, descriptor: ServiceDescriptor);

    fn push(&mut self, descriptor: ServiceDescriptor);
}

impl ServiceRegistry for Vec<ServiceDescriptor> {
    fn len(&self) -> usize {
        Vec::len(self)
    }

    fn get(&self, index: usize) -> Option<&ServiceDescriptor> {
        self.as_slice().get(index)
    }

    fn set(&mut self, index: usize, descriptor: ServiceDescriptor) {
        self[index] = descriptor;
    }

    fn push(&mut self, descriptor: ServiceDescriptor) {
        Vec::push(self, descriptor);
    }
}

impl ServiceRegistry for ServiceCollection {
    fn len(&self) -> usize {
        self.descriptors.len()
    }

    fn get(&self, index: usize) -> Option<&ServiceDescriptor> {
        self.descriptors.get(index)
    }

    fn set(&mut self, index: usize, descriptor: ServiceDescriptor) {
        self.descriptors[index] = descriptor;
    }

    fn push(&mut self, descriptor: ServiceDescriptor) {
        self.descriptors.push(descriptor);
    }
}
