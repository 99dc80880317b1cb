//! Core traits for resolving services.

mod resolver;

pub use resolver::{Resolver, ResolverCore};
