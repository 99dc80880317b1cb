//! Error types for decoration and resolution.

use thiserror::Error;

/// Errors raised while composing a registry or resolving from it.
///
/// Composition-time failures (`MissingRegistration`, `InvalidRegistration`)
/// surface from the decoration API; the remaining variants surface on first
/// resolution of the affected service.
///
/// # Examples
///
/// ```rust
/// use ferrous_decor::{DiError, ServiceCollection, Resolver};
///
/// let provider = ServiceCollection::new().build();
/// match provider.get::<String>() {
///     Err(DiError::NotFound(type_name)) => {
///         assert_eq!(type_name, "alloc::string::String");
///     }
///     _ => unreachable!(),
/// }
/// ```
///
/// ```rust
/// use ferrous_decor::DiError;
///
/// let missing = DiError::MissingRegistration("dyn app::Repository");
/// assert_eq!(
///     missing.to_string(),
///     "Could not find any registered services for type 'dyn app::Repository'",
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiError {
    /// Service not registered
    #[error("Service not found: {0}")]
    NotFound(&'static str),
    /// Type downcast failed
    #[error("Type mismatch for: {0}")]
    TypeMismatch(&'static str),
    /// Circular dependency detected (includes path)
    #[error("Circular dependency: {}", .0.join(" -> "))]
    Circular(Vec<String>),
    /// Invalid lifetime resolution (e.g., scoped from root)
    #[error("Lifetime error: {0}")]
    WrongLifetime(&'static str),
    /// Maximum recursion depth exceeded
    #[error("Max depth {0} exceeded")]
    DepthExceeded(usize),
    /// A strict decoration found nothing to decorate
    #[error("Could not find any registered services for type '{0}'")]
    MissingRegistration(&'static str),
    /// A registration violates a descriptor invariant
    #[error("Invalid registration: {0}")]
    InvalidRegistration(String),
    /// A constructor parameter could not be supplied
    #[error("Unable to activate {ty}: cannot supply parameter '{parameter}'")]
    Activation {
        /// Type being constructed
        ty: &'static str,
        /// Offending parameter, with its type
        parameter: String,
    },
    /// Configuration could not be loaded
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type for DI operations.
///
/// # Examples
///
/// ```rust
/// use ferrous_decor::{DiResult, DiError};
///
/// fn failing_operation() -> DiResult<()> {
///     Err(DiError::NotFound("some_service"))
/// }
///
/// assert!(failing_operation().is_err());
/// ```
pub type DiResult<T> = Result<T, DiError>;
