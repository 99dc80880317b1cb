//! Service keys and shadow identities.
//!
//! A [`ServiceKey`] names what a caller asks the container for. Real keys are
//! derived from a Rust type (optionally carrying generic arguments so that
//! open-generic families can be matched). Shadow keys are minted by the
//! decoration pass to re-home an original registration: they share the
//! service type of the key they were derived from, but carry a process-wide
//! unique tag so no caller can ever name them by type.

use std::any::TypeId;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::num::NonZeroU64;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::generic::{GenericArguments, GenericDefinition, GenericService};

/// Runtime identity of a Rust type.
///
/// Equality and hashing use the [`TypeId`] only; the name is carried for
/// diagnostics.
///
/// # Examples
///
/// ```rust
/// use ferrous_decor::TypeInfo;
///
/// let info = TypeInfo::of::<String>();
/// assert!(info.is::<String>());
/// assert_eq!(info.name(), "alloc::string::String");
/// assert_ne!(info, TypeInfo::of::<u32>());
/// ```
#[derive(Clone, Copy)]
pub struct TypeInfo {
    id: TypeId,
    name: &'static str,
}

impl TypeInfo {
    /// Captures the identity of `T`.
    #[inline(always)]
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    #[inline]
    pub fn id(&self) -> TypeId {
        self.id
    }

    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Returns true if this is the identity of `T`.
    #[inline]
    pub fn is<T: ?Sized + 'static>(&self) -> bool {
        self.id == TypeId::of::<T>()
    }
}

impl PartialEq for TypeInfo {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeInfo {}

impl Hash for TypeInfo {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for TypeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

impl fmt::Display for TypeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// The type half of a [`ServiceKey`].
///
/// `Closed` types are concrete: every registration and every resolution uses
/// one. A closed type may also record the generic family it instantiates,
/// which is what lets an open-generic decoration find it. `Open` types name a
/// family and are only ever used as decoration selectors.
#[derive(Clone)]
pub enum ServiceType {
    /// A concrete service type
    Closed {
        info: TypeInfo,
        generic: Option<GenericArguments>,
    },
    /// An open generic family
    Open(GenericDefinition),
}

impl ServiceType {
    /// A closed type with no generic metadata.
    pub fn closed<S: ?Sized + 'static>() -> Self {
        ServiceType::Closed {
            info: TypeInfo::of::<S>(),
            generic: None,
        }
    }

    /// A closed type instantiating a generic family.
    pub fn generic<S: ?Sized + GenericService>() -> Self {
        ServiceType::Closed {
            info: TypeInfo::of::<S>(),
            generic: Some(GenericArguments::new(S::definition(), S::arguments())),
        }
    }

    pub fn open(definition: GenericDefinition) -> Self {
        ServiceType::Open(definition)
    }

    /// Human-readable type name.
    pub fn name(&self) -> &'static str {
        match self {
            ServiceType::Closed { info, .. } => info.name(),
            ServiceType::Open(definition) => definition.name(),
        }
    }

    /// The `TypeId` of the closed type, or of the family marker.
    pub fn type_id(&self) -> TypeId {
        match self {
            ServiceType::Closed { info, .. } => info.id(),
            ServiceType::Open(definition) => definition.id(),
        }
    }

    pub fn generic_arguments(&self) -> Option<&GenericArguments> {
        match self {
            ServiceType::Closed { generic, .. } => generic.as_ref(),
            ServiceType::Open(_) => None,
        }
    }

    /// The family this type belongs to (closed generic) or names (open).
    pub fn definition(&self) -> Option<&GenericDefinition> {
        match self {
            ServiceType::Closed { generic, .. } => generic.as_ref().map(|args| args.definition()),
            ServiceType::Open(definition) => Some(definition),
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(self, ServiceType::Open(_))
    }
}

impl PartialEq for ServiceType {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (ServiceType::Closed { info: a, .. }, ServiceType::Closed { info: b, .. }) => a == b,
            (ServiceType::Open(a), ServiceType::Open(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for ServiceType {}

impl Hash for ServiceType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.is_open().hash(state);
        self.type_id().hash(state);
    }
}

impl fmt::Debug for ServiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceType::Closed { info, .. } => write!(f, "{}", info.name()),
            ServiceType::Open(definition) => write!(f, "{}<..>", definition.name()),
        }
    }
}

static NEXT_SHADOW: AtomicU64 = AtomicU64::new(1);

/// Marker that turns a key into a shadow key.
///
/// Each tag is unique for the life of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShadowTag(NonZeroU64);

impl ShadowTag {
    fn next() -> Self {
        let raw = NEXT_SHADOW.fetch_add(1, Ordering::Relaxed);
        // The counter starts at 1 and a u64 will not wrap in practice.
        ShadowTag(NonZeroU64::new(raw).unwrap_or(NonZeroU64::MIN))
    }

    pub fn get(&self) -> u64 {
        self.0.get()
    }
}

/// Identifies a service within a registry.
///
/// # Examples
///
/// ```rust
/// use ferrous_decor::ServiceKey;
///
/// trait Greeter: Send + Sync {}
///
/// let key = ServiceKey::of::<dyn Greeter>();
/// let shadow = key.shadow();
///
/// assert!(shadow.is_shadow());
/// assert_ne!(key, shadow);
/// assert_ne!(shadow, key.shadow());
/// assert_eq!(shadow.label(), format!("Decorated {}", key.display_name()));
/// ```
#[derive(Clone)]
pub struct ServiceKey {
    ty: ServiceType,
    shadow: Option<ShadowTag>,
}

impl ServiceKey {
    /// Key for a closed service type.
    #[inline]
    pub fn of<S: ?Sized + 'static>() -> Self {
        Self::from_type(ServiceType::closed::<S>())
    }

    /// Key for a closed service type that belongs to a generic family.
    ///
    /// Registrations made under this key can be selected by an open-generic
    /// decoration of the family. Resolution is unaffected: the key equals
    /// `ServiceKey::of::<S>()`.
    pub fn generic<S: ?Sized + GenericService>() -> Self {
        Self::from_type(ServiceType::generic::<S>())
    }

    /// Selector key for a whole generic family.
    pub fn family(definition: GenericDefinition) -> Self {
        Self::from_type(ServiceType::open(definition))
    }

    pub fn from_type(ty: ServiceType) -> Self {
        Self { ty, shadow: None }
    }

    pub fn service_type(&self) -> &ServiceType {
        &self.ty
    }

    /// Name of the underlying service type.
    pub fn display_name(&self) -> &'static str {
        self.ty.name()
    }

    /// Readable label, `"Decorated <name>"` for shadow keys.
    pub fn label(&self) -> String {
        match self.shadow {
            Some(_) => format!("Decorated {}", self.ty.name()),
            None => self.ty.name().to_string(),
        }
    }

    pub fn is_shadow(&self) -> bool {
        self.shadow.is_some()
    }

    pub fn shadow_tag(&self) -> Option<ShadowTag> {
        self.shadow
    }

    pub fn is_open_generic(&self) -> bool {
        self.ty.is_open()
    }

    /// Mints a fresh shadow key with the same service type.
    ///
    /// Never fails and never returns a key equal to any other key, including
    /// earlier shadows of the same original.
    pub fn shadow(&self) -> ServiceKey {
        ServiceKey {
            ty: self.ty.clone(),
            shadow: Some(ShadowTag::next()),
        }
    }
}

impl PartialEq for ServiceKey {
    fn eq(&self, other: &Self) -> bool {
        self.shadow == other.shadow && self.ty == other.ty
    }
}

impl Eq for ServiceKey {}

impl Hash for ServiceKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.ty.hash(state);
        self.shadow.hash(state);
    }
}

impl fmt::Debug for ServiceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.shadow {
            Some(tag) => write!(f, "Decorated {:?}#{}", self.ty, tag.get()),
            None => write!(f, "{:?}", self.ty),
        }
    }
}

impl fmt::Display for ServiceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    trait Sink: Send + Sync {}

    #[test]
    fn keys_from_same_type_are_equal() {
        assert_eq!(ServiceKey::of::<u32>(), ServiceKey::of::<u32>());
        assert_ne!(ServiceKey::of::<u32>(), ServiceKey::of::<u64>());
        assert_eq!(ServiceKey::of::<dyn Sink>(), ServiceKey::of::<dyn Sink>());
    }

    #[test]
    fn shadows_are_distinct_from_everything() {
        let key = ServiceKey::of::<dyn Sink>();
        let shadows: Vec<_> = (0..64).map(|_| key.shadow()).collect();

        let mut seen = HashSet::new();
        seen.insert(key.clone());
        for shadow in &shadows {
            assert!(shadow.is_shadow());
            assert_eq!(shadow.service_type(), key.service_type());
            assert!(seen.insert(shadow.clone()), "duplicate shadow {shadow:?}");
        }
    }

    #[test]
    fn shadow_of_shadow_is_fresh() {
        let key = ServiceKey::of::<String>();
        let first = key.shadow();
        let second = first.shadow();
        assert_ne!(first, second);
        assert!(second.is_shadow());
    }

    #[test]
    fn labels() {
        let key = ServiceKey::of::<String>();
        assert_eq!(key.label(), "alloc::string::String");
        assert_eq!(key.shadow().label(), "Decorated alloc::string::String");
        assert!(format!("{:?}", key.shadow()).starts_with("Decorated alloc::string::String#"));
    }

    #[test]
    fn type_info_ignores_name_for_equality() {
        let a = TypeInfo::of::<Vec<u8>>();
        let b = TypeInfo::of::<Vec<u8>>();
        assert_eq!(a, b);
        assert!(a.is::<Vec<u8>>());
        assert!(!a.is::<Vec<u16>>());
    }
}
