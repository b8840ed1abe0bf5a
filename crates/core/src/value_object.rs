//! Value object trait: equality by value, not identity.

/// Marker trait for value objects.
///
/// Value objects are **immutable** and **compared by value**. A blood type or a
/// set of contact details has no identity of its own; replacing it means
/// building a new value.
///
/// ```ignore
/// #[derive(Debug, Clone, PartialEq, Eq)]
/// struct ContactInfo {
///     phone: String,
///     address: String,
/// }
///
/// impl ValueObject for ContactInfo {}
/// ```
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
