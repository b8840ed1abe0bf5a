//! Entity trait: identity + continuity across state changes.

/// Entity marker + minimal interface.
///
/// Donors, blood requests and outreach records are entities: two donors with the
/// same name and blood type are still different donors if their ids differ.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;
}
