//! Entity trait: identity + continuity across state changes.

/// Entity marker + minimal interface.
///
/// Customers and catalog products are entities owned by collaborators; invoices
/// refer to them by identifier only.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;
}
