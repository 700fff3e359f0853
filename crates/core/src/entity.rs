//! Entity trait: identity + continuity across state changes.

/// Entity marker + minimal interface.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;
}

/// Identity equality: two entities are the same entity when their ids match,
/// whatever their current field values.
pub fn same_identity<E: Entity>(a: &E, b: &E) -> bool {
    a.id() == b.id()
}
