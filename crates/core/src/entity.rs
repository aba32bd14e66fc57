//! Entity trait: identity + continuity across state changes.

/// Entity marker + minimal interface.
///
/// Used by plain records that are not event-driven (catalog entries, movement
/// history, audit log lines) so lookups can be written once.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;
}

/// Find an entity by id in a slice.
pub fn find_by_id<'a, E: Entity>(items: &'a [E], id: &E::Id) -> Option<&'a E> {
    items.iter().find(|e| e.id() == id)
}
