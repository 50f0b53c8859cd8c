//! Structural predicates and the id sets that cache their results.
//!
//! A [`Query`] describes which entities it wants ("has all of", "has any of",
//! "carries tags"). The registry keeps one [`EntitySet`] per query ever
//! asked for and updates it entity-by-entity on every structural change, so
//! reading a query never rescans the world after its first use.

use std::collections::HashMap;

use crate::component::{ComponentKind, ComponentMask};
use crate::entity::EntityId;
use crate::tag::{Tag, TagSet};

// ---------------------------------------------------------------------------
// Query
// ---------------------------------------------------------------------------

/// A structural predicate over an entity's component mask and tags.
///
/// An empty `any` mask places no constraint; otherwise at least one of its
/// kinds must be present.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Query {
    all: ComponentMask,
    any: ComponentMask,
    tags: TagSet,
}

impl Query {
    /// Entities holding every kind in `kinds`.
    pub fn all(kinds: &[ComponentKind]) -> Self {
        Self {
            all: ComponentMask::of(kinds),
            ..Self::default()
        }
    }

    /// Entities holding at least one kind in `kinds`.
    pub fn any(kinds: &[ComponentKind]) -> Self {
        Self {
            any: ComponentMask::of(kinds),
            ..Self::default()
        }
    }

    pub fn with_any(mut self, kinds: &[ComponentKind]) -> Self {
        self.any = ComponentMask::of(kinds);
        self
    }

    pub fn with_tag(mut self, tag: Tag) -> Self {
        self.tags.insert(tag);
        self
    }

    pub fn matches(&self, components: ComponentMask, tags: TagSet) -> bool {
        components.contains_all(self.all)
            && (self.any.is_empty() || components.intersects(self.any))
            && tags.contains_all(self.tags)
    }
}

// ---------------------------------------------------------------------------
// EntitySet
// ---------------------------------------------------------------------------

/// Sparse set of entity ids: O(1) insert, remove, and membership, with the
/// members kept contiguous for iteration.
///
/// Removal swaps the last member into the hole, so iteration order is
/// insertion order only until the first removal. It is always a pure
/// function of the operation sequence.
#[derive(Debug, Clone, Default)]
pub struct EntitySet {
    dense: Vec<EntityId>,
    positions: HashMap<EntityId, usize>,
}

impl EntitySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if `id` was not already present.
    pub fn insert(&mut self, id: EntityId) -> bool {
        if self.positions.contains_key(&id) {
            return false;
        }
        self.positions.insert(id, self.dense.len());
        self.dense.push(id);
        true
    }

    /// Returns `true` if `id` was present.
    pub fn remove(&mut self, id: EntityId) -> bool {
        let Some(pos) = self.positions.remove(&id) else {
            return false;
        };
        self.dense.swap_remove(pos);
        if let Some(&moved) = self.dense.get(pos) {
            self.positions.insert(moved, pos);
        }
        true
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.positions.contains_key(&id)
    }

    pub fn as_slice(&self) -> &[EntityId] {
        &self.dense
    }

    pub fn len(&self) -> usize {
        self.dense.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dense.is_empty()
    }

    pub fn clear(&mut self) {
        self.dense.clear();
        self.positions.clear();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
