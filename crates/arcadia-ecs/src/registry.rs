//! The [`EntityRegistry`] owns every entity, its components and tags, the
//! reverse tag index, and all cached query results.
//!
//! Structural changes (adding or removing a component kind or a tag) only
//! happen through registry methods, and each of them finishes by calling
//! [`EntityRegistry::update_cache`] for the touched entity. Callers get
//! `&mut` access to component *data* but never to the component set itself,
//! so the caches cannot drift out of sync with the entities they describe.

use std::collections::HashMap;

use tracing::trace;

use crate::component::{Component, ComponentData, ComponentKind, ComponentSet};
use crate::entity::{EntityId, SlotTable};
use crate::pool::{ComponentPool, ObjectPool};
use crate::query::{EntitySet, Query};
use crate::tag::{Tag, TagSet};
use crate::EcsError;

// ---------------------------------------------------------------------------
// EntityRecord
// ---------------------------------------------------------------------------

/// One entity: identity, active flag, components, and tags.
///
/// Records are pooled; a destroyed entity's record is reset and handed to the
/// next `create_entity` call.
#[derive(Debug)]
pub struct EntityRecord {
    id: EntityId,
    active: bool,
    components: ComponentSet,
    tags: TagSet,
}

impl EntityRecord {
    fn blank() -> Self {
        Self {
            id: EntityId::new(0, 0),
            active: false,
            components: ComponentSet::new(),
            tags: TagSet::EMPTY,
        }
    }

    fn reset(record: &mut EntityRecord) {
        record.active = false;
        record.tags = TagSet::EMPTY;
        record.components.drain_into(drop);
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn components(&self) -> &ComponentSet {
        &self.components
    }

    pub fn tags(&self) -> TagSet {
        self.tags
    }

    pub fn get<T: ComponentData>(&self) -> Option<&T> {
        self.components.get::<T>()
    }

    pub fn has(&self, kind: ComponentKind) -> bool {
        self.components.contains(kind)
    }

    pub fn has_tag(&self, tag: Tag) -> bool {
        self.tags.contains(tag)
    }
}

/// Pool occupancy, for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    pub records_available: usize,
    pub records_created: usize,
    pub components_available: usize,
    pub components_created: usize,
}

// ---------------------------------------------------------------------------
// EntityRegistry
// ---------------------------------------------------------------------------

/// Sole owner of entity, component, and tag state.
pub struct EntityRegistry {
    slots: SlotTable,
    /// Indexed by `EntityId::index()`. `None` for free slots.
    records: Vec<Option<EntityRecord>>,
    record_pool: ObjectPool<EntityRecord>,
    component_pool: ComponentPool,
    tag_index: [EntitySet; Tag::COUNT],
    queries: HashMap<Query, EntitySet>,
    deferred: EntitySet,
}

impl std::fmt::Debug for EntityRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityRegistry")
            .field("active", &self.slots.occupied())
            .field("slots", &self.records.len())
            .field("cached_queries", &self.queries.len())
            .field("deferred", &self.deferred.len())
            .finish()
    }
}

impl Default for EntityRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl EntityRegistry {
    pub fn new() -> Self {
        Self {
            slots: SlotTable::new(),
            records: Vec::new(),
            record_pool: ObjectPool::new(EntityRecord::blank, EntityRecord::reset),
            component_pool: ComponentPool::new(),
            tag_index: std::array::from_fn(|_| EntitySet::new()),
            queries: HashMap::new(),
            deferred: EntitySet::new(),
        }
    }

    // -- lifecycle ----------------------------------------------------------

    /// Create an empty, active entity.
    pub fn create_entity(&mut self) -> EntityId {
        let id = self.slots.claim();
        let mut record = self.record_pool.acquire();
        record.id = id;
        record.active = true;

        let idx = id.index() as usize;
        if idx >= self.records.len() {
            self.records.resize_with(idx + 1, || None);
        }
        self.records[idx] = Some(record);
        self.update_cache(id);
        id
    }

    /// Create an entity with the given tags and components in one step.
    ///
    /// Later components of the same kind replace earlier ones.
    pub fn spawn<I>(&mut self, tags: &[Tag], components: I) -> EntityId
    where
        I: IntoIterator<Item = Component>,
    {
        let id = self.slots.claim();
        let mut record = self.record_pool.acquire();
        record.id = id;
        record.active = true;
        record.tags = TagSet::of(tags);
        for component in components {
            Self::place(&mut self.component_pool, &mut record.components, component);
        }

        let idx = id.index() as usize;
        if idx >= self.records.len() {
            self.records.resize_with(idx + 1, || None);
        }
        self.records[idx] = Some(record);
        self.update_cache(id);
        id
    }

    /// Destroy an entity immediately.
    ///
    /// Returns `false` without doing anything if `id` is unknown or already
    /// destroyed, so calling it twice is harmless.
    pub fn destroy_entity(&mut self, id: EntityId) -> bool {
        if !self.slots.is_current(id) {
            return false;
        }
        let Some(mut record) = self.records[id.index() as usize].take() else {
            return false;
        };
        record.active = false;

        for set in &mut self.tag_index {
            set.remove(id);
        }
        for set in self.queries.values_mut() {
            set.remove(id);
        }

        let pool = &mut self.component_pool;
        record.components.drain_into(|c| pool.release(c));
        record.tags = TagSet::EMPTY;

        self.deferred.remove(id);
        self.slots.release(id);
        self.record_pool.release(record);
        trace!(entity = %id, "entity destroyed");
        true
    }

    /// Queue `id` for destruction at the next [`flush_deferred`](Self::flush_deferred).
    ///
    /// Returns `false` if the entity is not active. Queuing twice is a no-op.
    pub fn defer_destroy(&mut self, id: EntityId) -> bool {
        if !self.is_active(id) {
            return false;
        }
        self.deferred.insert(id);
        true
    }

    /// Destroy every queued entity, in queue order. Returns how many died.
    pub fn flush_deferred(&mut self) -> usize {
        let queued = std::mem::take(&mut self.deferred);
        let destroyed = queued
            .as_slice()
            .iter()
            .filter(|&&id| self.destroy_entity(id))
            .count();
        // Hand the buffer back to keep its capacity.
        self.deferred = queued;
        self.deferred.clear();
        destroyed
    }

    /// Entities queued by [`defer_destroy`](Self::defer_destroy), in queue order.
    pub fn pending_destroy(&self) -> &[EntityId] {
        self.deferred.as_slice()
    }

    /// `true` if `id` is queued for the next flush.
    pub fn is_pending_destroy(&self, id: EntityId) -> bool {
        self.deferred.contains(id)
    }

    /// Destroy every entity. Cached query definitions survive (empty).
    pub fn clear(&mut self) {
        let ids: Vec<EntityId> = self.iter().map(EntityRecord::id).collect();
        for id in ids {
            self.destroy_entity(id);
        }
        self.deferred.clear();
    }

    // -- lookup -------------------------------------------------------------

    pub fn is_active(&self, id: EntityId) -> bool {
        self.slots.is_current(id)
    }

    pub fn get(&self, id: EntityId) -> Option<&EntityRecord> {
        if !self.slots.is_current(id) {
            return None;
        }
        self.records.get(id.index() as usize)?.as_ref()
    }

    fn get_record_mut(&mut self, id: EntityId) -> Result<&mut EntityRecord, EcsError> {
        if !self.slots.is_current(id) {
            return Err(EcsError::StaleEntity { entity: id });
        }
        self.records
            .get_mut(id.index() as usize)
            .and_then(Option::as_mut)
            .ok_or(EcsError::StaleEntity { entity: id })
    }

    /// Optional component lookup. `None` for unknown ids and absent kinds.
    pub fn component<T: ComponentData>(&self, id: EntityId) -> Option<&T> {
        self.get(id)?.components.get::<T>()
    }

    pub fn component_mut<T: ComponentData>(&mut self, id: EntityId) -> Option<&mut T> {
        self.get_record_mut(id).ok()?.components.get_mut::<T>()
    }

    /// Required component lookup.
    ///
    /// A live entity without `T` is a content bug and yields
    /// [`EcsError::MissingComponent`].
    pub fn require<T: ComponentData>(&self, id: EntityId) -> Result<&T, EcsError> {
        let record = self.get(id).ok_or(EcsError::StaleEntity { entity: id })?;
        record.components.get::<T>().ok_or(EcsError::MissingComponent {
            entity: id,
            kind: T::KIND,
        })
    }

    pub fn require_mut<T: ComponentData>(&mut self, id: EntityId) -> Result<&mut T, EcsError> {
        let record = self.get_record_mut(id)?;
        record.components.get_mut::<T>().ok_or(EcsError::MissingComponent {
            entity: id,
            kind: T::KIND,
        })
    }

    pub fn has_tag(&self, id: EntityId, tag: Tag) -> bool {
        self.get(id).is_some_and(|r| r.tags.contains(tag))
    }

    /// Active entities in slot order.
    pub fn iter(&self) -> impl Iterator<Item = &EntityRecord> {
        self.records.iter().flatten().filter(|r| r.active)
    }

    pub fn active_count(&self) -> usize {
        self.slots.occupied()
    }

    // -- structural mutation ------------------------------------------------

    /// Attach a component, or overwrite the one already there in place.
    pub fn add_component(&mut self, id: EntityId, component: impl Into<Component>) -> Result<(), EcsError> {
        let component = component.into();
        let kind = component.kind();
        if !self.slots.is_current(id) {
            return Err(EcsError::StaleEntity { entity: id });
        }
        let Some(record) = self.records.get_mut(id.index() as usize).and_then(Option::as_mut) else {
            return Err(EcsError::StaleEntity { entity: id });
        };
        let was_present = record.components.contains(kind);
        Self::place(&mut self.component_pool, &mut record.components, component);
        if !was_present {
            self.update_cache(id);
        }
        Ok(())
    }

    /// Store `component` in `set`. An existing instance of the kind is
    /// overwritten where it lies; a new kind takes its storage from the pool.
    fn place(pool: &mut ComponentPool, set: &mut ComponentSet, component: Component) {
        if let Some(existing) = set.get_kind_mut(component.kind()) {
            existing.overwrite(component);
            return;
        }
        set.insert(pool.fill(component));
    }

    /// Detach a component and return it to the pool.
    ///
    /// Returns `Ok(false)` if the entity had no component of that kind.
    pub fn remove_component(&mut self, id: EntityId, kind: ComponentKind) -> Result<bool, EcsError> {
        let record = self.get_record_mut(id)?;
        match record.components.remove(kind) {
            Some(removed) => {
                self.component_pool.release(removed);
                self.update_cache(id);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Detach a component and hand it to the caller.
    pub fn take_component<T: ComponentData>(&mut self, id: EntityId) -> Result<Option<T>, EcsError> {
        let record = self.get_record_mut(id)?;
        let Some(removed) = record.components.remove(T::KIND) else {
            return Ok(None);
        };
        self.update_cache(id);
        Ok(T::try_from_component(removed).ok())
    }

    pub fn add_tag(&mut self, id: EntityId, tag: Tag) -> Result<bool, EcsError> {
        let added = self.get_record_mut(id)?.tags.insert(tag);
        if added {
            self.update_cache(id);
        }
        Ok(added)
    }

    pub fn remove_tag(&mut self, id: EntityId, tag: Tag) -> Result<bool, EcsError> {
        let removed = self.get_record_mut(id)?.tags.remove(tag);
        if removed {
            self.update_cache(id);
        }
        Ok(removed)
    }

    /// A reset component instance from the pool, ready to fill and attach.
    pub fn acquire_component<T: ComponentData>(&mut self) -> T {
        self.component_pool.acquire::<T>()
    }

    // -- caches -------------------------------------------------------------

    /// Re-evaluate the tag index and every cached query for one entity.
    ///
    /// Registry mutators already call this; it is exposed for explicit
    /// resynchronisation. Unknown or destroyed ids are purged from every set.
    pub fn update_cache(&mut self, id: EntityId) {
        let snapshot = self
            .get(id)
            .map(|record| (record.components.mask(), record.tags));

        let Some((mask, tags)) = snapshot else {
            for set in &mut self.tag_index {
                set.remove(id);
            }
            for set in self.queries.values_mut() {
                set.remove(id);
            }
            return;
        };

        for tag in Tag::ALL {
            let set = &mut self.tag_index[tag.index()];
            if tags.contains(tag) {
                set.insert(id);
            } else {
                set.remove(id);
            }
        }
        for (query, set) in &mut self.queries {
            if query.matches(mask, tags) {
                set.insert(id);
            } else {
                set.remove(id);
            }
        }
    }

    /// Active entities holding `tag`.
    pub fn get_by_tag(&self, tag: Tag) -> &[EntityId] {
        self.tag_index[tag.index()].as_slice()
    }

    /// Active entities matching `query`.
    ///
    /// The first call for a given predicate scans every entity once; later
    /// calls return the incrementally maintained set.
    pub fn query(&mut self, query: Query) -> &[EntityId] {
        if !self.queries.contains_key(&query) {
            let mut set = EntitySet::new();
            for record in self.records.iter().flatten() {
                if record.active && query.matches(record.components.mask(), record.tags) {
                    set.insert(record.id);
                }
            }
            trace!(?query, matched = set.len(), "query cache created");
            self.queries.insert(query, set);
        }
        self.queries.get(&query).map(EntitySet::as_slice).unwrap_or(&[])
    }

    /// Owned copy of [`query`](Self::query), for loops that mutate the
    /// registry while iterating.
    pub fn query_ids(&mut self, query: Query) -> Vec<EntityId> {
        self.query(query).to_vec()
    }

    /// Results of a query that has already been cached.
    pub fn cached_query(&self, query: &Query) -> Option<&[EntityId]> {
        self.queries.get(query).map(EntitySet::as_slice)
    }

    pub fn cached_query_count(&self) -> usize {
        self.queries.len()
    }

    pub fn pool_stats(&self) -> PoolStats {
        PoolStats {
            records_available: self.record_pool.available(),
            records_created: self.record_pool.total_created(),
            components_available: self.component_pool.total_available(),
            components_created: self.component_pool.total_created(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
