//! Entity bookkeeping: generations, placement and pending changes

use super::archetype::ArchetypeIndex;
use super::component::ComponentId;
use super::entity::{Entity, EntityId};
use crate::collections::BitSet;

/// Per-id placement and the structural changes waiting for commit.
#[derive(Debug, Default, Clone)]
pub struct EntityRecord {
    pub(crate) archetype: ArchetypeIndex,
    /// `None` until the first commit places the entity.
    pub(crate) row: Option<usize>,
    pub(crate) added: Vec<ComponentId>,
    pub(crate) removed: Vec<ComponentId>,
    pub(crate) debug_label: Option<String>,
}

impl EntityRecord {
    pub fn archetype(&self) -> ArchetypeIndex {
        self.archetype
    }

    pub fn row(&self) -> Option<usize> {
        self.row
    }

    /// Components set since the last commit.
    pub fn added(&self) -> &[ComponentId] {
        &self.added
    }

    /// Components removed since the last commit.
    pub fn removed(&self) -> &[ComponentId] {
        &self.removed
    }

    fn reset(&mut self) {
        self.archetype = 0;
        self.row = None;
        self.added.clear();
        self.removed.clear();
        self.debug_label = None;
    }
}

#[derive(Debug)]
pub struct EntityTable {
    records: Vec<EntityRecord>,
    generations: Vec<u32>,
    live: BitSet,
    free_ids: Vec<EntityId>,
    next_id: EntityId,
    pub(crate) dirty: BitSet,
    pub(crate) disposed: BitSet,
    count: usize,
}

impl EntityTable {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        // Slot 0 backs the null entity and is never handed out.
        let capacity = capacity.max(1) + 1;
        let mut records = Vec::with_capacity(capacity);
        records.resize_with(capacity, EntityRecord::default);
        Self {
            records,
            generations: vec![0; capacity],
            live: BitSet::with_capacity(capacity),
            free_ids: Vec::new(),
            next_id: 1,
            dirty: BitSet::with_capacity(capacity),
            disposed: BitSet::with_capacity(capacity),
            count: 0,
        }
    }

    /// Live entities (disposed ones stop counting immediately).
    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn capacity(&self) -> usize {
        self.generations.len()
    }

    pub(crate) fn allocate(&mut self, label: Option<String>) -> Entity {
        let id = match self.free_ids.pop() {
            Some(id) => id,
            None => {
                let id = self.next_id;
                self.next_id += 1;
                if id as usize >= self.capacity() {
                    self.grow(id as usize + 1);
                }
                id
            }
        };

        let record = &mut self.records[id as usize];
        record.reset();
        record.debug_label = label;
        self.live.insert(id as usize);
        self.dirty.insert(id as usize);
        self.count += 1;
        Entity::new(id, self.generations[id as usize])
    }

    fn grow(&mut self, min_capacity: usize) {
        let capacity = (self.capacity() * 2).max(min_capacity);
        self.generations.resize(capacity, 0);
        self.records.resize_with(capacity, EntityRecord::default);
        self.live.reserve_bits(capacity);
        self.dirty.reserve_bits(capacity);
        self.disposed.reserve_bits(capacity);
        tracing::trace!(capacity, "entity table grown");
    }

    #[inline]
    pub fn is_disposed(&self, entity: Entity) -> bool {
        let id = entity.id() as usize;
        id == 0 || !self.live.contains(id) || self.generations[id] != entity.generation()
    }

    /// Current handle for `id`, or [`Entity::NULL`] when nothing lives there.
    pub fn get_entity(&self, id: EntityId) -> Entity {
        let index = id as usize;
        if index == 0 || !self.live.contains(index) {
            return Entity::NULL;
        }
        Entity::new(id, self.generations[index])
    }

    pub fn record(&self, entity: Entity) -> Option<&EntityRecord> {
        if self.is_disposed(entity) {
            return None;
        }
        self.records.get(entity.id() as usize)
    }

    pub fn is_dirty(&self, id: EntityId) -> bool {
        self.dirty.contains(id as usize)
    }

    #[inline]
    pub(crate) fn record_by_id(&self, id: EntityId) -> &EntityRecord {
        &self.records[id as usize]
    }

    #[inline]
    pub(crate) fn record_by_id_mut(&mut self, id: EntityId) -> &mut EntityRecord {
        &mut self.records[id as usize]
    }

    /// Note a newly present component, cancelling a pending removal.
    pub(crate) fn note_added(&mut self, id: EntityId, component: ComponentId) {
        let record = &mut self.records[id as usize];
        match record.removed.iter().position(|&c| c == component) {
            Some(pos) => {
                record.removed.swap_remove(pos);
            }
            None => record.added.push(component),
        }
        self.dirty.insert(id as usize);
    }

    /// Note a removed component, cancelling a pending add.
    pub(crate) fn note_removed(&mut self, id: EntityId, component: ComponentId) {
        let record = &mut self.records[id as usize];
        match record.added.iter().position(|&c| c == component) {
            Some(pos) => {
                record.added.swap_remove(pos);
            }
            None => record.removed.push(component),
        }
        self.dirty.insert(id as usize);
    }

    /// Mark `entity` disposed and invalidate its handle. The caller has
    /// already checked liveness and cleaned its stashes.
    pub(crate) fn dispose(&mut self, entity: Entity) {
        let id = entity.id() as usize;
        self.dirty.remove(id);
        self.disposed.insert(id);
        self.live.remove(id);
        self.generations[id] = self.generations[id].wrapping_add(1);
        self.records[id].debug_label = None;
        self.count -= 1;
    }

    /// Clear a committed disposal and make the id reusable.
    pub(crate) fn release(&mut self, id: EntityId) {
        self.records[id as usize].reset();
        self.free_ids.push(id);
    }
}
