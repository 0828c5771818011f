//! Per-type component storage
//!
//! A [`Stash<T>`] owns every `T` in a world, keyed by entity id. Values sit
//! in a [`LongHashMap`] so their slot order is stable across a save walk and
//! a load that replays the same inserts; a [`BitSet`] mirrors presence for
//! branch-cheap `has` checks.
//!
//! Typed access goes through the borrowing views [`StashRef`] and
//! [`StashMut`], which pair the stash with the entity table so that writes
//! can validate handles and record structural changes for the next commit.

use super::component::{Component, ComponentId, ComponentMeta};
use super::entity::{Entity, EntityId};
use super::entity_table::EntityTable;
use super::world_error::WorldError;
use crate::collections::{BitSet, LongHashMap};
use std::any::Any;

/// Type-erased stash capability used by commit and entity removal.
pub trait ErasedStash: Any + Send {
    fn component_id(&self) -> ComponentId;
    fn component_name(&self) -> &str;
    fn has(&self, id: EntityId) -> bool;
    /// Drop the value for `id` without recording a structural change.
    fn clean(&mut self, id: EntityId);
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

pub struct Stash<T: Component> {
    meta: ComponentMeta,
    values: LongHashMap<T>,
    present: BitSet,
}

impl<T: Component> Stash<T> {
    pub(crate) fn with_capacity(meta: ComponentMeta, capacity: usize) -> Self {
        debug_assert_eq!(meta.id, T::ID);
        Self {
            meta,
            values: LongHashMap::with_capacity(capacity),
            present: BitSet::with_capacity(capacity),
        }
    }

    pub fn meta(&self) -> &ComponentMeta {
        &self.meta
    }

    #[inline]
    fn contains(&self, id: EntityId) -> bool {
        self.present.contains(id as usize)
    }

    /// Write the value; returns `true` when it was newly present.
    fn write(&mut self, id: EntityId, value: T) -> bool {
        self.values.insert(id as u64, value);
        self.present.insert(id as usize)
    }

    fn take(&mut self, id: EntityId) -> Option<T> {
        if !self.present.remove(id as usize) {
            return None;
        }
        self.values.remove(id as u64)
    }
}

impl<T: Component> ErasedStash for Stash<T> {
    fn component_id(&self) -> ComponentId {
        T::ID
    }

    fn component_name(&self) -> &str {
        &self.meta.name
    }

    fn has(&self, id: EntityId) -> bool {
        self.contains(id)
    }

    fn clean(&mut self, id: EntityId) {
        self.take(id);
    }

    fn len(&self) -> usize {
        self.values.len()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Read-only view of one component type.
///
/// A world that never created the stash hands out an empty view.
pub struct StashRef<'w, T: Component> {
    stash: Option<&'w Stash<T>>,
    entities: &'w EntityTable,
}

impl<'w, T: Component> StashRef<'w, T> {
    pub(crate) fn new(stash: Option<&'w Stash<T>>, entities: &'w EntityTable) -> Self {
        Self { stash, entities }
    }

    pub fn has(&self, entity: Entity) -> bool {
        !self.entities.is_disposed(entity)
            && self.stash.is_some_and(|stash| stash.contains(entity.id()))
    }

    pub fn get(&self, entity: Entity) -> Option<&'w T> {
        if self.entities.is_disposed(entity) {
            return None;
        }
        self.stash?.values.get(entity.id() as u64)
    }

    pub fn len(&self) -> usize {
        self.stash.map_or(0, |stash| stash.values.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Entities holding a value, in stable slot order.
    pub fn ids(&self) -> impl Iterator<Item = Entity> + 'w {
        self.iter().map(|(entity, _)| entity)
    }

    /// `(entity, value)` pairs in stable slot order.
    pub fn iter(&self) -> impl Iterator<Item = (Entity, &'w T)> + 'w {
        let entities = self.entities;
        self.stash
            .into_iter()
            .flat_map(|stash| stash.values.iter())
            .map(move |(id, value)| (entities.get_entity(id as EntityId), value))
    }
}

/// Mutable view of one component type.
pub struct StashMut<'w, T: Component> {
    stash: &'w mut Stash<T>,
    entities: &'w mut EntityTable,
}

impl<'w, T: Component> StashMut<'w, T> {
    pub(crate) fn new(stash: &'w mut Stash<T>, entities: &'w mut EntityTable) -> Self {
        Self { stash, entities }
    }

    /// Insert or overwrite the value for `entity`.
    ///
    /// A newly present component marks the entity dirty; the archetype
    /// move happens on the next commit.
    pub fn set(&mut self, entity: Entity, value: T) -> Result<(), WorldError> {
        if self.entities.is_disposed(entity) {
            return Err(WorldError::StaleEntity { entity });
        }
        if self.stash.write(entity.id(), value) {
            self.entities.note_added(entity.id(), T::ID);
        }
        Ok(())
    }

    /// Like [`set`](Self::set), but refuses to overwrite.
    pub fn add(&mut self, entity: Entity, value: T) -> Result<(), WorldError> {
        if self.entities.is_disposed(entity) {
            return Err(WorldError::StaleEntity { entity });
        }
        if self.stash.contains(entity.id()) {
            return Err(WorldError::ComponentAlreadyPresent {
                entity,
                component: T::NAME,
            });
        }
        self.set(entity, value)
    }

    /// Remove the value; returns whether one was present.
    pub fn remove(&mut self, entity: Entity) -> bool {
        if self.entities.is_disposed(entity) {
            return false;
        }
        self.remove_id(entity.id()).is_some()
    }

    fn remove_id(&mut self, id: EntityId) -> Option<T> {
        let value = self.stash.take(id)?;
        self.entities.note_removed(id, T::ID);
        Some(value)
    }

    /// Remove this component from every entity that has it.
    pub fn remove_all(&mut self) -> usize {
        let ids: Vec<EntityId> = self.stash.present.iter().map(|id| id as EntityId).collect();
        for &id in &ids {
            self.remove_id(id);
        }
        ids.len()
    }

    /// Move the value from `from` to `to`.
    ///
    /// Returns `Ok(false)` when `from` has no value, or when `to` already
    /// has one and `overwrite` is off.
    pub fn migrate(&mut self, from: Entity, to: Entity, overwrite: bool) -> Result<bool, WorldError> {
        for entity in [from, to] {
            if self.entities.is_disposed(entity) {
                return Err(WorldError::StaleEntity { entity });
            }
        }
        if from == to || !self.stash.contains(from.id()) {
            return Ok(false);
        }
        if self.stash.contains(to.id()) && !overwrite {
            return Ok(false);
        }
        match self.remove_id(from.id()) {
            Some(value) => {
                self.set(to, value)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn has(&self, entity: Entity) -> bool {
        !self.entities.is_disposed(entity) && self.stash.contains(entity.id())
    }

    pub fn get(&self, entity: Entity) -> Option<&T> {
        if self.entities.is_disposed(entity) {
            return None;
        }
        self.stash.values.get(entity.id() as u64)
    }

    pub fn get_mut(&mut self, entity: Entity) -> Option<&mut T> {
        if self.entities.is_disposed(entity) {
            return None;
        }
        self.stash.values.get_mut(entity.id() as u64)
    }

    pub fn len(&self) -> usize {
        self.stash.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stash.values.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = Entity> + '_ {
        self.iter().map(|(entity, _)| entity)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Entity, &T)> + '_ {
        let entities = &*self.entities;
        self.stash
            .values
            .iter()
            .map(move |(id, value)| (entities.get_entity(id as EntityId), value))
    }
}
