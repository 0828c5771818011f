//! Archetypes: the set of entities sharing one exact component set

use super::component::{Component, ComponentId};
use super::entity::EntityId;
use crate::collections::LongHashMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Index of an archetype in its world's registry. Index 0 is the empty
/// archetype.
pub type ArchetypeIndex = u32;

/// Index of a filter in its world's filter arena.
pub type FilterIndex = u32;

/// Order-independent hash of a component set.
///
/// Each component id contributes one well-mixed 64-bit value and a set
/// hashes to the XOR of its members, so adding and removing the same id
/// cancel out and the empty set hashes to zero.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ArchetypeHash(pub u64);

impl ArchetypeHash {
    pub const EMPTY: ArchetypeHash = ArchetypeHash(0);

    #[inline]
    pub const fn with_id(self, id: ComponentId) -> Self {
        Self(self.0 ^ mix(id))
    }

    /// Same fold as [`with_id`](Self::with_id); kept separate for intent.
    #[inline]
    pub const fn without_id(self, id: ComponentId) -> Self {
        Self(self.0 ^ mix(id))
    }

    #[inline]
    pub const fn with<T: Component>(self) -> Self {
        self.with_id(T::ID)
    }

    #[inline]
    pub const fn without<T: Component>(self) -> Self {
        self.without_id(T::ID)
    }

    pub fn from_components(ids: &[ComponentId]) -> Self {
        ids.iter().fold(Self::EMPTY, |hash, &id| hash.with_id(id))
    }

    pub const fn value(self) -> u64 {
        self.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for ArchetypeHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// 64-bit avalanche finalizer; the offset keeps id 0 from mapping to 0.
#[inline]
const fn mix(id: ComponentId) -> u64 {
    let mut z = (id as u64).wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Entities whose committed component set equals `components`.
#[derive(Debug)]
pub struct Archetype {
    hash: ArchetypeHash,
    components: Vec<ComponentId>,
    entities: Vec<EntityId>,
    filters: Vec<FilterIndex>,
    /// Touched during the current commit.
    pub(crate) pending: bool,
}

impl Archetype {
    /// `components` must be sorted and deduplicated.
    pub(crate) fn new(hash: ArchetypeHash, components: Vec<ComponentId>) -> Self {
        debug_assert!(components.windows(2).all(|w| w[0] < w[1]));
        debug_assert_eq!(hash, ArchetypeHash::from_components(&components));
        Self {
            hash,
            components,
            entities: Vec::new(),
            filters: Vec::new(),
            pending: false,
        }
    }

    pub fn hash(&self) -> ArchetypeHash {
        self.hash
    }

    /// Sorted component ids.
    pub fn components(&self) -> &[ComponentId] {
        &self.components
    }

    pub fn contains(&self, id: ComponentId) -> bool {
        self.components.binary_search(&id).is_ok()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Dense entity ids; a row is an index into this slice.
    pub fn entities(&self) -> &[EntityId] {
        &self.entities
    }

    /// Filters this archetype satisfies.
    pub fn filters(&self) -> &[FilterIndex] {
        &self.filters
    }

    /// Append and return the new row.
    pub(crate) fn push(&mut self, id: EntityId) -> usize {
        self.entities.push(id);
        self.entities.len() - 1
    }

    /// Swap-remove `row`, returning the id moved into it (if any).
    pub(crate) fn swap_remove(&mut self, row: usize) -> Option<EntityId> {
        self.entities.swap_remove(row);
        self.entities.get(row).copied()
    }

    pub(crate) fn add_filter(&mut self, filter: FilterIndex) {
        self.filters.push(filter);
    }

    pub(crate) fn remove_filter(&mut self, filter: FilterIndex) {
        self.filters.retain(|&linked| linked != filter);
    }
}

/// Arena of archetypes keyed by hash.
#[derive(Debug)]
pub struct ArchetypeRegistry {
    archetypes: Vec<Archetype>,
    by_hash: LongHashMap<ArchetypeIndex>,
}

impl ArchetypeRegistry {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        let mut registry = Self {
            archetypes: Vec::with_capacity(capacity),
            by_hash: LongHashMap::with_capacity(capacity),
        };
        registry.insert(ArchetypeHash::EMPTY, Vec::new());
        registry
    }

    pub fn find(&self, hash: ArchetypeHash) -> Option<ArchetypeIndex> {
        self.by_hash.get(hash.0).copied()
    }

    pub(crate) fn insert(&mut self, hash: ArchetypeHash, components: Vec<ComponentId>) -> ArchetypeIndex {
        let index = self.archetypes.len() as ArchetypeIndex;
        self.archetypes.push(Archetype::new(hash, components));
        self.by_hash.insert(hash.0, index);
        index
    }

    #[inline]
    pub fn get(&self, index: ArchetypeIndex) -> &Archetype {
        &self.archetypes[index as usize]
    }

    #[inline]
    pub(crate) fn get_mut(&mut self, index: ArchetypeIndex) -> &mut Archetype {
        &mut self.archetypes[index as usize]
    }

    pub fn by_hash(&self, hash: ArchetypeHash) -> Option<&Archetype> {
        self.find(hash).map(|index| self.get(index))
    }

    pub fn len(&self) -> usize {
        self.archetypes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.archetypes.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Archetype> {
        self.archetypes.iter()
    }

    pub(crate) fn iter_mut(&mut self) -> std::slice::IterMut<'_, Archetype> {
        self.archetypes.iter_mut()
    }

    pub(crate) fn as_slice(&self) -> &[Archetype] {
        &self.archetypes
    }
}
