//! Filters: include/exclude predicates matched per archetype
//!
//! A [`FilterBuilder`] is an immutable chain of nodes, so builders can be
//! cloned and extended without copying their prefix. Building registers a
//! [`FilterState`] with the world and returns a lightweight [`Filter`]
//! handle. Matching is decided once per archetype: when the filter is built
//! (against every existing archetype) and when commit creates a new one.
//! Each state keeps the list of matching archetypes that currently have
//! entities, which is all iteration has to walk.

use super::archetype::{Archetype, ArchetypeHash, ArchetypeIndex, FilterIndex};
use super::component::{Component, ComponentId, ComponentMeta};
use super::entity::{Entity, EntityId};
use super::entity_table::EntityTable;
use super::stash::ErasedStash;
use super::world::{World, WorldId};
use super::world_error::WorldError;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterMode {
    Include,
    Exclude,
}

#[derive(Debug)]
struct FilterNode {
    mode: FilterMode,
    type_id: ComponentId,
    offset: usize,
    level: u32,
    parent: Option<Arc<FilterNode>>,
}

/// Declarative filter description; nothing is evaluated until
/// [`build`](FilterBuilder::build).
///
/// ```ignore
/// let moving = world.filter().with::<Position>().with::<Velocity>();
/// let visible = moving.without::<Hidden>().build(&mut world);
/// let all_moving = moving.build(&mut world);
/// ```
#[derive(Debug, Clone, Default)]
pub struct FilterBuilder {
    head: Option<Arc<FilterNode>>,
}

impl FilterBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with<T: Component>(&self) -> Self {
        self.push(FilterMode::Include, T::ensure_registered())
    }

    pub fn without<T: Component>(&self) -> Self {
        self.push(FilterMode::Exclude, T::ensure_registered())
    }

    fn push(&self, mode: FilterMode, meta: ComponentMeta) -> Self {
        Self {
            head: Some(Arc::new(FilterNode {
                mode,
                type_id: meta.id,
                offset: meta.offset,
                level: self.level() + 1,
                parent: self.head.clone(),
            })),
        }
    }

    /// Number of clauses in the chain.
    pub fn level(&self) -> u32 {
        self.head.as_ref().map_or(0, |node| node.level)
    }

    fn nodes(&self) -> impl Iterator<Item = &FilterNode> {
        std::iter::successors(self.head.as_deref(), |node| node.parent.as_deref())
    }

    /// Apply a reusable set of clauses.
    pub fn extend<E: FilterExtension>(&self, extension: &E) -> Self {
        extension.extend(self.clone())
    }

    pub fn build(&self, world: &mut World) -> Filter {
        world.add_filter(self.flatten())
    }

    pub(crate) fn flatten(&self) -> FilterState {
        let mut includes = Vec::new();
        let mut excludes = Vec::new();
        for node in self.nodes() {
            let clause = (node.offset, node.type_id);
            match node.mode {
                FilterMode::Include => includes.push(clause),
                FilterMode::Exclude => excludes.push(clause),
            }
        }
        for clauses in [&mut includes, &mut excludes] {
            clauses.sort_unstable();
            clauses.dedup();
        }
        FilterState {
            include_offsets: includes.iter().map(|&(offset, _)| offset).collect(),
            include_ids: includes.iter().map(|&(_, id)| id).collect(),
            exclude_offsets: excludes.iter().map(|&(offset, _)| offset).collect(),
            exclude_ids: excludes.iter().map(|&(_, id)| id).collect(),
            linked: Vec::new(),
            archetypes: Vec::new(),
        }
    }
}

/// Named group of clauses shared between filters.
///
/// ```ignore
/// struct Visible;
/// impl FilterExtension for Visible {
///     fn extend(&self, builder: FilterBuilder) -> FilterBuilder {
///         builder.with::<Sprite>().without::<Hidden>()
///     }
/// }
/// let filter = world.filter().with::<Position>().extend(&Visible).build(&mut world);
/// ```
pub trait FilterExtension {
    fn extend(&self, builder: FilterBuilder) -> FilterBuilder;
}

/// A built filter's state, owned by its world.
#[derive(Debug)]
pub struct FilterState {
    include_offsets: Vec<usize>,
    include_ids: Vec<ComponentId>,
    exclude_offsets: Vec<usize>,
    exclude_ids: Vec<ComponentId>,
    /// Every archetype holding a backlink to this filter.
    linked: Vec<ArchetypeIndex>,
    /// Matching archetypes that are currently non-empty.
    archetypes: Vec<ArchetypeIndex>,
}

impl FilterState {
    /// Match on the archetype's component list alone.
    pub(crate) fn matches_static(&self, archetype: &Archetype) -> bool {
        self.include_ids.iter().all(|&id| archetype.contains(id))
            && !self.exclude_ids.iter().any(|&id| archetype.contains(id))
    }

    /// Match a newly created archetype through the entity that is about to
    /// enter it, consulting the live stashes.
    pub(crate) fn matches_representative(
        &self,
        archetype: &Archetype,
        entity: EntityId,
        stashes: &[Option<Box<dyn ErasedStash>>],
    ) -> bool {
        let stash_has = |offset: usize| {
            stashes
                .get(offset)
                .and_then(Option::as_ref)
                .is_some_and(|stash| stash.has(entity))
        };
        if !self.include_offsets.iter().all(|&offset| stash_has(offset)) {
            return false;
        }
        self.exclude_ids
            .iter()
            .zip(&self.exclude_offsets)
            .all(|(&id, &offset)| !archetype.contains(id) && !stash_has(offset))
    }

    pub(crate) fn set_active(&mut self, archetype: ArchetypeIndex, active: bool) {
        let position = self.archetypes.iter().position(|&index| index == archetype);
        match (position, active) {
            (None, true) => self.archetypes.push(archetype),
            (Some(position), false) => {
                self.archetypes.swap_remove(position);
            }
            _ => {}
        }
    }

    pub(crate) fn active(&self) -> &[ArchetypeIndex] {
        &self.archetypes
    }

    pub(crate) fn link(&mut self, archetype: ArchetypeIndex) {
        self.linked.push(archetype);
    }

    pub(crate) fn linked(&self) -> &[ArchetypeIndex] {
        &self.linked
    }

    pub fn included_offsets(&self) -> &[usize] {
        &self.include_offsets
    }

    pub fn included(&self) -> &[ComponentId] {
        &self.include_ids
    }

    pub fn excluded(&self) -> &[ComponentId] {
        &self.exclude_ids
    }
}

/// Handle to a filter registered with a [`World`].
///
/// The handle goes stale once passed to
/// [`World::remove_filter`](crate::ecs::World::remove_filter); using it
/// afterwards panics, even if the slot was reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Filter {
    pub(crate) world: WorldId,
    pub(crate) index: FilterIndex,
    pub(crate) generation: u32,
}

impl Filter {
    /// Detached iterator that does not borrow the world between steps.
    pub fn cursor(&self, world: &World) -> FilterCursor {
        world.check_filter(self);
        FilterCursor {
            filter: *self,
            epoch: world.epoch(),
            position: 0,
            row: None,
        }
    }
}

/// Borrowing view over a filter's current matches.
pub struct FilterView<'w> {
    state: &'w FilterState,
    archetypes: &'w [Archetype],
    entities: &'w EntityTable,
}

impl<'w> FilterView<'w> {
    pub(crate) fn new(state: &'w FilterState, archetypes: &'w [Archetype], entities: &'w EntityTable) -> Self {
        Self {
            state,
            archetypes,
            entities,
        }
    }

    /// Entities of every matching archetype; each archetype is walked from
    /// its last row to its first.
    pub fn iter(&self) -> FilterIter<'w> {
        FilterIter {
            active: self.state.archetypes.iter(),
            archetypes: self.archetypes,
            entities: self.entities,
            current: &[],
            remaining: 0,
        }
    }

    /// Committed entity count over all matching archetypes.
    pub fn len_slow(&self) -> usize {
        self.state
            .archetypes
            .iter()
            .map(|&index| self.archetypes[index as usize].len())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.state.archetypes.is_empty()
    }

    pub fn is_not_empty(&self) -> bool {
        !self.is_empty()
    }

    /// Matching archetypes that currently hold entities.
    pub fn archetypes_len(&self) -> usize {
        self.state.archetypes.len()
    }

    pub fn first(&self) -> Result<Entity, WorldError> {
        self.iter().next().ok_or(WorldError::EmptySequence)
    }

    pub fn first_or_default(&self) -> Entity {
        self.iter().next().unwrap_or_default()
    }

    /// The `index`-th entity in iteration order.
    pub fn get_entity(&self, index: usize) -> Result<Entity, WorldError> {
        self.iter().nth(index).ok_or_else(|| WorldError::IndexOutOfRange {
            index,
            len: self.iter().count(),
        })
    }

    pub fn included_offsets(&self) -> &'w [usize] {
        &self.state.include_offsets
    }

    pub fn archetype_hashes(&self) -> Vec<ArchetypeHash> {
        self.state
            .archetypes
            .iter()
            .map(|&index| self.archetypes[index as usize].hash())
            .collect()
    }
}

impl<'w> IntoIterator for &FilterView<'w> {
    type Item = Entity;
    type IntoIter = FilterIter<'w>;

    fn into_iter(self) -> FilterIter<'w> {
        self.iter()
    }
}

pub struct FilterIter<'w> {
    active: std::slice::Iter<'w, ArchetypeIndex>,
    archetypes: &'w [Archetype],
    entities: &'w EntityTable,
    current: &'w [EntityId],
    remaining: usize,
}

impl Iterator for FilterIter<'_> {
    type Item = Entity;

    fn next(&mut self) -> Option<Entity> {
        loop {
            if self.remaining > 0 {
                self.remaining -= 1;
                let entity = self.entities.get_entity(self.current[self.remaining]);
                // Disposed since the last commit.
                if entity.is_null() {
                    continue;
                }
                return Some(entity);
            }
            let &index = self.active.next()?;
            self.current = self.archetypes[index as usize].entities();
            self.remaining = self.current.len();
        }
    }
}

/// Iteration state that lives outside the world borrow, so the caller may
/// remove entities or edit stashes between steps.
///
/// Changes only become structural at commit, so the walk stays valid until
/// then. Stepping a cursor after a commit panics.
#[derive(Debug, Clone)]
pub struct FilterCursor {
    filter: Filter,
    epoch: u64,
    position: usize,
    row: Option<usize>,
}

impl FilterCursor {
    pub fn next(&mut self, world: &World) -> Option<Entity> {
        world.check_filter(&self.filter);
        assert_eq!(
            self.epoch,
            world.epoch(),
            "world committed while a filter cursor was being stepped"
        );
        let state = world.filter_state(&self.filter);
        let archetypes = world.archetype_slice();
        loop {
            let &index = state.active().get(self.position)?;
            let entities = archetypes[index as usize].entities();
            let row = *self.row.get_or_insert(entities.len());
            if row == 0 {
                self.position += 1;
                self.row = None;
                continue;
            }
            self.row = Some(row - 1);
            let entity = world.get_entity(entities[row - 1]);
            if !entity.is_null() {
                return Some(entity);
            }
        }
    }
}
