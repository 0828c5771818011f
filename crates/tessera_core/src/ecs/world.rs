// world.rs - ECS World: entity lifecycle, stashes, commit and filters

use crate::collections::LongHashMap;
use crate::config::WorldConfig;
use crate::ecs::{
    meta_of, Archetype, ArchetypeHash, ArchetypeIndex, ArchetypeRegistry, Component, ComponentId,
    Entity, EntityId, EntityTable, ErasedStash, Filter, FilterBuilder, FilterIndex, FilterState,
    FilterView, Stash, StashMut, StashRef, WorldError,
};
use crate::ecs::thread_guard::ThreadGuard;
use std::sync::atomic::{AtomicU32, Ordering};
use tessera_metrics::Counter;

static NEXT_WORLD_ID: AtomicU32 = AtomicU32::new(1);

/// Process-unique world identity, carried by filter handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WorldId(u32);

/// A filter slot; `state` is `None` once the filter was removed.
#[derive(Debug)]
struct FilterSlot {
    generation: u32,
    state: Option<FilterState>,
}

/// What a single [`World::commit`] did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CommitStats {
    pub disposed: usize,
    pub migrated: usize,
    pub archetypes_created: usize,
}

/// The main ECS world containing all entities and components.
///
/// Structural changes (component set/remove, entity removal) are recorded
/// immediately but only move entities between archetypes on
/// [`commit`](World::commit). Filters reflect the last commit.
pub struct World {
    id: WorldId,
    config: WorldConfig,
    guard: ThreadGuard,
    entities: EntityTable,
    archetypes: ArchetypeRegistry,
    filters: Vec<FilterSlot>,
    free_filters: Vec<FilterIndex>,
    /// Indexed by component offset.
    stashes: Vec<Option<Box<dyn ErasedStash>>>,
    /// Component id -> offset, for stashes this world has created.
    stash_offsets: LongHashMap<usize>,
    touched: Vec<ArchetypeIndex>,
    epoch: u64,
    counters: Counter,
}

impl World {
    /// Create a new empty world.
    pub fn new() -> Self {
        Self::with_config(WorldConfig::default())
    }

    pub fn with_config(config: WorldConfig) -> Self {
        let id = WorldId(NEXT_WORLD_ID.fetch_add(1, Ordering::Relaxed));
        tracing::debug!(world = id.0, ?config, "creating world");
        Self {
            id,
            guard: ThreadGuard::new(config.thread_safety_checks),
            entities: EntityTable::with_capacity(config.initial_entity_capacity),
            archetypes: ArchetypeRegistry::with_capacity(config.initial_archetype_capacity),
            filters: Vec::new(),
            free_filters: Vec::new(),
            stashes: Vec::new(),
            stash_offsets: LongHashMap::new(),
            touched: Vec::new(),
            epoch: 0,
            counters: Counter::new(),
            config,
        }
    }

    pub fn id(&self) -> WorldId {
        self.id
    }

    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    /// Take ownership on the calling thread after moving the world.
    pub fn bind_to_current_thread(&mut self) {
        self.guard.rebind();
    }

    /// Structural counters accumulated across commits (empty without the
    /// `metrics` feature).
    pub fn counters(&self) -> &Counter {
        &self.counters
    }

    // ------------------------------------------------------------------
    // Entities
    // ------------------------------------------------------------------

    /// Create an entity. It joins the empty archetype on the next commit.
    pub fn create_entity(&mut self) -> Entity {
        self.guard.check();
        self.entities.allocate(None)
    }

    pub fn create_entity_with_label(&mut self, label: impl Into<String>) -> Entity {
        self.guard.check();
        self.entities.allocate(Some(label.into()))
    }

    /// Remove an entity and drop its components.
    ///
    /// The handle is invalid immediately; archetype bookkeeping waits for
    /// the next commit. Removing a stale handle logs an error and does
    /// nothing.
    pub fn remove_entity(&mut self, entity: Entity) {
        self.guard.check();
        if self.entities.is_disposed(entity) {
            tracing::error!(%entity, "remove_entity called on a disposed entity");
            return;
        }

        let id = entity.id();
        let record = self.entities.record_by_id(id);
        let archetype = self.archetypes.get(record.archetype);
        for &component in record.added.iter().chain(archetype.components()) {
            if let Some(stash) = erased_mut(&mut self.stashes, &self.stash_offsets, component) {
                stash.clean(id);
            }
        }
        self.entities.dispose(entity);
    }

    pub fn is_disposed(&self, entity: Entity) -> bool {
        self.guard.check();
        self.entities.is_disposed(entity)
    }

    pub fn is_alive(&self, entity: Entity) -> bool {
        self.guard.check();
        !self.entities.is_disposed(entity)
    }

    /// Current handle for `id`, or [`Entity::NULL`].
    pub fn get_entity(&self, id: EntityId) -> Entity {
        self.guard.check();
        self.entities.get_entity(id)
    }

    pub fn debug_label(&self, entity: Entity) -> Option<&str> {
        self.guard.check();
        self.entities.record(entity)?.debug_label.as_deref()
    }

    pub fn entity_count(&self) -> usize {
        self.guard.check();
        self.entities.len()
    }

    pub fn entity_capacity(&self) -> usize {
        self.guard.check();
        self.entities.capacity()
    }

    pub fn entity_table(&self) -> &EntityTable {
        self.guard.check();
        &self.entities
    }

    // ------------------------------------------------------------------
    // Stashes
    // ------------------------------------------------------------------

    /// Create the stash for `T` ahead of first use.
    pub fn register<T: Component>(&mut self) {
        self.guard.check();
        self.ensure_stash::<T>();
    }

    /// Read-only view of `T`. Empty if nothing ever wrote a `T` here.
    pub fn stash<T: Component>(&self) -> StashRef<'_, T> {
        self.guard.check();
        let stash = self
            .stash_offsets
            .get(T::ID as u64)
            .and_then(|&offset| self.stashes[offset].as_ref())
            .and_then(|stash| stash.as_any().downcast_ref::<Stash<T>>());
        StashRef::new(stash, &self.entities)
    }

    /// Mutable view of `T`, creating the stash on first use.
    pub fn stash_mut<T: Component>(&mut self) -> StashMut<'_, T> {
        self.guard.check();
        let offset = self.ensure_stash::<T>();
        let stash = self.stashes[offset]
            .as_mut()
            .and_then(|stash| stash.as_any_mut().downcast_mut::<Stash<T>>())
            .unwrap_or_else(|| panic!("stash at offset {offset} does not hold {}", T::NAME));
        StashMut::new(stash, &mut self.entities)
    }

    fn ensure_stash<T: Component>(&mut self) -> usize {
        if let Some(&offset) = self.stash_offsets.get(T::ID as u64) {
            return offset;
        }
        let meta = T::ensure_registered();
        let offset = meta.offset;
        if self.stashes.len() <= offset {
            self.stashes.resize_with(offset + 1, || None);
        }
        self.stashes[offset] = Some(Box::new(Stash::<T>::with_capacity(
            meta,
            self.config.initial_stash_capacity,
        )));
        self.stash_offsets.insert(T::ID as u64, offset);
        tracing::debug!(world = self.id.0, component = T::NAME, offset, "created stash");
        offset
    }

    pub fn set<T: Component>(&mut self, entity: Entity, value: T) -> Result<(), WorldError> {
        self.stash_mut::<T>().set(entity, value)
    }

    pub fn get<T: Component>(&self, entity: Entity) -> Option<&T> {
        self.stash::<T>().get(entity)
    }

    pub fn has<T: Component>(&self, entity: Entity) -> bool {
        self.stash::<T>().has(entity)
    }

    pub fn remove<T: Component>(&mut self, entity: Entity) -> bool {
        self.stash_mut::<T>().remove(entity)
    }

    // ------------------------------------------------------------------
    // Commit
    // ------------------------------------------------------------------

    /// Apply every pending structural change.
    ///
    /// Disposed entities leave their archetypes first, then dirty entities
    /// move to the archetype matching their current component set. Filters
    /// pick up archetypes that became non-empty and drop those that emptied.
    pub fn commit(&mut self) -> CommitStats {
        self.guard.check();
        let _span = tracing::trace_span!("commit", world = self.id.0, epoch = self.epoch).entered();
        let mut stats = CommitStats::default();

        for id in self.entities.disposed.drain() {
            let id = id as EntityId;
            let record = self.entities.record_by_id(id);
            if let Some(row) = record.row {
                let archetype = record.archetype;
                self.detach(archetype, row);
            }
            self.entities.release(id);
            stats.disposed += 1;
        }

        for id in self.entities.dirty.drain() {
            if self.migrate(id as EntityId, &mut stats) {
                stats.migrated += 1;
            }
        }

        self.reconcile_filters();
        self.epoch += 1;

        tessera_metrics::metrics! {
            self.counters.increment("commits", 1);
            self.counters.increment("disposed", stats.disposed);
            self.counters.increment("migrated", stats.migrated);
            self.counters.increment("archetypes_created", stats.archetypes_created);
        }

        if stats != CommitStats::default() {
            tracing::debug!(
                disposed = stats.disposed,
                migrated = stats.migrated,
                archetypes_created = stats.archetypes_created,
                "commit"
            );
        }
        stats
    }

    /// Move one dirty entity to its resolved archetype; `false` if it
    /// stayed put.
    fn migrate(&mut self, id: EntityId, stats: &mut CommitStats) -> bool {
        let record = self.entities.record_by_id_mut(id);
        let (current, row) = (record.archetype, record.row);
        let mut added = std::mem::take(&mut record.added);
        let mut removed = std::mem::take(&mut record.removed);

        let current_hash = self.archetypes.get(current).hash();
        let target_hash = added.iter().fold(current_hash, |hash, &c| hash.with_id(c));
        let target_hash = removed.iter().fold(target_hash, |hash, &c| hash.without_id(c));

        let target = match self.archetypes.find(target_hash) {
            Some(index) => {
                debug_assert_eq!(
                    self.archetypes.get(index).components(),
                    resolve_components(self.archetypes.get(current).components(), &added, &removed)
                        .as_slice(),
                    "archetype hash collision at {target_hash}"
                );
                index
            }
            None => {
                let components =
                    resolve_components(self.archetypes.get(current).components(), &added, &removed);
                stats.archetypes_created += 1;
                self.create_archetype(target_hash, components, id)
            }
        };

        // Hand the buffers back so their allocations are reused.
        added.clear();
        removed.clear();
        let record = self.entities.record_by_id_mut(id);
        record.added = added;
        record.removed = removed;

        if row.is_some() && target == current {
            return false;
        }
        if let Some(row) = row {
            self.detach(current, row);
        }
        let new_row = self.archetypes.get_mut(target).push(id);
        let record = self.entities.record_by_id_mut(id);
        record.archetype = target;
        record.row = Some(new_row);
        self.touch(target);

        tracing::trace!(
            entity = id,
            from = %self.archetypes.get(current).hash(),
            to = %target_hash,
            "migrated entity"
        );
        true
    }

    /// Register a new archetype and link it to every filter that accepts
    /// `representative`, the entity about to move in.
    fn create_archetype(
        &mut self,
        hash: ArchetypeHash,
        components: Vec<ComponentId>,
        representative: EntityId,
    ) -> ArchetypeIndex {
        let index = self.archetypes.insert(hash, components);
        let archetype = self.archetypes.get_mut(index);
        for (filter_index, slot) in self.filters.iter_mut().enumerate() {
            let Some(filter) = slot.state.as_mut() else {
                continue;
            };
            if filter.matches_representative(archetype, representative, &self.stashes) {
                archetype.add_filter(filter_index as FilterIndex);
                filter.link(index);
            }
        }
        tracing::debug!(
            %hash,
            components = ?archetype.components(),
            filters = archetype.filters().len(),
            "created archetype"
        );
        index
    }

    fn detach(&mut self, index: ArchetypeIndex, row: usize) {
        if let Some(moved) = self.archetypes.get_mut(index).swap_remove(row) {
            self.entities.record_by_id_mut(moved).row = Some(row);
        }
        self.touch(index);
    }

    fn touch(&mut self, index: ArchetypeIndex) {
        let archetype = self.archetypes.get_mut(index);
        if !archetype.pending {
            archetype.pending = true;
            self.touched.push(index);
        }
    }

    fn reconcile_filters(&mut self) {
        for index in self.touched.drain(..) {
            let archetype = self.archetypes.get_mut(index);
            archetype.pending = false;
            let active = !archetype.is_empty();
            for &filter in archetype.filters() {
                if let Some(state) = self.filters[filter as usize].state.as_mut() {
                    state.set_active(index, active);
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // Filters
    // ------------------------------------------------------------------

    /// Start an empty filter description.
    pub fn filter(&self) -> FilterBuilder {
        FilterBuilder::new()
    }

    /// Register a flattened filter and match it against every existing
    /// archetype by component list.
    pub(crate) fn add_filter(&mut self, mut state: FilterState) -> Filter {
        self.guard.check();
        let index = match self.free_filters.pop() {
            Some(index) => index,
            None => {
                self.filters.push(FilterSlot {
                    generation: 0,
                    state: None,
                });
                (self.filters.len() - 1) as FilterIndex
            }
        };
        for (archetype_index, archetype) in self.archetypes.iter_mut().enumerate() {
            if state.matches_static(archetype) {
                let archetype_index = archetype_index as ArchetypeIndex;
                archetype.add_filter(index);
                state.link(archetype_index);
                if !archetype.is_empty() {
                    state.set_active(archetype_index, true);
                }
            }
        }
        tracing::debug!(
            world = self.id.0,
            filter = index,
            include = ?state.included(),
            exclude = ?state.excluded(),
            matched = state.linked().len(),
            "built filter"
        );
        let slot = &mut self.filters[index as usize];
        slot.state = Some(state);
        Filter {
            world: self.id,
            index,
            generation: slot.generation,
        }
    }

    /// Unlink `filter` from every archetype and free its slot.
    ///
    /// Panics if the handle is stale or belongs to another world.
    pub fn remove_filter(&mut self, filter: Filter) {
        self.check_filter(&filter);
        let slot = &mut self.filters[filter.index as usize];
        let Some(state) = slot.state.take() else {
            return;
        };
        slot.generation = slot.generation.wrapping_add(1);
        for &archetype in state.linked() {
            self.archetypes.get_mut(archetype).remove_filter(filter.index);
        }
        self.free_filters.push(filter.index);
        tracing::debug!(
            world = self.id.0,
            filter = filter.index,
            unlinked = state.linked().len(),
            "removed filter"
        );
    }

    pub fn query(&self, filter: &Filter) -> FilterView<'_> {
        self.check_filter(filter);
        FilterView::new(
            self.filter_state(filter),
            self.archetypes.as_slice(),
            &self.entities,
        )
    }

    #[track_caller]
    pub(crate) fn check_filter(&self, filter: &Filter) {
        self.guard.check();
        assert_eq!(filter.world, self.id, "filter belongs to a different world");
        let slot = &self.filters[filter.index as usize];
        assert!(
            slot.generation == filter.generation && slot.state.is_some(),
            "filter {} was removed",
            filter.index
        );
    }

    pub(crate) fn filter_state(&self, filter: &Filter) -> &FilterState {
        self.filters[filter.index as usize]
            .state
            .as_ref()
            .unwrap_or_else(|| panic!("filter {} was removed", filter.index))
    }

    pub(crate) fn epoch(&self) -> u64 {
        self.epoch
    }

    pub(crate) fn archetype_slice(&self) -> &[Archetype] {
        self.archetypes.as_slice()
    }

    // ------------------------------------------------------------------
    // Introspection
    // ------------------------------------------------------------------

    /// Committed archetype of `entity`; [`ArchetypeHash::EMPTY`] for stale
    /// or not yet placed handles.
    pub fn archetype_of(&self, entity: Entity) -> ArchetypeHash {
        self.guard.check();
        self.entities
            .record(entity)
            .map_or(ArchetypeHash::EMPTY, |record| self.archetypes.get(record.archetype).hash())
    }

    pub fn archetype(&self, hash: ArchetypeHash) -> Option<&Archetype> {
        self.guard.check();
        self.archetypes.by_hash(hash)
    }

    pub fn archetype_len(&self, hash: ArchetypeHash) -> usize {
        self.archetype(hash).map_or(0, Archetype::len)
    }

    pub fn archetypes(&self) -> std::slice::Iter<'_, Archetype> {
        self.guard.check();
        self.archetypes.iter()
    }

    pub fn archetypes_len(&self) -> usize {
        self.guard.check();
        self.archetypes.len()
    }

    /// Registered names of the archetype's components.
    pub fn component_names(&self, hash: ArchetypeHash) -> Vec<String> {
        self.archetype(hash)
            .map(|archetype| {
                archetype
                    .components()
                    .iter()
                    .map(|&id| meta_of(id).map_or_else(|| format!("#{id}"), |meta| meta.name))
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

fn erased_mut<'a>(
    stashes: &'a mut [Option<Box<dyn ErasedStash>>],
    offsets: &LongHashMap<usize>,
    component: ComponentId,
) -> Option<&'a mut dyn ErasedStash> {
    let &offset = offsets.get(component as u64)?;
    stashes.get_mut(offset)?.as_deref_mut()
}

/// `current ∪ added \ removed`, sorted.
fn resolve_components(
    current: &[ComponentId],
    added: &[ComponentId],
    removed: &[ComponentId],
) -> Vec<ComponentId> {
    let mut components: Vec<ComponentId> = current
        .iter()
        .copied()
        .filter(|id| !removed.contains(id))
        .chain(added.iter().copied())
        .collect();
    components.sort_unstable();
    components.dedup();
    components
}
