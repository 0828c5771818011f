//! Entity Component System core types.
//!
//! Entities are generation-checked ids. Component values live in per-type
//! stashes; entities sharing an exact component set are grouped into an
//! archetype. Structural changes are deferred until [`World::commit`],
//! which migrates entities and keeps every filter's archetype list current.

mod archetype;
mod component;
mod entity;
mod entity_table;
mod filter;
mod stash;
mod thread_guard;
mod world;
mod world_error;

pub use archetype::{Archetype, ArchetypeHash, ArchetypeIndex, ArchetypeRegistry, FilterIndex};
pub use component::{meta_of, register_component, Component, ComponentId, ComponentMeta};
pub use entity::{Entity, EntityId};
pub use entity_table::{EntityRecord, EntityTable};
pub use filter::{Filter, FilterBuilder, FilterCursor, FilterExtension, FilterIter, FilterMode, FilterState, FilterView};
pub use stash::{ErasedStash, Stash, StashMut, StashRef};
pub use world::{CommitStats, World, WorldId};
pub use world_error::WorldError;
