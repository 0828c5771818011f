//! Tessera Runtime
//!
//! Host loop that drives the storage engine: spawn, mutate, commit, query

mod settings;

use anyhow::Result;
use settings::RuntimeSettings;
use std::collections::VecDeque;
use std::path::PathBuf;
use tessera_core::define_component;
use tessera_core::ecs::{Entity, Filter, World};
use tessera_metrics::PhaseTimer;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy)]
struct Position {
    x: f32,
    y: f32,
}

#[derive(Debug, Clone, Copy)]
struct Velocity {
    x: f32,
    y: f32,
}

#[derive(Debug, Clone, Copy)]
struct Frozen;

define_component!(Position, 1);
define_component!(Velocity, 2);
define_component!(Frozen, 3);

struct Sim {
    world: World,
    moving: Filter,
    frozen: Filter,
    spawned: VecDeque<Entity>,
    frame: u32,
}

impl Sim {
    fn new(settings: &RuntimeSettings) -> Self {
        let mut world = World::with_config(settings.world.clone());
        world.register::<Position>();
        world.register::<Velocity>();
        let moving = world
            .filter()
            .with::<Position>()
            .with::<Velocity>()
            .without::<Frozen>()
            .build(&mut world);
        let frozen = world.filter().with::<Frozen>().build(&mut world);
        Self {
            world,
            moving,
            frozen,
            spawned: VecDeque::new(),
            frame: 0,
        }
    }

    fn spawn(&mut self, settings: &RuntimeSettings) -> Result<()> {
        for i in 0..settings.spawn_per_frame {
            let entity = self.world.create_entity();
            self.world.set(entity, Position { x: 0.0, y: i as f32 })?;
            if i % 3 != 0 {
                self.world.set(entity, Velocity { x: 1.0, y: 0.5 })?;
            }
            self.spawned.push_back(entity);
        }
        if settings.despawn_every > 0 && self.frame % settings.despawn_every == 0 {
            if let Some(oldest) = self.spawned.pop_front() {
                self.world.remove_entity(oldest);
            }
        }
        Ok(())
    }

    fn update(&mut self) -> Result<()> {
        let mut cursor = self.moving.cursor(&self.world);
        let mut parked = 0usize;
        while let Some(entity) = cursor.next(&self.world) {
            let Some(velocity) = self.world.get::<Velocity>(entity).copied() else {
                continue;
            };
            let mut positions = self.world.stash_mut::<Position>();
            let Some(position) = positions.get_mut(entity) else {
                continue;
            };
            position.x += velocity.x;
            position.y += velocity.y;
            // Park entities that ran far enough; the next commit moves them.
            if position.x > 50.0 {
                self.world.set(entity, Frozen)?;
                parked += 1;
            }
        }
        tracing::trace!(frame = self.frame, parked, "update");
        Ok(())
    }
}

fn main() -> Result<()> {
    // Initialize logging (RUST_LOG overrides the default)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    tracing::info!("Tessera v{}", tessera_core::VERSION);
    let path = std::env::args_os().nth(1).map(PathBuf::from);
    let settings = RuntimeSettings::load(path.as_deref())?;
    tracing::info!(?settings, "loaded settings");

    let mut sim = Sim::new(&settings);
    let mut phases = PhaseTimer::new(120);

    for frame in 0..settings.frames {
        sim.frame = frame;
        phases.time("spawn", || sim.spawn(&settings))?;
        phases.time("update", || sim.update())?;
        let stats = phases.time("commit", || sim.world.commit());
        tracing::debug!(
            frame,
            disposed = stats.disposed,
            migrated = stats.migrated,
            archetypes_created = stats.archetypes_created,
            "frame committed"
        );
    }

    let moving = sim.world.query(&sim.moving).len_slow();
    let frozen = sim.world.query(&sim.frozen).len_slow();
    tracing::info!(
        entities = sim.world.entity_count(),
        archetypes = sim.world.archetypes_len(),
        moving,
        frozen,
        "simulation finished"
    );
    for phase in phases.phases() {
        let (min, max) = phases.range_ms(phase);
        tracing::info!(
            phase,
            avg_ms = phases.average_ms(phase),
            min_ms = min,
            max_ms = max,
            "phase timing"
        );
    }
    for (name, value) in sim.world.counters().iter() {
        tracing::info!(counter = name, value, "structural counter");
    }
    for archetype in sim.world.archetypes() {
        tracing::debug!(
            hash = %archetype.hash(),
            len = archetype.len(),
            components = ?sim.world.component_names(archetype.hash()),
            "archetype"
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frames_spawn_park_and_despawn() {
        let settings = RuntimeSettings {
            frames: 60,
            spawn_per_frame: 6,
            despawn_every: 3,
            ..RuntimeSettings::default()
        };
        let mut sim = Sim::new(&settings);
        for frame in 0..settings.frames {
            sim.frame = frame;
            sim.spawn(&settings).unwrap();
            sim.update().unwrap();
            sim.world.commit();
        }

        assert_eq!(sim.world.entity_count(), 60 * 6 - 20);
        assert!(sim.world.query(&sim.frozen).len_slow() > 0);
        assert!(sim.world.query(&sim.moving).is_not_empty());
    }
}
