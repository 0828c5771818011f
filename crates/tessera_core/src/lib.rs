//! Tessera Core
//!
//! Archetype-based entity/component storage:
//! - Entities with generation-checked handles
//! - Per-type component stashes
//! - Archetypes with deferred migration on commit
//! - Filters matched per archetype

pub mod collections;
pub mod config;
pub mod ecs;

pub use config::{ConfigError, WorldConfig};

/// Engine version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
