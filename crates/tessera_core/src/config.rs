//! World configuration

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Initial sizing and runtime checks for a [`World`](crate::ecs::World).
///
/// Every field has a default, so a JSON document only needs the keys it
/// wants to override.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Entity slots allocated up front; the table doubles past this.
    pub initial_entity_capacity: usize,
    /// Slots per component stash when it is first created.
    pub initial_stash_capacity: usize,
    /// Expected number of distinct archetypes.
    pub initial_archetype_capacity: usize,
    /// Panic when the world is touched from a thread other than its owner.
    pub thread_safety_checks: bool,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            initial_entity_capacity: 256,
            initial_stash_capacity: 64,
            initial_archetype_capacity: 32,
            thread_safety_checks: cfg!(debug_assertions),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid world config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("initial_entity_capacity {0} exceeds the entity id range")]
    EntityCapacity(usize),
}

impl WorldConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.initial_entity_capacity > u32::MAX as usize {
            return Err(ConfigError::EntityCapacity(self.initial_entity_capacity));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = WorldConfig::from_json_str(r#"{ "initial_entity_capacity": 8 }"#).unwrap();
        assert_eq!(config.initial_entity_capacity, 8);
        assert_eq!(config.initial_stash_capacity, WorldConfig::default().initial_stash_capacity);
    }

    #[test]
    fn test_rejects_malformed_json() {
        let err = WorldConfig::from_json_str("{ nope").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_rejects_oversized_entity_capacity() {
        let config = WorldConfig {
            initial_entity_capacity: u32::MAX as usize + 1,
            ..WorldConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::EntityCapacity(_))));
    }
}
