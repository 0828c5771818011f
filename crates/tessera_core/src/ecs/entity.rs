//! Entity handle with generational id
//!
//! Entities are 8-byte handles. The generation counter is bumped every time
//! an id is freed, so handles to a freed id stop resolving.

use serde::{Deserialize, Serialize};
use std::fmt;

pub type EntityId = u32;

/// Entity handle (generation-checked)
///
/// Format: [32-bit id | 32-bit generation]
/// - Id: slot in the entity table, `0` is reserved for [`Entity::NULL`]
/// - Generation: incremented on removal
///
/// Example:
/// ```ignore
/// let entity = world.create_entity();
/// world.remove_entity(entity);
/// assert!(world.is_disposed(entity));
/// ```
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Entity {
    id: EntityId,
    generation: u32,
}

impl Entity {
    pub const NULL: Entity = Entity { id: 0, generation: 0 };

    pub(crate) const fn new(id: EntityId, generation: u32) -> Self {
        Self { id, generation }
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }

    pub fn is_null(&self) -> bool {
        self.id == 0
    }

    /// Serialize to 64-bit integer (for save files)
    pub fn to_bits(&self) -> u64 {
        ((self.generation as u64) << 32) | (self.id as u64)
    }

    /// Deserialize from 64-bit integer
    pub fn from_bits(bits: u64) -> Self {
        Self {
            id: bits as u32,
            generation: (bits >> 32) as u32,
        }
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.id, self.generation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bits_round_trip() {
        let entity = Entity::new(7, 3);
        assert_eq!(entity.to_bits(), (3u64 << 32) | 7);
        assert_eq!(Entity::from_bits(entity.to_bits()), entity);
    }

    #[test]
    fn test_null_is_default() {
        assert_eq!(Entity::default(), Entity::NULL);
        assert!(Entity::NULL.is_null());
        assert!(!Entity::new(1, 0).is_null());
    }

    #[test]
    fn test_equality_needs_both_halves() {
        assert_ne!(Entity::new(1, 0), Entity::new(1, 1));
        assert_ne!(Entity::new(1, 0), Entity::new(2, 0));
        assert_eq!(Entity::new(4, 2).to_string(), "4:2");
    }

    #[test]
    fn test_serde_json_shape() {
        let json = serde_json::to_string(&Entity::new(5, 1)).unwrap();
        assert_eq!(json, r#"{"id":5,"generation":1}"#);
        let back: Entity = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Entity::new(5, 1));
    }
}
