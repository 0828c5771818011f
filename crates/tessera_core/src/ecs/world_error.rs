use crate::ecs::Entity;
use thiserror::Error;

/// Recoverable errors returned by world and stash operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorldError {
    #[error("entity {entity} is disposed or was never created")]
    StaleEntity { entity: Entity },

    #[error("entity {entity} already has component '{component}'")]
    ComponentAlreadyPresent {
        entity: Entity,
        component: &'static str,
    },

    #[error("filter matched no entities")]
    EmptySequence,

    #[error("index {index} is out of range for a filter of {len} entities")]
    IndexOutOfRange { index: usize, len: usize },
}
