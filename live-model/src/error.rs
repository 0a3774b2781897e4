//! Error types for object-graph access

use thiserror::Error;

use crate::entity::{EntityId, Event};

/// Errors reported by an object-graph provider
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    /// The entity has no event source for this event in its current state
    /// (e.g. arm on a track that cannot be armed)
    #[error("{entity} does not support {event:?} listeners")]
    Unsupported { entity: EntityId, event: Event },

    /// The entity was removed from the graph and can no longer be used
    #[error("{0} is no longer part of the object graph")]
    StaleEntity(EntityId),

    /// The exact listener was already attached
    #[error("Listener already connected to {event:?} on {entity}")]
    AlreadyConnected { entity: EntityId, event: Event },

    /// Asked to remove a listener that is not attached
    #[error("Listener not connected to {event:?} on {entity}")]
    ListenerNotFound { entity: EntityId, event: Event },

    /// Positional lookup past the end of a collection
    #[error("{what} index {index} out of range ({len} available)")]
    IndexOutOfRange {
        what: &'static str,
        index: usize,
        len: usize,
    },

    /// Value rejected by a setter
    #[error("Invalid value: {0}")]
    InvalidValue(String),
}

/// Result type for object-graph operations
pub type Result<T> = std::result::Result<T, ModelError>;
