//! Error types for the bridge

use live_model::{EntityId, ModelError};
use osc_codec::CodecError;
use osc_transport::TransportError;
use thiserror::Error;

use crate::config::ConfigError;
use crate::logging::LoggingError;
use crate::subscription::BucketKind;

/// Failure inside one address handler
///
/// Logged together with the address; never stops the remaining handlers or
/// datagrams.
#[derive(Error, Debug)]
pub enum HandlerError {
    /// Argument count matches none of the forms the address accepts
    #[error("expected {expected} argument(s), got {got}")]
    Arity { expected: &'static str, got: usize },

    #[error("argument {index} should be {expected}, got {got}")]
    ArgumentType {
        index: usize,
        expected: &'static str,
        got: &'static str,
    },

    #[error("{what} {index} out of range ({len} available)")]
    IndexOutOfRange {
        what: &'static str,
        index: i64,
        len: usize,
    },

    /// The addressed clip slot holds no clip
    #[error("no clip in track {track} slot {slot}")]
    EmptySlot { track: usize, slot: usize },

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Codec(#[from] CodecError),
}

/// Failure processing one inbound datagram
#[derive(Error, Debug)]
pub enum DispatchError {
    /// The datagram is not valid OSC; nothing in it was dispatched
    #[error("malformed datagram: {0}")]
    Decode(#[from] CodecError),

    #[error("handler for {address} failed: {source}")]
    Handler {
        address: String,
        #[source]
        source: HandlerError,
    },
}

/// Listener registration failure; counted, never aborts a rebuild
#[derive(Error, Debug)]
pub enum SubscriptionError {
    #[error("failed to attach {kind:?} listener to {entity}: {source}")]
    Attach {
        kind: BucketKind,
        entity: EntityId,
        #[source]
        source: ModelError,
    },

    #[error("failed to detach {kind:?} listener from {entity}: {source}")]
    Detach {
        kind: BucketKind,
        entity: EntityId,
        #[source]
        source: ModelError,
    },

    #[error("no bucket registered for {0:?}")]
    UnknownBucket(BucketKind),
}

/// Top-level bridge errors
#[derive(Error, Debug)]
pub enum BridgeError {
    /// Socket setup failed; fatal at start
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("logging error: {0}")]
    Logging(#[from] LoggingError),

    /// Operation on a bridge that has already shut down
    #[error("bridge has been shut down")]
    ShutDown,
}

/// Result type for bridge operations
pub type Result<T> = std::result::Result<T, BridgeError>;
