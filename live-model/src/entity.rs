//! Entity identity, events and the listener capability
//!
//! Every node in the object graph is identified by an [`EntityId`] that is
//! unique for the lifetime of the node. Two clips with identical contents in
//! different slots have different ids; a removed track's id is never reused.

use std::fmt;
use std::rc::Rc;

use crate::error::Result;

/// Identity of an object-graph node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(u64);

impl EntityId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "entity-{}", self.0)
    }
}

/// Attribute-change (or structure-change) events an entity may emit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Event {
    // Song
    Tempo,
    IsPlaying,
    Overdub,
    CurrentSongTime,
    SelectedScene,
    SelectedTrack,
    /// Track list changed (structural)
    Tracks,

    // Track
    Name,
    Arm,
    Solo,
    Mute,
    /// Device chain changed (structural)
    Devices,
    SelectedDevice,
    OutputMeterLeft,
    OutputMeterRight,

    // Clip slot
    /// Clip added to or removed from the slot (structural)
    HasClip,

    // Clip
    PlayingStatus,
    PlayingPosition,
    Color,

    // Device
    /// Parameter list changed (structural)
    Parameters,

    // Parameter
    Value,
}

impl Event {
    /// Events that change the shape of the graph rather than a value
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            Event::Tracks | Event::Devices | Event::HasClip | Event::Parameters
        )
    }
}

/// A native listener callback
///
/// Listeners are compared by identity: two `Listener`s are equal only if they
/// are clones of the same allocation, exactly like the host compares bound
/// callbacks.
#[derive(Clone)]
pub struct Listener(Rc<dyn Fn()>);

impl Listener {
    pub fn new(callback: impl Fn() + 'static) -> Self {
        Self(Rc::new(callback))
    }

    /// Invoke the callback
    pub fn call(&self) {
        (self.0)()
    }
}

impl PartialEq for Listener {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for Listener {}

impl fmt::Debug for Listener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Listener({:p})", Rc::as_ptr(&self.0))
    }
}

/// A node in the object graph
pub trait Entity {
    /// Stable identity for the lifetime of the node
    fn entity_id(&self) -> EntityId;

    /// False once the node has been removed from the host's graph
    fn is_alive(&self) -> bool {
        true
    }
}

/// Per-attribute native event source
///
/// Mirrors the host API: `add_listener`, `remove_listener` and
/// `has_listener`, all keyed by listener identity.
pub trait Observable: Entity {
    /// Attach `listener` to `event`
    fn add_listener(&self, event: Event, listener: &Listener) -> Result<()>;

    /// Detach `listener` from `event`
    fn remove_listener(&self, event: Event, listener: &Listener) -> Result<()>;

    /// Whether exactly this listener is attached to `event`
    fn has_listener(&self, event: Event, listener: &Listener) -> bool;
}
