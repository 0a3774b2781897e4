//! Handles on the entities a subscription is attached to

use std::rc::{Rc, Weak};

use live_model::{
    Clip, ClipRef, ClipSlot, ClipSlotRef, Device, DeviceRef, Entity, EntityId, Event, Listener,
    Observable, Parameter, ParameterRef, Result as ModelResult, Song, SongRef, Track, TrackRef,
};

/// Strong handle on any subscribable entity
#[derive(Clone)]
pub enum EntityRef {
    Song(SongRef),
    Track(TrackRef),
    ClipSlot(ClipSlotRef),
    Clip(ClipRef),
    Device(DeviceRef),
    Parameter(ParameterRef),
}

/// Run `$body` with `$e` bound to whichever trait object the variant holds
macro_rules! each_entity {
    ($value:expr, $e:ident => $body:expr) => {
        match $value {
            EntityRef::Song($e) => $body,
            EntityRef::Track($e) => $body,
            EntityRef::ClipSlot($e) => $body,
            EntityRef::Clip($e) => $body,
            EntityRef::Device($e) => $body,
            EntityRef::Parameter($e) => $body,
        }
    };
}

impl EntityRef {
    pub fn id(&self) -> EntityId {
        each_entity!(self, e => e.entity_id())
    }

    pub fn is_alive(&self) -> bool {
        each_entity!(self, e => e.is_alive())
    }

    pub fn add_listener(&self, event: Event, listener: &Listener) -> ModelResult<()> {
        each_entity!(self, e => e.add_listener(event, listener))
    }

    pub fn remove_listener(&self, event: Event, listener: &Listener) -> ModelResult<()> {
        each_entity!(self, e => e.remove_listener(event, listener))
    }

    pub fn has_listener(&self, event: Event, listener: &Listener) -> bool {
        each_entity!(self, e => e.has_listener(event, listener))
    }

    pub fn downgrade(&self) -> WeakEntity {
        match self {
            EntityRef::Song(e) => WeakEntity::Song(Rc::downgrade(e)),
            EntityRef::Track(e) => WeakEntity::Track(Rc::downgrade(e)),
            EntityRef::ClipSlot(e) => WeakEntity::ClipSlot(Rc::downgrade(e)),
            EntityRef::Clip(e) => WeakEntity::Clip(Rc::downgrade(e)),
            EntityRef::Device(e) => WeakEntity::Device(Rc::downgrade(e)),
            EntityRef::Parameter(e) => WeakEntity::Parameter(Rc::downgrade(e)),
        }
    }

    pub fn song(&self) -> Option<&dyn Song> {
        match self {
            EntityRef::Song(e) => Some(&**e),
            _ => None,
        }
    }

    pub fn track(&self) -> Option<&dyn Track> {
        match self {
            EntityRef::Track(e) => Some(&**e),
            _ => None,
        }
    }

    pub fn clip_slot(&self) -> Option<&dyn ClipSlot> {
        match self {
            EntityRef::ClipSlot(e) => Some(&**e),
            _ => None,
        }
    }

    pub fn clip(&self) -> Option<&dyn Clip> {
        match self {
            EntityRef::Clip(e) => Some(&**e),
            _ => None,
        }
    }

    pub fn parameter(&self) -> Option<&dyn Parameter> {
        match self {
            EntityRef::Parameter(e) => Some(&**e),
            _ => None,
        }
    }
}

impl std::fmt::Debug for EntityRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match self {
            EntityRef::Song(_) => "Song",
            EntityRef::Track(_) => "Track",
            EntityRef::ClipSlot(_) => "ClipSlot",
            EntityRef::Clip(_) => "Clip",
            EntityRef::Device(_) => "Device",
            EntityRef::Parameter(_) => "Parameter",
        };
        write!(f, "{}({})", kind, self.id())
    }
}

/// Non-owning handle; listener callbacks and bucket entries hold these so a
/// registration never keeps a removed entity alive
#[derive(Clone)]
pub enum WeakEntity {
    Song(Weak<dyn Song>),
    Track(Weak<dyn Track>),
    ClipSlot(Weak<dyn ClipSlot>),
    Clip(Weak<dyn Clip>),
    Device(Weak<dyn Device>),
    Parameter(Weak<dyn Parameter>),
}

impl WeakEntity {
    pub fn upgrade(&self) -> Option<EntityRef> {
        Some(match self {
            WeakEntity::Song(w) => EntityRef::Song(w.upgrade()?),
            WeakEntity::Track(w) => EntityRef::Track(w.upgrade()?),
            WeakEntity::ClipSlot(w) => EntityRef::ClipSlot(w.upgrade()?),
            WeakEntity::Clip(w) => EntityRef::Clip(w.upgrade()?),
            WeakEntity::Device(w) => EntityRef::Device(w.upgrade()?),
            WeakEntity::Parameter(w) => EntityRef::Parameter(w.upgrade()?),
        })
    }
}
