//! Object-graph capability interface for the LiveOSC bridge
//!
//! The bridge never sees a concrete host. It talks to a tree of trait objects
//! rooted at [`Song`], each node of which is an [`Observable`]: a per-event
//! listener source keyed by listener identity.
//!
//! # Architecture
//!
//! ```text
//! Entity (entity_id, is_alive)
//!    └── Observable (add_listener / remove_listener / has_listener)
//!           ├── Song
//!           ├── Track ── ClipSlot ── Clip
//!           ├── Device ── Parameter
//!           └── Scene
//! ```
//!
//! Everything is single-threaded: handles are `Rc`, listeners are
//! `Rc<dyn Fn()>`, and none of the types are `Send`.
//!
//! # In-memory host
//!
//! [`memory`] provides a complete implementation used for tests and demos:
//!
//! ```
//! use std::cell::Cell;
//! use std::rc::Rc;
//! use live_model::memory::MemorySong;
//! use live_model::{Event, Listener, Observable, Song};
//!
//! let song = MemorySong::new();
//! let seen = Rc::new(Cell::new(0.0));
//! let listener = {
//!     let song = Rc::downgrade(&song);
//!     let seen = Rc::clone(&seen);
//!     Listener::new(move || {
//!         if let Some(song) = song.upgrade() {
//!             seen.set(song.tempo());
//!         }
//!     })
//! };
//!
//! song.add_listener(Event::Tempo, &listener).unwrap();
//! song.set_tempo(98.5).unwrap();
//! assert_eq!(seen.get(), 98.5);
//! ```

pub mod entity;
pub mod error;
pub mod graph;
pub mod memory;

pub use entity::{Entity, EntityId, Event, Listener, Observable};
pub use error::{ModelError, Result};
pub use graph::{
    nth, position_of, Clip, ClipRef, ClipSlot, ClipSlotRef, ClipState, Device, DeviceRef,
    Parameter, ParameterRef, Scene, SceneRef, Song, SongRef, Track, TrackRef,
};
