//! In-process host implementing every provider trait
//!
//! Used by the bridge's tests and the `memory_host` example. Setters fire
//! their attribute event only when the value actually changes; structural
//! edits fire the structural events the subscription layer watches.
//!
//! ```
//! use live_model::memory::MemorySong;
//! use live_model::{Song, Track};
//!
//! let song = MemorySong::with_layout(4, 2);
//! song.set_tempo(128.0).unwrap();
//! assert_eq!(song.tracks().len(), 4);
//! assert_eq!(song.tracks()[0].clip_slots().len(), 2);
//! ```

/// Implements `Entity` and `Observable` by delegating to a `source` field
macro_rules! observable {
    ($ty:ty) => {
        impl $crate::entity::Entity for $ty {
            fn entity_id(&self) -> $crate::entity::EntityId {
                self.source.id()
            }

            fn is_alive(&self) -> bool {
                self.source.is_alive()
            }
        }

        impl $crate::entity::Observable for $ty {
            fn add_listener(
                &self,
                event: $crate::entity::Event,
                listener: &$crate::entity::Listener,
            ) -> $crate::error::Result<()> {
                self.source.add(event, listener)
            }

            fn remove_listener(
                &self,
                event: $crate::entity::Event,
                listener: &$crate::entity::Listener,
            ) -> $crate::error::Result<()> {
                self.source.remove(event, listener)
            }

            fn has_listener(
                &self,
                event: $crate::entity::Event,
                listener: &$crate::entity::Listener,
            ) -> bool {
                self.source.has(event, listener)
            }
        }
    };
}

mod clip;
mod device;
mod song;
mod source;
mod track;

pub use clip::{MemoryClip, MemoryClipSlot};
pub use device::{MemoryDevice, MemoryParameter};
pub use song::{MemoryScene, MemorySong};
pub use source::{EventSource, IdGen};
pub use track::{MemoryTrack, TrackKind};
