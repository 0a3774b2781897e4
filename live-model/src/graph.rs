//! Provider traits for the object graph
//!
//! The bridge consumes these and never implements them for a real host; the
//! [`crate::memory`] module provides an in-process implementation.
//!
//! ```text
//! Song
//!  ├── tracks()         [Track]        visible tracks
//!  │     ├── volume / panning / sends   [Parameter]
//!  │     ├── clip_slots()               [ClipSlot] ── clip() ── Clip
//!  │     └── devices()                  [Device] ── parameters() ── [Parameter]
//!  ├── return_tracks()  [Track]
//!  ├── master_track()   Track           (crossfader lives here)
//!  └── scenes()         [Scene]
//! ```

use std::rc::Rc;

use crate::entity::Observable;
use crate::error::{ModelError, Result};

pub type SongRef = Rc<dyn Song>;
pub type TrackRef = Rc<dyn Track>;
pub type ClipSlotRef = Rc<dyn ClipSlot>;
pub type ClipRef = Rc<dyn Clip>;
pub type DeviceRef = Rc<dyn Device>;
pub type ParameterRef = Rc<dyn Parameter>;
pub type SceneRef = Rc<dyn Scene>;

/// The root document
pub trait Song: Observable {
    fn tempo(&self) -> f32;
    fn set_tempo(&self, bpm: f32) -> Result<()>;

    /// Playhead position in beats
    fn current_song_time(&self) -> f32;
    fn set_current_song_time(&self, beats: f32);

    fn is_playing(&self) -> bool;
    fn start_playing(&self);
    fn continue_playing(&self);
    fn play_selection(&self);
    fn stop_playing(&self);

    fn jump_to_next_cue(&self);
    fn jump_to_prev_cue(&self);

    fn undo(&self);
    fn redo(&self);

    fn overdub(&self) -> bool;
    fn set_overdub(&self, on: bool);

    fn clip_trigger_quantization(&self) -> i32;
    fn set_clip_trigger_quantization(&self, quantization: i32);

    /// Visible tracks, in display order
    fn tracks(&self) -> Vec<TrackRef>;
    fn return_tracks(&self) -> Vec<TrackRef>;
    fn master_track(&self) -> TrackRef;
    fn scenes(&self) -> Vec<SceneRef>;

    fn selected_scene(&self) -> Option<usize>;
    fn select_scene(&self, index: usize) -> Result<()>;
    fn selected_track(&self) -> Option<usize>;
}

/// A normal, return or master track
pub trait Track: Observable {
    fn name(&self) -> String;
    fn set_name(&self, name: &str);

    fn can_be_armed(&self) -> bool;
    fn arm(&self) -> bool;
    fn set_arm(&self, armed: bool) -> Result<()>;

    fn solo(&self) -> bool;
    fn set_solo(&self, solo: bool) -> Result<()>;
    fn mute(&self) -> bool;
    fn set_mute(&self, mute: bool) -> Result<()>;

    fn volume(&self) -> ParameterRef;
    fn panning(&self) -> ParameterRef;
    fn sends(&self) -> Vec<ParameterRef>;
    /// Master track only
    fn crossfader(&self) -> Option<ParameterRef>;

    /// MIDI tracks without an instrument have no audio output and no meters
    fn has_audio_output(&self) -> bool;
    /// Output level, 0.0 to 1.0
    fn output_meter_left(&self) -> f32;
    fn output_meter_right(&self) -> f32;

    fn clip_slots(&self) -> Vec<ClipSlotRef>;
    fn devices(&self) -> Vec<DeviceRef>;
    fn selected_device(&self) -> Option<usize>;

    fn stop_all_clips(&self);
    fn jump_in_running_session_clip(&self, beats: f32);
}

pub trait ClipSlot: Observable {
    fn clip(&self) -> Option<ClipRef>;
    fn fire(&self);
    fn stop(&self);
}

pub trait Clip: Observable {
    fn name(&self) -> String;
    fn set_name(&self, name: &str);
    fn color(&self) -> i32;
    fn set_color(&self, color: i32);

    fn is_playing(&self) -> bool;
    fn is_triggered(&self) -> bool;
    fn playing_position(&self) -> f32;
    fn length(&self) -> f32;

    fn looping(&self) -> bool;
    fn set_looping(&self, looping: bool);
    fn loop_start(&self) -> f32;
    fn set_loop_start(&self, beats: f32) -> Result<()>;
    fn loop_end(&self) -> f32;
    fn set_loop_end(&self, beats: f32) -> Result<()>;

    fn warping(&self) -> bool;
    fn set_warping(&self, warping: bool);

    fn fire(&self);
    fn stop(&self);
}

pub trait Device: Observable {
    fn name(&self) -> String;
    fn parameters(&self) -> Vec<ParameterRef>;
}

/// A continuous value: mixer controls and device parameters
pub trait Parameter: Observable {
    fn name(&self) -> String;
    fn value(&self) -> f32;
    fn set_value(&self, value: f32) -> Result<()>;
    fn min(&self) -> f32;
    fn max(&self) -> f32;
}

pub trait Scene: Observable {
    fn name(&self) -> String;
    fn set_name(&self, name: &str);
    fn fire(&self);
}

/// Clip launch state as reported on the wire
///
/// 0 = empty slot, 1 = has clip, 2 = playing, 3 = triggered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClipState {
    Empty = 0,
    Stopped = 1,
    Playing = 2,
    Triggered = 3,
}

impl ClipState {
    /// A clip that is both playing and re-triggered reports triggered
    pub fn of(clip: Option<&dyn Clip>) -> Self {
        match clip {
            None => ClipState::Empty,
            Some(c) if c.is_triggered() => ClipState::Triggered,
            Some(c) if c.is_playing() => ClipState::Playing,
            Some(_) => ClipState::Stopped,
        }
    }

    pub fn code(self) -> i32 {
        self as i32
    }
}

/// Bounds-checked positional lookup
pub fn nth<T: Clone>(items: &[T], index: usize, what: &'static str) -> Result<T> {
    items.get(index).cloned().ok_or(ModelError::IndexOutOfRange {
        what,
        index,
        len: items.len(),
    })
}

/// Position of `target` in `items` by identity
pub fn position_of<T: Observable + ?Sized>(items: &[Rc<T>], target: &T) -> Option<usize> {
    let id = target.entity_id();
    items.iter().position(|item| item.entity_id() == id)
}
