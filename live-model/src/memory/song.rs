//! In-memory song and scenes

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use crate::entity::Event;
use crate::error::{ModelError, Result};
use crate::graph::{ClipSlot, SceneRef, Scene, Song, TrackRef};
use crate::memory::source::{EventSource, IdGen};
use crate::memory::track::{MemoryTrack, TrackKind};

const TEMPO_RANGE: std::ops::RangeInclusive<f32> = 20.0..=999.0;

// ============================================================================
// MemoryScene
// ============================================================================

#[derive(Debug)]
pub struct MemoryScene {
    source: EventSource,
    name: RefCell<String>,
    song: Weak<MemorySong>,
}

observable!(MemoryScene);

impl MemoryScene {
    pub fn kill(&self) {
        self.source.kill();
    }
}

impl Scene for MemoryScene {
    fn name(&self) -> String {
        self.name.borrow().clone()
    }

    fn set_name(&self, name: &str) {
        if *self.name.borrow() != name {
            *self.name.borrow_mut() = name.to_string();
            self.source.fire(Event::Name);
        }
    }

    /// Launch every clip in this scene's row and select the scene
    fn fire(&self) {
        let Some(song) = self.song.upgrade() else {
            return;
        };
        let Some(row) = song.scene_index(self) else {
            return;
        };
        for track in song.memory_tracks() {
            if let Some(slot) = track.clip_slot(row) {
                slot.fire();
            }
        }
        let _ = song.select_scene(row);
    }
}

// ============================================================================
// MemorySong
// ============================================================================

/// Root of an in-memory document
///
/// Structural edits fire the same events a real host does:
/// [`add_track`](Self::add_track) and [`remove_track`](Self::remove_track)
/// fire [`Event::Tracks`]; clip creation fires [`Event::HasClip`] on the slot;
/// device edits fire [`Event::Devices`] on the track. Adding scenes or sends
/// fires nothing, so callers pick those up on the next rebuild.
#[derive(Debug)]
pub struct MemorySong {
    source: EventSource,
    ids: IdGen,
    me: Weak<MemorySong>,

    tempo: Cell<f32>,
    song_time: Cell<f32>,
    playing: Cell<bool>,
    overdub: Cell<bool>,
    quantization: Cell<i32>,

    tracks: RefCell<Vec<Rc<MemoryTrack>>>,
    returns: RefCell<Vec<Rc<MemoryTrack>>>,
    master: Rc<MemoryTrack>,
    scenes: RefCell<Vec<Rc<MemoryScene>>>,

    selected_scene: Cell<Option<usize>>,
    selected_track: Cell<Option<usize>>,

    cue_points: RefCell<Vec<f32>>,
    undo_count: Cell<usize>,
    redo_count: Cell<usize>,
}

observable!(MemorySong);

impl MemorySong {
    /// Empty document: master track only, 120 BPM, stopped
    pub fn new() -> Rc<Self> {
        let ids = IdGen::new();
        Rc::new_cyclic(|me| Self {
            source: EventSource::new(
                ids.next_id(),
                &[
                    Event::Tempo,
                    Event::IsPlaying,
                    Event::Overdub,
                    Event::CurrentSongTime,
                    Event::SelectedScene,
                    Event::SelectedTrack,
                    Event::Tracks,
                ],
            ),
            master: MemoryTrack::new(&ids, TrackKind::Master, "Master"),
            ids,
            me: me.clone(),
            tempo: Cell::new(120.0),
            song_time: Cell::new(0.0),
            playing: Cell::new(false),
            overdub: Cell::new(false),
            quantization: Cell::new(4),
            tracks: RefCell::new(Vec::new()),
            returns: RefCell::new(Vec::new()),
            scenes: RefCell::new(Vec::new()),
            selected_scene: Cell::new(None),
            selected_track: Cell::new(None),
            cue_points: RefCell::new(Vec::new()),
            undo_count: Cell::new(0),
            redo_count: Cell::new(0),
        })
    }

    /// Document with `tracks` audio tracks named "1".."N" and `scenes` empty
    /// scenes
    pub fn with_layout(tracks: usize, scenes: usize) -> Rc<Self> {
        let song = Self::new();
        for i in 0..scenes {
            song.add_scene(&format!("Scene {}", i + 1));
        }
        for i in 0..tracks {
            song.add_track(&format!("{}", i + 1));
        }
        song
    }

    pub fn ids(&self) -> &IdGen {
        &self.ids
    }

    // ------------------------------------------------------------------------
    // Structure
    // ------------------------------------------------------------------------

    /// Append an armable track with one slot per scene and one send per
    /// return track
    pub fn add_track(&self, name: &str) -> Rc<MemoryTrack> {
        self.push_track(TrackKind::Audio, name)
    }

    /// Append a group track (cannot be armed)
    pub fn add_group_track(&self, name: &str) -> Rc<MemoryTrack> {
        self.push_track(TrackKind::Group, name)
    }

    fn push_track(&self, kind: TrackKind, name: &str) -> Rc<MemoryTrack> {
        let track = MemoryTrack::new(&self.ids, kind, name);
        for _ in 0..self.scenes.borrow().len() {
            track.add_clip_slot();
        }
        for _ in 0..self.returns.borrow().len() {
            track.add_send();
        }
        self.tracks.borrow_mut().push(Rc::clone(&track));
        self.source.fire(Event::Tracks);
        track
    }

    /// Detach a track from the document
    ///
    /// The returned track is still alive and keeps whatever listeners were
    /// attached to it; call [`MemoryTrack::kill`] to make it stale.
    pub fn remove_track(&self, index: usize) -> Result<Rc<MemoryTrack>> {
        let track = {
            let mut tracks = self.tracks.borrow_mut();
            if index >= tracks.len() {
                return Err(ModelError::IndexOutOfRange {
                    what: "track",
                    index,
                    len: tracks.len(),
                });
            }
            tracks.remove(index)
        };
        let remaining = self.tracks.borrow().len();
        if let Some(selected) = self.selected_track.get() {
            if selected >= remaining {
                self.selected_track
                    .set(if remaining == 0 { None } else { Some(remaining - 1) });
            }
        }
        self.source.fire(Event::Tracks);
        Ok(track)
    }

    /// Append a return track and give every normal track a send to it
    pub fn add_return_track(&self, name: &str) -> Rc<MemoryTrack> {
        let track = MemoryTrack::new(&self.ids, TrackKind::Return, name);
        for normal in self.tracks.borrow().iter() {
            normal.add_send();
        }
        self.returns.borrow_mut().push(Rc::clone(&track));
        self.source.fire(Event::Tracks);
        track
    }

    /// Remove a return track along with the matching send on every track
    pub fn remove_return_track(&self, index: usize) -> Result<Rc<MemoryTrack>> {
        let track = {
            let mut returns = self.returns.borrow_mut();
            if index >= returns.len() {
                return Err(ModelError::IndexOutOfRange {
                    what: "return track",
                    index,
                    len: returns.len(),
                });
            }
            returns.remove(index)
        };
        for normal in self.tracks.borrow().iter() {
            normal.remove_send(index);
        }
        self.source.fire(Event::Tracks);
        Ok(track)
    }

    /// Append a scene, adding an empty slot to every normal track
    pub fn add_scene(&self, name: &str) -> Rc<MemoryScene> {
        let scene = Rc::new(MemoryScene {
            source: EventSource::new(self.ids.next_id(), &[Event::Name]),
            name: RefCell::new(name.to_string()),
            song: self.me.clone(),
        });
        for track in self.tracks.borrow().iter() {
            track.add_clip_slot();
        }
        self.scenes.borrow_mut().push(Rc::clone(&scene));
        scene
    }

    pub fn track(&self, index: usize) -> Option<Rc<MemoryTrack>> {
        self.tracks.borrow().get(index).cloned()
    }

    pub fn return_track(&self, index: usize) -> Option<Rc<MemoryTrack>> {
        self.returns.borrow().get(index).cloned()
    }

    pub fn master(&self) -> Rc<MemoryTrack> {
        Rc::clone(&self.master)
    }

    pub fn memory_tracks(&self) -> Vec<Rc<MemoryTrack>> {
        self.tracks.borrow().clone()
    }

    fn scene_index(&self, scene: &MemoryScene) -> Option<usize> {
        self.scenes
            .borrow()
            .iter()
            .position(|s| std::ptr::eq(Rc::as_ptr(s), scene))
    }

    // ------------------------------------------------------------------------
    // Host simulation
    // ------------------------------------------------------------------------

    /// Select a visible track, firing the selection event
    pub fn select_track(&self, index: usize) -> Result<()> {
        let len = self.tracks.borrow().len();
        if index >= len {
            return Err(ModelError::IndexOutOfRange {
                what: "track",
                index,
                len,
            });
        }
        if self.selected_track.get() != Some(index) {
            self.selected_track.set(Some(index));
            self.source.fire(Event::SelectedTrack);
        }
        Ok(())
    }

    /// Advance the playhead by `beats` while playing
    ///
    /// Pending clip launches start, playing clips move, and the
    /// current-song-time event fires.
    pub fn advance(&self, beats: f32) {
        if !self.playing.get() {
            return;
        }
        for track in self.memory_tracks() {
            track.advance_clips(beats);
        }
        self.set_current_song_time(self.song_time.get() + beats);
    }

    pub fn add_cue_point(&self, beats: f32) {
        let mut cues = self.cue_points.borrow_mut();
        cues.push(beats);
        cues.sort_by(|a, b| a.total_cmp(b));
    }

    pub fn undo_count(&self) -> usize {
        self.undo_count.get()
    }

    pub fn redo_count(&self) -> usize {
        self.redo_count.get()
    }

    /// Make the song and everything in it stale
    pub fn kill(&self) {
        for track in self.tracks.borrow().iter().chain(self.returns.borrow().iter()) {
            track.kill();
        }
        self.master.kill();
        for scene in self.scenes.borrow().iter() {
            scene.kill();
        }
        self.source.kill();
    }

    /// Listeners attached to one song-level event
    pub fn listeners_on(&self, event: Event) -> usize {
        self.source.listener_count(event)
    }

    /// Listeners attached anywhere in the current document
    pub fn graph_listener_count(&self) -> usize {
        let tracks: usize = self
            .tracks
            .borrow()
            .iter()
            .chain(self.returns.borrow().iter())
            .map(|t| t.listener_count())
            .sum();
        self.source.total_listeners() + tracks + self.master.listener_count()
    }

    fn set_playing(&self, playing: bool) {
        if self.playing.get() != playing {
            self.playing.set(playing);
            self.source.fire(Event::IsPlaying);
        }
    }
}

impl Song for MemorySong {
    fn tempo(&self) -> f32 {
        self.tempo.get()
    }

    fn set_tempo(&self, bpm: f32) -> Result<()> {
        self.source.ensure_alive()?;
        if !TEMPO_RANGE.contains(&bpm) {
            return Err(ModelError::InvalidValue(format!(
                "tempo {} outside {}..={}",
                bpm,
                TEMPO_RANGE.start(),
                TEMPO_RANGE.end()
            )));
        }
        if self.tempo.get() != bpm {
            self.tempo.set(bpm);
            self.source.fire(Event::Tempo);
        }
        Ok(())
    }

    fn current_song_time(&self) -> f32 {
        self.song_time.get()
    }

    fn set_current_song_time(&self, beats: f32) {
        let beats = beats.max(0.0);
        if self.song_time.get() != beats {
            self.song_time.set(beats);
            self.source.fire(Event::CurrentSongTime);
        }
    }

    fn is_playing(&self) -> bool {
        self.playing.get()
    }

    fn start_playing(&self) {
        self.set_current_song_time(0.0);
        self.set_playing(true);
    }

    fn continue_playing(&self) {
        self.set_playing(true);
    }

    fn play_selection(&self) {
        self.set_playing(true);
    }

    fn stop_playing(&self) {
        self.set_playing(false);
    }

    fn jump_to_next_cue(&self) {
        let now = self.song_time.get();
        let next = self.cue_points.borrow().iter().copied().find(|&c| c > now);
        if let Some(cue) = next {
            self.set_current_song_time(cue);
        }
    }

    fn jump_to_prev_cue(&self) {
        let now = self.song_time.get();
        let prev = self
            .cue_points
            .borrow()
            .iter()
            .rev()
            .copied()
            .find(|&c| c < now);
        if let Some(cue) = prev {
            self.set_current_song_time(cue);
        }
    }

    fn undo(&self) {
        self.undo_count.set(self.undo_count.get() + 1);
    }

    fn redo(&self) {
        self.redo_count.set(self.redo_count.get() + 1);
    }

    fn overdub(&self) -> bool {
        self.overdub.get()
    }

    fn set_overdub(&self, on: bool) {
        if self.overdub.get() != on {
            self.overdub.set(on);
            self.source.fire(Event::Overdub);
        }
    }

    fn clip_trigger_quantization(&self) -> i32 {
        self.quantization.get()
    }

    fn set_clip_trigger_quantization(&self, quantization: i32) {
        self.quantization.set(quantization);
    }

    fn tracks(&self) -> Vec<TrackRef> {
        self.tracks
            .borrow()
            .iter()
            .map(|t| Rc::clone(t) as TrackRef)
            .collect()
    }

    fn return_tracks(&self) -> Vec<TrackRef> {
        self.returns
            .borrow()
            .iter()
            .map(|t| Rc::clone(t) as TrackRef)
            .collect()
    }

    fn master_track(&self) -> TrackRef {
        Rc::clone(&self.master) as TrackRef
    }

    fn scenes(&self) -> Vec<SceneRef> {
        self.scenes
            .borrow()
            .iter()
            .map(|s| Rc::clone(s) as SceneRef)
            .collect()
    }

    fn selected_scene(&self) -> Option<usize> {
        self.selected_scene.get()
    }

    fn select_scene(&self, index: usize) -> Result<()> {
        let len = self.scenes.borrow().len();
        if index >= len {
            return Err(ModelError::IndexOutOfRange {
                what: "scene",
                index,
                len,
            });
        }
        if self.selected_scene.get() != Some(index) {
            self.selected_scene.set(Some(index));
            self.source.fire(Event::SelectedScene);
        }
        Ok(())
    }

    fn selected_track(&self) -> Option<usize> {
        self.selected_track.get()
    }
}
