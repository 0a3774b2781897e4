//! In-memory clip slots and clips

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::entity::Event;
use crate::error::{ModelError, Result};
use crate::graph::{Clip, ClipRef, ClipSlot};
use crate::memory::source::{EventSource, IdGen};

// ============================================================================
// MemoryClip
// ============================================================================

#[derive(Debug)]
pub struct MemoryClip {
    source: EventSource,
    name: RefCell<String>,
    color: Cell<i32>,
    playing: Cell<bool>,
    triggered: Cell<bool>,
    position: Cell<f32>,
    length: f32,
    looping: Cell<bool>,
    loop_start: Cell<f32>,
    loop_end: Cell<f32>,
    warping: Cell<bool>,
}

observable!(MemoryClip);

impl MemoryClip {
    pub fn new(ids: &IdGen, name: &str, length: f32) -> Rc<Self> {
        Rc::new(Self {
            source: EventSource::new(
                ids.next_id(),
                &[
                    Event::Name,
                    Event::Color,
                    Event::PlayingStatus,
                    Event::PlayingPosition,
                ],
            ),
            name: RefCell::new(name.to_string()),
            color: Cell::new(0),
            playing: Cell::new(false),
            triggered: Cell::new(false),
            position: Cell::new(0.0),
            length,
            looping: Cell::new(true),
            loop_start: Cell::new(0.0),
            loop_end: Cell::new(length),
            warping: Cell::new(true),
        })
    }

    /// Resolve a pending launch: the clip starts playing from its loop start
    pub fn launch(&self) {
        if self.triggered.get() || !self.playing.get() {
            self.triggered.set(false);
            self.playing.set(true);
            self.position.set(self.loop_start.get());
            self.source.fire(Event::PlayingStatus);
        }
    }

    /// Move the play position by `beats`, wrapping inside the loop
    pub fn advance(&self, beats: f32) {
        if !self.playing.get() || beats == 0.0 {
            return;
        }
        let mut pos = self.position.get() + beats;
        let (start, end) = (self.loop_start.get(), self.loop_end.get());
        if self.looping.get() && end > start {
            while pos >= end {
                pos -= end - start;
            }
        }
        self.position.set(pos);
        self.source.fire(Event::PlayingPosition);
    }

    pub fn kill(&self) {
        self.source.kill();
    }

    pub fn listener_count(&self) -> usize {
        self.source.total_listeners()
    }

    pub fn listeners_on(&self, event: Event) -> usize {
        self.source.listener_count(event)
    }
}

impl Clip for MemoryClip {
    fn name(&self) -> String {
        self.name.borrow().clone()
    }

    fn set_name(&self, name: &str) {
        if *self.name.borrow() != name {
            *self.name.borrow_mut() = name.to_string();
            self.source.fire(Event::Name);
        }
    }

    fn color(&self) -> i32 {
        self.color.get()
    }

    fn set_color(&self, color: i32) {
        if self.color.get() != color {
            self.color.set(color);
            self.source.fire(Event::Color);
        }
    }

    fn is_playing(&self) -> bool {
        self.playing.get()
    }

    fn is_triggered(&self) -> bool {
        self.triggered.get()
    }

    fn playing_position(&self) -> f32 {
        self.position.get()
    }

    fn length(&self) -> f32 {
        self.length
    }

    fn looping(&self) -> bool {
        self.looping.get()
    }

    fn set_looping(&self, looping: bool) {
        self.looping.set(looping);
    }

    fn loop_start(&self) -> f32 {
        self.loop_start.get()
    }

    fn set_loop_start(&self, beats: f32) -> Result<()> {
        self.source.ensure_alive()?;
        if !(0.0..self.loop_end.get()).contains(&beats) {
            return Err(ModelError::InvalidValue(format!(
                "loop start {} must be before loop end {}",
                beats,
                self.loop_end.get()
            )));
        }
        self.loop_start.set(beats);
        Ok(())
    }

    fn loop_end(&self) -> f32 {
        self.loop_end.get()
    }

    fn set_loop_end(&self, beats: f32) -> Result<()> {
        self.source.ensure_alive()?;
        if !beats.is_finite() || beats <= self.loop_start.get() {
            return Err(ModelError::InvalidValue(format!(
                "loop end {} must be after loop start {}",
                beats,
                self.loop_start.get()
            )));
        }
        self.loop_end.set(beats);
        Ok(())
    }

    fn warping(&self) -> bool {
        self.warping.get()
    }

    fn set_warping(&self, warping: bool) {
        self.warping.set(warping);
    }

    fn fire(&self) {
        if !self.triggered.get() {
            self.triggered.set(true);
            self.source.fire(Event::PlayingStatus);
        }
    }

    fn stop(&self) {
        if self.playing.get() || self.triggered.get() {
            self.playing.set(false);
            self.triggered.set(false);
            self.source.fire(Event::PlayingStatus);
        }
    }
}

// ============================================================================
// MemoryClipSlot
// ============================================================================

#[derive(Debug)]
pub struct MemoryClipSlot {
    source: EventSource,
    ids: IdGen,
    clip: RefCell<Option<Rc<MemoryClip>>>,
}

observable!(MemoryClipSlot);

impl MemoryClipSlot {
    pub fn new(ids: &IdGen) -> Rc<Self> {
        Rc::new(Self {
            source: EventSource::new(ids.next_id(), &[Event::HasClip]),
            ids: ids.clone(),
            clip: RefCell::new(None),
        })
    }

    /// Create a clip in this slot, replacing (and killing) any existing one
    pub fn create_clip(&self, name: &str, length: f32) -> Rc<MemoryClip> {
        let clip = MemoryClip::new(&self.ids, name, length);
        if let Some(old) = self.clip.replace(Some(Rc::clone(&clip))) {
            old.kill();
        }
        self.source.fire(Event::HasClip);
        clip
    }

    /// Delete the clip, if any
    pub fn delete_clip(&self) {
        let old = self.clip.borrow_mut().take();
        if let Some(old) = old {
            old.kill();
            self.source.fire(Event::HasClip);
        }
    }

    pub fn memory_clip(&self) -> Option<Rc<MemoryClip>> {
        self.clip.borrow().clone()
    }

    pub fn kill(&self) {
        if let Some(clip) = self.clip.borrow().as_ref() {
            clip.kill();
        }
        self.source.kill();
    }

    /// Listeners on the slot and its clip
    pub fn listener_count(&self) -> usize {
        self.source.total_listeners()
            + self
                .clip
                .borrow()
                .as_ref()
                .map(|c| c.listener_count())
                .unwrap_or(0)
    }
}

impl ClipSlot for MemoryClipSlot {
    fn clip(&self) -> Option<ClipRef> {
        self.clip.borrow().as_ref().map(|c| Rc::clone(c) as ClipRef)
    }

    fn fire(&self) {
        if let Some(clip) = self.memory_clip() {
            clip.fire();
        }
    }

    fn stop(&self) {
        if let Some(clip) = self.memory_clip() {
            clip.stop();
        }
    }
}
