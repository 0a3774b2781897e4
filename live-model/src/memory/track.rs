//! In-memory tracks

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::entity::{Entity, Event};
use crate::error::{ModelError, Result};
use crate::graph::{Clip, ClipSlotRef, DeviceRef, ParameterRef, Track};
use crate::memory::clip::MemoryClipSlot;
use crate::memory::device::{MemoryDevice, MemoryParameter};
use crate::memory::source::{EventSource, IdGen};

/// What kind of channel a track is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackKind {
    /// Audio or MIDI track; can be armed
    Audio,
    /// Group track; cannot be armed
    Group,
    Return,
    Master,
}

impl TrackKind {
    fn supported_events(self) -> &'static [Event] {
        match self {
            TrackKind::Audio => &[
                Event::Name,
                Event::Arm,
                Event::Solo,
                Event::Mute,
                Event::Devices,
                Event::SelectedDevice,
                Event::OutputMeterLeft,
                Event::OutputMeterRight,
            ],
            TrackKind::Group | TrackKind::Return => &[
                Event::Name,
                Event::Solo,
                Event::Mute,
                Event::Devices,
                Event::SelectedDevice,
                Event::OutputMeterLeft,
                Event::OutputMeterRight,
            ],
            TrackKind::Master => &[
                Event::Name,
                Event::Devices,
                Event::SelectedDevice,
                Event::OutputMeterLeft,
                Event::OutputMeterRight,
            ],
        }
    }
}

#[derive(Debug)]
pub struct MemoryTrack {
    source: EventSource,
    ids: IdGen,
    kind: TrackKind,
    name: RefCell<String>,
    arm: Cell<bool>,
    solo: Cell<bool>,
    mute: Cell<bool>,
    volume: Rc<MemoryParameter>,
    panning: Rc<MemoryParameter>,
    sends: RefCell<Vec<Rc<MemoryParameter>>>,
    crossfader: Option<Rc<MemoryParameter>>,
    clip_slots: RefCell<Vec<Rc<MemoryClipSlot>>>,
    devices: RefCell<Vec<Rc<MemoryDevice>>>,
    selected_device: Cell<Option<usize>>,
    audio_output: Cell<bool>,
    meter_left: Cell<f32>,
    meter_right: Cell<f32>,
}

observable!(MemoryTrack);

impl MemoryTrack {
    pub fn new(ids: &IdGen, kind: TrackKind, name: &str) -> Rc<Self> {
        let crossfader = match kind {
            TrackKind::Master => Some(MemoryParameter::new(ids, "Crossfade", 0.0, -1.0, 1.0)),
            _ => None,
        };
        Rc::new(Self {
            source: EventSource::new(ids.next_id(), kind.supported_events()),
            ids: ids.clone(),
            kind,
            name: RefCell::new(name.to_string()),
            arm: Cell::new(false),
            solo: Cell::new(false),
            mute: Cell::new(false),
            volume: MemoryParameter::new(ids, "Track Volume", 0.85, 0.0, 1.0),
            panning: MemoryParameter::new(ids, "Track Panning", 0.0, -1.0, 1.0),
            sends: RefCell::new(Vec::new()),
            crossfader,
            clip_slots: RefCell::new(Vec::new()),
            devices: RefCell::new(Vec::new()),
            selected_device: Cell::new(None),
            audio_output: Cell::new(true),
            meter_left: Cell::new(0.0),
            meter_right: Cell::new(0.0),
        })
    }

    pub fn kind(&self) -> TrackKind {
        self.kind
    }

    pub fn volume_param(&self) -> Rc<MemoryParameter> {
        Rc::clone(&self.volume)
    }

    pub fn panning_param(&self) -> Rc<MemoryParameter> {
        Rc::clone(&self.panning)
    }

    pub fn crossfader_param(&self) -> Option<Rc<MemoryParameter>> {
        self.crossfader.clone()
    }

    pub fn send(&self, index: usize) -> Option<Rc<MemoryParameter>> {
        self.sends.borrow().get(index).cloned()
    }

    pub fn add_send(&self) -> Rc<MemoryParameter> {
        let name = format!("Send {}", self.sends.borrow().len() + 1);
        let send = MemoryParameter::new(&self.ids, &name, 0.0, 0.0, 1.0);
        self.sends.borrow_mut().push(Rc::clone(&send));
        send
    }

    pub fn remove_send(&self, index: usize) -> Option<Rc<MemoryParameter>> {
        let mut sends = self.sends.borrow_mut();
        if index < sends.len() {
            let send = sends.remove(index);
            send.kill();
            Some(send)
        } else {
            None
        }
    }

    pub fn clip_slot(&self, index: usize) -> Option<Rc<MemoryClipSlot>> {
        self.clip_slots.borrow().get(index).cloned()
    }

    pub fn add_clip_slot(&self) -> Rc<MemoryClipSlot> {
        let slot = MemoryClipSlot::new(&self.ids);
        self.clip_slots.borrow_mut().push(Rc::clone(&slot));
        slot
    }

    pub fn memory_clip_slots(&self) -> Vec<Rc<MemoryClipSlot>> {
        self.clip_slots.borrow().clone()
    }

    pub fn device(&self, index: usize) -> Option<Rc<MemoryDevice>> {
        self.devices.borrow().get(index).cloned()
    }

    /// Append a device and fire the device-chain event
    pub fn add_device(&self, name: &str) -> Rc<MemoryDevice> {
        let device = MemoryDevice::new(&self.ids, name);
        self.devices.borrow_mut().push(Rc::clone(&device));
        self.source.fire(Event::Devices);
        device
    }

    /// Remove and kill a device, firing the device-chain event
    pub fn remove_device(&self, index: usize) -> Result<Rc<MemoryDevice>> {
        let device = {
            let mut devices = self.devices.borrow_mut();
            if index >= devices.len() {
                return Err(ModelError::IndexOutOfRange {
                    what: "device",
                    index,
                    len: devices.len(),
                });
            }
            devices.remove(index)
        };
        device.kill();
        if let Some(selected) = self.selected_device.get() {
            if selected >= self.devices.borrow().len() {
                self.selected_device.set(None);
            }
        }
        self.source.fire(Event::Devices);
        Ok(device)
    }

    pub fn select_device(&self, index: Option<usize>) -> Result<()> {
        self.source.ensure_alive()?;
        let len = self.devices.borrow().len();
        if let Some(i) = index {
            if i >= len {
                return Err(ModelError::IndexOutOfRange {
                    what: "device",
                    index: i,
                    len,
                });
            }
        }
        if self.selected_device.get() != index {
            self.selected_device.set(index);
            self.source.fire(Event::SelectedDevice);
        }
        Ok(())
    }

    /// A MIDI track without an instrument has no audio output
    pub fn set_has_audio_output(&self, audio_output: bool) {
        self.audio_output.set(audio_output);
    }

    /// Move the output meters; each channel that changed fires its own event
    pub fn set_output_meters(&self, left: f32, right: f32) -> Result<()> {
        self.source.ensure_alive()?;
        if !self.audio_output.get() {
            return Err(ModelError::Unsupported {
                entity: self.entity_id(),
                event: Event::OutputMeterLeft,
            });
        }
        for (cell, level, event) in [
            (&self.meter_left, left, Event::OutputMeterLeft),
            (&self.meter_right, right, Event::OutputMeterRight),
        ] {
            let level = level.clamp(0.0, 1.0);
            if cell.get() != level {
                cell.set(level);
                self.source.fire(event);
            }
        }
        Ok(())
    }

    /// Kill the track and everything it owns
    pub fn kill(&self) {
        self.volume.kill();
        self.panning.kill();
        if let Some(xf) = &self.crossfader {
            xf.kill();
        }
        for send in self.sends.borrow().iter() {
            send.kill();
        }
        for slot in self.clip_slots.borrow().iter() {
            slot.kill();
        }
        for device in self.devices.borrow().iter() {
            device.kill();
        }
        self.source.kill();
    }

    pub fn listeners_on(&self, event: Event) -> usize {
        self.source.listener_count(event)
    }

    /// Listeners on the track and everything it owns
    pub fn listener_count(&self) -> usize {
        let params = self.volume.listener_count()
            + self.panning.listener_count()
            + self.crossfader.as_ref().map(|p| p.listener_count()).unwrap_or(0)
            + self.sends.borrow().iter().map(|p| p.listener_count()).sum::<usize>();
        let slots: usize = self.clip_slots.borrow().iter().map(|s| s.listener_count()).sum();
        let devices: usize = self.devices.borrow().iter().map(|d| d.listener_count()).sum();
        self.source.total_listeners() + params + slots + devices
    }

    /// Advance every playing clip on the track
    pub(crate) fn advance_clips(&self, beats: f32) {
        for slot in self.memory_clip_slots() {
            if let Some(clip) = slot.memory_clip() {
                if clip.is_triggered() {
                    clip.launch();
                } else {
                    clip.advance(beats);
                }
            }
        }
    }

    fn set_flag(&self, cell: &Cell<bool>, value: bool, event: Event) -> Result<()> {
        self.source.ensure_alive()?;
        if !self.source.supports(event) {
            return Err(ModelError::Unsupported {
                entity: self.entity_id(),
                event,
            });
        }
        if cell.get() != value {
            cell.set(value);
            self.source.fire(event);
        }
        Ok(())
    }
}

impl Track for MemoryTrack {
    fn name(&self) -> String {
        self.name.borrow().clone()
    }

    fn set_name(&self, name: &str) {
        if *self.name.borrow() != name {
            *self.name.borrow_mut() = name.to_string();
            self.source.fire(Event::Name);
        }
    }

    fn can_be_armed(&self) -> bool {
        self.kind == TrackKind::Audio
    }

    fn arm(&self) -> bool {
        self.arm.get()
    }

    fn set_arm(&self, armed: bool) -> Result<()> {
        self.set_flag(&self.arm, armed, Event::Arm)
    }

    fn solo(&self) -> bool {
        self.solo.get()
    }

    fn set_solo(&self, solo: bool) -> Result<()> {
        self.set_flag(&self.solo, solo, Event::Solo)
    }

    fn mute(&self) -> bool {
        self.mute.get()
    }

    fn set_mute(&self, mute: bool) -> Result<()> {
        self.set_flag(&self.mute, mute, Event::Mute)
    }

    fn volume(&self) -> ParameterRef {
        Rc::clone(&self.volume) as ParameterRef
    }

    fn panning(&self) -> ParameterRef {
        Rc::clone(&self.panning) as ParameterRef
    }

    fn sends(&self) -> Vec<ParameterRef> {
        self.sends
            .borrow()
            .iter()
            .map(|s| Rc::clone(s) as ParameterRef)
            .collect()
    }

    fn crossfader(&self) -> Option<ParameterRef> {
        self.crossfader.as_ref().map(|p| Rc::clone(p) as ParameterRef)
    }

    fn has_audio_output(&self) -> bool {
        self.audio_output.get()
    }

    fn output_meter_left(&self) -> f32 {
        self.meter_left.get()
    }

    fn output_meter_right(&self) -> f32 {
        self.meter_right.get()
    }

    fn clip_slots(&self) -> Vec<ClipSlotRef> {
        self.clip_slots
            .borrow()
            .iter()
            .map(|s| Rc::clone(s) as ClipSlotRef)
            .collect()
    }

    fn devices(&self) -> Vec<DeviceRef> {
        self.devices
            .borrow()
            .iter()
            .map(|d| Rc::clone(d) as DeviceRef)
            .collect()
    }

    fn selected_device(&self) -> Option<usize> {
        self.selected_device.get()
    }

    fn stop_all_clips(&self) {
        for slot in self.memory_clip_slots() {
            if let Some(clip) = slot.memory_clip() {
                clip.stop();
            }
        }
    }

    fn jump_in_running_session_clip(&self, beats: f32) {
        for slot in self.memory_clip_slots() {
            if let Some(clip) = slot.memory_clip() {
                clip.advance(beats);
            }
        }
    }
}
