//! In-memory parameters and devices

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::entity::Event;
use crate::error::{ModelError, Result};
use crate::graph::{Device, Parameter, ParameterRef};
use crate::memory::source::{EventSource, IdGen};

// ============================================================================
// MemoryParameter
// ============================================================================

/// A bounded continuous value (mixer control or device parameter)
#[derive(Debug)]
pub struct MemoryParameter {
    source: EventSource,
    name: RefCell<String>,
    value: Cell<f32>,
    min: f32,
    max: f32,
}

observable!(MemoryParameter);

impl MemoryParameter {
    pub fn new(ids: &IdGen, name: &str, value: f32, min: f32, max: f32) -> Rc<Self> {
        Rc::new(Self {
            source: EventSource::new(ids.next_id(), &[Event::Value]),
            name: RefCell::new(name.to_string()),
            value: Cell::new(value.clamp(min, max)),
            min,
            max,
        })
    }

    pub fn kill(&self) {
        self.source.kill();
    }

    pub fn listener_count(&self) -> usize {
        self.source.total_listeners()
    }
}

impl Parameter for MemoryParameter {
    fn name(&self) -> String {
        self.name.borrow().clone()
    }

    fn value(&self) -> f32 {
        self.value.get()
    }

    fn set_value(&self, value: f32) -> Result<()> {
        self.source.ensure_alive()?;
        if !value.is_finite() || value < self.min || value > self.max {
            return Err(ModelError::InvalidValue(format!(
                "{} outside [{}, {}] for {}",
                value,
                self.min,
                self.max,
                self.name.borrow()
            )));
        }
        if self.value.get() != value {
            self.value.set(value);
            self.source.fire(Event::Value);
        }
        Ok(())
    }

    fn min(&self) -> f32 {
        self.min
    }

    fn max(&self) -> f32 {
        self.max
    }
}

// ============================================================================
// MemoryDevice
// ============================================================================

/// A device in a track's chain
#[derive(Debug)]
pub struct MemoryDevice {
    source: EventSource,
    ids: IdGen,
    name: String,
    parameters: RefCell<Vec<Rc<MemoryParameter>>>,
}

observable!(MemoryDevice);

impl MemoryDevice {
    pub fn new(ids: &IdGen, name: &str) -> Rc<Self> {
        Rc::new(Self {
            source: EventSource::new(ids.next_id(), &[Event::Parameters]),
            ids: ids.clone(),
            name: name.to_string(),
            parameters: RefCell::new(Vec::new()),
        })
    }

    /// Append a parameter and fire the parameter-list event
    pub fn add_parameter(&self, name: &str, value: f32, min: f32, max: f32) -> Rc<MemoryParameter> {
        let param = MemoryParameter::new(&self.ids, name, value, min, max);
        self.parameters.borrow_mut().push(Rc::clone(&param));
        self.source.fire(Event::Parameters);
        param
    }

    /// Remove and kill a parameter, firing the parameter-list event
    pub fn remove_parameter(&self, index: usize) -> Result<Rc<MemoryParameter>> {
        let param = {
            let mut params = self.parameters.borrow_mut();
            if index >= params.len() {
                return Err(ModelError::IndexOutOfRange {
                    what: "parameter",
                    index,
                    len: params.len(),
                });
            }
            params.remove(index)
        };
        param.kill();
        self.source.fire(Event::Parameters);
        Ok(param)
    }

    pub fn parameter(&self, index: usize) -> Option<Rc<MemoryParameter>> {
        self.parameters.borrow().get(index).cloned()
    }

    pub fn kill(&self) {
        for param in self.parameters.borrow().iter() {
            param.kill();
        }
        self.source.kill();
    }

    /// Listeners on the device and all of its parameters
    pub fn listener_count(&self) -> usize {
        self.source.total_listeners()
            + self
                .parameters
                .borrow()
                .iter()
                .map(|p| p.listener_count())
                .sum::<usize>()
    }
}

impl Device for MemoryDevice {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn parameters(&self) -> Vec<ParameterRef> {
        self.parameters
            .borrow()
            .iter()
            .map(|p| Rc::clone(p) as ParameterRef)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{Entity, Listener, Observable};

    #[test]
    fn test_set_value_fires_only_on_change() {
        let ids = IdGen::new();
        let param = MemoryParameter::new(&ids, "Cutoff", 0.5, 0.0, 1.0);
        let hits = Rc::new(Cell::new(0));
        let counter = Rc::clone(&hits);
        param
            .add_listener(Event::Value, &Listener::new(move || counter.set(counter.get() + 1)))
            .unwrap();

        param.set_value(0.7).unwrap();
        param.set_value(0.7).unwrap();
        assert_eq!(hits.get(), 1);
        assert_eq!(param.value(), 0.7);
    }

    #[test]
    fn test_set_value_out_of_range() {
        let ids = IdGen::new();
        let param = MemoryParameter::new(&ids, "Pan", 0.0, -1.0, 1.0);
        assert!(matches!(param.set_value(1.5), Err(ModelError::InvalidValue(_))));
        assert!(matches!(param.set_value(f32::NAN), Err(ModelError::InvalidValue(_))));
        assert_eq!(param.value(), 0.0);
    }

    #[test]
    fn test_remove_parameter_kills_it() {
        let ids = IdGen::new();
        let device = MemoryDevice::new(&ids, "EQ Eight");
        device.add_parameter("Gain", 0.0, -15.0, 15.0);
        let freq = device.add_parameter("Freq", 100.0, 20.0, 20000.0);

        let removed = device.remove_parameter(1).unwrap();
        assert_eq!(removed.entity_id(), freq.entity_id());
        assert!(!freq.is_alive());
        assert_eq!(device.parameters().len(), 1);
        assert!(device.remove_parameter(4).is_err());
    }
}
