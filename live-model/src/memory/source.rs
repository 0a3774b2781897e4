//! Listener bookkeeping shared by every in-memory entity

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use tracing::trace;

use crate::entity::{EntityId, Event, Listener};
use crate::error::{ModelError, Result};

// ============================================================================
// IdGen - monotonically increasing entity ids
// ============================================================================

/// Id allocator shared by one in-memory document
///
/// Ids are never reused, so a removed track and its replacement never compare
/// equal.
#[derive(Debug, Clone, Default)]
pub struct IdGen(Rc<Cell<u64>>);

impl IdGen {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&self) -> EntityId {
        let id = self.0.get() + 1;
        self.0.set(id);
        EntityId::new(id)
    }
}

// ============================================================================
// EventSource - per-entity listener lists
// ============================================================================

/// Native event source for one entity
///
/// Holds a listener list per supported event. Attaching the same listener
/// twice fails with [`ModelError::AlreadyConnected`]; once the entity is
/// killed every operation reports it as stale.
#[derive(Debug)]
pub struct EventSource {
    id: EntityId,
    supported: Vec<Event>,
    alive: Cell<bool>,
    listeners: RefCell<HashMap<Event, Vec<Listener>>>,
}

impl EventSource {
    pub fn new(id: EntityId, supported: &[Event]) -> Self {
        Self {
            id,
            supported: supported.to_vec(),
            alive: Cell::new(true),
            listeners: RefCell::new(HashMap::new()),
        }
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn is_alive(&self) -> bool {
        self.alive.get()
    }

    pub fn supports(&self, event: Event) -> bool {
        self.supported.contains(&event)
    }

    /// Fails with [`ModelError::StaleEntity`] once killed
    pub fn ensure_alive(&self) -> Result<()> {
        if self.is_alive() {
            Ok(())
        } else {
            Err(ModelError::StaleEntity(self.id))
        }
    }

    /// Mark the entity as removed from the host; all listeners are dropped
    pub fn kill(&self) {
        self.alive.set(false);
        self.listeners.borrow_mut().clear();
    }

    pub fn add(&self, event: Event, listener: &Listener) -> Result<()> {
        self.ensure_alive()?;
        if !self.supports(event) {
            return Err(ModelError::Unsupported {
                entity: self.id,
                event,
            });
        }

        let mut listeners = self.listeners.borrow_mut();
        let list = listeners.entry(event).or_default();
        if list.contains(listener) {
            return Err(ModelError::AlreadyConnected {
                entity: self.id,
                event,
            });
        }
        list.push(listener.clone());
        Ok(())
    }

    pub fn remove(&self, event: Event, listener: &Listener) -> Result<()> {
        self.ensure_alive()?;

        let mut listeners = self.listeners.borrow_mut();
        if let Some(list) = listeners.get_mut(&event) {
            if let Some(pos) = list.iter().position(|x| x == listener) {
                list.remove(pos);
                return Ok(());
            }
        }
        Err(ModelError::ListenerNotFound {
            entity: self.id,
            event,
        })
    }

    pub fn has(&self, event: Event, listener: &Listener) -> bool {
        self.listeners
            .borrow()
            .get(&event)
            .map(|list| list.contains(listener))
            .unwrap_or(false)
    }

    /// Listeners attached to one event
    pub fn listener_count(&self, event: Event) -> usize {
        self.listeners
            .borrow()
            .get(&event)
            .map(Vec::len)
            .unwrap_or(0)
    }

    /// Listeners attached across all events
    pub fn total_listeners(&self) -> usize {
        self.listeners.borrow().values().map(Vec::len).sum()
    }

    /// Notify every listener attached to `event`
    ///
    /// The list is snapshotted first so callbacks may attach or detach
    /// listeners on this same entity.
    pub fn fire(&self, event: Event) {
        if !self.is_alive() {
            return;
        }
        let snapshot: Vec<Listener> = self
            .listeners
            .borrow()
            .get(&event)
            .cloned()
            .unwrap_or_default();

        if !snapshot.is_empty() {
            trace!("{} firing {:?} to {} listener(s)", self.id, event, snapshot.len());
        }
        for listener in snapshot {
            listener.call();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source() -> EventSource {
        EventSource::new(EntityId::new(7), &[Event::Name, Event::Mute])
    }

    #[test]
    fn test_id_gen_never_repeats() {
        let ids = IdGen::new();
        let shared = ids.clone();
        let a = ids.next_id();
        let b = shared.next_id();
        assert_ne!(a, b);
        assert!(b > a);
    }

    #[test]
    fn test_add_remove_has() {
        let src = source();
        let listener = Listener::new(|| {});

        src.add(Event::Name, &listener).unwrap();
        assert!(src.has(Event::Name, &listener));
        assert!(!src.has(Event::Mute, &listener));

        src.remove(Event::Name, &listener).unwrap();
        assert!(!src.has(Event::Name, &listener));
        assert_eq!(src.total_listeners(), 0);
    }

    #[test]
    fn test_duplicate_add_rejected() {
        let src = source();
        let listener = Listener::new(|| {});

        src.add(Event::Name, &listener).unwrap();
        let err = src.add(Event::Name, &listener).unwrap_err();
        assert!(matches!(err, ModelError::AlreadyConnected { .. }));
        assert_eq!(src.listener_count(Event::Name), 1);
    }

    #[test]
    fn test_unsupported_event() {
        let src = source();
        let err = src.add(Event::Tempo, &Listener::new(|| {})).unwrap_err();
        assert!(matches!(err, ModelError::Unsupported { event: Event::Tempo, .. }));
    }

    #[test]
    fn test_remove_unknown_listener() {
        let src = source();
        let err = src.remove(Event::Mute, &Listener::new(|| {})).unwrap_err();
        assert!(matches!(err, ModelError::ListenerNotFound { .. }));
    }

    #[test]
    fn test_kill_clears_and_rejects() {
        let src = source();
        let listener = Listener::new(|| {});
        src.add(Event::Name, &listener).unwrap();

        src.kill();
        assert!(!src.is_alive());
        assert_eq!(src.total_listeners(), 0);
        assert!(matches!(
            src.add(Event::Name, &listener),
            Err(ModelError::StaleEntity(_))
        ));
    }

    #[test]
    fn test_fire_tolerates_detach_during_callback() {
        let src = Rc::new(source());
        let hits = Rc::new(Cell::new(0));

        let slot: Rc<RefCell<Option<Listener>>> = Rc::new(RefCell::new(None));
        let listener = {
            let src = Rc::clone(&src);
            let hits = Rc::clone(&hits);
            let slot = Rc::clone(&slot);
            Listener::new(move || {
                hits.set(hits.get() + 1);
                if let Some(me) = slot.borrow().as_ref() {
                    let _ = src.remove(Event::Name, me);
                }
            })
        };
        *slot.borrow_mut() = Some(listener.clone());
        src.add(Event::Name, &listener).unwrap();

        src.fire(Event::Name);
        src.fire(Event::Name);
        assert_eq!(hits.get(), 1);
    }
}
