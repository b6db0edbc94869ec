//! Input listener registry
//!
//! Bookkeeping only: listeners are kept in registration order and removed by
//! the [`ListenerId`] returned when they were added. Whoever runs the event
//! loop walks the registry to deliver events.

use crate::protocol::{event_mask, InputEvent};

/// Observer of input events
pub trait InputListener {
    fn on_event(&mut self, event: &InputEvent);

    /// Event categories this listener wants the window to report
    fn event_mask(&self) -> u32 {
        event_mask::KEY_PRESS
            | event_mask::KEY_RELEASE
            | event_mask::BUTTON_PRESS
            | event_mask::BUTTON_RELEASE
            | event_mask::POINTER_MOTION
            | event_mask::EXPOSURE
    }
}

/// Handle for removing a registered listener
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

/// Ordered collection of input listeners
#[derive(Default)]
pub struct InputListenerRegistry {
    listeners: Vec<(ListenerId, Box<dyn InputListener>)>,
    next_id: u64,
}

impl InputListenerRegistry {
    pub fn new() -> Self {
        InputListenerRegistry::default()
    }

    pub fn add(&mut self, listener: Box<dyn InputListener>) -> ListenerId {
        self.next_id += 1;
        let id = ListenerId(self.next_id);
        self.listeners.push((id, listener));
        id
    }

    /// Remove and return the listener, if it is still registered
    pub fn remove(&mut self, id: ListenerId) -> Option<Box<dyn InputListener>> {
        let index = self.listeners.iter().position(|(l, _)| *l == id)?;
        Some(self.listeners.remove(index).1)
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    /// Registered ids, oldest first
    pub fn ids(&self) -> Vec<ListenerId> {
        self.listeners.iter().map(|(id, _)| *id).collect()
    }

    /// Union of every listener's event mask
    pub fn combined_mask(&self) -> u32 {
        self.listeners
            .iter()
            .fold(event_mask::NO_EVENT, |mask, (_, l)| mask | l.event_mask())
    }

    /// Hand `event` to every listener that selected it, in registration order
    pub fn notify(&mut self, event: &InputEvent) -> usize {
        let mut delivered = 0;
        for (_, listener) in self.listeners.iter_mut() {
            if listener.event_mask() & event.mask() != 0 {
                listener.on_event(event);
                delivered += 1;
            }
        }
        delivered
    }
}

impl std::fmt::Debug for InputListenerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InputListenerRegistry")
            .field("listeners", &self.ids())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{ExposeEvent, Window};
    use std::cell::RefCell;
    use std::rc::Rc;

    struct Recorder {
        name: &'static str,
        mask: u32,
        log: Rc<RefCell<Vec<&'static str>>>,
    }

    impl InputListener for Recorder {
        fn on_event(&mut self, _event: &InputEvent) {
            self.log.borrow_mut().push(self.name);
        }

        fn event_mask(&self) -> u32 {
            self.mask
        }
    }

    fn expose() -> InputEvent {
        InputEvent::Expose(ExposeEvent {
            window: Window::new(1),
            x: 0,
            y: 0,
            width: 10,
            height: 10,
            count: 0,
        })
    }

    #[test]
    fn test_notifies_in_registration_order() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut registry = InputListenerRegistry::new();
        for name in ["a", "b", "c"] {
            registry.add(Box::new(Recorder {
                name,
                mask: event_mask::EXPOSURE,
                log: Rc::clone(&log),
            }));
        }
        assert_eq!(registry.notify(&expose()), 3);
        assert_eq!(*log.borrow(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_remove_by_id() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut registry = InputListenerRegistry::new();
        let first = registry.add(Box::new(Recorder {
            name: "first",
            mask: event_mask::EXPOSURE,
            log: Rc::clone(&log),
        }));
        let second = registry.add(Box::new(Recorder {
            name: "second",
            mask: event_mask::EXPOSURE,
            log: Rc::clone(&log),
        }));

        assert!(registry.remove(first).is_some());
        assert!(registry.remove(first).is_none());
        assert_eq!(registry.ids(), vec![second]);

        registry.notify(&expose());
        assert_eq!(*log.borrow(), vec!["second"]);
    }

    #[test]
    fn test_combined_mask_and_filtering() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut registry = InputListenerRegistry::new();
        assert_eq!(registry.combined_mask(), event_mask::NO_EVENT);
        registry.add(Box::new(Recorder {
            name: "keys",
            mask: event_mask::KEY_PRESS,
            log: Rc::clone(&log),
        }));
        registry.add(Box::new(Recorder {
            name: "paint",
            mask: event_mask::EXPOSURE,
            log: Rc::clone(&log),
        }));
        assert_eq!(
            registry.combined_mask(),
            event_mask::KEY_PRESS | event_mask::EXPOSURE
        );

        assert_eq!(registry.notify(&expose()), 1);
        assert_eq!(*log.borrow(), vec!["paint"]);
    }
}
