//! The host scene graph that widgets build their visuals out of.
//!
//! The reconciler treats [`Instance`]s as opaque: it only ever parents them, sets a couple of ordering properties, and relies on widget classes to destroy them.
//! This in-memory implementation is enough to drive the engine from tests and demos. A real host would mirror these operations onto its own retained objects.

use std::cell::RefCell;
use std::fmt::{self, Debug};
use std::mem;
use std::rc::{Rc, Weak};

use ahash::AHashMap;
use slab::Slab;

use crate::*;

struct InstanceData {
    class_name: &'static str,
    name: String,
    properties: AHashMap<String, Value>,
    children: Vec<Instance>,
    parent: Weak<RefCell<InstanceData>>,
    signals: AHashMap<&'static str, Signal>,
    destroyed: bool,
}

/// A handle to a retained host object. Cloning the handle doesn't clone the object.
#[derive(Clone)]
pub struct Instance(Rc<RefCell<InstanceData>>);

impl Instance {
    pub fn new(class_name: &'static str) -> Instance {
        return Instance(Rc::new(RefCell::new(InstanceData {
            class_name,
            name: class_name.to_string(),
            properties: AHashMap::new(),
            children: Vec::new(),
            parent: Weak::new(),
            signals: AHashMap::new(),
            destroyed: false,
        })));
    }

    pub fn class_name(&self) -> &'static str {
        return self.0.borrow().class_name;
    }

    pub fn name(&self) -> String {
        return self.0.borrow().name.clone();
    }

    pub fn set_name(&self, name: impl Into<String>) {
        self.0.borrow_mut().name = name.into();
    }

    /// Set a property. Setting a property to the value it already has is allowed and does nothing special.
    pub fn set(&self, property: &str, value: impl Into<Value>) {
        let mut data = self.0.borrow_mut();
        if data.destroyed {
            log::warn!("Setting property {property} on destroyed instance \"{}\"", data.name);
            return;
        }
        data.properties.insert(property.to_string(), value.into());
    }

    pub fn get(&self, property: &str) -> Value {
        return self.0.borrow().properties.get(property).cloned().unwrap_or_default();
    }

    pub fn parent(&self) -> Option<Instance> {
        return self.0.borrow().parent.upgrade().map(Instance);
    }

    pub fn children(&self) -> Vec<Instance> {
        return self.0.borrow().children.clone();
    }

    pub fn find_child(&self, name: &str) -> Option<Instance> {
        let data = self.0.borrow();
        return data.children.iter().find(|c| c.0.borrow().name == name).cloned();
    }

    /// Moves the instance under `new_parent`, or detaches it with `None`.
    pub fn set_parent(&self, new_parent: Option<&Instance>) {
        if self.is_destroyed() {
            log::warn!("Tried to reparent destroyed instance \"{}\"", self.name());
            return;
        }
        if let Some(new_parent) = new_parent {
            if new_parent.ptr_eq(self) {
                log::error!("Tried to parent instance \"{}\" to itself", self.name());
                return;
            }
            if new_parent.is_destroyed() {
                log::warn!("Tried to parent \"{}\" under a destroyed instance", self.name());
                return;
            }
        }

        let old_parent = self.parent();
        if let Some(old_parent) = old_parent {
            old_parent.0.borrow_mut().children.retain(|c| !c.ptr_eq(self));
        }

        match new_parent {
            Some(new_parent) => {
                new_parent.0.borrow_mut().children.push(self.clone());
                self.0.borrow_mut().parent = Rc::downgrade(&new_parent.0);
            }
            None => {
                self.0.borrow_mut().parent = Weak::new();
            }
        }
    }

    /// Returns the named signal, creating it on first use.
    pub fn signal(&self, name: &'static str) -> Signal {
        let mut data = self.0.borrow_mut();
        return data.signals.entry(name).or_insert_with(Signal::new).clone();
    }

    /// Destroys the instance and all its descendants, and disconnects their signals.
    ///
    /// Destroying twice is harmless.
    pub fn destroy(&self) {
        if self.is_destroyed() {
            return;
        }
        self.set_parent(None);
        self.destroy_subtree();
    }

    fn destroy_subtree(&self) {
        let (children, signals) = {
            let mut data = self.0.borrow_mut();
            if data.destroyed {
                return;
            }
            data.destroyed = true;
            (mem::take(&mut data.children), mem::take(&mut data.signals))
        };

        for signal in signals.values() {
            signal.disconnect_all();
        }
        for child in children {
            child.0.borrow_mut().parent = Weak::new();
            child.destroy_subtree();
        }
    }

    pub fn is_destroyed(&self) -> bool {
        return self.0.borrow().destroyed;
    }

    pub fn ptr_eq(&self, other: &Instance) -> bool {
        return Rc::ptr_eq(&self.0, &other.0);
    }
}

impl Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let data = self.0.borrow();
        f.debug_struct("Instance")
            .field("class_name", &data.class_name)
            .field("name", &data.name)
            .field("children", &data.children.len())
            .field("destroyed", &data.destroyed)
            .finish()
    }
}

type Handlers = RefCell<Slab<Rc<dyn Fn()>>>;

/// A host input signal, like "pointer entered" or "activated".
///
/// Handlers run synchronously when the host calls [`Signal::fire`]. They are expected to only write small shared cells, never to touch the reconciler.
#[derive(Clone)]
pub struct Signal {
    handlers: Rc<Handlers>,
}

impl Signal {
    pub fn new() -> Signal {
        return Signal {
            handlers: Rc::new(RefCell::new(Slab::new())),
        };
    }

    pub fn connect(&self, handler: impl Fn() + 'static) -> SignalConnection {
        let key = self.handlers.borrow_mut().insert(Rc::new(handler));
        return SignalConnection {
            handlers: Rc::downgrade(&self.handlers),
            key,
        };
    }

    pub fn fire(&self) {
        // handlers may connect or disconnect while running
        let handlers: Vec<Rc<dyn Fn()>> = self.handlers.borrow().iter().map(|(_, h)| h.clone()).collect();
        for handler in handlers {
            handler();
        }
    }

    pub fn connection_count(&self) -> usize {
        return self.handlers.borrow().len();
    }

    fn disconnect_all(&self) {
        self.handlers.borrow_mut().clear();
    }
}

impl Default for Signal {
    fn default() -> Self {
        Self::new()
    }
}

pub struct SignalConnection {
    handlers: Weak<Handlers>,
    key: usize,
}

impl SignalConnection {
    pub fn disconnect(self) {
        if let Some(handlers) = self.handlers.upgrade() {
            handlers.borrow_mut().try_remove(self.key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn reparenting_moves_children() {
        let a = Instance::new("Frame");
        let b = Instance::new("Frame");
        let child = Instance::new("TextLabel");

        child.set_parent(Some(&a));
        assert_eq!(a.children().len(), 1);

        child.set_parent(Some(&b));
        assert_eq!(a.children().len(), 0);
        assert_eq!(b.children().len(), 1);
        assert!(child.parent().unwrap().ptr_eq(&b));
    }

    #[test]
    fn destroy_is_recursive_and_idempotent() {
        let root = Instance::new("Folder");
        let frame = Instance::new("Frame");
        let label = Instance::new("TextLabel");
        frame.set_parent(Some(&root));
        label.set_parent(Some(&frame));

        let fired = Rc::new(Cell::new(0));
        let fired_2 = fired.clone();
        let signal = label.signal("Activated");
        let _connection = signal.connect(move || fired_2.set(fired_2.get() + 1));

        frame.destroy();
        frame.destroy();

        assert!(frame.is_destroyed());
        assert!(label.is_destroyed());
        assert_eq!(root.children().len(), 0);

        signal.fire();
        assert_eq!(fired.get(), 0);
    }

    #[test]
    fn disconnected_handlers_dont_run() {
        let signal = Signal::new();
        let count = Rc::new(Cell::new(0));

        let count_2 = count.clone();
        let connection = signal.connect(move || count_2.set(count_2.get() + 1));
        signal.fire();
        connection.disconnect();
        signal.fire();

        assert_eq!(count.get(), 1);
        assert_eq!(signal.connection_count(), 0);
    }
}
