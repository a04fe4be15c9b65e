use std::cell::{Cell, Ref, RefCell, RefMut};
use std::fmt::{self, Debug};
use std::rc::{Rc, Weak};

use ahash::{AHashMap, AHashSet};

use crate::*;

/// `last_cycle` value of a widget that was already discarded.
pub(crate) const DISCARDED: u64 = u64::MAX;

const MAX_STATE_FLUSHES: usize = 16;

/// The reconciled unit: an identity, the native visuals it owns, its arguments and its state bindings.
///
/// Widget classes receive a `&mut Widget` in all their functions.
pub struct Widget {
    id: WidgetId,
    pub(crate) class: Rc<WidgetClass>,
    pub(crate) this: Weak<RefCell<Widget>>,
    // not an ownership edge: the frame trees own widgets.
    pub(crate) parent: Option<Weak<RefCell<Widget>>>,

    /// The native object this widget exclusively owns.
    pub instance: Option<Instance>,

    pub(crate) z_index: i64,
    pub(crate) z_offset: i64,
    pub(crate) z_update: bool,

    pub(crate) last_cycle: u64,
    pub(crate) tracked_events: AHashSet<&'static str>,

    // frozen copy of the arguments as they were given, for change detection
    pub(crate) provided_arguments: Args,
    /// The working copy of the arguments. The class's `update` may rewrite it.
    pub arguments: Args,

    pub state: AHashMap<&'static str, State>,
    // set by a State that changed while this widget was borrowed
    pub(crate) state_dirty: Rc<Cell<bool>>,

    /// Free-form per-widget bookkeeping for the widget class, like child counters.
    pub data: AHashMap<&'static str, Value>,

    pub(crate) clock: Clock,
    pub(crate) stamps: EventStamps,
}

impl Widget {
    pub(crate) fn new(
        id: WidgetId,
        class: Rc<WidgetClass>,
        this: Weak<RefCell<Widget>>,
        parent: Option<Weak<RefCell<Widget>>>,
        z_index: i64,
        clock: Clock,
    ) -> Widget {
        return Widget {
            id,
            class,
            this,
            parent,
            instance: None,
            z_index,
            z_offset: 0,
            z_update: false,
            last_cycle: 0,
            tracked_events: AHashSet::new(),
            provided_arguments: Args::empty(),
            arguments: Args::empty(),
            state: AHashMap::new(),
            state_dirty: Rc::new(Cell::new(false)),
            data: AHashMap::new(),
            clock,
            stamps: EventStamps::new(),
        };
    }

    pub fn id(&self) -> &WidgetId {
        return &self.id;
    }

    pub fn class_name(&self) -> &'static str {
        return self.class.name;
    }

    pub fn class(&self) -> &WidgetClass {
        return &self.class;
    }

    /// Read an argument by name, through the class's argument schema. Unknown or missing arguments read as `Nil`.
    pub fn arg(&self, name: &str) -> &Value {
        return match self.class.arg_index(name) {
            Some(i) => self.arguments.get(i),
            None => {
                log::warn!("{} has no argument \"{name}\"", self.class.name);
                self.arguments.get(usize::MAX)
            }
        };
    }

    pub fn parent(&self) -> Option<WidgetRef> {
        return self.parent.as_ref()?.upgrade().map(WidgetRef);
    }

    pub fn is_discarded(&self) -> bool {
        return self.last_cycle == DISCARDED;
    }

    pub fn last_cycle(&self) -> u64 {
        return self.last_cycle;
    }

    pub fn z_index(&self) -> i64 {
        return self.z_index;
    }

    pub fn state(&self, key: &str) -> Option<&State> {
        return self.state.get(key);
    }

    /// The current value of the `key` state cell, or `Nil` if the widget has no such cell.
    pub fn state_value(&self, key: &str) -> Value {
        return self.state.get(key).map(State::get).unwrap_or_default();
    }

    /// The generation the [`Ui`] is currently on.
    pub fn generation(&self) -> u64 {
        return self.clock.get();
    }

    /// Destroys the native instance, if any. The usual body of a class's `discard`.
    pub fn destroy_instance(&mut self) {
        if let Some(instance) = self.instance.take() {
            instance.destroy();
        }
    }

    /// Returns a handler that records `event` as happened, for use in native signal connections.
    ///
    /// The event becomes visible to [`Widget::event_happened`] during the next cycle only.
    pub fn event_stamper(&self, event: &'static str) -> impl Fn() + use<> {
        let stamps = self.stamps.clone();
        let clock = self.clock.clone();
        return move || stamps.stamp(event, clock.get() + 1);
    }

    /// Returns `true` if `event` was stamped for the current generation.
    pub fn event_happened(&self, event: &'static str) -> bool {
        return self.stamps.get(event) == Some(self.clock.get());
    }

    /// Returns a handler that sets the level-style `event` flag, like "hovered" on pointer enter and leave.
    pub fn event_flag_setter(&self, event: &'static str, value: bool) -> impl Fn() + use<> {
        let stamps = self.stamps.clone();
        return move || stamps.set_flag(event, value);
    }

    pub fn event_flag(&self, event: &'static str) -> bool {
        return self.stamps.flag(event);
    }

    pub(crate) fn run_update_state(&mut self) {
        self.state_dirty.set(false);
        if self.is_discarded() {
            return;
        }
        if let Some(update_state) = self.class.update_state {
            update_state(self);
        }
    }

    /// Run the `update_state` calls that were deferred because a bound cell changed while the widget was borrowed,
    /// for example by the class's own `update`.
    pub(crate) fn flush_state_updates(&mut self) {
        let mut rounds = 0;
        while self.state_dirty.get() {
            if rounds == MAX_STATE_FLUSHES {
                log::warn!("{}: update_state keeps changing its own state, giving up", self.id);
                self.state_dirty.set(false);
                return;
            }
            self.run_update_state();
            rounds += 1;
        }
    }

    pub(crate) fn unsubscribe_states(&mut self) {
        for state in self.state.values() {
            state.unsubscribe(self);
        }
    }
}

impl Debug for Widget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Widget")
            .field("id", &self.id)
            .field("class", &self.class.name)
            .field("z_index", &self.z_index)
            .field("last_cycle", &self.last_cycle)
            .field("arguments", &self.arguments)
            .finish()
    }
}

/// A handle to a widget, as returned by [`Ui::insert`] and the widget constructors.
///
/// Inserting the same widget again in a later cycle returns a handle to the same widget.
#[derive(Clone)]
pub struct WidgetRef(pub(crate) Rc<RefCell<Widget>>);

impl WidgetRef {
    pub fn id(&self) -> WidgetId {
        return self.0.borrow().id.clone();
    }

    pub fn borrow(&self) -> Ref<'_, Widget> {
        return self.0.borrow();
    }

    pub fn borrow_mut(&self) -> RefMut<'_, Widget> {
        return self.0.borrow_mut();
    }

    pub fn instance(&self) -> Option<Instance> {
        return self.0.borrow().instance.clone();
    }

    pub fn state(&self, key: &str) -> Option<State> {
        return self.0.borrow().state.get(key).cloned();
    }

    pub fn ptr_eq(&self, other: &WidgetRef) -> bool {
        return Rc::ptr_eq(&self.0, &other.0);
    }
}

impl Debug for WidgetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.try_borrow() {
            Ok(widget) => widget.fmt(f),
            Err(_) => write!(f, "WidgetRef(<borrowed>)"),
        }
    }
}
