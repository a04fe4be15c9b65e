use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::fmt::{self, Debug};
use std::rc::{Rc, Weak};

use ahash::AHashMap;

use crate::*;

type Callback = Rc<RefCell<dyn FnMut(&Value)>>;

struct Subscriber {
    // Weak: a state cell never keeps a widget alive. The frame trees own widgets.
    widget: Weak<RefCell<Widget>>,
    // raised when the widget was busy during a set, see `Widget::flush_state_updates`
    dirty: Rc<Cell<bool>>,
}

struct StateInner {
    id: String,
    value: Value,
    widgets: AHashMap<WidgetId, Subscriber>,
    callbacks: BTreeMap<u64, Callback>,
    next_callback: u64,
}

/// A shared, observable value cell.
///
/// Widgets bound to a `State` rerun their class's `update_state` whenever it changes, and plain callbacks registered with [`State::on_change`] get the new value.
/// Both happen synchronously, before [`State::set`] returns.
///
/// `State` is a cheap handle: clones refer to the same cell.
#[derive(Clone)]
pub struct State(Rc<RefCell<StateInner>>);

impl State {
    pub(crate) fn new(id: String, value: Value) -> State {
        return State(Rc::new(RefCell::new(StateInner {
            id,
            value,
            widgets: AHashMap::new(),
            callbacks: BTreeMap::new(),
            next_callback: 0,
        })));
    }

    /// Create a cell that isn't tracked by any [`Ui`]. Useful for state owned by the application.
    pub fn detached(value: impl Into<Value>) -> State {
        return State::new(String::new(), value.into());
    }

    pub fn id(&self) -> String {
        return self.0.borrow().id.clone();
    }

    pub fn get(&self) -> Value {
        return self.0.borrow().value.clone();
    }

    pub fn with<T>(&self, f: impl FnOnce(&Value) -> T) -> T {
        return f(&self.0.borrow().value);
    }

    /// Set a new value and notify the subscribers.
    ///
    /// Setting a value equal to the current one does nothing.
    pub fn set(&self, value: impl Into<Value>) {
        let value = value.into();

        let (widgets, callbacks) = {
            let mut inner = self.0.borrow_mut();
            if inner.value == value {
                return;
            }
            inner.value = value.clone();
            inner.widgets.retain(|_, sub| sub.widget.strong_count() > 0);

            let widgets: Vec<_> = inner
                .widgets
                .values()
                .filter_map(|sub| Some((sub.widget.upgrade()?, sub.dirty.clone())))
                .collect();
            let callbacks: Vec<_> = inner.callbacks.values().cloned().collect();
            (widgets, callbacks)
        };

        for (widget, dirty) in widgets {
            match widget.try_borrow_mut() {
                Ok(mut widget) => widget.run_update_state(),
                Err(_) => {
                    // the reconciler runs update_state once it releases the widget
                    log::trace!("State {}: deferring the update of a widget that is currently being processed", self.0.borrow().id);
                    dirty.set(true);
                }
            }
        }

        for callback in callbacks {
            match callback.try_borrow_mut() {
                Ok(mut callback) => (callback)(&value),
                Err(_) => log::warn!("State {}: change callback set its own state recursively", self.0.borrow().id),
            }
        }
    }

    /// Register a callback that runs every time the value changes.
    pub fn on_change(&self, callback: impl FnMut(&Value) + 'static) -> Subscription {
        let mut inner = self.0.borrow_mut();
        let key = inner.next_callback;
        inner.next_callback += 1;
        inner.callbacks.insert(key, Rc::new(RefCell::new(callback)));
        return Subscription {
            state: Rc::downgrade(&self.0),
            key,
        };
    }

    pub(crate) fn subscribe(&self, widget: &Widget) {
        let subscriber = Subscriber {
            widget: widget.this.clone(),
            dirty: widget.state_dirty.clone(),
        };
        self.0.borrow_mut().widgets.insert(widget.id().clone(), subscriber);
    }

    /// Removes `widget`'s subscription. A newer widget that took over the same ID keeps its own.
    pub(crate) fn unsubscribe(&self, widget: &Widget) {
        let mut inner = self.0.borrow_mut();
        let same_widget = inner.widgets.get(widget.id()).is_some_and(|sub| sub.widget.ptr_eq(&widget.this));
        if same_widget {
            inner.widgets.remove(widget.id());
        }
    }

    /// Number of live widgets bound to this cell.
    pub fn subscribed_widgets(&self) -> usize {
        return self.0.borrow().widgets.values().filter(|sub| sub.widget.strong_count() > 0).count();
    }

    pub fn ptr_eq(&self, other: &State) -> bool {
        return Rc::ptr_eq(&self.0, &other.0);
    }
}

impl Debug for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.0.borrow();
        f.debug_struct("State")
            .field("id", &inner.id)
            .field("value", &inner.value)
            .field("widgets", &inner.widgets.len())
            .field("callbacks", &inner.callbacks.len())
            .finish()
    }
}

/// Returned by [`State::on_change`]. Dropping it keeps the callback connected.
pub struct Subscription {
    state: Weak<RefCell<StateInner>>,
    key: u64,
}

impl Subscription {
    pub fn unsubscribe(self) {
        if let Some(state) = self.state.upgrade() {
            state.borrow_mut().callbacks.remove(&self.key);
        }
    }
}

/// Either an existing [`State`] to bind, or the initial value for a cell the widget should own.
#[derive(Clone, Debug)]
pub enum StateArg {
    Cell(State),
    Initial(Value),
}

impl From<State> for StateArg {
    fn from(state: State) -> Self {
        StateArg::Cell(state)
    }
}

impl From<&State> for StateArg {
    fn from(state: &State) -> Self {
        StateArg::Cell(state.clone())
    }
}

macro_rules! impl_state_arg_from_value {
    ($($t:ty),*) => {
        $(
            impl From<$t> for StateArg {
                fn from(value: $t) -> Self {
                    StateArg::Initial(value.into())
                }
            }
        )*
    };
}

impl_state_arg_from_value!(Value, bool, f64, f32, i32, u32, i64, usize, &str, String);

/// The state bindings a widget is declared with, by semantic name.
///
/// ```rust
/// # use kasane::*;
/// # fn declare(ui: &mut Ui, checked: &State) -> Result<(), UiError> {
/// ui.insert("Checkbox", "Dark mode", States::new().with("isChecked", checked))?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug, Default)]
pub struct States(pub(crate) Vec<(&'static str, StateArg)>);

impl States {
    pub fn new() -> States {
        return States(Vec::new());
    }

    pub fn with(mut self, key: &'static str, state: impl Into<StateArg>) -> States {
        self.0.push((key, state.into()));
        return self;
    }
}

impl From<()> for States {
    fn from(_: ()) -> Self {
        States::new()
    }
}

/// All the cells owned by a [`Ui`], by ID.
pub struct StateTable {
    states: AHashMap<String, State>,
}

impl StateTable {
    pub(crate) fn new() -> StateTable {
        return StateTable {
            states: AHashMap::with_capacity(50),
        };
    }

    /// Returns the `key` cell of `widget`, creating it with `initial` if it doesn't exist yet, and binds the widget to it.
    ///
    /// The cell is keyed by widget ID and key, so a widget regenerated at the same ID reconnects to the same cell.
    pub fn widget_state(&mut self, widget: &mut Widget, key: &'static str, initial: impl Into<Value>) -> State {
        if let Some(existing) = widget.state.get(key) {
            return existing.clone();
        }

        let id = format!("{}#{}", widget.id(), key);
        let state = self.states.entry(id.clone()).or_insert_with(|| State::new(id, initial.into())).clone();
        state.subscribe(widget);
        widget.state.insert(key, state.clone());
        return state;
    }

    pub(crate) fn standalone(&mut self, id: WidgetId, initial: Value) -> State {
        let id = id.as_str().to_string();
        return self.states.entry(id.clone()).or_insert_with(|| State::new(id, initial)).clone();
    }

    /// Like `standalone`, but the cell starts over from `initial` whenever no widget is bound to it.
    pub(crate) fn weak(&mut self, id: WidgetId, initial: Value) -> State {
        let id = id.as_str().to_string();
        if let Some(existing) = self.states.get(&id) {
            if existing.subscribed_widgets() > 0 {
                return existing.clone();
            }
            log::trace!("Weak state {id} has no widgets left, recreating it");
        }
        let state = State::new(id.clone(), initial);
        self.states.insert(id, state.clone());
        return state;
    }

    pub(crate) fn computed(&mut self, id: WidgetId, source: &State, compute: impl Fn(&Value) -> Value + 'static) -> State {
        let id = id.as_str().to_string();
        if let Some(existing) = self.states.get(&id) {
            return existing.clone();
        }

        let derived = State::new(id.clone(), source.with(&compute));
        let weak_derived = Rc::downgrade(&derived.0);
        // the subscription lives as long as the source
        let _subscription = source.on_change(move |new_value| {
            if let Some(derived) = weak_derived.upgrade() {
                State(derived).set(compute(new_value));
            }
        });
        self.states.insert(id, derived.clone());
        return derived;
    }

    pub fn get(&self, id: &str) -> Option<&State> {
        return self.states.get(id);
    }

    pub fn len(&self) -> usize {
        return self.states.len();
    }

    pub fn is_empty(&self) -> bool {
        return self.states.is_empty();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn setting_an_equal_value_is_a_no_op() {
        let state = State::detached(Value::table([("a", 1)]));
        let calls = Rc::new(Cell::new(0));
        let calls_2 = calls.clone();
        let _sub = state.on_change(move |_| calls_2.set(calls_2.get() + 1));

        state.set(Value::table([("a", 1)]));
        assert_eq!(calls.get(), 0);

        state.set(Value::table([("a", 2)]));
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn setting_nan_twice_notifies_once() {
        let state = State::detached(0);
        let calls = Rc::new(Cell::new(0));
        let calls_2 = calls.clone();
        let _sub = state.on_change(move |_| calls_2.set(calls_2.get() + 1));

        state.set(f64::NAN);
        state.set(f64::NAN);
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn callbacks_run_in_subscription_order() {
        let state = State::detached(0);
        let log = Rc::new(RefCell::new(Vec::new()));

        let log_1 = log.clone();
        let first = state.on_change(move |v| log_1.borrow_mut().push(format!("first {v}")));
        let log_2 = log.clone();
        let _second = state.on_change(move |v| log_2.borrow_mut().push(format!("second {v}")));

        state.set(1);
        first.unsubscribe();
        state.set(2);

        assert_eq!(*log.borrow(), ["first 1", "second 1", "second 2"]);
    }

    #[test]
    fn computed_state_follows_its_source() {
        let mut table = StateTable::new();
        let source = State::detached(2);
        let doubled = table.computed(WidgetId::new("doubled"), &source, |v| {
            Value::Number(v.as_number().unwrap_or(0.0) * 2.0)
        });
        assert_eq!(doubled.get(), Value::Number(4.0));

        source.set(5);
        assert_eq!(doubled.get(), Value::Number(10.0));

        // same ID, same cell
        let again = table.computed(WidgetId::new("doubled"), &source, |_| Value::Nil);
        assert!(again.ptr_eq(&doubled));
    }

    #[test]
    fn weak_state_without_widgets_restarts() {
        let mut table = StateTable::new();
        let state = table.weak(WidgetId::new("w"), Value::from(1));
        state.set(7);

        let again = table.weak(WidgetId::new("w"), Value::from(1));
        assert!(!again.ptr_eq(&state));
        assert_eq!(again.get(), Value::from(1));

        let standalone = table.standalone(WidgetId::new("s"), Value::from(1));
        standalone.set(7);
        assert_eq!(table.standalone(WidgetId::new("s"), Value::from(1)).get(), Value::from(7));
    }
}
