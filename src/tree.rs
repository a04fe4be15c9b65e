use std::cell::RefCell;
use std::panic::Location;
use std::rc::{Rc, Weak};

use crate::*;

pub(crate) fn new_widget_ref(
    id: WidgetId,
    class: Rc<WidgetClass>,
    parent: Option<&WidgetRef>,
    z_index: i64,
    clock: Clock,
) -> WidgetRef {
    let parent = parent.map(|p| Rc::downgrade(&p.0));
    let rc = Rc::new_cyclic(|this: &Weak<RefCell<Widget>>| {
        RefCell::new(Widget::new(id, class, this.clone(), parent, z_index, clock))
    });
    return WidgetRef(rc);
}

impl Ui {
    /// Insert a widget of type `class_name` under the current parent.
    ///
    /// The widget's identity comes from the call site, so calling this from the same place every cycle keeps returning the same widget, and its visuals are only updated when `args` change.
    ///
    /// If the widget accepts children, it also opens a scope that has to be closed with [`Ui::end()`].
    #[track_caller]
    pub fn insert(&mut self, class_name: &str, args: impl Into<Args>, states: impl Into<States>) -> Result<WidgetRef, UiError> {
        return self.insert_at(Location::caller(), class_name, args.into(), states.into());
    }

    pub(crate) fn insert_at(
        &mut self,
        location: &'static Location<'static>,
        class_name: &str,
        args: Args,
        states: States,
    ) -> Result<WidgetRef, UiError> {
        if self.sys.shutdown {
            return Err(UiError::ShutDown);
        }
        if !self.sys.started {
            return Err(UiError::NotStarted);
        }

        let class = self.registry.get(class_name)?;
        let id = self.ids.resolve(location);
        self.sys.insert_count += 1;

        // already declared in this cycle: the scope was closed and reopened, or the same identity is reused
        if let Some(existing) = self.vdom.get(&id).cloned() {
            return self.continue_widget(existing, &class);
        }

        class.check_required_args(&args)?;

        let parent = self.parent_widget()?;
        let generation = self.clock.get();

        let mut reused = None;
        if let Some(previous) = self.last_vdom.get(&id).cloned() {
            let (same_class, same_parent, discarded) = {
                let previous = previous.borrow();
                let same_parent = previous.parent().is_some_and(|p| p.ptr_eq(&parent));
                (previous.class.name == class.name, same_parent, previous.is_discarded())
            };

            if discarded {
                // discarded earlier in this cycle, nothing to reuse
            } else if same_class && same_parent && !self.config.local_refresh_active() {
                log::trace!("Reusing {id}");
                reused = Some(previous);
            } else if same_class {
                log::trace!("Regenerating {id}");
                self.discard_widget(&previous);
            }
            // a different class at the same ID is left for the sweep
        }

        let is_new = reused.is_none();
        let widget = match reused {
            Some(widget) => widget,
            None => self.generate_widget(id.clone(), class.clone(), &parent, &args, states),
        };

        self.update_z_order(&widget, &parent, &class);

        {
            let mut w = widget.borrow_mut();
            if is_new || w.provided_arguments != args {
                log::trace!("Updating {id}");
                w.arguments = args.clone();
                w.provided_arguments = args;
                (class.update)(&mut w, &self.config);
            }
            // update may have set the widget's own cells
            w.flush_state_updates();

            w.last_cycle = generation;

            if class.has_children() {
                w.z_offset = 0;
                w.z_update = false;
            }
        }

        if class.has_children() {
            self.stacks.push_parent(id.clone());
        }

        self.vdom.insert(id, widget.clone());
        self.sys.last_widget = Some(widget.clone());
        return Ok(widget);
    }

    fn continue_widget(&mut self, existing: WidgetRef, class: &WidgetClass) -> Result<WidgetRef, UiError> {
        let id = existing.id();
        let existing_class = existing.borrow().class.name;
        if existing_class != class.name {
            return Err(UiError::IdCollision {
                id,
                existing: existing_class,
                requested: class.name,
            });
        }

        log::trace!("Continuing {id}");
        if existing.borrow().class.has_children() {
            self.stacks.push_parent(id);
        }
        self.sys.last_widget = Some(existing.clone());
        return Ok(existing);
    }

    fn parent_widget(&self) -> Result<WidgetRef, UiError> {
        let parent_id = self.stacks.current_parent();
        if let Some(parent) = self.vdom.get(parent_id) {
            return Ok(parent.clone());
        }

        invariant_violation("the current parent is not in the tree", parent_id);
        return self.root.clone().ok_or(UiError::NotStarted);
    }

    fn generate_widget(
        &mut self,
        id: WidgetId,
        class: Rc<WidgetClass>,
        parent: &WidgetRef,
        args: &Args,
        states: States,
    ) -> WidgetRef {
        log::trace!("Generating {} {id}", class.name);

        let z_index = parent.borrow().z_offset;
        let widget = new_widget_ref(id, class.clone(), Some(parent), z_index, self.clock.clone());

        let mut w = widget.borrow_mut();
        // generate can already look at the arguments. provided_arguments stays empty, so update runs right after.
        w.arguments = args.clone();

        let instance = (class.generate)(&mut w, &self.config);

        let container = {
            let mut p = parent.borrow_mut();
            match p.class.child_added {
                Some(child_added) => child_added(&mut p, &w),
                None => {
                    invariant_violation("parent widget doesn't accept children", p.id());
                    self.host_parent.clone()
                }
            }
        };
        instance.set_parent(Some(&container));
        instance.set("ZIndex", z_index);
        instance.set("LayoutOrder", z_index);
        w.instance = Some(instance);

        if class.has_state() {
            for (key, state) in states.0 {
                match state {
                    StateArg::Cell(state) => {
                        state.subscribe(&w);
                        w.state.insert(key, state);
                    }
                    StateArg::Initial(value) => {
                        self.states.widget_state(&mut w, key, value);
                    }
                }
            }
            if let Some(generate_state) = class.generate_state {
                generate_state(&mut w, &mut self.states);
            }
            w.run_update_state();
            w.flush_state_updates();
        } else if !states.0.is_empty() {
            log::warn!("{} doesn't take state, ignoring the states given to {}", class.name, w.id());
        }

        drop(w);
        return widget;
    }

    fn update_z_order(&mut self, widget: &WidgetRef, parent: &WidgetRef, class: &WidgetClass) {
        let mut p = parent.borrow_mut();
        let mut w = widget.borrow_mut();

        if !class.is_root_level() {
            if w.z_index != p.z_offset {
                p.z_update = true;
            }
            // once one sibling moved, every later sibling gets renumbered too
            if p.z_update {
                w.z_index = p.z_offset;
                if let Some(instance) = &w.instance {
                    instance.set("ZIndex", w.z_index);
                    instance.set("LayoutOrder", w.z_index);
                }
            }
        }
        p.z_offset += 1;
    }

    /// Parent a raw host object under the current parent's container. The [`Ui`] doesn't track it.
    pub fn append(&mut self, instance: &Instance) -> Result<(), UiError> {
        let parent = self.parent_widget()?;
        let parent = parent.borrow();
        let container = match &parent.instance {
            Some(parent_instance) => parent_instance.find_child(CHILD_CONTAINER).unwrap_or_else(|| parent_instance.clone()),
            None => self.host_parent.clone(),
        };
        instance.set_parent(Some(&container));
        return Ok(());
    }

    /// Tear down a widget: notify its parent, let its class destroy the visuals, and drop its state subscriptions.
    pub(crate) fn discard_widget(&mut self, widget: &WidgetRef) {
        let mut w = widget.borrow_mut();
        if w.is_discarded() {
            invariant_violation("widget discarded twice", w.id());
            return;
        }
        log::trace!("Discarding {}", w.id());

        if let Some(parent) = w.parent() {
            let mut p = parent.borrow_mut();
            if !p.is_discarded() {
                if let Some(child_discarded) = p.class.child_discarded {
                    child_discarded(&mut p, &w);
                }
            }
        }

        let discard = w.class.discard;
        discard(&mut w);
        w.unsubscribe_states();
        w.last_cycle = DISCARDED;
    }

    /// Discard every widget of the previous tree that wasn't declared in this cycle.
    pub(crate) fn sweep(&mut self) {
        let generation = self.clock.get();
        let mut stale: Vec<WidgetRef> = self
            .last_vdom
            .drain()
            .map(|(_, w)| w)
            .filter(|w| {
                let w = w.borrow();
                w.last_cycle != generation && !w.is_discarded()
            })
            .collect();
        // deterministic order, for the logs
        stale.sort_by_key(|w| w.id());

        if !stale.is_empty() {
            log::debug!("Sweeping {} widgets", stale.len());
        }
        for widget in &stale {
            self.discard_widget(widget);
        }
    }

    /// After a failed callback, keep the undeclared widgets of the previous tree alive instead of sweeping them.
    /// They'll be swept by the next cycle that completes.
    pub(crate) fn keep_stale_widgets(&mut self) {
        let generation = self.clock.get();
        let previous: Vec<(WidgetId, WidgetRef)> = self.last_vdom.drain().collect();
        let mut kept = 0;
        for (id, widget) in previous {
            {
                let w = widget.borrow();
                if w.last_cycle == generation || w.is_discarded() {
                    continue;
                }
            }
            if self.vdom.contains_key(&id) {
                // replaced by a widget of another type
                self.discard_widget(&widget);
            } else {
                self.vdom.insert(id, widget);
                kept += 1;
            }
        }
        log::debug!("A frame callback failed, keeping {kept} undeclared widgets as they were");
    }
}
