use std::rc::Rc;

use ahash::AHashMap;
use bitflags::bitflags;

use crate::*;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ClassFlags: u8 {
        /// The widget opens a scope that has to be closed with [`Ui::end()`].
        const HAS_CHILDREN = 1 << 0;
        /// The widget binds [`State`] cells.
        const HAS_STATE = 1 << 1;
        /// The widget sits at the root level of the host (like a window), and doesn't take part in its parent's sibling ordering.
        const ROOT_LEVEL = 1 << 2;
    }
}

/// One entry of a widget class's positional argument schema.
#[derive(Debug, Clone, Copy)]
pub struct Arg {
    pub name: &'static str,
    pub required: bool,
}

impl Arg {
    pub const fn required(name: &'static str) -> Arg {
        return Arg { name, required: true };
    }

    pub const fn optional(name: &'static str) -> Arg {
        return Arg { name, required: false };
    }
}

/// A lazily wired queryable event. See [`WidgetRef::event`].
#[derive(Debug, Clone, Copy)]
pub struct Event {
    /// Runs once, the first time the event is queried on a widget. Usually it connects to a native signal.
    pub init: fn(&mut Widget),
    /// Reads the event's current value.
    pub get: fn(&Widget) -> bool,
}

/// The behaviour of a widget type.
///
/// The reconciler never knows about concrete widget kinds: it calls through these functions only.
///
/// * `generate` builds the native visuals, and runs once per widget instance.
/// * `update` applies the current arguments to the visuals. It only runs when the arguments changed.
/// * `discard` destroys the visuals.
///
/// The state functions are required for classes with [`ClassFlags::HAS_STATE`], the child functions for classes with [`ClassFlags::HAS_CHILDREN`].
#[derive(Debug, Clone, Copy)]
pub struct WidgetClass {
    pub name: &'static str,
    pub flags: ClassFlags,
    pub args: &'static [Arg],
    pub events: &'static [(&'static str, Event)],

    pub generate: fn(&mut Widget, &Config) -> Instance,
    pub update: fn(&mut Widget, &Config),
    pub discard: fn(&mut Widget),

    pub generate_state: Option<fn(&mut Widget, &mut StateTable)>,
    pub update_state: Option<fn(&mut Widget)>,

    /// Returns the native container that a new child's visuals should be parented under.
    pub child_added: Option<fn(&mut Widget, &Widget) -> Instance>,
    pub child_discarded: Option<fn(&mut Widget, &Widget)>,
}

impl WidgetClass {
    pub fn has_children(&self) -> bool {
        return self.flags.contains(ClassFlags::HAS_CHILDREN);
    }

    pub fn has_state(&self) -> bool {
        return self.flags.contains(ClassFlags::HAS_STATE);
    }

    pub fn is_root_level(&self) -> bool {
        return self.flags.contains(ClassFlags::ROOT_LEVEL);
    }

    pub fn arg_index(&self, name: &str) -> Option<usize> {
        return self.args.iter().position(|a| a.name == name);
    }

    pub fn event(&self, name: &str) -> Option<&Event> {
        return self.events.iter().find(|(n, _)| *n == name).map(|(_, e)| e);
    }

    pub(crate) fn check_required_args(&self, args: &Args) -> Result<(), UiError> {
        for (i, arg) in self.args.iter().enumerate() {
            if arg.required && args.get(i).is_nil() {
                return Err(UiError::MissingArgument {
                    widget: self.name,
                    argument: arg.name,
                });
            }
        }
        return Ok(());
    }

    fn validate(&self) -> Result<(), UiError> {
        let missing = |field| UiError::MissingClassField { class: self.name, field };
        if self.has_state() {
            if self.generate_state.is_none() {
                return Err(missing("generate_state"));
            }
            if self.update_state.is_none() {
                return Err(missing("update_state"));
            }
        }
        if self.has_children() {
            if self.child_added.is_none() {
                return Err(missing("child_added"));
            }
            if self.child_discarded.is_none() {
                return Err(missing("child_discarded"));
            }
        }
        return Ok(());
    }
}

/// The table of widget classes, filled before the [`Ui`] starts and fixed afterwards.
pub struct Registry {
    classes: AHashMap<&'static str, Rc<WidgetClass>>,
    closed: bool,
}

impl Registry {
    pub fn new() -> Registry {
        return Registry {
            classes: AHashMap::with_capacity(20),
            closed: false,
        };
    }

    pub fn register(&mut self, class: WidgetClass) -> Result<(), UiError> {
        if self.closed {
            return Err(UiError::RegistryClosed);
        }
        class.validate()?;
        if self.classes.contains_key(class.name) {
            return Err(UiError::DuplicateClass(class.name));
        }
        log::trace!("Registered widget class {}", class.name);
        self.classes.insert(class.name, Rc::new(class));
        return Ok(());
    }

    pub fn get(&self, name: &str) -> Result<Rc<WidgetClass>, UiError> {
        return self.classes.get(name).cloned().ok_or_else(|| UiError::UnknownWidget(name.to_string()));
    }

    pub fn len(&self) -> usize {
        return self.classes.len();
    }

    pub fn is_empty(&self) -> bool {
        return self.classes.is_empty();
    }

    pub fn contains(&self, name: &str) -> bool {
        return self.classes.contains_key(name);
    }

    pub(crate) fn close(&mut self) {
        self.closed = true;
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn generate(_: &mut Widget, _: &Config) -> Instance {
        Instance::new("Frame")
    }
    fn update(_: &mut Widget, _: &Config) {}
    fn discard(w: &mut Widget) {
        w.destroy_instance();
    }

    const PLAIN: WidgetClass = WidgetClass {
        name: "Plain",
        flags: ClassFlags::empty(),
        args: &[Arg::required("Text"), Arg::optional("Wrapped")],
        events: &[],
        generate,
        update,
        discard,
        generate_state: None,
        update_state: None,
        child_added: None,
        child_discarded: None,
    };

    #[test]
    fn parent_classes_need_child_functions() {
        let mut registry = Registry::new();
        let broken = WidgetClass {
            name: "Broken",
            flags: ClassFlags::HAS_CHILDREN,
            ..PLAIN
        };
        let result = registry.register(broken);
        assert!(matches!(result, Err(UiError::MissingClassField { field: "child_added", .. })));
        assert!(registry.contains("Broken") == false);
    }

    #[test]
    fn duplicates_and_closed_registry_are_rejected() {
        let mut registry = Registry::new();
        registry.register(PLAIN).unwrap();
        assert!(matches!(registry.register(PLAIN), Err(UiError::DuplicateClass("Plain"))));

        registry.close();
        let late = WidgetClass { name: "Late", ..PLAIN };
        assert!(matches!(registry.register(late), Err(UiError::RegistryClosed)));
    }

    #[test]
    fn unknown_types_are_errors() {
        let registry = Registry::new();
        assert!(matches!(registry.get("Nope"), Err(UiError::UnknownWidget(name)) if name == "Nope"));
    }

    #[test]
    fn required_arguments() {
        assert_eq!(PLAIN.arg_index("Wrapped"), Some(1));
        assert!(PLAIN.check_required_args(&Args::from("hi")).is_ok());
        assert!(matches!(
            PLAIN.check_required_args(&Args::empty()),
            Err(UiError::MissingArgument { argument: "Text", .. })
        ));
    }
}
