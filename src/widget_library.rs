use crate::*;

/// Name of the child instance that widgets with children parent their children's visuals under.
pub const CHILD_CONTAINER: &str = "ChildContainer";

/// Registers the built-in widget classes. Called by [`Ui::new`].
pub(crate) fn register_builtin_widgets(registry: &mut Registry) {
    for class in [ROOT, WINDOW, GROUP, TEXT, BUTTON, CHECKBOX] {
        if let Err(e) = registry.register(class) {
            log::error!("Couldn't register built-in widget class {}: {e}", class.name);
        }
    }
}

fn destroy(widget: &mut Widget) {
    widget.destroy_instance();
}

fn no_update(_widget: &mut Widget, _config: &Config) {}

fn no_child_discarded(_widget: &mut Widget, _child: &Widget) {}

fn container_or_self(widget: &mut Widget, _child: &Widget) -> Instance {
    let Some(instance) = &widget.instance else {
        log::error!("{} has no instance to put children in", widget.id());
        return Instance::new("Folder");
    };
    return instance.find_child(CHILD_CONTAINER).unwrap_or_else(|| instance.clone());
}

fn set_on_child(widget: &Widget, child: &str, property: &str, value: impl Into<Value>) {
    if let Some(child) = widget.instance.as_ref().and_then(|i| i.find_child(child)) {
        child.set(property, value);
    }
}

fn add_counter(widget: &mut Widget, key: &'static str, delta: f64) -> f64 {
    let count = widget.data.get(key).and_then(Value::as_number).unwrap_or(0.0) + delta;
    widget.data.insert(key, Value::Number(count));
    return count;
}

fn text_label(name: &str, config: &Config) -> Instance {
    let label = Instance::new("TextLabel");
    label.set_name(name);
    label.set("TextColor", config.get("TextColor").clone());
    label.set("TextSize", config.get("TextSize").clone());
    label.set("Font", config.get("TextFont").clone());
    return label;
}

fn list_container(config: &Config) -> Instance {
    let container = Instance::new("Frame");
    container.set_name(CHILD_CONTAINER);
    container.set("BackgroundTransparency", 1);
    let layout = Instance::new("UIListLayout");
    layout.set("Padding", config.get("ItemSpacing").clone());
    layout.set("SortOrder", "LayoutOrder");
    layout.set_parent(Some(&container));
    return container;
}

fn hovered_init(widget: &mut Widget) {
    let Some(instance) = &widget.instance else { return };
    instance.signal("MouseEnter").connect(widget.event_flag_setter("hovered", true));
    instance.signal("MouseLeave").connect(widget.event_flag_setter("hovered", false));
}

fn hovered_get(widget: &Widget) -> bool {
    return widget.event_flag("hovered");
}

const HOVERED: (&str, Event) = ("hovered", Event { init: hovered_init, get: hovered_get });

// stamped from update_state, nothing to connect
fn no_init(_widget: &mut Widget) {}

// Root

fn root_generate(widget: &mut Widget, _config: &Config) -> Instance {
    let folder = Instance::new("Folder");
    folder.set_name("Kasane_Root");

    // holds the widgets that aren't root-level, like a window with no decorations
    let pseudo_window = Instance::new("Frame");
    pseudo_window.set_name(CHILD_CONTAINER);
    pseudo_window.set("Visible", false);
    pseudo_window.set_parent(Some(&folder));

    widget.data.insert("children", Value::Number(0.0));
    return folder;
}

fn root_child_added(root: &mut Widget, child: &Widget) -> Instance {
    let Some(folder) = root.instance.clone() else {
        log::error!("Root has no instance to put children in");
        return Instance::new("Folder");
    };
    if child.class().is_root_level() {
        return folder;
    }

    add_counter(root, "children", 1.0);
    let Some(pseudo_window) = folder.find_child(CHILD_CONTAINER) else {
        return folder;
    };
    pseudo_window.set("Visible", true);
    return pseudo_window;
}

fn root_child_discarded(root: &mut Widget, child: &Widget) {
    if child.class().is_root_level() {
        return;
    }
    if add_counter(root, "children", -1.0) <= 0.0 {
        set_on_child(root, CHILD_CONTAINER, "Visible", false);
    }
}

/// [`WidgetClass`] for the root widget. Every [`Ui`] has exactly one, generated by [`Ui::init`].
pub const ROOT: WidgetClass = WidgetClass {
    name: "Root",
    flags: ClassFlags::HAS_CHILDREN,
    args: &[],
    events: &[],
    generate: root_generate,
    update: no_update,
    discard: destroy,
    generate_state: None,
    update_state: None,
    child_added: Some(root_child_added),
    child_discarded: Some(root_child_discarded),
};

// Window

fn window_generate(_widget: &mut Widget, config: &Config) -> Instance {
    let window = Instance::new("Frame");
    window.set_name("Window");
    window.set("BackgroundColor", config.get("WindowBgColor").clone());

    let title_bar = Instance::new("Frame");
    title_bar.set_name("TitleBar");
    title_bar.set_parent(Some(&window));
    text_label("Title", config).set_parent(Some(&title_bar));

    let close_button = Instance::new("TextButton");
    close_button.set_name("CloseButton");
    close_button.set("Text", "X");
    close_button.set_parent(Some(&title_bar));

    list_container(config).set_parent(Some(&window));
    return window;
}

fn window_update(widget: &mut Widget, _config: &Config) {
    let title = widget.arg("Title").to_string();
    let no_close = widget.arg("NoClose").truthy();

    let Some(window) = &widget.instance else { return };
    if let Some(title_bar) = window.find_child("TitleBar") {
        if let Some(label) = title_bar.find_child("Title") {
            label.set("Text", title);
        }
        if let Some(close_button) = title_bar.find_child("CloseButton") {
            close_button.set("Visible", !no_close);
        }
    }
}

fn window_generate_state(widget: &mut Widget, states: &mut StateTable) {
    let opened = states.widget_state(widget, "isOpened", true);

    let close_button = widget
        .instance
        .as_ref()
        .and_then(|i| i.find_child("TitleBar"))
        .and_then(|t| t.find_child("CloseButton"));
    if let Some(close_button) = close_button {
        close_button.signal("Activated").connect(move || opened.set(false));
    }
}

fn window_update_state(widget: &mut Widget) {
    let opened = widget.state_value("isOpened").truthy();
    if let Some(window) = &widget.instance {
        window.set("Visible", opened);
    }

    let was_opened = widget.data.insert("wasOpened", Value::Bool(opened));
    if was_opened.is_some_and(|was| was.truthy() != opened) {
        let event = if opened { "opened" } else { "closed" };
        widget.event_stamper(event)();
    }
}

/// [`WidgetClass`] for a top-level window. Arguments: `Title`, `NoClose`. State: `isOpened`.
pub const WINDOW: WidgetClass = WidgetClass {
    name: "Window",
    flags: ClassFlags::HAS_CHILDREN.union(ClassFlags::HAS_STATE).union(ClassFlags::ROOT_LEVEL),
    args: &[Arg::required("Title"), Arg::optional("NoClose")],
    events: &[
        ("opened", Event { init: no_init, get: |w| w.event_happened("opened") }),
        ("closed", Event { init: no_init, get: |w| w.event_happened("closed") }),
        HOVERED,
    ],
    generate: window_generate,
    update: window_update,
    discard: destroy,
    generate_state: Some(window_generate_state),
    update_state: Some(window_update_state),
    child_added: Some(container_or_self),
    child_discarded: Some(no_child_discarded),
};

// Group

fn group_generate(_widget: &mut Widget, config: &Config) -> Instance {
    let group = list_container(config);
    group.set_name("Group");
    return group;
}

/// [`WidgetClass`] for an invisible vertical list of children.
pub const GROUP: WidgetClass = WidgetClass {
    name: "Group",
    flags: ClassFlags::HAS_CHILDREN,
    args: &[],
    events: &[HOVERED],
    generate: group_generate,
    update: no_update,
    discard: destroy,
    generate_state: None,
    update_state: None,
    child_added: Some(container_or_self),
    child_discarded: Some(no_child_discarded),
};

// Text

fn text_generate(_widget: &mut Widget, config: &Config) -> Instance {
    return text_label("Text", config);
}

fn text_update(widget: &mut Widget, _config: &Config) {
    let text = widget.arg("Text").to_string();
    if let Some(label) = &widget.instance {
        label.set("Text", text);
    }
}

/// [`WidgetClass`] for a text label. Arguments: `Text`.
pub const TEXT: WidgetClass = WidgetClass {
    name: "Text",
    flags: ClassFlags::empty(),
    args: &[Arg::required("Text")],
    events: &[HOVERED],
    generate: text_generate,
    update: text_update,
    discard: destroy,
    generate_state: None,
    update_state: None,
    child_added: None,
    child_discarded: None,
};

// Button

fn button_generate(_widget: &mut Widget, config: &Config) -> Instance {
    let button = Instance::new("TextButton");
    button.set_name("Button");
    button.set("BackgroundColor", config.get("ButtonColor").clone());
    button.set("TextColor", config.get("TextColor").clone());
    button.set("TextSize", config.get("TextSize").clone());
    button.set("Padding", config.get("FramePadding").clone());
    return button;
}

fn button_update(widget: &mut Widget, _config: &Config) {
    let text = widget.arg("Text").to_string();
    if let Some(button) = &widget.instance {
        button.set("Text", text);
    }
}

fn clicked_init(widget: &mut Widget) {
    let Some(instance) = &widget.instance else { return };
    instance.signal("Activated").connect(widget.event_stamper("clicked"));
}

/// [`WidgetClass`] for a clickable button. Arguments: `Text`.
pub const BUTTON: WidgetClass = WidgetClass {
    name: "Button",
    flags: ClassFlags::empty(),
    args: &[Arg::required("Text")],
    events: &[
        ("clicked", Event { init: clicked_init, get: |w| w.event_happened("clicked") }),
        HOVERED,
    ],
    generate: button_generate,
    update: button_update,
    discard: destroy,
    generate_state: None,
    update_state: None,
    child_added: None,
    child_discarded: None,
};

// Checkbox

fn checkbox_generate(widget: &mut Widget, config: &Config) -> Instance {
    let checkbox = Instance::new("TextButton");
    checkbox.set_name("Checkbox");
    checkbox.set("Text", "");

    let check_box = text_label("Box", config);
    check_box.set("BackgroundColor", config.get("ButtonColor").clone());
    check_box.set_parent(Some(&checkbox));
    text_label("Label", config).set_parent(Some(&checkbox));

    widget.data.insert("checkMark", config.get("CheckMarkText").clone());
    return checkbox;
}

fn checkbox_update(widget: &mut Widget, _config: &Config) {
    set_on_child(widget, "Label", "Text", widget.arg("Text").to_string());
}

fn checkbox_generate_state(widget: &mut Widget, states: &mut StateTable) {
    let checked = states.widget_state(widget, "isChecked", false);
    if let Some(checkbox) = &widget.instance {
        checkbox.signal("Activated").connect(move || {
            let toggled = !checked.get().truthy();
            checked.set(toggled);
        });
    }
}

fn checkbox_update_state(widget: &mut Widget) {
    let checked = widget.state_value("isChecked").truthy();
    let mark = match checked {
        true => widget.data.get("checkMark").cloned().unwrap_or_default(),
        false => Value::from(""),
    };
    set_on_child(widget, "Box", "Text", mark);

    let was_checked = widget.data.insert("wasChecked", Value::Bool(checked));
    if was_checked.is_some_and(|was| was.truthy() != checked) {
        let event = if checked { "checked" } else { "unchecked" };
        widget.event_stamper(event)();
    }
}

/// [`WidgetClass`] for a checkbox with a label. Arguments: `Text`. State: `isChecked`.
pub const CHECKBOX: WidgetClass = WidgetClass {
    name: "Checkbox",
    flags: ClassFlags::HAS_STATE,
    args: &[Arg::required("Text")],
    events: &[
        ("checked", Event { init: no_init, get: |w| w.event_happened("checked") }),
        ("unchecked", Event { init: no_init, get: |w| w.event_happened("unchecked") }),
        HOVERED,
    ],
    generate: checkbox_generate,
    update: checkbox_update,
    discard: destroy,
    generate_state: Some(checkbox_generate_state),
    update_state: Some(checkbox_update_state),
    child_added: None,
    child_discarded: None,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_classes_are_valid() {
        let mut registry = Registry::new();
        register_builtin_widgets(&mut registry);
        assert_eq!(registry.len(), 6);
        for name in ["Root", "Window", "Group", "Text", "Button", "Checkbox"] {
            assert!(registry.contains(name));
        }
    }
}
