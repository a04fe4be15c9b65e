use crate::*;

impl Ui {
    /// Insert a [`WINDOW`]. It opens a scope: the widgets declared until the matching [`Ui::end()`] go inside it.
    #[track_caller]
    pub fn window(&mut self, title: impl Into<Value>) -> Result<WidgetRef, UiError> {
        let title: Value = title.into();
        return self.insert(WINDOW.name, title, ());
    }

    /// Like [`Ui::window`], binding the window's `isOpened` state to `opened`.
    #[track_caller]
    pub fn window_with_state(&mut self, title: impl Into<Value>, opened: &State) -> Result<WidgetRef, UiError> {
        let title: Value = title.into();
        return self.insert(WINDOW.name, title, States::new().with("isOpened", opened));
    }

    /// Insert a [`GROUP`], which opens a scope like a window.
    #[track_caller]
    pub fn group(&mut self) -> Result<WidgetRef, UiError> {
        return self.insert(GROUP.name, (), ());
    }

    #[track_caller]
    pub fn text(&mut self, text: impl Into<Value>) -> Result<WidgetRef, UiError> {
        let text: Value = text.into();
        return self.insert(TEXT.name, text, ());
    }

    #[track_caller]
    pub fn button(&mut self, text: impl Into<Value>) -> Result<WidgetRef, UiError> {
        let text: Value = text.into();
        return self.insert(BUTTON.name, text, ());
    }

    /// Insert a [`CHECKBOX`] that owns its `isChecked` state, starting unchecked.
    #[track_caller]
    pub fn checkbox(&mut self, text: impl Into<Value>) -> Result<WidgetRef, UiError> {
        let text: Value = text.into();
        return self.insert(CHECKBOX.name, text, ());
    }

    /// Insert a [`CHECKBOX`] bound to `checked`. Clicking it sets the cell, and setting the cell updates the checkbox.
    #[track_caller]
    pub fn checkbox_with_state(&mut self, text: impl Into<Value>, checked: &State) -> Result<WidgetRef, UiError> {
        let text: Value = text.into();
        return self.insert(CHECKBOX.name, text, States::new().with("isChecked", checked));
    }
}
