use crate::*;

/// The chain of currently open parent widgets.
///
/// Scopes open implicitly when a widget with children is inserted, and close with an explicit [`Ui::end()`].
/// The root widget sits at the bottom and is never popped.
pub(crate) struct Stacks {
    parents: Vec<WidgetId>,
}

impl Stacks {
    pub fn initialize(root: WidgetId) -> Stacks {
        let mut parents = Vec::with_capacity(25);
        parents.push(root);
        return Stacks { parents };
    }

    pub fn push_parent(&mut self, id: WidgetId) {
        self.parents.push(id);
    }

    pub fn pop_parent(&mut self) -> Result<WidgetId, UiError> {
        if self.parents.len() <= 1 {
            return Err(UiError::TooManyEnds);
        }
        return self.parents.pop().ok_or(UiError::TooManyEnds);
    }

    pub fn current_parent(&self) -> &WidgetId {
        // the root sentinel is never popped
        return &self.parents[self.parents.len() - 1];
    }

    /// Number of open scopes, not counting the root.
    pub fn open_scopes(&self) -> usize {
        return self.parents.len() - 1;
    }

    pub fn reset_to_root(&mut self) {
        self.parents.truncate(1);
    }
}
