use std::fmt::{self, Display};
use std::panic::Location;

use ahash::AHashMap;

/// The identity of a widget, stable across cycles as long as it's declared from the same place.
///
/// Derived IDs look like `src/app.rs:12:9:1`: the call site, then a discriminator.
/// The discriminator is the number of times the same call site was reached so far in the current cycle, or the pushed IDs if [`Ui::push_id`](crate::Ui::push_id) is active.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub struct WidgetId(String);

impl WidgetId {
    pub fn new(id: impl Into<String>) -> WidgetId {
        return WidgetId(id.into());
    }

    pub fn as_str(&self) -> &str {
        return &self.0;
    }

    /// The call-site part of a derived ID, without the discriminator.
    pub fn base(&self) -> &str {
        return match self.0.rsplit_once(DISCRIMINATOR_SEPARATOR) {
            Some((base, _)) => base,
            None => &self.0,
        };
    }

    /// The discriminator part of a derived ID.
    pub fn discriminator(&self) -> Option<&str> {
        return self.0.rsplit_once(DISCRIMINATOR_SEPARATOR).map(|(_, d)| d);
    }
}

impl Display for WidgetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for WidgetId {
    fn from(value: &str) -> Self {
        WidgetId(value.to_string())
    }
}

impl From<String> for WidgetId {
    fn from(value: String) -> Self {
        WidgetId(value)
    }
}

impl From<WidgetKey> for WidgetId {
    fn from(key: WidgetKey) -> Self {
        key.id()
    }
}

/// An explicit widget identity, usually created with the [`macro@widget_key`](crate::widget_key) macro.
///
/// ```rust
/// # use kasane::*;
/// #[widget_key] const SAVE_BUTTON: WidgetKey;
/// # fn declare(ui: &mut Ui) -> Result<(), UiError> {
/// ui.set_next_widget_id(SAVE_BUTTON);
/// ui.button("Save")?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WidgetKey {
    debug_name: &'static str,
    salt: u64,
}

impl WidgetKey {
    pub const fn new(debug_name: &'static str, salt: u64) -> Self {
        return Self { debug_name, salt };
    }

    pub const fn debug_name(&self) -> &'static str {
        return self.debug_name;
    }

    pub fn id(&self) -> WidgetId {
        return WidgetId(format!("{}#{:016x}", self.debug_name, self.salt));
    }
}

pub(crate) const DISCRIMINATOR_SEPARATOR: char = ':';
pub(crate) const PUSHED_ID_SEPARATOR: &str = "\\";

/// Turns call sites into [`WidgetId`]s.
pub(crate) struct IdResolver {
    // keyed by call site. Cleared every cycle, otherwise loop discriminators would keep growing and never match last cycle's IDs.
    used: AHashMap<&'static Location<'static>, u32>,
    pushed: Vec<String>,
    next: Option<WidgetId>,
}

impl IdResolver {
    pub fn new() -> Self {
        return Self {
            used: AHashMap::with_capacity(100),
            pushed: Vec::with_capacity(10),
            next: None,
        };
    }

    pub fn resolve(&mut self, location: &'static Location<'static>) -> WidgetId {
        if let Some(id) = self.next.take() {
            return id;
        }
        return self.derive(location);
    }

    /// Like `resolve`, but ignores and keeps a pending `set_next` override.
    pub fn derive(&mut self, location: &'static Location<'static>) -> WidgetId {
        let count = self.used.entry(location).or_insert(0);
        *count += 1;

        let base = format!("{}:{}:{}", location.file(), location.line(), location.column());
        let id = if self.pushed.is_empty() {
            format!("{base}{DISCRIMINATOR_SEPARATOR}{count}")
        } else {
            format!("{base}{DISCRIMINATOR_SEPARATOR}{}", self.pushed.join(PUSHED_ID_SEPARATOR))
        };
        return WidgetId(id);
    }

    pub fn clear_usage(&mut self) {
        self.used.clear();
    }

    pub fn push_id(&mut self, id: String) {
        self.pushed.push(id);
    }

    pub fn pop_id(&mut self) {
        if self.pushed.pop().is_none() {
            log::warn!("pop_id() called without a matching push_id()");
        }
    }

    pub fn set_next(&mut self, id: WidgetId) {
        if let Some(old) = self.next.replace(id) {
            log::warn!("set_next_widget_id() overwrote the unused ID {old}");
        }
    }

    /// Forget pushed IDs and pending overrides, after a callback failed halfway.
    pub fn reset_scopes(&mut self) {
        self.pushed.clear();
        self.next = None;
    }
}
