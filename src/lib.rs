//! Kasane is an immediate-mode widget library that keeps a retained host scene graph in sync.
//!
//! The GUI is declared from scratch every cycle, but the host objects behind it are only created, updated and destroyed when the declaration actually changed.
//!
//! ## Example
//!
//! ```rust
//! # use kasane::*;
//! # fn main() -> Result<(), UiError> {
//! let host = Instance::new("ScreenGui");
//! let mut ui = Ui::new(host);
//! ui.init()?;
//!
//! let dark_mode = ui.state(false);
//! ui.connect(move |ui| {
//!     ui.window("Settings")?;
//!     ui.checkbox_with_state("Dark mode", &dark_mode)?;
//!     if dark_mode.get().truthy() {
//!         ui.text("It's dark")?;
//!     }
//!     if ui.button("Reset")?.clicked() {
//!         dark_mode.set(false);
//!     }
//!     ui.end()?;
//!     Ok(())
//! });
//!
//! // once per frame
//! ui.run_cycle()?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Identity
//!
//! Widgets are identified by the place in the source code they're declared from, through `#[track_caller]`. Declaring a widget from the same line in the next cycle gives back the same widget, with the same host objects.
//!
//! Widgets declared in a loop are told apart by how many times the loop ran so far. When the items of a list can move, use [`Ui::push_id`] to give them a stable identity instead, or set one explicitly with [`Ui::set_next_widget_id`] and the [`macro@widget_key`] macro.
//!
//! ## Scopes
//!
//! Widgets that accept children, like [`WINDOW`] and [`GROUP`], open a scope when they're inserted. Everything declared after them goes inside, until the matching [`Ui::end()`].
//!
//! ## State
//!
//! A [`State`] is an observable cell. Widgets bound to a cell update their visuals as soon as it's set, without waiting for the next cycle.
//!
//! ## Events
//!
//! The host fires signals on its objects, like "Activated" for a click. The [`WidgetRef`] returned by a widget constructor reports these during the cycle right after they happened, through [`WidgetRef::clicked`] and similar methods.
//!
//! ## Custom widgets
//!
//! A widget type is a [`WidgetClass`]: a set of functions that build, update and destroy its host objects. Register your own with [`Ui::register`] before calling [`Ui::init`].

mod value;
pub use value::*;

mod native;
pub use native::*;

mod error;
pub use error::*;

mod widget_id;
pub use widget_id::*;

mod class;
pub use class::*;

mod state;
pub use state::*;

mod config;
pub use config::*;

mod widget;
pub use widget::*;

mod interact;
pub use interact::*;

mod tree;
pub(crate) use tree::*;

mod ui;
pub use ui::*;

mod widget_library;
pub use widget_library::*;

mod components;

mod stacks;
pub(crate) use stacks::*;

pub use kasane_macros::widget_key;
