use std::cell::{Cell, RefCell};
use std::rc::Rc;

use ahash::AHashMap;

use crate::*;

/// The generation counter, shared between the [`Ui`] and the native signal handlers that stamp events.
#[derive(Clone, Debug, Default)]
pub struct Clock(Rc<Cell<u64>>);

impl Clock {
    pub fn new() -> Clock {
        return Clock(Rc::new(Cell::new(0)));
    }

    pub fn get(&self) -> u64 {
        return self.0.get();
    }

    pub(crate) fn advance(&self) -> u64 {
        self.0.set(self.0.get() + 1);
        return self.0.get();
    }
}

/// Per-widget record of the generation each event should be reported in, plus level-style flags like "hovered".
///
/// Native signal handlers write here, and never touch the frame trees.
#[derive(Clone, Debug, Default)]
pub(crate) struct EventStamps {
    ticks: Rc<RefCell<AHashMap<&'static str, u64>>>,
    flags: Rc<RefCell<AHashMap<&'static str, bool>>>,
}

impl EventStamps {
    pub fn new() -> EventStamps {
        return EventStamps::default();
    }

    pub fn stamp(&self, event: &'static str, generation: u64) {
        self.ticks.borrow_mut().insert(event, generation);
    }

    pub fn get(&self, event: &'static str) -> Option<u64> {
        return self.ticks.borrow().get(event).copied();
    }

    pub fn set_flag(&self, event: &'static str, value: bool) {
        self.flags.borrow_mut().insert(event, value);
    }

    pub fn flag(&self, event: &'static str) -> bool {
        return self.flags.borrow().get(event).copied().unwrap_or(false);
    }
}

impl WidgetRef {
    /// Query an event declared by the widget's class, like `"clicked"` or `"hovered"`.
    ///
    /// The first query of an event on a widget wires it up (usually connecting to a native signal), so events that are never queried cost nothing.
    ///
    /// Events fired by the host between two cycles are reported during the next cycle, and only during that one.
    pub fn event(&self, name: &str) -> Result<bool, UiError> {
        let mut widget = self.0.borrow_mut();
        let class = widget.class.clone();
        let Some((event_name, event)) = class.events.iter().find(|(n, _)| *n == name) else {
            return Err(UiError::UnknownEvent {
                widget: class.name,
                event: name.to_string(),
            });
        };

        if !widget.tracked_events.contains(event_name) {
            log::trace!("Wiring event \"{event_name}\" on {}", widget.id());
            (event.init)(&mut *widget);
            widget.tracked_events.insert(*event_name);
        }

        return Ok((event.get)(&*widget));
    }

    pub fn clicked(&self) -> bool {
        return self.event_or_false("clicked");
    }

    pub fn hovered(&self) -> bool {
        return self.event_or_false("hovered");
    }

    pub fn checked(&self) -> bool {
        return self.event_or_false("checked");
    }

    pub fn unchecked(&self) -> bool {
        return self.event_or_false("unchecked");
    }

    fn event_or_false(&self, name: &str) -> bool {
        return match self.event(name) {
            Ok(happened) => happened,
            Err(e) => {
                log::error!("{e}");
                false
            }
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stamps_are_visible_in_exactly_one_generation() {
        let clock = Clock::new();
        let stamps = EventStamps::new();

        clock.advance();
        // the host fires a signal between generation 1 and 2
        stamps.stamp("clicked", clock.get() + 1);
        assert!(stamps.get("clicked") != Some(clock.get()));

        clock.advance();
        assert_eq!(stamps.get("clicked"), Some(clock.get()));

        clock.advance();
        assert!(stamps.get("clicked") != Some(clock.get()));
    }
}
