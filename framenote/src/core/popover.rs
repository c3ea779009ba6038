//! Transient popover state (e.g. the export format menu)
//!
//! Pointer events carry an id so the click that opens the popover is not
//! also treated as a click outside it.

/// Identifier of a host input event
pub type EventId = u64;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Popover {
    opened_by: Option<EventId>,
}

impl Popover {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_open(&self) -> bool {
        self.opened_by.is_some()
    }

    /// Trigger clicked: opens if closed, closes if open
    pub fn toggle(&mut self, event: EventId) {
        self.opened_by = match self.opened_by {
            Some(_) => None,
            None => Some(event),
        };
    }

    /// Pointer down outside the popover; ignored for the opening event
    pub fn pointer_down_outside(&mut self, event: EventId) {
        if self.opened_by.is_some_and(|opener| opener != event) {
            self.opened_by = None;
        }
    }

    /// An item was picked
    pub fn choose(&mut self) {
        self.opened_by = None;
    }
}
