//! Normalizes raw mouse records into an ordered move/press/release
//! stream.
//!
//! Native drivers coalesce a press+release pair that lands inside the
//! click interval into a single `Clicked` record, report moves with no
//! deduplication, and occasionally deliver a release with no matching
//! press.  Consumers that track button transitions explicitly want none
//! of that, so every record passes through this small state machine.

use crate::input::{ButtonState, Event, Modifiers, MouseActionEvent, MouseButton, MouseMoveEvent};
use crate::terminal::MouseRecord;

/// Per-pump mouse state.  Non-reentrant; the pump invokes it only from
/// its own thread of control, and its memory deliberately survives
/// across listen sessions so click/position history carries over.
#[derive(Debug)]
pub struct MouseResolver {
    last_position: Option<(u16, u16)>,
    last_button: MouseButton,
    last_state: ButtonState,
    last_modifiers: Modifiers,
}

impl Default for MouseResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl MouseResolver {
    pub fn new() -> Self {
        Self {
            last_position: None,
            last_button: MouseButton::Unknown,
            last_state: ButtonState::Unknown,
            last_modifiers: Modifiers::NONE,
        }
    }

    /// The most recently remembered button, state and modifiers; of
    /// diagnostic interest only.
    pub fn last_action(&self) -> (MouseButton, ButtonState, Modifiers) {
        (self.last_button, self.last_state, self.last_modifiers)
    }

    /// Expands one raw record into zero or more events, in order.
    pub fn resolve(&mut self, record: MouseRecord) -> Vec<Event> {
        let mut out = Vec::new();
        match record {
            MouseRecord::Move { x, y } => self.push_move(x, y, &mut out),
            MouseRecord::Action {
                x,
                y,
                button,
                state,
                modifiers,
            } => {
                self.push_move(x, y, &mut out);
                match state {
                    ButtonState::Clicked => {
                        // expand into the discrete transitions the
                        // driver coalesced away
                        out.push(Event::MouseAction(MouseActionEvent {
                            x,
                            y,
                            button,
                            state: ButtonState::Pressed,
                            modifiers,
                        }));
                        out.push(Event::MouseAction(MouseActionEvent {
                            x,
                            y,
                            button,
                            state: ButtonState::Released,
                            modifiers,
                        }));
                        self.remember(button, ButtonState::Released, modifiers);
                    }
                    ButtonState::Released if self.last_state != ButtonState::Pressed => {
                        log::trace!("dropping spurious release of {:?}", button);
                    }
                    state => {
                        out.push(Event::MouseAction(MouseActionEvent {
                            x,
                            y,
                            button,
                            state,
                            modifiers,
                        }));
                        self.remember(button, state, modifiers);
                    }
                }
            }
        }
        out
    }

    fn push_move(&mut self, x: u16, y: u16, out: &mut Vec<Event>) {
        if self.last_position == Some((x, y)) {
            return;
        }
        self.last_position = Some((x, y));
        out.push(Event::MouseMove(MouseMoveEvent { x, y }));
    }

    fn remember(&mut self, button: MouseButton, state: ButtonState, modifiers: Modifiers) {
        self.last_button = button;
        self.last_state = state;
        self.last_modifiers = modifiers;
    }
}
