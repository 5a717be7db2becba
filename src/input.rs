//! The event model yielded by the pump and consumed by an application's
//! main loop.
use bitflags::bitflags;
use std::any::Any;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

bitflags! {
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Modifiers: u8 {
        const NONE = 0;
        const SHIFT = 1<<1;
        const ALT = 1<<2;
        const CTRL = 1<<3;
        const CAPS_LOCK = 1<<4;
        const NUM_LOCK = 1<<5;
        const SCROLL_LOCK = 1<<6;
    }
}

/// Which key is pressed.  Either the decoded literal character, or one
/// of a fixed set of named keys.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    /// The decoded literal character
    Char(char),

    UpArrow,
    DownArrow,
    LeftArrow,
    RightArrow,
    Home,
    End,
    PageUp,
    PageDown,
    /// F1-F63 are possible
    Function(u8),
    Tab,
    Enter,
    Escape,
    Backspace,
    Delete,
    Insert,
    /// A function-key code the classifier did not recognize.
    Unknown,
}

/// A single resolved key press.
///
/// `name` is a diagnostic label supplied by the native driver for
/// functional keys.  It is carried for logging only and takes no part
/// in equality or hashing.
#[derive(Debug, Clone)]
pub struct KeyEvent {
    /// Which key was pressed
    pub key: Key,

    /// Which modifiers are down
    pub modifiers: Modifiers,

    pub name: Option<String>,
}

impl KeyEvent {
    pub fn new(key: Key, modifiers: Modifiers) -> Self {
        Self {
            key,
            modifiers,
            name: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// The literal code point, when this is a character key.
    pub fn char(&self) -> Option<char> {
        match self.key {
            Key::Char(c) => Some(c),
            _ => None,
        }
    }
}

impl PartialEq for KeyEvent {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key && self.modifiers == other.modifiers
    }
}

impl Eq for KeyEvent {}

impl Hash for KeyEvent {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
        self.modifiers.hash(state);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseButton {
    Button1,
    Button2,
    Button3,
    Button4,
    Button5,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ButtonState {
    Released,
    Pressed,
    Clicked,
    DoubleClicked,
    TripleClicked,
    Unknown,
}

/// The pointer moved to an absolute cell position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MouseMoveEvent {
    pub x: u16,
    pub y: u16,
}

/// A button transition at an absolute cell position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MouseActionEvent {
    pub x: u16,
    pub y: u16,
    pub button: MouseButton,
    pub state: ButtonState,
    pub modifiers: Modifiers,
}

/// An opaque payload marshalled onto the pump's thread of control.
///
/// Equality is payload identity: two `Delegated` values compare equal
/// only when they share the same allocation.
#[derive(Clone)]
pub struct Delegated(Arc<dyn Any + Send + Sync>);

impl Delegated {
    pub fn new<T: Any + Send + Sync>(payload: T) -> Self {
        Self(Arc::new(payload))
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.downcast_ref()
    }
}

impl PartialEq for Delegated {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for Delegated {}

impl fmt::Debug for Delegated {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Delegated({:p})", Arc::as_ptr(&self.0))
    }
}

/// One element of a listen stream.  Events are immutable values,
/// created once by the pump and never mutated after being yielded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// Always the first element of a listen stream.
    Start,
    /// Always the last element, and only reached on cooperative
    /// cancellation; a driver failure ends the stream without it.
    Stop,
    Key(KeyEvent),
    MouseMove(MouseMoveEvent),
    MouseAction(MouseActionEvent),
    /// Detected that the user has resized the terminal
    Resized { cols: usize, rows: usize },
    /// Cross-thread work marshalled onto the pump's thread.
    Delegate(Delegated),
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn key_event_equality_ignores_name() {
        let plain = KeyEvent::new(Key::UpArrow, Modifiers::NONE);
        let named = KeyEvent::new(Key::UpArrow, Modifiers::NONE).with_name("kcuu1");
        assert_eq!(plain, named);
        assert_ne!(plain, KeyEvent::new(Key::UpArrow, Modifiers::CTRL));
    }

    #[test]
    fn delegated_equality_is_identity() {
        let a = Delegated::new(42usize);
        let b = a.clone();
        let c = Delegated::new(42usize);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.downcast_ref::<usize>(), Some(&42));
        assert_eq!(a.downcast_ref::<String>(), None);
    }
}
