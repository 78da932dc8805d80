use std::fmt;

use bitflags::bitflags;

use crate::coords::Vec2;

/// Keyboard key identifier.
///
/// The runtime maps platform key codes into these variants where possible;
/// anything else becomes `Key::Unknown` carrying the platform code.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Key {
    Escape,
    Enter,
    Tab,
    Backspace,
    Space,

    ArrowUp,
    ArrowDown,
    ArrowLeft,
    ArrowRight,

    Shift,
    Control,
    Alt,
    Meta,

    // Letters
    A, B, C, D, E, F, G, H, I, J, K, L, M,
    N, O, P, Q, R, S, T, U, V, W, X, Y, Z,

    // Digits
    Digit0, Digit1, Digit2, Digit3, Digit4,
    Digit5, Digit6, Digit7, Digit8, Digit9,

    F1, F2, F3, F4,

    Unknown(u32),
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum KeyState {
    Pressed,
    Released,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
    Back,
    Forward,
    Other(u16),
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum MouseButtonState {
    Pressed,
    Released,
}

/// Modifier keys state.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

impl Modifiers {
    pub fn any(&self) -> bool {
        self.shift || self.ctrl || self.alt || self.meta
    }
}

/// Mouse wheel delta. `Line` is "scroll lines" input; `Pixel` is high precision.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum MouseWheelDelta {
    Line { x: f32, y: f32 },
    Pixel { x: f32, y: f32 },
}

/// Pointer button event, in window logical pixels.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PointerButtonEvent {
    pub button: MouseButton,
    pub state: MouseButtonState,
    pub x: f32,
    pub y: f32,
    pub modifiers: Modifiers,
}

/// Platform-agnostic input events emitted by the runtime.
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    ModifiersChanged(Modifiers),

    Key {
        key: Key,
        state: KeyState,
        modifiers: Modifiers,
        /// True when the event is a key-repeat.
        repeat: bool,
    },

    /// Pointer moved, in window logical pixels.
    PointerMoved { x: f32, y: f32 },
    PointerButton(PointerButtonEvent),

    MouseWheel {
        delta: MouseWheelDelta,
        modifiers: Modifiers,
    },

    /// Committed text.
    Text(String),

    /// Pointer left the window surface.
    PointerLeft,

    /// Window focus change.
    Focused(bool),
}

/// How the dispatcher routes an event.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum EventClass {
    /// Hit-tested against receivers topmost-first; at most one consumer.
    Positional,
    /// Delivered to every interested receiver in traversal order.
    Broadcast,
    /// Only updates input state.
    Bookkeeping,
}

bitflags! {
    /// Event kinds a receiver wants to be offered.
    #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
    pub struct Interest: u8 {
        const POINTER = 0b001;
        const KEYS    = 0b010;
        const TEXT    = 0b100;
    }
}

impl InputEvent {
    pub fn class(&self) -> EventClass {
        match self {
            InputEvent::PointerButton(_) | InputEvent::MouseWheel { .. } => EventClass::Positional,
            InputEvent::Key { .. } | InputEvent::Text(_) => EventClass::Broadcast,
            InputEvent::ModifiersChanged(_)
            | InputEvent::PointerMoved { .. }
            | InputEvent::PointerLeft
            | InputEvent::Focused(_) => EventClass::Bookkeeping,
        }
    }

    /// The interest a receiver must declare to be offered this event.
    pub fn interest(&self) -> Interest {
        match self {
            InputEvent::PointerButton(_) | InputEvent::MouseWheel { .. } => Interest::POINTER,
            InputEvent::Key { .. } => Interest::KEYS,
            InputEvent::Text(_) => Interest::TEXT,
            _ => Interest::empty(),
        }
    }
}

/// An event as handed to a receiver.
#[derive(Debug, Clone, PartialEq)]
pub struct RoutedEvent {
    pub event: InputEvent,
    /// Pointer position in render space when the event was queued.
    pub pointer: Option<Vec2>,
}

/// Receiver response to a delivered event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventResult {
    /// Handled; positional routing stops here.
    Consumed,
    /// Not handled; positional routing falls through to the next-topmost receiver.
    Declined,
}

impl EventResult {
    #[inline]
    pub fn is_consumed(self) -> bool {
        self == EventResult::Consumed
    }
}
