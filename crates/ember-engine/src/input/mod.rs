//! Input subsystem.
//!
//! Public API is platform-agnostic and does not expose winit types.
//! Runtime code translates platform events into `InputEvent`s and queues
//! them on the `InputDispatcher`, which delivers them after the render pass.

mod dispatch;
mod platform;
mod state;
mod types;

pub use dispatch::{DispatchReport, InputDispatcher, DEFAULT_QUEUE_CAPACITY};
pub use platform::{key_text, translate_window_event};
pub use self::state::InputState;
pub use types::{
    EventClass,
    EventResult,
    InputEvent,
    Interest,
    Key,
    KeyState,
    Modifiers,
    MouseButton,
    MouseButtonState,
    MouseWheelDelta,
    PointerButtonEvent,
    RoutedEvent,
};
