use crate::coords::Vec2;

use super::types::{InputEvent, Modifiers, PointerButtonEvent};

/// Current input state for a single window.
///
/// Tracks modifiers, focus and the pointer position. Updated when events are
/// queued, so it always reflects the newest platform input even if the frame
/// that would dispatch those events is dropped.
#[derive(Debug, Default)]
pub struct InputState {
    pub modifiers: Modifiers,

    pub focused: bool,

    /// Pointer position in window logical pixels.
    pub pointer_pos: Option<Vec2>,
}

impl InputState {
    pub fn apply_event(&mut self, ev: &InputEvent) {
        match ev {
            InputEvent::ModifiersChanged(m) => {
                self.modifiers = *m;
            }

            InputEvent::Focused(f) => {
                self.focused = *f;
                if !*f {
                    // Modifier releases are not reported while unfocused.
                    self.modifiers = Modifiers::default();
                }
            }

            InputEvent::PointerMoved { x, y } => {
                self.pointer_pos = Some(Vec2::new(*x, *y));
            }

            InputEvent::PointerLeft => {
                self.pointer_pos = None;
            }

            InputEvent::PointerButton(PointerButtonEvent { x, y, modifiers, .. }) => {
                self.pointer_pos = Some(Vec2::new(*x, *y));
                self.modifiers = *modifiers;
            }

            InputEvent::Key { modifiers, .. } | InputEvent::MouseWheel { modifiers, .. } => {
                self.modifiers = *modifiers;
            }

            InputEvent::Text(_) => {}
        }
    }
}
