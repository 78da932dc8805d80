use std::collections::HashMap;

use crate::coords::Rect;
use crate::input::Interest;
use crate::paint::Color;

use super::{DrawOrder, EntityId};

/// A sprite to draw this frame.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct DrawableEntity {
    pub id: EntityId,
    pub key: DrawOrder,
    /// Render-space pixels.
    pub rect: Rect,
    pub color: Color,
}

/// An entity eligible to receive input this frame.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct InputReceiverCandidate {
    pub id: EntityId,
    pub key: DrawOrder,
    /// Positional events only reach candidates whose region contains the pointer.
    pub hit_region: Option<Rect>,
    pub interest: Interest,
}

impl InputReceiverCandidate {
    #[inline]
    pub fn wants(&self, interest: Interest) -> bool {
        !interest.is_empty() && self.interest.contains(interest)
    }
}

/// Result of one hierarchy traversal. Both lists are in draw order.
#[derive(Debug, Default, Clone)]
pub struct Traversal {
    pub drawables: Vec<DrawableEntity>,
    pub receivers: Vec<InputReceiverCandidate>,
}

impl Traversal {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.drawables.is_empty() && self.receivers.is_empty()
    }

    /// Checks that both lists are strictly ascending and that an entity present
    /// in both carries the same key.
    pub fn keys_consistent(&self) -> bool {
        let ascending = self.drawables.windows(2).all(|w| w[0].key < w[1].key)
            && self.receivers.windows(2).all(|w| w[0].key < w[1].key);
        if !ascending {
            return false;
        }

        let by_id: HashMap<EntityId, DrawOrder> =
            self.drawables.iter().map(|d| (d.id, d.key)).collect();
        let by_key: HashMap<DrawOrder, EntityId> =
            self.drawables.iter().map(|d| (d.key, d.id)).collect();

        self.receivers.iter().all(|r| {
            by_id.get(&r.id).is_none_or(|k| *k == r.key)
                && by_key.get(&r.key).is_none_or(|id| *id == r.id)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drawable(id: u32, key: u32) -> DrawableEntity {
        DrawableEntity {
            id: EntityId(id),
            key: DrawOrder(key),
            rect: Rect::new(0.0, 0.0, 1.0, 1.0),
            color: Color::BLACK,
        }
    }

    fn receiver(id: u32, key: u32) -> InputReceiverCandidate {
        InputReceiverCandidate {
            id: EntityId(id),
            key: DrawOrder(key),
            hit_region: None,
            interest: Interest::KEYS,
        }
    }

    #[test]
    fn shared_keys_are_consistent() {
        let t = Traversal {
            drawables: vec![drawable(1, 0), drawable(2, 1)],
            receivers: vec![receiver(2, 1), receiver(3, 2)],
        };
        assert!(t.keys_consistent());
    }

    #[test]
    fn mismatched_key_is_detected() {
        let t = Traversal {
            drawables: vec![drawable(1, 0)],
            receivers: vec![receiver(1, 4)],
        };
        assert!(!t.keys_consistent());
    }

    #[test]
    fn out_of_order_list_is_detected() {
        let t = Traversal {
            drawables: vec![drawable(1, 2), drawable(2, 1)],
            receivers: vec![],
        };
        assert!(!t.keys_consistent());
    }

    #[test]
    fn empty_interest_is_never_wanted() {
        let r = receiver(1, 0);
        assert!(r.wants(Interest::KEYS));
        assert!(!r.wants(Interest::POINTER));
        assert!(!r.wants(Interest::empty()));
    }
}
