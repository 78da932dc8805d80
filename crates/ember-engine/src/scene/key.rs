use core::cmp::Ordering;
use core::fmt;

use super::ZIndex;

/// Stable sort key for siblings.
///
/// Ordering rules:
/// 1) `z`: ascending (back-to-front)
/// 2) `order`: ascending (insertion order for equal z)
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct SiblingKey {
    pub z: ZIndex,
    /// Insertion index under the same parent.
    pub order: u32,
}

impl SiblingKey {
    #[inline]
    pub const fn new(z: ZIndex, order: u32) -> Self {
        Self { z, order }
    }
}

impl Ord for SiblingKey {
    #[inline]
    fn cmp(&self, other: &Self) -> Ordering {
        match self.z.cmp(&other.z) {
            Ordering::Equal => self.order.cmp(&other.order),
            o => o,
        }
    }
}

impl PartialOrd for SiblingKey {
    #[inline]
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Position of an entity in one frame's traversal.
///
/// Assigned once per emitted entity, so a drawable and a receiver for the
/// same entity carry the same value. Only meaningful within a single frame.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct DrawOrder(pub u32);

/// Opaque entity handle.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct EntityId(pub(crate) u32);

impl EntityId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn z_dominates_insertion_order() {
        let back_late = SiblingKey::new(ZIndex(0), 9);
        let front_early = SiblingKey::new(ZIndex(1), 0);
        assert!(back_late < front_early);
    }

    #[test]
    fn equal_z_falls_back_to_insertion_order() {
        let a = SiblingKey::new(ZIndex(2), 0);
        let b = SiblingKey::new(ZIndex(2), 1);
        assert!(a < b);
    }
}
