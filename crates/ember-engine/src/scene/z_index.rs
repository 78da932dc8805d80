/// Stacking level of an entity among its siblings.
///
/// Siblings with a higher level are drawn later, so they end up on top and
/// are offered positional input first. Equal levels fall back to insertion
/// order (see [`SiblingKey`](super::SiblingKey)).
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Default)]
pub struct ZIndex(pub i32);

impl ZIndex {
    pub const BOTTOM: ZIndex = ZIndex(i32::MIN);
    pub const TOP: ZIndex = ZIndex(i32::MAX);

    /// The level directly above `self`, saturating at [`ZIndex::TOP`].
    #[inline]
    pub const fn raised(self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

impl From<i32> for ZIndex {
    fn from(v: i32) -> Self {
        Self(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raised_saturates_at_top() {
        assert_eq!(ZIndex(4).raised(), ZIndex(5));
        assert_eq!(ZIndex::TOP.raised(), ZIndex::TOP);
        assert!(ZIndex::BOTTOM < ZIndex::default());
    }
}
