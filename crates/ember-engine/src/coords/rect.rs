use super::Vec2;

/// Axis-aligned rectangle in render-space pixels (top-left origin).
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Rect {
    pub origin: Vec2,
    pub size: Vec2,
}

impl Rect {
    #[inline]
    pub const fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self {
            origin: Vec2::new(x, y),
            size: Vec2::new(w, h),
        }
    }

    #[inline]
    pub const fn from_origin_size(origin: Vec2, size: Vec2) -> Self {
        Self { origin, size }
    }

    #[inline]
    pub fn max(self) -> Vec2 {
        self.origin + self.size
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.size.x <= 0.0 || self.size.y <= 0.0
    }

    #[inline]
    pub fn is_finite(self) -> bool {
        self.origin.is_finite() && self.size.is_finite()
    }

    /// Half-open containment: [min, max). Empty rects contain nothing.
    #[inline]
    pub fn contains(self, p: Vec2) -> bool {
        let max = self.max();
        !self.is_empty()
            && p.x >= self.origin.x
            && p.y >= self.origin.y
            && p.x < max.x
            && p.y < max.y
    }

    #[inline]
    pub fn translated(self, by: Vec2) -> Rect {
        Rect::from_origin_size(self.origin + by, self.size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn r(x: f32, y: f32, w: f32, h: f32) -> Rect { Rect::new(x, y, w, h) }

    // ── contains ──────────────────────────────────────────────────────────

    #[test]
    fn contains_interior_point() {
        assert!(r(0.0, 0.0, 10.0, 10.0).contains(Vec2::new(5.0, 5.0)));
    }

    #[test]
    fn contains_top_left_inclusive() {
        assert!(r(2.0, 3.0, 10.0, 10.0).contains(Vec2::new(2.0, 3.0)));
    }

    #[test]
    fn contains_bottom_right_exclusive() {
        assert!(!r(0.0, 0.0, 10.0, 10.0).contains(Vec2::new(10.0, 10.0)));
        assert!(!r(0.0, 0.0, 10.0, 10.0).contains(Vec2::new(10.0, 4.0)));
    }

    #[test]
    fn empty_rect_contains_nothing() {
        assert!(!r(0.0, 0.0, 0.0, 10.0).contains(Vec2::new(0.0, 0.0)));
    }

    // ── translate ─────────────────────────────────────────────────────────

    #[test]
    fn translated_moves_origin_keeps_size() {
        let t = r(1.0, 2.0, 3.0, 4.0).translated(Vec2::new(10.0, 20.0));
        assert_eq!(t, r(11.0, 22.0, 3.0, 4.0));
    }

    #[test]
    fn non_finite_origin_is_detected() {
        assert!(!r(f32::NAN, 0.0, 1.0, 1.0).is_finite());
        assert!(r(0.0, 0.0, 1.0, 1.0).is_finite());
    }
}
