/// Startup grace period.
///
/// While open, the loop only presents blank frames. The frame whose `dt`
/// completes the grace duration is still a warmup frame; `advance` reports the
/// gate as finished from the following call on.
#[derive(Debug, Clone)]
pub struct WarmupGate {
    elapsed: f32,
    grace: f32,
}

impl WarmupGate {
    pub fn new(grace: f32) -> Self {
        Self {
            elapsed: 0.0,
            grace: grace.max(0.0),
        }
    }

    /// Returns `true` when the grace period already elapsed before this frame.
    /// Otherwise accumulates `dt` and returns `false`.
    pub fn advance(&mut self, dt: f32) -> bool {
        if self.is_open() {
            if dt.is_finite() && dt > 0.0 {
                self.elapsed += dt;
            }
            return false;
        }
        true
    }

    #[inline]
    pub fn is_open(&self) -> bool {
        self.elapsed < self.grace
    }

    #[inline]
    pub fn remaining(&self) -> f32 {
        (self.grace - self.elapsed).max(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crossing_frame_is_still_warmup() {
        let mut gate = WarmupGate::new(1.0);
        assert!(!gate.advance(0.6));
        assert!(!gate.advance(0.6)); // reaches 1.2 here
        assert!(!gate.is_open());
        assert!(gate.advance(0.016));
    }

    #[test]
    fn zero_grace_is_closed_from_the_start() {
        let mut gate = WarmupGate::new(0.0);
        assert!(gate.advance(0.016));
        assert_eq!(gate.remaining(), 0.0);
    }
}
