use std::time::{Duration, Instant};

/// Frame timing snapshot.
#[derive(Debug, Copy, Clone)]
pub struct FrameTime {
    /// Time elapsed since the previous tick, in seconds.
    pub dt: f32,

    /// Monotonic timestamp taken at the tick.
    pub now: Instant,

    /// Monotonic frame counter.
    pub frame_index: u64,
}

/// Wall-clock source of per-frame delta time.
///
/// Delta time is clamped so a debugger pause or a minimized window does not
/// hand the loop a multi-second frame. The upper clamp only bounds a single
/// frame; owed fixed steps are still paid back one per frame by `FixedStep`.
#[derive(Debug, Clone)]
pub struct FrameClock {
    last: Instant,
    frame_index: u64,
    dt_min: Duration,
    dt_max: Duration,
}

impl FrameClock {
    pub fn new() -> Self {
        Self::with_clamps(Duration::from_micros(100), Duration::from_millis(250))
    }

    pub fn with_clamps(dt_min: Duration, dt_max: Duration) -> Self {
        debug_assert!(dt_min <= dt_max);
        Self {
            last: Instant::now(),
            frame_index: 0,
            dt_min,
            dt_max,
        }
    }

    /// Resets the baseline, e.g. once startup finished and the first frame is about to run.
    pub fn reset(&mut self) {
        self.last = Instant::now();
    }

    pub fn tick(&mut self) -> FrameTime {
        self.tick_at(Instant::now())
    }

    /// Advances the clock to `now`.
    pub fn tick_at(&mut self, now: Instant) -> FrameTime {
        let dt = now
            .saturating_duration_since(self.last)
            .clamp(self.dt_min, self.dt_max);

        self.last = now;

        let ft = FrameTime {
            dt: dt.as_secs_f32(),
            now,
            frame_index: self.frame_index,
        };
        self.frame_index = self.frame_index.wrapping_add(1);
        ft
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tick_reports_elapsed_and_counts_frames() {
        let mut clock = FrameClock::new();
        let start = clock.last;

        let a = clock.tick_at(start + Duration::from_millis(16));
        let b = clock.tick_at(start + Duration::from_millis(32));

        assert!((a.dt - 0.016).abs() < 1e-6);
        assert!((b.dt - 0.016).abs() < 1e-6);
        assert_eq!(a.frame_index, 0);
        assert_eq!(b.frame_index, 1);
    }

    #[test]
    fn long_stall_is_clamped() {
        let mut clock = FrameClock::with_clamps(Duration::from_micros(100), Duration::from_millis(100));
        let start = clock.last;
        let ft = clock.tick_at(start + Duration::from_secs(3));
        assert!((ft.dt - 0.1).abs() < 1e-6);
    }

    #[test]
    fn zero_interval_is_raised_to_minimum() {
        let mut clock = FrameClock::with_clamps(Duration::from_millis(1), Duration::from_millis(100));
        let start = clock.last;
        let ft = clock.tick_at(start);
        assert!((ft.dt - 0.001).abs() < 1e-6);
    }
}
