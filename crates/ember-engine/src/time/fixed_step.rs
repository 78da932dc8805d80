/// Upper bound on carried time, in steps.
pub const MAX_CARRIED_STEPS: f32 = 4.0;

/// Fixed-timestep accumulator.
///
/// Decouples the simulation rate from the display rate: elapsed frame time is
/// accumulated and one step is signalled whenever a full step's worth is
/// available. At most one step is signalled per frame. A frame that arrives
/// late leaves the surplus in the accumulator and the owed steps are paid back
/// on the following frames, one each, instead of in a catch-up loop.
///
/// The carried time is capped at [`MAX_CARRIED_STEPS`] steps, so a display
/// that runs slower than the simulation sheds time instead of accruing an
/// unbounded debt.
#[derive(Debug, Clone)]
pub struct FixedStep {
    step: f32,
    accumulated: f32,
    steps_taken: u64,
}

impl FixedStep {
    /// Creates an accumulator for a step of `step` seconds.
    ///
    /// Non-positive or non-finite steps fall back to 1/60 s.
    pub fn new(step: f32) -> Self {
        let step = if step.is_finite() && step > 0.0 { step } else { 1.0 / 60.0 };
        Self {
            step,
            accumulated: 0.0,
            steps_taken: 0,
        }
    }

    /// Adds `dt` seconds and returns whether a fixed step is due this frame.
    pub fn advance(&mut self, dt: f32) -> bool {
        if dt.is_finite() && dt > 0.0 {
            self.accumulated = (self.accumulated + dt).min(self.step * MAX_CARRIED_STEPS);
        }

        if self.accumulated < self.step {
            return false;
        }

        self.accumulated -= self.step;
        self.steps_taken += 1;
        true
    }

    #[inline]
    pub fn step(&self) -> f32 {
        self.step
    }

    /// Time carried over towards the next step, in seconds.
    #[inline]
    pub fn accumulated(&self) -> f32 {
        self.accumulated
    }

    /// Carried-over time as a fraction of one step. Exceeds 1 while steps are
    /// owed, and stays below [`MAX_CARRIED_STEPS`].
    #[inline]
    pub fn alpha(&self) -> f32 {
        self.accumulated / self.step
    }

    #[inline]
    pub fn steps_taken(&self) -> u64 {
        self.steps_taken
    }

    pub fn reset(&mut self) {
        self.accumulated = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STEP: f32 = 1.0 / 60.0;

    #[test]
    fn signals_once_when_running_sum_reaches_threshold() {
        let mut fs = FixedStep::new(STEP);
        let frames = [0.005, 0.005, 0.005, 0.005];

        let signals: Vec<bool> = frames.iter().map(|&dt| fs.advance(dt)).collect();

        // 0.005, 0.010, 0.015 stay under 1/60; 0.020 crosses it.
        assert_eq!(signals, vec![false, false, false, true]);
        assert!(fs.accumulated() < STEP);
        assert!((fs.accumulated() - (0.020 - STEP)).abs() < 1e-6);
    }

    #[test]
    fn remainder_stays_below_one_step_for_short_frames() {
        let mut fs = FixedStep::new(STEP);
        for _ in 0..501 {
            let due = fs.advance(0.01);
            if due {
                assert!(fs.accumulated() < STEP);
            }
        }
        // Just over 5 seconds of 10 ms frames at 60 Hz.
        assert_eq!(fs.steps_taken(), 300);
    }

    #[test]
    fn late_frame_defers_owed_steps_instead_of_catching_up() {
        let mut fs = FixedStep::new(STEP);

        // A single frame worth three steps only runs one.
        assert!(fs.advance(3.0 * STEP + 0.001));
        assert_eq!(fs.steps_taken(), 1);

        // The two owed steps are paid back on the next frames, even with no new time.
        assert!(fs.advance(0.0));
        assert!(fs.advance(0.0));
        assert!(!fs.advance(0.0));
        assert_eq!(fs.steps_taken(), 3);
    }

    #[test]
    fn frames_at_50_hz_signal_at_most_once_each() {
        let mut fs = FixedStep::new(STEP);
        let mut signals = 0;
        for _ in 0..50 {
            if fs.advance(1.0 / 50.0) {
                signals += 1;
            }
        }
        // One step per frame at most; the surplus stays owed.
        assert_eq!(signals, 50);
        assert!(fs.accumulated() > STEP);
    }

    #[test]
    fn slow_display_keeps_owed_time_bounded() {
        let mut fs = FixedStep::new(STEP);
        // 30 fps against a 60 Hz step: one step per frame, one step of surplus each time.
        for _ in 0..1000 {
            assert!(fs.advance(1.0 / 30.0));
        }
        assert!(fs.alpha() < MAX_CARRIED_STEPS);
        assert!(fs.accumulated() <= (MAX_CARRIED_STEPS - 1.0) * STEP + 1e-6);
    }

    #[test]
    fn alpha_is_remainder_over_step() {
        let mut fs = FixedStep::new(0.1);
        assert!(!fs.advance(0.025));
        assert!((fs.alpha() - 0.25).abs() < 1e-5);

        assert!(fs.advance(0.1));
        assert!((fs.alpha() - 0.25).abs() < 1e-5);
    }

    #[test]
    fn reset_drops_carried_time_but_keeps_the_count() {
        let mut fs = FixedStep::new(STEP);
        assert!(fs.advance(2.5 * STEP));
        fs.reset();
        assert_eq!(fs.accumulated(), 0.0);
        assert_eq!(fs.steps_taken(), 1);
        assert!(!fs.advance(0.5 * STEP));
    }

    #[test]
    fn invalid_dt_is_ignored() {
        let mut fs = FixedStep::new(STEP);
        assert!(!fs.advance(f32::NAN));
        assert!(!fs.advance(-1.0));
        assert_eq!(fs.accumulated(), 0.0);
    }

    #[test]
    fn invalid_step_falls_back_to_sixty_hz() {
        assert_eq!(FixedStep::new(0.0).step(), STEP);
        assert_eq!(FixedStep::new(f32::INFINITY).step(), STEP);
    }
}
