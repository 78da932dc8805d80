use core::fmt;

use super::render_pass::run_render_pass;
use super::scene_pass::collect_frame;
use super::{Hierarchy, InputBackend, Physics, RenderBackend};
use crate::config::Settings;
use crate::input::DispatchReport;
use crate::paint::Color;
use crate::store::StateAccess;
use crate::time::{FixedStep, WarmupGate};

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum LoopState {
    /// Grace period: blank frames only.
    Warmup,
    Running,
    /// Final. `frame` does nothing from here on.
    Terminated,
}

impl LoopState {
    pub fn as_str(self) -> &'static str {
        match self {
            LoopState::Warmup => "warmup",
            LoopState::Running => "running",
            LoopState::Terminated => "terminated",
        }
    }
}

impl fmt::Display for LoopState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct LoopConfig {
    /// Grace period, in seconds.
    pub warmup_secs: f32,
    /// Fixed simulation step, in seconds.
    pub fixed_dt: f32,
    pub clear_color: Color,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self::from_settings(&Settings::default())
    }
}

impl LoopConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            warmup_secs: settings.warmup_secs,
            fixed_dt: settings.fixed_dt,
            clear_color: settings.clear_color(),
        }
    }
}

/// Running counters. Totals unless noted.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct FrameStats {
    pub frames: u64,
    pub warmup_frames: u64,
    pub fixed_steps: u64,
    /// Due steps the physics collaborator refused.
    pub physics_stalls: u64,
    pub dropped_frames: u64,
    pub skipped_draws: u64,
    pub events_consumed: u64,
    pub events_unclaimed: u64,
    /// Events that arrived during warmup and were never delivered.
    pub events_discarded: u64,
    pub receiver_errors: u64,
    /// Last running frame.
    pub drawables: usize,
    /// Last running frame.
    pub receivers: usize,
    /// Last frame.
    pub last_dt: f32,
    /// Sum of frame times, in seconds.
    pub elapsed: f64,
}

impl FrameStats {
    fn record_dispatch(&mut self, report: DispatchReport) {
        self.events_consumed += u64::from(report.consumed);
        self.events_unclaimed += u64::from(report.unclaimed);
        self.receiver_errors += u64::from(report.failed);
    }
}

/// Borrowed subsystems for one frame.
pub struct Collaborators<'a, H, P, R, I, S: ?Sized> {
    pub hierarchy: &'a mut H,
    pub physics: &'a mut P,
    pub renderer: &'a mut R,
    pub input: &'a mut I,
    pub state: &'a S,
}

/// Frame state machine: `Warmup` → `Running` → `Terminated`.
#[derive(Debug)]
pub struct LoopController {
    state: LoopState,
    warmup: WarmupGate,
    fixed: FixedStep,
    clear: Color,
    stats: FrameStats,
}

impl LoopController {
    pub fn new(config: LoopConfig) -> Self {
        let warmup = WarmupGate::new(config.warmup_secs);
        log::debug!("warmup period {:.1}s", warmup.remaining());
        Self {
            state: LoopState::Warmup,
            warmup,
            fixed: FixedStep::new(config.fixed_dt),
            clear: config.clear_color,
            stats: FrameStats::default(),
        }
    }

    #[inline]
    pub fn state(&self) -> LoopState {
        self.state
    }

    #[inline]
    pub fn stats(&self) -> &FrameStats {
        &self.stats
    }

    /// Runs one iteration and returns the state after the exit check.
    pub fn frame<H, P, R, I, S>(
        &mut self,
        c: Collaborators<'_, H, P, R, I, S>,
        dt: f32,
        close_requested: bool,
    ) -> LoopState
    where
        H: Hierarchy<P>,
        P: Physics,
        R: RenderBackend,
        I: InputBackend,
        S: StateAccess + ?Sized,
    {
        if self.state == LoopState::Terminated {
            return self.state;
        }

        self.stats.frames += 1;
        self.stats.last_dt = dt;
        self.stats.elapsed += f64::from(dt);

        if self.state == LoopState::Warmup && self.warmup.advance(dt) {
            self.state = LoopState::Running;
            log::info!(
                "warmup finished after {} frames; entering main loop",
                self.stats.warmup_frames
            );
        }

        match self.state {
            LoopState::Warmup => self.blank_frame(c.renderer, c.input),
            LoopState::Running => self.running_frame(c.hierarchy, c.physics, c.renderer, c.input, dt),
            LoopState::Terminated => {}
        }

        if close_requested || c.state.quit_requested() {
            log::info!(
                "terminating after frame {} ({})",
                self.stats.frames,
                if close_requested { "window close" } else { "quit requested" }
            );
            self.state = LoopState::Terminated;
        }

        self.state
    }

    fn blank_frame<R: RenderBackend, I: InputBackend>(&mut self, renderer: &mut R, input: &mut I) {
        self.stats.warmup_frames += 1;
        let dropped = input.discard();
        if dropped > 0 {
            self.stats.events_discarded += dropped as u64;
            log::debug!("discarded {dropped} input event(s) during warmup");
        }
        if let Err(err) = renderer.present_blank(self.clear) {
            self.stats.dropped_frames += 1;
            log::warn!("blank present failed: {err}");
        }
    }

    fn running_frame<H, P, R, I>(
        &mut self,
        hierarchy: &mut H,
        physics: &mut P,
        renderer: &mut R,
        input: &mut I,
        dt: f32,
    ) where
        H: Hierarchy<P>,
        P: Physics,
        R: RenderBackend,
        I: InputBackend,
    {
        let simulate_now = self.fixed.advance(dt);
        if simulate_now {
            if physics.step() {
                self.stats.fixed_steps += 1;
            } else {
                self.stats.physics_stalls += 1;
                log::warn!("physics step due but the world did not step");
            }
        }

        let traversal = collect_frame(hierarchy, physics, simulate_now, dt);
        self.stats.drawables = traversal.drawables.len();
        self.stats.receivers = traversal.receivers.len();

        match run_render_pass(renderer, self.clear, &traversal.drawables) {
            Ok(pass) => {
                self.stats.skipped_draws += pass.skipped as u64;
                let report = input.dispatch(&traversal.receivers, hierarchy);
                self.stats.record_dispatch(report);
            }
            Err(err) => {
                self.stats.dropped_frames += 1;
                log::warn!("dropping frame {}: {err}", self.stats.frames);
            }
        }
    }
}
