use std::time::Duration;

use serde::Serialize;

use crate::frame::{FrameStats, LoopState};

/// Snapshot of the loop after one frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FrameTelemetry {
    pub frame: u64,
    pub state: &'static str,
    pub dt: f32,
    pub fixed_steps: u64,
    pub drawables: usize,
    pub receivers: usize,
    pub dropped_frames: u64,
    pub skipped_draws: u64,
    pub events_consumed: u64,
    pub events_unclaimed: u64,
    pub receiver_errors: u64,
    pub uptime_secs: f64,
}

impl FrameTelemetry {
    pub fn capture(state: LoopState, stats: &FrameStats, uptime: Duration) -> Self {
        Self {
            frame: stats.frames,
            state: state.as_str(),
            dt: stats.last_dt,
            fixed_steps: stats.fixed_steps,
            drawables: stats.drawables,
            receivers: stats.receivers,
            dropped_frames: stats.dropped_frames,
            skipped_draws: stats.skipped_draws,
            events_consumed: stats.events_consumed,
            events_unclaimed: stats.events_unclaimed,
            receiver_errors: stats.receiver_errors,
            uptime_secs: uptime.as_secs_f64(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_state_as_a_string() {
        let stats = FrameStats {
            frames: 12,
            fixed_steps: 4,
            ..FrameStats::default()
        };
        let t = FrameTelemetry::capture(LoopState::Running, &stats, Duration::from_secs(2));
        let json = serde_json::to_value(&t).unwrap();

        assert_eq!(json["frame"], 12);
        assert_eq!(json["state"], "running");
        assert_eq!(json["fixed_steps"], 4);
        assert_eq!(json["uptime_secs"], 2.0);
    }
}
