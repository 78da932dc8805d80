//! Frame timing.
//!
//! - `FrameClock` turns wall-clock instants into per-frame `dt`
//! - `FixedStep` decides when a fixed-rate simulation step is due
//! - `WarmupGate` tracks the startup grace period

mod fixed_step;
mod frame_clock;
mod warmup;

pub use fixed_step::{FixedStep, MAX_CARRIED_STEPS};
pub use frame_clock::{FrameClock, FrameTime};
pub use warmup::WarmupGate;
