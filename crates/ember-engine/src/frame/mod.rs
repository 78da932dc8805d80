//! Per-frame orchestration.
//!
//! The controller owns no subsystem. Each frame it borrows them through
//! [`Collaborators`] and drives them in a fixed order:
//! physics step (when due), traversal, render pass, input dispatch, exit check.

mod contracts;
mod controller;
mod render_pass;
mod scene_pass;

pub use contracts::{
    AcquireError, DrawError, Hierarchy, InputBackend, InputSink, Physics, Release, RenderBackend,
    TraverseCtx,
};
pub use controller::{Collaborators, FrameStats, LoopConfig, LoopController, LoopState};
pub use render_pass::{run_render_pass, PassStats};
pub use scene_pass::collect_frame;
