//! Ember engine crate.
//!
//! Frame orchestration for a single-window 2D game: staged startup with
//! reverse-order teardown, a warmup period of blank frames, fixed-step
//! simulation, ordered offscreen sprite rendering and input dispatched after
//! the frame is presented.

pub mod config;
pub mod coords;
pub mod core;
pub mod device;
pub mod diagnostics;
pub mod frame;
pub mod input;
pub mod logging;
pub mod paint;
pub mod physics;
pub mod render;
pub mod scene;
pub mod startup;
pub mod store;
pub mod time;
pub mod window;
