//! Window + runtime loop.
//!
//! Owns the `winit` EventLoop and Window, runs the startup sequence on the
//! first `resumed`, and drives one `LoopController` frame per redraw.

mod runtime;

pub use runtime::Runtime;
