//! GPU rendering subsystem.
//!
//! The scene is drawn into a fixed-size offscreen target in render-space
//! pixels, then stretched over the window surface by a composite pass.
//!
//! Convention:
//! - CPU geometry is in render-space pixels (top-left origin, +Y down).
//! - The sprite vertex shader converts to NDC using a viewport uniform.

mod backend;
mod common;
mod composite;
mod sprite;

pub use backend::{WgpuBackend, WgpuTarget};
