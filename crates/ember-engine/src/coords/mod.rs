//! Geometry shared by the scene, the input dispatcher and the renderer.
//!
//! Canonical CPU space is render space:
//! - pixels of the offscreen render target
//! - origin top-left, +X right, +Y down
//!
//! Window pointer coordinates are mapped into this space before hit-testing.

mod rect;
mod vec2;

pub use rect::Rect;
pub use vec2::Vec2;
