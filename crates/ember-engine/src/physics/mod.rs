//! Rigid body world advanced at a fixed step.
//!
//! Gravity and optional bounds only: no collision between bodies.

mod world;

pub use world::{BodyDesc, BodyHandle, PhysicsWorld};
