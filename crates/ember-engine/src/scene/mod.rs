//! Entity hierarchy and its per-frame traversal.
//!
//! Responsibilities:
//! - own entities, their nodes and behaviors
//! - produce the frame's drawables and input candidates in one depth-first walk
//! - deterministic sibling ordering (z-index + insertion order)

mod entity;
mod key;
mod traversal;
mod tree;
mod z_index;

pub use entity::{Behavior, Node, Sprite};
pub use key::{DrawOrder, EntityId, SiblingKey};
pub use traversal::{DrawableEntity, InputReceiverCandidate, Traversal};
pub use tree::EntityTree;
pub use z_index::ZIndex;
