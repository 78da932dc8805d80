use anyhow::Result;

use crate::coords::{Rect, Vec2};
use crate::input::{EventResult, Interest, RoutedEvent};
use crate::paint::Color;
use crate::physics::{BodyHandle, PhysicsWorld};

use super::ZIndex;

/// Solid rectangle attached to an entity.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Sprite {
    pub size: Vec2,
    pub color: Color,
}

impl Sprite {
    pub fn new(size: Vec2, color: Color) -> Self {
        Self { size, color }
    }
}

/// The data behaviors are allowed to touch.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    /// Position relative to the parent, in render-space pixels.
    pub offset: Vec2,
    pub z: ZIndex,
    /// Hidden nodes and their subtrees emit nothing.
    pub visible: bool,
    pub sprite: Option<Sprite>,
    /// When set, the body's position replaces parent + offset.
    pub body: Option<BodyHandle>,
}

impl Default for Node {
    fn default() -> Self {
        Self {
            offset: Vec2::zero(),
            z: ZIndex::default(),
            visible: true,
            sprite: None,
            body: None,
        }
    }
}

impl Node {
    pub fn at(offset: Vec2) -> Self {
        Self { offset, ..Self::default() }
    }

    pub fn with_sprite(mut self, sprite: Sprite) -> Self {
        self.sprite = Some(sprite);
        self
    }

    pub fn with_z(mut self, z: i32) -> Self {
        self.z = ZIndex(z);
        self
    }

    pub fn with_body(mut self, body: BodyHandle) -> Self {
        self.body = Some(body);
        self
    }

    /// Sprite rect at the given world origin.
    pub(crate) fn sprite_rect(&self, origin: Vec2) -> Option<Rect> {
        self.sprite.map(|s| Rect::from_origin_size(origin, s.size))
    }
}

/// Per-entity game logic.
///
/// All methods have empty defaults; a behavior only overrides what it needs.
pub trait Behavior {
    /// Event kinds this entity wants to be offered.
    fn interest(&self) -> Interest {
        Interest::empty()
    }

    /// Runs on frames where a fixed simulation step was taken, after the
    /// physics step.
    fn fixed_update(&mut self, _node: &mut Node, _physics: &mut PhysicsWorld) {}

    /// Runs every frame with the variable frame time.
    fn update(&mut self, _node: &mut Node, _dt: f32) {}

    fn on_input(&mut self, _node: &mut Node, _event: &RoutedEvent) -> Result<EventResult> {
        Ok(EventResult::Declined)
    }
}

pub(crate) struct Entity {
    pub(crate) node: Node,
    pub(crate) behavior: Option<Box<dyn Behavior>>,
    pub(crate) parent: Option<super::EntityId>,
    pub(crate) children: Vec<super::EntityId>,
    /// Insertion index under the parent.
    pub(crate) order: u32,
    pub(crate) next_child_order: u32,
}

impl Entity {
    pub(crate) fn interest(&self) -> Interest {
        self.behavior.as_ref().map_or(Interest::empty(), |b| b.interest())
    }
}
