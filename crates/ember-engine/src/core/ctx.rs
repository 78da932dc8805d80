use std::sync::Arc;

use crate::config::Settings;
use crate::coords::Vec2;
use crate::physics::PhysicsWorld;
use crate::scene::EntityTree;
use crate::store::AppStore;

/// Startup context passed to `core::Game::init`.
pub struct GameInit<'a> {
    pub tree: &'a mut EntityTree,
    pub physics: &'a mut PhysicsWorld,
    /// Shared with behaviors that need to request quit or read game state.
    pub store: &'a Arc<AppStore>,
    pub settings: &'a Settings,
}

impl GameInit<'_> {
    /// Render target size in pixels; scene coordinates live in this space.
    pub fn render_size(&self) -> Vec2 {
        Vec2::new(
            self.settings.render_width as f32,
            self.settings.render_height as f32,
        )
    }

    /// Render size converted to physics units.
    pub fn world_size(&self) -> Vec2 {
        self.render_size() * (1.0 / self.physics.pixels_per_unit())
    }
}
