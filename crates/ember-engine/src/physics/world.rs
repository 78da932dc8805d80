use anyhow::{ensure, Result};

use crate::coords::{Rect, Vec2};

/// Handle to a body owned by a [`PhysicsWorld`].
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct BodyHandle(u32);

impl BodyHandle {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Body creation parameters, in world units.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct BodyDesc {
    pub position: Vec2,
    pub velocity: Vec2,
    /// Static bodies never move.
    pub dynamic: bool,
    /// Fraction of velocity kept when bouncing off the world bounds.
    pub restitution: f32,
}

impl Default for BodyDesc {
    fn default() -> Self {
        Self {
            position: Vec2::zero(),
            velocity: Vec2::zero(),
            dynamic: true,
            restitution: 0.5,
        }
    }
}

#[derive(Debug, Clone)]
struct Body {
    position: Vec2,
    velocity: Vec2,
    dynamic: bool,
    restitution: f32,
}

/// Gravity-only world.
///
/// Positions are in world units; `position_px` converts with the configured
/// pixels-per-unit so the scene can place sprites in render space.
#[derive(Debug)]
pub struct PhysicsWorld {
    fixed_dt: f32,
    gravity: Vec2,
    pixels_per_unit: f32,
    bodies: Vec<Body>,
    bounds: Option<Rect>,
    alive: bool,
    steps: u64,
}

impl PhysicsWorld {
    pub fn init(fixed_dt: f32, gravity: Vec2, pixels_per_unit: f32) -> Result<Self> {
        ensure!(
            fixed_dt.is_finite() && fixed_dt > 0.0,
            "physics step must be positive, got {fixed_dt}"
        );
        ensure!(gravity.is_finite(), "gravity must be finite");
        ensure!(
            pixels_per_unit.is_finite() && pixels_per_unit > 0.0,
            "pixels per unit must be positive, got {pixels_per_unit}"
        );

        log::info!(
            "physics world: dt={fixed_dt:.4}s gravity=({}, {}) ppu={pixels_per_unit}",
            gravity.x,
            gravity.y
        );

        Ok(Self {
            fixed_dt,
            gravity,
            pixels_per_unit,
            bodies: Vec::new(),
            bounds: None,
            alive: true,
            steps: 0,
        })
    }

    /// Keeps dynamic bodies inside `bounds` (world units), bouncing on contact.
    pub fn set_bounds(&mut self, bounds: Option<Rect>) {
        self.bounds = bounds;
    }

    pub fn add_body(&mut self, desc: BodyDesc) -> BodyHandle {
        let handle = BodyHandle(self.bodies.len() as u32);
        self.bodies.push(Body {
            position: desc.position,
            velocity: desc.velocity,
            dynamic: desc.dynamic,
            restitution: desc.restitution.clamp(0.0, 1.0),
        });
        handle
    }

    pub fn position(&self, body: BodyHandle) -> Option<Vec2> {
        self.bodies.get(body.index()).map(|b| b.position)
    }

    pub fn velocity(&self, body: BodyHandle) -> Option<Vec2> {
        self.bodies.get(body.index()).map(|b| b.velocity)
    }

    /// Body position converted to render-space pixels.
    pub fn position_px(&self, body: BodyHandle) -> Option<Vec2> {
        self.position(body).map(|p| p * self.pixels_per_unit)
    }

    /// Adds `impulse` (units per second) to a dynamic body's velocity.
    pub fn apply_impulse(&mut self, body: BodyHandle, impulse: Vec2) {
        if let Some(b) = self.bodies.get_mut(body.index()) {
            if b.dynamic {
                b.velocity += impulse;
            }
        }
    }

    #[inline]
    pub fn pixels_per_unit(&self) -> f32 {
        self.pixels_per_unit
    }

    #[inline]
    pub fn fixed_dt(&self) -> f32 {
        self.fixed_dt
    }

    #[inline]
    pub fn steps(&self) -> u64 {
        self.steps
    }

    #[inline]
    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    #[inline]
    pub fn is_alive(&self) -> bool {
        self.alive
    }

    /// Advances every dynamic body by one fixed step (semi-implicit Euler).
    ///
    /// Returns `false` once the world has been torn down.
    pub fn step(&mut self) -> bool {
        if !self.alive {
            return false;
        }

        let dt = self.fixed_dt;
        for b in self.bodies.iter_mut().filter(|b| b.dynamic) {
            b.velocity += self.gravity * dt;
            b.position += b.velocity * dt;

            if let Some(bounds) = self.bounds {
                confine(b, bounds);
            }
        }

        self.steps += 1;
        true
    }

    pub fn deinit(&mut self) {
        if !self.alive {
            return;
        }
        log::info!("physics world shut down after {} steps", self.steps);
        self.bodies.clear();
        self.alive = false;
    }
}

fn confine(b: &mut Body, bounds: Rect) {
    let max = bounds.max();

    if b.position.x < bounds.origin.x {
        b.position.x = bounds.origin.x;
        b.velocity.x = -b.velocity.x * b.restitution;
    } else if b.position.x > max.x {
        b.position.x = max.x;
        b.velocity.x = -b.velocity.x * b.restitution;
    }

    if b.position.y < bounds.origin.y {
        b.position.y = bounds.origin.y;
        b.velocity.y = -b.velocity.y * b.restitution;
    } else if b.position.y > max.y {
        b.position.y = max.y;
        b.velocity.y = -b.velocity.y * b.restitution;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn world() -> PhysicsWorld {
        PhysicsWorld::init(0.5, Vec2::new(0.0, 10.0), 32.0).unwrap()
    }

    // ── init ────────────────────────────────────────────────────────────────

    #[test]
    fn init_rejects_bad_parameters() {
        assert!(PhysicsWorld::init(0.0, Vec2::zero(), 32.0).is_err());
        assert!(PhysicsWorld::init(1.0 / 60.0, Vec2::new(f32::NAN, 0.0), 32.0).is_err());
        assert!(PhysicsWorld::init(1.0 / 60.0, Vec2::zero(), -1.0).is_err());
    }

    // ── stepping ────────────────────────────────────────────────────────────

    #[test]
    fn step_applies_gravity_semi_implicitly() {
        let mut w = world();
        let b = w.add_body(BodyDesc::default());

        assert!(w.step());
        // v = 10 * 0.5 = 5, p = 5 * 0.5 = 2.5
        assert_eq!(w.velocity(b), Some(Vec2::new(0.0, 5.0)));
        assert_eq!(w.position(b), Some(Vec2::new(0.0, 2.5)));
        assert_eq!(w.position_px(b), Some(Vec2::new(0.0, 80.0)));
        assert_eq!(w.steps(), 1);
    }

    #[test]
    fn static_bodies_do_not_move() {
        let mut w = world();
        let b = w.add_body(BodyDesc {
            position: Vec2::new(1.0, 1.0),
            dynamic: false,
            ..BodyDesc::default()
        });
        w.apply_impulse(b, Vec2::new(3.0, 0.0));
        w.step();
        assert_eq!(w.position(b), Some(Vec2::new(1.0, 1.0)));
    }

    #[test]
    fn bounds_bounce_with_restitution() {
        let mut w = world();
        w.set_bounds(Some(Rect::new(0.0, 0.0, 10.0, 2.0)));
        let b = w.add_body(BodyDesc {
            restitution: 0.5,
            ..BodyDesc::default()
        });

        w.step();
        let p = w.position(b).unwrap();
        let v = w.velocity(b).unwrap();
        assert_eq!(p.y, 2.0);
        assert_eq!(v.y, -2.5);
    }

    // ── lifecycle ──────────────────────────────────────────────────────────

    #[test]
    fn step_after_deinit_reports_false() {
        let mut w = world();
        w.add_body(BodyDesc::default());
        w.deinit();
        assert!(!w.is_alive());
        assert_eq!(w.body_count(), 0);
        assert!(!w.step());
        assert_eq!(w.steps(), 0);
    }
}
