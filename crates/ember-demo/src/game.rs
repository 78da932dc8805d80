use std::sync::Arc;
use std::sync::atomic::{AtomicI32, Ordering};

use anyhow::Result;
use ember_engine::coords::{Rect, Vec2};
use ember_engine::core::{Game, GameInit};
use ember_engine::input::{
    EventResult, InputEvent, Interest, Key, KeyState, MouseButton, MouseButtonState, RoutedEvent,
};
use ember_engine::paint::Color;
use ember_engine::physics::{BodyDesc, PhysicsWorld};
use ember_engine::scene::{Behavior, Node, Sprite, ZIndex};
use ember_engine::store::{AppState, AppStore};

/// Overlapping cards that jump to the top when clicked, a bouncing ball
/// kicked with Space, and Escape to quit.
#[derive(Default)]
pub struct Playground;

impl Game for Playground {
    fn init(&mut self, ctx: &mut GameInit<'_>) -> Result<()> {
        let world = ctx.world_size();
        ctx.physics
            .set_bounds(Some(Rect::from_origin_size(Vec2::zero(), world)));

        let table = ctx.tree.spawn(None, Node::at(Vec2::new(40.0, 40.0)))?;
        let top = Arc::new(AtomicI32::new(0));
        let palette = [
            Color::from_rgba8(0xe0, 0x6c, 0x75, 0xff),
            Color::from_rgba8(0x98, 0xc3, 0x79, 0xff),
            Color::from_rgba8(0x61, 0xaf, 0xef, 0xff),
            Color::from_rgba8(0xe5, 0xc0, 0x7b, 0xc0),
        ];
        for (i, color) in palette.into_iter().enumerate() {
            let offset = Vec2::new(i as f32 * 36.0, i as f32 * 24.0);
            let card = ctx.tree.spawn(
                Some(table),
                Node::at(offset).with_sprite(Sprite::new(Vec2::new(96.0, 128.0), color)),
            )?;
            ctx.tree.attach(card, Card { top: Arc::clone(&top) })?;
        }

        let ppu = ctx.physics.pixels_per_unit();
        let body = ctx.physics.add_body(BodyDesc {
            position: Vec2::new(world.x * 0.75, 1.0),
            restitution: 0.7,
            ..BodyDesc::default()
        });
        let ball = ctx.tree.spawn(
            None,
            Node::default()
                .with_sprite(Sprite::new(
                    Vec2::new(ppu * 0.5, ppu * 0.5),
                    Color::from_rgba8(0xc6, 0x78, 0xdd, 0xff),
                ))
                .with_body(body)
                .with_z(10),
        )?;
        ctx.tree.attach(ball, Ball { kick: false })?;

        let keys = ctx.tree.spawn(None, Node::default())?;
        ctx.tree.attach(
            keys,
            QuitKey {
                store: Arc::clone(ctx.store),
            },
        )?;

        log::info!("playground ready: {} entities", ctx.tree.len());
        Ok(())
    }

    fn deinit(&mut self, store: &AppStore) {
        let quit = store
            .get::<AppState>()
            .map(|s| s.should_quit())
            .unwrap_or(false);
        log::info!("playground closing (quit requested: {quit})");
    }
}

/// Raises itself above its siblings on left click.
struct Card {
    top: Arc<AtomicI32>,
}

impl Behavior for Card {
    fn interest(&self) -> Interest {
        Interest::POINTER
    }

    fn on_input(&mut self, node: &mut Node, event: &RoutedEvent) -> Result<EventResult> {
        match &event.event {
            InputEvent::PointerButton(b)
                if b.button == MouseButton::Left && b.state == MouseButtonState::Pressed =>
            {
                node.z = ZIndex(self.top.fetch_add(1, Ordering::Relaxed)).raised();
                Ok(EventResult::Consumed)
            }
            _ => Ok(EventResult::Declined),
        }
    }
}

/// Physics-driven sprite; Space kicks it upwards on the next fixed step.
struct Ball {
    kick: bool,
}

impl Behavior for Ball {
    fn interest(&self) -> Interest {
        Interest::KEYS
    }

    fn fixed_update(&mut self, node: &mut Node, physics: &mut PhysicsWorld) {
        if std::mem::take(&mut self.kick) {
            if let Some(body) = node.body {
                physics.apply_impulse(body, Vec2::new(0.0, -8.0));
            }
        }
    }

    fn on_input(&mut self, _node: &mut Node, event: &RoutedEvent) -> Result<EventResult> {
        match &event.event {
            InputEvent::Key {
                key: Key::Space,
                state: KeyState::Pressed,
                repeat: false,
                ..
            } => {
                self.kick = true;
                Ok(EventResult::Consumed)
            }
            _ => Ok(EventResult::Declined),
        }
    }
}

/// Invisible receiver that requests quit on Escape.
struct QuitKey {
    store: Arc<AppStore>,
}

impl Behavior for QuitKey {
    fn interest(&self) -> Interest {
        Interest::KEYS
    }

    fn on_input(&mut self, _node: &mut Node, event: &RoutedEvent) -> Result<EventResult> {
        match &event.event {
            InputEvent::Key {
                key: Key::Escape,
                state: KeyState::Pressed,
                ..
            } => {
                anyhow::ensure!(self.store.request_quit(), "app state missing from store");
                Ok(EventResult::Consumed)
            }
            _ => Ok(EventResult::Declined),
        }
    }
}
