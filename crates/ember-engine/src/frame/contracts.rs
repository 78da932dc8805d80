use anyhow::Result;
use thiserror::Error;

use crate::input::{DispatchReport, EventResult, RoutedEvent};
use crate::paint::Color;
use crate::physics::PhysicsWorld;
use crate::scene::{DrawableEntity, EntityId, InputReceiverCandidate, Traversal};

/// Inputs to one hierarchy traversal.
pub struct TraverseCtx<'a, P> {
    /// A fixed simulation step was taken this frame.
    pub simulate_now: bool,
    /// Variable frame time, in seconds.
    pub dt: f32,
    pub physics: &'a mut P,
}

/// Receives input the dispatcher routes to an entity.
pub trait InputSink {
    fn deliver(&mut self, target: EntityId, event: &RoutedEvent) -> Result<EventResult>;
}

/// Entity hierarchy as seen by the loop.
pub trait Hierarchy<P>: InputSink {
    /// Runs entity logic and returns this frame's drawables and input
    /// candidates, both in draw order. Called exactly once per running frame.
    fn traverse(&mut self, ctx: TraverseCtx<'_, P>) -> Traversal;
}

pub trait Physics {
    /// Advances one fixed step. Returns `false` if the world could not step.
    fn step(&mut self) -> bool;
}

impl Physics for PhysicsWorld {
    fn step(&mut self) -> bool {
        PhysicsWorld::step(self)
    }
}

/// How a scoped render target is handed back.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Release {
    /// Composite the target to the visible surface and present.
    Commit,
    /// Drop the frame's work without presenting.
    Discard,
}

/// Failure to acquire a render target. The frame is dropped.
#[derive(Debug, Error)]
pub enum AcquireError {
    #[error("surface lost or outdated; reconfigured for the next frame")]
    Reconfigured,
    #[error("timed out waiting for the next surface texture")]
    Timeout,
    #[error("out of memory acquiring the surface texture")]
    OutOfMemory,
    #[error("render target is already acquired")]
    AlreadyAcquired,
    #[error("render backend unavailable: {0}")]
    Unavailable(String),
}

/// Failure to draw one entity. The entity is skipped.
#[derive(Debug, Error)]
pub enum DrawError {
    #[error("entity {0} has an empty rect")]
    EmptyRect(EntityId),
    #[error("entity {0} has non-finite geometry or color")]
    NonFinite(EntityId),
    #[error("no render target is acquired")]
    NotAcquired,
    #[error("sprite batch is full ({0} instances)")]
    BatchFull(usize),
}

pub trait RenderBackend {
    /// Begins a render target scope.
    fn acquire(&mut self) -> Result<(), AcquireError>;

    fn clear(&mut self, color: Color);

    /// Records one drawable; calls arrive in painter's order.
    fn draw(&mut self, drawable: &DrawableEntity) -> Result<(), DrawError>;

    /// Ends the scope. Called exactly once after every successful `acquire`.
    fn release(&mut self, release: Release);

    /// Clears the visible surface and presents, without an acquire scope.
    fn present_blank(&mut self, color: Color) -> Result<(), AcquireError>;
}

pub trait InputBackend {
    /// Delivers pending events to `receivers`, which are in draw order.
    fn dispatch(
        &mut self,
        receivers: &[InputReceiverCandidate],
        sink: &mut dyn InputSink,
    ) -> DispatchReport;

    /// Drops pending events undelivered and returns how many there were.
    /// Called on warmup frames, when nothing the user could aim at is shown.
    fn discard(&mut self) -> usize;
}
