use anyhow::{ensure, Result};

use crate::device::{Gpu, GpuFrame};
use crate::frame::{AcquireError, DrawError, Release, RenderBackend};
use crate::paint::Color;
use crate::scene::DrawableEntity;

use super::composite::{CompositePipeline, OffscreenTarget, OFFSCREEN_FORMAT};
use super::sprite::{SpriteInstance, SpritePipeline};

/// Bound on sprites per frame.
const MAX_SPRITES: usize = 16 * 1024;

/// Color behind the stretched render target (visible only through transparency).
const SURFACE_CLEAR: Color = Color::BLACK;

/// Offscreen sprite renderer with a composite-to-surface pass.
///
/// Holds GPU resources only; it is paired with the [`Gpu`] per frame through
/// [`WgpuTarget`].
pub struct WgpuBackend {
    offscreen: OffscreenTarget,
    sprites: SpritePipeline,
    composite: CompositePipeline,

    instances: Vec<SpriteInstance>,
    clear: Color,

    /// Surface frame between `acquire` and `release`.
    frame: Option<GpuFrame>,
    frames_presented: u64,
    alive: bool,
}

impl WgpuBackend {
    /// Creates the render target and pipelines. `viewport` is the render size in pixels.
    pub fn init(gpu: &Gpu<'_>, viewport: (u32, u32)) -> Result<Self> {
        ensure!(
            viewport.0 > 0 && viewport.1 > 0,
            "render size must be non-zero, got {}x{}",
            viewport.0,
            viewport.1
        );

        let max_dim = gpu.device().limits().max_texture_dimension_2d;
        ensure!(
            viewport.0 <= max_dim && viewport.1 <= max_dim,
            "render size {}x{} exceeds the device limit of {max_dim}",
            viewport.0,
            viewport.1
        );

        let device = gpu.device();
        let offscreen = OffscreenTarget::new(device, viewport);
        let sprites = SpritePipeline::new(device, OFFSCREEN_FORMAT, viewport);
        let composite = CompositePipeline::new(device, gpu.surface_format(), &offscreen);

        log::info!(
            "render backend: {}x{} target -> {:?} surface",
            viewport.0,
            viewport.1,
            gpu.surface_format()
        );

        Ok(Self {
            offscreen,
            sprites,
            composite,
            instances: Vec::new(),
            clear: Color::TRANSPARENT,
            frame: None,
            frames_presented: 0,
            alive: true,
        })
    }

    /// Releases any frame in flight. Further acquires fail.
    pub fn deinit(&mut self) {
        if !self.alive {
            return;
        }
        self.frame = None;
        self.instances = Vec::new();
        self.alive = false;
        log::info!("render backend shut down after {} frames", self.frames_presented);
    }

    fn commit(&mut self, gpu: &mut Gpu<'_>) {
        let Some(mut frame) = self.frame.take() else { return };

        self.sprites
            .upload(gpu.device(), gpu.queue(), &self.instances);

        {
            let mut rpass = frame.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("ember scene pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: self.offscreen.view(),
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.clear.to_wgpu()),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });
            self.sprites.draw(&mut rpass, self.instances.len() as u32);
        }

        {
            let mut rpass = frame.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("ember composite pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &frame.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(SURFACE_CLEAR.to_wgpu()),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });
            self.composite.draw(&mut rpass);
        }

        gpu.submit(frame);
        self.frames_presented += 1;
    }
}

/// A [`WgpuBackend`] bound to its [`Gpu`] for one frame.
pub struct WgpuTarget<'a, 'w> {
    gpu: &'a mut Gpu<'w>,
    backend: &'a mut WgpuBackend,
}

impl<'a, 'w> WgpuTarget<'a, 'w> {
    pub fn new(gpu: &'a mut Gpu<'w>, backend: &'a mut WgpuBackend) -> Self {
        Self { gpu, backend }
    }
}

impl RenderBackend for WgpuTarget<'_, '_> {
    fn acquire(&mut self) -> Result<(), AcquireError> {
        if !self.backend.alive {
            return Err(AcquireError::Unavailable("render backend shut down".to_string()));
        }
        if self.backend.frame.is_some() {
            return Err(AcquireError::AlreadyAcquired);
        }

        self.backend.frame = Some(self.gpu.begin_frame()?);
        self.backend.instances.clear();
        self.backend.clear = Color::TRANSPARENT;
        Ok(())
    }

    fn clear(&mut self, color: Color) {
        self.backend.clear = color;
        self.backend.instances.clear();
    }

    fn draw(&mut self, drawable: &DrawableEntity) -> Result<(), DrawError> {
        if self.backend.frame.is_none() {
            return Err(DrawError::NotAcquired);
        }
        if self.backend.instances.len() >= MAX_SPRITES {
            return Err(DrawError::BatchFull(MAX_SPRITES));
        }

        let instance = SpriteInstance::from_drawable(drawable)?;
        self.backend.instances.push(instance);
        Ok(())
    }

    fn release(&mut self, release: Release) {
        match release {
            Release::Commit => self.backend.commit(self.gpu),
            Release::Discard => {
                if self.backend.frame.take().is_some() {
                    log::debug!("render target discarded");
                }
                self.backend.instances.clear();
            }
        }
    }

    fn present_blank(&mut self, color: Color) -> Result<(), AcquireError> {
        if !self.backend.alive {
            return Err(AcquireError::Unavailable("render backend shut down".to_string()));
        }

        let mut frame = self.gpu.begin_frame()?;
        {
            let _rpass = frame.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("ember blank pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &frame.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(color.to_wgpu()),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });
        }
        self.gpu.submit(frame);
        self.backend.frames_presented += 1;
        Ok(())
    }
}
