use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;

use crate::frame::DrawError;
use crate::scene::DrawableEntity;

use super::common::{
    premul_alpha_blend, triangle_list, QuadVertex, ViewportUniform, QUAD_INDICES, QUAD_VERTICES,
};

/// GPU instance for one drawable.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub(crate) struct SpriteInstance {
    origin: [f32; 2],
    size: [f32; 2],
    /// Premultiplied RGBA.
    color: [f32; 4],
}

impl SpriteInstance {
    const ATTRS: [wgpu::VertexAttribute; 3] = wgpu::vertex_attr_array![
        1 => Float32x2, // origin
        2 => Float32x2, // size
        3 => Float32x4  // color
    ];

    fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<SpriteInstance>() as u64,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &Self::ATTRS,
        }
    }

    /// Validates a drawable and converts it to instance data.
    pub(crate) fn from_drawable(d: &DrawableEntity) -> Result<Self, DrawError> {
        if !d.rect.is_finite() || !d.color.is_finite() {
            return Err(DrawError::NonFinite(d.id));
        }
        if d.rect.is_empty() {
            return Err(DrawError::EmptyRect(d.id));
        }
        Ok(Self {
            origin: [d.rect.origin.x, d.rect.origin.y],
            size: [d.rect.size.x, d.rect.size.y],
            color: d.color.to_array(),
        })
    }
}

/// Instanced solid-rect pipeline drawing into the offscreen target.
pub(crate) struct SpritePipeline {
    pipeline: wgpu::RenderPipeline,
    bind_group: wgpu::BindGroup,

    quad_vbo: wgpu::Buffer,
    quad_ibo: wgpu::Buffer,

    instance_vbo: Option<wgpu::Buffer>,
    instance_capacity: usize,
}

impl SpritePipeline {
    pub(crate) fn new(
        device: &wgpu::Device,
        format: wgpu::TextureFormat,
        viewport: (u32, u32),
    ) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("ember sprite shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/sprite.wgsl").into()),
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("ember sprite bgl"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: wgpu::BufferSize::new(
                        std::mem::size_of::<ViewportUniform>() as u64,
                    ),
                },
                count: None,
            }],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("ember sprite pipeline layout"),
            bind_group_layouts: &[&bind_group_layout],
            immediate_size: 0,
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("ember sprite pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[QuadVertex::layout(), SpriteInstance::layout()],
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format,
                    blend: Some(premul_alpha_blend()),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: triangle_list(),
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        });

        // The render target never resizes, so the viewport uniform is written once.
        let viewport_ubo = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("ember sprite viewport ubo"),
            contents: bytemuck::bytes_of(&ViewportUniform {
                viewport: [viewport.0.max(1) as f32, viewport.1.max(1) as f32],
                _pad: [0.0; 2],
            }),
            usage: wgpu::BufferUsages::UNIFORM,
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("ember sprite bind group"),
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: viewport_ubo.as_entire_binding(),
            }],
        });

        let quad_vbo = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("ember sprite quad vbo"),
            contents: bytemuck::cast_slice(&QUAD_VERTICES),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let quad_ibo = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("ember sprite quad ibo"),
            contents: bytemuck::cast_slice(&QUAD_INDICES),
            usage: wgpu::BufferUsages::INDEX,
        });

        Self {
            pipeline,
            bind_group,
            quad_vbo,
            quad_ibo,
            instance_vbo: None,
            instance_capacity: 0,
        }
    }

    /// Uploads this frame's instances, growing the buffer when needed.
    pub(crate) fn upload(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        instances: &[SpriteInstance],
    ) {
        if instances.is_empty() {
            return;
        }

        if instances.len() > self.instance_capacity || self.instance_vbo.is_none() {
            let new_cap = instances.len().next_power_of_two().max(64);
            self.instance_vbo = Some(device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("ember sprite instance vbo"),
                size: (new_cap * std::mem::size_of::<SpriteInstance>()) as u64,
                usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            }));
            self.instance_capacity = new_cap;
        }

        if let Some(vbo) = self.instance_vbo.as_ref() {
            queue.write_buffer(vbo, 0, bytemuck::cast_slice(instances));
        }
    }

    /// Draws `count` uploaded instances in upload order.
    pub(crate) fn draw(&self, rpass: &mut wgpu::RenderPass<'_>, count: u32) {
        let Some(instance_vbo) = self.instance_vbo.as_ref() else { return };
        if count == 0 {
            return;
        }

        rpass.set_pipeline(&self.pipeline);
        rpass.set_bind_group(0, &self.bind_group, &[]);
        rpass.set_vertex_buffer(0, self.quad_vbo.slice(..));
        rpass.set_vertex_buffer(1, instance_vbo.slice(..));
        rpass.set_index_buffer(self.quad_ibo.slice(..), wgpu::IndexFormat::Uint16);
        rpass.draw_indexed(0..QUAD_INDICES.len() as u32, 0, 0..count);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coords::Rect;
    use crate::paint::Color;
    use crate::scene::{DrawOrder, EntityId};

    fn drawable(rect: Rect, color: Color) -> DrawableEntity {
        DrawableEntity {
            id: EntityId(3),
            key: DrawOrder(0),
            rect,
            color,
        }
    }

    #[test]
    fn valid_drawable_becomes_instance() {
        let inst = SpriteInstance::from_drawable(&drawable(
            Rect::new(1.0, 2.0, 3.0, 4.0),
            Color::BLACK,
        ))
        .unwrap();
        assert_eq!(inst.origin, [1.0, 2.0]);
        assert_eq!(inst.size, [3.0, 4.0]);
        assert_eq!(inst.color, Color::BLACK.to_array());
    }

    #[test]
    fn empty_rect_is_rejected() {
        let err = SpriteInstance::from_drawable(&drawable(Rect::new(0.0, 0.0, 0.0, 4.0), Color::BLACK));
        assert!(matches!(err, Err(DrawError::EmptyRect(_))));
    }

    #[test]
    fn nan_geometry_is_rejected() {
        let err = SpriteInstance::from_drawable(&drawable(
            Rect::new(f32::NAN, 0.0, 1.0, 1.0),
            Color::BLACK,
        ));
        assert!(matches!(err, Err(DrawError::NonFinite(_))));
    }
}
