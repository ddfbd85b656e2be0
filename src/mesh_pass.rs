//! Depth-tested rendering of the character's drawables.
//!
//! [`CharacterPass`] owns one render pipeline and two bind groups:
//! - **Group 0**: frame uniforms (view-projection, global rotation, light)
//! - **Group 1**: per-drawable uniforms (model, normal matrix, color)
//!
//! Per-drawable data for a whole frame is packed into a single uniform buffer
//! at a stride aligned to the device's `min_uniform_buffer_offset_alignment`
//! and selected with a dynamic offset, so every draw of a frame is recorded
//! from one `write_buffer` call. The buffer grows when a frame has more
//! drawables than it can hold.
//!
//! # Depth Buffer
//!
//! The pass keeps its own `Depth32Float` buffer and recreates it whenever the
//! surface size changes.

use std::num::NonZeroU64;

use glam::{Mat4, Vec3};

use crate::camera::Camera;
use crate::color::Color;
use crate::drawable::Drawable;
use crate::error::InitError;
use crate::gpu::GpuContext;
use crate::mesh::{MeshLibrary, Vertex3d};
use crate::scene_graph::SceneFrame;
use crate::transform::Transform;

const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// Initial number of drawable slots in the per-draw buffer.
const INITIAL_DRAW_CAPACITY: usize = 32;

/// A single directional light plus an ambient floor.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Light {
    /// Direction towards the light, in world space.
    pub direction: Vec3,
    /// Fraction of the color that is lit regardless of orientation.
    pub ambient: f32,
}

impl Default for Light {
    fn default() -> Self {
        Self {
            direction: Vec3::new(0.4, 1.0, 1.2).normalize(),
            ambient: 0.28,
        }
    }
}

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct FrameUniforms {
    pub view_proj: [[f32; 4]; 4],
    pub global_rotation: [[f32; 4]; 4],
    /// xyz: light direction, w: ambient.
    pub light: [f32; 4],
}

impl FrameUniforms {
    pub fn new(view_proj: Mat4, global_rotation: &Transform, light: &Light) -> Self {
        Self {
            view_proj: view_proj.to_cols_array_2d(),
            global_rotation: global_rotation.matrix().to_cols_array_2d(),
            light: light.direction.extend(light.ambient).to_array(),
        }
    }
}

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct DrawUniforms {
    pub model: [[f32; 4]; 4],
    pub normal_matrix: [[f32; 4]; 4],
    pub color: [f32; 4],
}

impl DrawUniforms {
    /// Normals follow the full world matrix, so the normal matrix is the
    /// inverse transpose of `global ∘ model`.
    pub fn new(global_rotation: &Transform, drawable: &Drawable) -> Self {
        let world = drawable.world_matrix(global_rotation);
        Self {
            model: drawable.transform.matrix().to_cols_array_2d(),
            normal_matrix: world.inverse().transpose().to_cols_array_2d(),
            color: drawable.color.to_array(),
        }
    }
}

/// Rounds `size` up to the next multiple of `alignment`.
fn aligned_stride(size: u64, alignment: u64) -> u64 {
    size.div_ceil(alignment) * alignment
}

pub struct CharacterPass {
    pipeline: wgpu::RenderPipeline,
    frame_buffer: wgpu::Buffer,
    frame_bind_group: wgpu::BindGroup,
    draw_layout: wgpu::BindGroupLayout,
    draw_buffer: wgpu::Buffer,
    draw_bind_group: wgpu::BindGroup,
    draw_stride: u64,
    draw_capacity: usize,
    staging: Vec<u8>,
    depth_view: wgpu::TextureView,
    depth_size: (u32, u32),
    light: Light,
    background: Color,
}

impl CharacterPass {
    /// Builds the pipeline and its buffers.
    ///
    /// Shader compilation and pipeline linkage run inside a validation error
    /// scope; a failure is returned as [`InitError::Pipeline`].
    pub fn new(gpu: &GpuContext, light: Light, background: Color) -> Result<Self, InitError> {
        let device = &gpu.device;

        device.push_error_scope(wgpu::ErrorFilter::Validation);

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Character Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/character.wgsl").into()),
        });

        // Frame uniform buffer (group 0)
        let frame_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Frame Uniforms"),
            size: std::mem::size_of::<FrameUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let frame_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Frame Bind Group Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let frame_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Frame Bind Group"),
            layout: &frame_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: frame_buffer.as_entire_binding(),
            }],
        });

        // Per-drawable uniform buffer (group 1), addressed by dynamic offset
        let draw_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Draw Bind Group Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: NonZeroU64::new(std::mem::size_of::<DrawUniforms>() as u64),
                },
                count: None,
            }],
        });

        let draw_stride = aligned_stride(
            std::mem::size_of::<DrawUniforms>() as u64,
            u64::from(device.limits().min_uniform_buffer_offset_alignment),
        );
        let (draw_buffer, draw_bind_group) =
            Self::create_draw_buffer(device, &draw_layout, draw_stride, INITIAL_DRAW_CAPACITY);

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Character Pipeline Layout"),
            bind_group_layouts: &[&frame_layout, &draw_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Character Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs"),
                buffers: &[Vertex3d::LAYOUT],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: gpu.config.format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                cull_mode: Some(wgpu::Face::Back),
                front_face: wgpu::FrontFace::Ccw,
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        if let Some(source) = pollster::block_on(device.pop_error_scope()) {
            log::error!("character pipeline failed to build: {source}");
            return Err(InitError::Pipeline {
                label: "character",
                source,
            });
        }

        let depth_view = Self::create_depth_view(gpu);

        Ok(Self {
            pipeline,
            frame_buffer,
            frame_bind_group,
            draw_layout,
            draw_buffer,
            draw_bind_group,
            draw_stride,
            draw_capacity: INITIAL_DRAW_CAPACITY,
            staging: Vec::new(),
            depth_view,
            depth_size: (gpu.width(), gpu.height()),
            light,
            background,
        })
    }

    fn create_draw_buffer(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        stride: u64,
        capacity: usize,
    ) -> (wgpu::Buffer, wgpu::BindGroup) {
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Draw Uniforms"),
            size: stride * capacity as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Draw Bind Group"),
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &buffer,
                    offset: 0,
                    size: wgpu::BufferSize::new(std::mem::size_of::<DrawUniforms>() as u64),
                }),
            }],
        });
        (buffer, bind_group)
    }

    fn create_depth_view(gpu: &GpuContext) -> wgpu::TextureView {
        let texture = gpu.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Depth Texture"),
            size: wgpu::Extent3d {
                width: gpu.width(),
                height: gpu.height(),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        texture.create_view(&wgpu::TextureViewDescriptor::default())
    }

    /// Recreates the depth buffer if the surface was resized.
    pub fn ensure_depth_size(&mut self, gpu: &GpuContext) {
        if self.depth_size != (gpu.width(), gpu.height()) {
            self.depth_view = Self::create_depth_view(gpu);
            self.depth_size = (gpu.width(), gpu.height());
        }
    }

    fn ensure_draw_capacity(&mut self, gpu: &GpuContext, count: usize) {
        if count <= self.draw_capacity {
            return;
        }
        let capacity = count.next_power_of_two();
        log::debug!(
            "growing draw uniform buffer: {} -> {} slots",
            self.draw_capacity,
            capacity
        );
        let (buffer, bind_group) =
            Self::create_draw_buffer(&gpu.device, &self.draw_layout, self.draw_stride, capacity);
        self.draw_buffer = buffer;
        self.draw_bind_group = bind_group;
        self.draw_capacity = capacity;
    }

    /// Writes this frame's uniforms. Must run before [`render`](Self::render).
    pub fn prepare(&mut self, gpu: &GpuContext, camera: &Camera, frame: &SceneFrame) {
        let frame_uniforms = FrameUniforms::new(
            camera.view_projection(gpu.aspect()),
            &frame.global_rotation,
            &self.light,
        );
        gpu.queue
            .write_buffer(&self.frame_buffer, 0, bytemuck::bytes_of(&frame_uniforms));

        if frame.drawables.is_empty() {
            return;
        }
        let count = frame.drawables.len();
        self.ensure_draw_capacity(gpu, count);

        let stride = self.draw_stride as usize;
        self.staging.clear();
        self.staging.resize(stride * count, 0);
        for (slot, drawable) in self.staging.chunks_exact_mut(stride).zip(&frame.drawables) {
            let uniforms = DrawUniforms::new(&frame.global_rotation, drawable);
            let bytes = bytemuck::bytes_of(&uniforms);
            slot[..bytes.len()].copy_from_slice(bytes);
        }
        gpu.queue.write_buffer(&self.draw_buffer, 0, &self.staging);
    }

    /// Records one draw per drawable, in order, reusing the shared meshes.
    pub fn render(
        &self,
        render_pass: &mut wgpu::RenderPass,
        meshes: &MeshLibrary,
        frame: &SceneFrame,
    ) {
        render_pass.set_pipeline(&self.pipeline);
        render_pass.set_bind_group(0, &self.frame_bind_group, &[]);

        for (i, drawable) in frame.drawables.iter().enumerate() {
            let offset = (i as u64 * self.draw_stride) as wgpu::DynamicOffset;
            render_pass.set_bind_group(1, &self.draw_bind_group, &[offset]);

            let mesh = meshes.get(drawable.mesh);
            render_pass.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
            render_pass.draw(0..mesh.vertex_count, 0..1);
        }
    }

    /// Acquires the next surface texture, draws `frame` into it and presents.
    pub fn draw_frame(
        &mut self,
        gpu: &GpuContext,
        meshes: &MeshLibrary,
        camera: &Camera,
        frame: &SceneFrame,
    ) -> Result<(), wgpu::SurfaceError> {
        let output = gpu.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        self.ensure_depth_size(gpu);
        self.prepare(gpu, camera, frame);

        let mut encoder = gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Character Encoder"),
            });

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Character Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.background.into()),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            self.render(&mut render_pass, meshes, frame);
        }

        gpu.queue.submit(std::iter::once(encoder.finish()));
        output.present();
        Ok(())
    }
}
