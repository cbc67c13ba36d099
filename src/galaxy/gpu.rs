use std::borrow::Cow;
use std::sync::{mpsc, Arc};

use bytemuck::{bytes_of, cast_slice};
use wgpu::util::DeviceExt;

use super::generator::ParticleBuffer;
use super::layout::{GpuViewUniform, PointBufferLayout, PointDrawPlan};
use crate::controller::PointSetBackend;
use crate::error::PointUploadError;

const POINT_ATTRIBUTES: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![0 => Float32x3];
const COLOR_ATTRIBUTES: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![1 => Float32x3];

const ADDITIVE_BLENDING: wgpu::BlendState = wgpu::BlendState {
    color: wgpu::BlendComponent {
        src_factor: wgpu::BlendFactor::SrcAlpha,
        dst_factor: wgpu::BlendFactor::One,
        operation: wgpu::BlendOperation::Add,
    },
    alpha: wgpu::BlendComponent {
        src_factor: wgpu::BlendFactor::One,
        dst_factor: wgpu::BlendFactor::One,
        operation: wgpu::BlendOperation::Add,
    },
};

#[derive(Debug)]
pub struct GalaxyGpuPoints {
    plan: PointDrawPlan,
    position_buffer: wgpu::Buffer,
    color_buffer: wgpu::Buffer,
}

impl GalaxyGpuPoints {
    pub fn upload(
        device: &wgpu::Device,
        buffer: &ParticleBuffer,
    ) -> Result<Self, PointUploadError> {
        let particle_count = buffer.len() as u32;
        let layout = PointBufferLayout::default();
        let requested = layout.largest_buffer_bytes(particle_count);
        let limit = device.limits().max_buffer_size;
        if requested > limit {
            return Err(PointUploadError::BufferTooLarge { requested, limit });
        }

        // Zero-sized vertex buffers cannot be bound; keep one unused slot.
        let placeholder = [[0.0f32; 3]];
        let (positions, colors) = if buffer.is_empty() {
            (&placeholder[..], &placeholder[..])
        } else {
            (&buffer.positions[..], &buffer.colors[..])
        };

        device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        let position_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("galaxy.points.positions"),
            contents: cast_slice(positions),
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_SRC,
        });
        let color_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("galaxy.points.colors"),
            contents: cast_slice(colors),
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_SRC,
        });
        if let Some(err) = pollster::block_on(device.pop_error_scope()) {
            position_buffer.destroy();
            color_buffer.destroy();
            return Err(PointUploadError::Allocation(err.to_string()));
        }

        Ok(Self {
            plan: PointDrawPlan::new(particle_count),
            position_buffer,
            color_buffer,
        })
    }

    pub fn particle_count(&self) -> u32 {
        self.plan.particle_count
    }

    /// Frees the GPU memory now instead of waiting for the last handle to drop.
    pub fn destroy(&self) {
        self.position_buffer.destroy();
        self.color_buffer.destroy();
    }

    pub fn readback_positions(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        sample_count: u32,
    ) -> Result<Vec<[f32; 3]>, PointUploadError> {
        let sample_count = sample_count.min(self.plan.particle_count);
        if sample_count == 0 {
            return Ok(Vec::new());
        }

        let stride = PointBufferLayout::default().position_stride_bytes;
        let bytes_to_copy = sample_count as u64 * stride;
        let staging = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("galaxy.points.debug.staging"),
            size: bytes_to_copy,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("galaxy.points.debug.copy.encoder"),
        });
        encoder.copy_buffer_to_buffer(&self.position_buffer, 0, &staging, 0, bytes_to_copy);
        queue.submit(Some(encoder.finish()));

        let slice = staging.slice(..);
        let (tx, rx) = mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });

        #[allow(deprecated)]
        {
            device.poll(wgpu::Maintain::Wait);
        }

        let map_result = rx.recv().map_err(|_| PointUploadError::ChannelClosed)?;
        map_result.map_err(|_| PointUploadError::MapFailed)?;

        let data = slice.get_mapped_range();
        let positions: &[[f32; 3]] = cast_slice(&data);
        let out = positions.to_vec();
        drop(data);
        staging.unmap();

        Ok(out)
    }
}

pub struct GalaxyPointPipeline {
    view_uniform_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    pipeline: wgpu::RenderPipeline,
}

impl GalaxyPointPipeline {
    pub fn new(device: &wgpu::Device, target_format: wgpu::TextureFormat) -> Self {
        let layout = PointBufferLayout::default();

        let view_uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("galaxy.view.uniform"),
            size: layout.view_uniform_bytes,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("galaxy.points.bgl"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("galaxy.points.bg"),
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: view_uniform_buffer.as_entire_binding(),
            }],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("galaxy.points.pl"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let shader_source = include_str!(concat!(
            env!("CARGO_MANIFEST_DIR"),
            "/shaders/galaxy_points.wgsl"
        ));
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("galaxy.points.shader"),
            source: wgpu::ShaderSource::Wgsl(Cow::Borrowed(shader_source)),
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("galaxy.points.pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: "vs_main",
                compilation_options: wgpu::PipelineCompilationOptions::default(),
                buffers: &[
                    wgpu::VertexBufferLayout {
                        array_stride: layout.position_stride_bytes,
                        step_mode: wgpu::VertexStepMode::Instance,
                        attributes: &POINT_ATTRIBUTES,
                    },
                    wgpu::VertexBufferLayout {
                        array_stride: layout.color_stride_bytes,
                        step_mode: wgpu::VertexStepMode::Instance,
                        attributes: &COLOR_ATTRIBUTES,
                    },
                ],
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: "fs_main",
                compilation_options: wgpu::PipelineCompilationOptions::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: target_format,
                    blend: Some(ADDITIVE_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                cull_mode: None,
                ..Default::default()
            },
            // Points never write depth; the egui pass has no depth attachment.
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        Self {
            view_uniform_buffer,
            bind_group,
            pipeline,
        }
    }

    pub fn write_view(&self, queue: &wgpu::Queue, uniform: &GpuViewUniform) {
        queue.write_buffer(&self.view_uniform_buffer, 0, bytes_of(uniform));
    }

    pub fn draw(&self, pass: &mut wgpu::RenderPass<'_>, points: &GalaxyGpuPoints) {
        if points.plan.is_empty() {
            return;
        }
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &self.bind_group, &[]);
        pass.set_vertex_buffer(0, points.position_buffer.slice(..));
        pass.set_vertex_buffer(1, points.color_buffer.slice(..));
        pass.draw(points.plan.vertex_range(), points.plan.instance_range());
    }
}

#[derive(Clone)]
pub struct WgpuPointBackend {
    device: Arc<wgpu::Device>,
}

impl WgpuPointBackend {
    pub fn new(device: Arc<wgpu::Device>) -> Self {
        Self { device }
    }
}

impl PointSetBackend for WgpuPointBackend {
    type Points = Arc<GalaxyGpuPoints>;

    fn upload(&mut self, buffer: &ParticleBuffer) -> Result<Self::Points, PointUploadError> {
        GalaxyGpuPoints::upload(&self.device, buffer).map(Arc::new)
    }

    fn release(&mut self, points: Self::Points) {
        points.destroy();
    }
}
