use glam::{Mat4, Vec3};
use rand::rngs::StdRng;
use rand::SeedableRng;

use rust_webgpu_galaxy::camera::PerspectiveCamera;
use rust_webgpu_galaxy::galaxy::{
    generate_with_rng, GalaxyGpuPoints, GalaxyParams, GalaxyPointPipeline, GpuViewUniform,
};

const TARGET_SIZE: u32 = 256;

fn main() {
    if let Err(err) = pollster::block_on(run()) {
        eprintln!("gpu_smoke failed: {err}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let instance = wgpu::Instance::default();
    let adapter = instance
        .request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: None,
            force_fallback_adapter: false,
        })
        .await
        .ok_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "no suitable GPU adapter found",
            )
        })?;

    let (device, queue) = adapter
        .request_device(
            &wgpu::DeviceDescriptor {
                label: Some("galaxy.gpu_smoke.device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::downlevel_defaults(),
                memory_hints: wgpu::MemoryHints::Performance,
            },
            None,
        )
        .await?;

    let params = GalaxyParams {
        count: 8192,
        ..GalaxyParams::default()
    };
    let buffer = generate_with_rng(&params, &mut StdRng::seed_from_u64(7))?;
    let points = GalaxyGpuPoints::upload(&device, &buffer)?;

    let sample = points.readback_positions(&device, &queue, 128)?;
    let mismatched = sample
        .iter()
        .zip(&buffer.positions)
        .filter(|(gpu, cpu)| gpu != cpu)
        .count();
    if mismatched != 0 {
        let message = format!("{mismatched} of {} positions differ after upload", sample.len());
        return Err(message.into());
    }

    let format = wgpu::TextureFormat::Rgba8UnormSrgb;
    let target = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("galaxy.gpu_smoke.target"),
        size: wgpu::Extent3d {
            width: TARGET_SIZE,
            height: TARGET_SIZE,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    let target_view = target.create_view(&wgpu::TextureViewDescriptor::default());

    let pipeline = GalaxyPointPipeline::new(&device, format);
    let camera = PerspectiveCamera::default();
    pipeline.write_view(
        &queue,
        &GpuViewUniform::new(
            Mat4::IDENTITY,
            camera.view(Vec3::ZERO),
            camera.projection(),
            params.size,
            [TARGET_SIZE as f32, TARGET_SIZE as f32],
        ),
    );

    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("galaxy.gpu_smoke.encoder"),
    });
    {
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("galaxy.gpu_smoke.pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &target_view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        pipeline.draw(&mut pass, &points);
    }
    queue.submit(Some(encoder.finish()));

    #[allow(deprecated)]
    {
        device.poll(wgpu::Maintain::Wait);
    }

    println!(
        "gpu_smoke ok: particle_count={} sampled={} positions_match=true",
        points.particle_count(),
        sample.len()
    );
    points.destroy();

    Ok(())
}
