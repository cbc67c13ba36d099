use bytemuck::{Pod, Zeroable};
use glam::Mat4;

/// Each particle is drawn as a camera-facing quad of two triangles.
pub const VERTICES_PER_POINT: u32 = 6;

#[derive(Debug, Clone, Copy)]
pub struct PointBufferLayout {
    pub position_stride_bytes: u64,
    pub color_stride_bytes: u64,
    pub view_uniform_bytes: u64,
}

impl Default for PointBufferLayout {
    fn default() -> Self {
        Self {
            // position.xyz
            position_stride_bytes: 12,
            // color.rgb
            color_stride_bytes: 12,
            // model + view + proj + (size, width, height, pad)
            view_uniform_bytes: 208,
        }
    }
}

impl PointBufferLayout {
    /// Bytes of the larger of the two per-particle vertex buffers.
    pub fn largest_buffer_bytes(&self, particle_count: u32) -> u64 {
        self.position_stride_bytes.max(self.color_stride_bytes) * particle_count as u64
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PointDrawPlan {
    pub particle_count: u32,
    pub vertices_per_instance: u32,
}

impl PointDrawPlan {
    pub fn new(particle_count: u32) -> Self {
        Self {
            particle_count,
            vertices_per_instance: VERTICES_PER_POINT,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.particle_count == 0
    }

    pub fn vertex_range(&self) -> std::ops::Range<u32> {
        0..self.vertices_per_instance
    }

    pub fn instance_range(&self) -> std::ops::Range<u32> {
        0..self.particle_count
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct GpuViewUniform {
    pub model: [[f32; 4]; 4],
    pub view: [[f32; 4]; 4],
    pub proj: [[f32; 4]; 4],
    pub point_size: f32,
    /// Physical pixels of the viewport, after the pixel-ratio cap.
    pub viewport_width: f32,
    pub viewport_height: f32,
    _pad: f32,
}

impl GpuViewUniform {
    pub fn new(
        model: Mat4,
        view: Mat4,
        proj: Mat4,
        point_size: f32,
        viewport_px: [f32; 2],
    ) -> Self {
        Self {
            model: model.to_cols_array_2d(),
            view: view.to_cols_array_2d(),
            proj: proj.to_cols_array_2d(),
            point_size,
            viewport_width: viewport_px[0].max(1.0),
            viewport_height: viewport_px[1].max(1.0),
            _pad: 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{GpuViewUniform, PointBufferLayout, PointDrawPlan};

    #[test]
    fn view_uniform_size_matches_layout() {
        assert_eq!(
            std::mem::size_of::<GpuViewUniform>() as u64,
            PointBufferLayout::default().view_uniform_bytes
        );
        assert_eq!(std::mem::size_of::<GpuViewUniform>() % 16, 0);
    }

    #[test]
    fn draw_plan_is_one_quad_per_particle() {
        let plan = PointDrawPlan::new(1_001);
        assert_eq!(plan.vertex_range(), 0..6);
        assert_eq!(plan.instance_range(), 0..1_001);
        assert!(PointDrawPlan::new(0).is_empty());
    }
}
