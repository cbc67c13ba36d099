use super::config::GalaxyParams;
use super::generator::{branch_of, ParticleBuffer};

#[derive(Debug, Clone, PartialEq)]
pub struct GalaxyStats {
    pub particle_count: usize,
    pub per_branch: Vec<u32>,
    pub max_horizontal_extent: f32,
    pub mean_horizontal_extent: f32,
    pub vertical_range: (f32, f32),
}

impl GalaxyStats {
    pub fn from_buffer(buffer: &ParticleBuffer, params: &GalaxyParams) -> Self {
        let branches = params.branches.max(1);
        let mut per_branch = vec![0u32; branches as usize];
        for i in 0..buffer.len() as u32 {
            per_branch[branch_of(i, branches) as usize] += 1;
        }

        let mut max_extent = 0.0f32;
        let mut extent_sum = 0.0f64;
        let mut vertical_range = (0.0f32, 0.0f32);
        for p in &buffer.positions {
            let extent = p[0].hypot(p[2]);
            max_extent = max_extent.max(extent);
            extent_sum += extent as f64;
            vertical_range.0 = vertical_range.0.min(p[1]);
            vertical_range.1 = vertical_range.1.max(p[1]);
        }

        let mean_horizontal_extent = if buffer.is_empty() {
            0.0
        } else {
            (extent_sum / buffer.len() as f64) as f32
        };

        Self {
            particle_count: buffer.len(),
            per_branch,
            max_horizontal_extent: max_extent,
            mean_horizontal_extent,
            vertical_range,
        }
    }
}
