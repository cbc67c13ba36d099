use std::f32::consts::TAU;

use rand::Rng;

use super::config::GalaxyParams;
use crate::error::ConfigError;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParticleBuffer {
    pub positions: Vec<[f32; 3]>,
    pub colors: Vec<[f32; 3]>,
}

impl ParticleBuffer {
    pub fn with_capacity(count: usize) -> Self {
        Self {
            positions: Vec::with_capacity(count),
            colors: Vec::with_capacity(count),
        }
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

/// Arm that particle `index` belongs to; particles are dealt round-robin.
pub fn branch_of(index: u32, branches: u32) -> u32 {
    index % branches
}

pub fn branch_angle(branch: u32, branches: u32) -> f32 {
    branch as f32 / branches as f32 * TAU
}

pub fn generate(params: &GalaxyParams) -> Result<ParticleBuffer, ConfigError> {
    generate_with_rng(params, &mut rand::thread_rng())
}

pub fn generate_with_rng<R>(
    params: &GalaxyParams,
    rng: &mut R,
) -> Result<ParticleBuffer, ConfigError>
where
    R: Rng + ?Sized,
{
    params.check_generatable()?;

    let mut buffer = ParticleBuffer::with_capacity(params.count as usize);
    for i in 0..params.count {
        // Linear radial draw; density is highest at the core.
        let radius = rng.gen::<f32>() * params.radius;
        let spin_angle = radius * params.spin;
        let angle = branch_angle(branch_of(i, params.branches), params.branches) + spin_angle;

        let random_x = jitter(rng, params.randomness_power) * params.randomness;
        let random_y = jitter(rng, params.randomness_power) * params.randomness;
        let random_z = jitter(rng, params.randomness_power) * params.randomness;

        buffer.positions.push([
            angle.cos() * radius + random_x,
            random_y,
            angle.sin() * radius + random_z,
        ]);

        let t = if params.radius > 0.0 {
            (radius / params.radius).min(1.0)
        } else {
            0.0
        };
        buffer
            .colors
            .push(params.inside_color.lerp(params.outside_color, t).to_array());
    }

    Ok(buffer)
}

/// Signed offset with magnitude in `[0, 1)`, pulled toward zero by `power`.
fn jitter<R>(rng: &mut R, power: f32) -> f32
where
    R: Rng + ?Sized,
{
    let magnitude = rng.gen::<f32>().powf(power);
    if rng.gen_bool(0.5) {
        magnitude
    } else {
        -magnitude
    }
}
