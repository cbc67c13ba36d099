pub mod config;
pub mod generator;
pub mod gpu;
pub mod layout;
pub mod stats;

pub use config::{GalaxyParams, Rgb};
pub use generator::{branch_angle, branch_of, generate, generate_with_rng, ParticleBuffer};
pub use gpu::{GalaxyGpuPoints, GalaxyPointPipeline, WgpuPointBackend};
pub use layout::{GpuViewUniform, PointBufferLayout, PointDrawPlan};
pub use stats::GalaxyStats;
