use clap::ValueEnum;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum QualityTier {
    MobileLow,
    #[default]
    DesktopHigh,
    DesktopUltra,
}

#[derive(Debug, Clone, Copy)]
pub struct BudgetProfile {
    /// Particle count the galaxy starts with.
    pub default_particles: u32,
    pub max_pixel_ratio: f32,
}

impl QualityTier {
    pub fn budget(self) -> BudgetProfile {
        match self {
            Self::MobileLow => BudgetProfile {
                default_particles: 30_000,
                max_pixel_ratio: 1.0,
            },
            Self::DesktopHigh => BudgetProfile {
                default_particles: 100_000,
                max_pixel_ratio: 2.0,
            },
            Self::DesktopUltra => BudgetProfile {
                default_particles: 400_000,
                max_pixel_ratio: 2.0,
            },
        }
    }
}
