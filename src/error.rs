use thiserror::Error;

pub type GalaxyResult<T> = Result<T, GalaxyError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("branches must be at least 1")]
    NoBranches,

    #[error("{name} = {value} is outside [{min}, {max}]")]
    OutOfRange {
        name: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("{name} must be a finite number")]
    NonFinite { name: &'static str },

    #[error("{name} must not be negative")]
    Negative { name: &'static str },

    #[error("invalid color {0:?}: expected #rrggbb")]
    InvalidColor(String),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PointUploadError {
    #[error("point buffer of {requested} bytes exceeds the device limit of {limit} bytes")]
    BufferTooLarge { requested: u64, limit: u64 },

    #[error("GPU allocation failed: {0}")]
    Allocation(String),

    #[error("failed to map GPU staging buffer")]
    MapFailed,

    #[error("staging-map channel closed before completion")]
    ChannelClosed,
}

#[derive(Error, Debug)]
pub enum GalaxyError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("resource error: {0}")]
    Upload(#[from] PointUploadError),

    #[error("invalid parameter file: {0}")]
    Params(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("wgpu render state unavailable; start eframe with the wgpu renderer")]
    NoRenderState,
}

impl GalaxyError {
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }
}
