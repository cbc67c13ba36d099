pub mod animation;
pub mod app;
pub mod camera;
pub mod controller;
pub mod error;
pub mod galaxy;
pub mod panel;
pub mod quality;

pub use error::{ConfigError, GalaxyError, GalaxyResult, PointUploadError};
