//! Error types
//!
//! Only configuration problems abort a render. Trace failures are per pixel: the driver counts
//! them and paints the pixel with a debug colour. Total internal reflection and rays that miss
//! everything are ordinary outcomes and have no error variant.

use crate::Vec3;

/// A single trace could not produce a colour
#[derive(Debug, thiserror::Error)]
pub enum TraceError {
    #[error("degenerate ray: origin={origin:?} direction={direction:?}")]
    DegenerateRay { origin: Vec3, direction: Vec3 },

    #[error("trace produced a non-finite colour: {0:?}")]
    NonFiniteRadiance(Vec3),
}

/// The scene or render settings are unusable
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("sphere {index} has invalid radius {radius}")]
    InvalidRadius { index: usize, radius: f64 },

    #[error("invalid image dimensions {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    #[error("field of view must be in (0, 180) degrees, got {0}")]
    InvalidFov(f64),

    #[error("{field} out of range: {value}")]
    OutOfRange { field: &'static str, value: f64 },

    #[error("{0} must be finite")]
    NonFinite(&'static str),

    #[error("scene file not found: {0}")]
    NotFound(String),

    #[error("failed to read scene file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse scene: {0}")]
    Parse(#[from] serde_yaml::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("a render is already in progress")]
    Busy,

    #[error("failed to write image: {0}")]
    Image(#[from] image::ImageError),

    #[error("pixel buffer does not match {width}x{height}")]
    BufferSize { width: u32, height: u32 },
}
