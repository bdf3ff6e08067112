//! Cameras and configs for cameras
use serde::{Deserialize, Serialize};

use crate::{errors::ConfigError, utils::VecExt, Point, Ray, Vec3};

/// Anything that can hand out a primary ray per pixel
pub trait Projection: Sync {
    fn get_ray(&self, x: u32, y: u32) -> Ray;
}

/// Camera Config
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraConfig {
    #[serde(default = "default_fov")]
    pub vertical_fov_deg: f64,
}
impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            vertical_fov_deg: default_fov(),
        }
    }
}
impl CameraConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let fov = self.vertical_fov_deg;
        if fov.is_finite() && fov > 0.0 && fov < 180.0 {
            Ok(())
        } else {
            Err(ConfigError::InvalidFov(fov))
        }
    }
}

fn default_fov() -> f64 {
    30.0
}

/// Pinhole camera at the origin looking down -z
#[derive(Debug, Clone, Copy)]
pub struct Camera {
    width: u32,
    height: u32,
    inv_width: f64,
    inv_height: f64,
    aspect_ratio: f64,
    angle: f64,
}
impl Camera {
    pub fn new(width: u32, height: u32, vertical_fov_deg: f64) -> Result<Self, ConfigError> {
        if width == 0 || height == 0 {
            return Err(ConfigError::InvalidDimensions { width, height });
        }
        CameraConfig { vertical_fov_deg }.validate()?;

        let width_f = f64::from(width);
        let height_f = f64::from(height);
        Ok(Self {
            width,
            height,
            inv_width: 1.0 / width_f,
            inv_height: 1.0 / height_f,
            aspect_ratio: width_f / height_f,
            angle: (std::f64::consts::PI * 0.5 * vertical_fov_deg / 180.0).tan(),
        })
    }

    pub fn from_config(
        width: u32,
        height: u32,
        config: &CameraConfig,
    ) -> Result<Self, ConfigError> {
        Self::new(width, height, config.vertical_fov_deg)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }
}
impl Projection for Camera {
    fn get_ray(&self, x: u32, y: u32) -> Ray {
        let xx =
            (2.0 * ((f64::from(x) + 0.5) * self.inv_width) - 1.0) * self.angle * self.aspect_ratio;
        let yy = (1.0 - 2.0 * ((f64::from(y) + 0.5) * self.inv_height)) * self.angle;
        Ray::new(Point::zeros(), Vec3::new(xx, yy, -1.0).normalized_or_self())
    }
}
