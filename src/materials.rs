//! Surface and emission properties of a sphere

use serde::{Deserialize, Serialize};

use crate::{
    errors::ConfigError,
    utils::{SerdeVector, VecExt},
    Color,
};

/// How a surface responds to incoming light
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Surface {
    /// Diffuse albedo, each channel in [0, 1]
    pub color: Color,
    /// Fraction of light transmitted through the surface
    pub transmission: f64,
    /// Mirror reflectivity
    pub reflectance: f64,
}
impl Surface {
    pub fn new(color: Color, transmission: f64, reflectance: f64) -> Self {
        Self {
            color,
            transmission,
            reflectance,
        }
    }

    /// A matte surface: no transmission, no reflection
    pub fn diffuse(color: Color) -> Self {
        Self::new(color, 0.0, 0.0)
    }

    /// Whether secondary rays are spawned at this surface
    pub fn is_specular(&self) -> bool {
        self.reflectance > 0.0 || self.transmission > 0.0
    }

    pub fn from_config(config: SurfaceConfig) -> Result<Self, ConfigError> {
        check_unit("surface.color", &config.color)?;
        check_fraction("surface.transmission", config.transmission)?;
        check_fraction("surface.reflectance", config.reflectance)?;
        Ok(Self::new(
            config.color.into(),
            config.transmission,
            config.reflectance,
        ))
    }
}

/// Surface Config
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SurfaceConfig {
    pub color: SerdeVector,
    #[serde(default)]
    pub transmission: f64,
    #[serde(default)]
    pub reflectance: f64,
}

/// The light-source aspect of a sphere
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Emitter {
    pub color: Color,
    /// Scales the light falling on other surfaces, not the emitter's own glow
    pub brightness: f64,
}
impl Emitter {
    pub fn new(color: Color) -> Self {
        Self {
            color,
            brightness: 1.0,
        }
    }

    pub fn with_brightness(mut self, brightness: f64) -> Self {
        self.brightness = brightness;
        self
    }

    /// Colour delivered to lit surfaces before attenuation
    pub fn radiance(&self) -> Color {
        self.color * self.brightness
    }

    /// `None` for a zero emission colour: such a sphere is not a light
    pub fn from_config(config: EmitterConfig) -> Result<Option<Self>, ConfigError> {
        if !config.color.is_finite() {
            return Err(ConfigError::NonFinite("emission.color"));
        }
        if config.color.0.iter().any(|&c| c < 0.0) {
            return Err(ConfigError::OutOfRange {
                field: "emission.color",
                value: config.color.0.iter().copied().fold(f64::INFINITY, f64::min),
            });
        }
        if !config.brightness.is_finite() || config.brightness < 0.0 {
            return Err(ConfigError::OutOfRange {
                field: "emission.brightness",
                value: config.brightness,
            });
        }
        let color: Color = config.color.into();
        if color.is_zero() {
            return Ok(None);
        }
        Ok(Some(Self::new(color).with_brightness(config.brightness)))
    }
}

/// Emitter Config
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmitterConfig {
    pub color: SerdeVector,
    #[serde(default = "default_brightness")]
    pub brightness: f64,
}

fn default_brightness() -> f64 {
    1.0
}

fn check_fraction(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange { field, value })
    }
}

fn check_unit(field: &'static str, v: &SerdeVector) -> Result<(), ConfigError> {
    if !v.is_finite() {
        return Err(ConfigError::NonFinite(field));
    }
    v.0.iter().try_for_each(|&c| check_fraction(field, c))
}
