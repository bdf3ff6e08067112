//! Objects
use serde::{Deserialize, Serialize};

use crate::{
    errors::ConfigError,
    materials::{Emitter, EmitterConfig, Surface, SurfaceConfig},
    quadratic::solve_quadratic,
    utils::{SerdeVector, VecExt},
    Point, Ray, Vec3,
};

/// Where a ray's line crosses a sphere, nearer root first
///
/// Either root may be negative, i.e. behind the ray origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Intersection {
    pub t0: f64,
    pub t1: f64,
}
impl Intersection {
    /// The nearer root, or the farther one when the nearer lies behind the origin
    pub fn nearest_forward(&self) -> Option<f64> {
        if self.t0 >= 0.0 {
            Some(self.t0)
        } else if self.t1 >= 0.0 {
            Some(self.t1)
        } else {
            None
        }
    }
}

/// Represents a hit
#[derive(Debug, Clone, Copy)]
pub struct HitRecord {
    /// Point of intersection
    pub p: Point,
    /// Outward unit normal at `p`
    pub normal: Vec3,
    /// Ray parameter of the hit
    pub t: f64,
}

/// A sphere of scene geometry, optionally also a light source
#[derive(Debug, Clone, PartialEq)]
pub struct Sphere {
    pub center: Point,
    pub radius: f64,
    pub surface: Surface,
    pub emitter: Option<Emitter>,
}
impl Sphere {
    pub fn new(center: Point, radius: f64, surface: Surface) -> Self {
        Self {
            center,
            radius,
            surface,
            emitter: None,
        }
    }

    /// Make this sphere emit light; a zero colour leaves it a plain occluder
    pub fn with_emitter(mut self, emitter: Emitter) -> Self {
        self.emitter = if emitter.color.is_zero() {
            None
        } else {
            Some(emitter)
        };
        self
    }

    pub fn is_light(&self) -> bool {
        self.emitter.is_some()
    }

    /// Own glow added on top of any shading
    pub fn emission_color(&self) -> Vec3 {
        self.emitter.map(|e| e.color).unwrap_or_else(Vec3::zeros)
    }

    pub fn from_config(index: usize, config: SphereConfig) -> Result<Self, ConfigError> {
        if !config.center.is_finite() {
            return Err(ConfigError::NonFinite("sphere.center"));
        }
        if !(config.radius.is_finite() && config.radius > 0.0) {
            return Err(ConfigError::InvalidRadius {
                index,
                radius: config.radius,
            });
        }
        let mut sphere = Self::new(
            config.center.into(),
            config.radius,
            Surface::from_config(config.surface)?,
        );
        if let Some(emission) = config.emission {
            sphere.emitter = Emitter::from_config(emission)?;
        }
        Ok(sphere)
    }

    /// Both roots of the ray/sphere quadratic, nearer first
    pub fn intersection(&self, ray: &Ray) -> Option<Intersection> {
        let diff = ray.orig - self.center;
        let a = ray.dir.dot(&ray.dir);
        let b = 2.0 * ray.dir.dot(&diff);
        let c = diff.dot(&diff) - self.radius * self.radius;

        // The solver hands back the larger root first
        solve_quadratic(a, b, c).map(|roots| Intersection {
            t0: roots.t1,
            t1: roots.t0,
        })
    }

    /// The first point in front of the ray origin where it meets the sphere
    pub fn try_hit(&self, ray: &Ray) -> Option<HitRecord> {
        let t = self.intersection(ray)?.nearest_forward()?;
        let p = ray.get(t);
        let normal = (p - self.center).normalized_or_self();
        Some(HitRecord { p, normal, t })
    }
}

/// Sphere config
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SphereConfig {
    pub center: SerdeVector,
    pub radius: f64,
    pub surface: SurfaceConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emission: Option<EmitterConfig>,
}
