//! Recursive (Whitted) ray tracing over a scene of spheres
//!
//! A ray is cast per pixel; each hit is shaded with direct Lambertian lighting from the
//! emissive spheres plus recursively traced mirror reflection and dielectric refraction.

use nalgebra::Vector3;

pub mod cameras;
pub mod errors;
pub mod materials;
pub mod objects;
pub mod quadratic;
pub mod render;
pub mod scene;
pub mod tracer;
pub mod utils;

pub type Vec3 = Vector3<f64>;
pub type Point = Vec3;
pub type Color = Vec3;

/// Prelude
pub mod prelude {
    pub use crate::cameras::{Camera, CameraConfig, Projection};
    pub use crate::errors::{ConfigError, RenderError, TraceError};
    pub use crate::materials::{Emitter, Surface};
    pub use crate::objects::Sphere;
    pub use crate::render::{ImageSink, RenderOptions, RenderOutput, Renderer};
    pub use crate::scene::{load_scene, Scene, SceneConfig};
    pub use crate::tracer::{Attenuation, RenderMode, TraceStats, Tracer};
    pub use crate::utils::VecExt;
    pub use crate::{Color, Point, Ray, Vec3};
}

/// The ray in ray tracing
#[derive(Debug, Clone, Copy)]
pub struct Ray {
    pub orig: Point,
    pub dir: Vec3,
}
impl Ray {
    pub fn new(orig: Point, dir: Vec3) -> Self {
        Self { orig, dir }
    }

    pub fn get(&self, t: f64) -> Point {
        self.orig + t * self.dir
    }
}
