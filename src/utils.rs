//! Utils

use image::Rgba;
use serde::{Deserialize, Serialize};

use crate::Vec3;

/// Vector operations used by the tracer on top of nalgebra
///
/// `add`, `sub` and `dot` are nalgebra's own; component-wise `mul` is `component_mul` and the
/// scalar form is plain `*`. Nothing here panics: callers check `is_nan`/`is_zero` instead.
pub trait VecExt {
    /// Sum of the squared components
    fn length2(&self) -> f64;

    /// Unit vector in the same direction, or the vector unchanged when its length is zero
    fn normalized_or_self(&self) -> Vec3;

    /// Mirror `self` about `normal`: `v - 2 (v . n) n`
    fn reflect(&self, normal: &Vec3) -> Vec3;

    fn invert(&self) -> Vec3;

    /// All components exactly zero
    fn is_zero(&self) -> bool;

    /// Any component NaN or infinite
    fn is_nan(&self) -> bool;

    /// Clamp each channel to [0, 1], scale to a byte and append `opacity` as alpha
    fn to_color(&self, opacity: f64) -> Rgba<u8>;
}

impl VecExt for Vec3 {
    fn length2(&self) -> f64 {
        self.x * self.x + self.y * self.y + self.z * self.z
    }

    fn normalized_or_self(&self) -> Vec3 {
        let len2 = self.length2();
        if len2 > 0.0 {
            self * (1.0 / len2.sqrt())
        } else {
            *self
        }
    }

    fn reflect(&self, normal: &Vec3) -> Vec3 {
        self - normal * (2.0 * self.dot(normal))
    }

    fn invert(&self) -> Vec3 {
        self * -1.0
    }

    fn is_zero(&self) -> bool {
        self.x == 0.0 && self.y == 0.0 && self.z == 0.0
    }

    fn is_nan(&self) -> bool {
        !(self.x.is_finite() && self.y.is_finite() && self.z.is_finite())
    }

    fn to_color(&self, opacity: f64) -> Rgba<u8> {
        Rgba([
            scale_channel(self.x),
            scale_channel(self.y),
            scale_channel(self.z),
            scale_channel(opacity),
        ])
    }
}

/// scale a channel to between 0 and 255
fn scale_channel(val: f64) -> u8 {
    (255.0 * val.clamp(0.0, 1.0)).round() as u8
}

/// Linear blend: `b * ratio + a * (1 - ratio)`
pub fn mix(a: f64, b: f64, ratio: f64) -> f64 {
    b * ratio + a * (1.0 - ratio)
}

/// A vector as it appears in scene files: `[x, y, z]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SerdeVector(pub [f64; 3]);
impl SerdeVector {
    pub fn is_finite(&self) -> bool {
        self.0.iter().all(|c| c.is_finite())
    }
}
impl From<SerdeVector> for Vec3 {
    fn from(v: SerdeVector) -> Self {
        Vec3::new(v.0[0], v.0[1], v.0[2])
    }
}
impl From<Vec3> for SerdeVector {
    fn from(v: Vec3) -> Self {
        Self([v.x, v.y, v.z])
    }
}
