//! Recursive ray tracing: nearest hit, direct lighting with hard shadows, mirror reflection and
//! refraction blended by a Fresnel term

use log::debug;
use serde::{Deserialize, Serialize};

use crate::{
    errors::{ConfigError, TraceError},
    objects::{HitRecord, Sphere},
    scene::Scene,
    utils::{mix, VecExt},
    Color, Point, Ray, Vec3,
};

/// Bounce limit; at this depth a hit only receives direct light
pub const MAX_DEPTH: u32 = 5;

/// Offset applied to secondary ray origins along the surface normal
pub const BIAS: f64 = 1e-4;

/// Index of refraction of every transmissive sphere
pub const IOR: f64 = 1.1;

/// What a ray that hits nothing sees
pub fn background() -> Color {
    Color::new(1.0, 1.0, 1.0)
}

/// What the tracer computes for each hit
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RenderMode {
    /// Direct light plus reflection and refraction
    #[default]
    Full,
    /// Direct light only
    Diffuse,
    /// Raw surface colour, no lighting at all
    Flat,
}

/// Light falloff `1 / (constant + linear d + quadratic d^2)`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Attenuation {
    pub constant: f64,
    pub linear: f64,
    pub quadratic: f64,
}
impl Default for Attenuation {
    fn default() -> Self {
        Self {
            constant: 1.0,
            linear: 0.09,
            quadratic: 0.032,
        }
    }
}
impl Attenuation {
    pub fn factor(&self, distance: f64) -> f64 {
        1.0 / (self.constant + self.linear * distance + self.quadratic * distance * distance)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.constant.is_finite() && self.constant > 0.0) {
            return Err(ConfigError::OutOfRange {
                field: "attenuation.constant",
                value: self.constant,
            });
        }
        for (field, value) in [
            ("attenuation.linear", self.linear),
            ("attenuation.quadratic", self.quadratic),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                return Err(ConfigError::OutOfRange { field, value });
            }
        }
        Ok(())
    }
}

/// Counters gathered while tracing, merged across pixels by the driver
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TraceStats {
    /// Calls to `trace`, primary and secondary
    pub rays: u64,
    /// Largest depth any call was made at
    pub deepest: u32,
    /// Refraction rays dropped because none could be transmitted
    pub total_internal_reflections: u64,
}
impl TraceStats {
    pub fn merge(mut self, other: TraceStats) -> Self {
        self.rays += other.rays;
        self.deepest = self.deepest.max(other.deepest);
        self.total_internal_reflections += other.total_internal_reflections;
        self
    }
}

/// Traces rays against a borrowed scene
#[derive(Debug, Clone, Copy)]
pub struct Tracer<'a> {
    scene: &'a Scene,
    mode: RenderMode,
    max_depth: u32,
}
impl<'a> Tracer<'a> {
    pub fn new(scene: &'a Scene) -> Self {
        Self {
            scene,
            mode: RenderMode::Full,
            max_depth: MAX_DEPTH,
        }
    }

    pub fn with_mode(mut self, mode: RenderMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_max_depth(mut self, max_depth: u32) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Radiance arriving along `ray`, unclamped
    pub fn trace(
        &self,
        ray: &Ray,
        depth: u32,
        stats: &mut TraceStats,
    ) -> Result<Color, TraceError> {
        if ray.orig.is_nan() || ray.dir.is_nan() {
            return Err(TraceError::DegenerateRay {
                origin: ray.orig,
                direction: ray.dir,
            });
        }
        stats.rays += 1;
        stats.deepest = stats.deepest.max(depth);

        let Some((index, geo, hr)) = self.nearest_hit(ray) else {
            return Ok(background());
        };
        if self.mode == RenderMode::Flat {
            return Ok(geo.surface.color);
        }

        let direction = ray.dir.normalized_or_self();
        let mut normal = hr.normal;
        let mut inside = false;
        if direction.dot(&normal) > 0.0 {
            normal = normal.invert();
            inside = true;
        }

        if self.mode == RenderMode::Diffuse || depth >= self.max_depth || !geo.surface.is_specular()
        {
            return Ok(self.direct_light(index, geo, &hr.p, &normal));
        }

        let facing_ratio = direction.invert().dot(&normal);
        let fresnel = mix((1.0 - facing_ratio).powi(3), 1.0, 0.1);

        let mut reflection = Color::zeros();
        if geo.surface.reflectance > 0.0 {
            let reflected = Ray::new(
                hr.p + normal * BIAS,
                direction.reflect(&normal).normalized_or_self(),
            );
            reflection = self.trace(&reflected, depth + 1, stats)?;
        }

        let mut refraction = Color::zeros();
        if geo.surface.transmission > 0.0 {
            let eta = if inside { IOR } else { 1.0 / IOR };
            let cosi = normal.invert().dot(&direction);
            let k = 1.0 - eta * eta * (1.0 - cosi * cosi);
            if k < 0.0 {
                stats.total_internal_reflections += 1;
                debug!(
                    "Total internal reflection at {:?} (eta={eta} cosi={cosi} k={k})",
                    hr.p
                );
            } else {
                let refracted = Ray::new(
                    hr.p - normal * BIAS,
                    (direction * eta + normal * (eta * cosi - k.sqrt())).normalized_or_self(),
                );
                refraction = self.trace(&refracted, depth + 1, stats)?;
            }
        }

        Ok((reflection * fresnel
            + refraction * ((1.0 - fresnel) * geo.surface.transmission))
            .component_mul(&geo.surface.color)
            + geo.emission_color())
    }

    /// Closest sphere in front of the ray; ties go to the earlier sphere
    fn nearest_hit(&self, ray: &Ray) -> Option<(usize, &'a Sphere, HitRecord)> {
        let mut closest: Option<(usize, &'a Sphere, HitRecord)> = None;
        for (index, sphere) in self.scene.spheres().iter().enumerate() {
            if let Some(hr) = sphere.try_hit(ray) {
                if closest.as_ref().map_or(true, |(_, _, best)| hr.t < best.t) {
                    closest = Some((index, sphere, hr));
                }
            }
        }
        closest
    }

    /// Lambertian light from every other emitter that is not blocked, plus the sphere's own glow
    fn direct_light(&self, index: usize, geo: &Sphere, point: &Point, normal: &Vec3) -> Color {
        let shadow_origin = point + normal * BIAS;
        let spheres = self.scene.spheres();

        let lit = spheres
            .iter()
            .enumerate()
            .filter(|(li, light)| *li != index && light.is_light())
            .fold(Color::zeros(), |acc, (li, light)| {
                let Some(emitter) = light.emitter else {
                    return acc;
                };
                let to_light = light.center - point;
                let shadow_ray = Ray::new(shadow_origin, to_light.normalized_or_self());

                let in_shadow = spheres
                    .iter()
                    .enumerate()
                    .any(|(oi, other)| oi != li && other.try_hit(&shadow_ray).is_some());
                if in_shadow {
                    return acc;
                }

                let attenuation = self.scene.attenuation.factor(to_light.norm());
                let cos = normal.dot(&shadow_ray.dir).max(0.0);
                acc + geo.surface.color.component_mul(&emitter.radiance()) * (cos * attenuation)
            });

        lit + geo.emission_color()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::materials::{Emitter, Surface};

    fn forward() -> Ray {
        Ray::new(Point::zeros(), Vec3::new(0.0, 0.0, -1.0))
    }

    fn grey() -> Surface {
        Surface::diffuse(Color::new(0.5, 0.5, 0.5))
    }

    fn light_at(center: Point) -> Sphere {
        Sphere::new(center, 0.5, Surface::diffuse(Color::zeros()))
            .with_emitter(Emitter::new(Color::new(1.0, 1.0, 1.0)))
    }

    #[test]
    fn miss_returns_background() {
        let scene = Scene::new(vec![]);
        let mut stats = TraceStats::default();
        let color = Tracer::new(&scene).trace(&forward(), 0, &mut stats).unwrap();
        assert_eq!(color, background());
        assert_eq!(stats.rays, 1);
    }

    #[test]
    fn flat_mode_returns_surface_color() {
        let scene = Scene::new(vec![Sphere::new(
            Point::new(0.0, 0.0, -5.0),
            1.0,
            Surface::new(Color::new(0.1, 0.2, 0.3), 0.5, 1.0),
        )]);
        let tracer = Tracer::new(&scene).with_mode(RenderMode::Flat);
        let color = tracer.trace(&forward(), 0, &mut TraceStats::default()).unwrap();
        assert_eq!(color, Color::new(0.1, 0.2, 0.3));
    }

    #[test]
    fn ties_go_to_first_sphere() {
        let scene = Scene::new(vec![
            Sphere::new(
                Point::new(0.0, 0.0, -5.0),
                1.0,
                Surface::diffuse(Color::new(1.0, 0.0, 0.0)),
            ),
            Sphere::new(
                Point::new(0.0, 0.0, -5.0),
                1.0,
                Surface::diffuse(Color::new(0.0, 1.0, 0.0)),
            ),
        ]);
        let tracer = Tracer::new(&scene).with_mode(RenderMode::Flat);
        let color = tracer.trace(&forward(), 0, &mut TraceStats::default()).unwrap();
        assert_eq!(color, Color::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn nearer_sphere_wins_regardless_of_order() {
        let scene = Scene::new(vec![
            Sphere::new(
                Point::new(0.0, 0.0, -20.0),
                1.0,
                Surface::diffuse(Color::new(1.0, 0.0, 0.0)),
            ),
            Sphere::new(
                Point::new(0.0, 0.0, -5.0),
                1.0,
                Surface::diffuse(Color::new(0.0, 1.0, 0.0)),
            ),
        ]);
        let tracer = Tracer::new(&scene).with_mode(RenderMode::Flat);
        let color = tracer.trace(&forward(), 0, &mut TraceStats::default()).unwrap();
        assert_eq!(color, Color::new(0.0, 1.0, 0.0));
    }

    #[test]
    fn no_lights_means_black() {
        let scene = Scene::new(vec![Sphere::new(Point::new(0.0, 0.0, -5.0), 1.0, grey())]);
        let color = Tracer::new(&scene)
            .trace(&forward(), 0, &mut TraceStats::default())
            .unwrap();
        assert_eq!(color, Color::zeros());
    }

    #[test]
    fn unblocked_light_is_attenuated_by_distance() {
        // Hit at z=-4 facing +z, light 10 units away behind the camera
        let scene = Scene::new(vec![
            Sphere::new(Point::new(0.0, 0.0, -5.0), 1.0, grey()),
            light_at(Point::new(0.0, 0.0, 6.0)),
        ]);
        let color = Tracer::new(&scene)
            .trace(&forward(), 0, &mut TraceStats::default())
            .unwrap();

        let expected = 0.5 * Attenuation::default().factor(10.0);
        for c in color.iter() {
            assert!((c - expected).abs() < 1e-9, "{color:?} vs {expected}");
        }
    }

    #[test]
    fn blocked_light_contributes_nothing() {
        let scene = Scene::new(vec![
            Sphere::new(Point::new(0.0, 0.0, -5.0), 1.0, grey()),
            light_at(Point::new(0.0, 0.0, 6.0)),
            Sphere::new(Point::new(0.0, 0.0, 3.0), 0.5, grey()),
        ]);
        let color = Tracer::new(&scene)
            .trace(&forward(), 0, &mut TraceStats::default())
            .unwrap();
        assert_eq!(color, Color::zeros());
    }

    #[test]
    fn light_facing_away_contributes_nothing() {
        // Light sits behind the hit sphere, on the far side from the camera
        let scene = Scene::new(vec![
            Sphere::new(Point::new(0.0, 0.0, -5.0), 1.0, grey()),
            light_at(Point::new(0.0, 0.0, -9.0)),
        ]);
        let color = Tracer::new(&scene)
            .trace(&forward(), 0, &mut TraceStats::default())
            .unwrap();
        assert_eq!(color, Color::zeros());
    }

    #[test]
    fn light_glows_with_own_emission() {
        let scene = Scene::new(vec![Sphere::new(
            Point::new(0.0, 0.0, -5.0),
            1.0,
            Surface::diffuse(Color::zeros()),
        )
        .with_emitter(Emitter::new(Color::new(3.0, 3.0, 3.0)).with_brightness(0.1))]);
        let color = Tracer::new(&scene)
            .trace(&forward(), 0, &mut TraceStats::default())
            .unwrap();
        assert_eq!(color, Color::new(3.0, 3.0, 3.0));
    }

    #[test]
    fn degenerate_ray_is_an_error() {
        let scene = Scene::demo();
        let tracer = Tracer::new(&scene);
        let ray = Ray::new(Point::zeros(), Vec3::new(f64::NAN, 0.0, -1.0));
        assert!(matches!(
            tracer.trace(&ray, 0, &mut TraceStats::default()),
            Err(TraceError::DegenerateRay { .. })
        ));

        let ray = Ray::new(Point::new(0.0, f64::INFINITY, 0.0), Vec3::new(0.0, 0.0, -1.0));
        assert!(tracer.trace(&ray, 0, &mut TraceStats::default()).is_err());
    }

    fn facing_mirrors() -> Scene {
        let mirror = Surface::new(Color::new(0.9, 0.9, 0.9), 0.0, 1.0);
        Scene::new(vec![
            Sphere::new(Point::new(0.0, 0.0, -10.0), 5.0, mirror),
            Sphere::new(Point::new(0.0, 0.0, 10.0), 5.0, mirror),
            light_at(Point::new(0.0, 4.0, 0.0)),
        ])
    }

    #[test]
    fn mirrors_stop_at_max_depth() {
        let scene = facing_mirrors();
        let mut stats = TraceStats::default();
        let color = Tracer::new(&scene).trace(&forward(), 0, &mut stats).unwrap();
        assert!(!color.is_nan());
        assert_eq!(stats.deepest, MAX_DEPTH);
        assert_eq!(stats.rays, u64::from(MAX_DEPTH) + 1);
    }

    #[test]
    fn custom_max_depth_is_enforced() {
        let scene = facing_mirrors();
        let mut stats = TraceStats::default();
        Tracer::new(&scene)
            .with_max_depth(2)
            .trace(&forward(), 0, &mut stats)
            .unwrap();
        assert_eq!(stats.deepest, 2);
    }

    #[test]
    fn diffuse_mode_never_recurses() {
        let scene = facing_mirrors();
        let mut stats = TraceStats::default();
        Tracer::new(&scene)
            .with_mode(RenderMode::Diffuse)
            .trace(&forward(), 0, &mut stats)
            .unwrap();
        assert_eq!(stats.deepest, 0);
        assert_eq!(stats.rays, 1);
    }

    #[test]
    fn grazing_exit_is_total_internal_reflection() {
        let glass = Surface::new(Color::new(1.0, 1.0, 1.0), 1.0, 0.0);
        let scene = Scene::new(vec![Sphere::new(Point::zeros(), 1.0, glass)]);
        let ray = Ray::new(Point::new(0.0, 0.95, 0.0), Vec3::new(1.0, 0.0, 0.0));

        let mut stats = TraceStats::default();
        let color = Tracer::new(&scene).trace(&ray, 0, &mut stats).unwrap();
        assert_eq!(stats.total_internal_reflections, 1);
        assert_eq!(stats.rays, 1);
        assert_eq!(color, Color::zeros());
    }

    #[test]
    fn head_on_refraction_passes_through() {
        let glass = Surface::new(Color::new(1.0, 1.0, 1.0), 1.0, 0.0);
        let scene = Scene::new(vec![Sphere::new(Point::new(0.0, 0.0, -5.0), 1.0, glass)]);

        let mut stats = TraceStats::default();
        let color = Tracer::new(&scene).trace(&forward(), 0, &mut stats).unwrap();
        assert_eq!(stats.total_internal_reflections, 0);
        assert!(stats.deepest >= 2);
        assert!(!color.is_nan());
        // Everything behind the glass is background, so some light makes it through
        assert!(color.x > 0.0);
    }

    fn assert_channels(color: Color, expected: f64) {
        for c in color.iter() {
            assert!((c - expected).abs() < 1e-9, "{color:?} vs {expected}");
        }
    }

    #[test]
    fn head_on_glass_transmits_through_both_faces() {
        // Each face keeps 1 - 0.1 of the light, the Fresnel floor goes nowhere
        let glass = Surface::new(Color::new(1.0, 1.0, 1.0), 1.0, 0.0);
        let scene = Scene::new(vec![Sphere::new(Point::new(0.0, 0.0, -5.0), 1.0, glass)]);

        let mut stats = TraceStats::default();
        let color = Tracer::new(&scene).trace(&forward(), 0, &mut stats).unwrap();
        assert_channels(color, 0.9 * 0.9);
        assert_eq!(stats.rays, 3);
        assert_eq!(stats.deepest, 2);
    }

    #[test]
    fn head_on_mirror_reflects_fresnel_floor() {
        let mirror = Surface::new(Color::new(1.0, 1.0, 1.0), 0.0, 1.0);
        let scene = Scene::new(vec![Sphere::new(Point::new(0.0, 0.0, -5.0), 1.0, mirror)]);

        let mut stats = TraceStats::default();
        let color = Tracer::new(&scene).trace(&forward(), 0, &mut stats).unwrap();
        assert_channels(color, 0.1);
        assert_eq!(stats.rays, 2);
    }

    #[test]
    fn oblique_mirror_follows_fresnel_curve() {
        // Hits where the normal is (0, 0.5, sqrt(0.75)); the bounce escapes to the background
        let mirror = Surface::new(Color::new(1.0, 1.0, 1.0), 0.0, 1.0);
        let scene = Scene::new(vec![Sphere::new(Point::new(0.0, 0.0, -5.0), 1.0, mirror)]);
        let ray = Ray::new(Point::new(0.0, 0.5, 0.0), Vec3::new(0.0, 0.0, -1.0));

        let color = Tracer::new(&scene)
            .trace(&ray, 0, &mut TraceStats::default())
            .unwrap();
        let facing_ratio = 0.75_f64.sqrt();
        let expected = (1.0 - facing_ratio).powi(3) * 0.9 + 0.1;
        assert_channels(color, expected);
    }

    #[test]
    fn specular_result_is_tinted_and_adds_emission() {
        let tinted = Surface::new(Color::new(0.5, 0.25, 1.0), 0.0, 1.0);
        let glowing = Sphere::new(Point::new(0.0, 0.0, -5.0), 1.0, tinted)
            .with_emitter(Emitter::new(Color::new(0.2, 0.2, 0.2)));
        let scene = Scene::new(vec![glowing]);

        let color = Tracer::new(&scene)
            .trace(&forward(), 0, &mut TraceStats::default())
            .unwrap();
        let expected = Color::new(0.05 + 0.2, 0.025 + 0.2, 0.1 + 0.2);
        assert!((color - expected).norm() < 1e-9, "{color:?}");
    }

    #[test]
    fn stats_merge() {
        let a = TraceStats {
            rays: 3,
            deepest: 1,
            total_internal_reflections: 2,
        };
        let b = TraceStats {
            rays: 4,
            deepest: 5,
            total_internal_reflections: 0,
        };
        assert_eq!(
            a.merge(b),
            TraceStats {
                rays: 7,
                deepest: 5,
                total_internal_reflections: 2,
            }
        );
    }

    #[test]
    fn attenuation_validation() {
        assert!(Attenuation::default().validate().is_ok());
        let bad = Attenuation {
            constant: 0.0,
            ..Default::default()
        };
        assert!(bad.validate().is_err());
        let bad = Attenuation {
            quadratic: -1.0,
            ..Default::default()
        };
        assert!(bad.validate().is_err());
    }
}
