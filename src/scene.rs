//! The scene: an ordered list of spheres plus the settings that travel with it

use std::path::Path;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::{
    cameras::CameraConfig,
    errors::ConfigError,
    materials::{Emitter, Surface},
    objects::{Sphere, SphereConfig},
    tracer::Attenuation,
    Color, Point,
};

/// Spheres to render, read-only for the duration of a render
///
/// Order only decides ties between equally distant hits.
#[derive(Debug, Clone, Default)]
pub struct Scene {
    spheres: Vec<Sphere>,
    pub attenuation: Attenuation,
    pub camera: CameraConfig,
}
impl Scene {
    pub fn new(spheres: Vec<Sphere>) -> Self {
        Self {
            spheres,
            ..Default::default()
        }
    }

    pub fn with_attenuation(mut self, attenuation: Attenuation) -> Self {
        self.attenuation = attenuation;
        self
    }

    pub fn spheres(&self) -> &[Sphere] {
        &self.spheres
    }

    pub fn iter(&self) -> impl Iterator<Item = &Sphere> {
        self.spheres.iter()
    }

    /// Spheres with a non-zero emission colour
    pub fn lights(&self) -> impl Iterator<Item = &Sphere> {
        self.spheres.iter().filter(|s| s.is_light())
    }

    pub fn len(&self) -> usize {
        self.spheres.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spheres.is_empty()
    }

    /// Reject geometry the tracer cannot handle
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (index, sphere) in self.spheres.iter().enumerate() {
            if !(sphere.radius.is_finite() && sphere.radius > 0.0) {
                return Err(ConfigError::InvalidRadius {
                    index,
                    radius: sphere.radius,
                });
            }
            if !sphere.center.iter().all(|c| c.is_finite()) {
                return Err(ConfigError::NonFinite("sphere.center"));
            }
        }
        self.attenuation.validate()?;
        self.camera.validate()
    }

    pub fn from_config(config: SceneConfig) -> Result<Self, ConfigError> {
        let spheres = config
            .spheres
            .into_iter()
            .enumerate()
            .map(|(index, cfg)| Sphere::from_config(index, cfg))
            .collect::<Result<Vec<_>, _>>()?;
        let scene = Self {
            spheres,
            attenuation: config.attenuation,
            camera: config.camera,
        };
        scene.validate()?;
        Ok(scene)
    }

    /// A grey platform, four spheres and one overhead light
    pub fn demo() -> Self {
        Self::new(vec![
            Sphere::new(
                Point::new(0.0, -10004.0, -20.0),
                10000.0,
                Surface::diffuse(Color::new(0.2, 0.2, 0.2)),
            ),
            Sphere::new(
                Point::new(0.0, 0.0, -20.0),
                4.0,
                Surface::new(Color::new(1.0, 0.32, 0.36), 0.5, 1.0),
            ),
            Sphere::new(
                Point::new(5.0, -1.0, -15.0),
                2.0,
                Surface::new(Color::new(0.90, 0.76, 0.46), 0.0, 1.0),
            ),
            Sphere::new(
                Point::new(5.0, 0.0, -25.0),
                3.0,
                Surface::new(Color::new(0.65, 0.77, 0.97), 0.0, 1.0),
            ),
            Sphere::new(
                Point::new(-5.5, 0.0, -15.0),
                3.0,
                Surface::new(Color::new(0.90, 0.90, 0.90), 0.0, 1.0),
            ),
            Sphere::new(Point::new(0.0, 20.0, -10.0), 3.0, Surface::diffuse(Color::zeros()))
                .with_emitter(Emitter::new(Color::new(3.0, 3.0, 3.0))),
        ])
    }
}

/// Scene file contents
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneConfig {
    #[serde(default)]
    pub camera: CameraConfig,
    #[serde(default)]
    pub attenuation: Attenuation,
    pub spheres: Vec<SphereConfig>,
}

/// Load and validate a scene from a YAML file
pub fn load_scene<P: AsRef<Path>>(path: P) -> Result<Scene, ConfigError> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(ConfigError::NotFound(path.display().to_string()));
    }

    let content = std::fs::read_to_string(path)?;
    let config: SceneConfig = serde_yaml::from_str(&content)?;
    let scene = Scene::from_config(config)?;
    debug!(
        "Loaded {} spheres ({} lights) from {}",
        scene.len(),
        scene.lights().count(),
        path.display()
    );

    Ok(scene)
}
