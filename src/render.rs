//! Render driver: one primary ray per pixel into an RGBA buffer

use std::{
    path::Path,
    sync::{
        atomic::{AtomicBool, Ordering},
        Mutex,
    },
    time::{Duration, Instant},
};

use image::{Rgba, RgbaImage};
use indicatif::ProgressBar;
use log::{debug, info, warn};
use rayon::prelude::*;

use crate::{
    cameras::{Camera, Projection},
    errors::{ConfigError, RenderError, TraceError},
    scene::Scene,
    tracer::{RenderMode, TraceStats, Tracer, MAX_DEPTH},
    utils::VecExt,
};

pub const BYTES_PER_PIXEL: usize = 4;

/// Written in place of a pixel whose trace failed
pub const FAILED_PIXEL: [u8; 4] = [255, 0, 255, 255];

/// Number of recent renders the frame timer averages over
pub const FRAME_SAMPLES: usize = 16;

/// Where finished pixels go
///
/// `index` is the pixel index `y * width + x`, not a byte offset.
pub trait ImageSink {
    fn write_pixel(&mut self, index: usize, rgba: [u8; 4]);

    /// Bulk write of a row-major RGBA buffer
    fn put_image_data(&mut self, data: &[u8]) {
        for (index, px) in data.chunks_exact(BYTES_PER_PIXEL).enumerate() {
            self.write_pixel(index, [px[0], px[1], px[2], px[3]]);
        }
    }
}

impl ImageSink for Vec<u8> {
    fn write_pixel(&mut self, index: usize, rgba: [u8; 4]) {
        let at = index * BYTES_PER_PIXEL;
        if self.len() < at + BYTES_PER_PIXEL {
            self.resize(at + BYTES_PER_PIXEL, 0);
        }
        self[at..at + BYTES_PER_PIXEL].copy_from_slice(&rgba);
    }

    fn put_image_data(&mut self, data: &[u8]) {
        self.clear();
        self.extend_from_slice(data);
    }
}

impl ImageSink for RgbaImage {
    fn write_pixel(&mut self, index: usize, rgba: [u8; 4]) {
        let width = self.width() as usize;
        if width == 0 {
            return;
        }
        let (x, y) = ((index % width) as u32, (index / width) as u32);
        if y < self.height() {
            self.put_pixel(x, y, Rgba(rgba));
        }
    }
}

/// Settings for a single render
#[derive(Debug, Clone)]
pub struct RenderOptions {
    pub width: u32,
    pub height: u32,
    pub mode: RenderMode,
    /// Overrides the scene's camera field of view
    pub fov: Option<f64>,
    pub max_depth: u32,
    /// Trace scanlines on the rayon pool
    pub parallel: bool,
    /// Show a progress bar on stderr
    pub progress: bool,
}
impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
            mode: RenderMode::Full,
            fov: None,
            max_depth: MAX_DEPTH,
            parallel: true,
            progress: false,
        }
    }
}

/// A finished render
#[derive(Debug, Clone)]
pub struct RenderOutput {
    pub width: u32,
    pub height: u32,
    /// Row-major RGBA, `width * height * 4` bytes
    pub buffer: Vec<u8>,
    /// Pixels painted with `FAILED_PIXEL`
    pub failed_pixels: usize,
    pub stats: TraceStats,
    pub elapsed: Duration,
}
impl RenderOutput {
    /// RGBA at `(x, y)`, `None` outside the image
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let at = (y as usize * self.width as usize + x as usize) * BYTES_PER_PIXEL;
        let px = self.buffer.get(at..at + BYTES_PER_PIXEL)?;
        Some([px[0], px[1], px[2], px[3]])
    }

    pub fn write_to(&self, sink: &mut impl ImageSink) {
        sink.put_image_data(&self.buffer);
    }

    pub fn into_image(self) -> Result<RgbaImage, RenderError> {
        let (width, height) = (self.width, self.height);
        RgbaImage::from_raw(width, height, self.buffer)
            .ok_or(RenderError::BufferSize { width, height })
    }

    pub fn save<P: AsRef<Path>>(self, path: P) -> Result<(), RenderError> {
        self.into_image()?.save(path)?;
        Ok(())
    }
}

/// Durations of the most recent renders in a fixed ring
#[derive(Debug, Clone, Default)]
pub struct FrameTimer {
    samples: [Duration; FRAME_SAMPLES],
    next: usize,
    len: usize,
}
impl FrameTimer {
    pub fn record(&mut self, elapsed: Duration) {
        self.samples[self.next] = elapsed;
        self.next = (self.next + 1) % FRAME_SAMPLES;
        self.len = (self.len + 1).min(FRAME_SAMPLES);
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn last(&self) -> Option<Duration> {
        if self.len == 0 {
            return None;
        }
        Some(self.samples[(self.next + FRAME_SAMPLES - 1) % FRAME_SAMPLES])
    }

    pub fn average(&self) -> Option<Duration> {
        if self.len == 0 {
            return None;
        }
        let total: Duration = self.samples[..self.len].iter().sum();
        Some(total / self.len as u32)
    }

    /// Renders per second over the recorded window
    pub fn fps(&self) -> Option<f64> {
        let avg = self.average()?.as_secs_f64();
        (avg > 0.0).then(|| 1.0 / avg)
    }
}

/// Runs renders; at most one at a time per instance
#[derive(Debug, Default)]
pub struct Renderer {
    in_progress: AtomicBool,
    timer: Mutex<FrameTimer>,
}
impl Renderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the recent render timings
    pub fn frame_timer(&self) -> FrameTimer {
        self.timer.lock().map(|t| t.clone()).unwrap_or_default()
    }

    pub fn is_rendering(&self) -> bool {
        self.in_progress.load(Ordering::Acquire)
    }

    /// Render through the pinhole camera described by the scene and options
    pub fn render(
        &self,
        scene: &Scene,
        options: &RenderOptions,
    ) -> Result<RenderOutput, RenderError> {
        let mut camera_config = scene.camera;
        if let Some(fov) = options.fov {
            camera_config.vertical_fov_deg = fov;
        }
        let camera = Camera::from_config(options.width, options.height, &camera_config)?;
        self.render_with(scene, &camera, options)
    }

    /// Render with primary rays supplied by `projection`
    pub fn render_with<P: Projection>(
        &self,
        scene: &Scene,
        projection: &P,
        options: &RenderOptions,
    ) -> Result<RenderOutput, RenderError> {
        let _guard = RenderGuard::acquire(&self.in_progress)?;

        let (width, height) = (options.width, options.height);
        if width == 0 || height == 0 {
            return Err(ConfigError::InvalidDimensions { width, height }.into());
        }
        scene.validate()?;

        let tracer = Tracer::new(scene)
            .with_mode(options.mode)
            .with_max_depth(options.max_depth);
        info!(
            "Rendering {width}x{height} ({:?}, {} spheres, {} lights)",
            options.mode,
            scene.len(),
            scene.lights().count()
        );

        let bar = if options.progress {
            ProgressBar::new(u64::from(height))
        } else {
            ProgressBar::hidden()
        };

        let row_len = width as usize * BYTES_PER_PIXEL;
        let mut buffer = vec![0u8; row_len * height as usize];
        let start = Instant::now();

        let trace_row = |(y, pixels): (usize, &mut [u8])| {
            let result = render_row(&tracer, projection, y as u32, pixels);
            bar.inc(1);
            result
        };
        let (failed_pixels, stats) = if options.parallel {
            buffer
                .par_chunks_mut(row_len)
                .enumerate()
                .map(trace_row)
                .reduce(|| (0, TraceStats::default()), merge_rows)
        } else {
            buffer
                .chunks_mut(row_len)
                .enumerate()
                .map(trace_row)
                .fold((0, TraceStats::default()), merge_rows)
        };
        bar.finish_and_clear();

        let elapsed = start.elapsed();
        if let Ok(mut timer) = self.timer.lock() {
            timer.record(elapsed);
        }

        info!(
            "Took {}ms to render! ({} rays, deepest bounce {})",
            elapsed.as_millis(),
            stats.rays,
            stats.deepest
        );
        if stats.total_internal_reflections > 0 {
            warn!(
                "Total internal reflection occurred {} times, refraction ignored there",
                stats.total_internal_reflections
            );
        }
        if failed_pixels > 0 {
            warn!("{failed_pixels} pixels failed to trace and were marked {FAILED_PIXEL:?}");
        }

        Ok(RenderOutput {
            width,
            height,
            buffer,
            failed_pixels,
            stats,
            elapsed,
        })
    }
}

/// Render with a fresh `Renderer`
pub fn render(scene: &Scene, options: &RenderOptions) -> Result<RenderOutput, RenderError> {
    Renderer::new().render(scene, options)
}

fn merge_rows(a: (usize, TraceStats), b: (usize, TraceStats)) -> (usize, TraceStats) {
    (a.0 + b.0, a.1.merge(b.1))
}

/// Trace one scanline into its slice of the buffer
fn render_row<P: Projection>(
    tracer: &Tracer,
    projection: &P,
    y: u32,
    row: &mut [u8],
) -> (usize, TraceStats) {
    let mut stats = TraceStats::default();
    let mut failed = 0;

    for (x, px) in row.chunks_exact_mut(BYTES_PER_PIXEL).enumerate() {
        let x = x as u32;
        let ray = projection.get_ray(x, y);
        let color = tracer.trace(&ray, 0, &mut stats).and_then(|c| {
            if c.is_nan() {
                Err(TraceError::NonFiniteRadiance(c))
            } else {
                Ok(c)
            }
        });
        match color {
            Ok(color) => px.copy_from_slice(&color.to_color(1.0).0),
            Err(e) => {
                debug!(
                    "Error tracing ray x={x} y={y} origin={:?} direction={:?}: {e}",
                    ray.orig, ray.dir
                );
                px.copy_from_slice(&FAILED_PIXEL);
                failed += 1;
            }
        }
    }

    (failed, stats)
}

/// Holds the in-progress flag for the length of a render
struct RenderGuard<'a>(&'a AtomicBool);
impl<'a> RenderGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Result<Self, RenderError> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| RenderError::Busy)?;
        Ok(Self(flag))
    }
}
impl Drop for RenderGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}
