//! Render a sphere scene to a PNG
use std::{path::PathBuf, process::ExitCode};

use clap::{Parser, ValueEnum};
use log::{error, info, LevelFilter};
use whitted_tracer::{
    errors::RenderError,
    render::{RenderOptions, Renderer},
    scene::{load_scene, Scene},
    tracer::{RenderMode, MAX_DEPTH},
};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Mode {
    /// Direct light, reflection and refraction
    Full,
    /// Direct light only
    Diffuse,
    /// Surface colours only, for checking geometry placement
    Flat,
}
impl From<Mode> for RenderMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Full => RenderMode::Full,
            Mode::Diffuse => RenderMode::Diffuse,
            Mode::Flat => RenderMode::Flat,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}
impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "whitted-tracer", about = "Recursive ray tracer for sphere scenes")]
struct Args {
    /// YAML scene file; the built-in demo scene is used when omitted
    #[arg(short, long)]
    scene: Option<PathBuf>,

    #[arg(long, default_value_t = 640)]
    width: u32,

    #[arg(long, default_value_t = 480)]
    height: u32,

    #[arg(short, long, value_enum, default_value_t = Mode::Full)]
    mode: Mode,

    /// Vertical field of view in degrees, overrides the scene's camera
    #[arg(long)]
    fov: Option<f64>,

    #[arg(long, default_value_t = MAX_DEPTH)]
    max_depth: u32,

    #[arg(short, long, default_value = "render.png")]
    output: PathBuf,

    /// Trace every pixel on the calling thread
    #[arg(long)]
    single_threaded: bool,

    #[arg(long)]
    no_progress: bool,

    #[arg(long, value_enum, default_value_t = LogLevel::Info)]
    log_level: LogLevel,
}

fn run(args: Args) -> Result<(), RenderError> {
    let scene = match &args.scene {
        Some(path) => load_scene(path)?,
        None => Scene::demo(),
    };

    let options = RenderOptions {
        width: args.width,
        height: args.height,
        mode: args.mode.into(),
        fov: args.fov,
        max_depth: args.max_depth,
        parallel: !args.single_threaded,
        progress: !args.no_progress,
    };

    let output = Renderer::new().render(&scene, &options)?;
    if output.failed_pixels > 0 {
        error!(
            "{} of {} pixels failed to trace",
            output.failed_pixels,
            u64::from(output.width) * u64::from(output.height)
        );
    }
    output.save(&args.output)?;
    info!("Wrote {}", args.output.display());
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();
    env_logger::Builder::from_default_env()
        .filter_level(args.log_level.into())
        .init();

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}
