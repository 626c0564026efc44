//! Headless bokeh renderer: load a scene, trace it across the worker
//! pool, write a PNG.

use std::path::PathBuf;
use std::sync::atomic::AtomicBool;

use anyhow::{ensure, Context, Result};
use clap::{ArgAction, Parser};

use bokeh_renderer::{render_threaded, Scene};

#[derive(Parser)]
#[command(name = "bokeh", about = "Physically-based ray tracer", disable_help_flag = true)]
struct Cli {
    /// Output image width in pixels.
    #[arg(short = 'w', long, default_value_t = 200)]
    width: u32,

    /// Output image height in pixels.
    #[arg(short = 'h', long, default_value_t = 200)]
    height: u32,

    /// Area-light samples per shading point.
    #[arg(short = 's', long = "shadow-samples", default_value_t = 10)]
    shadow_samples: u32,

    /// Primary rays per pixel (lens samples).
    #[arg(short = 'a', long = "antialias-samples", default_value_t = 1)]
    antialias_samples: u32,

    /// Maximum recursion depth for reflected rays.
    #[arg(short = 'd', long = "ray-depth", default_value_t = 1)]
    ray_depth: u32,

    /// Output PNG path.
    #[arg(short = 'o', long, default_value = "out.png")]
    output: PathBuf,

    /// Worker thread count; defaults to the available parallelism.
    #[arg(short = 'j', long)]
    threads: Option<usize>,

    /// Render seed, for reproducible sampling.
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Print this help text.
    #[arg(long, action = ArgAction::HelpLong)]
    help: Option<bool>,

    /// Scene description file.
    scene: PathBuf,
}

fn main() {
    env_logger::Builder::from_default_env()
        .format_timestamp_millis()
        .init();

    // clap usage errors already exit with code 2; configuration errors
    // from the loaders get the same treatment.
    let cli = Cli::parse();
    if let Err(err) = run(cli) {
        eprintln!("ERROR: {err:#}");
        std::process::exit(2);
    }
}

fn run(cli: Cli) -> Result<()> {
    ensure!(cli.width > 0 && cli.height > 0, "image dimensions must be positive");
    ensure!(
        cli.scene.is_file(),
        "scene file '{}' not found",
        cli.scene.display()
    );

    let mut scene = Scene::from_scn(&cli.scene)?;
    scene.set_shadow_samples(cli.shadow_samples);
    scene.set_lens_samples(cli.antialias_samples);
    scene.set_ray_bounces(cli.ray_depth);
    scene
        .camera_mut()
        .set_aspect(cli.width as f32 / cli.height as f32);

    let workers = cli.threads.unwrap_or_else(|| {
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
    });

    log::info!(
        "rendering {}x{} with {} workers ({} shadow, {} lens, depth {})",
        cli.width,
        cli.height,
        workers,
        cli.shadow_samples,
        cli.antialias_samples,
        cli.ray_depth
    );

    let stop = AtomicBool::new(false);
    let start = std::time::Instant::now();
    let result = render_threaded(&scene, cli.width, cli.height, workers, cli.seed, &stop);
    log::info!("render finished in {:.2?}", start.elapsed());

    let buffer = image::RgbaImage::from_raw(cli.width, cli.height, result.topdown_rgba())
        .context("assembling output image")?;
    buffer
        .save(&cli.output)
        .with_context(|| format!("writing '{}'", cli.output.display()))?;

    log::info!("wrote {}", cli.output.display());

    Ok(())
}
