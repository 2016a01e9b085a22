//! slabtrace CLI - render the two-cube demo scene to an image file.

use anyhow::{Context, Result};
use clap::Parser;
use image::{DynamicImage, RgbImage, imageops};
use std::path::PathBuf;

use slabtrace::{GpuRayScene, ImageData, OUTPUT_TEXTURE, RayScene, RenderConfig, Scene, WgpuCompute};

#[derive(Parser)]
#[command(name = "slabtrace")]
#[command(about = "Ray-trace the demo scene on the CPU or GPU", long_about = None)]
struct Cli {
    /// Output image (format determined by extension)
    #[arg(default_value = "render.png")]
    output: PathBuf,

    /// Image width in pixels
    #[arg(long, default_value_t = 800)]
    width: u32,

    /// Image height in pixels
    #[arg(long, default_value_t = 600)]
    height: u32,

    /// Use the wgpu compute backend instead of the CPU tracer
    #[arg(long)]
    gpu: bool,

    /// Animation steps to run before the captured frame
    #[arg(long, default_value_t = 0)]
    frames: u32,

    /// Report the objects under a screen point, given as `u,v` in [0, 1]
    #[arg(long, value_parser = parse_uv)]
    pick: Option<(f32, f32)>,
}

fn parse_uv(s: &str) -> std::result::Result<(f32, f32), String> {
    let (u, v) = s.split_once(',').ok_or("expected `u,v`")?;
    let u = u.trim().parse::<f32>().map_err(|e| e.to_string())?;
    let v = v.trim().parse::<f32>().map_err(|e| e.to_string())?;
    Ok((u, v))
}

fn main() -> Result<()> {
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let cli = Cli::parse();
    let config = RenderConfig::new().size(cli.width, cli.height);
    let mut scene = Scene::demo(config.aspect());
    for _ in 0..cli.frames {
        scene.advance();
    }

    if let Some((u, v)) = cli.pick {
        let picked = scene.pick(u, v)?;
        println!("Objects at ({u}, {v}): {picked:?}");
    }

    let image = if cli.gpu {
        render_gpu(scene, config)?
    } else {
        render_cpu(scene, config)?
    };

    // Row 0 is the bottom of the view; image files store the top row first.
    imageops::flip_vertical(&image)
        .save(&cli.output)
        .with_context(|| format!("failed to write {}", cli.output.display()))?;
    log::info!("Wrote {}", cli.output.display());
    Ok(())
}

fn render_cpu(scene: Scene, config: RenderConfig) -> Result<RgbImage> {
    let mut ray_scene = RayScene::new(scene, config)?;
    let stats = ray_scene.start()?;
    log::info!(
        "CPU frame: {} hits, {} misses, {} failed",
        stats.hits,
        stats.misses,
        stats.failed
    );
    Ok(ray_scene.tracer().framebuffer().image().clone())
}

fn render_gpu(scene: Scene, config: RenderConfig) -> Result<RgbImage> {
    let backend = WgpuCompute::new().context("failed to initialise the GPU backend")?;
    let mut gpu_scene = GpuRayScene::new(scene, backend, config)?;
    let groups = gpu_scene.run()?;
    log::info!("GPU frame: dispatched {groups:?} workgroups");

    match &gpu_scene.textures().get(OUTPUT_TEXTURE)?.data {
        ImageData::Rgba32F(frame) => Ok(DynamicImage::ImageRgba32F(frame.clone()).to_rgb8()),
        ImageData::Rgb8(frame) => Ok(frame.clone()),
    }
}
