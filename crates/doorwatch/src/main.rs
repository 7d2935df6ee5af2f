use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod app;
mod config;
mod overlay;

#[derive(Parser)]
#[command(name = "doorwatch", about = "Webcam visitor classifier with audio alerts")]
struct Args {
    /// V4L2 camera device path (overrides DOORWATCH_CAMERA_DEVICE)
    #[arg(long)]
    camera: Option<String>,

    /// Directory containing the ONNX model files
    #[arg(long)]
    model_dir: Option<PathBuf>,

    /// Directory of reference face images
    #[arg(long)]
    gallery_dir: Option<PathBuf>,

    /// Directory containing the four track files
    #[arg(long)]
    sound_dir: Option<PathBuf>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let mut config = config::Config::from_env();
    if let Some(camera) = args.camera {
        config.camera_device = camera;
    }
    if let Some(model_dir) = args.model_dir {
        config.model_dir = model_dir;
    }
    if let Some(gallery_dir) = args.gallery_dir {
        config.gallery_dir = gallery_dir;
    }
    if let Some(sound_dir) = args.sound_dir {
        config.sound_dir = sound_dir;
    }

    tracing::info!("doorwatch starting");
    app::run(&config)?;
    tracing::info!("doorwatch stopped");

    Ok(())
}
