use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use cinereel::{Generator, ReelConfig};

#[derive(Parser, Debug)]
#[command(name = "cinereel", version, about = "Generate a narrated video from a script and image libraries")]
struct Cli {
    /// Path to the script file.
    #[arg(short, long)]
    script: PathBuf,

    /// Directory containing character images.
    #[arg(short, long)]
    characters: PathBuf,

    /// Directory containing location images.
    #[arg(short, long)]
    locations: PathBuf,

    /// Output video path (e.g. out.mp4).
    #[arg(short, long)]
    output: PathBuf,

    /// Background music file (optional).
    #[arg(short, long)]
    music: Option<PathBuf>,

    /// JSON configuration file (optional).
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => ReelConfig::from_path(path)?,
        None => ReelConfig::default(),
    };

    let generator = Generator::new(config)?;
    let report = generator.generate(
        &cli.script,
        &cli.characters,
        &cli.locations,
        &cli.output,
        cli.music.as_deref(),
    )?;

    for skip in &report.skipped {
        eprintln!("skipped scene {}: {}", skip.scene, skip.reason);
    }
    if let Some(scene) = report.truncated_at {
        eprintln!("duration budget reached; scene {scene} and later were dropped");
    }
    eprintln!(
        "wrote {} ({:.1}s, {} scenes)",
        report.out_path.display(),
        report.total_duration_secs,
        report.included.len()
    );
    Ok(())
}
