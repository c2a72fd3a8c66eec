//! Render a heatmap for a local image file.

use anyhow::{bail, Context, Result};
use base64::Engine;
use clap::Args;
use colored::Colorize;
use macula_core::config::{AppConfig, HeatmapMode};
use macula_core::heatmap::build_renderer;
use macula_core::intake;
use std::path::PathBuf;

#[derive(Args)]
pub struct HeatmapArgs {
    /// JPEG or PNG file
    pub file: PathBuf,

    /// Write the PNG here instead of printing the data URL
    #[arg(short, long)]
    pub out: Option<PathBuf>,

    /// Renderer to use (overlay, process, none)
    #[arg(long)]
    pub mode: Option<String>,
}

pub async fn execute(args: HeatmapArgs, config: AppConfig) -> Result<()> {
    let mut heatmap_config = config.heatmap.clone();
    if let Some(mode) = args.mode.as_deref() {
        heatmap_config.mode = match HeatmapMode::parse(mode) {
            Some(mode) => mode,
            None => bail!("unknown heatmap mode: {}", mode),
        };
    }

    let limits = config.intake.to_limits()?;
    let image = intake::load_image_file(&args.file, &limits)
        .with_context(|| format!("cannot use {}", args.file.display()))?;
    let renderer = build_renderer(&heatmap_config)?;
    let data_url = renderer.render(&image).await?;

    match args.out {
        Some(path) => {
            let (_, body) = intake::split_data_url(&data_url)?;
            let png = base64::engine::general_purpose::STANDARD
                .decode(body)
                .context("renderer returned invalid Base64")?;
            std::fs::write(&path, &png).with_context(|| format!("cannot write {}", path.display()))?;
            println!(
                "{} {} heatmap written to {} ({} bytes)",
                "✓".green(),
                renderer.name(),
                path.display(),
                png.len()
            );
        }
        None => println!("{}", data_url),
    }
    Ok(())
}
