//! Classify a local image file.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use macula_core::classifier::Classifier;
use macula_core::config::AppConfig;
use macula_core::intake;
use std::path::PathBuf;
use std::time::Instant;

use super::classifier_from_env;
use crate::output;

#[derive(Args)]
pub struct ClassifyArgs {
    /// JPEG or PNG file
    pub file: PathBuf,

    /// Print the prediction as JSON
    #[arg(long)]
    pub json: bool,
}

pub async fn execute(args: ClassifyArgs, config: AppConfig) -> Result<()> {
    let limits = config.intake.to_limits()?;
    let image = intake::load_image_file(&args.file, &limits)
        .with_context(|| format!("cannot use {}", args.file.display()))?;
    let (classifier, _, _) = classifier_from_env(&config)?;

    if !args.json {
        println!(
            "{} {} ({}, {} bytes)",
            "Classifying".cyan(),
            args.file.display(),
            image.mime(),
            image.len()
        );
        println!("{} {}", "Endpoint".dimmed(), classifier.predict_url().dimmed());
    }

    let started = Instant::now();
    let prediction = classifier.classify(&image).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&prediction)?);
    } else {
        output::print_prediction(&prediction, started.elapsed());
    }
    Ok(())
}
