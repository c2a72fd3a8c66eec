//! CLI command definitions and handlers.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use macula_core::classifier::vertex::VertexClassifier;
use macula_core::config::AppConfig;
use macula_core::credentials::token::TokenProvider;
use macula_core::credentials::{self, CredentialSource, Credentials};
use std::path::PathBuf;
use std::sync::Arc;

pub mod classify;
pub mod credentials_cmd;
pub mod heatmap;
pub mod serve;

/// MaculaCutis - dermoscopy image classification service
#[derive(Parser)]
#[command(name = "macula")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Configuration file (defaults to ./macula.toml when present)
    #[arg(short, long, global = true, env = "MACULA_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the analysis server
    Serve(serve::ServeArgs),

    /// Classify a local image file with the configured endpoint
    Classify(classify::ClassifyArgs),

    /// Check the classification credentials
    Credentials(credentials_cmd::CredentialsArgs),

    /// Render the configured heatmap for a local image file
    Heatmap(heatmap::HeatmapArgs),
}

impl Cli {
    pub async fn execute(self) -> Result<()> {
        let config = AppConfig::load(self.config.as_deref()).context("failed to load configuration")?;

        match self.command {
            Commands::Serve(args) => serve::execute(args, config).await,
            Commands::Classify(args) => classify::execute(args, config).await,
            Commands::Credentials(args) => credentials_cmd::execute(args).await,
            Commands::Heatmap(args) => heatmap::execute(args, config).await,
        }
    }
}

/// Load credentials from the environment and build the endpoint client.
pub(crate) fn classifier_from_env(
    config: &AppConfig,
) -> Result<(VertexClassifier, Credentials, CredentialSource)> {
    let (credentials, source) =
        credentials::credentials_from_env().context("classification credentials are not usable")?;
    let tokens = TokenProvider::from_env_or_credentials(&credentials, reqwest::Client::new())?;
    let classifier = VertexClassifier::new(&config.classifier, credentials.project_id(), Arc::new(tokens))
        .context("classifier endpoint is not configured")?;
    Ok((classifier, credentials, source))
}
