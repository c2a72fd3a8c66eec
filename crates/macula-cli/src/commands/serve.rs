//! Web server command.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use macula_core::analysis::Analyzer;
use macula_core::config::AppConfig;
use macula_core::heatmap::build_renderer;
use macula_web::state::AppState;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use super::classifier_from_env;

#[derive(Args)]
pub struct ServeArgs {
    /// Port to listen on [default: 5000]
    #[arg(long, env = "PORT")]
    pub port: Option<u16>,

    /// Host to bind to [default: 0.0.0.0]
    #[arg(long)]
    pub host: Option<String>,

    /// Require a session token on the analysis endpoints
    #[arg(long)]
    pub require_auth: bool,

    /// Also write logs to this file
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

pub async fn execute(args: ServeArgs, config: AppConfig) -> Result<()> {
    let host = args.host.unwrap_or(config.server.host.clone());
    let port = args.port.unwrap_or(config.server.port);
    let auth_required = args.require_auth || config.auth.required;

    let limits = config.intake.to_limits()?;
    let (classifier, credentials, source) = classifier_from_env(&config)?;
    info!(source = %source, predict_url = classifier.predict_url(), "Classification endpoint ready");

    let heatmap = build_renderer(&config.heatmap).context("heatmap renderer is not usable")?;
    let analyzer = Analyzer::new(macula_db::init_memory_pool(), Arc::new(classifier), heatmap, limits);

    let state = AppState::new(Arc::new(analyzer))
        .with_auth_required(auth_required)
        .with_credentials_configured(true)
        .with_body_limit(config.server.body_limit_bytes);

    println!();
    println!("  {} {}", "MaculaCutis".cyan().bold(), "Analysis Server".bold());
    println!();
    println!("  {}       http://{}:{}/api", "API".green(), host, port);
    println!("  {}  ws://{}:{}/ws", "WebSocket".green(), host, port);
    println!(
        "  {}    {} ({})",
        "Project".green(),
        credentials.project_id().unwrap_or("-"),
        credentials.kind()
    );
    println!("  {}    {}", "Heatmap".green(), config.heatmap.mode.as_str());
    if auth_required {
        println!("  {}       {}", "Auth".green(), "required".yellow());
    }
    println!();
    println!("  {}", "Ctrl+C to stop".dimmed());
    println!();

    macula_web::run_server(state, &host, port).await?;

    Ok(())
}
