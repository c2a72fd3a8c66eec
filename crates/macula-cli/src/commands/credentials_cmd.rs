//! Credential checks.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use macula_core::credentials::{self, token::TokenProvider};

use crate::output;

#[derive(Args)]
pub struct CredentialsArgs {
    /// Also fetch an access token (a set MACULA_ACCESS_TOKEN is used as-is)
    #[arg(long)]
    pub token: bool,
}

pub async fn execute(args: CredentialsArgs) -> Result<()> {
    let (credentials, source) = credentials::credentials_from_env()?;
    output::print_credentials(&credentials, &source);

    if args.token {
        println!();
        let provider = TokenProvider::from_env_or_credentials(&credentials, reqwest::Client::new())?;
        let token = provider
            .access_token()
            .await
            .context("token exchange failed")?;
        println!(
            "{} {} ({} chars, {})",
            "✓".green(),
            "Access token acquired".bold(),
            token.len(),
            provider.kind()
        );
    }
    Ok(())
}
