// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Operator CLI
//!
//! Thin harness over `Pipeline`: every command loads the environment
//! configuration, builds the service and prints JSON.

use anyhow::{anyhow, Result};
use chrono::{Duration, Utc};
use clap::{Args, Parser, Subcommand};
use tracing::info;

use crate::admission::Source;
use crate::config::PipelineConfig;
use crate::pipeline::Pipeline;
use crate::usage::Identity;
use crate::version;

/// threadloom CLI
#[derive(Parser, Debug)]
#[command(name = "threadloom-cli")]
#[command(version = version::VERSION_NUMBER)]
#[command(about = "Turn articles and long text into numbered threads", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate a thread from a URL or from text
    Submit(SubmitArgs),

    /// Show quota usage for an identity
    Usage(IdentityArgs),

    /// Grant premium (unlimited) usage to an identity
    GrantPremium(GrantPremiumArgs),

    /// Print version and compiled features
    Version,
}

/// Caller identity shared by every command that touches the ledger
#[derive(Args, Debug, Clone)]
pub struct IdentityArgs {
    /// Client address the request is attributed to
    #[arg(long, default_value = "127.0.0.1")]
    pub client: String,

    /// Account id; takes precedence over the client address for quota
    #[arg(long)]
    pub account: Option<String>,
}

impl IdentityArgs {
    pub fn identity(&self) -> Identity {
        match &self.account {
            Some(account) => Identity::account(self.client.clone(), account.clone()),
            None => Identity::anonymous(self.client.clone()),
        }
    }
}

/// Arguments for the submit command
#[derive(Args, Debug)]
pub struct SubmitArgs {
    /// Article URL to fetch
    #[arg(long, conflicts_with = "text")]
    pub url: Option<String>,

    /// Text to split directly
    #[arg(long, conflicts_with = "url")]
    pub text: Option<String>,

    #[command(flatten)]
    pub identity: IdentityArgs,
}

impl SubmitArgs {
    pub fn source(&self) -> Result<Source> {
        match (&self.url, &self.text) {
            (Some(url), None) => Ok(Source::Url(url.clone())),
            (None, Some(text)) => Ok(Source::Text(text.clone())),
            _ => Err(anyhow!("Must specify exactly one of --url or --text")),
        }
    }
}

/// Arguments for the grant-premium command
#[derive(Args, Debug)]
pub struct GrantPremiumArgs {
    /// Length of the grant in days; 0 revokes
    #[arg(long, default_value_t = 30)]
    pub days: i64,

    #[command(flatten)]
    pub identity: IdentityArgs,
}

/// Execute CLI command
pub async fn execute(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Submit(args) => submit(args).await,
        Commands::Usage(args) => usage(args).await,
        Commands::GrantPremium(args) => grant_premium(args).await,
        Commands::Version => {
            println!("{}", serde_json::to_string_pretty(&version::get_version_info())?);
            Ok(())
        }
    }
}

async fn build_pipeline() -> Result<Pipeline> {
    let config = PipelineConfig::from_env();
    Pipeline::from_config(config).await
}

async fn submit(args: SubmitArgs) -> Result<()> {
    let source = args.source()?;
    let identity = args.identity.identity();
    let pipeline = build_pipeline().await?;

    match pipeline.submit(source, &identity).await {
        Ok(result) => {
            println!("{}", serde_json::to_string_pretty(&result)?);
            Ok(())
        }
        Err(e) => {
            println!("{}", serde_json::to_string_pretty(&e.to_response())?);
            Err(anyhow!("request failed: {}", e.code()))
        }
    }
}

async fn usage(args: IdentityArgs) -> Result<()> {
    let pipeline = build_pipeline().await?;
    let status = pipeline.usage_status(&args.identity()).await?;
    println!("{}", serde_json::to_string_pretty(&status)?);
    Ok(())
}

async fn grant_premium(args: GrantPremiumArgs) -> Result<()> {
    if args.days < 0 {
        return Err(anyhow!("--days must not be negative"));
    }
    let identity = args.identity.identity();
    let until = Utc::now() + Duration::days(args.days);

    let pipeline = build_pipeline().await?;
    if pipeline.store().is_degraded() {
        return Err(anyhow!(
            "Refusing to grant premium without a reachable primary store (set REDIS_URL)"
        ));
    }
    pipeline.controller().grant_premium(&identity, until).await?;

    info!("Granted premium to {} until {}", identity, until);
    println!("Premium for {} valid until {}", identity, until.to_rfc3339());
    Ok(())
}
