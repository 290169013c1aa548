//! refact CLI - runs the agent service

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use refact_core::ServerConfig;
use refact_server::AppState;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "refact")]
#[command(about = "refact - LLM proxy and coding agent for GitHub-backed projects", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// TOML configuration file (environment variables override it)
    #[arg(short, long, global = true, env = "REFACT_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve {
        /// Port to listen on (overrides PORT)
        #[arg(short, long)]
        port: Option<u16>,

        /// Default model: opus, sonnet or haiku (overrides REFACT_MODEL)
        #[arg(short, long)]
        model: Option<String>,
    },

    /// Print the effective configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    let mut config =
        ServerConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;

    match cli.command {
        Commands::Serve { port, model } => {
            if let Some(port) = port {
                config.port = port;
            }
            if let Some(model) = model {
                config.model = model;
            }

            info!(
                "Starting refact {} (provider {}, model {})",
                env!("CARGO_PKG_VERSION"),
                config.provider,
                config.model
            );
            let state = AppState::from_config(config)?;
            refact_server::serve(state).await?;
        }

        Commands::Config => {
            if config.api_key.is_some() {
                config.api_key = Some("<set>".to_string());
            }
            if let Some(database) = config.database.as_mut() {
                database.anon_key = "<set>".to_string();
            }
            print!("{}", toml::to_string_pretty(&config)?);
        }
    }

    Ok(())
}
