use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use odata_gateway_server::{AppConfig, logging, signals};

/// OData batch gateway - read-only OData facade over a PostgREST-style backend
#[derive(Parser)]
#[command(name = "odata-gateway-server")]
#[command(about = "OData batch gateway - read-only OData facade over a PostgREST-style backend")]
#[command(version)]
struct Cli {
    /// Path to configuration file (YAML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port override for HTTP server (overrides config)
    #[arg(short, long)]
    port: Option<u16>,

    /// Print effective configuration (JSON, secrets redacted) and exit
    #[arg(long)]
    print_config: bool,

    /// Log verbosity level (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the server
    Run,
    /// Validate configuration and exit
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Some(path) = &cli.config
        && !path.is_file()
    {
        anyhow::bail!("config file does not exist: {}", path.display());
    }

    let mut config = AppConfig::load(cli.config.as_deref())?;
    config.apply_cli_overrides(cli.port)?;

    logging::init(&config.logging, cli.verbose);

    if cli.print_config {
        println!("{}", config.to_json_pretty()?);
        return Ok(());
    }

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run_server(config).await,
        Commands::Check => check_config(&config),
    }
}

fn check_config(config: &AppConfig) -> Result<()> {
    tracing::info!("checking configuration");
    config.validate()?;
    println!("Configuration is valid");
    Ok(())
}

async fn run_server(config: AppConfig) -> Result<()> {
    config.validate()?;
    let addr = config.bind_addr()?;
    let router = odata_gateway::build_router(&config.gateway)?;

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "OData gateway listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            if let Err(e) = signals::wait_for_shutdown().await {
                tracing::error!(error = %e, "signal handling failed, shutting down");
            }
        })
        .await?;

    tracing::info!("OData gateway stopped");
    Ok(())
}
