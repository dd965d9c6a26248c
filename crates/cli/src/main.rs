use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use orbit_core::{Config, ConfigLoader, SystemClock};
use orbit_engine::SessionLoop;
use orbit_gateway::{CsvEventSink, FyersGateway};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "orbit")]
#[command(about = "Intraday index-options trading engine", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a trading session against the broker gateway
    Run {
        /// Config file path
        #[arg(short, long, default_value = "config/Config.toml")]
        config: String,
    },
    /// Load, validate, and print the effective configuration
    CheckConfig {
        /// Config file path
        #[arg(short, long, default_value = "config/Config.toml")]
        config: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Run { config } => run_session(&config).await,
        Commands::CheckConfig { config } => check_config(&config),
    }
}

async fn run_session(config_path: &str) -> Result<()> {
    let config = ConfigLoader::load(config_path)?;
    config.validate()?;

    let token = std::fs::read_to_string(&config.gateway.token_path)
        .with_context(|| format!("failed to read access token from {}", config.gateway.token_path))?;
    let market = Arc::new(FyersGateway::new(&config.gateway, &token)?);

    let clock = Arc::new(SystemClock);
    let session_date = config.session.local_date(chrono::Utc::now());
    let sink = Arc::new(CsvEventSink::open(
        &config.observability.log_dir,
        session_date,
    )?);
    tracing::info!(
        log = %sink.path().display(),
        index = config.instrument.index_symbol,
        "starting session"
    );

    let mut session = SessionLoop::new(config, market, sink, clock);
    session.run().await
}

fn check_config(config_path: &str) -> Result<()> {
    let config: Config = ConfigLoader::load(config_path)?;
    config.validate()?;
    println!("{}", toml::to_string_pretty(&config)?);
    Ok(())
}
