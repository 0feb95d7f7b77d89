// src/main.rs
//! SmartLodge API server entry point
use anyhow::Result;
use clap::{Args as ClapArgs, Parser, Subcommand};
use smartlodge::api::{ApiServer, AppState};
use smartlodge::core::AppConfig;
use smartlodge::seed;
use smartlodge::storage::Database;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser)]
#[command(name = "smartlodge")]
#[command(about = "SmartLodge hotel booking API")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Args {
    /// Configuration file (defaults to $CONFIG_PATH or config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve(ServeArgs),
    /// Load sample hotels into the database
    Seed(SeedArgs),
}

#[derive(ClapArgs, Default)]
struct ServeArgs {
    /// Address to bind, overrides HOST
    #[arg(long)]
    host: Option<String>,
    /// Port to bind, overrides PORT
    #[arg(long)]
    port: Option<u16>,
}

#[derive(ClapArgs)]
struct SeedArgs {
    /// JSON array of hotels; the bundled sample set when omitted
    #[arg(long)]
    file: Option<PathBuf>,
    /// Remove existing hotels first
    #[arg(long)]
    replace: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logging()?;

    let config_path = args
        .config
        .or_else(|| std::env::var("CONFIG_PATH").ok().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("config.toml"));
    let mut config = AppConfig::load(Some(&config_path))?;

    match args.command.unwrap_or(Commands::Serve(ServeArgs::default())) {
        Commands::Serve(serve) => {
            if let Some(host) = serve.host {
                config.server.host = host;
            }
            if let Some(port) = serve.port {
                config.server.port = port;
            }
            info!("Starting SmartLodge API v{}", env!("CARGO_PKG_VERSION"));
            let state = AppState::from_config(config).await?;
            ApiServer::new(state).start().await?;
        }
        Commands::Seed(seed_args) => {
            let db = Database::open(&config.database.url, config.database.max_connections).await?;
            let hotels = match &seed_args.file {
                Some(path) => seed::load_file(path).await?,
                None => seed::parse_hotels(seed::SAMPLE_HOTELS)?,
            };
            let report = seed::seed_hotels(&db, hotels, seed_args.replace).await?;
            info!(
                removed = report.removed,
                inserted = report.inserted,
                skipped = report.skipped,
                "seeding finished"
            );
        }
    }

    Ok(())
}

fn init_logging() -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=info"));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}
