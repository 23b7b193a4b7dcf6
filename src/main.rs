//! Luckyten server binary.
//!
//! Opens the database, recovers the in-flight round, spawns the round
//! scheduler, and serves the HTTP/WebSocket API.

use clap::Parser;
use luckyten::api::ApiServer;
use luckyten::config::ConfigLoader;
use luckyten::game::RoundEngine;
use luckyten::{EventBus, Store, WalletLedger, WalletService};
use std::sync::Arc;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "luckyten")]
#[command(about = "Recurring digit-prediction game server", long_about = None)]
struct Args {
    /// Path to a TOML configuration file
    #[arg(long)]
    config: Option<String>,

    /// Database directory (overrides configuration)
    #[arg(long)]
    data_dir: Option<String>,

    /// API server port (overrides configuration)
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "luckyten=info,tower_http=info".into()),
        )
        .init();

    let args = Args::parse();

    let mut loader = ConfigLoader::new();
    if let Some(ref path) = args.config {
        loader = loader.with_path(path);
    }
    let mut config = loader.load()?;
    if let Some(data_dir) = args.data_dir {
        config.storage.data_dir = data_dir;
    }
    if let Some(port) = args.port {
        config.api.port = port;
    }

    info!("opening database at {}", config.storage.data_dir);
    let store = Store::open(&config.storage.data_dir)?;

    let events = EventBus::default();
    let ledger = Arc::new(WalletLedger::new(store.clone()));
    let wallet = Arc::new(WalletService::new(
        store.clone(),
        ledger.clone(),
        config.wallet.clone(),
    ));
    let engine = Arc::new(RoundEngine::bootstrap(
        store,
        ledger,
        events,
        config.game.clone(),
    )?);

    tokio::spawn(engine.clone().run());
    info!("round scheduler running");

    ApiServer::new(config.api.clone(), engine, wallet).run().await
}
