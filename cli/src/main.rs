//! nfttrack — NFT ownership tracker service.
//!
//! Usage:
//! ```bash
//! nfttrack run                       # backfill, poll, and serve the read API
//! nfttrack list --owner 0xd8dA...    # print stored records as JSON
//! nfttrack info
//! ```

mod api;
mod config;
mod logging;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;

use nfttrack_core::store::OwnershipStore;
use nfttrack_core::types::TokenOrder;
use nfttrack_core::{Address, DEFAULT_POLL_INTERVAL};
use nfttrack_evm::{HttpEventSource, HttpSourceConfig, TransferDecoder, TransferTracker};
use nfttrack_storage::SqliteOwnershipStore;

use crate::config::{ServerArgs, StoreArgs, TrackerArgs};
use crate::logging::LogConfig;

#[derive(Parser)]
#[command(
    name = "nfttrack",
    about = "Tracks NFT ownership from ERC-721 Transfer logs",
    long_about = "
NftTrack backfills Transfer logs from a start block, keeps polling for new
ones on a fixed interval, and serves the current owner of every token.

Settings are read from flags, the environment, or a .env file.
",
    version
)]
struct Cli {
    /// Log filter: a level or an EnvFilter directive (RUST_LOG wins)
    #[arg(long, env = "LOG_LEVEL", default_value = "info", global = true)]
    log_level: String,

    /// Emit JSON logs
    #[arg(long, env = "LOG_JSON", global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the tracker and the read API until Ctrl-C
    Run {
        #[command(flatten)]
        tracker: TrackerArgs,
        #[command(flatten)]
        store: StoreArgs,
        #[command(flatten)]
        server: ServerArgs,
    },

    /// Print stored ownership records as JSON
    List {
        #[command(flatten)]
        store: StoreArgs,
        /// Only records owned by this wallet
        #[arg(long)]
        owner: Option<String>,
    },

    /// Show build and default configuration info
    Info,
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    logging::init_tracing(&LogConfig {
        level: cli.log_level.clone(),
        json: cli.log_json,
    });

    match cli.command {
        Commands::Run {
            tracker,
            store,
            server,
        } => cmd_run(tracker, store, server).await,
        Commands::List { store, owner } => cmd_list(store, owner).await,
        Commands::Info => cmd_info(),
    }
}

async fn cmd_run(tracker_args: TrackerArgs, store_args: StoreArgs, server: ServerArgs) -> Result<()> {
    tracing::info!("nfttrack v{} starting", env!("CARGO_PKG_VERSION"));

    let config = tracker_args.tracker_config().context("invalid configuration")?;

    let store: Arc<dyn OwnershipStore> = Arc::new(
        SqliteOwnershipStore::open(&store_args.database_url)
            .await
            .with_context(|| format!("failed to open store at {}", store_args.database_url))?,
    );

    let source = HttpEventSource::connect(&tracker_args.rpc_endpoint, HttpSourceConfig::default())
        .await
        .context("failed to connect to event source")?;

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    tracing::info!("shutdown requested");
                    cancel.cancel();
                }
                Err(e) => tracing::warn!(error = %e, "cannot listen for Ctrl-C"),
            }
        }
    });

    let listener = tokio::net::TcpListener::bind(server.listen_addr)
        .await
        .with_context(|| format!("failed to bind {}", server.listen_addr))?;
    tracing::info!(addr = %server.listen_addr, "read API listening");

    let app = api::router(store.clone());
    let server_task = tokio::spawn({
        let cancel = cancel.clone();
        async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move { cancel.cancelled().await })
                .await
        }
    });

    let mut tracker = TransferTracker::new(config, source, store);
    let outcome = tracker.run(cancel.clone()).await;

    // Tracker is done either way; take the API down with it.
    cancel.cancel();
    server_task
        .await
        .context("read API task panicked")?
        .context("read API failed")?;

    outcome.context("tracker stopped")?;
    tracing::info!(cursor = tracker.cursor().block_number, "nfttrack stopped");
    Ok(())
}

async fn cmd_list(store_args: StoreArgs, owner: Option<String>) -> Result<()> {
    let store = SqliteOwnershipStore::open(&store_args.database_url)
        .await
        .with_context(|| format!("failed to open store at {}", store_args.database_url))?;

    let records = match owner {
        Some(owner) => {
            let owner: Address = owner
                .parse()
                .with_context(|| format!("invalid wallet address '{owner}'"))?;
            store.find_by_owner(&owner, TokenOrder::Descending).await?
        }
        None => store.find_all(TokenOrder::Descending).await?,
    };

    let out: Vec<api::NftResponse> = records.iter().map(api::NftResponse::from).collect();
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}

fn cmd_info() -> Result<()> {
    let decoder = TransferDecoder::new()?;
    println!("NftTrack v{}", env!("CARGO_PKG_VERSION"));
    println!("  Tracked event: {}", decoder.shape().signature());
    println!("  Event topic0:  {:#x}", decoder.topic0());
    println!(
        "  Default poll interval: {}",
        nfttrack_evm::tracker::describe_interval(DEFAULT_POLL_INTERVAL)
    );
    println!("  Token id range: 0..={}", nfttrack_core::ownership::MAX_TOKEN_KEY);
    println!("  Storage backends: memory, SQLite");
    Ok(())
}
