//! # Wagerlog Server
//!
//! Run with: `cargo run --bin wagerlog-server -- --data-dir ./data --listen 0.0.0.0:9000`

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, ValueEnum};
use tracing::info;

use wagerlog_api::{create_router, init_tracing, AppState};
use wagerlog_core::config::{Config, LogFormat};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogFormatArg {
    Text,
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "wagerlog-server", version, about = "Wagering record storage server")]
struct Args {
    /// Root of the partition tree
    #[arg(long, default_value = "./data")]
    data_dir: PathBuf,

    #[arg(long, default_value = "0.0.0.0:9000")]
    listen: SocketAddr,

    /// Shard label for segments written by this process
    #[arg(long, default_value_t = 0)]
    shard: u32,

    /// Buffered bytes that trigger a block flush
    #[arg(long)]
    block_threshold: Option<usize>,

    /// Acknowledge writes before their block is flushed
    #[arg(long)]
    buffer_writes: bool,

    #[arg(long, value_enum, default_value = "text")]
    log_format: LogFormatArg,
}

impl Args {
    fn into_config(self) -> Config {
        let mut config = Config::default();
        config.storage.data_dir = self.data_dir;
        config.storage.shard = self.shard;
        if let Some(threshold) = self.block_threshold {
            config.storage.block_threshold = threshold;
        }
        config.storage.flush_each_write = !self.buffer_writes;
        config.api.bind_addr = self.listen;
        config.logging.format = match self.log_format {
            LogFormatArg::Text => LogFormat::Text,
            LogFormatArg::Json => LogFormat::Json,
        };
        config
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Args::parse().into_config();
    init_tracing(&config.logging)?;

    info!("Starting wagerlog server on {}", config.api.bind_addr);
    info!(
        "Data directory: {:?}, shard {}",
        config.storage.data_dir, config.storage.shard
    );

    let state = Arc::new(AppState::new(&config.storage)?);
    let app = create_router(Arc::clone(&state));

    let listener = tokio::net::TcpListener::bind(config.api.bind_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Shutting down, closing {} writers", state.registry.len());
    state.registry.close_all()?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for ctrl-c: {}", e);
        std::future::pending::<()>().await;
    }
}
