//! # Wagerlog CLI
//!
//! Offline inspection of a data directory: scan partitions, verify segment
//! hash chains, dump sidecar indexes.

use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};

use wagerlog_api::{init_tracing, ApiRecord};
use wagerlog_core::config::{LogLevel, LoggingConfig};
use wagerlog_storage::{verify_segment, BlockIndex, SegmentScanner};

#[derive(Parser)]
#[command(name = "wagerlog", version)]
#[command(about = "Wagerlog - inspect append-only wagering segment files")]
struct Cli {
    /// Log diagnostics to stderr
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print every record of a partition as JSON lines
    Scan {
        #[arg(long, default_value = "./data")]
        data_dir: PathBuf,
        #[arg(long)]
        game: u32,
        #[arg(long)]
        period: u32,
        #[arg(long)]
        shard: Option<u32>,
    },
    /// Recompute record and chain hashes of segment files
    Verify {
        #[arg(required = true)]
        segments: Vec<PathBuf>,
    },
    /// Print the entries of a sidecar block index
    Index { path: PathBuf },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.verbose {
        init_tracing(&LoggingConfig {
            level: LogLevel::Debug,
            ..Default::default()
        })?;
    }

    match cli.command {
        Commands::Scan {
            data_dir,
            game,
            period,
            shard,
        } => {
            let scanner = SegmentScanner::new(data_dir);
            let mut stream = scanner.scan(game, period, shard).await?;
            while let Some(record) = stream.next().await {
                println!("{}", serde_json::to_string(&ApiRecord::from(&record))?);
            }
        }
        Commands::Verify { segments } => {
            let mut failed = 0;
            for path in &segments {
                match verify_segment(path) {
                    Ok(report) => {
                        println!("{}", serde_json::to_string(&report)?);
                    }
                    Err(e) => {
                        failed += 1;
                        eprintln!("{}: {} [{}]", path.display(), e, e.error_code());
                    }
                }
            }
            if failed > 0 {
                bail!("{} of {} segments failed verification", failed, segments.len());
            }
        }
        Commands::Index { path } => {
            let index = BlockIndex::load(&path)?;
            for entry in index.entries() {
                println!("{}\t{}", entry.seq_no, entry.offset);
            }
            eprintln!(
                "{} entries, {} distinct seq numbers, {} blocks",
                index.entries().len(),
                index.len(),
                index.block_offsets().len()
            );
        }
    }

    Ok(())
}
