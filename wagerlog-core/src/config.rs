//! # Configuration Management
//!
//! Handles all configuration for wagerlog components.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;

use crate::error::{Error, Result};

/// Default block flush threshold (64 KiB)
pub const DEFAULT_BLOCK_THRESHOLD: usize = 64 * 1024;
/// Default maximum segment size (256 MiB). Not enforced: segments never rotate.
pub const DEFAULT_MAX_SEGMENT_SIZE: u64 = 256 * 1024 * 1024;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    pub storage: StorageConfig,
    pub api: ApiConfig,
    pub logging: LoggingConfig,
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
    /// Buffered record bytes that trigger a block flush
    pub block_threshold: usize,
    /// Accepted and carried, but no rotation happens when a segment grows past it
    pub max_segment_size: u64,
    pub compression: CompressionConfig,
    /// Shard label written into segment filenames by this process
    pub shard: u32,
    /// Flush each request's record into its own block before acknowledging
    pub flush_each_write: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            block_threshold: DEFAULT_BLOCK_THRESHOLD,
            max_segment_size: DEFAULT_MAX_SEGMENT_SIZE,
            compression: CompressionConfig::default(),
            shard: 0,
            flush_each_write: true,
        }
    }
}

impl StorageConfig {
    pub fn validate(&self) -> Result<()> {
        if self.block_threshold == 0 {
            return Err(Error::Configuration {
                message: "block_threshold must be positive".to_string(),
            });
        }
        self.compression.validate()
    }
}

/// Compression configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompressionConfig {
    /// zstd level
    pub level: i32,
}

impl Default for CompressionConfig {
    fn default() -> Self {
        Self { level: 3 }
    }
}

impl CompressionConfig {
    pub const MIN_LEVEL: i32 = 1;
    pub const MAX_LEVEL: i32 = 22;

    pub fn validate(&self) -> Result<()> {
        if !(Self::MIN_LEVEL..=Self::MAX_LEVEL).contains(&self.level) {
            return Err(Error::Configuration {
                message: format!(
                    "compression level {} outside {}..={}",
                    self.level,
                    Self::MIN_LEVEL,
                    Self::MAX_LEVEL
                ),
            });
        }
        Ok(())
    }
}

/// API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub bind_addr: SocketAddr,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 9000)),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: LogLevel,
    pub format: LogFormat,
}

/// Log levels
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Directive string understood by `EnvFilter`
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// Log formats
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}
