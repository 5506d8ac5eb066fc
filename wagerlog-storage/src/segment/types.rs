use wagerlog_core::config::{StorageConfig, DEFAULT_BLOCK_THRESHOLD, DEFAULT_MAX_SEGMENT_SIZE};
use wagerlog_core::error::Result;

#[derive(Debug, Clone)]
pub struct SegmentConfig {
    /// Flush once this many serialized bytes are buffered
    pub block_threshold: usize,
    /// Carried for callers; writers never rotate on it
    pub max_size: u64,
    /// zstd level for block compression
    pub compression_level: i32,
}

impl Default for SegmentConfig {
    fn default() -> Self {
        Self {
            block_threshold: DEFAULT_BLOCK_THRESHOLD,
            max_size: DEFAULT_MAX_SEGMENT_SIZE,
            compression_level: 3,
        }
    }
}

impl SegmentConfig {
    pub fn from_storage(config: &StorageConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            block_threshold: config.block_threshold,
            max_size: config.max_segment_size,
            compression_level: config.compression.level,
        })
    }

    pub fn with_block_threshold(mut self, block_threshold: usize) -> Self {
        self.block_threshold = block_threshold;
        self
    }

    pub fn with_max_size(mut self, max_size: u64) -> Self {
        self.max_size = max_size;
        self
    }
}
