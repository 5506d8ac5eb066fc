use wagerlog_core::error::{Error, Result};

use super::{BlockHeader, BLOCK_HEADER_SIZE};

/// Reusable zstd context for building block frames.
///
/// Owned by one segment writer; dropping it releases the compressor.
pub struct BlockCompressor {
    inner: zstd::bulk::Compressor<'static>,
    level: i32,
}

impl BlockCompressor {
    pub fn new(level: i32) -> Result<Self> {
        let inner = zstd::bulk::Compressor::new(level).map_err(|e| Error::Compression {
            message: format!("Failed to create zstd compressor at level {}: {}", level, e),
        })?;
        Ok(Self { inner, level })
    }

    pub fn level(&self) -> i32 {
        self.level
    }

    /// Compress `raw` and prefix it with a frame header.
    pub fn encode(&mut self, raw: &[u8]) -> Result<Vec<u8>> {
        let compressed = self.inner.compress(raw).map_err(|e| Error::Compression {
            message: format!("Zstd compression failed: {}", e),
        })?;
        Ok(frame(raw.len(), &compressed))
    }
}

/// One-shot frame encoding without a reusable context
pub fn encode_block(raw: &[u8], level: i32) -> Result<Vec<u8>> {
    let compressed = zstd::encode_all(raw, level).map_err(|e| Error::Compression {
        message: format!("Zstd compression failed: {}", e),
    })?;
    Ok(frame(raw.len(), &compressed))
}

/// Decompress a block payload (the bytes after the frame header)
pub fn decompress_block(compressed: &[u8]) -> Result<Vec<u8>> {
    zstd::decode_all(compressed).map_err(|e| Error::Decompression {
        message: format!("Zstd decompression failed: {}", e),
    })
}

fn frame(raw_len: usize, compressed: &[u8]) -> Vec<u8> {
    let header = BlockHeader {
        compressed_len: compressed.len() as u32,
        raw_len: raw_len as u32,
    };
    let mut out = Vec::with_capacity(BLOCK_HEADER_SIZE + compressed.len());
    out.extend_from_slice(&header.to_bytes());
    out.extend_from_slice(compressed);
    out
}
