//! Blocks are compressed batches of concatenated serialized records.
//! A segment file is nothing but a sequence of block frames.
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       Block Frame                           │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Header (12 bytes, big-endian)                              │
//! │  ┌─────────────────────────────────────────────────────┐    │
//! │  │ Magic (4 bytes): 0x4C4F5442 "LOTB"                  │    │
//! │  │ Compressed Length (4 bytes)                         │    │
//! │  │ Decompressed Length (4 bytes, informational)        │    │
//! │  └─────────────────────────────────────────────────────┘    │
//! ├─────────────────────────────────────────────────────────────┤
//! │  zstd payload (Compressed Length bytes)                     │
//! │  ┌─────────────────────────────────────────────────────┐    │
//! │  │ Record 1 | Record 2 | ... | Record N                │    │
//! │  └─────────────────────────────────────────────────────┘    │
//! └─────────────────────────────────────────────────────────────┘
//!
//! Decoding never raises: a short read, a magic mismatch or a zstd error all
//! just end the stream for that file.

mod compression;
mod reader;

pub use compression::{decompress_block, encode_block, BlockCompressor};
pub use reader::{Block, BlockReader, StopReason};

use byteorder::{BigEndian, ByteOrder};

/// Magic number identifying a block frame
pub const BLOCK_MAGIC: u32 = 0x4C4F_5442;
pub const BLOCK_HEADER_SIZE: usize = 12;

/// Fixed frame header preceding every compressed block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockHeader {
    pub compressed_len: u32,
    /// Not used to bound decompression
    pub raw_len: u32,
}

impl BlockHeader {
    pub fn to_bytes(&self) -> [u8; BLOCK_HEADER_SIZE] {
        let mut buf = [0u8; BLOCK_HEADER_SIZE];
        BigEndian::write_u32(&mut buf[0..4], BLOCK_MAGIC);
        BigEndian::write_u32(&mut buf[4..8], self.compressed_len);
        BigEndian::write_u32(&mut buf[8..12], self.raw_len);
        buf
    }

    /// `None` when the magic does not match
    pub fn from_bytes(buf: &[u8; BLOCK_HEADER_SIZE]) -> Option<Self> {
        if BigEndian::read_u32(&buf[0..4]) != BLOCK_MAGIC {
            return None;
        }
        Some(Self {
            compressed_len: BigEndian::read_u32(&buf[4..8]),
            raw_len: BigEndian::read_u32(&buf[8..12]),
        })
    }

    /// Size of the whole frame on disk
    pub fn frame_len(&self) -> u64 {
        BLOCK_HEADER_SIZE as u64 + self.compressed_len as u64
    }
}
